use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate numbers for one completed quiz run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct QuizSummary {
    #[serde(rename = "totalQuestions")]
    pub total_questions: u32,
    #[serde(rename = "correctAnswers")]
    pub correct_answers: u32,
    #[serde(rename = "incorrectAnswers")]
    pub incorrect_answers: u32,
    #[serde(default)]
    pub skipped: u32,
    /// Score in percent, 0.0..=100.0
    pub percentage: f64,
    /// Total time spent, in seconds
    #[serde(rename = "totalTime")]
    pub total_time: u64,
}

/// Per-question line item inside a stored quiz result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct QuestionResult {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(rename = "correctAnswer", default)]
    pub correct_answer: Option<usize>,
    #[serde(rename = "userAnswer", default)]
    pub user_answer: Option<usize>,
    #[serde(rename = "isCorrect")]
    pub is_correct: bool,
    /// Seconds spent on this question
    #[serde(rename = "timeSpent", default)]
    pub time_spent: u64,
    #[serde(default)]
    pub explanation: String,
}

/// One completed quiz run. Immutable once appended to the history ledger;
/// only retention eviction removes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct QuizResult {
    #[serde(default)]
    pub id: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub summary: QuizSummary,
    #[serde(default)]
    pub questions: Vec<QuestionResult>,
}
