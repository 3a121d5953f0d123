use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::eq_ignore_case;

/// Minimum question text length accepted by validation
const MIN_TEXT_LENGTH: usize = 10;

/// Option count bounds for choice-based questions
const MIN_OPTIONS: usize = 2;
const MAX_OPTIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    #[default]
    Multiple,
    Boolean,
    Open,
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuestionType::Multiple => write!(f, "multiple"),
            QuestionType::Boolean => write!(f, "boolean"),
            QuestionType::Open => write!(f, "open"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

/// An authored quiz question.
///
/// `id` is None until the first save assigns one. Timestamps are stamped by
/// the repository (`created_at`/`updated_at`) and by import (`imported_at`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Question {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    #[serde(rename = "type", default)]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    /// Index into `options`; unused for open questions
    #[serde(default)]
    pub correct: usize,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "importedAt", default, skip_serializing_if = "Option::is_none")]
    pub imported_at: Option<DateTime<Utc>>,
}

/// Validate a question, returning a list of human-readable problems.
/// An empty list means the question is acceptable.
///
/// Pure function: callers run this before `save`, and import runs it per
/// record to decide what to drop.
pub fn validate_question(question: &Question) -> Vec<String> {
    let mut errors = Vec::new();

    if question.text.trim().len() < MIN_TEXT_LENGTH {
        errors.push(format!(
            "Question text must be at least {} characters",
            MIN_TEXT_LENGTH
        ));
    }

    // Open questions carry no options; everything below applies to
    // choice-based types only.
    if question.question_type == QuestionType::Open {
        return errors;
    }

    if question.options.len() < MIN_OPTIONS || question.options.len() > MAX_OPTIONS {
        errors.push(format!(
            "Questions need between {} and {} options",
            MIN_OPTIONS, MAX_OPTIONS
        ));
    }

    if question.options.iter().any(|o| o.trim().is_empty()) {
        errors.push("Options must not be empty".to_string());
    }

    for (i, option) in question.options.iter().enumerate() {
        if question.options[..i].iter().any(|o| eq_ignore_case(o, option)) {
            errors.push(format!("Duplicate option: '{}'", option));
        }
    }

    if question.correct >= question.options.len() {
        errors.push("Correct answer index is out of range".to_string());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_question() -> Question {
        Question {
            text: "What is the capital of Brazil?".to_string(),
            question_type: QuestionType::Multiple,
            options: vec![
                "São Paulo".to_string(),
                "Rio de Janeiro".to_string(),
                "Brasília".to_string(),
            ],
            correct: 2,
            category: "geography".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_question_passes() {
        assert!(validate_question(&valid_question()).is_empty());
    }

    #[test]
    fn test_short_text_rejected() {
        let mut q = valid_question();
        q.text = "Too short".to_string();
        assert_eq!(validate_question(&q).len(), 1);
    }

    #[test]
    fn test_open_question_skips_option_checks() {
        let q = Question {
            text: "Explain the water cycle in your own words.".to_string(),
            question_type: QuestionType::Open,
            options: Vec::new(),
            ..Default::default()
        };
        assert!(validate_question(&q).is_empty());
    }

    #[test]
    fn test_too_few_options_rejected() {
        let mut q = valid_question();
        q.options.truncate(1);
        q.correct = 0;
        assert!(!validate_question(&q).is_empty());
    }

    #[test]
    fn test_duplicate_options_rejected_case_insensitive() {
        let mut q = valid_question();
        q.options = vec!["Brasília".to_string(), "BRASÍLIA".to_string()];
        q.correct = 0;
        assert!(validate_question(&q)
            .iter()
            .any(|e| e.starts_with("Duplicate option")));
    }

    #[test]
    fn test_correct_index_out_of_range_rejected() {
        let mut q = valid_question();
        q.correct = 3;
        assert!(validate_question(&q)
            .iter()
            .any(|e| e.contains("out of range")));
    }

    #[test]
    fn test_empty_option_rejected() {
        let mut q = valid_question();
        q.options[1] = "   ".to_string();
        assert!(validate_question(&q)
            .iter()
            .any(|e| e.contains("must not be empty")));
    }

    #[test]
    fn test_serde_uses_type_and_camel_case() {
        let q = valid_question();
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["type"], "multiple");
        assert_eq!(json["difficulty"], "medium");
        assert!(json.get("createdAt").is_none());
    }
}
