use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Difficulty, Question, QuestionType};
use crate::store::{KeyValueStore, StoreError};
use crate::utils::contains_ignore_case;

use super::write_with_reclaim;

/// Store key for the question list
pub(crate) const QUESTIONS_KEY: &str = "questions";

/// Exact-match filters combined with the text query (AND semantics)
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub difficulty: Option<Difficulty>,
    pub question_type: Option<QuestionType>,
    pub category: Option<String>,
}

/// CRUD and search over authored questions, insertion-ordered
pub struct QuestionRepository {
    store: Arc<KeyValueStore>,
}

impl QuestionRepository {
    pub fn new(store: Arc<KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn get_all(&self) -> Vec<Question> {
        self.store.get(QUESTIONS_KEY, Vec::new())
    }

    pub fn get_by_id(&self, id: &str) -> Option<Question> {
        self.get_all()
            .into_iter()
            .find(|q| q.id.as_deref() == Some(id))
    }

    /// Save a question and return its id.
    ///
    /// Without an id, a new one is generated and `createdAt` stamped. With an
    /// id that already exists, the record is replaced in place and
    /// `updatedAt` stamped. With an unknown id, the record is appended as-is
    /// (imports arrive pre-identified).
    pub fn save(&self, mut question: Question) -> Result<String, StoreError> {
        let mut questions = self.get_all();

        let id = match question.id.clone() {
            None => {
                let id = Uuid::new_v4().to_string();
                question.id = Some(id.clone());
                question.created_at = Some(Utc::now());
                questions.push(question);
                id
            }
            Some(id) => {
                match questions.iter().position(|q| q.id.as_deref() == Some(id.as_str())) {
                    Some(pos) => {
                        question.updated_at = Some(Utc::now());
                        questions[pos] = question;
                    }
                    None => questions.push(question),
                }
                id
            }
        };

        write_with_reclaim(&self.store, QUESTIONS_KEY, &questions)?;
        debug!(id = %id, total = questions.len(), "Saved question");
        Ok(id)
    }

    /// Replace the entire question set (wholesale import)
    pub fn replace_all(&self, questions: &[Question]) -> Result<(), StoreError> {
        write_with_reclaim(&self.store, QUESTIONS_KEY, &questions)
    }

    /// Delete a question. Returns true iff a record was removed.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut questions = self.get_all();
        let before = questions.len();
        questions.retain(|q| q.id.as_deref() != Some(id));
        if questions.len() == before {
            return Ok(false);
        }
        write_with_reclaim(&self.store, QUESTIONS_KEY, &questions)?;
        Ok(true)
    }

    /// Case-insensitive text search over text, category, and tags, narrowed
    /// by the exact-match filters.
    pub fn search(&self, query: &str, filters: &SearchFilters) -> Vec<Question> {
        let query = query.trim();
        self.get_all()
            .into_iter()
            .filter(|q| {
                query.is_empty()
                    || contains_ignore_case(&q.text, query)
                    || contains_ignore_case(&q.category, query)
                    || q.tags.iter().any(|t| contains_ignore_case(t, query))
            })
            .filter(|q| filters.difficulty.map_or(true, |d| q.difficulty == d))
            .filter(|q| filters.question_type.map_or(true, |t| q.question_type == t))
            .filter(|q| {
                filters
                    .category
                    .as_deref()
                    .map_or(true, |c| q.category == c)
            })
            .collect()
    }
}
