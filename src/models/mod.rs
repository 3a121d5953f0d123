// Allow dead code: record fields mirror the on-disk format for completeness
#![allow(dead_code)]

//! Data models for quiz content and results.
//!
//! This module contains the record types persisted by the storage layer:
//!
//! - `Question`: an authored quiz question with options and metadata
//! - `QuizResult`, `QuizSummary`, `QuestionResult`: one completed quiz run
//! - `Collection`: a named, ordered grouping of question ids
//!
//! All records serialize with camelCase field names; that spelling is the
//! on-disk format and the export-bundle file contract.

pub mod collection;
pub mod question;
pub mod result;

pub use collection::Collection;
pub use question::{validate_question, Difficulty, Question, QuestionType};
pub use result::{QuestionResult, QuizResult, QuizSummary};
