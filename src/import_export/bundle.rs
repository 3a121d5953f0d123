use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Collection, Question, QuizResult};
use crate::store::StorageUsage;

/// Bundle format version written by this build
pub const BUNDLE_VERSION: &str = "1.0";

/// Store key for the import audit log
pub(crate) const IMPORT_LOG_KEY: &str = "import_log";

/// Import audit entries kept; oldest beyond this are dropped
pub(crate) const MAX_IMPORT_LOG_ENTRIES: usize = 20;

/// Portable JSON structure carrying questions, collections, settings, and
/// optionally history. This shape is the external file contract and must
/// round-trip through export and import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    pub version: String,
    #[serde(rename = "exportDate")]
    pub export_date: DateTime<Utc>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub collections: Vec<Collection>,
    #[serde(default)]
    pub settings: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<QuizResult>>,
    /// Present on backup bundles only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BackupMetadata>,
}

/// Extra metadata attached to backup bundles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMetadata {
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "storageUsage")]
    pub storage_usage: StorageUsage,
}

/// Append-only audit trail entry for one import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "questionsImported")]
    pub questions_imported: usize,
    #[serde(rename = "sourceVersion", default)]
    pub source_version: String,
    #[serde(rename = "sourceDate", default, skip_serializing_if = "Option::is_none")]
    pub source_date: Option<DateTime<Utc>>,
}
