use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{validate_question, Collection, Question, QuizResult};
use crate::repo::{CollectionRepository, HistoryLedger, QuestionRepository};
use crate::store::KeyValueStore;

use super::bundle::{
    BackupMetadata, Bundle, ImportLogEntry, BUNDLE_VERSION, IMPORT_LOG_KEY,
    MAX_IMPORT_LOG_ENTRIES,
};

/// Store key for application settings (opaque to this layer)
const SETTINGS_KEY: &str = "settings";

/// Merged history is re-capped to this many entries, matching the ledger cap
const MAX_HISTORY_ENTRIES: usize = crate::repo::history::MAX_HISTORY_ENTRIES;

/// Per-section behavior switches for `import_bundle`
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    /// true: add only records whose id is not already present.
    /// false: replace the existing question set wholesale.
    pub merge_questions: bool,
    pub merge_collections: bool,
    /// true: union bundle history with stored history by id
    pub merge_history: bool,
    pub overwrite_settings: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            merge_questions: true,
            merge_collections: true,
            merge_history: false,
            overwrite_settings: false,
        }
    }
}

/// Result of one import call
#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
    pub success: bool,
    /// Questions added (merge) or now present (replace)
    pub imported_count: usize,
    pub error: Option<String>,
}

/// Merges external bundles into the repositories and produces export and
/// backup bundles.
///
/// Import is deliberately best-effort per section: a malformed section is
/// skipped with an error, but sections committed earlier in the same call
/// stay committed (see DESIGN.md).
pub struct ImportExportEngine {
    store: Arc<KeyValueStore>,
    questions: QuestionRepository,
    collections: CollectionRepository,
    history: HistoryLedger,
}

impl ImportExportEngine {
    pub fn new(store: Arc<KeyValueStore>) -> Self {
        Self {
            questions: QuestionRepository::new(store.clone()),
            collections: CollectionRepository::new(store.clone()),
            history: HistoryLedger::new(store.clone()),
            store,
        }
    }

    // ===== Export =====

    pub fn export_bundle(&self, include_history: bool) -> Bundle {
        Bundle {
            version: BUNDLE_VERSION.to_string(),
            export_date: Utc::now(),
            questions: self.questions.get_all(),
            collections: self.collections.get_all(),
            settings: self.store.get(SETTINGS_KEY, Value::Object(Default::default())),
            history: include_history.then(|| self.history.get_recent(None)),
            metadata: None,
        }
    }

    /// Export bundle with history plus a storage-usage snapshot, for backup
    pub fn create_backup(&self) -> Bundle {
        let mut bundle = self.export_bundle(true);
        bundle.metadata = Some(BackupMetadata {
            created_at: Utc::now(),
            storage_usage: self.store.usage(),
        });
        bundle
    }

    /// Restore replaces questions and collections wholesale but unions
    /// history and takes the backup's settings.
    pub fn restore_backup(&self, bundle: &Value) -> ImportOutcome {
        self.import_bundle(
            bundle,
            &ImportOptions {
                merge_questions: false,
                merge_collections: false,
                merge_history: true,
                overwrite_settings: true,
            },
        )
    }

    // ===== Import =====

    /// Import a bundle. Sections are processed in order (questions,
    /// collections, history, settings); each is validated then applied, and
    /// a malformed section aborts only itself.
    pub fn import_bundle(&self, bundle: &Value, options: &ImportOptions) -> ImportOutcome {
        let Some(bundle_obj) = bundle.as_object() else {
            return ImportOutcome {
                success: false,
                imported_count: 0,
                error: Some("Bundle is not a JSON object".to_string()),
            };
        };

        let mut outcome = ImportOutcome {
            success: true,
            ..Default::default()
        };

        if let Some(section) = bundle_obj.get("questions") {
            match self.import_questions(section, options.merge_questions) {
                Ok(count) => outcome.imported_count = count,
                Err(e) => outcome.fail(format!("questions: {}", e)),
            }
        }

        if let Some(section) = bundle_obj.get("collections") {
            if let Err(e) = self.import_collections(section, options.merge_collections) {
                outcome.fail(format!("collections: {}", e));
            }
        }

        if options.merge_history {
            if let Some(section) = bundle_obj.get("history") {
                if let Err(e) = self.import_history(section) {
                    outcome.fail(format!("history: {}", e));
                }
            }
        }

        if options.overwrite_settings {
            if let Some(settings) = bundle_obj.get("settings") {
                if let Err(e) = self.store.set(SETTINGS_KEY, settings) {
                    outcome.fail(format!("settings: {}", e));
                }
            }
        }

        self.append_import_log(bundle_obj, outcome.imported_count);
        info!(
            imported = outcome.imported_count,
            success = outcome.success,
            "Import finished"
        );
        outcome
    }

    fn import_questions(&self, section: &Value, merge: bool) -> Result<usize, String> {
        let incoming: Vec<Question> =
            serde_json::from_value(section.clone()).map_err(|e| e.to_string())?;

        let now = Utc::now();
        let existing = self.questions.get_all();
        let existing_ids: HashSet<String> =
            existing.iter().filter_map(|q| q.id.clone()).collect();

        let mut prepared = Vec::with_capacity(incoming.len());
        for mut question in incoming {
            let problems = validate_question(&question);
            if !problems.is_empty() {
                debug!(problems = ?problems, "Dropping invalid question from import");
                continue;
            }
            if question.id.is_none() {
                question.id = Some(Uuid::new_v4().to_string());
            }
            question.imported_at = Some(now);
            prepared.push(question);
        }

        let (merged, added) = if merge {
            // First writer wins on id clash: existing records are kept,
            // clashing imports dropped.
            let mut merged = existing;
            let mut added = 0;
            for question in prepared {
                let id = question.id.as_deref().unwrap_or_default();
                if !existing_ids.contains(id) {
                    merged.push(question);
                    added += 1;
                }
            }
            (merged, added)
        } else {
            let count = prepared.len();
            (prepared, count)
        };

        self.questions
            .replace_all(&merged)
            .map_err(|e| e.to_string())?;
        Ok(added)
    }

    fn import_collections(&self, section: &Value, merge: bool) -> Result<usize, String> {
        let incoming: Vec<Collection> =
            serde_json::from_value(section.clone()).map_err(|e| e.to_string())?;

        let existing = self.collections.get_all();
        let existing_ids: HashSet<String> =
            existing.iter().filter_map(|c| c.id.clone()).collect();

        let mut prepared = Vec::with_capacity(incoming.len());
        for mut collection in incoming {
            if collection.id.is_none() {
                collection.id = Some(Uuid::new_v4().to_string());
            }
            prepared.push(collection);
        }

        let (merged, added) = if merge {
            let mut merged = existing;
            let mut added = 0;
            for collection in prepared {
                let id = collection.id.as_deref().unwrap_or_default();
                if !existing_ids.contains(id) {
                    merged.push(collection);
                    added += 1;
                }
            }
            (merged, added)
        } else {
            let count = prepared.len();
            (prepared, count)
        };

        self.collections
            .replace_all(&merged)
            .map_err(|e| e.to_string())?;
        Ok(added)
    }

    fn import_history(&self, section: &Value) -> Result<usize, String> {
        let incoming: Vec<QuizResult> =
            serde_json::from_value(section.clone()).map_err(|e| e.to_string())?;

        let existing = self.history.get_recent(None);
        let existing_ids: HashSet<String> = existing.iter().map(|r| r.id.clone()).collect();

        let mut merged = existing;
        let mut added = 0;
        for result in incoming {
            if result.id.is_empty() || !existing_ids.contains(&result.id) {
                merged.push(result);
                added += 1;
            }
        }

        // Union is re-sorted newest-first and re-capped
        merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        merged.truncate(MAX_HISTORY_ENTRIES);

        self.history.replace_all(&merged).map_err(|e| e.to_string())?;
        Ok(added)
    }

    fn append_import_log(&self, bundle: &serde_json::Map<String, Value>, imported: usize) {
        let entry = ImportLogEntry {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            questions_imported: imported,
            source_version: bundle
                .get("version")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            source_date: bundle
                .get("exportDate")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok()),
        };

        let mut log: Vec<ImportLogEntry> = self.store.get(IMPORT_LOG_KEY, Vec::new());
        log.insert(0, entry);
        log.truncate(MAX_IMPORT_LOG_ENTRIES);
        if let Err(e) = self.store.set(IMPORT_LOG_KEY, &log) {
            // The audit trail is advisory; never fail an import over it
            warn!(error = %e, "Failed to write import log");
        }
    }

    pub fn import_log(&self) -> Vec<ImportLogEntry> {
        self.store.get(IMPORT_LOG_KEY, Vec::new())
    }
}

impl ImportOutcome {
    fn fail(&mut self, message: String) {
        warn!(section_error = %message, "Import section failed");
        self.success = false;
        if self.error.is_none() {
            self.error = Some(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuizSummary;
    use tempfile::TempDir;

    fn engine() -> (TempDir, ImportExportEngine, Arc<KeyValueStore>) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(KeyValueStore::new(dir.path().to_path_buf()).unwrap());
        (dir, ImportExportEngine::new(store.clone()), store)
    }

    fn bundle_with_questions(ids: &[&str]) -> Value {
        let questions: Vec<Value> = ids
            .iter()
            .map(|id| {
                serde_json::json!({
                    "id": id,
                    "text": "What is the capital of Brazil?",
                    "type": "multiple",
                    "options": ["SP", "Brasília"],
                    "correct": 1
                })
            })
            .collect();
        serde_json::json!({
            "version": "1.0",
            "exportDate": "2025-06-01T00:00:00Z",
            "questions": questions
        })
    }

    #[test]
    fn test_merge_import_is_idempotent() {
        let (_dir, engine, _store) = engine();
        let bundle = bundle_with_questions(&["q1", "q2"]);

        let first = engine.import_bundle(&bundle, &ImportOptions::default());
        assert!(first.success);
        assert_eq!(first.imported_count, 2);

        let second = engine.import_bundle(&bundle, &ImportOptions::default());
        assert!(second.success);
        assert_eq!(second.imported_count, 0);
        assert_eq!(engine.questions.get_all().len(), 2);
    }

    #[test]
    fn test_replace_import_matches_bundle_exactly() {
        let (_dir, engine, _store) = engine();
        engine.import_bundle(&bundle_with_questions(&["old1", "old2"]), &ImportOptions::default());

        let options = ImportOptions {
            merge_questions: false,
            ..Default::default()
        };
        let outcome = engine.import_bundle(&bundle_with_questions(&["new1"]), &options);
        assert!(outcome.success);

        let all = engine.questions.get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id.as_deref(), Some("new1"));
    }

    #[test]
    fn test_imported_records_get_ids_and_import_stamp() {
        let (_dir, engine, _store) = engine();
        let bundle = serde_json::json!({
            "version": "1.0",
            "exportDate": "2025-06-01T00:00:00Z",
            "questions": [{
                "text": "What is the capital of Brazil?",
                "type": "multiple",
                "options": ["SP", "Brasília"],
                "correct": 1
            }]
        });

        engine.import_bundle(&bundle, &ImportOptions::default());
        let all = engine.questions.get_all();
        assert_eq!(all.len(), 1);
        assert!(all[0].id.is_some());
        assert!(all[0].imported_at.is_some());
    }

    #[test]
    fn test_invalid_questions_are_dropped() {
        let (_dir, engine, _store) = engine();
        let bundle = serde_json::json!({
            "questions": [
                {"text": "short", "type": "multiple", "options": ["A", "B"], "correct": 0},
                {"text": "What is the capital of Brazil?", "type": "multiple",
                 "options": ["SP", "Brasília"], "correct": 1}
            ]
        });

        let outcome = engine.import_bundle(&bundle, &ImportOptions::default());
        assert!(outcome.success);
        assert_eq!(outcome.imported_count, 1);
    }

    #[test]
    fn test_malformed_collections_do_not_block_committed_questions() {
        let (_dir, engine, _store) = engine();
        let bundle = serde_json::json!({
            "questions": [{
                "id": "q1",
                "text": "What is the capital of Brazil?",
                "type": "multiple",
                "options": ["SP", "Brasília"],
                "correct": 1
            }],
            "collections": "not-an-array"
        });

        let outcome = engine.import_bundle(&bundle, &ImportOptions::default());
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().starts_with("collections:"));
        // Questions section committed before collections failed
        assert_eq!(engine.questions.get_all().len(), 1);
    }

    #[test]
    fn test_not_an_object_fails_without_mutating() {
        let (_dir, engine, _store) = engine();
        let outcome = engine.import_bundle(&Value::from("nope"), &ImportOptions::default());
        assert!(!outcome.success);
        assert!(engine.questions.get_all().is_empty());
        assert!(engine.import_log().is_empty());
    }

    #[test]
    fn test_history_merge_sorts_desc_and_dedups() {
        let (_dir, engine, _store) = engine();
        let older = QuizResult {
            id: "r-old".to_string(),
            timestamp: "2025-01-01T00:00:00Z".parse().unwrap(),
            summary: QuizSummary::default(),
            questions: Vec::new(),
        };
        let newer = QuizResult {
            id: "r-new".to_string(),
            timestamp: "2025-05-01T00:00:00Z".parse().unwrap(),
            summary: QuizSummary::default(),
            questions: Vec::new(),
        };
        engine.history.replace_all(&[older.clone()]).unwrap();

        let bundle = serde_json::json!({
            "history": [older, newer]
        });
        let options = ImportOptions {
            merge_history: true,
            ..Default::default()
        };
        let outcome = engine.import_bundle(&bundle, &options);
        assert!(outcome.success);

        let history = engine.history.get_recent(None);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, "r-new");
        assert_eq!(history[1].id, "r-old");
    }

    #[test]
    fn test_settings_only_overwritten_when_asked() {
        let (_dir, engine, store) = engine();
        store.set("settings", &serde_json::json!({"theme": "light"})).unwrap();

        let bundle = serde_json::json!({"settings": {"theme": "dark"}});
        engine.import_bundle(&bundle, &ImportOptions::default());
        let settings: Value = store.get("settings", Value::Null);
        assert_eq!(settings["theme"], "light");

        let options = ImportOptions {
            overwrite_settings: true,
            ..Default::default()
        };
        engine.import_bundle(&bundle, &options);
        let settings: Value = store.get("settings", Value::Null);
        assert_eq!(settings["theme"], "dark");
    }

    #[test]
    fn test_export_bundle_round_trips() {
        let (_dir, engine, _store) = engine();
        engine.import_bundle(&bundle_with_questions(&["q1"]), &ImportOptions::default());

        let bundle = engine.export_bundle(true);
        assert_eq!(bundle.version, BUNDLE_VERSION);
        assert_eq!(bundle.questions.len(), 1);
        assert!(bundle.history.is_some());

        // Exported bundle imports cleanly into an empty store
        let (_dir2, engine2, _store2) = self::engine();
        let value = serde_json::to_value(&bundle).unwrap();
        let outcome = engine2.import_bundle(&value, &ImportOptions::default());
        assert!(outcome.success);
        assert_eq!(outcome.imported_count, 1);
    }

    #[test]
    fn test_backup_carries_usage_snapshot_and_restore_replaces() {
        let (_dir, engine, _store) = engine();
        engine.import_bundle(&bundle_with_questions(&["q1", "q2"]), &ImportOptions::default());

        let backup = engine.create_backup();
        let metadata = backup.metadata.as_ref().unwrap();
        assert!(metadata.storage_usage.total_bytes > 0);

        // Restore into a store holding different data
        let (_dir2, engine2, _store2) = self::engine();
        engine2.import_bundle(&bundle_with_questions(&["other"]), &ImportOptions::default());

        let value = serde_json::to_value(&backup).unwrap();
        let outcome = engine2.restore_backup(&value);
        assert!(outcome.success);

        let ids: Vec<_> = engine2
            .questions
            .get_all()
            .into_iter()
            .filter_map(|q| q.id)
            .collect();
        assert_eq!(ids, vec!["q1".to_string(), "q2".to_string()]);
    }

    #[test]
    fn test_import_log_capped_at_twenty() {
        let (_dir, engine, _store) = engine();
        for _ in 0..25 {
            engine.import_bundle(&bundle_with_questions(&[]), &ImportOptions::default());
        }
        assert_eq!(engine.import_log().len(), MAX_IMPORT_LOG_ENTRIES);
    }
}
