use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::QuizResult;
use crate::store::{KeyValueStore, StoreError};

use super::write_with_reclaim;

/// Store key for the quiz history list
pub(crate) const HISTORY_KEY: &str = "quiz_history";

/// Maximum stored history entries; the oldest beyond this are evicted
pub const MAX_HISTORY_ENTRIES: usize = 100;

/// Default number of entries returned by `get_recent`
pub const DEFAULT_RECENT_LIMIT: usize = 50;

/// Default retention window for stale-history eviction (~6 months)
pub const DEFAULT_RETENTION_DAYS: i64 = 180;

/// Aggregate statistics over the full stored history
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryStats {
    pub total_quizzes: usize,
    pub total_questions: u64,
    pub average_score: f64,
    pub best_score: f64,
    /// Seconds across all runs
    pub total_time: u64,
    /// Mean seconds per run
    pub average_time: f64,
}

/// Append-only, bounded log of completed quiz runs, most-recent-first.
/// Entries are never mutated after append; only retention evicts them.
pub struct HistoryLedger {
    store: Arc<KeyValueStore>,
}

impl HistoryLedger {
    pub fn new(store: Arc<KeyValueStore>) -> Self {
        Self { store }
    }

    fn load(&self) -> Vec<QuizResult> {
        self.store.get(HISTORY_KEY, Vec::new())
    }

    /// Append a result, assigning its id and timestamp. The newest entry is
    /// stored first; anything beyond the cap falls off the end.
    pub fn append(&self, mut result: QuizResult) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        result.id = id.clone();
        result.timestamp = Utc::now();

        let mut history = self.load();
        history.insert(0, result);
        history.truncate(MAX_HISTORY_ENTRIES);

        write_with_reclaim(&self.store, HISTORY_KEY, &history)?;
        debug!(id = %id, total = history.len(), "Appended quiz result");
        Ok(id)
    }

    /// Most recent entries, newest first. `None` returns the full list.
    pub fn get_recent(&self, limit: Option<usize>) -> Vec<QuizResult> {
        let mut history = self.load();
        if let Some(limit) = limit {
            history.truncate(limit);
        }
        history
    }

    /// Replace the whole history (import merge path). Caller is responsible
    /// for ordering and capping.
    pub(crate) fn replace_all(&self, history: &[QuizResult]) -> Result<(), StoreError> {
        write_with_reclaim(&self.store, HISTORY_KEY, &history)
    }

    /// Statistics over the full stored history, not just a recent window
    pub fn aggregate(&self) -> HistoryStats {
        let history = self.load();
        if history.is_empty() {
            return HistoryStats::default();
        }

        let total_quizzes = history.len();
        let total_questions: u64 = history
            .iter()
            .map(|r| u64::from(r.summary.total_questions))
            .sum();
        let total_time: u64 = history.iter().map(|r| r.summary.total_time).sum();
        let score_sum: f64 = history.iter().map(|r| r.summary.percentage).sum();
        let best_score = history
            .iter()
            .map(|r| r.summary.percentage)
            .fold(0.0, f64::max);

        HistoryStats {
            total_quizzes,
            total_questions,
            average_score: score_sum / total_quizzes as f64,
            best_score,
            total_time,
            average_time: total_time as f64 / total_quizzes as f64,
        }
    }

    /// Reset the history to empty. Irreversible.
    pub fn clear(&self) -> Result<(), StoreError> {
        write_with_reclaim(&self.store, HISTORY_KEY, &Vec::<QuizResult>::new())
    }

    /// Evict entries older than the retention window. Idempotent; run on
    /// every startup. Returns the number of entries removed.
    pub fn evict_stale(&self, retention: Duration) -> Result<usize, StoreError> {
        let history = self.load();
        let cutoff = Utc::now() - retention;
        let kept: Vec<QuizResult> = history
            .iter()
            .filter(|r| r.timestamp >= cutoff)
            .cloned()
            .collect();

        let evicted = history.len() - kept.len();
        if evicted > 0 {
            write_with_reclaim(&self.store, HISTORY_KEY, &kept)?;
            info!(evicted = evicted, "Evicted stale quiz history");
        }
        Ok(evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuizSummary;
    use tempfile::TempDir;

    fn ledger() -> (TempDir, HistoryLedger) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(KeyValueStore::new(dir.path().to_path_buf()).unwrap());
        (dir, HistoryLedger::new(store))
    }

    fn result(percentage: f64) -> QuizResult {
        QuizResult {
            summary: QuizSummary {
                total_questions: 10,
                correct_answers: (percentage / 10.0) as u32,
                incorrect_answers: 10 - (percentage / 10.0) as u32,
                skipped: 0,
                percentage,
                total_time: 120,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_append_is_most_recent_first() {
        let (_dir, ledger) = ledger();
        let id1 = ledger.append(result(50.0)).unwrap();
        let id2 = ledger.append(result(80.0)).unwrap();

        let recent = ledger.get_recent(None);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, id2);
        assert_eq!(recent[1].id, id1);
    }

    #[test]
    fn test_append_caps_at_max_entries() {
        let (_dir, ledger) = ledger();
        let oldest_id = ledger.append(result(10.0)).unwrap();
        for _ in 0..MAX_HISTORY_ENTRIES {
            ledger.append(result(50.0)).unwrap();
        }

        let all = ledger.get_recent(None);
        assert_eq!(all.len(), MAX_HISTORY_ENTRIES);
        assert!(all.iter().all(|r| r.id != oldest_id));
    }

    #[test]
    fn test_get_recent_truncates_to_limit() {
        let (_dir, ledger) = ledger();
        for _ in 0..5 {
            ledger.append(result(60.0)).unwrap();
        }
        assert_eq!(ledger.get_recent(Some(3)).len(), 3);
        assert_eq!(ledger.get_recent(None).len(), 5);
    }

    #[test]
    fn test_aggregate() {
        let (_dir, ledger) = ledger();
        ledger.append(result(60.0)).unwrap();
        ledger.append(result(80.0)).unwrap();

        let stats = ledger.aggregate();
        assert_eq!(stats.total_quizzes, 2);
        assert_eq!(stats.total_questions, 20);
        assert!((stats.average_score - 70.0).abs() < f64::EPSILON);
        assert!((stats.best_score - 80.0).abs() < f64::EPSILON);
        assert_eq!(stats.total_time, 240);
        assert!((stats.average_time - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_aggregate_empty() {
        let (_dir, ledger) = ledger();
        assert_eq!(ledger.aggregate(), HistoryStats::default());
    }

    #[test]
    fn test_clear() {
        let (_dir, ledger) = ledger();
        ledger.append(result(60.0)).unwrap();
        ledger.clear().unwrap();
        assert!(ledger.get_recent(None).is_empty());
    }

    #[test]
    fn test_evict_stale_removes_old_entries_only() {
        let (_dir, ledger) = ledger();
        ledger.append(result(60.0)).unwrap();

        // Backdate the stored entry past the retention window
        let mut history = ledger.get_recent(None);
        history[0].timestamp = Utc::now() - Duration::days(200);
        ledger.replace_all(&history).unwrap();
        ledger.append(result(80.0)).unwrap();

        let evicted = ledger.evict_stale(Duration::days(DEFAULT_RETENTION_DAYS)).unwrap();
        assert_eq!(evicted, 1);
        assert_eq!(ledger.get_recent(None).len(), 1);

        // Idempotent: second run evicts nothing
        let evicted = ledger.evict_stale(Duration::days(DEFAULT_RETENTION_DAYS)).unwrap();
        assert_eq!(evicted, 0);
    }
}
