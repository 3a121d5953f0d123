//! Import, export, backup, and text ingestion.
//!
//! This module owns the portable bundle format (the file contract for
//! export, import, and backup/restore), the merge semantics applied when a
//! bundle is brought into the local store, and the plain-text question
//! parser used by bulk authoring.

pub mod bundle;
pub mod engine;
pub mod text;

pub use bundle::{BackupMetadata, Bundle, ImportLogEntry, BUNDLE_VERSION};
pub use engine::{ImportExportEngine, ImportOptions, ImportOutcome};
pub use text::parse_questions;

pub(crate) use bundle::IMPORT_LOG_KEY;
