use std::io;

use thiserror::Error;

/// POSIX ENOSPC ("no space left on device"). Matched by errno to avoid a
/// libc dependency; this is the one IO failure callers recover from by
/// evicting old data.
const ENOSPC: i32 = 28;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage quota exceeded")]
    QuotaExceeded,

    #[error("Failed to serialize value for key '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// Classify a write failure, distinguishing quota exhaustion from other
    /// IO errors so callers can trigger space reclamation.
    pub fn from_io(key: &str, err: io::Error) -> Self {
        if err.raw_os_error() == Some(ENOSPC) {
            StoreError::QuotaExceeded
        } else {
            StoreError::Io {
                key: key.to_string(),
                source: err,
            }
        }
    }

    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StoreError::QuotaExceeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enospc_maps_to_quota_exceeded() {
        let err = StoreError::from_io("questions", io::Error::from_raw_os_error(ENOSPC));
        assert!(err.is_quota_exceeded());
    }

    #[test]
    fn test_other_io_errors_stay_io() {
        let err = StoreError::from_io(
            "questions",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.is_quota_exceeded());
    }
}
