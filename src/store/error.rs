//! Store error vocabulary

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("version conflict on event {event_id}: expected {expected}, found {actual}")]
    VersionConflict {
        event_id: String,
        expected: i64,
        actual: i64,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}
