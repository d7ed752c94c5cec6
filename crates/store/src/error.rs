use std::time::Duration;

use thiserror::Error;

/// SQLSTATE codes that mean "try the whole transaction again".
const TRANSIENT_SQLSTATES: &[&str] = &[
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "55P03", // lock_not_available (lock_timeout)
    "57014", // query_canceled (statement_timeout)
];

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A row lock could not be acquired within the configured bound.
    #[error("Timed out after {0:?} waiting for a row lock")]
    LockTimeout(Duration),

    /// The store is not accepting work right now.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The commit did not go through; nothing was made durable.
    #[error("Commit failed: {0}")]
    CommitFailed(String),

    /// The commit was sent but its outcome is unknown; it may have applied.
    #[error("Commit outcome unknown: {0}")]
    CommitUnknown(String),

    /// A write violated a referential or check constraint.
    #[error("Integrity violation: {0}")]
    Integrity(String),

    /// A persisted row could not be mapped back to a domain record.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns true if retrying the transaction from scratch may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::LockTimeout(_) | StoreError::Unavailable(_) | StoreError::CommitFailed(_) => {
                true
            }
            StoreError::Database(err) => match err {
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => true,
                sqlx::Error::Database(db_err) => db_err
                    .code()
                    .is_some_and(|code| TRANSIENT_SQLSTATES.contains(&&*code)),
                _ => false,
            },
            StoreError::CommitUnknown(_)
            | StoreError::Integrity(_)
            | StoreError::Corrupt(_)
            | StoreError::Migration(_) => false,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_timeout_and_commit_failures_are_transient() {
        assert!(StoreError::LockTimeout(Duration::from_millis(10)).is_transient());
        assert!(StoreError::CommitFailed("disk full".into()).is_transient());
        assert!(StoreError::Unavailable("restarting".into()).is_transient());
    }

    #[test]
    fn test_data_errors_are_not_transient() {
        assert!(!StoreError::Integrity("fk".into()).is_transient());
        assert!(!StoreError::Corrupt("stock = -1".into()).is_transient());
        assert!(!StoreError::Database(sqlx::Error::RowNotFound).is_transient());
        assert!(!StoreError::CommitUnknown("connection reset".into()).is_transient());
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        assert!(StoreError::Database(sqlx::Error::PoolTimedOut).is_transient());
    }
}
