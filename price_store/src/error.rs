//! Store error taxonomy.

use thiserror::Error;

/// Errors returned by price store operations.
///
/// Missing data is never an error: unknown assets and empty timestamps come
/// back as empty results.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    /// Backend unreachable, or the transaction could not be committed.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] sqlx::Error),

    /// A record in a write batch failed validation. Nothing was written.
    #[error("Invalid record at position {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    /// Asset identifier is empty, too long, or contains disallowed characters.
    #[error("Invalid asset identifier: {0:?}")]
    InvalidAsset(String),
}

impl StoreError {
    /// Whether a caller may reasonably retry the failed call.
    ///
    /// Connection-level failures and PostgreSQL serialization, deadlock and
    /// connection-limit errors qualify. Validation errors are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::StorageUnavailable(sqlx::Error::Database(e)) => {
                e.code().map_or(false, |code| is_transient_sqlstate(&code))
            }
            StoreError::StorageUnavailable(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
                    | sqlx::Error::Tls(_)
            ),
            StoreError::InvalidRecord { .. } | StoreError::InvalidAsset(_) => false,
        }
    }
}

/// PostgreSQL error codes worth retrying
fn is_transient_sqlstate(code: &str) -> bool {
    matches!(
        code,
        "40001" // serialization_failure
            | "40P01" // deadlock_detected
            | "53300" // too_many_connections
    )
}

pub type Result<T> = std::result::Result<T, StoreError>;
