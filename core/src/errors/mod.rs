//! Store error taxonomy.
//!
//! Absence is not represented here: `find_for_number` returns `Ok(None)`
//! for a missing key and `remove` of a missing key is `Ok(())`. These
//! variants cover the failure cases the data-access layer can surface.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by a verification-code store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Malformed input, rejected before the storage engine is contacted
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The circuit breaker is open; no engine call was attempted
    #[error("storage circuit open, retry after {retry_after:?}")]
    CircuitOpen { retry_after: Duration },

    /// Transient failures exhausted the retry budget
    #[error("storage unavailable after {attempts} attempts: {last_error}")]
    Unavailable { attempts: u32, last_error: String },

    /// Non-transient storage engine failure
    #[error("storage failure: {message}")]
    Storage { message: String },
}

impl StoreError {
    /// Shorthand for an invalid-argument rejection
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Shorthand for a non-transient engine failure
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
