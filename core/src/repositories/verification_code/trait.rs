//! Store capability trait shared by the account and device domains.

use async_trait::async_trait;

use crate::domain::entities::StoredVerificationCode;
use crate::errors::{StoreError, StoreResult};
use pv_shared::utils::phone::is_valid_e164;

/// Capability interface over a pending-verification keyspace.
///
/// Both numbering domains (account and device) implement this trait with
/// an identical contract, so the registration flow is agnostic to which
/// domain it addresses. The key is an E.164 phone number; at most one
/// record exists per number at any instant.
///
/// `insert` is an unconditional upsert: after it returns, the stored
/// record for `number` equals the given record in every field. Prior
/// state is fully replaced, never merged. Concurrent inserts for the
/// same number converge to exactly one row whose contents are those of a
/// single winning call.
#[async_trait]
pub trait VerificationCodeStore: Send + Sync {
    /// Create or fully replace the record for `number`
    async fn insert(&self, number: &str, code: &StoredVerificationCode) -> StoreResult<()>;

    /// Return the current record for `number`, or `None` if absent.
    /// Absence is a normal outcome, not an error.
    async fn find_for_number(&self, number: &str) -> StoreResult<Option<StoredVerificationCode>>;

    /// Delete the record for `number`; a no-op if absent
    async fn remove(&self, number: &str) -> StoreResult<()>;
}

/// Rejects malformed keys before any storage engine is contacted.
///
/// Keys are E.164 phone numbers; empty or non-E.164 input never reaches
/// the engine.
pub fn validate_number(number: &str) -> StoreResult<()> {
    if number.is_empty() {
        return Err(StoreError::invalid_argument("number must not be empty"));
    }
    if !is_valid_e164(number) {
        return Err(StoreError::invalid_argument(format!(
            "number is not E.164: {number}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod validate_tests {
    use super::*;

    #[test]
    fn test_accepts_e164() {
        assert!(validate_number("+15551234567").is_ok());
        assert!(validate_number("+442071838750").is_ok());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(
            validate_number(""),
            Err(StoreError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_rejects_non_e164() {
        assert!(matches!(
            validate_number("5551234567"),
            Err(StoreError::InvalidArgument { .. })
        ));
    }
}
