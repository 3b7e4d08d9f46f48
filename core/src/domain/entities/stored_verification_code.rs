//! Verification code record held for a phone number during registration.

use serde::{Deserialize, Serialize};

/// The single currently-valid verification code for a phone number,
/// together with its delivery metadata.
///
/// The store treats every field as opaque, caller-supplied data. In
/// particular `timestamp` is persisted and returned verbatim; expiry
/// decisions belong to the registration flow, not the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredVerificationCode {
    /// The code the client must present to complete verification
    pub code: String,

    /// Issuance time in milliseconds since the Unix epoch
    pub timestamp: i64,

    /// Token correlating a push-delivery attempt (account domain only)
    pub push_code: Option<String>,

    /// Delivery-provider confirmation id (account domain only)
    pub twilio_verification_sid: Option<String>,
}

impl StoredVerificationCode {
    /// Creates a record with no delivery metadata
    pub fn new(code: impl Into<String>, timestamp: i64) -> Self {
        Self {
            code: code.into(),
            timestamp,
            push_code: None,
            twilio_verification_sid: None,
        }
    }

    /// Attach a push-delivery correlation token
    pub fn with_push_code(mut self, push_code: impl Into<String>) -> Self {
        self.push_code = Some(push_code.into());
        self
    }

    /// Attach a delivery-provider confirmation id
    pub fn with_twilio_verification_sid(mut self, sid: impl Into<String>) -> Self {
        self.twilio_verification_sid = Some(sid.into());
        self
    }
}
