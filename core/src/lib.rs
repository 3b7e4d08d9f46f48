//! # Pending-Verification Core
//!
//! Domain layer for the pending verification-code stores. This crate
//! defines the stored record, the store capability trait that both the
//! account-domain and device-domain stores implement, the store error
//! taxonomy, and the injectable observability sink. Engine-backed
//! implementations live in the infrastructure crate; an in-memory mock
//! ships here for tests.

pub mod domain;
pub mod errors;
pub mod observability;
pub mod repositories;

// Re-export commonly used types for convenience
pub use domain::entities::StoredVerificationCode;
pub use errors::{StoreError, StoreResult};
pub use observability::{NoopStoreMetrics, StoreMetrics};
pub use repositories::VerificationCodeStore;
