//! Verification-code store capability.

mod r#trait;
pub use r#trait::{validate_number, VerificationCodeStore};

mod mock;
pub use mock::MockVerificationCodeStore;

#[cfg(test)]
mod tests;
