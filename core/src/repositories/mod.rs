pub mod verification_code;

pub use verification_code::{validate_number, MockVerificationCodeStore, VerificationCodeStore};
