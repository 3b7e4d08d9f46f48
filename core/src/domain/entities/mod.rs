pub mod stored_verification_code;

pub use stored_verification_code::StoredVerificationCode;
