//! # Shared
//!
//! Cross-cutting types for the pending-verification workspace: configuration
//! loaded from the environment and phone-number utilities. This crate holds
//! no domain logic and performs no I/O.

pub mod config;
pub mod utils;
