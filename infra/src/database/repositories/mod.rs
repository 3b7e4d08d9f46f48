//! Engine-backed verification-code stores, one per numbering domain

pub mod pending_accounts;
pub mod pending_devices;

pub use pending_accounts::PendingAccounts;
pub use pending_devices::PendingDevices;
