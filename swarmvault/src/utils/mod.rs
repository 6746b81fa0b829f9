//! Utility modules for swarmvault.

pub mod errors;
pub mod logger;

pub use errors::{Result, VaultError};
