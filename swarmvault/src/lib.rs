//! swarmvault library
//!
//! Scheduled backups of a Docker Swarm environment: stacks, volumes and
//! cluster configuration are exported to a staging tree, bundled into one
//! gzip tar archive and optionally mirrored to a remote host.

pub mod config;
pub mod exec;
pub mod fs;
pub mod orchestrator;
pub mod runtime;
pub mod session;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use orchestrator::{BackupOrchestrator, StageSummary};
pub use session::BackupSession;
pub use utils::errors::VaultError;
pub type Result<T> = std::result::Result<T, VaultError>;
