//! Backup session: the immutable identity of one run.
//!
//! The timestamp is taken once, at construction, and fixes every path the
//! run writes to. Constructing a session creates no directories.

use crate::utils::logger::LOG_FILE_NAME;
use std::path::{Path, PathBuf};

/// Sortable, second-resolution session timestamp format.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Prefix shared by every session archive in the backup root.
pub const ARCHIVE_PREFIX: &str = "docker-backup-";
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSession {
    backup_root: PathBuf,
    remote_host: Option<String>,
    timestamp: String,
}

impl BackupSession {
    pub fn new(backup_root: impl Into<PathBuf>, remote_host: Option<String>) -> Self {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        Self::with_timestamp(backup_root, remote_host, timestamp)
    }

    pub fn with_timestamp(
        backup_root: impl Into<PathBuf>,
        remote_host: Option<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            backup_root: backup_root.into(),
            remote_host,
            timestamp: timestamp.into(),
        }
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    pub fn remote_host(&self) -> Option<&str> {
        self.remote_host.as_deref()
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// `<backup_root>/<timestamp>/`
    pub fn staging_dir(&self) -> PathBuf {
        self.backup_root.join(&self.timestamp)
    }

    pub fn stacks_dir(&self) -> PathBuf {
        self.staging_dir().join("portainer").join("stacks")
    }

    pub fn volumes_dir(&self) -> PathBuf {
        self.staging_dir().join("volumes")
    }

    pub fn swarm_dir(&self) -> PathBuf {
        self.staging_dir().join("swarm")
    }

    /// `docker-backup-<timestamp>.tar.gz`
    pub fn archive_name(&self) -> String {
        format!("{ARCHIVE_PREFIX}{}{ARCHIVE_SUFFIX}", self.timestamp)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.backup_root.join(self.archive_name())
    }

    pub fn log_path(&self) -> PathBuf {
        self.backup_root.join(LOG_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let session = BackupSession::with_timestamp("/opt/docker-backups", None, "20240301_020000");

        assert_eq!(session.staging_dir(), PathBuf::from("/opt/docker-backups/20240301_020000"));
        assert_eq!(
            session.stacks_dir(),
            PathBuf::from("/opt/docker-backups/20240301_020000/portainer/stacks")
        );
        assert_eq!(session.volumes_dir(), PathBuf::from("/opt/docker-backups/20240301_020000/volumes"));
        assert_eq!(session.swarm_dir(), PathBuf::from("/opt/docker-backups/20240301_020000/swarm"));
        assert_eq!(session.archive_name(), "docker-backup-20240301_020000.tar.gz");
        assert_eq!(session.log_path(), PathBuf::from("/opt/docker-backups/backup.log"));
    }

    #[test]
    fn test_timestamp_is_sortable_seconds() {
        let session = BackupSession::new("/tmp", Some("host".into()));
        let ts = session.timestamp();

        assert_eq!(ts.len(), 15);
        assert_eq!(&ts[8..9], "_");
        assert!(ts.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
        assert!(chrono::NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT).is_ok());
        assert_eq!(session.remote_host(), Some("host"));
    }

    #[test]
    fn test_construction_creates_nothing() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let session = BackupSession::new(temp_dir.path(), None);
        assert!(!session.staging_dir().exists());
    }
}
