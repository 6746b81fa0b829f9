//! Configuration management for swarmvault.
//!
//! Loads configuration from an optional TOML file; command-line flags
//! override file values.

use crate::utils::{Result, VaultError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub exec: ExecConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Local backup root (staging directories, archives, backup.log)
    #[serde(default = "default_backup_dir")]
    pub dir: PathBuf,

    /// Host that runtime commands are executed on over ssh
    #[serde(default)]
    pub remote_host: Option<String>,

    /// Remote path the backup root is mirrored to
    #[serde(default)]
    pub sync_to: Option<String>,

    /// Image used for the throwaway volume-copy container
    #[serde(default = "default_helper_image")]
    pub helper_image: String,

    /// Number of session archives to keep (None = keep all)
    #[serde(default)]
    pub keep_archives: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecConfig {
    /// Per-command timeout in seconds (0 disables the timeout)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout for bulk transfers (volume copies, rsync); 0 disables it
    #[serde(default)]
    pub transfer_timeout_secs: u64,

    /// Extra attempts for read-only runtime queries
    #[serde(default = "default_read_retries")]
    pub read_retries: u32,

    /// Delay between attempts in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backup_dir: Option<PathBuf>,
    pub remote_host: Option<String>,
    pub sync_to: Option<String>,
    pub helper_image: Option<String>,
    pub keep_archives: Option<usize>,
    pub log_level: Option<String>,
}

// Default values
fn default_backup_dir() -> PathBuf {
    PathBuf::from("/opt/docker-backups")
}

fn default_helper_image() -> String {
    "alpine".to_string()
}

fn default_timeout_secs() -> u64 {
    3600
}

fn default_read_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: default_backup_dir(),
            remote_host: None,
            sync_to: None,
            helper_image: default_helper_image(),
            keep_archives: None,
        }
    }
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            transfer_timeout_secs: 0,
            read_retries: default_read_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backup: BackupConfig::default(),
            exec: ExecConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VaultError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides, then re-validate.
    pub fn apply_overrides(&mut self, overrides: Overrides) -> Result<()> {
        if let Some(dir) = overrides.backup_dir {
            self.backup.dir = dir;
        }
        if overrides.remote_host.is_some() {
            self.backup.remote_host = overrides.remote_host;
        }
        if overrides.sync_to.is_some() {
            self.backup.sync_to = overrides.sync_to;
        }
        if let Some(image) = overrides.helper_image {
            self.backup.helper_image = image;
        }
        if overrides.keep_archives.is_some() {
            self.backup.keep_archives = overrides.keep_archives;
        }
        if let Some(level) = overrides.log_level {
            self.log.level = level;
        }
        self.normalize();
        self.validate()
    }

    /// Command timeout, `None` when disabled.
    pub fn command_timeout(&self) -> Option<Duration> {
        match self.exec.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Bulk-transfer timeout, `None` when disabled.
    pub fn transfer_timeout(&self) -> Option<Duration> {
        match self.exec.transfer_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.exec.retry_delay_ms)
    }

    // Surrounding whitespace is dropped; empty strings mean "not configured".
    fn normalize(&mut self) {
        for field in [&mut self.backup.remote_host, &mut self.backup.sync_to] {
            *field = field
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string);
        }
        self.backup.helper_image = self.backup.helper_image.trim().to_string();
    }

    fn validate(&self) -> Result<()> {
        if self.backup.helper_image.trim().is_empty() {
            return Err(VaultError::Config("helper_image must not be empty".into()));
        }
        if self.backup.keep_archives == Some(0) {
            return Err(VaultError::Config(
                "keep_archives must be at least 1 (omit it to keep every archive)".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backup.dir, PathBuf::from("/opt/docker-backups"));
        assert_eq!(config.backup.helper_image, "alpine");
        assert!(config.backup.remote_host.is_none());
        assert_eq!(config.command_timeout(), Some(Duration::from_secs(3600)));
        assert_eq!(config.transfer_timeout(), None);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_partial_file_uses_field_defaults() {
        let config = Config::from_toml(
            r#"
[backup]
dir = "/srv/backups"
remote_host = "admin@swarm-manager"

[exec]
timeout_secs = 0
transfer_timeout_secs = 86400
"#,
        )
        .unwrap();

        assert_eq!(config.backup.dir, PathBuf::from("/srv/backups"));
        assert_eq!(config.backup.remote_host.as_deref(), Some("admin@swarm-manager"));
        assert_eq!(config.backup.helper_image, "alpine");
        assert_eq!(config.exec.read_retries, 2);
        assert_eq!(config.command_timeout(), None);
        assert_eq!(config.transfer_timeout(), Some(Duration::from_secs(86400)));
    }

    #[test]
    fn test_empty_remote_values_are_absent() {
        let config = Config::from_toml("[backup]\nremote_host = \"\"\nsync_to = \"  \"\n").unwrap();
        assert!(config.backup.remote_host.is_none());
        assert!(config.backup.sync_to.is_none());
    }

    #[test]
    fn test_remote_values_are_trimmed() {
        let mut config = Config::from_toml("[backup]\nremote_host = \" ops@h \"\n").unwrap();
        assert_eq!(config.backup.remote_host.as_deref(), Some("ops@h"));

        config
            .apply_overrides(Overrides {
                sync_to: Some("\t/srv/swarm \n".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(config.backup.sync_to.as_deref(), Some("/srv/swarm"));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut config = Config::from_toml("[backup]\nsync_to = \"/mnt/a\"\n").unwrap();
        config
            .apply_overrides(Overrides {
                backup_dir: Some(PathBuf::from("/tmp/bk")),
                sync_to: Some("/mnt/b".into()),
                log_level: Some("debug".into()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(config.backup.dir, PathBuf::from("/tmp/bk"));
        assert_eq!(config.backup.sync_to.as_deref(), Some("/mnt/b"));
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            Config::from_toml("[backup]\nhelper_image = \"\"\n"),
            Err(VaultError::Config(_))
        ));
        assert!(matches!(
            Config::from_toml("[backup]\nkeep_archives = 0\n"),
            Err(VaultError::Config(_))
        ));
        assert!(matches!(
            Config::from_toml("[backup\n"),
            Err(VaultError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_from_file_missing() {
        let err = Config::from_file(Path::new("/nonexistent/swarmvault.toml")).unwrap_err();
        assert!(matches!(err, VaultError::Config(_)));
    }
}
