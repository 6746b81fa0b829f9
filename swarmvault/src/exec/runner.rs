//! Command runner backed by `tokio::process`.

use super::CommandSpec;
use crate::utils::{Result, VaultError};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Executes command descriptors, returning trimmed stdout.
///
/// A non-zero exit is reported as [`VaultError::CommandFailed`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<String>;

    /// Host that non-local specs are dispatched to, if known.
    fn remote_host(&self) -> Option<&str> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct SystemRunner {
    remote_host: Option<String>,
    timeout: Option<Duration>,
    transfer_timeout: Option<Duration>,
    read_retries: u32,
    retry_delay: Duration,
}

impl SystemRunner {
    /// Runner with no timeout and no retries.
    pub fn new(remote_host: Option<String>) -> Self {
        Self {
            remote_host,
            timeout: None,
            transfer_timeout: None,
            read_retries: 0,
            retry_delay: Duration::ZERO,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Timeout for bulk-transfer specs, which ignore the regular timeout.
    pub fn with_transfer_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    /// Extra attempts for idempotent specs. Mutating specs always run once.
    pub fn with_retries(mut self, read_retries: u32, retry_delay: Duration) -> Self {
        self.read_retries = read_retries;
        self.retry_delay = retry_delay;
        self
    }

    async fn run_once(&self, spec: &CommandSpec) -> Result<String> {
        let (program, args) = spec.resolve(self.remote_host.as_deref());
        let rendered = CommandSpec::new(&program, args.iter().cloned()).shell_line();
        debug!(command = %rendered, "Executing command");

        let mut cmd = tokio::process::Command::new(&program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let timeout = if spec.bulk_transfer {
            self.transfer_timeout
        } else {
            self.timeout
        };

        let output = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, cmd.output())
                .await
                .map_err(|_| VaultError::CommandTimeout {
                    command: rendered.clone(),
                    timeout,
                })?,
            None => cmd.output().await,
        }
        .map_err(|source| VaultError::Spawn {
            command: rendered.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(VaultError::CommandFailed {
                command: rendered,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    fn remote_host(&self) -> Option<&str> {
        self.remote_host.as_deref()
    }

    async fn run(&self, spec: &CommandSpec) -> Result<String> {
        let attempts = if spec.idempotent { self.read_retries + 1 } else { 1 };
        let mut attempt = 1;

        loop {
            match self.run_once(spec).await {
                Ok(stdout) => return Ok(stdout),
                Err(e) if attempt < attempts => {
                    warn!(command = %spec, attempt, error = %e, "Command failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    match &e {
                        VaultError::CommandFailed { command, stderr, .. } => {
                            error!(command = %command, "Command failed");
                            error!(command = %command, stderr = %stderr, "Error output");
                        }
                        other => error!(command = %spec, error = %other, "Command failed"),
                    }
                    return Err(e);
                }
            }
        }
    }
}
