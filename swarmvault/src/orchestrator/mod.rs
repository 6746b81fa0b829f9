//! Backup orchestrator - runs one backup session end to end.
//!
//! Fixed pipeline: stacks -> volumes -> swarm/network config -> archive,
//! then an optional sync of the whole backup root. Stages run strictly one
//! after another and resources inside a stage one at a time.
//!
//! Error policy:
//! - stack, volume, swarm and sync failures are logged and the session
//!   continues with whatever was written
//! - archive failures propagate and fail the session; the staging directory
//!   is left in place

use crate::config::Config;
use crate::exec::{CommandRunner, CommandSpec, SystemRunner};
use crate::fs::archive::{pack_directory_blocking, prune_archives};
use crate::fs::walker;
use crate::runtime::{DockerCli, HelperContainer};
use crate::session::BackupSession;
use crate::utils::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome counts for one export stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSummary {
    pub exported: usize,
    pub failed: usize,
}

/// Main backup orchestrator
pub struct BackupOrchestrator {
    session: BackupSession,
    runner: Arc<dyn CommandRunner>,
    docker: DockerCli,
    helper_image: String,
    keep_archives: Option<usize>,
}

impl BackupOrchestrator {
    /// The runner must dispatch to `session.remote_host()`, which is also
    /// the sync target host. A runner reporting a different host is logged.
    pub fn new(session: BackupSession, runner: Arc<dyn CommandRunner>) -> Self {
        if let Some(host) = runner.remote_host() {
            if session.remote_host() != Some(host) {
                warn!(
                    runner_host = host,
                    session_host = session.remote_host().unwrap_or("none"),
                    "Runner and session disagree on the remote host"
                );
            }
        }
        Self {
            session,
            docker: DockerCli::new(runner.clone()),
            runner,
            helper_image: "alpine".to_string(),
            keep_archives: None,
        }
    }

    /// Build a session and a process runner from configuration.
    pub fn from_config(config: &Config) -> Self {
        let session = BackupSession::new(&config.backup.dir, config.backup.remote_host.clone());
        let runner = SystemRunner::new(session.remote_host().map(str::to_string))
            .with_timeout(config.command_timeout())
            .with_transfer_timeout(config.transfer_timeout())
            .with_retries(config.exec.read_retries, config.retry_delay());

        Self::new(session, Arc::new(runner))
            .with_helper_image(config.backup.helper_image.clone())
            .with_retention(config.backup.keep_archives)
    }

    pub fn with_helper_image(mut self, image: impl Into<String>) -> Self {
        self.helper_image = image.into();
        self
    }

    /// Keep only the newest `keep` archives after a successful run.
    pub fn with_retention(mut self, keep: Option<usize>) -> Self {
        self.keep_archives = keep;
        self
    }

    pub fn session(&self) -> &BackupSession {
        &self.session
    }

    /// Export task status and compose config of every stack.
    pub async fn export_stacks(&self) -> StageSummary {
        info!("Backing up Portainer stacks...");
        let mut summary = StageSummary::default();

        let stacks = match self.docker.list_stacks().await {
            Ok(stacks) => stacks,
            Err(e) => {
                error!(error = %e, "Failed to list stacks");
                return summary;
            }
        };

        let stacks_dir = self.session.stacks_dir();
        if !prepare_stage_dir(&stacks_dir, stacks.len()) {
            summary.failed = stacks.len();
            return summary;
        }

        for stack in &stacks {
            info!(stack = %stack, "Backing up stack");
            match self.export_stack(stack, &stacks_dir).await {
                Ok(()) => summary.exported += 1,
                Err(e) => {
                    error!(stack = %stack, error = %e, "Error backing up stack");
                    summary.failed += 1;
                }
            }
        }

        info!(exported = summary.exported, failed = summary.failed, "Stack backup finished");
        summary
    }

    async fn export_stack(&self, stack: &str, stacks_dir: &Path) -> Result<()> {
        let tasks = self.docker.stack_tasks(stack).await?;
        write_output(stacks_dir, &format!("{stack}.json"), &tasks)?;

        let compose = self.docker.stack_config(stack).await?;
        write_output(stacks_dir, &format!("{stack}-compose.yml"), &compose)?;
        Ok(())
    }

    /// Copy every volume out through a helper container into `<name>.tar`.
    pub async fn export_volumes(&self) -> StageSummary {
        info!("Backing up Docker volumes...");
        let mut summary = StageSummary::default();

        let volumes = match self.docker.list_volumes().await {
            Ok(volumes) => volumes,
            Err(e) => {
                error!(error = %e, "Failed to list volumes");
                return summary;
            }
        };

        let volumes_dir = self.session.volumes_dir();
        if !prepare_stage_dir(&volumes_dir, volumes.len()) {
            summary.failed = volumes.len();
            return summary;
        }

        for volume in &volumes {
            info!(volume = %volume, "Backing up volume");
            match self.export_volume(volume, &volumes_dir).await {
                Ok(()) => summary.exported += 1,
                Err(e) => {
                    error!(volume = %volume, error = %e, "Error backing up volume");
                    summary.failed += 1;
                }
            }
        }

        info!(exported = summary.exported, failed = summary.failed, "Volume backup finished");
        summary
    }

    async fn export_volume(&self, volume: &str, volumes_dir: &Path) -> Result<()> {
        let name = HelperContainer::container_name(volume, self.session.timestamp());
        let helper = HelperContainer::start(&self.docker, name, volume, &self.helper_image).await?;

        let outcome = self.copy_and_pack(&helper, volume, volumes_dir).await;

        let container = helper.name().to_string();
        if let Err(e) = helper.remove().await {
            warn!(volume = %volume, container = %container, error = %e, "Failed to remove helper container");
        }
        outcome
    }

    async fn copy_and_pack(&self, helper: &HelperContainer, volume: &str, volumes_dir: &Path) -> Result<()> {
        let scratch = volumes_dir.join(volume);

        let packed = match helper.copy_out(&scratch).await {
            Ok(()) => {
                let tar_path = volumes_dir.join(format!("{volume}.tar"));
                pack_directory_blocking(scratch.clone(), volume.to_string(), tar_path).await
            }
            Err(e) => Err(e),
        };

        if scratch.exists() {
            if let Err(e) = std::fs::remove_dir_all(&scratch) {
                warn!(volume = %volume, path = %scratch.display(), error = %e, "Failed to remove volume scratch directory");
            }
        }
        packed
    }

    /// Export swarm inspection data and every network's inspection data.
    ///
    /// Failures abort the rest of the stage; files already written stay.
    pub async fn export_swarm_config(&self) -> StageSummary {
        info!("Backing up Swarm configuration...");
        let mut summary = StageSummary::default();

        if let Err(e) = self.export_swarm(&mut summary).await {
            error!(error = %e, "Error backing up Swarm configuration");
            summary.failed += 1;
        }

        info!(exported = summary.exported, failed = summary.failed, "Swarm backup finished");
        summary
    }

    async fn export_swarm(&self, summary: &mut StageSummary) -> Result<()> {
        let swarm_dir = self.session.swarm_dir();

        let swarm_config = self.docker.inspect_swarm().await?;
        write_output(&swarm_dir, "swarm-config.json", &swarm_config)?;
        summary.exported += 1;

        for network in self.docker.list_networks().await? {
            let inspect = self.docker.inspect_network(&network).await?;
            write_output(&swarm_dir, &format!("network-{network}.json"), &inspect)?;
            summary.exported += 1;
        }
        Ok(())
    }

    /// Compress the staging tree into `docker-backup-<timestamp>.tar.gz`
    /// rooted at `<timestamp>/`, then delete the staging tree.
    ///
    /// Returns the archive file name.
    pub async fn create_archive(&self) -> Result<String> {
        info!("Creating backup archive...");
        let staging = self.session.staging_dir();

        // Stages that produced nothing leave no staging dir behind.
        std::fs::create_dir_all(&staging)?;

        match walker::summarize(&staging).and_then(|tree| Ok((tree, walker::subdirectories(&staging)?))) {
            Ok((tree, stages)) => info!(
                files = tree.files,
                bytes = tree.bytes,
                stages = ?stages,
                "Staging tree ready"
            ),
            Err(e) => warn!(error = %e, "Failed to summarize staging tree"),
        }

        let archive_name = self.session.archive_name();
        pack_directory_blocking(
            staging.clone(),
            self.session.timestamp().to_string(),
            self.session.archive_path(),
        )
        .await?;

        std::fs::remove_dir_all(&staging)?;
        info!(archive = %archive_name, "Backup archive created");
        Ok(archive_name)
    }

    /// Mirror the whole backup root to `<remote_host>:<remote_path>`.
    ///
    /// Returns whether a sync ran and succeeded. Never fails the session.
    pub async fn sync_to_remote(&self, remote_path: &str) -> bool {
        let Some(host) = self.session.remote_host() else {
            warn!("No remote host specified for sync");
            return false;
        };

        info!("Syncing backup to {}:{}", host, remote_path);
        let source = format!("{}/", self.session.backup_root().display());
        let target = format!("{host}:{remote_path}");
        let spec = CommandSpec::new("rsync", ["-avz", source.as_str(), target.as_str()])
            .local_only()
            .bulk_transfer();

        match self.runner.run(&spec).await {
            Ok(_) => {
                info!(target = %target, "Remote sync finished");
                true
            }
            Err(e) => {
                error!(target = %target, error = %e, "Error syncing to remote host");
                false
            }
        }
    }

    /// Run every stage in order, then sync if a target is given.
    ///
    /// Returns `false` only when archive creation fails.
    pub async fn run_full_backup(&self, sync_to: Option<&str>) -> bool {
        let start_time = std::time::Instant::now();
        info!(
            session = %self.session.timestamp(),
            backup_root = %self.session.backup_root().display(),
            remote_host = self.session.remote_host().unwrap_or("local"),
            "Starting backup session"
        );

        let stacks = self.export_stacks().await;
        let volumes = self.export_volumes().await;
        let swarm = self.export_swarm_config().await;

        let archive_name = match self.create_archive().await {
            Ok(name) => name,
            Err(e) => {
                error!(error = %e, "Backup failed");
                return false;
            }
        };

        if let Some(keep) = self.keep_archives {
            if let Err(e) = prune_archives(self.session.backup_root(), keep) {
                warn!(error = %e, "Failed to apply archive retention");
            }
        }

        match sync_to {
            Some(remote_path) => {
                self.sync_to_remote(remote_path).await;
            }
            None => warn!("No sync target specified, skipping remote sync"),
        }

        info!(
            archive = %archive_name,
            stacks_exported = stacks.exported,
            stacks_failed = stacks.failed,
            volumes_exported = volumes.exported,
            volumes_failed = volumes.failed,
            swarm_exported = swarm.exported,
            swarm_failed = swarm.failed,
            duration_secs = start_time.elapsed().as_secs(),
            "Backup completed successfully"
        );
        true
    }
}

/// Create a stage directory once the stage has at least one resource.
fn prepare_stage_dir(dir: &Path, resources: usize) -> bool {
    if resources == 0 {
        return true;
    }
    match std::fs::create_dir_all(dir) {
        Ok(()) => true,
        Err(e) => {
            error!(path = %dir.display(), error = %e, "Failed to create stage directory");
            false
        }
    }
}

fn write_output(dir: &Path, file_name: &str, contents: &str) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join(file_name), contents)?;
    Ok(())
}
