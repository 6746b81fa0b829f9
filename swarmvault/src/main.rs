//! swarmvault - main entry point
//!
//! Runs one backup session and exits 0 on success, 1 on failure.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use swarmvault::config::{Config, Overrides};
use swarmvault::{utils, BackupOrchestrator};

#[derive(Parser, Debug)]
#[command(author, version, about = "Docker Swarm environment backup tool", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Local backup directory
    #[arg(long, value_name = "PATH")]
    backup_dir: Option<PathBuf>,

    /// Remote host for backup operations
    #[arg(long, value_name = "HOST")]
    remote_host: Option<String>,

    /// Remote path to sync backups to
    #[arg(long, value_name = "PATH")]
    sync_to: Option<String>,

    /// Image for the volume-copy helper container
    #[arg(long, value_name = "IMAGE")]
    helper_image: Option<String>,

    /// Number of archives to keep in the backup directory
    #[arg(long, value_name = "N")]
    keep: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("swarmvault: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let orchestrator = BackupOrchestrator::from_config(&config);

    // Initialize logging
    if let Err(e) = utils::logger::init(&config.log.level, &orchestrator.session().log_path()) {
        eprintln!("swarmvault: {e:#}");
        return ExitCode::FAILURE;
    }

    tracing::info!(
        "Starting swarmvault v{} (backup_dir: {})",
        env!("CARGO_PKG_VERSION"),
        config.backup.dir.display()
    );

    if orchestrator.run_full_backup(config.backup.sync_to.as_deref()).await {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn load_config(args: Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    config.apply_overrides(Overrides {
        backup_dir: args.backup_dir,
        remote_host: args.remote_host,
        sync_to: args.sync_to,
        helper_image: args.helper_image,
        keep_archives: args.keep,
        log_level: args.log_level,
    })?;

    Ok(config)
}
