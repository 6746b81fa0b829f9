//! Throwaway helper container used to read a volume's file tree.
//!
//! The handle must be released with [`HelperContainer::remove`] on every
//! exit path; a handle dropped unreleased only logs a leak warning.

use super::{DockerCli, HELPER_MOUNT};
use crate::utils::Result;
use std::path::Path;
use tracing::{debug, warn};

pub struct HelperContainer {
    docker: DockerCli,
    name: String,
    released: bool,
}

impl HelperContainer {
    /// Deterministic name for the helper of `volume` in session `timestamp`.
    pub fn container_name(volume: &str, timestamp: &str) -> String {
        format!("backup-{volume}-{timestamp}")
    }

    /// Start the helper with `volume` mounted read-only.
    ///
    /// If the run command fails the container may still have been created,
    /// so a forced removal is attempted before the error is returned.
    pub async fn start(docker: &DockerCli, name: String, volume: &str, image: &str) -> Result<Self> {
        if let Err(e) = docker.run_idle_container(&name, volume, image).await {
            if let Err(rm_err) = docker.force_remove(&name).await {
                debug!(container = %name, error = %rm_err, "No helper container to clean up");
            }
            return Err(e);
        }
        Ok(Self {
            docker: docker.clone(),
            name,
            released: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copy the mounted volume tree into `dest`.
    pub async fn copy_out(&self, dest: &Path) -> Result<()> {
        self.docker.copy_out(&self.name, HELPER_MOUNT, dest).await
    }

    /// Force-remove the container. Consumes the handle.
    pub async fn remove(mut self) -> Result<()> {
        self.released = true;
        self.docker.force_remove(&self.name).await
    }
}

impl Drop for HelperContainer {
    fn drop(&mut self) {
        if !self.released {
            warn!(container = %self.name, "Helper container handle dropped without removal");
        }
    }
}
