//! Container runtime CLI surface.
//!
//! The exact `docker` command lines and their output formats are the
//! compatibility contract with the runtime; nothing here talks to the
//! daemon API directly.

pub mod helper;

use crate::exec::{CommandRunner, CommandSpec};
use crate::utils::Result;
use std::path::Path;
use std::sync::Arc;

pub use helper::HelperContainer;

const DOCKER: &str = "docker";

/// Mount point of the volume inside the helper container.
pub const HELPER_MOUNT: &str = "/source";

/// Split a plain-text list into names, dropping empty tokens.
pub fn parse_names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Clone)]
pub struct DockerCli {
    runner: Arc<dyn CommandRunner>,
}

impl DockerCli {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub async fn list_stacks(&self) -> Result<Vec<String>> {
        let spec = CommandSpec::new(DOCKER, ["stack", "ls", "--format", "{{.Name}}"]).idempotent();
        Ok(parse_names(&self.runner.run(&spec).await?))
    }

    /// Task status of a stack, one JSON document per line.
    pub async fn stack_tasks(&self, stack: &str) -> Result<String> {
        let spec = CommandSpec::new(DOCKER, ["stack", "ps", stack, "--format", "{{json .}}"])
            .idempotent();
        self.runner.run(&spec).await
    }

    /// Declarative (compose) form of a stack. Always runs through the local shell.
    pub async fn stack_config(&self, stack: &str) -> Result<String> {
        let spec = CommandSpec::new(DOCKER, ["stack", "config", stack])
            .via_shell()
            .idempotent();
        self.runner.run(&spec).await
    }

    pub async fn list_volumes(&self) -> Result<Vec<String>> {
        let spec = CommandSpec::new(DOCKER, ["volume", "ls", "--format", "{{.Name}}"]).idempotent();
        Ok(parse_names(&self.runner.run(&spec).await?))
    }

    pub async fn list_networks(&self) -> Result<Vec<String>> {
        let spec = CommandSpec::new(DOCKER, ["network", "ls", "--format", "{{.Name}}"]).idempotent();
        Ok(parse_names(&self.runner.run(&spec).await?))
    }

    pub async fn inspect_network(&self, network: &str) -> Result<String> {
        let spec = CommandSpec::new(DOCKER, ["network", "inspect", network]).idempotent();
        self.runner.run(&spec).await
    }

    pub async fn inspect_swarm(&self) -> Result<String> {
        let spec = CommandSpec::new(DOCKER, ["swarm", "inspect"]).idempotent();
        self.runner.run(&spec).await
    }

    /// Start a detached container that mounts `volume` read-only and idles.
    pub(crate) async fn run_idle_container(&self, name: &str, volume: &str, image: &str) -> Result<()> {
        let mount = format!("{volume}:{HELPER_MOUNT}:ro");
        let spec = CommandSpec::new(
            DOCKER,
            ["run", "-d", "--name", name, "-v", mount.as_str(), image, "tail", "-f", "/dev/null"],
        );
        self.runner.run(&spec).await.map(|_| ())
    }

    /// Copy the contents of `src` inside `container` to `dest`.
    pub(crate) async fn copy_out(&self, container: &str, src: &str, dest: &Path) -> Result<()> {
        let from = format!("{container}:{src}/.");
        let to = dest.to_string_lossy().into_owned();
        let spec = CommandSpec::new(DOCKER, ["cp", from.as_str(), to.as_str()]).bulk_transfer();
        self.runner.run(&spec).await.map(|_| ())
    }

    pub(crate) async fn force_remove(&self, container: &str) -> Result<()> {
        let spec = CommandSpec::new(DOCKER, ["rm", "-f", container]);
        self.runner.run(&spec).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::fake::FakeRunner;

    #[test]
    fn test_parse_names_drops_empty_tokens() {
        assert_eq!(parse_names("web\n\n  api \n"), vec!["web", "api"]);
        assert!(parse_names("").is_empty());
        assert!(parse_names("\n\n").is_empty());
    }

    #[tokio::test]
    async fn test_list_and_query_command_lines() {
        let fake = Arc::new(FakeRunner::new().ok(&["docker", "stack", "ls"], "web\n"));
        let docker = DockerCli::new(fake.clone());

        assert_eq!(docker.list_stacks().await.unwrap(), vec!["web"]);
        docker.stack_tasks("web").await.unwrap();
        docker.stack_config("web").await.unwrap();
        docker.inspect_network("ingress").await.unwrap();

        let calls = fake.calls();
        assert_eq!(calls[0].argv(), ["docker", "stack", "ls", "--format", "{{.Name}}"]);
        assert!(calls[0].idempotent);
        assert_eq!(calls[1].argv(), ["docker", "stack", "ps", "web", "--format", "{{json .}}"]);
        assert_eq!(calls[2].argv(), ["docker", "stack", "config", "web"]);
        assert!(calls[2].via_shell && calls[2].local_only);
        assert_eq!(calls[3].argv(), ["docker", "network", "inspect", "ingress"]);
    }

    #[tokio::test]
    async fn test_helper_commands_are_not_retryable() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let dest = temp_dir.path().join("db");
        let fake = Arc::new(FakeRunner::new());
        let docker = DockerCli::new(fake.clone());

        docker.run_idle_container("backup-db-1", "db", "alpine").await.unwrap();
        docker.copy_out("backup-db-1", HELPER_MOUNT, &dest).await.unwrap();
        docker.force_remove("backup-db-1").await.unwrap();

        let calls = fake.calls();
        assert_eq!(
            calls[0].argv(),
            ["docker", "run", "-d", "--name", "backup-db-1", "-v", "db:/source:ro", "alpine", "tail", "-f", "/dev/null"]
        );
        let dest = dest.to_string_lossy().into_owned();
        assert_eq!(calls[1].argv(), ["docker", "cp", "backup-db-1:/source/.", dest.as_str()]);
        assert_eq!(calls[2].argv(), ["docker", "rm", "-f", "backup-db-1"]);
        assert!(calls.iter().all(|c| !c.idempotent));
        assert!(calls[1].bulk_transfer);
        assert!(!calls[0].bulk_transfer && !calls[2].bulk_transfer);
    }
}
