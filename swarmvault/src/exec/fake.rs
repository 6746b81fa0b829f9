//! Scripted runner for tests. Records every spec it is given.

use super::{CommandRunner, CommandSpec};
use crate::utils::{Result, VaultError};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct FakeRunner {
    rules: Vec<(Vec<String>, std::result::Result<String, String>)>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `stdout` to any spec whose argv starts with `prefix`.
    pub fn ok(mut self, prefix: &[&str], stdout: &str) -> Self {
        self.rules.push((to_strings(prefix), Ok(stdout.to_string())));
        self
    }

    /// Fail any spec whose argv starts with `prefix`.
    pub fn fail(mut self, prefix: &[&str], stderr: &str) -> Self {
        self.rules.push((to_strings(prefix), Err(stderr.to_string())));
        self
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &[&str]) -> Vec<CommandSpec> {
        self.calls()
            .into_iter()
            .filter(|spec| starts_with(spec, prefix))
            .collect()
    }
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn starts_with<S: AsRef<str>>(spec: &CommandSpec, prefix: &[S]) -> bool {
    let argv = spec.argv();
    argv.len() >= prefix.len() && argv.iter().zip(prefix).all(|(a, p)| *a == p.as_ref())
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<String> {
        self.calls.lock().unwrap().push(spec.clone());

        let reply = self
            .rules
            .iter()
            .find(|(prefix, _)| starts_with(spec, prefix))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| Ok(String::new()));

        match reply {
            Ok(stdout) => {
                // `docker cp <c>:/source/. <dest>` materialises the volume tree.
                if starts_with(spec, &["docker", "cp"]) {
                    if let Some(dest) = spec.args.last() {
                        std::fs::create_dir_all(Path::new(dest).join("data"))?;
                        std::fs::write(Path::new(dest).join("data/app.db"), b"volume-bytes")?;
                    }
                }
                Ok(stdout)
            }
            Err(stderr) => Err(VaultError::CommandFailed {
                command: spec.to_string(),
                status: "exit status: 1".to_string(),
                stderr,
            }),
        }
    }
}
