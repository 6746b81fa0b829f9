//! Capability-tagged command descriptors.
//!
//! Dispatch rule: a spec runs on the configured remote host over ssh unless
//! it is tagged local-only. Shell specs are always local.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Never redirected to the remote host
    pub local_only: bool,
    /// Run through `sh -c` on this machine
    pub via_shell: bool,
    /// Read-only query; safe to retry
    pub idempotent: bool,
    /// Moves bulk data; subject to the transfer timeout
    pub bulk_transfer: bool,
}

impl CommandSpec {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            local_only: false,
            via_shell: false,
            idempotent: false,
            bulk_transfer: false,
        }
    }

    pub fn local_only(mut self) -> Self {
        self.local_only = true;
        self
    }

    /// Shell execution implies local-only.
    pub fn via_shell(mut self) -> Self {
        self.via_shell = true;
        self.local_only = true;
        self
    }

    pub fn idempotent(mut self) -> Self {
        self.idempotent = true;
        self
    }

    pub fn bulk_transfer(mut self) -> Self {
        self.bulk_transfer = true;
        self
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }

    /// Resolve the program and arguments actually spawned for this spec.
    pub fn resolve(&self, remote_host: Option<&str>) -> (String, Vec<String>) {
        if self.via_shell {
            return ("sh".to_string(), vec!["-c".to_string(), self.shell_line()]);
        }
        match remote_host {
            Some(host) if !self.local_only => (
                "ssh".to_string(),
                vec![host.to_string(), self.shell_line()],
            ),
            _ => (self.program.clone(), self.args.clone()),
        }
    }

    /// The command as a single line a POSIX shell parses back into `argv()`.
    pub fn shell_line(&self) -> String {
        self.argv()
            .into_iter()
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.shell_line())
    }
}

/// Quote a word for a POSIX shell. Words made only of unambiguous
/// characters are left as-is.
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@,+%".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_without_remote_host() {
        let spec = CommandSpec::new("docker", ["volume", "ls"]);
        let (program, args) = spec.resolve(None);
        assert_eq!(program, "docker");
        assert_eq!(args, vec!["volume", "ls"]);
    }

    #[test]
    fn test_redirected_to_remote_host() {
        let spec = CommandSpec::new("docker", ["stack", "ps", "web", "--format", "{{json .}}"]);
        let (program, args) = spec.resolve(Some("ops@manager-1"));
        assert_eq!(program, "ssh");
        assert_eq!(
            args,
            vec!["ops@manager-1", "docker stack ps web --format '{{json .}}'"]
        );
    }

    #[test]
    fn test_local_only_ignores_remote_host() {
        let spec = CommandSpec::new("rsync", ["-avz", "/opt/b/", "host:/srv"]).local_only();
        let (program, args) = spec.resolve(Some("host"));
        assert_eq!(program, "rsync");
        assert_eq!(args, vec!["-avz", "/opt/b/", "host:/srv"]);
    }

    #[test]
    fn test_shell_spec_is_local() {
        let spec = CommandSpec::new("docker", ["stack", "config", "web"]).via_shell();
        assert!(spec.local_only);
        let (program, args) = spec.resolve(Some("host"));
        assert_eq!(program, "sh");
        assert_eq!(args, vec!["-c", "docker stack config web"]);
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("web_1"), "web_1");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("{{.Name}}"), "'{{.Name}}'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("a; rm -rf /"), "'a; rm -rf /'");
    }
}
