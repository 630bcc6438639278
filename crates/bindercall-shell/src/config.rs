use std::path::PathBuf;
use std::time::Duration;

/// Default privileged shell program.
pub const DEFAULT_SHELL: &str = "su";

/// Default permission bits applied to the setup target.
pub const DEFAULT_EXECUTABLE_MODE: &str = "755";

/// Configuration for a [`ShellChannel`](crate::ShellChannel).
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Shell program to spawn.
    pub program: String,
    /// Arguments passed to the shell program.
    pub args: Vec<String>,
    /// Require the shell to report uid 0 before the channel is usable.
    pub require_root: bool,
    /// File made executable during start, once privileges are confirmed.
    pub executable: Option<PathBuf>,
    /// Permission bits for `executable`, in `chmod` octal notation.
    pub executable_mode: String,
    /// Upper bound on how long start waits for the shell to answer.
    /// `None` waits indefinitely (root prompts can take a while).
    pub start_timeout: Option<Duration>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_SHELL.to_string(),
            args: Vec::new(),
            require_root: true,
            executable: None,
            executable_mode: DEFAULT_EXECUTABLE_MODE.to_string(),
            start_timeout: None,
        }
    }
}

impl ShellConfig {
    /// Configuration for an unprivileged shell, e.g. `/bin/sh`.
    pub fn unprivileged(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            require_root: false,
            ..Self::default()
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_require_root(mut self, require_root: bool) -> Self {
        self.require_root = require_root;
        self
    }

    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    pub fn with_executable_mode(mut self, mode: impl Into<String>) -> Self {
        self.executable_mode = mode.into();
        self
    }

    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_requires_root_via_su() {
        let config = ShellConfig::default();
        assert_eq!(config.program, "su");
        assert!(config.require_root);
        assert_eq!(config.executable_mode, "755");
        assert!(config.start_timeout.is_none());
    }

    #[test]
    fn unprivileged_skips_root_check() {
        let config = ShellConfig::unprivileged("/bin/sh").with_executable("/tmp/helper");
        assert!(!config.require_root);
        assert_eq!(config.executable, Some(PathBuf::from("/tmp/helper")));
    }
}
