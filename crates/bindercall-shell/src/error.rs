use std::path::PathBuf;

/// Errors that can occur in privileged shell operations.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// The shell program could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// The shell started but privileges could not be confirmed.
    #[error("privilege elevation failed: {0}")]
    ElevationFailed(String),

    /// The post-elevation setup command failed.
    #[error("setup of {path} failed with exit code {exit_code}")]
    SetupFailed { path: PathBuf, exit_code: i32 },

    /// No session is running.
    #[error("shell channel is not running")]
    NotRunning,

    /// The shell did not answer within the configured start timeout.
    #[error("shell did not respond within {0:?}")]
    Timeout(std::time::Duration),

    /// Commands must fit on one line.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// The correlation id is not greater than the last one submitted.
    #[error("correlation id {id} is not greater than last submitted id {last}")]
    StaleCorrelation { id: u64, last: u64 },

    /// An I/O error occurred talking to the shell.
    #[error("shell I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The shell closed its output before completing a command.
    #[error("shell exited")]
    Exited,
}

pub type Result<T> = std::result::Result<T, ShellError>;
