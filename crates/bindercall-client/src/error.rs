use std::path::PathBuf;

use bindercall_parcel::{ParcelError, ParcelReader};
use bindercall_shell::ShellError;

use crate::codes::{ProtocolErrorKind, ERROR_CANNOT_OBTAIN_TRANSACTION_CODE};

/// Errors that can occur making a call.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// No transaction code is known for the method. Nothing was sent.
    #[error("cannot obtain transaction code for {interface}.{method}")]
    CannotResolveOpcode { interface: String, method: String },

    /// No privileged session is running.
    #[error("privileged channel is not running")]
    ChannelNotRunning,

    /// The helper reported a protocol failure (exit code 64 or above).
    #[error("helper protocol error {code}: {kind}")]
    Protocol { kind: ProtocolErrorKind, code: i32 },

    /// The remote service reported an error (exit code 1..=63).
    ///
    /// `reply` holds the decoded output when the helper printed any, so
    /// service-specific exception payloads can still be inspected.
    #[error("remote error {code}")]
    Remote {
        code: i32,
        reply: Option<ParcelReader>,
    },

    /// The channel stopped before the call completed.
    #[error("call abandoned: channel stopped")]
    Abandoned,

    /// The arguments could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] ParcelError),

    /// The helper's output is not valid base64.
    #[error("reply is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Shell failure other than "not running".
    #[error("shell error: {0}")]
    Shell(ShellError),

    /// The helper platform is not supported.
    #[error("unsupported SDK level {0}")]
    UnsupportedSdk(u32),

    /// None of the device ABIs has a helper build.
    #[error("unsupported ABI list: {0}")]
    UnsupportedAbi(String),

    /// Helper installation failed.
    #[error("cannot install helper to {path}: {source}")]
    Install {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CallError {
    /// Numeric result code: `-1` for resolution failure, the helper's exit
    /// code for remote and protocol errors, `None` for local failures.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::CannotResolveOpcode { .. } => Some(ERROR_CANNOT_OBTAIN_TRANSACTION_CODE),
            Self::Protocol { code, .. } | Self::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the failure came from the remote service rather than locally.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

impl From<ShellError> for CallError {
    fn from(err: ShellError) -> Self {
        match err {
            ShellError::NotRunning => Self::ChannelNotRunning,
            other => Self::Shell(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, CallError>;
