//! Result codes reported by calls and the helper binary.
//!
//! `0` is success, `1..=63` are defined by the remote service, `64` and
//! above are protocol errors of the helper. `-1` never reaches the helper:
//! the transaction code could not be resolved locally.

use std::fmt;

pub const SUCCESS: i32 = 0;

/// First exit code reserved for protocol errors.
pub const FIRST_ERROR_CODE: i32 = 64;

pub const ERROR_CANNOT_OBTAIN_TRANSACTION_CODE: i32 = -1;
pub const ERROR_MISSING_PARAMETERS: i32 = FIRST_ERROR_CODE;
pub const ERROR_FAILED_TO_GET_SERVICE_MANAGER: i32 = FIRST_ERROR_CODE + 1;
pub const ERROR_FAILED_TO_GET_SERVICE: i32 = FIRST_ERROR_CODE + 2;

/// Whether `code` lies in the remote-service band.
pub fn is_remote(code: i32) -> bool {
    (1..FIRST_ERROR_CODE).contains(&code)
}

/// Protocol failures reported by the helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolErrorKind {
    MissingParameters,
    ServiceManagerUnavailable,
    ServiceNotFound,
    /// Any other code outside the success and remote bands, including
    /// shell statuses for signals.
    Other,
}

impl ProtocolErrorKind {
    pub fn from_code(code: i32) -> Self {
        match code {
            ERROR_MISSING_PARAMETERS => Self::MissingParameters,
            ERROR_FAILED_TO_GET_SERVICE_MANAGER => Self::ServiceManagerUnavailable,
            ERROR_FAILED_TO_GET_SERVICE => Self::ServiceNotFound,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ProtocolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MissingParameters => "missing parameters",
            Self::ServiceManagerUnavailable => "failed to get service manager",
            Self::ServiceNotFound => "failed to get service",
            Self::Other => "helper failure",
        };
        f.write_str(text)
    }
}
