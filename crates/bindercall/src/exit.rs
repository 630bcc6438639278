use std::fmt;
use std::io;

use bindercall_client::CallError;
use bindercall_opcode::OpcodeError;

// Remote (1..=63) and protocol (64..) codes from the helper pass through
// unchanged; local failures use the 120s.
pub const SUCCESS: i32 = 0;
pub const USAGE: i32 = 2;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const CANNOT_RESOLVE: i32 = 120;
pub const CHANNEL_UNAVAILABLE: i32 = 121;
pub const ABANDONED: i32 = 122;
pub const DATA_INVALID: i32 = 123;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;
pub const INTERRUPTED: i32 = 130;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::InvalidData => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn opcode_error(context: &str, err: OpcodeError) -> CliError {
    match err {
        OpcodeError::Read { source, path } => {
            io_error(&format!("{context} ({})", path.display()), source)
        }
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn call_error(context: &str, err: CallError) -> CliError {
    let code = match &err {
        CallError::CannotResolveOpcode { .. } => CANNOT_RESOLVE,
        CallError::ChannelNotRunning | CallError::Shell(_) => CHANNEL_UNAVAILABLE,
        CallError::Protocol { code, .. } | CallError::Remote { code, .. } => *code,
        CallError::Abandoned => ABANDONED,
        CallError::Encode(_) | CallError::Decode(_) => DATA_INVALID,
        CallError::UnsupportedSdk(_) | CallError::UnsupportedAbi(_) => USAGE,
        CallError::Install { .. } => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindercall_client::ProtocolErrorKind;

    #[test]
    fn helper_codes_pass_through() {
        let err = call_error(
            "call failed",
            CallError::Protocol {
                kind: ProtocolErrorKind::ServiceNotFound,
                code: 66,
            },
        );
        assert_eq!(err.code, 66);
        let err = call_error("call failed", CallError::Remote { code: 7, reply: None });
        assert_eq!(err.code, 7);
    }

    #[test]
    fn local_failures_stay_out_of_helper_bands() {
        let err = call_error(
            "call failed",
            CallError::CannotResolveOpcode {
                interface: "a.I".into(),
                method: "m".into(),
            },
        );
        assert_eq!(err.code, CANNOT_RESOLVE);
        assert!(err.message.contains("a.I.m"));
    }
}
