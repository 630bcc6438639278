use std::sync::mpsc;
use std::sync::{Mutex, PoisonError};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bindercall_opcode::{OpcodeProvider, OpcodeTable, TransactionResolver};
use bindercall_parcel::{decode_reply, encode_call, Arg, ParcelDialect, ParcelReader};
use bindercall_shell::{ChannelState, Completion, ShellChannel};
use tracing::{debug, warn};

use crate::codes::{is_remote, ProtocolErrorKind, FIRST_ERROR_CODE, SUCCESS};
use crate::command::helper_command;
use crate::config::ClientConfig;
use crate::error::{CallError, Result};
use crate::pending::PendingCall;

/// Entry point for calling hidden service methods.
///
/// Owns the opcode resolver and the privileged shell session. Calls may be
/// made from any thread; they execute one at a time in submission order.
pub struct Client<P = OpcodeTable> {
    config: ClientConfig,
    resolver: TransactionResolver<P>,
    channel: ShellChannel,
    next_id: Mutex<u64>,
}

impl<P: OpcodeProvider> Client<P> {
    pub fn new(provider: P, config: ClientConfig) -> Self {
        let shell = config.shell.clone().with_executable(&config.helper);
        Self {
            resolver: TransactionResolver::with_config(provider, config.resolver),
            channel: ShellChannel::new(shell),
            next_id: Mutex::new(1),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn resolver(&self) -> &TransactionResolver<P> {
        &self.resolver
    }

    pub fn channel(&self) -> &ShellChannel {
        &self.channel
    }

    /// Open the privileged session and make the helper executable.
    ///
    /// A no-op when already running.
    pub fn start(&self) -> Result<()> {
        Ok(self.channel.start()?)
    }

    /// Stop the session. Outstanding calls are abandoned.
    pub fn stop(&self) {
        self.channel.stop();
    }

    pub fn is_running(&self) -> bool {
        self.channel.is_running()
    }

    pub fn state(&self) -> ChannelState {
        self.channel.state()
    }

    /// Process id of the privileged shell while running.
    pub fn shell_pid(&self) -> Option<u32> {
        self.channel.pid()
    }

    /// Submit a call and return a handle to its eventual reply.
    ///
    /// Fails immediately, without touching the channel, when the method's
    /// transaction code is unknown.
    pub fn call(
        &self,
        interface: &str,
        service: &str,
        method: &str,
        args: &[Arg],
    ) -> Result<PendingCall> {
        let (sender, receiver) = mpsc::channel();
        let id = self.call_with(interface, service, method, args, move |result| {
            let _ = sender.send(result);
        })?;
        Ok(PendingCall::new(id, receiver))
    }

    /// Submit a call and block until its reply arrives.
    pub fn call_blocking(
        &self,
        interface: &str,
        service: &str,
        method: &str,
        args: &[Arg],
    ) -> Result<ParcelReader> {
        self.call(interface, service, method, args)?.wait()
    }

    /// Submit a call whose result goes to `on_result`.
    ///
    /// `on_result` runs on the channel worker thread and must not block;
    /// it is dropped uncalled if the channel stops first. Returns the
    /// correlation id.
    pub fn call_with<F>(
        &self,
        interface: &str,
        service: &str,
        method: &str,
        args: &[Arg],
        on_result: F,
    ) -> Result<u64>
    where
        F: FnOnce(Result<ParcelReader>) + Send + 'static,
    {
        let opcode = self.resolver.resolve(interface, method).ok_or_else(|| {
            CallError::CannotResolveOpcode {
                interface: interface.to_string(),
                method: method.to_string(),
            }
        })?;

        let payload = encode_call(self.config.dialect, interface, args)?;
        let command = helper_command(&self.config.helper, service, opcode, &STANDARD.encode(&payload));
        let dialect = self.config.dialect;

        let mut next_id = self.next_id.lock().unwrap_or_else(PoisonError::into_inner);
        let id = *next_id;
        self.channel.submit(id, &command, move |completion| {
            if completion.id != id {
                warn!(expected = id, got = completion.id, "completion for another call ignored");
                return;
            }
            on_result(interpret(completion, dialect));
        })?;
        *next_id += 1;

        debug!(id, interface, method, service, opcode, size = payload.len(), "submitted call");
        Ok(id)
    }

    /// Submit a call and await its reply.
    #[cfg(feature = "async")]
    pub async fn call_async(
        &self,
        interface: &str,
        service: &str,
        method: &str,
        args: &[Arg],
    ) -> Result<ParcelReader> {
        let (sender, receiver) = tokio::sync::oneshot::channel();
        self.call_with(interface, service, method, args, move |result| {
            let _ = sender.send(result);
        })?;
        receiver.await.unwrap_or(Err(CallError::Abandoned))
    }
}

impl Client<OpcodeTable> {
    /// Client backed by an opcode table.
    pub fn with_table(table: OpcodeTable, config: ClientConfig) -> Self {
        Self::new(table, config)
    }
}

impl<P> std::fmt::Debug for Client<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("helper", &self.config.helper)
            .field("dialect", &self.config.dialect)
            .field("channel", &self.channel)
            .finish()
    }
}

/// Decode the helper's stdout: base64 text, possibly split over lines.
fn decode_output(completion: &Completion, dialect: ParcelDialect) -> Result<ParcelReader> {
    let text: String = completion.output.iter().map(|line| line.trim()).collect();
    let bytes = STANDARD.decode(text)?;
    Ok(decode_reply(bytes, dialect))
}

/// Map a completion onto the result-code bands.
fn interpret(completion: Completion, dialect: ParcelDialect) -> Result<ParcelReader> {
    let code = completion.exit_code;
    if code == SUCCESS {
        return decode_output(&completion, dialect);
    }
    if is_remote(code) {
        let reply = if completion.output.is_empty() {
            None
        } else {
            decode_output(&completion, dialect)
                .inspect_err(|err| debug!(code, error = %err, "remote error output is not a reply"))
                .ok()
        };
        return Err(CallError::Remote { code, reply });
    }
    if code < FIRST_ERROR_CODE {
        warn!(code, "helper exit code outside the known bands");
    }
    Err(CallError::Protocol {
        kind: ProtocolErrorKind::from_code(code),
        code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(exit_code: i32, output: &[&str]) -> Completion {
        Completion {
            id: 1,
            exit_code,
            output: output.iter().map(|line| line.to_string()).collect(),
        }
    }

    #[test]
    fn success_decodes_concatenated_lines() {
        let reply = interpret(completion(0, &["AQ", "ID"]), ParcelDialect::default()).unwrap();
        assert_eq!(reply.as_bytes().as_ref(), &[1, 2, 3]);
        assert_eq!(reply.position(), 0);
    }

    #[test]
    fn success_with_garbage_is_a_decode_error() {
        let err = interpret(completion(0, &["not base64!"]), ParcelDialect::default()).unwrap_err();
        assert!(matches!(err, CallError::Decode(_)));
    }

    #[test]
    fn remote_band_keeps_reply_when_present() {
        let err = interpret(completion(5, &["AAAAAA=="]), ParcelDialect::default()).unwrap_err();
        match err {
            CallError::Remote { code: 5, reply: Some(reply) } => assert_eq!(reply.len(), 4),
            other => panic!("unexpected: {other:?}"),
        }

        let err = interpret(completion(63, &["no reply!"]), ParcelDialect::default()).unwrap_err();
        assert!(matches!(err, CallError::Remote { code: 63, reply: None }));
    }

    #[test]
    fn protocol_band_starts_at_64() {
        let err = interpret(completion(64, &[]), ParcelDialect::default()).unwrap_err();
        assert!(matches!(
            err,
            CallError::Protocol { kind: ProtocolErrorKind::MissingParameters, code: 64 }
        ));
        let err = interpret(completion(66, &["no service"]), ParcelDialect::default()).unwrap_err();
        assert!(matches!(
            err,
            CallError::Protocol { kind: ProtocolErrorKind::ServiceNotFound, code: 66 }
        ));
    }
}
