use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use tracing::{debug, info, warn};

use crate::completion::Completion;
use crate::config::ShellConfig;
use crate::error::{Result, ShellError};
use crate::quote::quote;
use crate::session::Session;

/// Lifecycle state of a [`ShellChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Stopped,
    Starting,
    Running,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelState::Stopped => "stopped",
            ChannelState::Starting => "starting",
            ChannelState::Running => "running",
        };
        f.write_str(name)
    }
}

enum Slot {
    Stopped,
    Starting,
    Running(Session),
}

/// Long-lived privileged shell executing one command at a time.
///
/// At most one session exists at a time. Commands run in submission order
/// and each receives exactly one [`Completion`], delivered on the channel's
/// worker thread, unless [`stop`](Self::stop) abandons it first.
pub struct ShellChannel {
    config: ShellConfig,
    slot: Mutex<Slot>,
    start_lock: Mutex<()>,
}

impl ShellChannel {
    pub fn new(config: ShellConfig) -> Self {
        Self {
            config,
            slot: Mutex::new(Slot::Stopped),
            start_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current lifecycle state. A session whose shell died reports `Stopped`.
    pub fn state(&self) -> ChannelState {
        match &*self.slot() {
            Slot::Stopped => ChannelState::Stopped,
            Slot::Starting => ChannelState::Starting,
            Slot::Running(session) if session.is_alive() => ChannelState::Running,
            Slot::Running(_) => ChannelState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == ChannelState::Running
    }

    /// Process id of the running shell, if any.
    pub fn pid(&self) -> Option<u32> {
        match &*self.slot() {
            Slot::Running(session) if session.is_alive() => Some(session.pid()),
            _ => None,
        }
    }

    /// Start a session, blocking until it is running or has failed.
    ///
    /// Spawns the shell, confirms privileges with `id -u`, then makes the
    /// configured executable runnable. Starting a running channel is a
    /// no-op. Concurrent callers are serialized.
    pub fn start(&self) -> Result<()> {
        let _starting = self.start_lock.lock().unwrap_or_else(PoisonError::into_inner);

        {
            let mut slot = self.slot();
            if let Slot::Running(session) = &*slot {
                if session.is_alive() {
                    debug!(pid = session.pid(), "shell channel already running");
                    return Ok(());
                }
            }
            if let Slot::Running(stale) = std::mem::replace(&mut *slot, Slot::Starting) {
                stale.terminate();
            }
        }

        let established = self.establish();

        let mut slot = self.slot();
        match established {
            Ok(session) if matches!(*slot, Slot::Starting) => {
                info!(pid = session.pid(), program = %self.config.program, "shell channel running");
                *slot = Slot::Running(session);
                Ok(())
            }
            Ok(session) => {
                // Stopped while starting.
                session.terminate();
                Err(ShellError::NotRunning)
            }
            Err(err) => {
                *slot = Slot::Stopped;
                warn!(error = %err, program = %self.config.program, "shell channel failed to start");
                Err(err)
            }
        }
    }

    /// Start on a background thread and report success to `on_finished`.
    pub fn start_with<F>(self: &Arc<Self>, on_finished: F)
    where
        F: FnOnce(bool) + Send + 'static,
    {
        let channel = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("bindercall-shell-start".into())
            .spawn(move || on_finished(channel.start().is_ok()));
        if let Err(err) = spawned {
            warn!(error = %err, "cannot spawn start thread");
        }
    }

    fn establish(&self) -> Result<Session> {
        let session = Session::spawn(&self.config)?;
        if let Err(err) = self.prepare(&session) {
            session.terminate();
            return Err(err);
        }
        Ok(session)
    }

    fn prepare(&self, session: &Session) -> Result<()> {
        let timeout = self.config.start_timeout;

        let probe = session.execute("id -u", timeout).map_err(|err| match err {
            ShellError::Exited => {
                ShellError::ElevationFailed("shell exited before answering".into())
            }
            other => other,
        })?;
        if !probe.is_success() {
            return Err(ShellError::ElevationFailed(format!(
                "probe exited with {}",
                probe.exit_code
            )));
        }
        if self.config.require_root {
            let uid = probe.output.first().map(|line| line.trim()).unwrap_or_default();
            if uid != "0" {
                return Err(ShellError::ElevationFailed(format!(
                    "shell runs as uid {uid:?}"
                )));
            }
        }

        if let Some(path) = &self.config.executable {
            let command = format!(
                "chmod {} {}",
                quote(&self.config.executable_mode),
                quote(&path.to_string_lossy())
            );
            let done = session.execute(&command, timeout)?;
            if !done.is_success() {
                return Err(ShellError::SetupFailed {
                    path: path.clone(),
                    exit_code: done.exit_code,
                });
            }
            debug!(path = %path.display(), mode = %self.config.executable_mode, "marked executable");
        }
        Ok(())
    }

    /// Queue `command` under correlation id `id`.
    ///
    /// Ids must strictly increase within a session. `on_complete` runs on
    /// the worker thread once the command finishes; it is dropped without
    /// being called if the channel stops first.
    pub fn submit<F>(&self, id: u64, command: &str, on_complete: F) -> Result<()>
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        if command.trim().is_empty() {
            return Err(ShellError::InvalidCommand("empty command".into()));
        }
        if command.contains(['\n', '\r', '\0']) {
            return Err(ShellError::InvalidCommand(
                "command must be a single line".into(),
            ));
        }

        match &*self.slot() {
            Slot::Running(session) => session.submit(id, command, Box::new(on_complete)),
            _ => Err(ShellError::NotRunning),
        }
    }

    /// Terminate the session, abandoning pending commands.
    ///
    /// No completion handler starts after this returns. Safe to call from a
    /// completion handler and when already stopped.
    pub fn stop(&self) {
        let previous = std::mem::replace(&mut *self.slot(), Slot::Stopped);
        match previous {
            Slot::Running(session) => {
                session.terminate();
                info!(pid = session.pid(), "shell channel stopped");
            }
            Slot::Starting => debug!("shell channel stopped while starting"),
            Slot::Stopped => {}
        }
    }
}

impl Drop for ShellChannel {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for ShellChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShellChannel")
            .field("program", &self.config.program)
            .field("state", &self.state())
            .finish()
    }
}
