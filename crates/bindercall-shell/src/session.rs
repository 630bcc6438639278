use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, trace, warn};

use crate::completion::{Completion, CompletionHandler};
use crate::config::ShellConfig;
use crate::error::{Result, ShellError};

enum Reply {
    /// Completion goes to the handler registered under this id.
    Handler(u64),
    /// Completion goes straight back to a blocked caller.
    Direct(Sender<Completion>),
}

struct Job {
    command: String,
    reply: Reply,
}

/// State shared between a session and its worker thread.
struct Shared {
    pending: Mutex<HashMap<u64, CompletionHandler>>,
    live: AtomicBool,
    /// Held while a completion handler runs; termination takes it to make
    /// sure no handler starts afterwards.
    delivery: Mutex<()>,
}

impl Shared {
    fn abandon_pending(&self) -> usize {
        let abandoned = std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
        abandoned.len()
    }
}

/// One running shell process plus the worker thread feeding it.
pub(crate) struct Session {
    pid: u32,
    child: Mutex<Option<Child>>,
    jobs: Mutex<Option<Sender<Job>>>,
    stdin: Arc<Mutex<Option<ChildStdin>>>,
    shared: Arc<Shared>,
    worker: ThreadId,
    last_id: Mutex<u64>,
}

impl Session {
    /// Spawn the shell in its own process group and start the worker.
    pub(crate) fn spawn(config: &ShellConfig) -> Result<Self> {
        let mut command = Command::new(&config.program);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(|source| ShellError::Spawn {
            program: config.program.clone(),
            source,
        })?;
        let pid = child.id();

        match Self::attach(&mut child) {
            Ok((stdin, jobs, shared, worker)) => {
                debug!(pid, program = %config.program, "spawned shell");
                Ok(Self {
                    pid,
                    child: Mutex::new(Some(child)),
                    jobs: Mutex::new(Some(jobs)),
                    stdin,
                    shared,
                    worker,
                    last_id: Mutex::new(0),
                })
            }
            Err(err) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(err)
            }
        }
    }

    #[allow(clippy::type_complexity)]
    fn attach(
        child: &mut Child,
    ) -> Result<(Arc<Mutex<Option<ChildStdin>>>, Sender<Job>, Arc<Shared>, ThreadId)> {
        let pid = child.id();
        let stdin = child.stdin.take().ok_or(ShellError::Exited)?;
        let stdout = child.stdout.take().ok_or(ShellError::Exited)?;
        let stderr = child.stderr.take().ok_or(ShellError::Exited)?;

        thread::Builder::new()
            .name("bindercall-shell-stderr".into())
            .spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(std::io::Result::ok) {
                    debug!(pid, "shell stderr: {line}");
                }
            })?;

        let stdin = Arc::new(Mutex::new(Some(stdin)));
        let shared = Arc::new(Shared {
            pending: Mutex::new(HashMap::new()),
            live: AtomicBool::new(true),
            delivery: Mutex::new(()),
        });
        let (jobs, queue) = mpsc::channel();

        let worker = Worker {
            stdout: BufReader::new(stdout),
            stdin: Arc::clone(&stdin),
            queue,
            shared: Arc::clone(&shared),
            marker: marker_prefix(pid),
            sequence: 0,
        };
        let handle = thread::Builder::new()
            .name("bindercall-shell".into())
            .spawn(move || worker.run())?;

        Ok((stdin, jobs, shared, handle.thread().id()))
    }

    pub(crate) fn pid(&self) -> u32 {
        self.pid
    }

    /// Whether the shell is still usable.
    pub(crate) fn is_alive(&self) -> bool {
        if !self.shared.live.load(Ordering::SeqCst) {
            return false;
        }
        let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        match child.as_mut().map(Child::try_wait) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                debug!(pid = self.pid, %status, "shell exited");
                false
            }
            Some(Err(_)) | None => false,
        }
    }

    fn send(&self, job: Job) -> Result<()> {
        let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        match jobs.as_ref() {
            Some(sender) => sender.send(job).map_err(|_| ShellError::NotRunning),
            None => Err(ShellError::NotRunning),
        }
    }

    /// Queue a command whose completion goes to `handler`.
    pub(crate) fn submit(&self, id: u64, command: &str, handler: CompletionHandler) -> Result<()> {
        let mut last = self.last_id.lock().unwrap_or_else(PoisonError::into_inner);
        if id <= *last {
            return Err(ShellError::StaleCorrelation { id, last: *last });
        }
        if !self.shared.live.load(Ordering::SeqCst) {
            return Err(ShellError::NotRunning);
        }

        self.shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, handler);
        let job = Job {
            command: command.to_string(),
            reply: Reply::Handler(id),
        };
        if let Err(err) = self.send(job) {
            self.shared
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&id);
            return Err(err);
        }

        *last = id;
        trace!(id, "queued shell command");
        Ok(())
    }

    /// Run a command and wait for its completion.
    pub(crate) fn execute(&self, command: &str, timeout: Option<Duration>) -> Result<Completion> {
        let (reply, completion) = mpsc::channel();
        self.send(Job {
            command: command.to_string(),
            reply: Reply::Direct(reply),
        })?;

        match timeout {
            Some(limit) => completion.recv_timeout(limit).map_err(|err| match err {
                RecvTimeoutError::Timeout => ShellError::Timeout(limit),
                RecvTimeoutError::Disconnected => ShellError::Exited,
            }),
            None => completion.recv().map_err(|_| ShellError::Exited),
        }
    }

    /// Kill the shell and abandon every pending command.
    ///
    /// Once this returns no completion handler will start. Called from the
    /// worker thread (inside a handler) it only flips the live flag, since
    /// the delivery gate is already held there.
    pub(crate) fn terminate(&self) {
        if thread::current().id() == self.worker {
            self.shared.live.store(false, Ordering::SeqCst);
        } else {
            let _gate = self
                .shared
                .delivery
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            self.shared.live.store(false, Ordering::SeqCst);
        }

        let abandoned = self.shared.abandon_pending();
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner).take();
        self.stdin.lock().unwrap_or_else(PoisonError::into_inner).take();

        #[cfg(unix)]
        kill_process_group(self.pid);

        if let Some(mut child) = self.child.lock().unwrap_or_else(PoisonError::into_inner).take() {
            if let Err(err) = child.kill() {
                debug!(pid = self.pid, error = %err, "kill failed");
            }
            let pid = self.pid;
            let reaper = thread::Builder::new()
                .name("bindercall-shell-reaper".into())
                .spawn(move || match child.wait() {
                    Ok(status) => trace!(pid, %status, "reaped shell"),
                    Err(err) => debug!(pid, error = %err, "failed to reap shell"),
                });
            if let Err(err) = reaper {
                warn!(pid, error = %err, "cannot spawn reaper thread");
            }
        }

        debug!(pid = self.pid, abandoned, "shell session terminated");
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) takes plain integers and touches no memory; the
    // negative pid addresses the process group created at spawn.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!(pid, error = %std::io::Error::last_os_error(), "process group kill failed");
    }
}

/// Prefix of the end-of-command marker, unique per session.
fn marker_prefix(pid: u32) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.subsec_nanos())
        .unwrap_or_default();
    format!("__bindercall_{pid}_{nanos:08x}")
}

struct Worker {
    stdout: BufReader<ChildStdout>,
    stdin: Arc<Mutex<Option<ChildStdin>>>,
    queue: Receiver<Job>,
    shared: Arc<Shared>,
    marker: String,
    sequence: u64,
}

impl Worker {
    fn run(mut self) {
        while let Ok(job) = self.queue.recv() {
            if !self.shared.live.load(Ordering::SeqCst) {
                break;
            }
            match self.execute(&job.command) {
                Ok((exit_code, output)) => self.deliver(job.reply, exit_code, output),
                Err(err) => {
                    debug!(error = %err, "shell session ended");
                    break;
                }
            }
        }
    }

    /// Write one command followed by a marker echo, then collect stdout up
    /// to the marker line.
    fn execute(&mut self, command: &str) -> Result<(i32, Vec<String>)> {
        self.sequence += 1;
        let marker = format!("{}_{}__", self.marker, self.sequence);
        {
            let mut stdin = self.stdin.lock().unwrap_or_else(PoisonError::into_inner);
            let stdin = stdin.as_mut().ok_or(ShellError::Exited)?;
            write!(stdin, "{command}\necho \"{marker} $?\"\n")?;
            stdin.flush()?;
        }

        let mut output = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            if self.stdout.read_line(&mut line)? == 0 {
                return Err(ShellError::Exited);
            }
            let text = line.trim_end_matches(['\n', '\r']);
            let Some(at) = text.find(&marker) else {
                output.push(text.to_string());
                continue;
            };
            // Output without a trailing newline shares the marker's line.
            if at > 0 {
                output.push(text[..at].to_string());
            }
            let status = text[at + marker.len()..].trim();
            let exit_code = status.parse().unwrap_or_else(|_| {
                warn!(status, "unparseable exit status");
                -1
            });
            return Ok((exit_code, output));
        }
    }

    fn deliver(&self, reply: Reply, exit_code: i32, output: Vec<String>) {
        match reply {
            Reply::Direct(sender) => {
                let _ = sender.send(Completion {
                    id: 0,
                    exit_code,
                    output,
                });
            }
            Reply::Handler(id) => {
                let _gate = self
                    .shared
                    .delivery
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                if !self.shared.live.load(Ordering::SeqCst) {
                    trace!(id, "channel stopped, dropping completion");
                    return;
                }
                let handler = self
                    .shared
                    .pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&id);
                match handler {
                    Some(handler) => {
                        trace!(id, exit_code, lines = output.len(), "delivering completion");
                        handler(Completion {
                            id,
                            exit_code,
                            output,
                        });
                    }
                    None => debug!(id, "no pending record for completion"),
                }
            }
        }
    }
}

impl Drop for Worker {
    // Runs on normal exit and on unwind out of a panicking handler.
    fn drop(&mut self) {
        self.shared.live.store(false, Ordering::SeqCst);
        let abandoned = self.shared.abandon_pending();
        if abandoned > 0 {
            debug!(abandoned, "worker exited with pending commands");
        }
    }
}
