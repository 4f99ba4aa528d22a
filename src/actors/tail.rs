//! LogTailActor - keeps a crash-resilient `tail -f` on one log file
//!
//! The actor owns the lifecycle of a single streaming subprocess per
//! monitored log file. It never re-reads historical content (`tail -n 0`),
//! hands every new line to the source's parser and forwards matches to the
//! dispatcher. Whatever happens to the stream - the process dying, both pipes
//! going quiet, a read error - the actor tears the stream down and starts a
//! fresh one. The task itself exits only on an explicit shutdown command.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, instrument, trace, warn};

use crate::config::{SourceConfig, Tuning};
use crate::dispatch::AlertDispatcher;
use crate::parsers::LineParser;
use crate::{AlertCategory, actors::messages::TailCommand};

/// Wait on the exited child before declaring the stream stalled.
const STALL_WAIT: Duration = Duration::from_millis(250);

/// Grace window between SIGTERM and SIGKILL during shutdown.
const TERM_WAIT: Duration = Duration::from_secs(2);

/// Final wait after SIGKILL.
const KILL_WAIT: Duration = Duration::from_secs(1);

/// A log file plus its parser and alert category. Fixed at startup.
#[derive(Debug, Clone)]
pub struct MonitoredSource {
    pub path: PathBuf,
    pub category: AlertCategory,
    pub parser: LineParser,
}

impl MonitoredSource {
    pub fn from_config(config: &SourceConfig) -> Self {
        Self {
            path: config.path.clone(),
            category: config.category,
            parser: config.parser.build(),
        }
    }
}

/// How one streaming attempt ended.
enum StreamEnd {
    /// Shutdown command received; stream already torn down.
    Shutdown,
    /// The tail process exited (any status). Restart right away.
    Exited,
    /// Both pipes hit EOF but the process still looks alive. Restart anyway.
    Stalled,
    /// Spawn or read failure. Restart after the read-error backoff.
    Failed(std::io::Error),
}

/// Actor that supervises the tail stream for a single monitored source.
pub struct LogTailActor {
    source: MonitoredSource,
    dispatcher: AlertDispatcher,
    missing_retry: Duration,
    read_error_retry: Duration,
    command_rx: mpsc::Receiver<TailCommand>,
}

impl LogTailActor {
    pub fn new(
        source: MonitoredSource,
        dispatcher: AlertDispatcher,
        tuning: &Tuning,
        command_rx: mpsc::Receiver<TailCommand>,
    ) -> Self {
        Self {
            source,
            dispatcher,
            missing_retry: Duration::from_secs(tuning.missing_retry_secs),
            read_error_retry: Duration::from_secs(tuning.read_error_retry_secs),
            command_rx,
        }
    }

    /// Run the actor's main loop: existence check, stream, restart, forever.
    #[instrument(skip(self), fields(path = %self.source.path.display(), category = %self.source.category))]
    pub async fn run(mut self) {
        debug!("starting log tail supervisor");

        loop {
            // missing file and permission errors are the same transient
            // condition: back off and look again
            if let Err(e) = std::fs::File::open(&self.source.path) {
                debug!("log file not readable ({e}), retrying in {:?}", self.missing_retry);
                if self.wait_or_shutdown(self.missing_retry).await {
                    break;
                }
                continue;
            }

            match self.stream_once().await {
                StreamEnd::Shutdown => break,
                StreamEnd::Exited => {
                    warn!("tail process exited, restarting stream");
                }
                StreamEnd::Stalled => {
                    warn!("both pipes closed while process alive, restarting stream");
                }
                StreamEnd::Failed(e) => {
                    error!("stream failed ({e}), restarting in {:?}", self.read_error_retry);
                    if self.wait_or_shutdown(self.read_error_retry).await {
                        break;
                    }
                }
            }
        }

        debug!("log tail supervisor stopped");
    }

    /// Spawn one tail subprocess and drain it until it ends one way or
    /// another.
    async fn stream_once(&mut self) -> StreamEnd {
        let mut child = match Command::new("tail")
            .arg("-n")
            .arg("0")
            .arg("-f")
            .arg(&self.source.path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return StreamEnd::Failed(e),
        };

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return StreamEnd::Failed(std::io::Error::other("tail pipes not captured"));
        };

        trace!("tail stream started (pid {:?})", child.id());

        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();
        let mut stdout_open = true;
        let mut stderr_open = true;

        loop {
            if !stdout_open && !stderr_open {
                // both pipes EOF: either the process is gone (normal restart)
                // or the pipes stalled underneath a live process. A restart is
                // safe in both cases, the timed wait only picks the log line.
                return match timeout(STALL_WAIT, child.wait()).await {
                    Ok(Ok(status)) => {
                        debug!("tail exited with {status}");
                        StreamEnd::Exited
                    }
                    Ok(Err(e)) => StreamEnd::Failed(e),
                    Err(_) => StreamEnd::Stalled,
                };
            }

            tokio::select! {
                line = stdout_lines.next_line(), if stdout_open => match line {
                    Ok(Some(line)) => self.handle_line(&line).await,
                    Ok(None) => stdout_open = false,
                    Err(e) => return StreamEnd::Failed(e),
                },

                line = stderr_lines.next_line(), if stderr_open => match line {
                    // diagnostic channel is logged, never alerted on
                    Ok(Some(line)) => warn!("tail stderr: {line}"),
                    Ok(None) => stderr_open = false,
                    Err(e) => return StreamEnd::Failed(e),
                },

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(TailCommand::Shutdown) => debug!("received shutdown command"),
                        None => warn!("command channel closed, shutting down"),
                    }
                    drop(stdout_lines);
                    drop(stderr_lines);
                    Self::teardown(child).await;
                    return StreamEnd::Shutdown;
                }
            }
        }
    }

    /// Parse one primary-channel line and dispatch on a match. A line the
    /// parser cannot handle is simply not an event.
    async fn handle_line(&self, line: &str) {
        if let Some(message) = self.source.parser.parse(line) {
            trace!("matched line on {}", self.source.path.display());
            self.dispatcher.dispatch(&message, self.source.category).await;
        }
    }

    /// Best-effort bounded teardown: SIGTERM, wait, SIGKILL, wait, give up.
    async fn teardown(mut child: Child) {
        if let Ok(Some(status)) = child.try_wait() {
            trace!("tail already exited with {status}");
            return;
        }

        #[cfg(unix)]
        if let Some(pid) = child.id() {
            // SAFETY: pid comes from a child we own and is still running
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGTERM);
            }
        }

        if let Ok(Ok(status)) = timeout(TERM_WAIT, child.wait()).await {
            trace!("tail terminated with {status}");
            return;
        }

        if let Err(e) = child.start_kill() {
            error!("failed to kill tail process: {e}");
            return;
        }

        match timeout(KILL_WAIT, child.wait()).await {
            Ok(Ok(status)) => trace!("tail killed with {status}"),
            Ok(Err(e)) => error!("failed waiting on killed tail process: {e}"),
            Err(_) => error!("tail process survived SIGKILL wait, abandoning it"),
        }
    }

    /// Sleep for `duration`, returning early (and `true`) when a shutdown
    /// command arrives.
    async fn wait_or_shutdown(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            cmd = self.command_rx.recv() => {
                match cmd {
                    Some(TailCommand::Shutdown) => debug!("received shutdown command during backoff"),
                    None => warn!("command channel closed during backoff"),
                }
                true
            }
        }
    }
}

/// Handle for controlling a spawned [`LogTailActor`]
#[derive(Clone)]
pub struct TailHandle {
    sender: mpsc::Sender<TailCommand>,
}

impl TailHandle {
    /// Spawn a tail actor for one monitored source.
    pub fn spawn(
        source: MonitoredSource,
        dispatcher: AlertDispatcher,
        tuning: &Tuning,
    ) -> (Self, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);

        let actor = LogTailActor::new(source, dispatcher, tuning, cmd_rx);
        let task = tokio::spawn(actor.run());

        (Self { sender: cmd_tx }, task)
    }

    /// Request a graceful stream teardown and task exit.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(TailCommand::Shutdown).await;
    }
}
