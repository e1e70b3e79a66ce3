#![forbid(unsafe_code)]

use crate::command::ServerCommand;
use crate::log::{LogEvent, LogMessage, LogSink, TracingSink};
use crate::session::{Session, Termination};
use crate::status::{ServerStatus, describe_exit};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use store::SettingsStore;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

/// Time limits of the server lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Delay between spawn and the liveness check of `start`.
    pub grace_period: Duration,
    /// Wait for a graceful exit before `stop` kills.
    pub stop_timeout: Duration,
    /// Wait for pipe readers once the child is gone.
    pub reader_join_timeout: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self::from(&config::Supervisor::default())
    }
}

impl From<&config::Supervisor> for Timings {
    fn from(config: &config::Supervisor) -> Self {
        Self {
            grace_period: config.grace_period,
            stop_timeout: config.stop_timeout,
            reader_join_timeout: config.reader_join_timeout,
        }
    }
}

/// Owns the file server process.
///
/// All methods run on the caller's task; the only concurrent parts are the
/// two pipe readers of the current session, which feed an unbounded queue
/// that [`Supervisor::drain_log_queue`] empties into the registered sink.
/// Nothing here returns an error: failures become a notice on the sink plus
/// a `false`, empty or `Stopped` result.
pub struct Supervisor {
    command: ServerCommand,
    timings: Timings,
    store: Arc<dyn SettingsStore>,
    served_folder: PathBuf,
    sink: Box<dyn LogSink>,
    queue_tx: UnboundedSender<LogMessage>,
    queue_rx: UnboundedReceiver<LogMessage>,
    session: Option<Session>,
}

impl Supervisor {
    pub fn new(
        command: ServerCommand,
        store: Arc<dyn SettingsStore>,
        served_folder: impl Into<PathBuf>,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        Self {
            command,
            timings: Timings::default(),
            store,
            served_folder: absolute(served_folder.into()),
            sink: Box::new(TracingSink),
            queue_tx,
            queue_rx,
            session: None,
        }
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Launch the server for the current served folder.
    ///
    /// Returns `true` only when the process is still alive after the grace
    /// period. Refuses to launch a second process while one is running.
    pub async fn start(&mut self) -> bool {
        match self.status() {
            ServerStatus::Running => {
                self.notice("Server is already running.");
                return false;
            }
            ServerStatus::Exited(_) => self.release_session().await,
            ServerStatus::Stopped => {}
        }

        if !self.served_folder.is_dir() {
            self.notice(format!(
                "Error: served folder is not a directory: {}",
                self.served_folder.display()
            ));
            return false;
        }

        self.notice("--- Server starting ---");
        self.store.clear_connected_ips();
        self.notice(format!("Starting server process: {}", self.command));
        self.notice(format!("Serving folder: {}", self.served_folder.display()));

        let mut session = match Session::spawn(&self.command, &self.served_folder, &self.queue_tx) {
            Ok(session) => session,
            Err(err) => {
                self.notice(format!("Error starting server: {err}"));
                return false;
            }
        };
        self.notice(format!(
            "Server process started (PID: {}).",
            display_pid(session.pid())
        ));

        tokio::time::sleep(self.timings.grace_period).await;

        let exited = match session.try_exit_status() {
            Ok(None) => {
                self.session = Some(session);
                self.notice("Server is running.");
                return true;
            }
            Ok(Some(status)) => describe_exit(status),
            Err(err) => {
                warn!(%err, "could not probe server process");
                if let Err(err) = session.terminate(self.timings.stop_timeout).await {
                    warn!(%err, "failed to terminate server process");
                }
                err.to_string()
            }
        };

        session.close(self.timings.reader_join_timeout).await;
        // the child's last words go out before the failure notice
        self.drain_log_queue();
        self.notice(format!(
            "Server failed to start or exited unexpectedly ({exited})."
        ));
        false
    }

    /// Stop the server: SIGTERM, then a kill once the stop timeout passes.
    ///
    /// A no-op when nothing is running. Returns only after the process is
    /// confirmed gone; the session is released whatever happens.
    pub async fn stop(&mut self) {
        let Some(mut session) = self.session.take() else {
            self.notice("Server process is not running.");
            return;
        };

        match session.try_exit_status() {
            Ok(Some(status)) => {
                self.notice(format!(
                    "Server process was already stopped ({}).",
                    describe_exit(status)
                ));
            }
            _ => {
                self.notice(format!(
                    "Attempting to stop server process (PID: {})...",
                    display_pid(session.pid())
                ));
                match session.terminate(self.timings.stop_timeout).await {
                    Ok(Termination::Graceful(status)) => {
                        debug!(exit = %describe_exit(status), "server exited");
                        self.notice("Server terminated gracefully.");
                    }
                    Ok(Termination::Killed(_)) => {
                        self.notice("Server did not terminate gracefully, killed.");
                    }
                    Err(err) => {
                        self.notice(format!("Error during server process termination: {err}"));
                    }
                }
            }
        }

        session.close(self.timings.reader_join_timeout).await;
        self.notice("Server stopped.");
    }

    /// Terminal call: stop the server and flush whatever output is queued.
    pub async fn shutdown(&mut self) {
        self.stop().await;
        self.drain_log_queue();
        self.notice("Supervisor shut down complete.");
    }

    /// Forward every queued output line to the sink, in arrival order.
    ///
    /// Never waits for more lines. Returns how many were forwarded.
    pub fn drain_log_queue(&mut self) -> usize {
        let mut forwarded = 0;
        while let Ok(message) = self.queue_rx.try_recv() {
            self.sink.emit(LogEvent::Output(message));
            forwarded += 1;
        }
        forwarded
    }

    /// Probe the child process. Never cached: a server that died between
    /// two polls reports `Exited` on the next one.
    pub fn status(&mut self) -> ServerStatus {
        let Some(session) = self.session.as_mut() else {
            return ServerStatus::Stopped;
        };
        match session.try_exit_status() {
            Ok(None) => ServerStatus::Running,
            Ok(Some(status)) => ServerStatus::Exited(status.code()),
            Err(err) => {
                warn!(%err, "could not probe server process");
                ServerStatus::Exited(None)
            }
        }
    }

    pub fn is_running(&mut self) -> bool {
        self.status().is_running()
    }

    pub fn pid(&self) -> Option<u32> {
        self.session.as_ref().and_then(Session::pid)
    }

    /// Folder the next `start` will serve.
    pub fn served_folder(&self) -> &Path {
        &self.served_folder
    }

    /// Choose the folder for the next start. Rejected while the server runs
    /// or when `folder` is not a directory. A relative `folder` is resolved
    /// against this process's working directory, not the server's.
    pub fn set_served_folder(&mut self, folder: impl Into<PathBuf>) -> bool {
        let folder = folder.into();
        if self.is_running() {
            self.notice("Cannot change folder while server is running. Stop server first.");
            return false;
        }
        if !folder.is_dir() {
            self.notice(format!(
                "Error: selected path is not a valid directory: {}",
                folder.display()
            ));
            return false;
        }
        let folder = absolute(folder);
        self.notice(format!(
            "Served folder set to: {}. Restart server to apply.",
            folder.display()
        ));
        self.served_folder = folder;
        true
    }

    /// Addresses the server has logged since it last started.
    pub fn connected_ips(&self) -> HashSet<String> {
        self.store.connected_ips()
    }

    async fn release_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.close(self.timings.reader_join_timeout).await;
        }
    }

    fn notice(&self, text: impl Into<String>) {
        self.sink.emit(LogEvent::Notice(text.into()));
    }
}

/// The child runs in another working directory, so it only ever sees
/// absolute folders.
fn absolute(folder: PathBuf) -> PathBuf {
    std::fs::canonicalize(&folder)
        .or_else(|_| std::path::absolute(&folder))
        .unwrap_or(folder)
}

fn display_pid(pid: Option<u32>) -> String {
    pid.map_or_else(|| "unknown".to_string(), |pid| pid.to_string())
}
