#![forbid(unsafe_code)]

use crate::command::ServerCommand;
use crate::error::Error;
use crate::log::{LogMessage, Stream};
use crate::reader::spawn_reader;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How a stop request ended.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Termination {
    Graceful(ExitStatus),
    Killed(ExitStatus),
}

/// One server run: the child process together with its two pipe readers and
/// their cancellation token. Created whole by [`Session::spawn`] and torn
/// down whole by [`Session::close`].
pub(crate) struct Session {
    child: Child,
    pid: Option<u32>,
    readers: [JoinHandle<()>; 2],
    cancel: CancellationToken,
}

impl Session {
    pub(crate) fn spawn(
        command: &ServerCommand,
        folder: &Path,
        queue: &UnboundedSender<LogMessage>,
    ) -> Result<Self, Error> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .env(&command.folder_env_var, folder)
            .current_dir(&command.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let mut child = cmd.spawn().map_err(Error::Spawn)?;
        let stdout = child.stdout.take().ok_or(Error::MissingPipe(Stream::Out))?;
        let stderr = child.stderr.take().ok_or(Error::MissingPipe(Stream::Err))?;

        let cancel = CancellationToken::new();
        let readers = [
            spawn_reader(stdout, Stream::Out, queue.clone(), cancel.clone()),
            spawn_reader(stderr, Stream::Err, queue.clone(), cancel.clone()),
        ];

        let pid = child.id();
        debug!(?pid, program = %command.program.display(), "server process spawned");
        Ok(Self {
            child,
            pid,
            readers,
            cancel,
        })
    }

    pub(crate) fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Non-blocking probe: `Some` once the child has exited.
    pub(crate) fn try_exit_status(&mut self) -> Result<Option<ExitStatus>, Error> {
        self.child.try_wait().map_err(Error::Wait)
    }

    /// Ask the child to exit, escalating to a kill after `timeout`.
    ///
    /// Returns only once the child is confirmed gone. The readers' token is
    /// cancelled first, so each reader ends after the line it is reading when
    /// the signal arrives.
    pub(crate) async fn terminate(&mut self, timeout: Duration) -> Result<Termination, Error> {
        self.cancel.cancel();

        if let Err(err) = self.request_exit() {
            warn!(%err, pid = ?self.pid, "graceful termination failed, killing");
            return self.kill().await;
        }

        let waited = time::timeout(timeout, self.child.wait()).await;
        match waited {
            Ok(status) => Ok(Termination::Graceful(status.map_err(Error::Wait)?)),
            Err(_) => {
                warn!(pid = ?self.pid, ?timeout, "server ignored termination request");
                self.kill().await
            }
        }
    }

    async fn kill(&mut self) -> Result<Termination, Error> {
        self.child.kill().await.map_err(Error::Wait)?;
        let status = self.child.wait().await.map_err(Error::Wait)?;
        Ok(Termination::Killed(status))
    }

    #[cfg(unix)]
    fn request_exit(&mut self) -> Result<(), Error> {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        // `id()` is `None` once the child has been reaped
        let Some(pid) = self.child.id() else {
            return Ok(());
        };
        match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    #[cfg(not(unix))]
    fn request_exit(&mut self) -> Result<(), Error> {
        self.child.start_kill().map_err(Error::Wait)
    }

    /// Wait for the readers and release the session.
    ///
    /// Readers end at end of stream, or after their next line once
    /// [`Session::terminate`] cancelled the token; output the child writes
    /// during a stop may be cut short. A descendant of the server may keep a
    /// pipe open; readers still running after `join_timeout` are aborted.
    pub(crate) async fn close(self, join_timeout: Duration) {
        let Session { child, pid, readers, .. } = self;

        let deadline = Instant::now() + join_timeout;
        for reader in readers {
            let abort = reader.abort_handle();
            if time::timeout_at(deadline, reader).await.is_err() {
                warn!(?pid, "pipe reader still blocked, aborting");
                abort.abort();
            }
        }
        drop(child);
    }
}
