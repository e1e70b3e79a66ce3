#![forbid(unsafe_code)]

use std::fmt;
use std::process::ExitStatus;

/// Observable state of the server process, probed from the live child
/// handle on every query.
///
/// `Exited` carries the exit code, which is `None` when the process was
/// terminated by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Stopped,
    Running,
    Exited(Option<i32>),
}

impl ServerStatus {
    pub fn is_running(self) -> bool {
        self == ServerStatus::Running
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerStatus::Stopped => f.write_str("Stopped"),
            ServerStatus::Running => f.write_str("Running"),
            ServerStatus::Exited(Some(code)) => write!(f, "Exited ({code})"),
            ServerStatus::Exited(None) => f.write_str("Exited (signal)"),
        }
    }
}

/// Human readable exit cause, e.g. `exit code 3` or `signal 9`.
pub(crate) fn describe_exit(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exit code {code}");
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("signal {signal}");
        }
    }
    "unknown exit status".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_status_labels() {
        assert_eq!(ServerStatus::Stopped.to_string(), "Stopped");
        assert_eq!(ServerStatus::Running.to_string(), "Running");
        assert_eq!(ServerStatus::Exited(Some(1)).to_string(), "Exited (1)");
        assert_eq!(ServerStatus::Exited(None).to_string(), "Exited (signal)");
    }

    #[cfg(unix)]
    #[test]
    fn describe_exit_reports_code_or_signal() {
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(describe_exit(ExitStatus::from_raw(3 << 8)), "exit code 3");
        assert_eq!(describe_exit(ExitStatus::from_raw(9)), "signal 9");
    }
}
