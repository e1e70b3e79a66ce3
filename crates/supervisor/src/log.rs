#![forbid(unsafe_code)]

use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Which pipe of the server process a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Out,
    Err,
}

impl Stream {
    pub fn tag(self) -> &'static str {
        match self {
            Stream::Out => "OUT",
            Stream::Err => "ERR",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One non-empty, trimmed line of server output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub stream: Stream,
    pub text: String,
}

impl LogMessage {
    pub fn new(stream: Stream, text: impl Into<String>) -> Self {
        Self {
            stream,
            text: text.into(),
        }
    }
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stream, self.text)
    }
}

/// What a [`LogSink`] receives: server output, or a lifecycle notice from the
/// supervisor itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    Notice(String),
    Output(LogMessage),
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEvent::Notice(text) => f.write_str(text),
            LogEvent::Output(message) => message.fmt(f),
        }
    }
}

/// Registration point for whoever renders the server log.
///
/// Called on the control task only, from `drain_log_queue` and from the
/// lifecycle operations.
pub trait LogSink: Send + Sync {
    fn emit(&self, event: LogEvent);
}

impl<T: LogSink + ?Sized> LogSink for Arc<T> {
    fn emit(&self, event: LogEvent) {
        (**self).emit(event)
    }
}

impl<T: LogSink + ?Sized> LogSink for Box<T> {
    fn emit(&self, event: LogEvent) {
        (**self).emit(event)
    }
}

/// Default sink: renders everything through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, event: LogEvent) {
        match event {
            LogEvent::Notice(text) => info!(target: "lanshare::supervisor", "{text}"),
            LogEvent::Output(LogMessage { stream, text }) => {
                info!(target: "lanshare::server", stream = stream.tag(), "{text}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_lines_carry_stream_tag() {
        let out = LogEvent::Output(LogMessage::new(Stream::Out, "hello"));
        let err = LogEvent::Output(LogMessage::new(Stream::Err, "listening on 0.0.0.0:8000"));
        let notice = LogEvent::Notice("Server stopped.".into());

        assert_eq!(out.to_string(), "[OUT] hello");
        assert_eq!(err.to_string(), "[ERR] listening on 0.0.0.0:8000");
        assert_eq!(notice.to_string(), "Server stopped.");
    }
}
