#![forbid(unsafe_code)]

//! Lifecycle management of the lanshare file server process.
//!
//! The [`Supervisor`] spawns the server with its output piped, pumps both
//! pipes into a queue from two reader tasks, and exposes pull-style queries
//! for a control surface that polls on its own timers.

pub mod command;
pub mod error;
pub mod log;
mod reader;
mod session;
pub mod status;
mod supervisor;

pub use command::{SERVER_BINARY, ServerCommand};
pub use error::Error;
pub use log::{LogEvent, LogMessage, LogSink, Stream, TracingSink};
pub use status::ServerStatus;
pub use supervisor::{Supervisor, Timings};
