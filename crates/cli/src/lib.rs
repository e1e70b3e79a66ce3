#![forbid(unsafe_code)]

//! Console control surface of lanshare.

pub mod cli;
pub mod console;
pub mod error;
pub mod settings;
pub mod signals;
pub mod throughput;

pub use console::{Console, ConsoleCommand, ConsoleSink, ParseError};
pub use error::Error;
