#![forbid(unsafe_code)]

//! HTTP file server of lanshare, run as a child process of the supervisor.
//!
//! Serves the regular files of one folder to the local network. Every client
//! address is appended once per run to the connected-IP log, and addresses
//! in the blocklist are refused.

pub mod error;
mod routes;
mod share;

pub use error::Error;
pub use routes::router;
pub use share::{FILES_PLACEHOLDER, Share};
