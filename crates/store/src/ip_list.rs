#![forbid(unsafe_code)]

//! Line-oriented IP files: the blocklist and the connected-IP log.
//!
//! Both files hold one address per line. The blocklist additionally ignores
//! lines starting with `#`. Every operation opens, reads or writes, and closes
//! the file; nothing is cached, so the file server process and the control
//! surface always see each other's latest writes.

use crate::Error;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// Read the blocked addresses. Absent or unreadable files yield an empty set.
pub fn load_blocked_ips(path: &Path) -> HashSet<String> {
    read_set(path, true).unwrap_or_else(|err| {
        warn!(%err, "failed to read blocklist");
        HashSet::new()
    })
}

/// Append `ip` to the blocklist unless it is already there.
///
/// The current file contents are re-read first; returns `false` when the
/// address was already blocked or the append failed.
pub fn add_blocked_ip(path: &Path, ip: &str) -> bool {
    let ip = ip.trim();
    if ip.is_empty() || ip.starts_with('#') {
        warn!(ip, "refusing to block an empty or comment address");
        return false;
    }
    if load_blocked_ips(path).contains(ip) {
        debug!(ip, "address already blocked");
        return false;
    }
    match append_line(path, ip) {
        Ok(()) => true,
        Err(err) => {
            warn!(%err, "failed to append to blocklist");
            false
        }
    }
}

/// Remove `ip` from the blocklist.
///
/// Rewrites the whole file, keeping every other line (comments included)
/// verbatim. Assumes a single writer: the file server only ever reads this
/// file.
pub fn remove_blocked_ip(path: &Path, ip: &str) -> bool {
    let ip = ip.trim();
    if !load_blocked_ips(path).contains(ip) {
        debug!(ip, "address not in blocklist");
        return false;
    }
    match rewrite_without(path, ip) {
        Ok(()) => true,
        Err(err) => {
            warn!(%err, "failed to rewrite blocklist");
            false
        }
    }
}

/// Read the addresses logged since the server last started.
pub fn load_connected_ips(path: &Path) -> HashSet<String> {
    read_set(path, false).unwrap_or_else(|err| {
        warn!(%err, "failed to read connected-IP log");
        HashSet::new()
    })
}

/// Append `ip` to the connected-IP log. Deduplication within a server run
/// is the caller's job.
pub fn record_connected_ip(path: &Path, ip: &str) -> bool {
    match append_line(path, ip.trim()) {
        Ok(()) => true,
        Err(err) => {
            warn!(%err, "failed to append to connected-IP log");
            false
        }
    }
}

/// Truncate the connected-IP log.
pub fn clear_connected_ips(path: &Path) {
    if let Err(err) = fs::write(path, "").map_err(Error::io(path)) {
        warn!(%err, "could not clear connected-IP log");
    }
}

fn read_set(path: &Path, skip_comments: bool) -> Result<HashSet<String>, Error> {
    if !path.is_file() {
        return Ok(HashSet::new());
    }
    let text = fs::read_to_string(path).map_err(Error::io(path))?;
    Ok(parse_lines(&text, skip_comments).map(str::to_owned).collect())
}

fn parse_lines(text: &str, skip_comments: bool) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(move |line| !line.is_empty() && !(skip_comments && line.starts_with('#')))
}

fn append_line(path: &Path, line: &str) -> Result<(), Error> {
    // A hand-edited file may lack its final newline.
    let needs_separator = fs::read(path)
        .map(|bytes| bytes.last().is_some_and(|last| *last != b'\n'))
        .unwrap_or(false);

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(Error::io(path))?;
    let entry = if needs_separator {
        format!("\n{line}\n")
    } else {
        format!("{line}\n")
    };
    file.write_all(entry.as_bytes()).map_err(Error::io(path))
}

fn rewrite_without(path: &Path, ip: &str) -> Result<(), Error> {
    let text = fs::read_to_string(path).map_err(Error::io(path))?;
    let kept: String = text
        .split_inclusive('\n')
        .filter(|line| line.trim() != ip)
        .collect();
    fs::write(path, kept).map_err(Error::io(path))
}
