#![forbid(unsafe_code)]

//! System-wide network throughput, sampled from the interface byte counters.

use crate::error::Error;
use std::fmt;
use std::iter::Sum;
use std::time::{Duration, Instant};
use tracing::debug;

/// Samples closer together than this only move the baseline.
pub const MIN_ELAPSED: Duration = Duration::from_millis(100);

/// Byte counters summed over every network interface.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NetCounters {
    pub sent: u64,
    pub received: u64,
}

impl Sum for NetCounters {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |total, counters| Self {
            sent: total.sent.saturating_add(counters.sent),
            received: total.received.saturating_add(counters.received),
        })
    }
}

/// Where the counters come from.
pub trait CounterSource: Send {
    fn read(&mut self) -> Result<NetCounters, Error>;
}

/// Counters of the running system, read from `/proc/net/dev`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCounters;

impl CounterSource for SystemCounters {
    #[cfg(target_os = "linux")]
    fn read(&mut self) -> Result<NetCounters, Error> {
        let devices = procfs::net::dev_status().map_err(|err| Error::NetCounters(err.into()))?;
        Ok(devices
            .values()
            .map(|device| NetCounters {
                sent: device.sent_bytes,
                received: device.recv_bytes,
            })
            .sum())
    }

    #[cfg(not(target_os = "linux"))]
    fn read(&mut self) -> Result<NetCounters, Error> {
        Err(Error::NetCountersUnsupported)
    }
}

/// Send and receive rates in megabits per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rate {
    pub send_mbps: f64,
    pub receive_mbps: f64,
}

impl Rate {
    /// Rate between two samples `elapsed` apart, or `None` when they are
    /// less than [`MIN_ELAPSED`] apart. A counter that went backwards (an
    /// interface reset) counts as no traffic.
    pub fn between(before: NetCounters, after: NetCounters, elapsed: Duration) -> Option<Self> {
        if elapsed <= MIN_ELAPSED {
            return None;
        }
        let seconds = elapsed.as_secs_f64();
        let mbps = |bytes: u64| (bytes as f64 * 8.0) / (1_000_000.0 * seconds);
        Some(Self {
            send_mbps: mbps(after.sent.saturating_sub(before.sent)),
            receive_mbps: mbps(after.received.saturating_sub(before.received)),
        })
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Send: {:.2} Mbps, Receive: {:.2} Mbps",
            self.send_mbps, self.receive_mbps
        )
    }
}

/// Latest result of the meter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Fewer than two usable samples so far.
    Pending,
    Rate(Rate),
    /// The last read of the counters failed.
    Unavailable,
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("measuring..."),
            Self::Rate(rate) => rate.fmt(f),
            Self::Unavailable => f.write_str("unavailable"),
        }
    }
}

pub struct ThroughputMeter {
    source: Box<dyn CounterSource>,
    baseline: Option<(NetCounters, Instant)>,
    reading: Reading,
}

impl ThroughputMeter {
    pub fn new(source: impl CounterSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            baseline: None,
            reading: Reading::Pending,
        }
    }

    pub fn reading(&self) -> Reading {
        self.reading
    }

    /// Read the counters and update the rate since the previous sample.
    pub fn sample(&mut self) -> Reading {
        self.sample_at(Instant::now())
    }

    fn sample_at(&mut self, now: Instant) -> Reading {
        match self.source.read() {
            Ok(counters) => {
                if let Some((before, at)) = self.baseline {
                    let elapsed = now.saturating_duration_since(at);
                    if let Some(rate) = Rate::between(before, counters, elapsed) {
                        self.reading = Reading::Rate(rate);
                    }
                } else if self.reading == Reading::Unavailable {
                    self.reading = Reading::Pending;
                }
                self.baseline = Some((counters, now));
            }
            Err(err) => {
                debug!(%err, "network counters unavailable");
                self.baseline = None;
                self.reading = Reading::Unavailable;
            }
        }
        self.reading
    }
}
