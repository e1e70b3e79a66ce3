use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::time::Duration;

/// Polling cadence of the control surface. The supervisor never pushes;
/// everything is pulled on these timers.
#[serde_as]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Control {
    /// Status and connected-IP refresh. **Measured in milliseconds**.
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub status_interval: Duration,

    /// Log queue drain. **Measured in milliseconds**.
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub log_interval: Duration,
}

impl Default for Control {
    fn default() -> Self {
        Self {
            status_interval: Duration::from_millis(1500),
            log_interval: Duration::from_millis(50),
        }
    }
}

impl Control {
    /// Intervals of zero would spin the control loop.
    pub fn clamp(self) -> Self {
        const FLOOR: Duration = Duration::from_millis(10);
        Self {
            status_interval: self.status_interval.max(FLOOR),
            log_interval: self.log_interval.max(FLOOR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn clamp_keeps_intervals_positive(status in 0u64..5_000, log in 0u64..5_000) {
            let control = Control {
                status_interval: Duration::from_millis(status),
                log_interval: Duration::from_millis(log),
            }
            .clamp();
            prop_assert!(control.status_interval >= Duration::from_millis(10));
            prop_assert!(control.log_interval >= Duration::from_millis(10));
            prop_assert!(control.status_interval >= Duration::from_millis(status));
        }
    }
}
