use std::time::Duration;

use crate::error::{Result, ViewError};

/// Tuning knobs for a [`LeaseMonitor`](crate::LeaseMonitor).
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    /// Period of the clock ticker that refreshes labels and sweeps dead leases.
    pub tick_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval == Duration::from_millis(0) {
            return Err(ViewError::Config("tick_interval must be > 0"));
        }
        Ok(())
    }
}
