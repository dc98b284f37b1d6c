use crate::error::{Error, Result};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Blocks the calling thread until a probe reports success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPoller {
    interval: Duration,
    timeout: Option<Duration>,
}

impl Default for ReadinessPoller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl ReadinessPoller {
    /// Polls forever at `interval`
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Calls `probe` until it returns true, sleeping `interval` between attempts.
    ///
    /// Without a timeout this only ever returns `Ok`.
    pub fn wait_until_running<F>(&self, mut probe: F) -> Result<()>
    where
        F: FnMut() -> bool,
    {
        let started = Instant::now();
        let mut attempts: u64 = 0;

        loop {
            attempts = attempts.saturating_add(1);
            if probe() {
                debug!("ready after {attempts} probe(s) in {:?}", started.elapsed());
                return Ok(());
            }

            if let Some(timeout) = self.timeout {
                let waited = started.elapsed();
                if waited >= timeout {
                    return Err(Error::ProbeTimeout { waited });
                }
            }

            thread::sleep(self.interval);
        }
    }
}
