use std::time::Duration;

use rand::Rng;

use crate::error::config::ConfigError;

/// Closed range the pre-signal delay is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: Duration,
    max: Duration,
}

impl DelayRange {
    /// Creates a range, rejecting `min > max`.
    pub fn new(min: Duration, max: Duration) -> Result<Self, ConfigError> {
        if min > max {
            return Err(ConfigError::InvalidDelayRange {
                min_ms: min.as_millis() as u64,
                max_ms: max.as_millis() as u64,
            });
        }
        Ok(Self { min, max })
    }

    /// A degenerate range that always yields `delay`.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            min: delay,
            max: delay,
        }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    /// Draws a delay uniformly from `[min, max]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        rng.random_range(self.min..=self.max)
    }

    pub fn contains(&self, delay: Duration) -> bool {
        self.min <= delay && delay <= self.max
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(1),
            max: Duration::from_secs(4),
        }
    }
}
