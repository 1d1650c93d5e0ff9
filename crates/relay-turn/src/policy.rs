use std::time::Duration;

/// Bounds and pacing of the run status poll loop
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay before the first status check
    pub interval: Duration,
    /// Ceiling for the backed-off delay
    pub max_interval: Duration,
    /// Multiplier applied to the delay after every check
    pub backoff_factor: f64,
    /// Maximum number of status checks
    pub max_attempts: u32,
    /// Maximum wall-clock time spent polling
    pub max_wait: Duration,
    /// Retries for transient errors on a single status check
    pub transient_retries: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(5),
            backoff_factor: 1.5,
            max_attempts: 600,
            max_wait: Duration::from_secs(600),
            transient_retries: 3,
        }
    }
}

impl PollPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constant interval, no backoff
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            max_interval: interval,
            backoff_factor: 1.0,
            ..Self::default()
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_transient_retries(mut self, retries: u32) -> Self {
        self.transient_retries = retries;
        self
    }

    /// Delay following `current`, grown by the backoff factor and capped
    pub fn next_delay(&self, current: Duration) -> Duration {
        // factors below 1 would shrink the delay towards a busy loop
        let factor = if self.backoff_factor.is_finite() {
            self.backoff_factor.max(1.0)
        } else {
            1.0
        };
        let grown = Duration::from_nanos((current.as_nanos() as f64 * factor).round() as u64);
        grown.min(self.max_interval.max(self.interval))
    }
}
