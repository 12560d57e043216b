use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// High-level classification of an error for retry purposes.
///
/// Callers map HTTP status codes and transport failures into these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read).
    Timeout,
    /// Server asked us to slow down (e.g. 429, 503).
    Throttled,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// HTTP status that is retryable but not strictly throttling (5xx).
    Http5xx(u16),
    /// The feed id is no longer valid. Retryable once the feed is recreated.
    StaleFeed,
    /// Session expired. Retryable once the auth session is refreshed.
    Unauthorized,
    /// Any other transport error (not retried).
    Other,
    /// Not a transport fault at all (never retried).
    Unexpected,
}

impl ErrorKind {
    /// Whether a retry needs a side effect (feed recreation or auth refresh) first.
    pub fn needs_recovery(self) -> bool {
        matches!(self, ErrorKind::StaleFeed | ErrorKind::Unauthorized)
    }
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Shape of the delay curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Always `base_delay`.
    Fixed,
    /// `base_delay * attempt`.
    Linear,
    /// `base_delay * multiplier^(attempt-1)`.
    #[default]
    Exponential,
}

/// Randomization applied on top of the computed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Jitter {
    #[default]
    None,
    /// Uniform in `[0, delay]`.
    Full,
    /// `delay/2` plus uniform in `[0, delay/2]`.
    Equal,
}

impl Jitter {
    fn apply(self, delay: Duration) -> Duration {
        let ms = delay.as_millis() as u64;
        if ms == 0 {
            return delay;
        }
        let mut rng = rand::rng();
        match self {
            Jitter::None => delay,
            Jitter::Full => Duration::from_millis(rng.random_range(0..=ms)),
            Jitter::Equal => {
                let half = ms / 2;
                Duration::from_millis(half + rng.random_range(0..=half))
            }
        }
    }
}

/// Delay computation for a 1-based attempt number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub kind: BackoffKind,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Upper bound on backoff delay (applied before jitter).
    pub max_delay: Duration,
    /// Growth factor for `Exponential`.
    pub multiplier: f64,
    pub jitter: Jitter,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            kind: BackoffKind::Exponential,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(300),
            multiplier: 2.0,
            jitter: Jitter::None,
        }
    }
}

impl Backoff {
    /// No wait between attempts.
    pub fn none() -> Self {
        Self {
            kind: BackoffKind::Fixed,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter: Jitter::None,
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let n = attempt.max(1);
        let base = self.base_delay.as_secs_f64();
        let raw = match self.kind {
            BackoffKind::Fixed => base,
            BackoffKind::Linear => base * f64::from(n),
            BackoffKind::Exponential => base * self.multiplier.powi((n - 1).min(64) as i32),
        };
        let capped = if !raw.is_finite() || raw < 0.0 || raw > self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(raw)
        };
        self.jitter.apply(capped)
    }
}

/// Retry policy: attempt budget plus backoff.
///
/// Immutable once built; the poll loop and the feed lifecycle manager each
/// hold their own copy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first). `None` retries forever.
    pub max_attempts: Option<u32>,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(10),
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    /// Default backoff with no attempt limit (used for feed reads).
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            backoff: Backoff::default(),
        }
    }

    /// `max_attempts` attempts with no wait in between. `immediate(1)` means
    /// "try once, no retry".
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            backoff: Backoff::none(),
        }
    }

    /// Decide whether to retry after attempt number `attempt` failed with `kind`.
    ///
    /// `attempt` is 1-based (1 = first attempt). Returns `RetryDecision::NoRetry`
    /// when we should stop retrying.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if matches!(kind, ErrorKind::Other | ErrorKind::Unexpected) {
            return RetryDecision::NoRetry;
        }
        if let Some(max) = self.max_attempts {
            if attempt >= max {
                return RetryDecision::NoRetry;
            }
        }
        RetryDecision::RetryAfter(self.backoff.delay(attempt))
    }
}
