//! Retry policy with exponential backoff, jitter and rate-limit waits.
//!
//! Every outbound GitHub call runs through [`retry`]. The policy is a plain
//! value so tests can shrink every delay to zero.

use std::time::{Duration, Instant};

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,

    /// Delay before the second attempt.
    pub initial_delay: Duration,

    /// Maximum delay between attempts.
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (e.g., 2.0 = double each time).
    pub backoff_multiplier: f64,

    /// Whether to add up to 25% jitter to delays.
    pub jitter: bool,

    /// Courtesy delay inserted before every call.
    pub throttle: Duration,

    /// Timeout for each individual attempt.
    pub attempt_timeout: Duration,

    /// Shortest wait after a rate-limit response.
    pub rate_limit_floor: Duration,

    /// Consecutive rate-limit waits allowed before giving up.
    pub max_rate_limit_waits: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: false,
            throttle: Duration::from_millis(100),
            attempt_timeout: Duration::from_secs(30),
            rate_limit_floor: Duration::from_secs(60),
            max_rate_limit_waits: 10,
        }
    }
}

impl RetryPolicy {
    /// Create a policy that keeps the attempt budget but never sleeps.
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            throttle: Duration::ZERO,
            rate_limit_floor: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Calculate the delay to sleep after the given failed attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32 - 1);
        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.jitter {
            let jitter_factor = 1.0 + (rand_jitter() * 0.25);
            capped_delay * jitter_factor
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }

    /// Wait until a rate-limit window resets, never less than the floor.
    ///
    /// `reset_at` and `now` are epoch seconds.
    pub fn rate_limit_delay(&self, reset_at: Option<i64>, now: i64) -> Duration {
        let until_reset = reset_at.map_or(0, |reset| (reset - now).max(0)) as u64;
        Duration::from_secs(until_reset).max(self.rate_limit_floor)
    }
}

/// Simple pseudo-random jitter (0.0 to 1.0) without external deps.
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as f64 / 1000.0
}

/// Classification of a single attempt.
#[derive(Debug)]
pub enum Attempt<T, E> {
    /// The operation succeeded.
    Success(T),
    /// The operation failed and must not be retried.
    Fatal(E),
    /// The operation failed and may succeed on another attempt.
    Transient(E),
    /// The server asked us to slow down; wait and retry without spending an attempt.
    Throttled { wait: Duration, error: E },
}

/// Why a retried operation ultimately failed.
#[derive(Debug)]
pub enum RetryError<E> {
    /// A non-retryable failure.
    Fatal(E),
    /// Every attempt failed with a transient error; holds the last one.
    Exhausted { attempts: u32, last: E },
    /// Too many consecutive rate-limit waits; holds the last response error.
    Throttled { waits: u32, last: E },
}

/// Result of a retry operation.
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// The final result (success or the reason for giving up).
    pub result: Result<T, RetryError<E>>,

    /// Number of attempts made (rate-limit waits not included).
    pub attempts: u32,

    /// Number of rate-limit waits performed.
    pub rate_limit_waits: u32,

    /// Total time spent (including delays).
    pub total_time: Duration,
}

impl<T, E> RetryResult<T, E> {
    /// Check if the operation succeeded.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Whether more than one attempt was made.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Get the result.
    pub fn into_result(self) -> Result<T, RetryError<E>> {
        self.result
    }
}

/// Run `operation` under `policy`.
///
/// The closure receives the 1-based attempt number. The courtesy throttle is
/// slept before every call, including calls that follow a rate-limit wait.
pub fn retry<T, E, F>(policy: &RetryPolicy, mut operation: F) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Attempt<T, E>,
{
    let start = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;
    let mut rate_limit_waits = 0;
    let mut consecutive_waits = 0;

    let result = loop {
        if !policy.throttle.is_zero() {
            std::thread::sleep(policy.throttle);
        }

        match operation(attempts + 1) {
            Attempt::Success(value) => {
                attempts += 1;
                break Ok(value);
            }
            Attempt::Fatal(error) => {
                attempts += 1;
                break Err(RetryError::Fatal(error));
            }
            Attempt::Transient(error) => {
                attempts += 1;
                consecutive_waits = 0;
                if attempts >= max_attempts {
                    break Err(RetryError::Exhausted { attempts, last: error });
                }
                std::thread::sleep(policy.delay_for_attempt(attempts));
            }
            Attempt::Throttled { wait, error } => {
                if consecutive_waits >= policy.max_rate_limit_waits {
                    break Err(RetryError::Throttled { waits: consecutive_waits, last: error });
                }
                consecutive_waits += 1;
                rate_limit_waits += 1;
                std::thread::sleep(wait);
            }
        }
    };

    RetryResult { result, attempts, rate_limit_waits, total_time: start.elapsed() }
}
