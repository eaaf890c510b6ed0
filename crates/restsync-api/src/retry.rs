// Retry policy for transient transport failures and 5xx responses.

use std::time::Duration;

use crate::error::Error;

/// Exponential backoff configuration.
///
/// The default performs no retries.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub min_wait: Duration,
    /// Upper bound on any single delay.
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            min_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Reject inverted wait bounds.
    pub fn validate(&self) -> Result<(), Error> {
        if self.min_wait > self.max_wait {
            return Err(Error::Build {
                message: format!(
                    "retry min_wait ({:?}) must not exceed max_wait ({:?})",
                    self.min_wait, self.max_wait
                ),
            });
        }
        Ok(())
    }

    /// Whether `attempt` (0-indexed retry count so far) may be followed by another try.
    pub fn should_retry(&self, attempt: u32, err: &Error) -> bool {
        attempt < self.max_retries && err.is_retryable()
    }

    /// `min_wait * 2^attempt`, capped at `max_wait`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.min_wait.as_secs_f64() * 2.0_f64.powi(i32::try_from(attempt).unwrap_or(i32::MAX));
        let capped = base.min(self.max_wait.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            min_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(5),
        }
    }

    #[test]
    fn backoff_doubles_until_capped() {
        let p = policy();
        assert_eq!(p.backoff(0), Duration::from_secs(1));
        assert_eq!(p.backoff(1), Duration::from_secs(2));
        assert_eq!(p.backoff(2), Duration::from_secs(4));
        assert_eq!(p.backoff(3), Duration::from_secs(5));
        assert_eq!(p.backoff(40), Duration::from_secs(5));
    }

    #[test]
    fn inverted_bounds_are_invalid() {
        let p = RetryPolicy {
            min_wait: Duration::from_secs(10),
            max_wait: Duration::from_secs(1),
            ..policy()
        };
        assert!(p.validate().is_err());
        assert!(policy().validate().is_ok());
    }

    #[test]
    fn retries_stop_at_limit_and_skip_client_errors() {
        let p = policy();
        let unavailable = Error::HttpStatus {
            status: 503,
            body: String::new(),
        };
        let missing = Error::HttpStatus {
            status: 404,
            body: String::new(),
        };
        assert!(p.should_retry(0, &unavailable));
        assert!(p.should_retry(2, &unavailable));
        assert!(!p.should_retry(3, &unavailable));
        assert!(!p.should_retry(0, &missing));
        assert!(!RetryPolicy::default().should_retry(0, &unavailable));
    }
}
