use serde::{Deserialize, Serialize};
use std::time::Duration;

mod backoff;

pub use backoff::Backoff;

/// Blocking pause between attempts.
pub trait Sleep {
    fn sleep(&self, delay: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

#[derive(Debug)]
pub enum RetryFailure<E> {
    /// Every allowed attempt failed with a retryable error.
    Exhausted { attempts: u32, error: E },
    /// The predicate refused to retry this error.
    Rejected { attempt: u32, error: E },
}

impl<E> RetryFailure<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryFailure::Exhausted { attempts, .. } => *attempts,
            RetryFailure::Rejected { attempt, .. } => *attempt,
        }
    }

    pub fn into_error(self) -> E {
        match self {
            RetryFailure::Exhausted { error, .. } | RetryFailure::Rejected { error, .. } => error,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn fetch_default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Backoff::Exponential {
                multiplier: 1,
                min_secs: 4,
                max_secs: 10,
            },
        }
    }

    pub fn upload_default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Doubling { base_secs: 1 },
        }
    }

    /// Runs `op` until it succeeds, the predicate rejects an error, or the
    /// attempt budget is spent. `op` receives the 1-based attempt number.
    /// There is no sleep after the final attempt.
    pub fn run<T, E, F, P>(
        &self,
        sleeper: &dyn Sleep,
        mut op: F,
        is_retryable: P,
    ) -> Result<T, RetryFailure<E>>
    where
        F: FnMut(u32) -> Result<T, E>,
        P: Fn(&E) -> bool,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(error) if !is_retryable(&error) => {
                    return Err(RetryFailure::Rejected { attempt, error });
                }
                Err(error) if attempt >= max_attempts => {
                    return Err(RetryFailure::Exhausted {
                        attempts: attempt,
                        error,
                    });
                }
                Err(_) => {
                    sleeper.sleep(self.backoff.delay(attempt));
                    attempt += 1;
                }
            }
        }
    }
}
