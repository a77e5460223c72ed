use serde::{Deserialize, Serialize};
use std::time::Duration;

const MAX_EXPONENT: u32 = 32;

/// Delay schedule between attempts. `attempt` is the 1-based number of the
/// attempt that just failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// `multiplier * 2^(attempt - 1)` seconds clamped to `[min_secs, max_secs]`.
    Exponential {
        multiplier: u64,
        min_secs: u64,
        max_secs: u64,
    },
    /// `base_secs * 2^(attempt - 1)` seconds.
    Doubling { base_secs: u64 },
}

impl Backoff {
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(MAX_EXPONENT);
        let factor = 2u64.saturating_pow(exp);
        match *self {
            Backoff::Exponential {
                multiplier,
                min_secs,
                max_secs,
            } => {
                let secs = multiplier.saturating_mul(factor);
                Duration::from_secs(secs.min(max_secs).max(min_secs))
            }
            Backoff::Doubling { base_secs } => {
                Duration::from_secs(base_secs.saturating_mul(factor))
            }
        }
    }
}
