//! Bounded exponential backoff polling

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::config::SettlementConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Overall budget; no sleep is started that would end past it
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn from_config(config: &SettlementConfig) -> Self {
        Self {
            max_attempts: config.deposit_poll_max_attempts.max(1),
            initial_delay: Duration::from_millis(config.deposit_poll_initial_delay_ms),
            max_delay: Duration::from_millis(config.deposit_poll_max_delay_ms),
            timeout: Duration::from_millis(config.deposit_poll_timeout_ms),
        }
    }

    /// Delay after the `retry`-th failed probe (0-based), doubling up to `max_delay`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    Exhausted { attempts: u32 },
}

/// Call `probe` until it yields a value or the policy is exhausted.
/// A probe error ends polling immediately.
pub async fn poll_until<T, E, F, Fut>(policy: &PollPolicy, mut probe: F) -> Result<PollOutcome<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let started = Instant::now();
    let mut attempts = 0;
    loop {
        attempts += 1;
        if let Some(value) = probe().await? {
            return Ok(PollOutcome::Ready(value));
        }
        if attempts >= policy.max_attempts {
            break;
        }
        let delay = policy.delay_for(attempts - 1);
        if started.elapsed() + delay > policy.timeout {
            break;
        }
        debug!(attempt = attempts, delay_ms = delay.as_millis() as u64, "Poll not ready, backing off");
        tokio::time::sleep(delay).await;
    }
    Ok(PollOutcome::Exhausted { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32, timeout_ms: u64) -> PollPolicy {
        PollPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let p = PollPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(4000),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(p.delay_for(0), Duration::from_millis(500));
        assert_eq!(p.delay_for(1), Duration::from_millis(1000));
        assert_eq!(p.delay_for(3), Duration::from_millis(4000));
        assert_eq!(p.delay_for(40), Duration::from_millis(4000));
    }

    #[tokio::test]
    async fn test_ready_on_third_probe() {
        let calls = &AtomicU32::new(0);
        let outcome = poll_until(&policy(5, 1000), || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok::<_, ()>((n == 3).then_some(n))
        })
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::Ready(3));
    }

    #[tokio::test]
    async fn test_exhausts_after_max_attempts() {
        let calls = &AtomicU32::new(0);
        let outcome = poll_until(&policy(4, 1000), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<Option<()>, ()>(None)
        })
        .await
        .unwrap();

        assert_eq!(outcome, PollOutcome::Exhausted { attempts: 4 });
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_timeout_stops_before_attempt_bound() {
        let outcome = poll_until(&policy(1_000, 0), || async { Ok::<Option<()>, ()>(None) })
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Exhausted { attempts: 1 });
    }

    #[tokio::test]
    async fn test_probe_error_stops_polling() {
        let calls = &AtomicU32::new(0);
        let result: Result<PollOutcome<()>, &str> = poll_until(&policy(5, 1000), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("provider down")
        })
        .await;

        assert_eq!(result, Err("provider down"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
