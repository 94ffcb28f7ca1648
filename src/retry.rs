use std::future::Future;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::error::AdapterError;

/// Exponential backoff policy with jitter. Matches the schedule used by the
/// schema service and HTTP download clients: start at 500 ms, grow by 1.5,
/// cap intervals at 10 s and give up after 2 minutes.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub initial_interval: Duration,
    pub randomization_factor: f64,
    pub multiplier: f64,
    pub max_interval: Duration,
    pub max_elapsed: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff {
            initial_interval: Duration::from_millis(500),
            randomization_factor: 0.5,
            multiplier: 1.5,
            max_interval: Duration::from_secs(10),
            max_elapsed: Duration::from_secs(120),
        }
    }
}

impl Backoff {
    fn jittered(&self, interval: Duration) -> Duration {
        let delta = interval.as_secs_f64() * self.randomization_factor;
        let low = interval.as_secs_f64() - delta;
        let high = interval.as_secs_f64() + delta;
        Duration::from_secs_f64(rand::thread_rng().gen_range(low..=high))
    }
}

/// Failure of a retried operation. Transient failures are retried under the
/// policy; permanent ones stop the loop immediately.
#[derive(Debug)]
pub enum RetryError {
    Permanent(AdapterError),
    Transient(AdapterError),
}

impl RetryError {
    fn into_inner(self) -> AdapterError {
        match self {
            RetryError::Permanent(err) | RetryError::Transient(err) => err,
        }
    }
}

/// Runs `op` until it succeeds, fails permanently, exhausts the policy or the
/// token is cancelled.
pub async fn retry<T, F, Fut>(
    policy: &Backoff,
    token: &CancellationToken,
    mut op: F,
) -> Result<T, AdapterError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryError>>,
{
    let started = Instant::now();
    let mut interval = policy.initial_interval;
    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(RetryError::Permanent(err)) => return Err(err),
            Err(RetryError::Transient(err)) => err,
        };
        if started.elapsed() >= policy.max_elapsed {
            return Err(err);
        }
        let wait = policy.jittered(interval);
        tokio::select! {
            _ = token.cancelled() => return Err(err),
            _ = tokio::time::sleep(wait) => {}
        }
        interval = Duration::from_secs_f64(
            (interval.as_secs_f64() * policy.multiplier).min(policy.max_interval.as_secs_f64()),
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn fast_policy() -> Backoff {
        Backoff {
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(5),
            max_elapsed: Duration::from_millis(250),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let attempts = AtomicUsize::new(0);
        let token = CancellationToken::new();
        let result = retry(&fast_policy(), &token, || async {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(RetryError::Transient(AdapterError::Handler("boom".into())))
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_stop_immediately() {
        let attempts = AtomicUsize::new(0);
        let token = CancellationToken::new();
        let result: Result<(), _> = retry(&fast_policy(), &token, || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(RetryError::Permanent(AdapterError::Handler("no".into())))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop() {
        let token = CancellationToken::new();
        token.cancel();
        let result: Result<(), _> = retry(&fast_policy(), &token, || async {
            Err(RetryError::Transient(AdapterError::Handler("slow".into())))
        })
        .await;
        assert!(result.is_err());
    }
}
