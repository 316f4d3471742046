//! Condition polling
//!
//! Transient UI states (theme transition, smooth scroll, viewer fetch) are
//! awaited by polling an observable condition under an upper bound instead
//! of sleeping for a fixed interval.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::trace;

use crate::error::{E2eError, E2eResult};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WaitConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

/// Poll until `check` yields a value. Retryable errors count as "not yet";
/// any other error aborts the wait.
pub async fn until_some<T, F, Fut>(config: WaitConfig, what: &str, mut check: F) -> E2eResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<Option<T>>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;
    let mut last_error: Option<E2eError> = None;

    loop {
        attempts = attempts.saturating_add(1);
        match check().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(e) if e.is_retryable() => last_error = Some(e),
            Err(e) => return Err(e),
        }

        if start.elapsed() >= config.timeout {
            let detail = last_error
                .map(|e| format!(" (last error: {})", e))
                .unwrap_or_default();
            return Err(E2eError::Timeout(format!(
                "{} after {} attempts in {:?}{}",
                what, attempts, config.timeout, detail
            )));
        }

        trace!(what, attempts, "condition not met yet");
        sleep(config.interval).await;
    }
}

/// Poll until `check` returns `true`
pub async fn until<F, Fut>(config: WaitConfig, what: &str, mut check: F) -> E2eResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<bool>>,
{
    until_some(config, what, || {
        let fut = check();
        async move { fut.await.map(|ok| ok.then_some(())) }
    })
    .await
}

/// Repeat an action while it fails with a retryable error. The final
/// retryable error is returned unchanged once the bound is exhausted.
pub async fn retry_action<T, F, Fut>(config: WaitConfig, mut action: F) -> E2eResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = E2eResult<T>>,
{
    let start = Instant::now();
    loop {
        match action().await {
            Err(e) if e.is_retryable() && start.elapsed() < config.timeout => {
                sleep(config.interval).await;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> WaitConfig {
        WaitConfig {
            timeout: Duration::from_millis(200),
            interval: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_until_returns_once_condition_holds() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        until(fast(), "third call", || async move {
            Ok(calls.fetch_add(1, Ordering::SeqCst) >= 2)
        })
        .await
        .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_until_times_out() {
        let err = until(fast(), "never", || async { Ok(false) }).await.unwrap_err();
        assert!(matches!(err, E2eError::Timeout(ref m) if m.starts_with("never")));
    }

    #[tokio::test]
    async fn test_hard_error_aborts_wait() {
        let err = until(fast(), "boom", || async { Err(E2eError::Browser("gone".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::Browser(_)));
    }

    #[tokio::test]
    async fn test_retry_action_surfaces_last_not_ready() {
        let err = retry_action(fast(), || async {
            Err::<(), _>(E2eError::not_ready("testid=missing", "no element"))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, E2eError::ElementNotReady { .. }));
    }

    #[tokio::test]
    async fn test_retry_action_recovers() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let value = retry_action(fast(), || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(E2eError::not_ready("testid=late", "hidden"))
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
    }
}
