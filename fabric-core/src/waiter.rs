//! Waiter - Poll a remote object until it reaches a target status
//!
//! Long-running operations (provisioning, deprovisioning) are reconciled by
//! repeatedly refreshing the remote object and classifying its status as
//! pending, target, or unexpected.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use log::debug;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

/// Errors returned by [`StateWaiter::wait`]
#[derive(Debug, thiserror::Error)]
pub enum WaitError<E: std::error::Error + 'static> {
    /// The refresh function failed; never retried
    #[error("{0}")]
    Refresh(#[source] E),

    #[error("timeout while waiting for state to become '{}' (last state: '{}', timeout: {:?})",
        target.join(", "), last_status.as_deref().unwrap_or(""), timeout)]
    Timeout {
        timeout: Duration,
        target: Vec<String>,
        last_status: Option<String>,
    },

    #[error("unexpected state '{status}', wanted target '{}'", target.join(", "))]
    UnexpectedState { status: String, target: Vec<String> },

    #[error("wait cancelled")]
    Cancelled,
}

/// Configuration of a wait-for-state loop
#[derive(Debug, Clone)]
pub struct StateWaiter<S> {
    pub pending: Vec<S>,
    pub target: Vec<S>,
    pub timeout: Duration,
    /// Wait before the first refresh
    pub delay: Duration,
    /// Wait between refreshes
    pub interval: Duration,
}

impl<S> StateWaiter<S>
where
    S: PartialEq + fmt::Display,
{
    pub fn new(pending: Vec<S>, target: Vec<S>) -> Self {
        Self {
            pending,
            target,
            timeout: Duration::from_secs(300),
            delay: Duration::ZERO,
            interval: Duration::from_secs(2),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    fn target_names(&self) -> Vec<String> {
        self.target.iter().map(|s| s.to_string()).collect()
    }

    /// Refresh until the status is in `target`.
    ///
    /// Returns the object from the refresh that observed a target status.
    pub async fn wait<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut refresh: F,
    ) -> Result<T, WaitError<E>>
    where
        E: std::error::Error + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(T, S), E>>,
    {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut next_poll = started + self.delay;
        let mut last_status: Option<String> = None;
        let mut polls: u32 = 0;

        loop {
            if next_poll > deadline {
                self.sleep_until(deadline, cancel).await?;
                return Err(self.timed_out(last_status));
            }
            self.sleep_until(next_poll, cancel).await?;

            let (object, status) = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(WaitError::Cancelled),
                _ = sleep_until(deadline) => return Err(self.timed_out(last_status)),
                result = refresh() => result.map_err(WaitError::Refresh)?,
            };
            polls += 1;

            if self.target.contains(&status) {
                debug!("reached state '{}' after {} poll(s)", status, polls);
                return Ok(object);
            }
            if !self.pending.contains(&status) {
                return Err(WaitError::UnexpectedState {
                    status: status.to_string(),
                    target: self.target_names(),
                });
            }

            debug!(
                "waiting for state to become '{}', currently '{}'",
                self.target_names().join(", "),
                status
            );
            last_status = Some(status.to_string());
            next_poll = Instant::now() + self.interval;
        }
    }

    async fn sleep_until<E: std::error::Error + 'static>(
        &self,
        at: Instant,
        cancel: &CancellationToken,
    ) -> Result<(), WaitError<E>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(WaitError::Cancelled),
            _ = sleep_until(at) => Ok(()),
        }
    }

    fn timed_out<E: std::error::Error + 'static>(
        &self,
        last_status: Option<String>,
    ) -> WaitError<E> {
        WaitError::Timeout {
            timeout: self.timeout,
            target: self.target_names(),
            last_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, thiserror::Error)]
    #[error("refresh failed")]
    struct RefreshFailed;

    fn waiter() -> StateWaiter<&'static str> {
        StateWaiter::new(vec!["PROVISIONING"], vec!["PROVISIONED"])
            .timeout(Duration::from_secs(60))
            .interval(Duration::from_secs(2))
    }

    #[tokio::test(start_paused = true)]
    async fn returns_after_exactly_n_polls() {
        let calls = Arc::new(AtomicU32::new(0));
        let started = Instant::now();

        let result = waiter()
            .wait(&CancellationToken::new(), || {
                let calls = calls.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    let status = if n < 4 { "PROVISIONING" } else { "PROVISIONED" };
                    Ok::<_, RefreshFailed>((n, status))
                }
            })
            .await
            .unwrap();

        assert_eq!(result, 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(started.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn delay_precedes_first_poll() {
        let started = Instant::now();
        let elapsed_at_first_poll = waiter()
            .delay(Duration::from_secs(5))
            .wait(&CancellationToken::new(), || async move {
                Ok::<_, RefreshFailed>((started.elapsed(), "PROVISIONED"))
            })
            .await
            .unwrap();

        assert!(elapsed_at_first_poll >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_at_deadline_not_before() {
        let started = Instant::now();
        let err = waiter()
            .wait(&CancellationToken::new(), || async {
                Ok::<_, RefreshFailed>(((), "PROVISIONING"))
            })
            .await
            .unwrap_err();

        assert!(started.elapsed() >= Duration::from_secs(60));
        match err {
            WaitError::Timeout { last_status, .. } => {
                assert_eq!(last_status.as_deref(), Some("PROVISIONING"));
            }
            other => panic!("Expected Timeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_status_fails_immediately() {
        let calls = AtomicU32::new(0);
        let err = waiter()
            .wait(&CancellationToken::new(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, RefreshFailed>(((), "DEPROVISIONED")) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(
            matches!(err, WaitError::UnexpectedState { ref status, .. } if status == "DEPROVISIONED")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let err = waiter()
            .wait(&CancellationToken::new(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<((), &str), _>(RefreshFailed) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, WaitError::Refresh(RefreshFailed)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_aborts_promptly() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = waiter()
            .wait(&cancel, || async { Ok::<_, RefreshFailed>(((), "PROVISIONING")) })
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(60));
    }
}
