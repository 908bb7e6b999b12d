//! Polling primitive: the only way the pipeline synchronizes with rendering.
//!
//! There is no render-complete event to subscribe to, so every "wait until X
//! is on the page" is a bounded retry loop over a predicate. The clock is a
//! trait so tests can run timeouts without sleeping.

use async_trait::async_trait;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::core::error::{PipelineError, PipelineResult};
use crate::scraping::inspector::{PageInspector, Probe};

#[async_trait]
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin.
    fn elapsed(&self) -> Duration;
    async fn sleep(&self, d: Duration);
}

/// Wall clock backed by `tokio::time`.
#[derive(Debug, Clone)]
pub struct TokioClock {
    origin: Instant,
}

impl Default for TokioClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    async fn sleep(&self, d: Duration) {
        tokio::time::sleep(d).await;
    }
}

/// Virtual clock: `sleep` advances time instantly.
///
/// Used by deterministic drivers (and the test suite) to run polling loops
/// to their timeout without real delays.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
    sleeps: Arc<Mutex<u32>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += d;
        }
    }

    /// Number of `sleep` calls so far.
    pub fn sleeps(&self) -> u32 {
        self.sleeps.lock().map(|n| *n).unwrap_or(0)
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.now.lock().map(|n| *n).unwrap_or_default()
    }

    async fn sleep(&self, d: Duration) {
        self.advance(d);
        if let Ok(mut n) = self.sleeps.lock() {
            *n += 1;
        }
    }
}

/// Evaluate `predicate` now and then every `interval` until it holds or more
/// than `timeout` has elapsed.
///
/// Returns the predicate's final evaluation, so a condition that turns true
/// right at the boundary is not missed. Predicate errors propagate.
pub async fn wait_until<F, Fut, E>(
    clock: &dyn Clock,
    interval: Duration,
    timeout: Duration,
    mut predicate: F,
) -> Result<bool, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let start = clock.elapsed();
    while clock.elapsed().saturating_sub(start) <= timeout {
        if predicate().await? {
            return Ok(true);
        }
        clock.sleep(interval).await;
    }
    predicate().await
}

/// Clock plus the interval/timeout pair every container wait uses.
#[derive(Clone)]
pub struct Waiter {
    clock: Arc<dyn Clock>,
    interval: Duration,
    timeout: Duration,
}

impl Waiter {
    pub fn new(clock: Arc<dyn Clock>, interval: Duration, timeout: Duration) -> Self {
        Self {
            clock,
            interval,
            timeout,
        }
    }

    /// Wait for `probe` to match on the current page.
    pub async fn until_present(
        &self,
        page: &dyn PageInspector,
        probe: Probe,
    ) -> PipelineResult<bool> {
        wait_until(self.clock.as_ref(), self.interval, self.timeout, move || async move {
            page.exists(probe).await.map_err(PipelineError::Page)
        })
        .await
    }

    /// Fixed pause for content that loads after an in-page interaction.
    pub async fn pause(&self, d: Duration) {
        if !d.is_zero() {
            self.clock.sleep(d).await;
        }
    }
}

impl std::fmt::Debug for Waiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Waiter")
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .finish()
    }
}
