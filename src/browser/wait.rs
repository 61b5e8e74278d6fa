use std::future::Future;
use std::time::{Duration, Instant};

use crate::errors::ScoutResult;

#[derive(Debug, Clone, Copy)]
pub struct WaitConfig {
    pub max_wait_ms: u64,
    pub check_interval_ms: u64,
}

impl WaitConfig {
    pub fn new(max_wait_ms: u64, check_interval_ms: u64) -> Self {
        Self {
            max_wait_ms,
            check_interval_ms: check_interval_ms.max(1),
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            max_wait_ms: 10_000,
            check_interval_ms: 200,
        }
    }
}

/// Polls `probe` until it yields `Some`, or gives up after `max_wait_ms`.
/// The probe always runs at least once, even with a zero budget.
pub async fn poll_until<T, F, Fut>(config: WaitConfig, mut probe: F) -> ScoutResult<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ScoutResult<Option<T>>>,
{
    let start = Instant::now();
    let budget = Duration::from_millis(config.max_wait_ms);

    loop {
        if let Some(found) = probe().await? {
            tracing::trace!(elapsed_ms = start.elapsed().as_millis() as u64, "condition met");
            return Ok(Some(found));
        }
        if start.elapsed() >= budget {
            tracing::trace!(max_wait_ms = config.max_wait_ms, "wait budget exhausted");
            return Ok(None);
        }
        tokio::time::sleep(Duration::from_millis(config.check_interval_ms)).await;
    }
}
