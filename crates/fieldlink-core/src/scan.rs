// ── Channel scan service ──
//
// A scan takes the radio tens of seconds and blocks its other surfaces,
// so concurrent callers are coalesced onto one in-flight scan: whoever
// asks while a scan is running awaits the same shared future and gets the
// same result.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tracing::{debug, info};

use crate::error::CoreError;
use fieldlink_api::{RadioClient, ScanResults, parse_scan_report};

type ScanFuture = Shared<BoxFuture<'static, Result<Arc<ScanResults>, Arc<CoreError>>>>;

/// Coalescing front-end for the radio's scan endpoints.
#[derive(Clone)]
pub struct ScanService {
    inner: Arc<ScanInner>,
}

struct ScanInner {
    client: RadioClient,
    poll_interval: Duration,
    in_flight: Mutex<Option<ScanFuture>>,
}

impl ScanService {
    pub fn new(client: RadioClient, poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(ScanInner {
                client,
                poll_interval,
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Run a scan, or join the one already running.
    ///
    /// Resolves once the radio's report reaches [`ScanResults::Ready`].
    pub async fn scan(&self) -> Result<Arc<ScanResults>, Arc<CoreError>> {
        let fut = {
            let mut in_flight = self.inner.in_flight.lock().expect("scan lock poisoned");
            match in_flight.as_ref() {
                // peek() is Some once the shared future has resolved, at
                // which point the next caller starts a fresh scan.
                Some(existing) if existing.peek().is_none() => existing.clone(),
                _ => {
                    info!("starting channel scan");
                    let fut = run_scan(self.inner.client.clone(), self.inner.poll_interval)
                        .boxed()
                        .shared();
                    *in_flight = Some(fut.clone());
                    fut
                }
            }
        };
        fut.await
    }
}

async fn run_scan(
    client: RadioClient,
    poll_interval: Duration,
) -> Result<Arc<ScanResults>, Arc<CoreError>> {
    client
        .scan_start()
        .await
        .map_err(CoreError::from)
        .map_err(Arc::new)?;

    loop {
        let report = client
            .scan_result()
            .await
            .map_err(CoreError::from)
            .map_err(Arc::new)?;

        match parse_scan_report(&report) {
            results @ ScanResults::Ready { .. } => {
                info!("channel scan complete");
                return Ok(Arc::new(results));
            }
            ScanResults::Loading { progress_dots } => {
                debug!(progress_dots, "channel scan in progress");
            }
        }
        tokio::time::sleep(poll_interval).await;
    }
}

// ── Tests ────────────────────────────────────────────────────────────
