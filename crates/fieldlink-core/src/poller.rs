// ── Status poller ──
//
// Polls the radio's status endpoint on a fixed cadence and maintains a
// bounded, time-ordered history of the results. Every tick produces
// exactly one entry: a snapshot on success, a gap entry on failure, so the
// history doubles as a connectivity record. Consumers observe the stream
// through a broadcast channel (every entry) or a watch channel (latest
// entry); neither can block or fail the poller.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fieldlink_api::{RadioClient, StatusEntry};

const UPDATE_CHANNEL_SIZE: usize = 256;

/// Background status poller for one radio.
///
/// Cheaply cloneable; all clones share the same history and channels.
#[derive(Clone)]
pub struct StatusPoller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    client: RadioClient,
    history_window: Duration,
    history: Mutex<VecDeque<StatusEntry>>,
    connected: AtomicBool,
    busy: AtomicBool,
    latest_tx: watch::Sender<Option<StatusEntry>>,
    update_tx: broadcast::Sender<Arc<StatusEntry>>,
}

impl StatusPoller {
    /// Create a poller. Does not start polling -- call
    /// [`start`](Self::start) to spawn the background task.
    pub fn new(client: RadioClient, history_window: Duration) -> Self {
        let (latest_tx, _) = watch::channel(None);
        let (update_tx, _) = broadcast::channel(UPDATE_CHANNEL_SIZE);
        Self {
            inner: Arc::new(PollerInner {
                client,
                history_window,
                history: Mutex::new(VecDeque::new()),
                connected: AtomicBool::new(false),
                busy: AtomicBool::new(false),
                latest_tx,
                update_tx,
            }),
        }
    }

    /// Spawn the polling loop.
    ///
    /// Ticks are skip-not-queue: if a poll is still in flight when the
    /// next tick fires, the tick is dropped rather than stacked behind it.
    pub fn start(&self, poll_interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let poller = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if poller.inner.busy.swap(true, Ordering::AcqRel) {
                            debug!("poll still in flight, skipping tick");
                            continue;
                        }
                        let p = poller.clone();
                        tokio::spawn(async move {
                            p.poll_once().await;
                            p.inner.busy.store(false, Ordering::Release);
                        });
                    }
                }
            }
            debug!("status poller exiting");
        })
    }

    /// Run one poll cycle: fetch, append the resulting entry, notify.
    pub async fn poll_once(&self) {
        let entry = match self.inner.client.status().await {
            Ok(update) => {
                if !self.inner.connected.swap(true, Ordering::AcqRel) {
                    info!("radio connected");
                }
                StatusEntry {
                    timestamp: Utc::now(),
                    radio_update: Some(update),
                }
            }
            Err(e) => {
                if self.inner.connected.swap(false, Ordering::AcqRel) {
                    warn!(error = %e, "radio connection lost");
                } else {
                    debug!(error = %e, "poll failed");
                }
                StatusEntry {
                    timestamp: Utc::now(),
                    radio_update: None,
                }
            }
        };
        self.append(entry);
    }

    /// Append one entry, trim the window, then notify subscribers.
    fn append(&self, entry: StatusEntry) {
        {
            let mut history = self.inner.history.lock().expect("history lock poisoned");
            history.push_back(entry.clone());
            let cutoff = entry.timestamp
                - chrono::Duration::from_std(self.inner.history_window)
                    .unwrap_or(chrono::Duration::seconds(30));
            while history.front().is_some_and(|e| e.timestamp < cutoff) {
                history.pop_front();
            }
        }

        // A lagged or dropped subscriber never blocks delivery.
        let _ = self.inner.latest_tx.send(Some(entry.clone()));
        let _ = self.inner.update_tx.send(Arc::new(entry));
    }

    /// Copy of the retained history, oldest first.
    pub fn history(&self) -> Vec<StatusEntry> {
        self.inner
            .history
            .lock()
            .expect("history lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    /// Watch channel holding the most recent entry.
    pub fn latest(&self) -> watch::Receiver<Option<StatusEntry>> {
        self.inner.latest_tx.subscribe()
    }

    /// Broadcast stream of every appended entry.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<StatusEntry>> {
        self.inner.update_tx.subscribe()
    }

    /// Whether the most recent poll succeeded.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// The syslog address from the newest successful snapshot, if any.
    pub fn last_observed_syslog_ip(&self) -> Option<std::net::Ipv4Addr> {
        let history = self.inner.history.lock().expect("history lock poisoned");
        history
            .iter()
            .rev()
            .filter_map(|e| e.radio_update.as_ref())
            .find_map(|u| u.syslog_ip_address.parse().ok())
    }
}

// ── Tests ────────────────────────────────────────────────────────────
