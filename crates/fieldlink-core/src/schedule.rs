// ── Scheduled clearing ──
//
// Events wipe station credentials once a day (typically before the venue
// opens) so yesterday's teams can't ride along on stale SSIDs. The task
// sleeps until the next occurrence of the configured local time, clears,
// and repeats.

use chrono::{Days, Local, NaiveDateTime, NaiveTime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::configurator::Configurator;

/// The next occurrence of `at`, strictly after `now`.
fn next_occurrence(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let candidate = now.date().and_time(at);
    if candidate > now {
        candidate
    } else {
        candidate
            .checked_add_days(Days::new(1))
            .unwrap_or(candidate)
    }
}

/// Spawn a task that clears all stations at `at` (local time) every day.
pub fn spawn_daily_clear(
    configurator: Configurator,
    at: NaiveTime,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Local::now().naive_local();
            let next = next_occurrence(now, at);
            let wait = (next - now)
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(60));
            debug!(next = %next, "next scheduled clear");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {
                    info!("running scheduled station clear");
                    if let Err(e) = configurator.clear_all().await {
                        warn!(error = %e, "scheduled clear failed");
                    }
                }
            }
        }
        debug!("scheduled clear task exiting");
    })
}

// ── Tests ────────────────────────────────────────────────────────────
