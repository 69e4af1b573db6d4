// ── Configuration state machine ──
//
// Owns the desired per-station credential set and drives the radio
// through its configuration handshake. Commits are single-flight: a
// commit that arrives while one is running is skipped outright, never
// queued, because the radio cannot absorb overlapping configuration
// attempts.
//
// Handshake shape, driven entirely by the status poller's channels (the
// device is never re-polled out of band):
//
//   POST /configuration  ──►  status CONFIGURING within the short deadline
//                        ──►  leaves CONFIGURING within the settle deadline
//                        ──►  settles ACTIVE, or the commit fails naming
//                             the status it saw.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::config::FieldConfig;
use crate::error::CoreError;
use crate::poller::StatusPoller;
use crate::provision::{NetworkProvisioner, TeamMap, team_number_from_ssid};
use fieldlink_api::{
    ConfigurationPayload, RadioClient, RadioStatus, StationConfig, StationName, StatusEntry,
};

/// One station-credential change.
#[derive(Debug, Clone)]
pub struct ConfigureRequest {
    /// Empty string clears the station.
    pub ssid: String,
    pub wpa_key: String,
    /// Stage only: record the change without touching the device.
    pub stage: bool,
}

/// Owner of the desired configuration and the commit handshake.
///
/// Cheaply cloneable; clones share the active set and the commit guard.
#[derive(Clone)]
pub struct Configurator {
    inner: Arc<ConfiguratorInner>,
}

struct ConfiguratorInner {
    client: RadioClient,
    poller: StatusPoller,
    provisioner: Arc<dyn NetworkProvisioner>,
    config: FieldConfig,
    active: StdMutex<BTreeMap<StationName, StationConfig>>,
    commit_guard: Mutex<()>,
}

impl Configurator {
    pub fn new(
        client: RadioClient,
        poller: StatusPoller,
        provisioner: Arc<dyn NetworkProvisioner>,
        config: FieldConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ConfiguratorInner {
                client,
                poller,
                provisioner,
                config,
                active: StdMutex::new(BTreeMap::new()),
                commit_guard: Mutex::new(()),
            }),
        }
    }

    /// Snapshot of the desired station set.
    pub fn active_config(&self) -> BTreeMap<StationName, StationConfig> {
        self.inner.active.lock().expect("active lock poisoned").clone()
    }

    /// Record a station change and, unless staged, commit the full set.
    pub async fn configure(
        &self,
        station: StationName,
        request: ConfigureRequest,
    ) -> Result<(), CoreError> {
        {
            let mut active = self.inner.active.lock().expect("active lock poisoned");
            if request.ssid.is_empty() {
                info!(%station, "clearing station");
                active.remove(&station);
            } else {
                info!(%station, ssid = %request.ssid, "staging station");
                active.insert(
                    station,
                    StationConfig {
                        ssid: request.ssid,
                        wpa_key: request.wpa_key,
                    },
                );
            }
        }

        if request.stage {
            return Ok(());
        }
        self.commit().await
    }

    /// Clear every station and push the empty set to the device.
    ///
    /// If the commit fails the desired state stays empty; there is no
    /// record of the previous set to restore.
    pub async fn clear_all(&self) -> Result<(), CoreError> {
        info!("clearing all stations");
        self.inner.active.lock().expect("active lock poisoned").clear();
        self.commit().await
    }

    /// Point the radio's syslog stream at `ip` without touching stations.
    pub async fn set_syslog_ip(&self, ip: std::net::Ipv4Addr) -> Result<(), CoreError> {
        let payload = ConfigurationPayload {
            station_configurations: None,
            syslog_ip_address: Some(ip.to_string()),
        };
        self.inner.client.post_configuration(&payload).await?;
        Ok(())
    }

    /// Push the full desired set to the device and run the handshake.
    ///
    /// Skips (successfully) if a commit is already in flight.
    pub async fn commit(&self) -> Result<(), CoreError> {
        let Ok(_guard) = self.inner.commit_guard.try_lock() else {
            info!("configuration already in progress, skipping");
            return Ok(());
        };

        let stations = self.active_config();

        // The device rejects an explicitly empty station set, so an empty
        // desired set is sent as a syslog-only payload with the same
        // observable effect.
        let payload = if stations.is_empty() {
            let syslog = self
                .inner
                .poller
                .last_observed_syslog_ip()
                .unwrap_or(self.inner.config.syslog_fallback);
            debug!(%syslog, "empty station set, sending syslog-only payload");
            ConfigurationPayload {
                station_configurations: None,
                syslog_ip_address: Some(syslog.to_string()),
            }
        } else {
            ConfigurationPayload {
                station_configurations: Some(stations.clone()),
                syslog_ip_address: None,
            }
        };

        let teams: TeamMap = StationName::ALL
            .into_iter()
            .map(|s| {
                (
                    s,
                    stations.get(&s).and_then(|c| team_number_from_ssid(&c.ssid)),
                )
            })
            .collect();

        // Mark the current entry as seen so the handshake only observes
        // entries appended after the POST goes out.
        let mut latest = self.inner.poller.latest();
        latest.mark_unchanged();

        let (post_result, _) = tokio::join!(self.inner.client.post_configuration(&payload), async {
            if let Err(e) = self
                .inner
                .provisioner
                .provision(&teams, &self.inner.config.interface)
                .await
            {
                warn!(error = %e, "network provisioning failed");
            }
        });
        post_result?;
        info!("configuration accepted, waiting for radio to acknowledge");

        let deadline = self.inner.config.configuring_deadline;
        tokio::time::timeout(
            deadline,
            next_status(&mut latest, |s| s == RadioStatus::Configuring),
        )
        .await
        .map_err(|_| CoreError::NotAcknowledged(deadline))??;

        let deadline = self.inner.config.settle_deadline;
        let settled = tokio::time::timeout(
            deadline,
            next_status(&mut latest, |s| s != RadioStatus::Configuring),
        )
        .await
        .map_err(|_| CoreError::SettleTimeout(deadline))??;

        if settled != RadioStatus::Active {
            return Err(CoreError::UnexpectedStatus { status: settled });
        }
        info!("radio reconfigured and active");
        Ok(())
    }
}

/// Wait for the next history entry whose status satisfies `pred`.
/// Gap entries (failed polls) are skipped, not matched.
async fn next_status(
    latest: &mut watch::Receiver<Option<StatusEntry>>,
    pred: impl Fn(RadioStatus) -> bool,
) -> Result<RadioStatus, CoreError> {
    loop {
        latest.changed().await.map_err(|_| CoreError::PollerStopped)?;
        let status = latest
            .borrow_and_update()
            .as_ref()
            .and_then(|e| e.radio_update.as_ref())
            .map(|u| u.status);
        if let Some(status) = status {
            if pred(status) {
                return Ok(status);
            }
        }
    }
}
