// ── Runtime tuning ──
//
// All the knobs for the polling, handshake, and scan loops. Built by the
// binary from CLI flags and handed in; core never reads disk.

use std::net::Ipv4Addr;
use std::time::Duration;

/// Tuning for one radio's manager stack.
#[derive(Debug, Clone)]
pub struct FieldConfig {
    /// Radio base URL (e.g. `http://10.0.100.2`).
    pub radio_url: String,
    /// Status poll cadence.
    pub poll_interval: Duration,
    /// Per-request HTTP deadline. Shorter than it sounds: the radio is one
    /// switch hop away, so anything slower is effectively down.
    pub http_timeout: Duration,
    /// How much status history to retain.
    pub history_window: Duration,
    /// How long after a configuration POST the radio has to report
    /// `CONFIGURING`.
    pub configuring_deadline: Duration,
    /// How long the radio may stay in `CONFIGURING` before the commit
    /// fails.
    pub settle_deadline: Duration,
    /// Syslog target sent with an empty-station configuration when the
    /// history holds no observed syslog address yet.
    pub syslog_fallback: Ipv4Addr,
    /// Cadence for polling the scan result endpoint.
    pub scan_poll_interval: Duration,
    /// Network interface handed to the provisioner.
    pub interface: String,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            radio_url: "http://10.0.100.2".into(),
            poll_interval: Duration::from_millis(250),
            http_timeout: Duration::from_secs(1),
            history_window: Duration::from_secs(30),
            configuring_deadline: Duration::from_secs(2),
            settle_deadline: Duration::from_secs(45),
            syslog_fallback: Ipv4Addr::new(10, 0, 100, 40),
            scan_poll_interval: Duration::from_millis(250),
            interface: "eth0".into(),
        }
    }
}
