//! Wire models for the radio's JSON surfaces.
//!
//! Decoding is fail-closed: unknown fields are rejected, enums admit only
//! their documented values, and [`RadioUpdate::validate`] applies the
//! structural checks that serde alone can't express. An update that fails
//! any check is discarded wholesale -- nothing is partially merged.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::Display;

use crate::error::Error;
use fieldlink_proto::StationName;

/// Channels the radio will report when configured (6 GHz band, 40 MHz grid).
pub const RADIO_CHANNELS: [u16; 29] = [
    5, 13, 21, 29, 37, 45, 53, 61, 69, 77, 85, 93, 101, 109, 117, 125, 133, 141, 149, 157, 165,
    173, 181, 189, 197, 205, 213, 221, 229,
];

// ── Enumerations ─────────────────────────────────────────────────────

/// Overall device state reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RadioStatus {
    Booting,
    Configuring,
    Active,
    Error,
}

/// VLAN grouping the radio assigns an alliance's stations to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum VlanGroup {
    #[serde(rename = "10_20_30")]
    #[strum(serialize = "10_20_30")]
    Vlans102030,
    #[serde(rename = "40_50_60")]
    #[strum(serialize = "40_50_60")]
    Vlans405060,
    #[serde(rename = "70_80_90")]
    #[strum(serialize = "70_80_90")]
    Vlans708090,
}

/// Link quality bucket the radio assigns a connected station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionQuality {
    Excellent,
    Good,
    Caution,
    Warning,
}

/// The radio sends `""` where it means "no value"; map that to `None`
/// while still rejecting any other unexpected string.
fn empty_string_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    if raw == serde_json::Value::String(String::new()) {
        return Ok(None);
    }
    serde_json::from_value(raw).map(Some).map_err(serde::de::Error::custom)
}

// ── Station telemetry ────────────────────────────────────────────────

/// Per-station live telemetry, produced wholesale by each poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StationDetails {
    pub ssid: String,
    pub hashed_wpa_key: String,
    pub wpa_key_salt: String,
    pub is_linked: bool,
    /// Empty string when no client is associated.
    pub mac_address: String,
    pub data_age_ms: f64,
    pub signal_dbm: i32,
    pub noise_dbm: i32,
    pub signal_noise_ratio: i32,
    pub rx_rate_mbps: f64,
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub tx_rate_mbps: f64,
    pub tx_packets: u64,
    pub tx_bytes: u64,
    pub bandwidth_used_mbps: f64,
    #[serde(deserialize_with = "empty_string_as_none")]
    pub connection_quality: Option<ConnectionQuality>,
}

fn is_mac_address(mac: &str) -> bool {
    let octets: Vec<&str> = mac.split(':').collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)))
}

impl StationDetails {
    fn validate(&self, station: StationName) -> Result<(), Error> {
        let fail = |reason: String| Err(Error::InvalidPayload { reason });

        if self.ssid.is_empty() {
            return fail(format!("{station}: empty ssid"));
        }
        if self.hashed_wpa_key.is_empty() || self.wpa_key_salt.is_empty() {
            return fail(format!("{station}: missing wpa key hash/salt"));
        }
        if !self.mac_address.is_empty() && !is_mac_address(&self.mac_address) {
            return fail(format!(
                "{station}: malformed mac address {:?}",
                self.mac_address
            ));
        }
        Ok(())
    }
}

/// Marks a slot as required even though its value may be `null`: serde
/// defaults a plain `Option` field to `None` when the key is absent, and
/// an absent key here must reject the payload, not read as "no station".
fn required_slot<'de, D>(deserializer: D) -> Result<Option<StationDetails>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<StationDetails>::deserialize(deserializer)
}

/// The fixed six-slot station map. Modeled as a struct rather than a map
/// so a payload with missing or extra station keys fails at decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StationStatuses {
    #[serde(deserialize_with = "required_slot")]
    pub red1: Option<StationDetails>,
    #[serde(deserialize_with = "required_slot")]
    pub red2: Option<StationDetails>,
    #[serde(deserialize_with = "required_slot")]
    pub red3: Option<StationDetails>,
    #[serde(deserialize_with = "required_slot")]
    pub blue1: Option<StationDetails>,
    #[serde(deserialize_with = "required_slot")]
    pub blue2: Option<StationDetails>,
    #[serde(deserialize_with = "required_slot")]
    pub blue3: Option<StationDetails>,
}

impl StationStatuses {
    pub fn get(&self, station: StationName) -> Option<&StationDetails> {
        match station {
            StationName::Red1 => self.red1.as_ref(),
            StationName::Red2 => self.red2.as_ref(),
            StationName::Red3 => self.red3.as_ref(),
            StationName::Blue1 => self.blue1.as_ref(),
            StationName::Blue2 => self.blue2.as_ref(),
            StationName::Blue3 => self.blue3.as_ref(),
        }
    }

    /// All six slots in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (StationName, Option<&StationDetails>)> {
        StationName::ALL.into_iter().map(|s| (s, self.get(s)))
    }
}

// ── Full status snapshot ─────────────────────────────────────────────

/// One full snapshot from the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RadioUpdate {
    pub channel: u16,
    /// `"{n}MHz"`, validated in [`validate`](Self::validate).
    pub channel_bandwidth: String,
    pub red_vlans: VlanGroup,
    pub blue_vlans: VlanGroup,
    pub status: RadioStatus,
    pub station_statuses: StationStatuses,
    pub syslog_ip_address: String,
    pub version: String,
}

fn is_channel_bandwidth(bandwidth: &str) -> bool {
    match bandwidth.strip_suffix("MHz") {
        Some(digits) => {
            !digits.is_empty()
                && !digits.starts_with('0')
                && digits.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

fn is_ip_address(ip: &str) -> bool {
    ip.parse::<std::net::Ipv4Addr>().is_ok()
}

impl RadioUpdate {
    /// Structural checks beyond what serde enforces.
    ///
    /// A radio that is still BOOTING reports placeholder channel,
    /// bandwidth, and syslog values, so those checks only apply once it
    /// has left that state.
    pub fn validate(&self) -> Result<(), Error> {
        let fail = |reason: String| Err(Error::InvalidPayload { reason });

        if self.status != RadioStatus::Booting {
            if !RADIO_CHANNELS.contains(&self.channel) {
                return fail(format!("unknown channel {}", self.channel));
            }
            if !is_channel_bandwidth(&self.channel_bandwidth) {
                return fail(format!(
                    "malformed channel bandwidth {:?}",
                    self.channel_bandwidth
                ));
            }
            if !is_ip_address(&self.syslog_ip_address) {
                return fail(format!(
                    "malformed syslog address {:?}",
                    self.syslog_ip_address
                ));
            }
        }

        for (station, details) in self.station_statuses.iter() {
            if let Some(details) = details {
                details.validate(station)?;
            }
        }

        Ok(())
    }
}

// ── History entries ──────────────────────────────────────────────────

/// One unit of status history. `radio_update` is absent when the poll
/// cycle failed -- a connectivity gap is itself an orderable event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radio_update: Option<RadioUpdate>,
}

// ── Configuration payloads ───────────────────────────────────────────

/// Desired credentials for one station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationConfig {
    pub ssid: String,
    pub wpa_key: String,
}

/// Body for `POST /configuration`.
///
/// The device rejects an explicitly empty `stationConfigurations` set, so
/// callers clearing every station omit the field and send only the syslog
/// address instead (same observable effect, no device bug).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_configurations: Option<BTreeMap<StationName, StationConfig>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub syslog_ip_address: Option<String>,
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn station_details_json(ssid: &str) -> serde_json::Value {
        json!({
            "ssid": ssid,
            "hashedWpaKey": "c0ffee",
            "wpaKeySalt": "5a17",
            "isLinked": true,
            "macAddress": "AA:BB:CC:DD:EE:FF",
            "dataAgeMs": 250.0,
            "signalDbm": -55,
            "noiseDbm": -95,
            "signalNoiseRatio": 40,
            "rxRateMbps": 400.5,
            "rxPackets": 1000,
            "rxBytes": 500000,
            "txRateMbps": 380.0,
            "txPackets": 900,
            "txBytes": 450000,
            "bandwidthUsedMbps": 3.5,
            "connectionQuality": "good"
        })
    }

    pub(crate) fn radio_update_json() -> serde_json::Value {
        json!({
            "channel": 93,
            "channelBandwidth": "40MHz",
            "redVlans": "10_20_30",
            "blueVlans": "40_50_60",
            "status": "ACTIVE",
            "stationStatuses": {
                "red1": station_details_json("1234-A"),
                "red2": null,
                "red3": null,
                "blue1": null,
                "blue2": null,
                "blue3": null
            },
            "syslogIpAddress": "10.0.100.40",
            "version": "1.2.3"
        })
    }

    #[test]
    fn valid_update_decodes_and_validates() {
        let update: RadioUpdate = serde_json::from_value(radio_update_json()).unwrap();
        update.validate().unwrap();
        assert_eq!(update.status, RadioStatus::Active);
        assert_eq!(update.channel, 93);
        let red1 = update.station_statuses.get(StationName::Red1).unwrap();
        assert_eq!(red1.ssid, "1234-A");
        assert_eq!(red1.connection_quality, Some(ConnectionQuality::Good));
        assert!(update.station_statuses.get(StationName::Blue2).is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut raw = radio_update_json();
        raw["surprise"] = json!(1);
        assert!(serde_json::from_value::<RadioUpdate>(raw).is_err());
    }

    #[test]
    fn station_map_requires_exactly_six_keys() {
        // absent key: rejected, not read as an empty slot
        let mut raw = radio_update_json();
        raw["stationStatuses"].as_object_mut().unwrap().remove("blue3");
        assert!(serde_json::from_value::<RadioUpdate>(raw).is_err());

        // extra key: rejected
        let mut raw = radio_update_json();
        raw["stationStatuses"]["green1"] = json!(null);
        assert!(serde_json::from_value::<RadioUpdate>(raw).is_err());

        // explicit null is still a valid empty slot
        let update: RadioUpdate = serde_json::from_value(radio_update_json()).unwrap();
        assert!(update.station_statuses.blue3.is_none());
    }

    #[test]
    fn empty_connection_quality_is_none() {
        let mut raw = station_details_json("99-X");
        raw["connectionQuality"] = json!("");
        let details: StationDetails = serde_json::from_value(raw).unwrap();
        assert_eq!(details.connection_quality, None);

        let mut raw = station_details_json("99-X");
        raw["connectionQuality"] = json!("amazing");
        assert!(serde_json::from_value::<StationDetails>(raw).is_err());
    }

    #[test]
    fn validation_rejects_bad_channel_and_mac() {
        let mut raw = radio_update_json();
        raw["channel"] = json!(6);
        let update: RadioUpdate = serde_json::from_value(raw).unwrap();
        assert!(update.validate().is_err());

        let mut raw = radio_update_json();
        raw["stationStatuses"]["red1"]["macAddress"] = json!("not-a-mac");
        let update: RadioUpdate = serde_json::from_value(raw).unwrap();
        assert!(update.validate().is_err());
    }

    #[test]
    fn booting_relaxes_channel_and_syslog_checks() {
        let mut raw = radio_update_json();
        raw["status"] = json!("BOOTING");
        raw["channel"] = json!(0);
        raw["channelBandwidth"] = json!("");
        raw["syslogIpAddress"] = json!("");
        let update: RadioUpdate = serde_json::from_value(raw).unwrap();
        update.validate().unwrap();
    }

    #[test]
    fn status_entry_serializes_millisecond_timestamps() {
        let entry = StatusEntry {
            timestamp: DateTime::from_timestamp_millis(1_700_000_000_123).unwrap(),
            radio_update: None,
        };
        let raw = serde_json::to_value(&entry).unwrap();
        assert_eq!(raw, json!({ "timestamp": 1_700_000_000_123i64 }));

        let back: StatusEntry = serde_json::from_value(raw).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn payload_omits_absent_sections() {
        let payload = ConfigurationPayload {
            station_configurations: None,
            syslog_ip_address: Some("10.0.100.40".into()),
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({ "syslogIpAddress": "10.0.100.40" })
        );

        let mut stations = BTreeMap::new();
        stations.insert(
            StationName::Red1,
            StationConfig { ssid: "1234-A".into(), wpa_key: "secret123".into() },
        );
        let payload = ConfigurationPayload {
            station_configurations: Some(stations),
            syslog_ip_address: None,
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "stationConfigurations": {
                    "red1": { "ssid": "1234-A", "wpaKey": "secret123" }
                }
            })
        );
    }
}
