//! Channel scan report parser.
//!
//! The radio's scan endpoint returns a human-oriented text report that
//! grows as the scan progresses: first a run of `.` progress lines, then a
//! channel table and an additional-statistics table. This module parses it
//! line by line with two mode toggles (`Channel |` and `Index |` header
//! lines) and ignores anything it doesn't recognize, so firmware adding
//! decoration doesn't break the parser.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One row of the channel table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelScanDetails {
    pub channel_frequency: u32,
    pub channel: u16,
    pub bss: i64,
    pub min_rssi: i64,
    pub max_rssi: i64,
    pub noise_floor: i64,
    pub channel_load: i64,
    pub spectral_load: i64,
    pub secondary_channel: i64,
    pub sr_bss: i64,
    pub sr_load: i64,
    pub channel_availability: i64,
    pub channel_efficiency: i64,
    pub near_bss: i64,
    pub medium_bss: i64,
    pub far_bss: i64,
    pub effective_bss: i64,
    pub grade: i64,
    pub rank: i64,
    /// Reason codes the radio gives for not selecting the channel,
    /// expanded through the abbreviation table.
    pub unused_reasons: Vec<String>,
    pub radar: i64,
}

/// One row of the per-BSS statistics table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalChannelStatistic {
    pub index: u32,
    pub channel: u16,
    pub nbss: u32,
    /// May contain spaces.
    pub ssid: String,
    pub bssid: String,
    pub rssi: i64,
    pub phy_mode: u32,
}

/// Outcome of parsing one scan report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScanResults {
    /// The scan hasn't produced a channel table yet; `progress_dots`
    /// counts the `.` lines seen so far.
    #[serde(rename_all = "camelCase")]
    Loading { progress_dots: u32 },
    /// Complete report.
    #[serde(rename_all = "camelCase")]
    Ready {
        channels: BTreeMap<u16, ChannelScanDetails>,
        additional_statistics: Vec<AdditionalChannelStatistic>,
    },
}

impl ScanResults {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// Expand a reason-code abbreviation; unknown codes pass through as-is.
fn expand_reason(code: &str) -> String {
    let long = match code {
        "SC" => "Secondary Channel",
        "WR" => "Weather Radar",
        "DFS" => "DFS Channel",
        "HN" => "High Noise",
        "RS" => "Low RSSI",
        "CL" => "High Channel Load",
        "RP" => "Regulatory Power",
        "N2G" => "Not selected 2G",
        "P80X" => "Primary 80X80",
        "NS80X" => "Only for primary 80X80",
        "NP80X" => "Only for Secondary 80X80",
        "SR" => "Spacial reuse",
        "NF" => "Run-time average NF_dBr",
        _ => return code.to_string(),
    };
    format!("{code}: {long}")
}

/// Channel rows look like
/// `5955( 5)  1  30  45  -96  10 ... 3  ( SC DFS )  0`:
/// frequency, parenthesized channel, 17 numeric columns, a parenthesized
/// reason-code list, and a radar count. Anything that doesn't fit is not a
/// channel row.
fn parse_channel_row(line: &str) -> Option<ChannelScanDetails> {
    let (freq, rest) = line.split_once('(')?;
    let channel_frequency: u32 = freq.trim().parse().ok()?;
    let (channel, rest) = rest.split_once(')')?;
    let channel: u16 = channel.trim().parse().ok()?;

    let (numbers, rest) = rest.rsplit_once('(')?;
    let (reasons, radar) = rest.split_once(')')?;
    let radar: i64 = radar.trim().parse().ok()?;

    let columns: Vec<i64> = numbers
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    let [bss, min_rssi, max_rssi, noise_floor, channel_load, spectral_load, secondary_channel, sr_bss, sr_load, channel_availability, channel_efficiency, near_bss, medium_bss, far_bss, effective_bss, grade, rank] =
        columns[..]
    else {
        return None;
    };

    let unused_reasons = reasons.split_whitespace().map(expand_reason).collect();

    Some(ChannelScanDetails {
        channel_frequency,
        channel,
        bss,
        min_rssi,
        max_rssi,
        noise_floor,
        channel_load,
        spectral_load,
        secondary_channel,
        sr_bss,
        sr_load,
        channel_availability,
        channel_efficiency,
        near_bss,
        medium_bss,
        far_bss,
        effective_bss,
        grade,
        rank,
        unused_reasons,
        radar,
    })
}

/// Statistics rows are `index channel nbss SSID... BSSID rssi phyMode`.
/// The SSID is the only column that can contain spaces, so the row is
/// anchored from both ends.
fn parse_statistic_row(line: &str) -> Option<AdditionalChannelStatistic> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 7 {
        return None;
    }

    let index: u32 = tokens[0].parse().ok()?;
    let channel: u16 = tokens[1].parse().ok()?;
    let nbss: u32 = tokens[2].parse().ok()?;
    let phy_mode: u32 = tokens[tokens.len() - 1].parse().ok()?;
    let rssi: i64 = tokens[tokens.len() - 2].parse().ok()?;
    let bssid = tokens[tokens.len() - 3].to_string();
    let ssid = tokens[3..tokens.len() - 3].join(" ");

    Some(AdditionalChannelStatistic {
        index,
        channel,
        nbss,
        ssid,
        bssid,
        rssi,
        phy_mode,
    })
}

/// Parse one scan report.
///
/// A report with no channel rows yet is [`ScanResults::Loading`].
pub fn parse_scan_report(report: &str) -> ScanResults {
    let mut channels = BTreeMap::new();
    let mut additional_statistics = Vec::new();
    let mut progress_dots = 0u32;

    let mut in_channel_table = false;
    let mut in_statistics_table = false;

    for line in report.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with('-') {
            continue;
        }
        if line == "." {
            progress_dots += 1;
            continue;
        }
        if line.starts_with("Channel |") {
            in_channel_table = true;
            in_statistics_table = false;
            continue;
        }
        if line.starts_with("Index |") {
            in_channel_table = false;
            in_statistics_table = true;
            continue;
        }

        if in_channel_table {
            if let Some(row) = parse_channel_row(line) {
                channels.insert(row.channel, row);
            }
        } else if in_statistics_table {
            if let Some(row) = parse_statistic_row(line) {
                additional_statistics.push(row);
            }
        }
    }

    if channels.is_empty() {
        ScanResults::Loading { progress_dots }
    } else {
        ScanResults::Ready {
            channels,
            additional_statistics,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
