//! Outgoing control packet (field → driver station).
//!
//! A fixed 22-byte body followed by variable-length metric tag buffers.
//! The encoder asserts the fixed body filled its buffer exactly before
//! any tags are appended.

use chrono::{DateTime, Datelike, Local, Timelike};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::buffer::BufferWriter;
use crate::ds::{DsMode, MetricTag};
use crate::error::ProtoError;
use crate::station::StationName;

/// Size of the fixed control-packet body.
const BODY_LEN: usize = 22;

/// Wire comm version for outgoing packets.
const COMM_VERSION: u8 = 0x00;

/// Reserved request byte.
const REQUEST: u8 = 0x00;

/// Packed control state sent to a driver station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Control {
    pub estop: bool,
    pub enabled: bool,
    pub mode: DsMode,
}

impl Control {
    /// Control byte: E-stop 0x80, enabled 0x04, mode in the low 2 bits.
    pub fn bits(self) -> u8 {
        let mode = match self.mode {
            DsMode::TeleOp => 0,
            DsMode::Test => 1,
            DsMode::Auto => 2,
        };
        (if self.estop { 0x80 } else { 0 }) | (if self.enabled { 0x04 } else { 0 }) | mode
    }
}

/// Competition phase carried in the control packet.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum TournamentLevel {
    MatchTest,
    Practice,
    Qualification,
    Playoff,
}

impl TournamentLevel {
    fn to_byte(self) -> u8 {
        self as u8
    }
}

/// One outgoing control packet.
#[derive(Debug, Clone, PartialEq)]
pub struct DsControlPacket {
    pub sequence: u16,
    pub control: Control,
    pub alliance_station: StationName,
    pub tournament_level: TournamentLevel,
    pub match_number: u16,
    pub play_number: u8,
    pub match_time: DateTime<Local>,
    /// Remaining match time in seconds.
    pub remaining_time: u16,
    pub tags: Vec<MetricTag>,
}

/// Encode the 10-byte timestamp: microseconds, sec, min, hour, day,
/// zero-based month, year-1900.
fn encode_timestamp(time: &DateTime<Local>) -> Result<[u8; 10], ProtoError> {
    let mut w = BufferWriter::new(10);
    w.write_number(4, u64::from(time.timestamp_subsec_micros()))?;
    w.write_number(1, u64::from(time.second()))?;
    w.write_number(1, u64::from(time.minute()))?;
    w.write_number(1, u64::from(time.hour()))?;
    w.write_number(1, u64::from(time.day()))?;
    w.write_number(1, u64::from(time.month0()))?;
    w.write_number(1, (time.year() - 1900) as u64)?;

    let mut out = [0u8; 10];
    out.copy_from_slice(w.trimmed());
    Ok(out)
}

/// Encode the tag buffers appended after the fixed body.
///
/// The outbound tag wire format is not specified beyond the decode side of
/// the protocol, so no tags are emitted.
fn encode_tag_buffers(_tags: &[MetricTag]) -> Vec<u8> {
    Vec::new()
}

/// Encode a control packet into its wire form.
pub fn encode_control_packet(packet: &DsControlPacket) -> Result<Vec<u8>, ProtoError> {
    let mut body = BufferWriter::new(BODY_LEN);

    body.write_number(2, u64::from(packet.sequence))?;
    body.write_number(1, u64::from(COMM_VERSION))?;
    body.write_number(1, u64::from(packet.control.bits()))?;
    body.write_number(1, u64::from(REQUEST))?;
    body.write_number(1, u64::from(packet.alliance_station.index()))?;
    body.write_number(1, u64::from(packet.tournament_level.to_byte()))?;
    body.write_number(2, u64::from(packet.match_number))?;
    body.write_number(1, u64::from(packet.play_number))?;
    body.write_slice(&encode_timestamp(&packet.match_time)?)?;
    body.write_number(2, u64::from(packet.remaining_time))?;

    if body.remaining() != 0 {
        return Err(ProtoError::BodyUnderfilled { remaining: body.remaining() });
    }

    let mut out = body.into_vec();
    out.extend_from_slice(&encode_tag_buffers(&packet.tags));
    Ok(out)
}

// ── Tests ────────────────────────────────────────────────────────────
