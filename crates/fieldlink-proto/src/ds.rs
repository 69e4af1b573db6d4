//! Inbound DS protocol codec.
//!
//! Two transports, two tolerances:
//!
//! - **TCP** carries 2-byte length-prefixed frames with a 1-byte type tag.
//!   An unknown tag is a hard error -- the TCP path does not admit protocol
//!   extensions.
//! - **UDP** carries a fixed 8-byte status header followed by
//!   self-length-prefixed tag records. Unknown tag types are logged and
//!   skipped; this side is explicitly forward-compatible.

use crate::buffer::{BufferReader, CodecError};
use crate::error::ProtoError;

// ── TCP message shapes ───────────────────────────────────────────────

/// Enabled/disabled mode flags as seen by one side of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobotFlags {
    pub teleop: bool,
    pub auto: bool,
    pub disabled: bool,
}

/// Packed status byte from the periodic telemetry message (0x16).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobotStatus {
    pub brownout: bool,
    pub watchdog: bool,
    /// Mode as the driver station reports it.
    pub ds: RobotFlags,
    /// Mode as the robot controller reports it.
    pub robot: RobotFlags,
}

impl RobotStatus {
    fn from_byte(byte: u8) -> Self {
        Self {
            brownout: byte & 0x80 != 0,
            watchdog: byte & 0x40 != 0,
            ds: RobotFlags {
                teleop: byte & 0x20 != 0,
                auto: byte & 0x10 != 0,
                disabled: byte & 0x08 != 0,
            },
            robot: RobotFlags {
                teleop: byte & 0x04 != 0,
                auto: byte & 0x02 != 0,
                disabled: byte & 0x01 != 0,
            },
        }
    }
}

/// One decoded TCP message from a driver station.
#[derive(Debug, Clone, PartialEq)]
pub enum DsMessage {
    /// 0x00
    WpilibVersion(String),
    /// 0x01
    RioVersion(String),
    /// 0x02
    DsVersion(String),
    /// 0x03
    PdpVersion(String),
    /// 0x04
    PcmVersion(String),
    /// 0x05
    CanJagVersion(String),
    /// 0x06
    CanTalonVersion(String),
    /// 0x07
    ThirdPartyDeviceVersion(String),
    /// 0x15 -- usage report blob; entries are opaque on the wire.
    UsageReport {
        team_number: u16,
        unknown: u8,
        entries: Vec<u8>,
    },
    /// 0x16 -- periodic log/telemetry.
    LogData {
        round_trip_time_ms: u8,
        lost_packets: u8,
        /// Fixed-point, raw/256 volts.
        voltage: f64,
        status: RobotStatus,
        /// Doubled from the raw byte; 0..=510.
        can_usage_pct: u16,
        /// Doubled from the raw byte; 0..=510.
        signal_db: u16,
        /// Fixed-point, raw/256 Mbps.
        bandwidth_mbps: f64,
    },
    /// 0x17 -- error/event log record.
    ErrorAndEventData {
        message_count: u32,
        timestamp: u64,
        unknown: Vec<u8>,
        message: String,
    },
    /// 0x18
    TeamNumber(u16),
    /// 0x1b
    ChallengeResponse(String),
    /// 0x1c -- keepalive, no payload.
    Ping,
}

/// Decode one TCP frame body (the bytes after the 2-byte length prefix).
pub fn decode_tcp_message(body: &[u8]) -> Result<DsMessage, ProtoError> {
    let mut r = BufferReader::new(body);
    let message_type = r.read_number(1)? as u8;

    let message = match message_type {
        0x00 => DsMessage::WpilibVersion(r.read_rest_string()),
        0x01 => DsMessage::RioVersion(r.read_rest_string()),
        0x02 => DsMessage::DsVersion(r.read_rest_string()),
        0x03 => DsMessage::PdpVersion(r.read_rest_string()),
        0x04 => DsMessage::PcmVersion(r.read_rest_string()),
        0x05 => DsMessage::CanJagVersion(r.read_rest_string()),
        0x06 => DsMessage::CanTalonVersion(r.read_rest_string()),
        0x07 => DsMessage::ThirdPartyDeviceVersion(r.read_rest_string()),
        0x15 => DsMessage::UsageReport {
            team_number: r.read_number(2)? as u16,
            unknown: r.read_number(1)? as u8,
            entries: r.read_rest().to_vec(),
        },
        0x16 => DsMessage::LogData {
            round_trip_time_ms: r.read_number(1)? as u8,
            lost_packets: r.read_number(1)? as u8,
            voltage: r.read_number(2)? as f64 / 256.0,
            status: RobotStatus::from_byte(r.read_number(1)? as u8),
            can_usage_pct: r.read_number(1)? as u16 * 2,
            signal_db: r.read_number(1)? as u16 * 2,
            bandwidth_mbps: r.read_number(2)? as f64 / 256.0,
        },
        0x17 => DsMessage::ErrorAndEventData {
            message_count: r.read_number(4)? as u32,
            timestamp: r.read_number(8)?,
            unknown: r.read_slice(8)?.to_vec(),
            message: r.read_rest_string(),
        },
        0x18 => DsMessage::TeamNumber(r.read_number(2)? as u16),
        0x1b => DsMessage::ChallengeResponse(r.read_rest_string()),
        0x1c => DsMessage::Ping,
        other => return Err(ProtoError::UnknownMessageType(other)),
    };

    Ok(message)
}

// ── TCP stream reassembly ────────────────────────────────────────────

/// Reassembles 2-byte length-prefixed frames from an arbitrarily chunked
/// TCP stream.
///
/// Feed raw chunks with [`push`](Self::push); complete frames come back
/// decoded. A frame split across chunk boundaries is retained until its
/// remainder arrives -- the internal `Overflow` that signals this never
/// escapes. A frame that decodes to a protocol error is surfaced as that
/// message's result and the stream continues with the next frame.
#[derive(Debug, Default)]
pub struct FrameReassembler {
    pending: Vec<u8>,
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes buffered while waiting for the rest of a frame.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Feed one chunk; returns every message completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<DsMessage, ProtoError>> {
        self.pending.extend_from_slice(chunk);

        let mut out = Vec::new();
        let consumed = {
            let mut r = BufferReader::new(&self.pending);
            loop {
                match r.read_sized_buffer(2) {
                    Ok(frame) => out.push(decode_tcp_message(frame)),
                    // Incomplete frame: the cursor was rewound to the frame
                    // start, keep the tail for the next chunk.
                    Err(CodecError::Overflow { .. }) => break,
                    Err(err) => {
                        out.push(Err(err.into()));
                        break;
                    }
                }
            }
            r.position()
        };
        self.pending.drain(..consumed);
        out
    }
}

// ── UDP status datagram ──────────────────────────────────────────────

/// DS operating mode from the 2-bit mode field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DsMode {
    TeleOp,
    Test,
    Auto,
}

impl DsMode {
    fn from_bits(bits: u8) -> Result<Self, ProtoError> {
        match bits {
            0 => Ok(Self::TeleOp),
            1 => Ok(Self::Test),
            2 => Ok(Self::Auto),
            other => Err(ProtoError::InvalidMode(other)),
        }
    }
}

/// Packed status byte from the UDP datagram header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DsStatus {
    pub estop: bool,
    pub robot_comms: bool,
    pub radio_ping: bool,
    pub rio_ping: bool,
    pub enabled: bool,
    pub mode: DsMode,
}

impl DsStatus {
    fn from_byte(byte: u8) -> Result<Self, ProtoError> {
        Ok(Self {
            estop: byte & 0x80 != 0,
            robot_comms: byte & 0x20 != 0,
            radio_ping: byte & 0x10 != 0,
            rio_ping: byte & 0x08 != 0,
            enabled: byte & 0x04 != 0,
            mode: DsMode::from_bits(byte & 0x03)?,
        })
    }
}

/// One decoded metric tag record from a status datagram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricTag {
    /// 0x00 -- field radio link metrics.
    FieldRadio {
        signal_strength: u8,
        bandwidth_utilization: u16,
    },
    /// 0x01 -- comms/link metrics.
    Comms {
        lost_packets: u16,
        sent_packets: u16,
        average_round_trip_time_ms: u8,
    },
    /// 0x02 -- driver station laptop metrics.
    Laptop { battery_percent: u8, cpu_percent: u8 },
    /// 0x03 -- robot radio link metrics.
    RobotRadio {
        signal_strength: u8,
        bandwidth_utilization: u16,
    },
    /// 0x04 -- power distribution marker, no payload.
    PowerDistribution,
}

/// One decoded DS status datagram.
#[derive(Debug, Clone, PartialEq)]
pub struct UdpStatus {
    pub sequence: u16,
    pub comm_version: u8,
    pub status: DsStatus,
    pub team_number: u16,
    /// Fixed-point, raw/256 volts.
    pub battery_voltage: f64,
    pub tags: Vec<MetricTag>,
}

/// Decode a full DS status datagram: fixed header plus tag records until
/// the datagram is exhausted.
pub fn decode_udp_status(datagram: &[u8]) -> Result<UdpStatus, ProtoError> {
    let mut r = BufferReader::new(datagram);

    let sequence = r.read_number(2)? as u16;
    let comm_version = r.read_number(1)? as u8;
    let status = DsStatus::from_byte(r.read_number(1)? as u8)?;
    let team_number = r.read_number(2)? as u16;
    let battery_voltage = r.read_number(2)? as f64 / 256.0;

    let mut tags = Vec::new();
    while r.remaining() > 0 {
        let size = r.read_number(1)? as usize;
        if size == 0 {
            return Err(ProtoError::ZeroLengthTag);
        }
        let record = r.read_slice(size)?;
        let mut t = BufferReader::new(record);
        let tag_type = t.read_number(1)? as u8;

        match tag_type {
            0x00 => tags.push(MetricTag::FieldRadio {
                signal_strength: t.read_number(1)? as u8,
                bandwidth_utilization: t.read_number(2)? as u16,
            }),
            0x01 => tags.push(MetricTag::Comms {
                lost_packets: t.read_number(2)? as u16,
                sent_packets: t.read_number(2)? as u16,
                average_round_trip_time_ms: t.read_number(1)? as u8,
            }),
            0x02 => tags.push(MetricTag::Laptop {
                battery_percent: t.read_number(1)? as u8,
                cpu_percent: t.read_number(1)? as u8,
            }),
            0x03 => tags.push(MetricTag::RobotRadio {
                signal_strength: t.read_number(1)? as u8,
                bandwidth_utilization: t.read_number(2)? as u16,
            }),
            0x04 => tags.push(MetricTag::PowerDistribution),
            other => {
                // Forward-compatible: newer DS builds send tags we don't
                // know yet. Skip the record, the length prefix already
                // consumed it.
                tracing::debug!(tag_type = other, size, "skipping unknown status tag");
            }
        }

        if t.remaining() > 0 {
            tracing::debug!(
                tag_type,
                trailing = t.remaining(),
                "trailing bytes in status tag record"
            );
        }
    }

    Ok(UdpStatus {
        sequence,
        comm_version,
        status,
        team_number,
        battery_voltage,
        tags,
    })
}

// ── Tests ────────────────────────────────────────────────────────────
