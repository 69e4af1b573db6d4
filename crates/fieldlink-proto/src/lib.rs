// fieldlink-proto: DS/FMS binary wire protocol.
//
// Everything the driver-station link speaks: the bounds-checked buffer
// primitives, the TCP frame and UDP datagram codecs, the outgoing control
// packet encoder, and the listener service that ties them to sockets.

pub mod buffer;
pub mod control;
pub mod ds;
pub mod error;
pub mod server;
pub mod station;

pub use buffer::{BufferReader, BufferWriter, CodecError};
pub use control::{Control, DsControlPacket, TournamentLevel, encode_control_packet};
pub use ds::{
    DsMessage, DsMode, DsStatus, FrameReassembler, MetricTag, RobotFlags, RobotStatus, UdpStatus,
    decode_tcp_message, decode_udp_status,
};
pub use error::ProtoError;
pub use server::{FmsEvent, FmsServer, FmsServerConfig};
pub use station::StationName;

/// TCP port the driver station connects to for control messages.
pub const DS_TCP_PORT: u16 = 1750;

/// UDP port driver stations send status datagrams to.
pub const DS_UDP_RECV_PORT: u16 = 1160;

/// UDP port control packets are sent from. 1120 would assert full control
/// over the DS; 1121 observes without claiming it.
pub const DS_UDP_SEND_PORT: u16 = 1121;

/// Conventional field-network address the FMS listens on.
pub const DEFAULT_FMS_ADDRESS: &str = "10.0.100.5";
