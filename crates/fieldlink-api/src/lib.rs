// fieldlink-api: typed HTTP client for the field radio.
//
// The radio exposes three surfaces: a JSON status endpoint polled
// continuously, a configuration endpoint with stateful quirks, and a
// plain-text channel scan report. This crate owns the wire models, their
// fail-closed validation, and the scan-report parser.

pub mod client;
pub mod error;
pub mod models;
pub mod scan;

pub use client::RadioClient;
pub use error::Error;
pub use fieldlink_proto::StationName;
pub use models::{
    ConfigurationPayload, ConnectionQuality, RadioStatus, RadioUpdate, StationConfig,
    StationDetails, StationStatuses, StatusEntry, VlanGroup,
};
pub use scan::{AdditionalChannelStatistic, ChannelScanDetails, ScanResults, parse_scan_report};
