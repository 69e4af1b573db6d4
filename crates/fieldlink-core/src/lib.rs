// fieldlink-core: the radio manager proper.
//
// Couples the HTTP client from `fieldlink-api` to the long-running
// behavior: the status poller and its bounded history, the configuration
// state machine with its device handshake, the coalescing scan service,
// the WebSocket push channel, and the daily clearing schedule.

pub mod config;
pub mod configurator;
pub mod error;
pub mod poller;
pub mod provision;
pub mod push;
pub mod scan;
pub mod schedule;

pub use config::FieldConfig;
pub use configurator::{ConfigureRequest, Configurator};
pub use error::CoreError;
pub use poller::StatusPoller;
pub use provision::{LoggingProvisioner, NetworkProvisioner, TeamMap, team_number_from_ssid};
pub use push::PushServer;
pub use scan::ScanService;
pub use schedule::spawn_daily_clear;
