//! The six alliance station slots.
//!
//! Lives in the protocol crate because the station's list position is part
//! of the outgoing control-packet wire format; everything above re-exports
//! it as the map key for per-station state.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One of the six fixed alliance/position slots the radio serves.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StationName {
    Red1,
    Red2,
    Red3,
    Blue1,
    Blue2,
    Blue3,
}

impl StationName {
    /// All stations in wire order. The position in this list is the
    /// alliance-station index carried in control packets.
    pub const ALL: [StationName; 6] = [
        StationName::Red1,
        StationName::Red2,
        StationName::Red3,
        StationName::Blue1,
        StationName::Blue2,
        StationName::Blue3,
    ];

    /// Alliance-station index, 0..=5.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// `true` for the red alliance slots.
    pub fn is_red(self) -> bool {
        matches!(self, Self::Red1 | Self::Red2 | Self::Red3)
    }
}
