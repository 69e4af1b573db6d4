// ── Network provisioning seam ──
//
// Each alliance station maps to a fixed VLAN, and a configured team gets a
// deterministic subnet derived from its number. Actually writing VLAN and
// DHCP state into the OS belongs to an external collaborator, so the seam
// is a trait; the shipped implementation only logs the plan it would apply.

use std::collections::BTreeMap;

use futures_util::future::BoxFuture;
use tracing::info;

use crate::error::CoreError;
use fieldlink_proto::StationName;

/// VLAN per station, in `StationName::ALL` order.
pub const STATION_VLANS: [u16; 6] = [10, 20, 30, 40, 50, 60];

/// Desired team assignment per station, `None` meaning unassigned.
pub type TeamMap = BTreeMap<StationName, Option<u16>>;

/// Applies a team-to-station plan to the event network.
///
/// Invoked concurrently with the radio configuration POST; a failure here
/// is its own failure domain and never aborts the radio handshake.
pub trait NetworkProvisioner: Send + Sync {
    fn provision<'a>(
        &'a self,
        teams: &'a TeamMap,
        interface: &'a str,
    ) -> BoxFuture<'a, Result<(), CoreError>>;
}

/// The team number is the leading digit run of the SSID
/// (`"1234-A"` -> 1234). Anything else means the SSID carries no team.
pub fn team_number_from_ssid(ssid: &str) -> Option<u16> {
    let digits: String = ssid.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// The VLAN a station's traffic lands on.
pub fn station_vlan(station: StationName) -> u16 {
    STATION_VLANS[station.index() as usize]
}

/// The /24 a team's devices live in: `10.(team / 100).(team % 100).0`.
pub fn team_subnet(team: u16) -> String {
    format!("10.{}.{}.0/24", team / 100, team % 100)
}

/// Provisioner that logs the plan instead of touching the OS.
#[derive(Debug, Default, Clone)]
pub struct LoggingProvisioner;

impl NetworkProvisioner for LoggingProvisioner {
    fn provision<'a>(
        &'a self,
        teams: &'a TeamMap,
        interface: &'a str,
    ) -> BoxFuture<'a, Result<(), CoreError>> {
        Box::pin(async move {
            for station in StationName::ALL {
                let vlan = station_vlan(station);
                match teams.get(&station).copied().flatten() {
                    Some(team) => info!(
                        %station,
                        vlan,
                        team,
                        subnet = %team_subnet(team),
                        interface,
                        "would provision station network"
                    ),
                    None => info!(%station, vlan, interface, "would clear station network"),
                }
            }
            Ok(())
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_number_is_the_leading_digit_run() {
        assert_eq!(team_number_from_ssid("1234-A"), Some(1234));
        assert_eq!(team_number_from_ssid("254"), Some(254));
        assert_eq!(team_number_from_ssid("9-practice-2"), Some(9));
        assert_eq!(team_number_from_ssid("team1234"), None);
        assert_eq!(team_number_from_ssid(""), None);
    }

    #[test]
    fn station_vlans_follow_station_order() {
        assert_eq!(station_vlan(StationName::Red1), 10);
        assert_eq!(station_vlan(StationName::Red3), 30);
        assert_eq!(station_vlan(StationName::Blue1), 40);
        assert_eq!(station_vlan(StationName::Blue3), 60);
    }

    #[test]
    fn team_subnet_splits_the_number() {
        assert_eq!(team_subnet(4131), "10.41.31.0/24");
        assert_eq!(team_subnet(9), "10.0.9.0/24");
        assert_eq!(team_subnet(100), "10.1.0.0/24");
    }
}
