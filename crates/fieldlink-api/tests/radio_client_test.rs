// Integration tests for `RadioClient` using wiremock.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fieldlink_api::{
    ConfigurationPayload, Error, RadioClient, RadioStatus, ScanResults, StationConfig, StationName,
    parse_scan_report,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, RadioClient) {
    let server = MockServer::start().await;
    let client = RadioClient::new(&server.uri(), Duration::from_secs(1)).unwrap();
    (server, client)
}

fn status_body() -> serde_json::Value {
    json!({
        "channel": 93,
        "channelBandwidth": "40MHz",
        "redVlans": "10_20_30",
        "blueVlans": "40_50_60",
        "status": "ACTIVE",
        "stationStatuses": {
            "red1": {
                "ssid": "1234-A",
                "hashedWpaKey": "c0ffee",
                "wpaKeySalt": "5a17",
                "isLinked": true,
                "macAddress": "AA:BB:CC:DD:EE:FF",
                "dataAgeMs": 120.0,
                "signalDbm": -52,
                "noiseDbm": -95,
                "signalNoiseRatio": 43,
                "rxRateMbps": 433.3,
                "rxPackets": 4200,
                "rxBytes": 9000000,
                "txRateMbps": 400.0,
                "txPackets": 4100,
                "txBytes": 8700000,
                "bandwidthUsedMbps": 4.2,
                "connectionQuality": "excellent"
            },
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

// ── Status ──────────────────────────────────────────────────────────

#[tokio::test]
async fn status_decodes_valid_snapshot() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body()))
        .mount(&server)
        .await;

    let update = client.status().await.unwrap();
    assert_eq!(update.status, RadioStatus::Active);
    assert_eq!(update.channel, 93);
    let red1 = update.station_statuses.get(StationName::Red1).unwrap();
    assert_eq!(red1.ssid, "1234-A");
    assert!(update.station_statuses.get(StationName::Blue3).is_none());
}

#[tokio::test]
async fn status_rejects_invalid_payload_wholesale() {
    let (server, client) = setup().await;

    // Decodes fine but fails structural validation (channel off-grid).
    let mut body = status_body();
    body["channel"] = json!(6);
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let err = client.status().await.unwrap_err();
    assert!(matches!(err, Error::InvalidPayload { .. }), "got {err:?}");
}

#[tokio::test]
async fn status_surfaces_unknown_fields_as_deserialization_error() {
    let (server, client) = setup().await;

    let mut body = status_body();
    body["surprise"] = json!(true);
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let err = client.status().await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { .. }), "got {err:?}");
}

// ── Configuration ───────────────────────────────────────────────────

#[tokio::test]
async fn post_configuration_sends_expected_body() {
    let (server, client) = setup().await;

    let mut stations = std::collections::BTreeMap::new();
    stations.insert(
        StationName::Red1,
        StationConfig {
            ssid: "1234-A".into(),
            wpa_key: "supersecret".into(),
        },
    );
    let payload = ConfigurationPayload {
        station_configurations: Some(stations),
        syslog_ip_address: None,
    };

    Mock::given(method("POST"))
        .and(path("/configuration"))
        .and(body_json(json!({
            "stationConfigurations": {
                "red1": { "ssid": "1234-A", "wpaKey": "supersecret" }
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.post_configuration(&payload).await.unwrap();
}

#[tokio::test]
async fn non_2xx_carries_status_and_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/configuration"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad config"))
        .mount(&server)
        .await;

    let err = client
        .post_configuration(&ConfigurationPayload::default())
        .await
        .unwrap_err();
    match err {
        Error::Api { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "bad config");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

// ── Scan ────────────────────────────────────────────────────────────

#[tokio::test]
async fn scan_result_returns_report_text() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/scan/start"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/scan/result"))
        .respond_with(ResponseTemplate::new(200).set_body_string(".\n.\n.\n"))
        .mount(&server)
        .await;

    client.scan_start().await.unwrap();
    let report = client.scan_result().await.unwrap();
    assert_eq!(
        parse_scan_report(&report),
        ScanResults::Loading { progress_dots: 3 }
    );
}
