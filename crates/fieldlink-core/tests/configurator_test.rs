// Integration tests for the configuration handshake against a mock radio.
//
// Mocks are consumed in mount order, which is how these tests walk the
// radio through its status sequence: a few pre-commit snapshots, then
// CONFIGURING while the new configuration applies, then ACTIVE.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fieldlink_api::{RadioClient, StationName};
use fieldlink_core::{
    ConfigureRequest, Configurator, CoreError, FieldConfig, LoggingProvisioner, StatusPoller,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn status_body(status: &str) -> serde_json::Value {
    json!({
        "channel": 93,
        "channelBandwidth": "40MHz",
        "redVlans": "10_20_30",
        "blueVlans": "40_50_60",
        "status": status,
        "stationStatuses": {
            "red1": null, "red2": null, "red3": null,
            "blue1": null, "blue2": null, "blue3": null
        },
        "syslogIpAddress": "10.0.100.50",
        "version": "1.2.3"
    })
}

fn test_config(radio_url: &str) -> FieldConfig {
    FieldConfig {
        radio_url: radio_url.to_string(),
        poll_interval: Duration::from_millis(20),
        configuring_deadline: Duration::from_millis(500),
        settle_deadline: Duration::from_secs(5),
        ..FieldConfig::default()
    }
}

struct Stack {
    configurator: Configurator,
    poller: StatusPoller,
    cancel: CancellationToken,
}

impl Drop for Stack {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn start_stack(server: &MockServer, config: FieldConfig) -> Stack {
    let client = RadioClient::new(&server.uri(), Duration::from_secs(1)).unwrap();
    let poller = StatusPoller::new(client.clone(), config.history_window);
    let cancel = CancellationToken::new();
    poller.start(config.poll_interval, cancel.clone());
    let configurator = Configurator::new(
        client,
        poller.clone(),
        Arc::new(LoggingProvisioner),
        config,
    );
    Stack {
        configurator,
        poller,
        cancel,
    }
}

async fn mount_status(server: &MockServer, status: &str, times: Option<u64>) {
    let mut mock = Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(status)));
    if let Some(times) = times {
        mock = mock.up_to_n_times(times);
    }
    mock.mount(server).await;
}

// ── Handshake ───────────────────────────────────────────────────────

#[tokio::test]
async fn commit_completes_when_radio_configures_and_settles() {
    let server = MockServer::start().await;
    mount_status(&server, "CONFIGURING", Some(4)).await;
    mount_status(&server, "ACTIVE", None).await;
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

    let stack = start_stack(&server, test_config(&server.uri())).await;
    stack
        .configurator
        .configure(
            StationName::Red1,
            ConfigureRequest {
                ssid: "1234-A".into(),
                wpa_key: "supersecret".into(),
                stage: false,
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn commit_fails_when_configuring_never_arrives() {
    let server = MockServer::start().await;
    mount_status(&server, "ACTIVE", None).await;
    // Two POSTs prove the single-flight guard clears after a failure.
    Mock::given(method("POST"))
        .and(path("/configuration"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri());
    config.configuring_deadline = Duration::from_millis(200);
    let stack = start_stack(&server, config).await;

    let request = ConfigureRequest {
        ssid: "1234-A".into(),
        wpa_key: "supersecret".into(),
        stage: false,
    };
    let err = stack
        .configurator
        .configure(StationName::Red1, request.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotAcknowledged(_)), "got {err:?}");

    // The guard must be free again.
    let err = stack
        .configurator
        .configure(StationName::Red1, request)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotAcknowledged(_)), "got {err:?}");
}

#[tokio::test]
async fn settling_anywhere_but_active_is_an_error() {
    let server = MockServer::start().await;
    mount_status(&server, "CONFIGURING", Some(4)).await;
    mount_status(&server, "ERROR", None).await;
    Mock::given(method("POST"))
        .and(path("/configuration"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let stack = start_stack(&server, test_config(&server.uri())).await;
    let err = stack
        .configurator
        .configure(
            StationName::Red1,
            ConfigureRequest {
                ssid: "1234-A".into(),
                wpa_key: "supersecret".into(),
                stage: false,
            },
        )
        .await
        .unwrap_err();
    match err {
        CoreError::UnexpectedStatus { status } => {
            assert_eq!(status.to_string(), "ERROR");
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

// ── Single flight ───────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_commits_collapse_to_one_post() {
    let server = MockServer::start().await;
    mount_status(&server, "ACTIVE", None).await;
    Mock::given(method("POST"))
        .and(path("/configuration"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(100)))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri());
    config.configuring_deadline = Duration::from_millis(300);
    let stack = start_stack(&server, config).await;

    stack
        .configurator
        .configure(
            StationName::Red1,
            ConfigureRequest {
                ssid: "1234-A".into(),
                wpa_key: "supersecret".into(),
                stage: true,
            },
        )
        .await
        .unwrap();

    let (a, b) = tokio::join!(stack.configurator.commit(), stack.configurator.commit());
    // One commit runs the handshake (and fails: the radio never reports
    // CONFIGURING here); the other is skipped and reports success.
    let outcomes = [a.is_ok(), b.is_ok()];
    assert_eq!(
        outcomes.iter().filter(|ok| **ok).count(),
        1,
        "exactly one commit should be skipped, got {outcomes:?}"
    );
}

// ── Empty-set quirk ─────────────────────────────────────────────────

#[tokio::test]
async fn empty_station_set_sends_syslog_only_payload() {
    let server = MockServer::start().await;
    // Two pre-commit snapshots so the poller has observed a syslog address.
    mount_status(&server, "ACTIVE", Some(2)).await;
    mount_status(&server, "CONFIGURING", Some(2)).await;
    mount_status(&server, "ACTIVE", None).await;
    Mock::given(method("POST"))
        .and(path("/configuration"))
        .and(body_json(json!({ "syslogIpAddress": "10.0.100.50" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let stack = start_stack(&server, test_config(&server.uri())).await;

    // Wait for the first successful snapshot before clearing.
    let mut updates = stack.poller.subscribe();
    updates.recv().await.unwrap();

    stack.configurator.clear_all().await.unwrap();
    assert!(stack.configurator.active_config().is_empty());
}

#[tokio::test]
async fn cleared_station_is_absent_from_the_payload() {
    let server = MockServer::start().await;
    mount_status(&server, "CONFIGURING", Some(4)).await;
    mount_status(&server, "ACTIVE", None).await;
    Mock::given(method("POST"))
        .and(path("/configuration"))
        .and(body_json(json!({
            "stationConfigurations": {
                "blue1": { "ssid": "5678-B", "wpaKey": "othersecret" }
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let stack = start_stack(&server, test_config(&server.uri())).await;

    stack
        .configurator
        .configure(
            StationName::Red1,
            ConfigureRequest {
                ssid: "1234-A".into(),
                wpa_key: "supersecret".into(),
                stage: true,
            },
        )
        .await
        .unwrap();
    stack
        .configurator
        .configure(
            StationName::Blue1,
            ConfigureRequest {
                ssid: "5678-B".into(),
                wpa_key: "othersecret".into(),
                stage: true,
            },
        )
        .await
        .unwrap();
    // Empty SSID clears red1; the commit payload must not mention it.
    stack
        .configurator
        .configure(
            StationName::Red1,
            ConfigureRequest {
                ssid: String::new(),
                wpa_key: String::new(),
                stage: false,
            },
        )
        .await
        .unwrap();
}
