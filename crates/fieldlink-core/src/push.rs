// ── Push channel ──
//
// WebSocket server that streams status history to dashboards and accepts
// station configuration commands back. Each connection first receives the
// full retained history as one JSON array, then one message per new
// status entry. Inbound messages must decode to a known command shape;
// anything else gets a structured error reply on that connection only.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::configurator::{ConfigureRequest, Configurator};
use crate::error::CoreError;
use crate::poller::StatusPoller;
use fieldlink_api::StationName;

/// Commands a dashboard may send over the push channel.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum InboundCommand {
    #[serde(rename_all = "camelCase")]
    Station {
        station: StationName,
        ssid: String,
        wpa_key: String,
        #[serde(default)]
        stage: bool,
    },
}

/// Handle to the running push server.
pub struct PushServer {
    local_addr: SocketAddr,
    cancel: CancellationToken,
}

impl PushServer {
    /// Bind `addr` and start accepting push connections.
    pub async fn start(
        addr: SocketAddr,
        poller: StatusPoller,
        configurator: Configurator,
        cancel: CancellationToken,
    ) -> Result<Self, CoreError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "push server listening");

        let accept_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = accept_cancel.cancelled() => break,
                    accepted = listener.accept() => {
                        match accepted {
                            Ok((stream, peer)) => {
                                let poller = poller.clone();
                                let configurator = configurator.clone();
                                let conn_cancel = accept_cancel.clone();
                                tokio::spawn(async move {
                                    if let Err(e) =
                                        serve_connection(stream, peer, poller, configurator, conn_cancel).await
                                    {
                                        debug!(%peer, error = %e, "push connection ended");
                                    }
                                });
                            }
                            Err(e) => warn!(error = %e, "push accept failed"),
                        }
                    }
                }
            }
            debug!("push accept loop exiting");
        });

        Ok(Self { local_addr, cancel })
    }

    /// The bound address (useful when started with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    poller: StatusPoller,
    configurator: Configurator,
    cancel: CancellationToken,
) -> Result<(), CoreError> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    info!(%peer, "push client connected");
    let (mut sink, mut inbound) = ws.split();

    // Subscribe before snapshotting so no entry falls between the batch
    // and the live stream. An entry appended between these two lines shows
    // up twice (batch and live); duplicates are the accepted cost, a gap
    // would not be.
    let mut updates = poller.subscribe();
    let history = poller.history();
    sink.send(Message::text(serde_json::to_string(&history)?)).await?;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            update = updates.recv() => {
                match update {
                    Ok(entry) => {
                        // A connection that can't keep up is dropped, not retried.
                        sink.send(Message::text(serde_json::to_string(&*entry)?)).await?;
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(%peer, missed, "push client lagging, entries skipped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            message = inbound.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) =
                            handle_command(text.as_str(), &configurator, peer).await
                        {
                            sink.send(Message::text(reply)).await?;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // binary/ping/pong: nothing to do
                    Some(Err(e)) => {
                        debug!(%peer, error = %e, "push read error");
                        break;
                    }
                }
            }
        }
    }

    info!(%peer, "push client disconnected");
    Ok(())
}

/// Decode and apply one inbound command. Returns an error reply for the
/// sending connection when something goes wrong; `None` on success.
async fn handle_command(
    text: &str,
    configurator: &Configurator,
    peer: SocketAddr,
) -> Option<String> {
    let command: InboundCommand = match serde_json::from_str(text) {
        Ok(command) => command,
        Err(e) => {
            warn!(%peer, error = %e, "malformed push command");
            return Some(error_reply(format!("malformed command: {e}")));
        }
    };

    match command {
        InboundCommand::Station {
            station,
            ssid,
            wpa_key,
            stage,
        } => {
            let request = ConfigureRequest { ssid, wpa_key, stage };
            if let Err(e) = configurator.configure(station, request).await {
                warn!(%peer, %station, error = %e, "configuration via push channel failed");
                return Some(error_reply(format!("configuration failed: {e}")));
            }
        }
    }
    None
}

fn error_reply(message: String) -> String {
    json!({ "type": "error", "message": message }).to_string()
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldConfig;
    use crate::provision::LoggingProvisioner;
    use fieldlink_api::RadioClient;
    use serde_json::Value;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_radio() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "channel": 93,
                "channelBandwidth": "40MHz",
                "redVlans": "10_20_30",
                "blueVlans": "40_50_60",
                "status": "ACTIVE",
                "stationStatuses": {
                    "red1": null, "red2": null, "red3": null,
                    "blue1": null, "blue2": null, "blue3": null
                },
                "syslogIpAddress": "10.0.100.40",
                "version": "1.2.3"
            })))
            .mount(&server)
            .await;
        server
    }

    async fn start_stack() -> (PushServer, StatusPoller, Configurator, MockServer) {
        let radio = mock_radio().await;
        let client = RadioClient::new(&radio.uri(), Duration::from_secs(1)).unwrap();
        let poller = StatusPoller::new(client.clone(), Duration::from_secs(30));
        let configurator = Configurator::new(
            client,
            poller.clone(),
            Arc::new(LoggingProvisioner),
            FieldConfig::default(),
        );

        let server = PushServer::start(
            "127.0.0.1:0".parse().unwrap(),
            poller.clone(),
            configurator.clone(),
            CancellationToken::new(),
        )
        .await
        .unwrap();
        (server, poller, configurator, radio)
    }

    #[tokio::test]
    async fn client_receives_history_then_live_entries() {
        let (server, poller, _configurator, _radio) = start_stack().await;
        poller.poll_once().await;

        let url = format!("ws://{}", server.local_addr());
        let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();

        let first = ws.next().await.unwrap().unwrap();
        let batch: Value = serde_json::from_str(first.to_text().unwrap()).unwrap();
        let batch = batch.as_array().expect("history batch is an array");
        assert_eq!(batch.len(), 1);

        poller.poll_once().await;
        let live = ws.next().await.unwrap().unwrap();
        let entry: Value = serde_json::from_str(live.to_text().unwrap()).unwrap();
        assert!(entry["radioUpdate"].is_object());

        server.shutdown();
    }

    #[tokio::test]
    async fn station_command_stages_configuration() {
        let (server, _poller, configurator, _radio) = start_stack().await;

        let url = format!("ws://{}", server.local_addr());
        let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        // history batch
        ws.next().await.unwrap().unwrap();

        ws.send(Message::text(
            json!({
                "type": "station",
                "station": "red1",
                "ssid": "1234-A",
                "wpaKey": "supersecret",
                "stage": true
            })
            .to_string(),
        ))
        .await
        .unwrap();

        // Staging happens asynchronously to this test; poll for it.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let active = configurator.active_config();
            if let Some(config) = active.get(&StationName::Red1) {
                assert_eq!(config.ssid, "1234-A");
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "command never applied");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        server.shutdown();
    }

    #[tokio::test]
    async fn malformed_command_gets_structured_error() {
        let (server, _poller, _configurator, _radio) = start_stack().await;

        let url = format!("ws://{}", server.local_addr());
        let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        ws.next().await.unwrap().unwrap(); // history batch

        ws.send(Message::text("{\"type\":\"launch\"}".to_string()))
            .await
            .unwrap();

        let reply = ws.next().await.unwrap().unwrap();
        let reply: Value = serde_json::from_str(reply.to_text().unwrap()).unwrap();
        assert_eq!(reply["type"], "error");
        assert!(reply["message"].as_str().unwrap().contains("malformed"));

        server.shutdown();
    }
}
