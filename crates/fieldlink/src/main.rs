// fieldlink daemon: wires the radio manager stack together.
//
// Polls the field radio, serves the WebSocket push channel, listens for
// driver-station traffic on the FMS ports, and optionally clears all
// station credentials at a fixed local time each day.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveTime;
use clap::Parser;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use fieldlink_api::RadioClient;
use fieldlink_core::{
    Configurator, FieldConfig, LoggingProvisioner, PushServer, ScanService, StatusPoller,
    spawn_daily_clear,
};
use fieldlink_proto::server::{FmsEvent, FmsServer, FmsServerConfig};

#[derive(Parser)]
#[command(name = "fieldlink", version, about = "Field radio access point manager")]
struct Cli {
    /// Radio base URL
    #[arg(long, env = "RADIO_API_URL", default_value = "http://10.0.100.2")]
    radio_url: String,

    /// Push channel bind address
    #[arg(long, env = "SERVER_ADDRESS", default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Push channel listen port
    #[arg(long, env = "SERVER_PORT", default_value_t = 8284)]
    port: u16,

    /// DS/FMS listener bind address
    #[arg(long, env = "FMS_ADDRESS", default_value = fieldlink_proto::DEFAULT_FMS_ADDRESS)]
    fms_address: IpAddr,

    /// Disable the DS/FMS listener
    #[arg(long, env = "DISABLE_FMS_SERVER")]
    no_fms: bool,

    /// Status history retention in milliseconds
    #[arg(long, env = "RADIO_HISTORY_DURATION_MS", default_value_t = 30_000)]
    history_ms: u64,

    /// Status poll interval in milliseconds
    #[arg(long, env = "RADIO_POLL_INTERVAL_MS", default_value_t = 250)]
    poll_ms: u64,

    /// Network interface the provisioning plan targets
    #[arg(long, env = "NETWORK_INTERFACE", default_value = "eth0")]
    interface: String,

    /// Daily station clear time, local HH:MM (omit to disable)
    #[arg(long, env = "DAILY_CLEAR_TIME")]
    clear_at: Option<String>,

    /// Run one channel scan, print the result as JSON, and exit
    #[arg(long)]
    scan: bool,

    /// Increase log verbosity (-v, -vv, ...)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Api(#[from] fieldlink_api::Error),
    #[error(transparent)]
    Core(#[from] fieldlink_core::CoreError),
    #[error(transparent)]
    Proto(#[from] fieldlink_proto::error::ProtoError),
    #[error("invalid --clear-at value {0:?}, expected HH:MM")]
    InvalidClearTime(String),
    #[error("channel scan failed: {0}")]
    Scan(String),
    #[error("failed to serialize scan results: {0}")]
    ScanOutput(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = FieldConfig {
        radio_url: cli.radio_url.clone(),
        poll_interval: Duration::from_millis(cli.poll_ms),
        history_window: Duration::from_millis(cli.history_ms),
        interface: cli.interface.clone(),
        ..FieldConfig::default()
    };
    let clear_at = cli
        .clear_at
        .as_deref()
        .map(|raw| {
            NaiveTime::parse_from_str(raw, "%H:%M")
                .map_err(|_| AppError::InvalidClearTime(raw.to_string()))
        })
        .transpose()?;

    let client = RadioClient::new(&config.radio_url, config.http_timeout)?;

    if cli.scan {
        return run_scan(client, &config).await;
    }

    let cancel = CancellationToken::new();
    let mut tasks = Vec::new();

    let poller = StatusPoller::new(client.clone(), config.history_window);
    tasks.push(poller.start(config.poll_interval, cancel.clone()));
    info!(radio = %config.radio_url, "status poller started");

    let configurator = Configurator::new(
        client,
        poller.clone(),
        Arc::new(LoggingProvisioner),
        config.clone(),
    );

    let push = PushServer::start(
        SocketAddr::new(cli.bind, cli.port),
        poller.clone(),
        configurator.clone(),
        cancel.clone(),
    )
    .await?;
    info!(addr = %push.local_addr(), "push channel listening");

    if cli.no_fms {
        info!("DS/FMS listener disabled");
    } else {
        let fms = FmsServer::start(
            FmsServerConfig {
                address: cli.fms_address,
                ..FmsServerConfig::default()
            },
            cancel.clone(),
        )
        .await?;
        tasks.push(spawn_fms_logger(&fms, cancel.clone()));
    }

    if let Some(at) = clear_at {
        info!(%at, "daily station clear scheduled");
        tasks.push(spawn_daily_clear(configurator.clone(), at, cancel.clone()));
    }

    tokio::signal::ctrl_c().await.ok();
    info!("shutting down");
    cancel.cancel();
    for task in tasks {
        let _ = task.await;
    }
    Ok(())
}

/// One-shot scan mode: run a channel scan and print the report as JSON.
async fn run_scan(client: RadioClient, config: &FieldConfig) -> Result<(), AppError> {
    let service = ScanService::new(client, config.scan_poll_interval);
    info!("starting channel scan, this can take a while");
    // The shared-future wrapper hands out Arc'd errors, so flatten to a
    // printable message here.
    let results = service
        .scan()
        .await
        .map_err(|e| AppError::Scan(e.to_string()))?;
    println!("{}", serde_json::to_string_pretty(&*results)?);
    Ok(())
}

/// Log decoded DS/FMS traffic so field staff can see who is talking.
fn spawn_fms_logger(fms: &FmsServer, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
    let mut events = fms.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = events.recv() => {
                    match event {
                        Ok(event) => match &*event {
                            FmsEvent::Tcp { peer, message } => {
                                info!(%peer, ?message, "DS message");
                            }
                            FmsEvent::Udp { peer, status } => {
                                debug!(
                                    %peer,
                                    sequence = status.sequence,
                                    team = status.team_number,
                                    voltage = status.battery_voltage,
                                    "DS status"
                                );
                            }
                        },
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                            warn!(missed, "FMS event logger lagging");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    })
}
