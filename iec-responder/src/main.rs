//! IEC 62056-21 Meter Responder
//!
//! Answers a meter-reading master on a serial port as if the meters listed
//! in the settings file were attached to it.

mod port_info;
mod serial_io;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use iec_sim::{CannedReadouts, ProtocolSession, SessionEvent};
use settings::{ResponderSettings, DEFAULT_SETTINGS_FILE};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "iec-responder", version, about)]
struct Args {
    /// Settings file
    #[arg(short, long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,

    /// Serial port, overriding the settings file
    #[arg(short, long)]
    port: Option<String>,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "iec_responder=info,iec_sim=info,iec_protocol=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if args.list_ports {
        for port in port_info::list_ports().context("failed to enumerate serial ports")? {
            println!("{}\t{}", port.port, port.description);
        }
        return Ok(());
    }

    info!("Starting IEC 62056-21 responder");

    let settings = ResponderSettings::load(&args.config, args.port)?;
    let registry = Arc::new(settings.registry());
    let config = settings.session_config()?;
    for (index, device) in registry.iter().enumerate() {
        info!(
            "Device {}: {} {}{}",
            index,
            device.serial_number,
            device.brand,
            if device.enabled { "" } else { " (disabled)" }
        );
    }

    let line = serial_io::open_line(&settings)
        .with_context(|| format!("failed to open {}", settings.port))?;

    let (event_tx, event_rx) = broadcast::channel(64);
    tokio::spawn(log_events(event_rx));

    let mut session =
        ProtocolSession::new(registry, line, CannedReadouts, config).with_event_sender(event_tx);

    tokio::select! {
        result = session.run() => result.context("serial session ended")?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}

/// Follow session events at debug level
async fn log_events(mut rx: broadcast::Receiver<SessionEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => debug!("Session event: {:?}", event),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Event log lagged, {} events dropped", n)
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
