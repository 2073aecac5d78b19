//! SlimeBridge - USB receiver to SlimeVR server bridge
//!
//! Main entry point for the bridge.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use slimebridge::bridge::Bridge;
use slimebridge::config::{self, BridgeConfig};
use slimebridge::receiver::{HidReceiverOpener, ReceiverInfo};
use slimebridge::slimevr::UdpSink;

/// Forward tracker data from a USB receiver to a SlimeVR server
#[derive(Parser, Debug)]
#[command(name = "slimebridge", version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to config.toml in the data directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SlimeVR server address (overrides the configuration)
    #[arg(long)]
    host: Option<String>,

    /// SlimeVR server UDP port (overrides the configuration)
    #[arg(long)]
    port: Option<u16>,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// List all HID devices and exit
    #[arg(short, long, default_value_t = false)]
    list: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting SlimeBridge v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    }
    .context("Failed to load configuration")?;

    apply_overrides(&mut config, &args);

    let mut opener = HidReceiverOpener::new().context("Failed to initialize HID API")?;

    if args.list {
        let devices = opener.list_devices()?;
        print_devices(&devices);
        return Ok(());
    }

    let settings = config.bridge_settings();

    if let Err(e) = opener.find_receiver(settings.vendor_id, settings.product_id) {
        tracing::error!("Tracker receiver not found!");
        tracing::info!("Please make sure that:");
        tracing::info!("  1. The receiver is plugged into a USB port");
        tracing::info!("  2. The receiver firmware is correct");
        tracing::info!(
            "  3. VID/PID is {:04X}/{:04X}",
            settings.vendor_id,
            settings.product_id
        );
        tracing::info!("Run with --list to see all HID devices");
        return Err(e.into());
    }

    let server_address = config.server_address();
    let sink = UdpSink::connect(&server_address)
        .with_context(|| format!("Failed to set up UDP socket for {}", server_address))?;

    let mut bridge = Bridge::new(settings, Box::new(sink));
    let stop = bridge.stop_signal();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received");
            stop.trigger();
        }
    });

    tracing::info!("Forwarding to SlimeVR server at {}", server_address);
    tracing::info!("Press Ctrl+C to stop");

    let report = tokio::task::spawn_blocking(move || bridge.run(&opener))
        .await
        .context("Bridge task failed")??;

    tracing::info!(
        "Frames: {} read, {} decoded, {} read errors; packets: {} sent, {} dropped",
        report.frames_read,
        report.readings_decoded,
        report.read_errors,
        report.packets_sent,
        report.send_errors
    );

    Ok(())
}

fn apply_overrides(config: &mut BridgeConfig, args: &Args) {
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
}

fn print_devices(devices: &[ReceiverInfo]) {
    println!("HID devices:");
    for device in devices {
        println!(
            "  VID={:#06x} PID={:#06x}{}",
            device.vendor_id,
            device.product_id,
            if device.is_receiver_candidate() {
                "  (receiver)"
            } else {
                ""
            }
        );
        println!("    Product: {}", device.product.as_deref().unwrap_or("N/A"));
        println!(
            "    Manufacturer: {}",
            device.manufacturer.as_deref().unwrap_or("N/A")
        );
        println!();
    }
}
