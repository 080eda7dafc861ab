//! Broker <-> fabric bridge process. Ships with the in-memory broker and
//! fabric bus reference implementations; a real deployment swaps in a
//! concrete `BrokerSchema`/`BrokerClient`/`FabricBus` for its databroker
//! and pub/sub fabric.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use vep_actuator::{BridgeA, BridgeAConfig, DiscoveredPath, InMemoryBroker, InMemoryFabricBus};
use vep_core::VepConfig;

#[derive(Parser, Debug)]
#[command(name = "vep-bridge-a")]
#[command(about = "Broker <-> fabric actuator/signal bridge")]
struct Args {
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
    /// Comma-separated actuator paths to seed the reference broker with,
    /// e.g. "Vehicle.Cabin.Light.Intensity,Vehicle.Doors.Row1.Left.IsLocked".
    #[arg(long, value_delimiter = ',')]
    actuator_paths: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run() {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(error = %e, "bridge-a failed to start");
            std::process::exit(1);
        }
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = VepConfig::load(&args.config.display().to_string()).context("loading configuration")?;

    let bridge_config = BridgeAConfig {
        signal_pattern: cfg.fabric.signal_pattern.clone().unwrap_or_else(|| "Vehicle".to_string()),
        fabric_signals_topic: cfg.fabric.dds_signals_topic.clone().unwrap_or_else(|| "rt/vss/signals".to_string()),
        fabric_actuator_target_topic: cfg
            .fabric
            .dds_actuator_target_topic
            .clone()
            .unwrap_or_else(|| "rt/vss/actuators/target".to_string()),
        fabric_actuator_actual_topic: cfg
            .fabric
            .dds_actuator_actual_topic
            .clone()
            .unwrap_or_else(|| "rt/vss/actuators/actual".to_string()),
    };

    let paths: Vec<DiscoveredPath> = args
        .actuator_paths
        .into_iter()
        .map(|path| DiscoveredPath { path, is_actuator: true })
        .collect();
    let broker = Arc::new(InMemoryBroker::new(paths.clone()));
    let schema = InMemoryBroker::new(paths);
    let fabric = Arc::new(InMemoryFabricBus::new());

    let bridge = Arc::new(BridgeA::new(bridge_config, schema, Arc::clone(&broker), Arc::clone(&fabric)));
    bridge.initialize();
    bridge.start();
    info!("bridge-a running");

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))?;

    while !shutdown.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }

    info!("shutdown signal received, stopping bridge-a");
    bridge.stop();
    Ok(())
}
