//! Fabric actuator-target to CAN frame encoder. Subscribes to the fabric's
//! actuator target topic, bit-packs each write through its configured
//! signal mapping, and hands the result off to a `CanTransmitter`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use vep_actuator::{CanFrameEncoder, CanSignalMapping, CanTransmitter, FabricBus, InMemoryFabricBus, LoggingCanTransmitter};
use vep_core::VepConfig;

#[derive(Parser, Debug)]
#[command(name = "vep-can-actuator")]
#[command(about = "Fabric actuator target -> CAN frame encoder")]
struct Args {
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
    /// YAML file holding a list of `CanSignalMapping` entries.
    #[arg(long)]
    mappings: PathBuf,
}

fn load_mappings(path: &PathBuf) -> anyhow::Result<Vec<CanSignalMapping>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading mapping file {}", path.display()))?;
    let mappings: Vec<CanSignalMapping> = serde_yaml::from_str(&text).context("parsing CAN signal mappings")?;
    Ok(mappings)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run() {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(error = %e, "can-actuator failed to start");
            std::process::exit(1);
        }
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = VepConfig::load(&args.config.display().to_string()).context("loading configuration")?;
    let mappings = load_mappings(&args.mappings)?;
    info!(count = mappings.len(), "loaded CAN signal mappings");

    let mappings_by_path: HashMap<String, CanSignalMapping> =
        mappings.into_iter().map(|m| (m.vss_path.clone(), m)).collect();

    let target_topic = cfg
        .fabric
        .dds_actuator_target_topic
        .clone()
        .unwrap_or_else(|| "rt/vss/actuators/target".to_string());

    let fabric = Arc::new(InMemoryFabricBus::new());
    let encoder = Arc::new(CanFrameEncoder::new());
    let transmitter: Arc<dyn CanTransmitter> = Arc::new(LoggingCanTransmitter);

    let reader = fabric.subscribe(&target_topic);

    info!(topic = %target_topic, "can-actuator running");

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))?;

    while !shutdown.load(Ordering::SeqCst) {
        for (_topic, payload) in reader.take_each(100) {
            let Some((path, value)) = vep_actuator::decode_message(bytes::Bytes::copy_from_slice(&payload)) else {
                warn!("malformed actuator target message on fabric; dropping");
                continue;
            };
            let Some(mapping) = mappings_by_path.get(&path) else {
                warn!(path, "no CAN signal mapping for actuator path; dropping");
                continue;
            };
            if encoder.encode_signal(mapping, &value) {
                if let Some(frame) = encoder.snapshot_frame(mapping.can_id) {
                    transmitter.transmit(mapping.can_id, &frame);
                }
            }
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    info!("shutdown signal received, stopping can-actuator");
    Ok(())
}
