//! Fabric <-> RT bridge process. Runs at the RT boundary, forwarding
//! actuator targets through the configured `RtTransport` variant and
//! publishing RT actuals back to the fabric.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use vep_actuator::{create_rt_transport, BridgeB, BridgeBConfig, InMemoryFabricBus, RtTransportConfig};
use vep_core::VepConfig;

#[derive(Parser, Debug)]
#[command(name = "vep-bridge-b")]
#[command(about = "Fabric <-> RT controller actuator bridge")]
struct Args {
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run() {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(error = %e, "bridge-b failed to start");
            std::process::exit(1);
        }
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = VepConfig::load(&args.config.display().to_string()).context("loading configuration")?;

    let rt_config = RtTransportConfig {
        rt_transport_type: cfg.rt_transport.rt_transport_type.clone(),
        loopback_delay_ms: cfg.rt_transport.loopback_delay_ms,
        udp_target_host: cfg.rt_transport.udp_target_host.clone().unwrap_or_else(|| "127.0.0.1".to_string()),
        udp_target_port: cfg.rt_transport.udp_target_port.unwrap_or(9000),
        udp_listen_port: cfg.rt_transport.udp_listen_port.unwrap_or(0),
        udp_multicast_interface: cfg.rt_transport.udp_multicast_interface.clone().unwrap_or_default(),
    };
    let rt_transport = create_rt_transport(&rt_config).context("creating RT transport")?;

    let bridge_config = BridgeBConfig {
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

    let fabric = Arc::new(InMemoryFabricBus::new());
    let bridge = Arc::new(BridgeB::new(bridge_config, fabric, rt_transport.into()));
    bridge.start().context("starting bridge-b")?;
    info!(rt_transport_type = %cfg.rt_transport.rt_transport_type, "bridge-b running");

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))?;

    while !shutdown.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }

    info!("shutdown signal received, stopping bridge-b");
    bridge.stop();
    Ok(())
}
