//! Standalone host process for the exporter pipeline: ingest -> batch ->
//! compress -> publish. The pipeline itself runs on plain OS threads; the
//! only async runtime here is the ambient Prometheus metrics endpoint.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use vep_core::{MessageHeader, MetricKind, MetricSample, Persistence, VepConfig};
use vep_exporter::{ExporterPipeline, FlushTriggers};
use vep_transport::{MqttBackendTransport, MqttTransportConfig};

/// Flags mirror the configuration file; CLI values take precedence when set.
#[derive(Parser, Debug)]
#[command(name = "vep-exporter-cli")]
#[command(about = "Ingest -> batch -> compress -> publish exporter pipeline")]
struct Args {
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
    #[arg(long)]
    broker: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    #[arg(long)]
    vehicle_id: Option<String>,
    #[arg(long)]
    content_id: Option<u32>,
    #[arg(long)]
    batch_size: Option<usize>,
    #[arg(long)]
    batch_timeout: Option<u64>,
    #[arg(long)]
    compression: Option<String>,
    #[arg(long)]
    no_compression: bool,
    #[arg(long, default_value_t = 9090)]
    metrics_port: u16,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run() {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(error = %e, "exporter-cli failed to start");
            std::process::exit(1);
        }
    }
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut cfg = VepConfig::load(&args.config.display().to_string()).context("loading configuration")?;

    if let Some(broker) = &args.broker {
        cfg.transport.broker_host = broker.clone();
    }
    if let Some(port) = args.port {
        cfg.transport.broker_port = port;
    }
    if let Some(vehicle_id) = &args.vehicle_id {
        cfg.transport.vehicle_id = vehicle_id.clone();
    }
    if let Some(content_id) = args.content_id {
        cfg.transport.content_id = content_id;
    }
    if let Some(batch_size) = args.batch_size {
        cfg.pipeline.batch_max_items = batch_size;
    }
    if let Some(batch_timeout) = args.batch_timeout {
        cfg.pipeline.batch_timeout_ms = batch_timeout;
    }
    if let Some(compression) = &args.compression {
        cfg.pipeline.compression_type = compression.clone();
    }
    if args.no_compression {
        cfg.pipeline.compression_type = "none".to_string();
    }

    let recorder_handle = PrometheusBuilder::new().install_recorder().context("installing metrics recorder")?;
    spawn_metrics_endpoint(args.metrics_port, recorder_handle);

    let compressor = vep_compress::make_compressor(&cfg.pipeline.compression_type, cfg.pipeline.compression_level)?;

    let transport = MqttBackendTransport::new(MqttTransportConfig {
        broker_host: cfg.transport.broker_host.clone(),
        broker_port: cfg.transport.broker_port,
        client_id: cfg.transport.client_id.clone(),
        username: cfg.transport.username.clone(),
        password: cfg.transport.password.clone(),
        keepalive_sec: cfg.transport.keepalive_sec,
        vehicle_id: cfg.transport.vehicle_id.clone(),
        content_id: cfg.transport.content_id.clone(),
        publish_prefix: cfg.transport.v2c_prefix.clone(),
        subscribe_prefix: cfg.transport.c2v_prefix.clone(),
    });

    let pipeline = Arc::new(ExporterPipeline::new(
        cfg.pipeline.source_id.clone(),
        compressor,
        Box::new(transport),
        FlushTriggers {
            batch_max_items: cfg.pipeline.batch_max_items,
            batch_max_bytes: cfg.pipeline.batch_max_bytes,
            batch_timeout: Duration::from_millis(cfg.pipeline.batch_timeout_ms),
        },
        Persistence::BestEffort,
    ));

    pipeline.start().context("starting exporter pipeline")?;
    info!(source_id = %cfg.pipeline.source_id, "exporter pipeline running");

    let shutdown = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&shutdown))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&shutdown))?;

    let mut last_heartbeat = std::time::Instant::now();
    while !shutdown.load(Ordering::SeqCst) {
        if last_heartbeat.elapsed() >= Duration::from_secs(5) {
            emit_heartbeat(&pipeline, &cfg.pipeline.source_id);
            last_heartbeat = std::time::Instant::now();
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    info!("shutdown signal received, stopping pipeline");
    pipeline.stop();
    Ok(())
}

/// No external ingestion adapter is wired into this binary -- that is left
/// to embedding applications. A periodic heartbeat metric keeps the
/// pipeline observably alive end to end when run standalone.
fn emit_heartbeat(pipeline: &Arc<ExporterPipeline>, source_id: &str) {
    let now_ns = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    pipeline.send_metric(MetricSample {
        header: MessageHeader::new(source_id, now_ns, 0),
        name: "vep.exporter.heartbeat".to_string(),
        kind: MetricKind::Gauge(1.0),
        labels: Default::default(),
    });
}

fn spawn_metrics_endpoint(port: u16, handle: metrics_exporter_prometheus::PrometheusHandle) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(rt) => rt,
            Err(e) => {
                error!(error = %e, "failed to build metrics endpoint runtime");
                return;
            }
        };
        runtime.block_on(async move {
            let app = axum::Router::new().route(
                "/metrics",
                axum::routing::get(move || {
                    let handle = handle.clone();
                    async move { handle.render() }
                }),
            );
            let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
            match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => {
                    if let Err(e) = axum::serve(listener, app).await {
                        error!(error = %e, "metrics endpoint stopped");
                    }
                }
                Err(e) => error!(error = %e, port, "failed to bind metrics endpoint"),
            }
        });
    });
}
