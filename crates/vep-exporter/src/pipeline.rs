//! The unified exporter pipeline: ingest -> batch -> compress -> publish,
//! orchestrated by a single background flush worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{info, trace, warn};
use vep_batch::UnifiedBatchBuilder;
use vep_compress::Compressor;
use vep_core::{Event, IngestRecord, LogEntry, MetricSample, Persistence, SignalSample, VepResult};
use vep_transport::BackendTransport;

use crate::stats::PipelineStats;

/// Configuration for flush triggers, independent of transport/compressor
/// wiring so tests can exercise the worker with small thresholds.
#[derive(Debug, Clone, Copy)]
pub struct FlushTriggers {
    pub batch_max_items: usize,
    pub batch_max_bytes: usize,
    pub batch_timeout: Duration,
}

struct WorkerSignal {
    lock: Mutex<bool>,
    cvar: Condvar,
}

impl WorkerSignal {
    fn new() -> Self {
        Self {
            lock: Mutex::new(false),
            cvar: Condvar::new(),
        }
    }

    fn notify(&self) {
        let mut flag = self.lock.lock().expect("worker signal mutex poisoned");
        *flag = true;
        self.cvar.notify_one();
    }

    fn wait(&self, timeout: Duration) {
        let flag = self.lock.lock().expect("worker signal mutex poisoned");
        let (mut flag, _timeout_result) = self.cvar.wait_timeout(flag, timeout).expect("worker signal mutex poisoned");
        *flag = false;
    }
}

/// Orchestrates the unified batch builder, a compressor, and a bound
/// `BackendTransport` with exactly one background thread -- the flush
/// worker. Must be held in an `Arc` to call [`start`](Self::start).
pub struct ExporterPipeline {
    builder: UnifiedBatchBuilder,
    compressor: Box<dyn Compressor>,
    transport: Box<dyn BackendTransport>,
    triggers: FlushTriggers,
    persistence: Persistence,
    running: AtomicBool,
    signal: WorkerSignal,
    worker: Mutex<Option<JoinHandle<()>>>,
    stats: PipelineStats,
}

impl ExporterPipeline {
    pub fn new(
        source_id: impl Into<String>,
        compressor: Box<dyn Compressor>,
        transport: Box<dyn BackendTransport>,
        triggers: FlushTriggers,
        persistence: Persistence,
    ) -> Self {
        Self {
            builder: UnifiedBatchBuilder::new(source_id, triggers.batch_max_items),
            compressor,
            transport,
            triggers,
            persistence,
            running: AtomicBool::new(false),
            signal: WorkerSignal::new(),
            worker: Mutex::new(None),
            stats: PipelineStats::default(),
        }
    }

    pub fn send_signal(self: &Arc<Self>, record: SignalSample) {
        self.send(IngestRecord::Signal(record));
    }

    pub fn send_event(self: &Arc<Self>, record: Event) {
        self.send(IngestRecord::Event(record));
    }

    pub fn send_metric(self: &Arc<Self>, record: MetricSample) {
        self.send(IngestRecord::Metric(record));
    }

    pub fn send_log(self: &Arc<Self>, record: LogEntry) {
        self.send(IngestRecord::Log(record));
    }

    /// Non-blocking beyond the builder's mutex acquisition. Dropping a
    /// record while not running is silent and never counted as a failure.
    fn send(self: &Arc<Self>, record: IngestRecord) {
        if !self.running.load(Ordering::SeqCst) {
            self.stats.record_dropped_not_running();
            return;
        }
        self.builder.add(record);
        self.stats.record_ingested();
        self.check_flush_needed();
    }

    fn check_flush_needed(&self) {
        if self.builder.full() || self.builder.estimated_size() >= self.triggers.batch_max_bytes {
            self.signal.notify();
        }
    }

    /// Opens the transport and launches the flush worker. A second call
    /// while already running is a no-op.
    pub fn start(self: &Arc<Self>) -> VepResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.transport.start()?;

        let pipeline = Arc::clone(self);
        let handle = std::thread::spawn(move || pipeline.run_worker());
        *self.worker.lock().expect("worker handle mutex poisoned") = Some(handle);
        info!("exporter pipeline started");
        Ok(())
    }

    /// Sets the run flag false, wakes the worker, joins it (which performs
    /// one terminal flush), then closes the transport.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.signal.notify();
        if let Some(handle) = self.worker.lock().expect("worker handle mutex poisoned").take() {
            let _ = handle.join();
        }
        self.transport.stop();
        info!("exporter pipeline stopped");
    }

    fn run_worker(self: Arc<Self>) {
        while self.running.load(Ordering::SeqCst) {
            self.signal.wait(self.triggers.batch_timeout);
            if self.builder.ready() {
                self.do_flush();
            }
        }
        // Terminal flush: stop() already woke us and cleared the run flag,
        // but any records added between the last flush and shutdown still
        // need to go out.
        self.do_flush();
    }

    fn do_flush(&self) {
        if !self.builder.ready() {
            return;
        }
        let (bytes, encode_stats) = self.builder.build();
        let compressed = self.compressor.compress(&bytes);
        let (published, queue_level) = self.transport.publish(&compressed, self.persistence);
        self.stats.record_flush(bytes.len(), compressed.len(), published);

        metrics::counter!("vep_exporter_batches_sent_total").increment(published as u64);
        metrics::histogram!("vep_exporter_batch_bytes").record(compressed.len() as f64);

        if !published {
            warn!(
                items = encode_stats.items_encoded,
                ?queue_level,
                "batch publish failed"
            );
        } else {
            trace!(
                items = encode_stats.items_encoded,
                bytes_before = bytes.len(),
                bytes_after = compressed.len(),
                ratio = self.stats.compression_ratio(),
                "batch flushed"
            );
        }
    }

    pub fn healthy(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.transport.healthy()
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }
}
