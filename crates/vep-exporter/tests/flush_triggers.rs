use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use vep_compress::{Compressor, NoneCompressor};
use vep_core::{ConnectionState, MessageHeader, Persistence, Quality, QueueLevel, SignalSample, Value, VepResult};
use vep_exporter::{ExporterPipeline, FlushTriggers};
use vep_transport::{BackendTransport, ConnectionStatusCallback, ContentCallback, QueueStatusCallback, TransportStatsSnapshot};

/// A `BackendTransport` test double that records every published frame
/// in-process instead of touching a broker.
struct RecordingTransport {
    published: Mutex<Vec<Vec<u8>>>,
    publish_count: AtomicU64,
}

impl RecordingTransport {
    fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            publish_count: AtomicU64::new(0),
        }
    }
}

impl BackendTransport for RecordingTransport {
    fn start(&self) -> VepResult<()> {
        Ok(())
    }

    fn stop(&self) {}

    fn publish(&self, bytes: &[u8], _persistence: Persistence) -> (bool, QueueLevel) {
        self.published.lock().unwrap().push(bytes.to_vec());
        self.publish_count.fetch_add(1, Ordering::SeqCst);
        (true, QueueLevel::Low)
    }

    fn on_content(&self, _cb: ContentCallback) {}
    fn on_connection_status(&self, _cb: ConnectionStatusCallback) {}
    fn on_queue_status(&self, _cb: QueueStatusCallback) {}

    fn content_id(&self) -> u32 {
        1
    }

    fn connection_state(&self) -> ConnectionState {
        ConnectionState::Connected
    }

    fn queue_full(&self) -> bool {
        false
    }

    fn healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> TransportStatsSnapshot {
        TransportStatsSnapshot::default()
    }
}

fn signal(path: &str) -> SignalSample {
    SignalSample {
        header: MessageHeader::new("ecu-1", 1_000_000_000, 0),
        path: path.into(),
        quality: Quality::Valid,
        value: Value::Double(1.0),
    }
}

#[test]
fn a_full_batch_triggers_a_flush_without_waiting_for_the_timer() {
    let transport = RecordingTransport::new();
    let pipeline = Arc::new(ExporterPipeline::new(
        "ecu-1",
        Box::new(NoneCompressor::default()),
        Box::new(transport),
        FlushTriggers {
            batch_max_items: 2,
            batch_max_bytes: 1 << 20,
            batch_timeout: Duration::from_secs(30),
        },
        Persistence::BestEffort,
    ));

    pipeline.start().unwrap();
    pipeline.send_signal(signal("a"));
    pipeline.send_signal(signal("b"));

    // Give the worker a moment to wake on the notify and flush.
    std::thread::sleep(Duration::from_millis(200));
    assert!(pipeline.stats().batches_sent.load(Ordering::SeqCst) >= 1);

    pipeline.stop();
}

#[test]
fn stop_performs_a_terminal_flush() {
    let transport = RecordingTransport::new();
    let pipeline = Arc::new(ExporterPipeline::new(
        "ecu-1",
        Box::new(NoneCompressor::default()),
        Box::new(transport),
        FlushTriggers {
            batch_max_items: 100,
            batch_max_bytes: 1 << 20,
            batch_timeout: Duration::from_secs(30),
        },
        Persistence::BestEffort,
    ));

    pipeline.start().unwrap();
    pipeline.send_signal(signal("a"));
    pipeline.stop();

    assert_eq!(pipeline.stats().batches_sent.load(Ordering::SeqCst), 1);
}

#[test]
fn sends_while_not_running_are_silently_dropped() {
    let transport = RecordingTransport::new();
    let pipeline = Arc::new(ExporterPipeline::new(
        "ecu-1",
        Box::new(NoneCompressor::default()),
        Box::new(transport),
        FlushTriggers {
            batch_max_items: 100,
            batch_max_bytes: 1 << 20,
            batch_timeout: Duration::from_secs(30),
        },
        Persistence::BestEffort,
    ));

    pipeline.send_signal(signal("a"));
    assert_eq!(pipeline.stats().records_dropped_not_running.load(Ordering::SeqCst), 1);
    assert_eq!(pipeline.stats().records_ingested.load(Ordering::SeqCst), 0);
}
