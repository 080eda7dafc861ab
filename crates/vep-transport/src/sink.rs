//! One-way publish abstraction used by the legacy per-kind pipeline, which
//! produces multiple topic-named byte streams rather than binding to one
//! content id.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::stats::{TransportStats, TransportStatsSnapshot};

pub trait TransportSink: Send + Sync {
    fn name(&self) -> &str;
    fn start(&self) -> bool;
    fn stop(&self);
    fn publish(&self, topic: &str, bytes: &[u8]) -> bool;
    fn healthy(&self) -> bool;
    fn stats(&self) -> TransportStatsSnapshot;
}

/// In-process sink that records every publish instead of sending it
/// anywhere, used by tests and as a local development fallback.
pub struct InMemoryTransportSink {
    name: String,
    running: AtomicBool,
    stats: TransportStats,
    published: Mutex<Vec<(String, Vec<u8>)>>,
}

impl InMemoryTransportSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            running: AtomicBool::new(false),
            stats: TransportStats::default(),
            published: Mutex::new(Vec::new()),
        }
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().expect("sink mutex poisoned").clone()
    }
}

impl TransportSink for InMemoryTransportSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> bool {
        self.running.store(true, Ordering::SeqCst);
        true
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn publish(&self, topic: &str, bytes: &[u8]) -> bool {
        if !self.running.load(Ordering::SeqCst) {
            self.stats.record_send_failure();
            return false;
        }
        self.stats.record_send(bytes.len(), now_ns());
        self.published
            .lock()
            .expect("sink mutex poisoned")
            .push((topic.to_string(), bytes.to_vec()));
        true
    }

    fn healthy(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn stats(&self) -> TransportStatsSnapshot {
        self.stats.snapshot()
    }
}

fn now_ns() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_before_start_fails_and_counts_as_failure() {
        let sink = InMemoryTransportSink::new("legacy-signals");
        assert!(!sink.publish("vep/signals", b"x"));
        assert_eq!(sink.stats().messages_failed, 1);
    }

    #[test]
    fn publish_after_start_records_the_topic_and_bytes() {
        let sink = InMemoryTransportSink::new("legacy-signals");
        sink.start();
        assert!(sink.publish("vep/signals", b"payload"));
        let published = sink.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "vep/signals");
    }
}
