use std::sync::atomic::{AtomicU64, Ordering};

/// Cumulative counters for one pipeline instance, held behind a separate
/// mutex-free atomics set so reading them never contends with ingestion.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub records_ingested: AtomicU64,
    pub records_dropped_not_running: AtomicU64,
    pub batches_sent: AtomicU64,
    pub batches_publish_failed: AtomicU64,
    pub bytes_before_compression: AtomicU64,
    pub bytes_after_compression: AtomicU64,
}

impl PipelineStats {
    pub fn record_ingested(&self) {
        self.records_ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_not_running(&self) {
        self.records_dropped_not_running.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flush(&self, bytes_before: usize, bytes_after: usize, published: bool) {
        self.bytes_before_compression.fetch_add(bytes_before as u64, Ordering::Relaxed);
        self.bytes_after_compression.fetch_add(bytes_after as u64, Ordering::Relaxed);
        if published {
            self.batches_sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.batches_publish_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// `bytes_after / bytes_before`, computed on demand rather than tracked
    /// incrementally. `1.0` before any batch has been compressed.
    pub fn compression_ratio(&self) -> f64 {
        let before = self.bytes_before_compression.load(Ordering::Relaxed);
        let after = self.bytes_after_compression.load(Ordering::Relaxed);
        if before == 0 {
            1.0
        } else {
            after as f64 / before as f64
        }
    }
}
