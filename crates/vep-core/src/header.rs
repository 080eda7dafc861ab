//! Fixed envelope carried by every ingestable record.

/// Envelope metadata attached to every signal sample, event, metric sample,
/// and log entry as it enters the pipeline.
///
/// Only `timestamp_ns` (via the batch's per-item delta) and `source_id`
/// (injected as the reserved `"service"` label) survive onto the wire --
/// `seq_num` and `correlation_id` are ingestion-side bookkeeping, matching
/// `original_source`'s wire encoder, which never serializes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub source_id: String,
    pub timestamp_ns: u64,
    pub seq_num: u32,
    pub correlation_id: Option<String>,
}

impl MessageHeader {
    pub fn new(source_id: impl Into<String>, timestamp_ns: u64, seq_num: u32) -> Self {
        Self {
            source_id: source_id.into(),
            timestamp_ns,
            seq_num,
            correlation_id: None,
        }
    }

    /// Wall-clock timestamp in milliseconds, used by the batch builder to
    /// compute `timestamp_delta_ms` against the batch's base timestamp.
    pub fn timestamp_ms(&self) -> i64 {
        (self.timestamp_ns / 1_000_000) as i64
    }
}
