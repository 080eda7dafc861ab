//! The unified batch builder: accumulates any of the four ingestable record
//! kinds in arrival order, pre-encoding each at `add()` time.

use std::sync::Mutex;

use bytes::Bytes;
use tracing::trace;
use vep_codec::{assemble_unified_frame, encode_item_bytes, item_delta_ms, EncodeStats};
use vep_core::IngestRecord;

#[derive(Debug, Default, Clone, Copy)]
pub struct BuilderStats {
    pub items_added: u64,
    pub age_dropped: u64,
    pub struct_fields_dropped: u64,
    pub batches_built: u64,
}

struct Inner {
    sequence: u64,
    base_timestamp_ms: Option<i64>,
    encoded_items: Vec<Bytes>,
    estimated_size: usize,
    stats: BuilderStats,
}

impl Inner {
    fn new() -> Self {
        Self {
            sequence: 0,
            base_timestamp_ms: None,
            encoded_items: Vec::new(),
            estimated_size: 0,
            stats: BuilderStats::default(),
        }
    }

    fn reset(&mut self) {
        self.base_timestamp_ms = None;
        self.encoded_items.clear();
        self.estimated_size = 0;
    }
}

/// Mutex-protected accumulator for one `TransferBatch` at a time. All
/// operations take the single internal mutex; `add` does its pre-conversion
/// to wire bytes while holding it, so the caller's record can be dropped
/// the moment `add` returns.
pub struct UnifiedBatchBuilder {
    source_id: String,
    max_items: usize,
    inner: Mutex<Inner>,
}

impl UnifiedBatchBuilder {
    pub fn new(source_id: impl Into<String>, max_items: usize) -> Self {
        Self {
            source_id: source_id.into(),
            max_items,
            inner: Mutex::new(Inner::new()),
        }
    }

    /// Accepts any ingestable record. Sets `base_timestamp_ms` on the first
    /// add of a batch; records older than the base still get added (with an
    /// effective delta of 0) but bump `age_dropped`.
    pub fn add(&self, record: IngestRecord) {
        let mut inner = self.inner.lock().expect("batch builder mutex poisoned");

        let ts = record.timestamp_ms();
        let base = *inner.base_timestamp_ms.get_or_insert(ts);
        if ts < base {
            inner.stats.age_dropped += 1;
        }

        let delta = item_delta_ms(&record, base);
        let (encoded, drops) = encode_item_bytes(&record, delta, &self.source_id);
        inner.estimated_size += encoded.len();
        inner.encoded_items.push(encoded);
        inner.stats.items_added += 1;
        inner.stats.struct_fields_dropped += drops;
    }

    pub fn size(&self) -> usize {
        self.inner.lock().expect("batch builder mutex poisoned").encoded_items.len()
    }

    pub fn ready(&self) -> bool {
        self.size() > 0
    }

    pub fn full(&self) -> bool {
        self.size() >= self.max_items
    }

    pub fn estimated_size(&self) -> usize {
        self.inner.lock().expect("batch builder mutex poisoned").estimated_size
    }

    pub fn stats(&self) -> BuilderStats {
        self.inner.lock().expect("batch builder mutex poisoned").stats
    }

    /// Serializes the accumulated items into one length-prefixed frame and
    /// resets internal state. Safe to call even when `ready()` is false --
    /// it then produces an empty batch, which callers should not bother
    /// publishing (`do_flush` checks `ready()` first).
    pub fn build(&self) -> (Bytes, EncodeStats) {
        let mut inner = self.inner.lock().expect("batch builder mutex poisoned");
        let base_timestamp_ms = inner.base_timestamp_ms.unwrap_or(0);
        inner.sequence += 1;
        let sequence = inner.sequence;

        let frame = assemble_unified_frame(&self.source_id, sequence, base_timestamp_ms, &inner.encoded_items);
        let stats = EncodeStats {
            items_encoded: inner.encoded_items.len(),
            struct_fields_dropped: inner.stats.struct_fields_dropped,
        };
        inner.stats.batches_built += 1;
        trace!(sequence, items = stats.items_encoded, bytes = frame.len(), "batch built");
        inner.reset();

        (frame, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vep_core::{MessageHeader, Quality, SignalSample, Value};

    fn signal(ts_ns: u64) -> IngestRecord {
        IngestRecord::Signal(SignalSample {
            header: MessageHeader::new("ecu-1", ts_ns, 0),
            path: "Vehicle.Speed".into(),
            quality: Quality::Valid,
            value: Value::Double(1.0),
        })
    }

    #[test]
    fn size_and_full_track_added_items() {
        let builder = UnifiedBatchBuilder::new("ecu-1", 2);
        assert!(!builder.ready());
        builder.add(signal(1_000_000_000));
        assert_eq!(builder.size(), 1);
        assert!(!builder.full());
        builder.add(signal(1_000_000_100));
        assert!(builder.full());
    }

    #[test]
    fn build_resets_and_bumps_sequence() {
        let builder = UnifiedBatchBuilder::new("ecu-1", 10);
        builder.add(signal(1_000_000_000));
        let (frame1, stats1) = builder.build();
        assert_eq!(stats1.items_encoded, 1);
        assert!(!frame1.is_empty());
        assert_eq!(builder.size(), 0);

        builder.add(signal(2_000_000_000));
        let (frame2, _) = builder.build();
        let batch1 = vep_codec::decode_batch(frame1).unwrap();
        let batch2 = vep_codec::decode_batch(frame2).unwrap();
        assert_eq!(batch1.sequence, 1);
        assert_eq!(batch2.sequence, 2);
    }

    #[test]
    fn records_older_than_base_are_counted_not_rejected() {
        let builder = UnifiedBatchBuilder::new("ecu-1", 10);
        builder.add(signal(5_000_000_000));
        builder.add(signal(1_000_000_000));
        assert_eq!(builder.size(), 2);
        assert_eq!(builder.stats().age_dropped, 1);
    }
}
