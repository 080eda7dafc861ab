//! Legacy per-kind batch builders: one independent queue per ingestable
//! record kind, each flushed onto its own topic-named byte stream by the
//! legacy `TransportSink` path rather than a single bound content id.

use vep_core::{Event, IngestRecord, LogEntry, MetricSample, SignalSample};

use crate::unified::{BuilderStats, UnifiedBatchBuilder};

/// One independently-flushed queue per kind. Each wraps a
/// [`UnifiedBatchBuilder`] fed only records of its own kind, so the
/// resulting frame is a homogeneous unified-format batch a receiver decodes
/// with the ordinary decoder.
pub struct LegacyBatchBuilders {
    pub signals: UnifiedBatchBuilder,
    pub events: UnifiedBatchBuilder,
    pub metrics: UnifiedBatchBuilder,
    pub logs: UnifiedBatchBuilder,
}

impl LegacyBatchBuilders {
    pub fn new(source_id: impl Into<String>, max_items: usize) -> Self {
        let source_id = source_id.into();
        Self {
            signals: UnifiedBatchBuilder::new(source_id.clone(), max_items),
            events: UnifiedBatchBuilder::new(source_id.clone(), max_items),
            metrics: UnifiedBatchBuilder::new(source_id.clone(), max_items),
            logs: UnifiedBatchBuilder::new(source_id, max_items),
        }
    }

    pub fn add_signal(&self, record: SignalSample) {
        self.signals.add(IngestRecord::Signal(record));
    }

    pub fn add_event(&self, record: Event) {
        self.events.add(IngestRecord::Event(record));
    }

    pub fn add_metric(&self, record: MetricSample) {
        self.metrics.add(IngestRecord::Metric(record));
    }

    pub fn add_log(&self, record: LogEntry) {
        self.logs.add(IngestRecord::Log(record));
    }

    /// Topic suffix each queue publishes under, matching
    /// `{topic_prefix}/{signals|events|metrics|logs}`.
    pub fn topic_suffixes() -> [&'static str; 4] {
        ["signals", "events", "metrics", "logs"]
    }

    pub fn combined_stats(&self) -> BuilderStats {
        let parts = [
            self.signals.stats(),
            self.events.stats(),
            self.metrics.stats(),
            self.logs.stats(),
        ];
        parts.into_iter().fold(BuilderStats::default(), |mut acc, s| {
            acc.items_added += s.items_added;
            acc.age_dropped += s.age_dropped;
            acc.struct_fields_dropped += s.struct_fields_dropped;
            acc.batches_built += s.batches_built;
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vep_core::{MessageHeader, Quality, Value};

    #[test]
    fn each_kind_flushes_to_its_own_topic_suffix_independently() {
        let builders = LegacyBatchBuilders::new("ecu-1", 10);
        builders.add_signal(SignalSample {
            header: MessageHeader::new("ecu-1", 1_000_000_000, 0),
            path: "Vehicle.Speed".into(),
            quality: Quality::Valid,
            value: Value::Double(1.0),
        });
        assert!(builders.signals.ready());
        assert!(!builders.events.ready());
        assert_eq!(LegacyBatchBuilders::topic_suffixes()[0], "signals");
    }
}
