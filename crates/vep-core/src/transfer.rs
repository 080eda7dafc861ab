//! Decode-side shapes produced by `vep-codec`.
//!
//! These mirror the ingest-side records in [`crate::record`] but only carry
//! what actually survives onto the wire -- there is no `seq_num` or
//! `correlation_id` here, and timestamps arrive pre-resolved from the
//! batch's `base_timestamp_ms` plus each item's `timestamp_delta_ms`.

use std::collections::HashMap;

use crate::record::{HistogramBucket, LogLevel, Severity};
use crate::value::{Quality, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSignal {
    pub path: String,
    pub quality: Quality,
    pub value: Value,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    pub event_id: String,
    pub category: String,
    pub event_type: String,
    pub severity: Severity,
    pub attributes: HashMap<String, String>,
    pub context: HashMap<String, String>,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodedMetricKind {
    Gauge(f64),
    Counter(f64),
    Histogram {
        sample_count: u64,
        sample_sum: f64,
        buckets: Vec<HistogramBucket>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMetric {
    pub name: String,
    pub kind: DecodedMetricKind,
    pub labels: HashMap<String, String>,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLog {
    pub level: LogLevel,
    pub component: String,
    pub message: String,
    pub attributes: HashMap<String, String>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub timestamp_ms: i64,
}

/// One decoded item inside a [`TransferBatch`], tagged by kind so a consumer
/// can dispatch without re-deriving it from the wire tag.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferItem {
    Signal(DecodedSignal),
    Event(DecodedEvent),
    Metric(DecodedMetric),
    Log(DecodedLog),
}

impl TransferItem {
    pub fn timestamp_ms(&self) -> i64 {
        match self {
            TransferItem::Signal(s) => s.timestamp_ms,
            TransferItem::Event(e) => e.timestamp_ms,
            TransferItem::Metric(m) => m.timestamp_ms,
            TransferItem::Log(l) => l.timestamp_ms,
        }
    }
}

/// A fully decoded batch: the envelope the wire `TransferBatch` message
/// carries, plus every item in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferBatch {
    pub source_id: String,
    pub sequence: u64,
    pub base_timestamp_ms: i64,
    pub items: Vec<TransferItem>,
}

impl TransferBatch {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
