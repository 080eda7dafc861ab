//! The four ingestable record kinds and the enum that lets the unified
//! batch builder accept any of them in arrival order.

use std::collections::HashMap;

use crate::header::MessageHeader;
use crate::value::{Quality, Value};

/// Event severity, carried verbatim onto the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
    Critical,
}

/// Log level, carried verbatim onto the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// A single vehicle signal sample: a dotted VSS-style path, a quality
/// annotation, and a typed value.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSample {
    pub header: MessageHeader,
    pub path: String,
    pub quality: Quality,
    pub value: Value,
}

/// A discrete, severity-tagged occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub header: MessageHeader,
    pub event_id: String,
    pub category: String,
    pub event_type: String,
    pub severity: Severity,
    pub attributes: Option<HashMap<String, String>>,
    pub context: Option<HashMap<String, String>>,
}

/// One (upper_bound, cumulative_count) bucket of a histogram metric.
pub type HistogramBucket = (f64, u64);

/// The one-of payload a metric sample carries.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricKind {
    Gauge(f64),
    /// Monotone counter value.
    Counter(f64),
    Histogram {
        sample_count: u64,
        sample_sum: f64,
        /// Ordered `(upper_bound, cumulative_count)` pairs. The final
        /// cumulative count must equal `sample_count`.
        buckets: Vec<HistogramBucket>,
    },
}

/// A named, labeled metric observation.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub header: MessageHeader,
    pub name: String,
    pub kind: MetricKind,
    pub labels: HashMap<String, String>,
}

/// A structured log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub header: MessageHeader,
    pub level: LogLevel,
    pub component: String,
    pub message: String,
    pub attributes: Option<HashMap<String, String>>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
}

/// Any of the four ingestable record kinds, in the order the unified batch
/// builder accepts them.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestRecord {
    Signal(SignalSample),
    Event(Event),
    Metric(MetricSample),
    Log(LogEntry),
}

impl IngestRecord {
    /// The header shared by every record kind, used to compute the
    /// batch-relative `timestamp_delta_ms`.
    pub fn header(&self) -> &MessageHeader {
        match self {
            IngestRecord::Signal(s) => &s.header,
            IngestRecord::Event(e) => &e.header,
            IngestRecord::Metric(m) => &m.header,
            IngestRecord::Log(l) => &l.header,
        }
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.header().timestamp_ms()
    }
}

impl From<SignalSample> for IngestRecord {
    fn from(v: SignalSample) -> Self {
        IngestRecord::Signal(v)
    }
}

impl From<Event> for IngestRecord {
    fn from(v: Event) -> Self {
        IngestRecord::Event(v)
    }
}

impl From<MetricSample> for IngestRecord {
    fn from(v: MetricSample) -> Self {
        IngestRecord::Metric(v)
    }
}

impl From<LogEntry> for IngestRecord {
    fn from(v: LogEntry) -> Self {
        IngestRecord::Log(v)
    }
}
