//! Shared data model, configuration, and error types for the vehicle edge
//! telemetry export pipeline.
//!
//! Every other workspace crate depends on this one for the types that cross
//! crate boundaries: [`Value`], the four ingestable record kinds, the
//! decode-side [`transfer`] shapes, [`VepConfig`], and [`VepError`].

pub mod config;
pub mod error;
pub mod header;
pub mod record;
pub mod transfer;
pub mod transport;
pub mod value;

pub use config::VepConfig;
pub use error::{VepError, VepResult};
pub use header::MessageHeader;
pub use record::{
    Event, HistogramBucket, IngestRecord, LogEntry, LogLevel, MetricKind, MetricSample, Severity,
    SignalSample,
};
pub use transfer::{
    DecodedEvent, DecodedLog, DecodedMetric, DecodedMetricKind, DecodedSignal, TransferBatch,
    TransferItem,
};
pub use transport::{ConnectionState, Persistence, QueueLevel};
pub use value::{Quality, StructField, StructValue, Value};
