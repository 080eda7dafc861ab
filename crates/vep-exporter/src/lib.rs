//! Ingest -> batch -> compress -> publish orchestration with a single
//! background flush worker per pipeline instance.

mod pipeline;
mod stats;

pub use pipeline::{ExporterPipeline, FlushTriggers};
pub use stats::PipelineStats;
