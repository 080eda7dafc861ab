//! `TransportSink` (legacy one-way publish) and `BackendTransport`
//! (bidirectional, content-addressed) abstractions, plus the MQTT-backed
//! implementation of the latter.

mod backend;
mod mqtt;
mod sink;
mod stats;
mod topic;

pub use backend::{BackendTransport, ConnectionStatusCallback, ContentCallback, QueueStatusCallback};
pub use mqtt::{MqttBackendTransport, MqttTransportConfig};
pub use sink::{InMemoryTransportSink, TransportSink};
pub use stats::{TransportStats, TransportStatsSnapshot};
pub use topic::{legacy_topic, telemetry_topic};
