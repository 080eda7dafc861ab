//! Shared transport vocabulary: connection lifecycle state and per-message
//! delivery hints. Defined here, rather than in `vep-transport`, so that
//! `vep-core::VepError` can reference connection state without creating a
//! crate dependency cycle.

/// Lifecycle of a [`crate::error`]-reporting backend transport connection.
///
/// Transitions: `Disconnected -> Connecting -> Connected`, with any drop
/// back to `Reconnecting` (never straight to `Disconnected`) while the
/// transport attempts to recover, per spec.md's retry/backoff contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Delivery guarantee requested for a published batch or actuator message.
///
/// Maps onto MQTT QoS for the MQTT-backed transport: `BestEffort` -> QoS 0,
/// `Volatile` -> QoS 1 (no retain), `Durable` -> QoS 1 with retain set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Persistence {
    #[default]
    BestEffort,
    Volatile,
    Durable,
}

/// Backpressure hint a transport may report alongside a publish result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueueLevel {
    #[default]
    Low,
    High,
    Full,
}
