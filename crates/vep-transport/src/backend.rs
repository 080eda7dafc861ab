//! Bidirectional, content-addressed transport: the abstraction every
//! instance of which is bound, for its whole lifetime, to exactly one
//! 32-bit content id.

use vep_core::{ConnectionState, Persistence, QueueLevel, VepResult};

use crate::stats::TransportStatsSnapshot;

pub type ContentCallback = Box<dyn Fn(u32, Vec<u8>) + Send + Sync>;
pub type ConnectionStatusCallback = Box<dyn Fn(ConnectionState, &str) + Send + Sync>;
pub type QueueStatusCallback = Box<dyn Fn(QueueLevel) + Send + Sync>;

pub trait BackendTransport: Send + Sync {
    /// Establishes the underlying connection. Transitions
    /// `Disconnected -> Connecting`; the transition to `Connected` happens
    /// asynchronously on the transport's own thread once the peer
    /// acknowledges.
    fn start(&self) -> VepResult<()>;

    /// Releases the underlying connection, drains registered callbacks, and
    /// returns to `Disconnected`.
    fn stop(&self);

    /// Sends `bytes` toward the bound content id. Fails fast with `false`
    /// when not `Connected`. Returns a `QueueLevel` hint alongside the
    /// result regardless of outcome.
    fn publish(&self, bytes: &[u8], persistence: Persistence) -> (bool, QueueLevel);

    /// Registers the callback invoked with `(content_id, bytes)` whenever
    /// the peer delivers content bound to this instance. Replaces any
    /// previously registered callback. Always invoked from the transport's
    /// own thread, never under a caller-held lock.
    fn on_content(&self, cb: ContentCallback);

    /// Registers the callback invoked on every connection state
    /// transition, with a short reason string.
    fn on_connection_status(&self, cb: ConnectionStatusCallback);

    /// Registers the callback invoked when the transport's outbound queue
    /// depth crosses a threshold.
    fn on_queue_status(&self, cb: QueueStatusCallback);

    fn content_id(&self) -> u32;

    fn connection_state(&self) -> ConnectionState;

    fn queue_full(&self) -> bool;

    /// `running && connection_state() == Connected`.
    fn healthy(&self) -> bool;

    fn stats(&self) -> TransportStatsSnapshot;
}
