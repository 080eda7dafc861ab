//! Error types shared by every pipeline crate.
//!
//! One [`VepError`] enum per library crate boundary, matching the teacher's
//! `RdeError` shape -- a handful of named variants for conditions callers
//! might want to match on, plus a transparent `Other(anyhow::Error)` catch-all
//! for everything else.

#[derive(Debug, thiserror::Error)]
pub enum VepError {
    /// The wire frame was truncated or its outer length prefix did not match
    /// the bytes actually available. Decode fails fast only here -- unknown
    /// tags inside a well-formed frame fall back to `Value::Empty` instead.
    #[error("malformed wire frame: {0}")]
    MalformedFrame(String),

    /// A struct-typed value reached the encoder at a nesting depth greater
    /// than one.
    #[error("struct nesting depth exceeded for field {0:?}")]
    DepthExceeded(String),

    /// The named compression codec is not recognized.
    #[error("unknown compression codec: {0}")]
    UnknownCodec(String),

    /// The batch builder was asked to accept a record after `build()` drained
    /// it but before `reset()` ran.
    #[error("batch builder not ready to accept records")]
    BuilderNotReady,

    /// The backend transport connection is not in a state that allows the
    /// requested operation (e.g. publish while `Disconnected`).
    #[error("transport not connected (state: {0:?})")]
    NotConnected(crate::transport::ConnectionState),

    /// A CAN signal mapping could not be applied to the supplied value.
    #[error("CAN signal mapping failed for {signal}: {reason}")]
    CanMappingFailed { signal: String, reason: String },

    /// A channel between pipeline threads closed unexpectedly, mirroring the
    /// teacher's `ChannelClosed` variant.
    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    /// A background worker thread panicked or could not be joined.
    #[error("worker thread {0} failed")]
    WorkerFailed(&'static str),

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type VepResult<T> = Result<T, VepError>;
