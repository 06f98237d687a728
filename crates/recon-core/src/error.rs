//! Error type for the reconciliation core.
//!
//! Hand-rolled rather than derive-macro based, following the connector
//! error convention: a small enum with a manual `Display` impl, so callers
//! can match on the variant without pulling in `thiserror` for a handful of
//! cases.

use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// Bad or unsupported reconciliation configuration (e.g. an
    /// unimplemented partition column type, a reduction factor <= 1).
    Config(String),
    /// A store adapter failed to connect, execute, or returned data the
    /// planner/classifier couldn't interpret.
    Adapter(String),
    /// The inferred or user-supplied start/end range is invalid (start >=
    /// end, or `initial_partition_interval` too small for `max_block_size`).
    Range(String),
    /// The reconciliation pass was cancelled via its `CancellationToken`.
    Cancellation,
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconError::Config(msg) => write!(f, "config error: {msg}"),
            ReconError::Adapter(msg) => write!(f, "adapter error: {msg}"),
            ReconError::Range(msg) => write!(f, "range error: {msg}"),
            ReconError::Cancellation => write!(f, "reconciliation pass cancelled"),
        }
    }
}

impl std::error::Error for ReconError {}

pub type ReconResult<T> = Result<T, ReconError>;
