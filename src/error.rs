//! Error taxonomy for warehouse construction and dispatch
//!
//! Four conditions exist, each handled at the boundary where it is detected:
//! - Resource limits fail warehouse construction before any dispatch runs.
//! - Malformed token maps are clamped during index building and never
//!   propagate as errors (the warehouse only counts and logs them).
//! - Collector failures are recorded and isolated by default; the
//!   `raise_on_collector_error` limit promotes them to fatal.
//! - Timeout is the only condition that terminates a dispatch pass early.

use std::fmt;
use std::time::Duration;

/// Which configured resource bound was exceeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Tokens,
    Bytes,
    Nesting,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LimitKind::Tokens => "token count",
            LimitKind::Bytes => "byte size",
            LimitKind::Nesting => "nesting depth",
        };
        write!(f, "{}", name)
    }
}

/// Errors that can occur while building a warehouse
#[derive(Debug, Clone, PartialEq)]
pub enum WarehouseError {
    /// A configured resource bound was exceeded; the parse is rejected
    /// outright rather than risking memory or stack exhaustion.
    ResourceLimit {
        kind: LimitKind,
        actual: usize,
        limit: usize,
    },
}

impl fmt::Display for WarehouseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarehouseError::ResourceLimit {
                kind,
                actual,
                limit,
            } => {
                write!(f, "{} {} exceeds configured limit {}", kind, actual, limit)
            }
        }
    }
}

impl std::error::Error for WarehouseError {}

/// Error returned from a collector callback
#[derive(Debug, Clone, PartialEq)]
pub enum CollectorError {
    Failed(String),
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectorError::Failed(msg) => write!(f, "collector failed: {}", msg),
        }
    }
}

impl std::error::Error for CollectorError {}

/// A recorded, isolated collector failure
///
/// One record is produced per failing invocation, so a collector that fails
/// on every token it is routed yields exactly as many records as it was
/// invoked. Records are carried on the dispatch report in non-fatal mode.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CollectorFailure {
    /// Index of the token being processed when the collector failed
    pub token_index: usize,
    /// Name of the failing collector
    pub collector: String,
    /// Error or panic message
    pub message: String,
}

impl fmt::Display for CollectorFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "collector '{}' failed at token {}: {}",
            self.collector, self.token_index, self.message
        )
    }
}

/// Errors that terminate a dispatch pass
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// The total time budget for the pass expired. Partial collector
    /// output may exist; the caller never receives it as a complete result.
    Timeout {
        budget: Duration,
        visited_tokens: usize,
    },
    /// A collector failed while `raise_on_collector_error` was set.
    Collector(CollectorFailure),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Timeout {
                budget,
                visited_tokens,
            } => write!(
                f,
                "dispatch pass exceeded its {:?} budget after {} tokens",
                budget, visited_tokens
            ),
            DispatchError::Collector(failure) => write!(f, "{}", failure),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<CollectorFailure> for DispatchError {
    fn from(failure: CollectorFailure) -> Self {
        DispatchError::Collector(failure)
    }
}
