//! # doxstrux
//!
//! Token warehouse and single-pass collector dispatch for markdown token
//! streams.
//!
//! An external tokenizer produces an ordered token sequence from a
//! normalized buffer. The [`warehouse`] module owns that sequence and
//! builds derived indices once per document (type index, open/close
//! pairs, parents, lazy children, heading-delimited sections) with
//! sublinear query helpers. The [`dispatch`] module registers collectors
//! against token-type/tag routing keys and runs one deterministic,
//! fault-isolated, time-bounded pass over the tokens, invoking only the
//! collectors registered for each token.
//!
//! Running the same document twice produces byte-identical serialized
//! output: collector invocation order is registration order, token order
//! is document order, and no hash-ordering leaks into dispatch.

pub mod dispatch;
pub mod error;
pub mod limits;
pub mod warehouse;

pub use dispatch::{
    Collector, DispatchReport, DispatchState, Dispatcher, RouteKey, RoutingTable, ScopedTimeout,
    SharedCollector,
};
pub use error::{CollectorError, CollectorFailure, DispatchError, LimitKind, WarehouseError};
pub use limits::ResourceLimits;
pub use warehouse::{LineSpan, Nesting, Section, SourceInfo, Token, Warehouse};

/// Crate version, carried on every dispatch report so downstream
/// consumers can detect breaking schema changes
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_semver_shaped() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert_eq!(parts.len(), 3);
        for part in parts {
            part.parse::<u64>().expect("numeric version component");
        }
    }
}
