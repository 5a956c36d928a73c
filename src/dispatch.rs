//! Routing table, dispatcher and timeout guard
//!
//! Collectors register against token-type or tag keys; the dispatcher
//! then executes every registered collector against every relevant token
//! in a single linear pass, with deterministic ordering, bounded time and
//! fault isolation.

pub mod dispatcher;
pub mod routing;
pub mod timeout;

pub use dispatcher::{DispatchReport, DispatchState, Dispatcher};
pub use routing::{Collector, RouteKey, RoutingTable, SharedCollector};
pub use timeout::ScopedTimeout;
