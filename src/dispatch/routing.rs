//! Collector registration and routing
//!
//! Collectors register against routing keys (a token type, or a
//! tag-qualified key) and are invoked in registration order. Registration
//! order is load-bearing: downstream output ordering depends on it, so
//! duplicate suppression is an order-preserving append-if-absent over a
//! `Vec`, never a hash set.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::CollectorError;
use crate::warehouse::{Token, Warehouse};

/// A consumer of routed tokens
///
/// Invoked once per matched token with the token index and the warehouse,
/// through which it may run any structural query. Results are communicated
/// only through the collector's own accumulator, which the host reads
/// after dispatch completes.
pub trait Collector {
    /// Stable name used in failure records
    fn name(&self) -> &str;

    /// Process one routed token
    fn on_token(&mut self, index: usize, warehouse: &Warehouse) -> Result<(), CollectorError>;
}

/// Shared handle to a collector; dispatch is single-threaded, so `Rc` +
/// `RefCell` is all the sharing this needs. Identity (for duplicate
/// suppression) is pointer identity.
pub type SharedCollector = Rc<RefCell<dyn Collector>>;

/// Key a collector registers under
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteKey {
    /// Token type, e.g. "heading_open"
    Kind(String),
    /// Tag-qualified key, serialized as `tag:<tag>`, e.g. "tag:h2"
    Tag(String),
}

impl RouteKey {
    pub fn kind(kind: impl Into<String>) -> RouteKey {
        RouteKey::Kind(kind.into())
    }

    pub fn tag(tag: impl Into<String>) -> RouteKey {
        RouteKey::Tag(tag.into())
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteKey::Kind(kind) => write!(f, "{}", kind),
            RouteKey::Tag(tag) => write!(f, "tag:{}", tag),
        }
    }
}

/// Registration table mapping routing keys to ordered collector lists
///
/// Built once at registration time and immutable during dispatch.
#[derive(Default)]
pub struct RoutingTable {
    routes: HashMap<RouteKey, Vec<SharedCollector>>,
}

impl RoutingTable {
    pub fn new() -> RoutingTable {
        RoutingTable::default()
    }

    /// Append `collector` to the list for `key` unless already present.
    /// First registration wins the position; re-registering is a no-op.
    pub fn register(&mut self, key: RouteKey, collector: SharedCollector) {
        let list = self.routes.entry(key).or_default();
        if !list.iter().any(|existing| Rc::ptr_eq(existing, &collector)) {
            list.push(collector);
        }
    }

    /// Ordered collectors registered for exactly this key
    pub fn lookup(&self, key: &RouteKey) -> &[SharedCollector] {
        self.routes.get(key).map_or(&[], Vec::as_slice)
    }

    /// All collectors matched by a token: its type key first, then its
    /// tag key, merged preserving registration order without duplicates.
    pub fn routes_for(&self, token: &Token) -> Vec<SharedCollector> {
        let mut matched: Vec<SharedCollector> = Vec::new();
        let kind_key = RouteKey::Kind(token.kind.clone());
        for collector in self.lookup(&kind_key) {
            matched.push(Rc::clone(collector));
        }
        if let Some(tag) = &token.tag {
            let tag_key = RouteKey::Tag(tag.clone());
            for collector in self.lookup(&tag_key) {
                if !matched.iter().any(|seen| Rc::ptr_eq(seen, collector)) {
                    matched.push(Rc::clone(collector));
                }
            }
        }
        matched
    }

    /// Number of keys with at least one registration
    pub fn key_count(&self) -> usize {
        self.routes.len()
    }

    /// Total registrations across all keys
    pub fn registration_count(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::Nesting;

    struct Named(&'static str);

    impl Collector for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn on_token(&mut self, _index: usize, _warehouse: &Warehouse) -> Result<(), CollectorError> {
            Ok(())
        }
    }

    fn shared(name: &'static str) -> SharedCollector {
        Rc::new(RefCell::new(Named(name)))
    }

    fn names(list: &[SharedCollector]) -> Vec<String> {
        list.iter().map(|c| c.borrow().name().to_string()).collect()
    }

    #[test]
    fn re_registration_preserves_first_position() {
        let (a, b, c) = (shared("a"), shared("b"), shared("c"));
        let mut table = RoutingTable::new();
        let key = RouteKey::kind("text");
        table.register(key.clone(), Rc::clone(&a));
        table.register(key.clone(), Rc::clone(&b));
        table.register(key.clone(), Rc::clone(&c));
        table.register(key.clone(), Rc::clone(&a));
        assert_eq!(names(table.lookup(&key)), vec!["a", "b", "c"]);
    }

    #[test]
    fn routes_for_merges_kind_then_tag_without_duplicates() {
        let (a, b) = (shared("a"), shared("b"));
        let mut table = RoutingTable::new();
        table.register(RouteKey::kind("heading_open"), Rc::clone(&a));
        table.register(RouteKey::tag("h2"), Rc::clone(&b));
        table.register(RouteKey::tag("h2"), Rc::clone(&a));

        let token = Token::new("heading_open", Nesting::Open).with_tag("h2");
        assert_eq!(names(&table.routes_for(&token)), vec!["a", "b"]);

        let untagged = Token::new("heading_open", Nesting::Open);
        assert_eq!(names(&table.routes_for(&untagged)), vec!["a"]);
    }
}
