//! Single-pass dispatch over the token sequence
//!
//! One linear pass visits every token exactly once, looks up the
//! collectors registered for its type and tag keys, and invokes each of
//! them once. Cost is O(N + M) for N tokens and M actual matches; no
//! collector ever scans the stream itself. Collector failures (errors and
//! panics) are recorded and isolated unless `raise_on_collector_error`
//! promotes them to fatal; expiry of the total time budget is the only
//! other condition that ends the pass early.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use crate::dispatch::routing::RoutingTable;
use crate::dispatch::timeout::ScopedTimeout;
use crate::error::{CollectorFailure, DispatchError};
use crate::limits::ResourceLimits;
use crate::warehouse::Warehouse;

/// Lifecycle of a dispatch pass: running, then exactly one finished state.
/// There is no paused state; timeout or a fatal error terminates the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Running,
    Completed,
    TimedOut,
    Errored,
}

/// Outcome of a completed pass
///
/// The `version` field follows semantic versioning so downstream consumers
/// of serialized output can detect breaking schema changes.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DispatchReport {
    pub version: String,
    /// Tokens visited by the dispatch loop; equals the token count on
    /// every completed pass
    pub visited_tokens: usize,
    /// Total (token, collector) invocations, one per actual match
    pub invocations: usize,
    /// Isolated collector failures recorded in non-fatal mode
    pub collector_errors: Vec<CollectorFailure>,
}

/// Drives one dispatch pass over a warehouse
pub struct Dispatcher {
    table: RoutingTable,
    limits: ResourceLimits,
    state: DispatchState,
}

impl Dispatcher {
    pub fn new(table: RoutingTable, limits: ResourceLimits) -> Dispatcher {
        Dispatcher {
            table,
            limits,
            state: DispatchState::Idle,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Run the single dispatch pass.
    ///
    /// The timeout guard is acquired at pass start and released on every
    /// exit path when it drops with this stack frame; the flag is polled
    /// once per token and once per collector invocation.
    pub fn dispatch_all(&mut self, warehouse: &Warehouse) -> Result<DispatchReport, DispatchError> {
        self.state = DispatchState::Running;
        let timeout = ScopedTimeout::start(self.limits.total_timeout());
        let per_collector_budget = self.limits.per_collector_timeout();

        let mut visited_tokens = 0;
        let mut invocations = 0;
        let mut collector_errors: Vec<CollectorFailure> = Vec::new();

        for index in 0..warehouse.len() {
            if timeout.expired() {
                return self.timed_out(&timeout, visited_tokens);
            }
            visited_tokens += 1;

            let token = &warehouse.tokens()[index];
            for collector in self.table.routes_for(token) {
                if timeout.expired() {
                    return self.timed_out(&timeout, visited_tokens);
                }

                let name = collector.borrow().name().to_string();
                let started = Instant::now();
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    collector.borrow_mut().on_token(index, warehouse)
                }));
                invocations += 1;

                let failure = match outcome {
                    Ok(Ok(())) => per_collector_budget.and_then(|budget| {
                        let elapsed = started.elapsed();
                        (elapsed > budget).then(|| CollectorFailure {
                            token_index: index,
                            collector: name.clone(),
                            message: format!(
                                "invocation took {:?}, over the {:?} budget",
                                elapsed, budget
                            ),
                        })
                    }),
                    Ok(Err(err)) => Some(CollectorFailure {
                        token_index: index,
                        collector: name.clone(),
                        message: err.to_string(),
                    }),
                    Err(payload) => Some(CollectorFailure {
                        token_index: index,
                        collector: name.clone(),
                        message: panic_message(payload),
                    }),
                };

                if let Some(failure) = failure {
                    tracing::warn!(
                        collector = %failure.collector,
                        token = failure.token_index,
                        message = %failure.message,
                        "collector failure recorded"
                    );
                    if self.limits.raise_on_collector_error {
                        self.state = DispatchState::Errored;
                        return Err(DispatchError::Collector(failure));
                    }
                    collector_errors.push(failure);
                }
            }
        }

        self.state = DispatchState::Completed;
        tracing::debug!(
            visited_tokens,
            invocations,
            failures = collector_errors.len(),
            "dispatch pass completed"
        );
        Ok(DispatchReport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            visited_tokens,
            invocations,
            collector_errors,
        })
    }

    fn timed_out(
        &mut self,
        timeout: &ScopedTimeout,
        visited_tokens: usize,
    ) -> Result<DispatchReport, DispatchError> {
        self.state = DispatchState::TimedOut;
        Err(DispatchError::Timeout {
            budget: timeout.budget().unwrap_or_default(),
            visited_tokens,
        })
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "collector panicked".to_string()
    }
}
