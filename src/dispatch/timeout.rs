//! Scoped timeout guard for the dispatch pass
//!
//! The dispatcher owns exactly one of these per pass; collectors never
//! install or manipulate timers themselves. Two engines sit behind the
//! same interface:
//!
//! - a timer thread that writes an `AtomicBool` once on expiry (the flag
//!   is the only cross-thread state; it is written once and read at poll
//!   points), cancelled and joined when the guard drops;
//! - a plain `Instant` deadline compared at poll points, used when the
//!   timer thread cannot be spawned.
//!
//! Enforcement is cooperative either way: expiry only takes effect where
//! the dispatch loop polls `expired()` (once per token and once per
//! collector invocation), so precision is bounded by the longest
//! un-polled stretch. That coarseness is the accepted trade-off of a
//! timeout that is a safety valve rather than a scheduler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

enum Engine {
    /// No budget configured; never expires
    Unbounded,
    /// Background timer thread flips the flag once after the budget
    Timer {
        flag: Arc<AtomicBool>,
        cancel: mpsc::Sender<()>,
        handle: Option<JoinHandle<()>>,
    },
    /// Fallback when the timer thread cannot be spawned
    Deadline { deadline: Instant },
}

/// Scoped, cooperatively-polled timeout
///
/// Release is guaranteed on every exit path: dropping the guard cancels
/// and joins the timer thread whether the pass completed, errored or
/// timed out.
pub struct ScopedTimeout {
    engine: Engine,
    budget: Option<Duration>,
}

impl ScopedTimeout {
    /// Start a timeout guard. `None` means no budget: `expired` is
    /// always false and no thread is spawned.
    pub fn start(budget: Option<Duration>) -> ScopedTimeout {
        let engine = match budget {
            None => Engine::Unbounded,
            Some(duration) => spawn_timer(duration),
        };
        ScopedTimeout { engine, budget }
    }

    /// Whether the budget has expired. Poll this at bounded intervals;
    /// nothing interrupts the running code.
    pub fn expired(&self) -> bool {
        match &self.engine {
            Engine::Unbounded => false,
            Engine::Timer { flag, .. } => flag.load(Ordering::Acquire),
            Engine::Deadline { deadline } => Instant::now() >= *deadline,
        }
    }

    /// The configured budget, if any
    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }
}

fn spawn_timer(budget: Duration) -> Engine {
    let flag = Arc::new(AtomicBool::new(false));
    let thread_flag = Arc::clone(&flag);
    let (cancel, cancel_rx) = mpsc::channel::<()>();
    let spawned = thread::Builder::new()
        .name("doxstrux-timeout".to_string())
        .spawn(move || {
            // A cancel message (or a dropped sender) ends the wait without
            // setting the flag; only a true expiry sets it.
            if cancel_rx.recv_timeout(budget) == Err(mpsc::RecvTimeoutError::Timeout) {
                thread_flag.store(true, Ordering::Release);
                tracing::debug!(?budget, "dispatch timeout budget expired");
            }
        });
    match spawned {
        Ok(handle) => Engine::Timer {
            flag,
            cancel,
            handle: Some(handle),
        },
        Err(err) => {
            tracing::warn!(%err, "timer thread unavailable, falling back to deadline polling");
            Engine::Deadline {
                deadline: Instant::now() + budget,
            }
        }
    }
}

impl Drop for ScopedTimeout {
    fn drop(&mut self) {
        if let Engine::Timer { cancel, handle, .. } = &mut self.engine {
            let _ = cancel.send(());
            if let Some(handle) = handle.take() {
                let _ = handle.join();
            }
        }
    }
}
