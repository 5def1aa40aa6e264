//! In-flight request accounting and the pause gate.
//!
//! # Responsibilities
//! - Count requests currently being handled
//! - Let the host application quiesce the server (wait for traffic to drop
//!   to a target level) without a hard stop
//! - Exempt hanging activities so they cannot block a quiesce forever
//!
//! # Design Decisions
//! - Atomic counter + RAII guards; the count is released on every path,
//!   including panics and early returns
//! - The pause gate is a mutex held by the quiesce waiter; `enter` acquires
//!   it briefly, so admission stalls while a quiesce is in progress
//! - The wait is always bounded by a tick budget and gives up rather than
//!   hanging if traffic never drains

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::lifecycle::Shutdown;

/// Poll interval of the quiesce wait loop.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default tick budget for [`ConcurrencyGate::wait_until_idle`].
pub const DEFAULT_WAIT_TICKS: u32 = 100;

/// Tracks in-flight requests and coordinates quiescing.
///
/// Shared by every connection worker; all other request state is owned by
/// the worker handling it.
pub struct ConcurrencyGate {
    in_flight: Arc<AtomicI64>,
    pause: Arc<Mutex<()>>,
    shutdown: Arc<Shutdown>,
}

impl ConcurrencyGate {
    pub fn new(shutdown: Arc<Shutdown>) -> Self {
        Self {
            in_flight: Arc::new(AtomicI64::new(0)),
            pause: Arc::new(Mutex::new(())),
            shutdown,
        }
    }

    /// Admit a request. Returns a guard that releases the slot on drop.
    ///
    /// Blocks while a quiesce waiter holds the pause gate.
    pub async fn enter(&self) -> RequestGuard {
        let _admit = self.pause.lock().await;
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        RequestGuard {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Current number of in-flight requests.
    pub fn in_flight(&self) -> i64 {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Give an admitted request's slot back for the duration of hanging
    /// work. The slot is re-taken when the returned guard drops.
    pub fn suspend(&self) -> HangingExemption {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        HangingExemption {
            in_flight: Arc::clone(&self.in_flight),
        }
    }

    /// Block until at most `allowed` requests are in flight, shutdown is
    /// triggered, or `max_ticks` polls elapse.
    ///
    /// The returned permit holds the pause gate: no new request is admitted
    /// until it is dropped. This lets the host run maintenance work against
    /// a quiet server and then resume traffic.
    pub async fn wait_until_idle(&self, allowed: i64, max_ticks: u32) -> QuiescePermit {
        let pause = Arc::clone(&self.pause).lock_owned().await;
        let mut ticks = max_ticks;
        while ticks > 0 && !self.shutdown.is_quitting() && self.in_flight() > allowed {
            tokio::time::sleep(POLL_INTERVAL).await;
            ticks -= 1;
        }
        if ticks == 0 && self.in_flight() > allowed {
            tracing::warn!(
                in_flight = self.in_flight(),
                allowed,
                "Quiesce wait gave up after tick budget"
            );
        }
        QuiescePermit { _pause: pause }
    }
}

/// Guard for an admitted request. Releases the slot when dropped.
pub struct RequestGuard {
    in_flight: Arc<AtomicI64>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Guard for a hanging activity: the slot is given back while it exists
/// and re-taken when it drops.
pub struct HangingExemption {
    in_flight: Arc<AtomicI64>,
}

impl Drop for HangingExemption {
    fn drop(&mut self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }
}

/// Holds the pause gate on behalf of a quiesce waiter.
///
/// Dropping it resumes request admission.
pub struct QuiescePermit {
    _pause: OwnedMutexGuard<()>,
}
