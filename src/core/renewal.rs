//! Single-flight gate for access credential renewal.
//!
//! The first request to hit a 401 becomes the leader and performs the
//! refresh call; every request that hits a 401 while the leader is running
//! queues as a waiter. When the leader completes, all waiters are released
//! in enqueue order with the same outcome.
//!
//! The in-flight flag is checked and set under a synchronous lock before
//! the leader's first `.await`, so at most one refresh call exists at a time.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::oneshot;

/// Why a renewal did not produce a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenewalFailure {
    pub reason: String,
}

impl RenewalFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for RenewalFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Outcome broadcast to waiters: the new access credential or the failure.
pub type RenewalOutcome = std::result::Result<String, RenewalFailure>;

#[derive(Debug, Default)]
struct GateState {
    in_flight: bool,
    waiters: VecDeque<oneshot::Sender<RenewalOutcome>>,
}

/// Serializes renewal attempts for one session.
#[derive(Debug, Default)]
pub struct RenewalGate {
    state: Mutex<GateState>,
}

/// Role assigned to a caller of [`RenewalGate::enter`].
#[derive(Debug)]
pub enum Ticket<'a> {
    /// This caller must perform the refresh and then call [`LeaderGuard::complete`].
    Leader(LeaderGuard<'a>),
    /// A renewal is already running; await the receiver for its outcome.
    Waiter(oneshot::Receiver<RenewalOutcome>),
}

impl RenewalGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the current renewal or start a new one.
    pub fn enter(&self) -> Ticket<'_> {
        let mut state = self.lock();
        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            tracing::debug!(waiters = state.waiters.len(), "Queued behind in-flight renewal");
            Ticket::Waiter(rx)
        } else {
            state.in_flight = true;
            Ticket::Leader(LeaderGuard {
                gate: self,
                completed: false,
            })
        }
    }

    /// Whether a renewal is currently running.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.lock().in_flight
    }

    /// Number of callers queued behind the running renewal.
    #[must_use]
    pub fn pending_waiters(&self) -> usize {
        self.lock().waiters.len()
    }

    fn finish(&self, outcome: &RenewalOutcome) -> usize {
        let waiters = {
            let mut state = self.lock();
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };
        let released = waiters.len();
        for waiter in waiters {
            // A waiter whose request was dropped has gone away; skip it.
            let _ = waiter.send(outcome.clone());
        }
        released
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GateState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Held by the renewal leader.
///
/// Dropping the guard without completing it (the leader's future was
/// cancelled) rejects every waiter so none of them hangs.
#[derive(Debug)]
pub struct LeaderGuard<'a> {
    gate: &'a RenewalGate,
    completed: bool,
}

impl LeaderGuard<'_> {
    /// Publish the renewal outcome and release all waiters in FIFO order.
    ///
    /// Returns the number of waiters released.
    pub fn complete(mut self, outcome: &RenewalOutcome) -> usize {
        self.completed = true;
        self.gate.finish(outcome)
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            tracing::warn!("Renewal abandoned before completion");
            self.gate
                .finish(&Err(RenewalFailure::new("renewal was cancelled")));
        }
    }
}
