//! Single-flight guard for the automation actions
//!
//! Each action kind owns one in-flight flag. A trigger that arrives while the
//! previous call of the same kind is still running is dropped, not queued.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Move,
    Click,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Move => f.write_str("mouse_move"),
            ActionKind::Click => f.write_str("mouse_click"),
        }
    }
}

/// Held while an action runs; clears the flag when dropped, including on
/// error returns and panics
#[derive(Debug)]
pub struct InFlight {
    kind: ActionKind,
    flag: Arc<AtomicBool>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        trace!(action = %self.kind, "Action released");
    }
}

#[derive(Debug, Clone)]
pub struct ActionGuard {
    kind: ActionKind,
    in_flight: Arc<AtomicBool>,
}

impl ActionGuard {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    #[cfg(test)]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Atomically claim the flag; `None` if a call is already outstanding
    pub fn try_acquire(&self) -> Option<InFlight> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight {
                kind: self.kind,
                flag: Arc::clone(&self.in_flight),
            })
    }

    /// Run `action` on the blocking pool unless disabled or already running
    ///
    /// The check-and-set happens before this returns, so a second trigger
    /// arriving while the first call is outstanding gets `None` immediately.
    /// Must be called from within a tokio runtime.
    pub fn invoke<T, F>(&self, enabled: bool, action: F) -> Option<JoinHandle<Result<T>>>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        if !enabled {
            debug!(action = %self.kind, "Action disabled, ignoring trigger");
            return None;
        }

        let Some(flight) = self.try_acquire() else {
            debug!(action = %self.kind, "Action already in flight, ignoring trigger");
            return None;
        };

        trace!(action = %self.kind, "Action started");
        Some(tokio::task::spawn_blocking(move || {
            let _flight = flight;
            action()
        }))
    }
}
