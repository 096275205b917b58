//! Single-subscriber readiness notification
//!
//! A stream holds at most one listener. Installing a listener replaces the
//! previous one; there is no fan-out. [`Readiness`] turns the listener into
//! something a thread can block on.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Listener invoked inline whenever a stream detects new data or capacity
pub type NotifyFn = Arc<dyn Fn() + Send + Sync>;

/// The single listener slot carried by every stream handle
#[derive(Default)]
pub(crate) struct NotifySlot {
    listener: Mutex<Option<NotifyFn>>,
}

impl NotifySlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn replace(&self, listener: Option<NotifyFn>) -> Option<NotifyFn> {
        let mut slot = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, listener)
    }

    pub(crate) fn is_set(&self) -> bool {
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Invoke the listener, if any. The slot lock is released first so the
    /// listener may re-subscribe or call back into the stream.
    pub(crate) fn fire(&self) -> bool {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match listener {
            Some(listener) => {
                listener();
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for NotifySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifySlot")
            .field("subscribed", &self.is_set())
            .finish()
    }
}

/// A blocking readiness event.
///
/// Each [`signal`](Readiness::signal) bumps a generation counter and wakes
/// every waiter. Waiters re-evaluate their predicate under the event lock, so
/// a signal that lands between the check and the wait is never lost.
#[derive(Debug, Default)]
pub struct Readiness {
    generation: Mutex<u64>,
    cond: Condvar,
}

impl Readiness {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Wake every thread blocked in one of the wait methods
    pub fn signal(&self) {
        let mut generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
        *generation = generation.wrapping_add(1);
        self.cond.notify_all();
    }

    /// Number of signals seen so far
    pub fn generation(&self) -> u64 {
        *self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until `ready` returns true. The predicate is evaluated once up
    /// front and again after every signal.
    pub fn wait_until<F>(&self, mut ready: F)
    where
        F: FnMut() -> bool,
    {
        let mut generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
        while !ready() {
            generation = self
                .cond
                .wait(generation)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`wait_until`](Readiness::wait_until) but gives up after
    /// `timeout`. Returns whether the predicate held.
    pub fn wait_until_timeout<F>(&self, mut ready: F, timeout: Duration) -> bool
    where
        F: FnMut() -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut generation = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if ready() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            generation = self
                .cond
                .wait_timeout(generation, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}
