//! StartSignal - 同步启动屏障
//!
//! Write-once start signal shared by all capture units of a session. Units
//! block in `wait()` until the supervisor calls `release()`; from then on every
//! current and future waiter returns immediately. The signal is never reset.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use contracts::SensorRole;

/// Cloneable handle to one start barrier
#[derive(Debug, Clone, Default)]
pub struct StartSignal {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    released: AtomicBool,
    /// Roles that reached the barrier, in arrival order
    arrived: Mutex<Vec<SensorRole>>,
    lock: Mutex<()>,
    cond: Condvar,
}

impl StartSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the signal has been released
    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::Acquire)
    }

    /// Block until released. No timeout.
    pub fn wait(&self) {
        if self.is_released() {
            return;
        }
        let mut guard = self.guard();
        while !self.is_released() {
            guard = self
                .inner
                .cond
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Record `role` as arrived, then block until released.
    pub fn wait_as(&self, role: SensorRole) {
        self.inner
            .arrived
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(role);
        self.wait();
    }

    /// Release all waiters.
    ///
    /// Returns `true` only for the call that performed the transition;
    /// later calls are no-ops.
    pub fn release(&self) -> bool {
        // Flag flips under the lock so a waiter cannot miss the notification
        let _guard = self.guard();
        let transitioned = !self.inner.released.swap(true, Ordering::AcqRel);
        if transitioned {
            self.inner.cond.notify_all();
        }
        transitioned
    }

    /// Number of units that reached the barrier
    pub fn arrivals(&self) -> usize {
        self.arrived_roles().len()
    }

    /// Roles that reached the barrier, in arrival order
    pub fn arrived_roles(&self) -> Vec<SensorRole> {
        self.inner
            .arrived
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.inner.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
