//! `PromiseCell`: the shared resolution state machine.
//!
//! One cell backs every clone of a [`Promise`](super::Promise) and, for lazy
//! promises, the triggering [`LazyCell`](crate::lazy::cell::LazyCell). The
//! first resolution claims the outcome slot by compare-exchange; everything
//! downstream (blocked waiters, registered completion callbacks) observes the
//! published outcome read-only.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crossbeam_utils::Backoff;

use super::Outcome;
use crate::context::Context;

/// No outcome recorded, slot unclaimed.
const PENDING: u8 = 0;
/// Slot claimed, outcome write in progress.
const RESOLVING: u8 = 1;
/// Outcome published; terminal.
const RESOLVED: u8 = 2;

type ResolvedCallback<T, E> = Box<dyn FnOnce(&Outcome<T, E>) + Send>;

/// Locks ignoring poison: no user code ever runs under these locks, so a
/// poisoned guard only means another test thread panicked elsewhere.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) struct PromiseCell<T, E> {
    state: AtomicU8,
    outcome: UnsafeCell<Option<Outcome<T, E>>>,
    waiters: Mutex<()>,
    resolved: Condvar,
    callbacks: Mutex<Vec<(Context, ResolvedCallback<T, E>)>>,
}

// SAFETY: the outcome slot is written exactly once, by the thread that wins
// the PENDING -> RESOLVING exchange, and only read after RESOLVED is
// published with Release ordering. Shared `&Outcome` access after that point
// requires `T: Sync, E: Sync`.
unsafe impl<T: Send, E: Send> Send for PromiseCell<T, E> {}
unsafe impl<T: Send + Sync, E: Send + Sync> Sync for PromiseCell<T, E> {}

impl<T, E> PromiseCell<T, E> {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(PENDING),
            outcome: UnsafeCell::new(None),
            waiters: Mutex::new(()),
            resolved: Condvar::new(),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    #[inline]
    pub(crate) fn is_resolved(&self) -> bool {
        self.state.load(Ordering::Acquire) == RESOLVED
    }

    /// Records `outcome` if the cell is still pending.
    ///
    /// Returns `true` if this call published the outcome. Losing calls drop
    /// their outcome and leave the recorded one untouched; this is what makes
    /// resolver misuse and abandonment races benign.
    pub(crate) fn resolve(self: &Arc<Self>, outcome: Outcome<T, E>) -> bool
    where
        T: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        if self
            .state
            .compare_exchange(PENDING, RESOLVING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        // SAFETY: winning the exchange above grants exclusive write access.
        unsafe {
            *self.outcome.get() = Some(outcome);
        }
        self.state.store(RESOLVED, Ordering::Release);

        #[cfg(feature = "tracing")]
        tracing::trace!(
            outcome = self.outcome_name(),
            "promise resolved"
        );

        // Notify under the lock so a waiter between its state check and
        // `Condvar::wait` cannot miss the wakeup.
        {
            let _guard = lock(&self.waiters);
            self.resolved.notify_all();
        }

        let callbacks = std::mem::take(&mut *lock(&self.callbacks));
        for (context, callback) in callbacks {
            self.schedule_callback(&context, callback, false);
        }
        true
    }

    /// Returns the outcome if already published.
    pub(crate) fn outcome_if_resolved(&self) -> Option<&Outcome<T, E>> {
        if self.is_resolved() {
            // SAFETY: RESOLVED is published with Release after the single
            // write to the slot; the slot is never written again.
            unsafe { (*self.outcome.get()).as_ref() }
        } else {
            None
        }
    }

    /// Blocks the calling thread until the outcome is published.
    ///
    /// Spins briefly before parking; resolution latencies are usually a
    /// scheduling hop, not real work.
    pub(crate) fn block_until_resolved(&self) -> &Outcome<T, E> {
        let backoff = Backoff::new();
        while !self.is_resolved() {
            if backoff.is_completed() {
                let mut guard = lock(&self.waiters);
                while !self.is_resolved() {
                    guard = self
                        .resolved
                        .wait(guard)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                break;
            }
            backoff.snooze();
        }
        // SAFETY: same publication argument as `outcome_if_resolved`.
        unsafe { (*self.outcome.get()).as_ref().unwrap_unchecked() }
    }

    /// Registers `callback` to run on `context` once the outcome exists.
    ///
    /// If the cell is already resolved the callback is submitted right away
    /// with synchronous delivery permitted, which is what lets a now-or
    /// context short-circuit.
    pub(crate) fn register_callback(
        self: &Arc<Self>,
        context: &Context,
        callback: ResolvedCallback<T, E>,
    ) where
        T: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        {
            let mut callbacks = lock(&self.callbacks);
            // Checked under the callbacks lock: `resolve` publishes RESOLVED
            // before draining, so a push either lands before the drain or
            // takes the already-resolved path here.
            if !self.is_resolved() {
                callbacks.push((context.clone(), callback));
                return;
            }
        }
        self.schedule_callback(context, callback, true);
    }

    fn schedule_callback(
        self: &Arc<Self>,
        context: &Context,
        callback: ResolvedCallback<T, E>,
        is_synchronous: bool,
    ) where
        T: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        let cell = Arc::clone(self);
        context.execute(
            is_synchronous,
            Box::new(move || {
                // Scheduled only once RESOLVED is published.
                if let Some(outcome) = cell.outcome_if_resolved() {
                    callback(outcome);
                }
            }),
        );
    }

    #[cfg(feature = "tracing")]
    fn outcome_name(&self) -> &'static str {
        match self.outcome_if_resolved() {
            Some(Outcome::Fulfilled(_)) => "fulfilled",
            Some(Outcome::Rejected(_)) => "rejected",
            Some(Outcome::Cancelled) => "cancelled",
            None => "pending",
        }
    }
}
