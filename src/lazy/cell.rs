//! `LazyCell`: the exactly-once trigger state machine.
//!
//! The cell owns the deferred description (context + callback) until the
//! single `NOT_STARTED -> TRIGGERED` compare-exchange fires. Winning that
//! exchange is the only way to touch the deferred slot, the same claim-by-CAS
//! discipline the promise cell uses for its outcome slot. No lock exists
//! here at all, so nothing can be held across the user callback.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::context::Context;
use crate::promise::cell::PromiseCell;
use crate::promise::{Outcome, Resolver};

/// Deferred description held, nothing scheduled.
const NOT_STARTED: u8 = 0;
/// Description released; the outcome now belongs to the promise cell.
const TRIGGERED: u8 = 1;

/// The deferred computation description: where to run, and what.
struct Deferred<T: Send + Sync + 'static, E: Send + Sync + 'static> {
    context: Context,
    callback: Box<dyn FnOnce(Resolver<T, E>) + Send>,
}

pub(crate) struct LazyCell<T: Send + Sync + 'static, E: Send + Sync + 'static> {
    state: AtomicU8,
    deferred: UnsafeCell<Option<Deferred<T, E>>>,
    promise: Arc<PromiseCell<T, E>>,
}

// SAFETY: the deferred slot is only accessed by the thread that wins the
// state exchange (exclusive by construction) and by `Drop` (exclusive by
// `&mut self`). Everything else in the cell is Sync on its own.
unsafe impl<T: Send + Sync + 'static, E: Send + Sync + 'static> Send for LazyCell<T, E> {}
unsafe impl<T: Send + Sync + 'static, E: Send + Sync + 'static> Sync for LazyCell<T, E> {}

impl<T: Send + Sync + 'static, E: Send + Sync + 'static> LazyCell<T, E> {
    pub(crate) fn new(context: Context, callback: Box<dyn FnOnce(Resolver<T, E>) + Send>) -> Self {
        Self {
            state: AtomicU8::new(NOT_STARTED),
            deferred: UnsafeCell::new(Some(Deferred { context, callback })),
            promise: Arc::new(PromiseCell::new()),
        }
    }

    pub(crate) fn promise_cell(&self) -> &Arc<PromiseCell<T, E>> {
        &self.promise
    }

    /// The sole synchronization point: at most one caller ever gets `true`.
    #[inline]
    fn try_transition(&self) -> bool {
        self.state
            .compare_exchange(NOT_STARTED, TRIGGERED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Triggers the deferred computation if nobody has yet.
    ///
    /// The winner schedules `callback(resolver)` on the stored context with
    /// forced-asynchronous delivery: the triggering thread always regains
    /// control before the callback can run, even on a context that would
    /// permit inline execution. Losers return without side effects.
    pub(crate) fn execute(&self) {
        if !self.try_transition() {
            return;
        }
        // SAFETY: winning the transition grants exclusive access to the slot.
        let Some(Deferred { context, callback }) = (unsafe { (*self.deferred.get()).take() })
        else {
            debug_assert!(false, "deferred description missing after winning the transition");
            return;
        };

        #[cfg(feature = "tracing")]
        tracing::trace!("lazy promise triggered");

        let resolver = Resolver::new(Arc::clone(&self.promise));
        context.execute(false, Box::new(move || callback(resolver)));
    }

    /// Cancels the deferred computation if nobody has triggered it.
    ///
    /// The winner drops the description without ever invoking the callback
    /// and records `Cancelled` directly on the promise cell, bypassing the
    /// resolver path. If execution already won, this is a no-op: started work
    /// cannot be retroactively abandoned.
    pub(crate) fn abandon(&self) {
        if !self.try_transition() {
            return;
        }
        // SAFETY: same exclusivity as `execute`.
        unsafe {
            *self.deferred.get() = None;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!("lazy promise abandoned before observation");

        self.promise.resolve(Outcome::Cancelled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_cell(counter: Arc<AtomicUsize>) -> LazyCell<u32, u32> {
        LazyCell::new(
            Context::Background,
            Box::new(move |resolver| {
                counter.fetch_add(1, Ordering::SeqCst);
                resolver.fulfill(42);
            }),
        )
    }

    #[test]
    fn test_transition_fires_once() {
        let cell = counting_cell(Arc::new(AtomicUsize::new(0)));
        assert!(cell.try_transition());
        assert!(!cell.try_transition());
        assert!(!cell.try_transition());
    }

    #[test]
    fn test_execute_idempotent() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cell = counting_cell(counter.clone());
        cell.execute();
        cell.execute();
        assert_eq!(*cell.promise_cell().block_until_resolved(), Outcome::Fulfilled(42));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_abandon_skips_callback() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cell = counting_cell(counter.clone());
        cell.abandon();
        assert_eq!(*cell.promise_cell().block_until_resolved(), Outcome::Cancelled);
        // Execute after abandonment loses the transition.
        cell.execute();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unobserved_drop_releases_description() {
        struct NoteDrop(Arc<AtomicUsize>);
        impl Drop for NoteDrop {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        let note = NoteDrop(drops.clone());
        let cell: LazyCell<u32, u32> = LazyCell::new(
            Context::Background,
            Box::new(move |resolver| {
                let _keep = &note;
                resolver.fulfill(1);
            }),
        );
        assert_eq!(drops.load(Ordering::SeqCst), 0);
        drop(cell);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }
}
