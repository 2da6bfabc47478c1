//! Lazy promises: computations described now, started on first observation.
//!
//! A [`LazyPromise`] packages a context and a callback without running
//! anything. The first call to [`LazyPromise::promise`] across all clones
//! triggers the callback exactly once; [`LazyPromise::abandon`] discards it
//! unstarted and records cancellation instead. Unobserved handles are inert:
//! dropping every clone without observing releases the callback without
//! recording any outcome at all.
//!
//! Example:
//!
//! ```
//! use morrow::{Context, LazyPromise, Outcome};
//!
//! let avatar = LazyPromise::<Vec<u8>, String>::new(&Context::Background, |resolver| {
//!     // Expensive fetch that only happens if somebody asks.
//!     resolver.fulfill(vec![0xC0, 0xFF]);
//! });
//!
//! // Nothing has run yet. Observing starts it, exactly once.
//! assert_eq!(avatar.promise().wait(), Outcome::Fulfilled(vec![0xC0, 0xFF]));
//! ```

pub(crate) mod cell;

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::promise::{Promise, Resolver};
use cell::LazyCell;

/// A lazy, thread-safe handle to a not-yet-started computation.
///
/// Clones are cheap and share one trigger cell. Equality compares cell
/// identity: clones of one handle are equal, independently constructed
/// handles never are, even with identical callbacks.
pub struct LazyPromise<T: Send + Sync + 'static, E: Send + Sync + 'static> {
    cell: Arc<LazyCell<T, E>>,
}

impl<T: Send + Sync + 'static, E: Send + Sync + 'static> LazyPromise<T, E> {
    /// Describes a computation without starting it.
    ///
    /// `callback` will run at most once, on `context`, and only if some clone
    /// of this handle is observed through [`LazyPromise::promise`]. The
    /// resolver handed to the callback is the only way to report the result;
    /// dropping it unresolved cancels the promise.
    pub fn new<F>(context: &Context, callback: F) -> Self
    where
        F: FnOnce(Resolver<T, E>) + Send + 'static,
    {
        Self {
            cell: Arc::new(LazyCell::new(context.clone(), Box::new(callback))),
        }
    }

    /// Returns the promise for the eventual outcome, triggering the
    /// computation on first observation.
    ///
    /// The first call across all clones schedules the callback on the stored
    /// context, never inline with the caller. Every call, before or after
    /// triggering, from any clone, returns a promise wired to the identical
    /// cell, so all observers converge on one outcome.
    pub fn promise(&self) -> Promise<T, E> {
        self.cell.execute();
        Promise::from_cell(Arc::clone(self.cell.promise_cell()))
    }

    /// Discards this handle, cancelling the computation if it never started.
    ///
    /// If no observation has happened yet, the callback is guaranteed never
    /// to run and promises obtained afterwards resolve as cancelled
    /// immediately. If the computation was already triggered, this is a
    /// no-op; started work is owned by the promise machinery.
    pub fn abandon(self) {
        self.cell.abandon();
    }
}

impl<T: Send + Sync + 'static, E: Send + Sync + 'static> Clone for LazyPromise<T, E> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: Send + Sync + 'static, E: Send + Sync + 'static> PartialEq for LazyPromise<T, E> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<T: Send + Sync + 'static, E: Send + Sync + 'static> Eq for LazyPromise<T, E> {}

impl<T: Send + Sync + 'static, E: Send + Sync + 'static> fmt::Debug for LazyPromise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyPromise").finish_non_exhaustive()
    }
}
