//! Promises: shared, multi-observer containers for an eventual outcome.
//!
//! This module is the minimal engine the lazy core drives: a [`Promise`] is a
//! cheap clonable handle onto one resolution cell, a [`Resolver`] is the
//! single-use capability for reporting that cell's outcome, and an
//! [`Outcome`] is what every observer eventually sees. Combinator surfaces
//! (chaining, mapping, aggregation) are deliberately absent.

pub(crate) mod cell;

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use cell::PromiseCell;

/// The terminal result of a promise.
///
/// Cancellation is a first-class outcome rather than an error: it records
/// that the computation was discarded, not that it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Outcome<T, E> {
    /// The computation produced a value.
    Fulfilled(T),
    /// The computation reported an error.
    Rejected(E),
    /// The computation was cancelled before producing anything.
    Cancelled,
}

impl<T, E> Outcome<T, E> {
    /// Returns the fulfilled value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Fulfilled(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the rejection error, if any.
    pub fn error(&self) -> Option<&E> {
        match self {
            Outcome::Rejected(error) => Some(error),
            _ => None,
        }
    }

    /// Returns `true` if the computation was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }
}

/// A shared handle onto an eventually-available [`Outcome`].
///
/// Clones share one underlying cell; every observer of any clone sees the
/// identical outcome. Promise identity (which cell a handle is wired to) is
/// exposed through [`Promise::ptr_eq`], not `PartialEq`: two promises that
/// happen to resolve to equal values are still distinct promises.
pub struct Promise<T, E> {
    cell: Arc<PromiseCell<T, E>>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("resolved", &self.cell.is_resolved())
            .finish_non_exhaustive()
    }
}

impl<T, E> Promise<T, E> {
    pub(crate) fn from_cell(cell: Arc<PromiseCell<T, E>>) -> Self {
        Self { cell }
    }

    /// Creates an unresolved promise together with its resolver.
    pub fn with_resolver() -> (Self, Resolver<T, E>)
    where
        T: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        let cell = Arc::new(PromiseCell::new());
        let promise = Self {
            cell: Arc::clone(&cell),
        };
        (promise, Resolver { cell })
    }

    /// Creates a promise whose body starts immediately on `context`.
    ///
    /// Unlike [`LazyPromise`](crate::LazyPromise), the callback is submitted
    /// before this constructor returns, and synchronous delivery is permitted
    /// when the context allows it.
    pub fn new<F>(context: &Context, callback: F) -> Self
    where
        F: FnOnce(Resolver<T, E>) + Send + 'static,
        T: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        let (promise, resolver) = Self::with_resolver();
        context.execute(true, Box::new(move || callback(resolver)));
        promise
    }

    /// Creates an already-fulfilled promise.
    pub fn fulfilled(value: T) -> Self
    where
        T: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        Self::pre_resolved(Outcome::Fulfilled(value))
    }

    /// Creates an already-rejected promise.
    pub fn rejected(error: E) -> Self
    where
        T: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        Self::pre_resolved(Outcome::Rejected(error))
    }

    /// Creates an already-cancelled promise.
    pub fn cancelled() -> Self
    where
        T: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        Self::pre_resolved(Outcome::Cancelled)
    }

    fn pre_resolved(outcome: Outcome<T, E>) -> Self
    where
        T: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        let cell = Arc::new(PromiseCell::new());
        cell.resolve(outcome);
        Self { cell }
    }

    /// Returns `true` if the outcome has been recorded.
    pub fn is_resolved(&self) -> bool {
        self.cell.is_resolved()
    }

    /// Returns a copy of the outcome if already resolved, without blocking.
    pub fn try_outcome(&self) -> Option<Outcome<T, E>>
    where
        T: Clone,
        E: Clone,
    {
        self.cell.outcome_if_resolved().cloned()
    }

    /// Blocks the calling thread until the outcome is available.
    pub fn wait(&self) -> Outcome<T, E>
    where
        T: Clone,
        E: Clone,
    {
        self.cell.block_until_resolved().clone()
    }

    /// Blocks until the outcome is available and passes it to `f` by
    /// reference, for outcome types that are not `Clone`.
    pub fn wait_ref<R>(&self, f: impl FnOnce(&Outcome<T, E>) -> R) -> R {
        f(self.cell.block_until_resolved())
    }

    /// Registers `callback` to run on `context` once this promise resolves.
    ///
    /// Fires exactly once per registration. If the promise is already
    /// resolved, the callback is submitted immediately with synchronous
    /// delivery permitted, so a now-or or immediate context runs it before
    /// this call returns.
    pub fn on_resolved<F>(&self, context: &Context, callback: F)
    where
        F: FnOnce(&Outcome<T, E>) + Send + 'static,
        T: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        self.cell.register_callback(context, Box::new(callback));
    }

    /// Returns `true` if `self` and `other` are wired to the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

/// The single-use capability for reporting a promise's outcome.
///
/// Exactly one resolver exists per cell and it is not clonable. The first
/// report wins; if the resolver is dropped without reporting, the promise is
/// cancelled, so a callback that returns early can never strand observers.
pub struct Resolver<T: Send + Sync + 'static, E: Send + Sync + 'static> {
    cell: Arc<PromiseCell<T, E>>,
}

impl<T: Send + Sync + 'static, E: Send + Sync + 'static> Resolver<T, E> {
    pub(crate) fn new(cell: Arc<PromiseCell<T, E>>) -> Self {
        Self { cell }
    }

    /// Reports a successful value.
    pub fn fulfill(self, value: T) {
        self.cell.resolve(Outcome::Fulfilled(value));
    }

    /// Reports a failure.
    pub fn reject(self, error: E) {
        self.cell.resolve(Outcome::Rejected(error));
    }

    /// Reports cancellation.
    pub fn cancel(self) {
        self.cell.resolve(Outcome::Cancelled);
    }
}

impl<T: Send + Sync + 'static, E: Send + Sync + 'static> fmt::Debug for Resolver<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static, E: Send + Sync + 'static> Drop for Resolver<T, E> {
    fn drop(&mut self) {
        // No-op when an outcome was already reported through `self`.
        self.cell.resolve(Outcome::Cancelled);
    }
}
