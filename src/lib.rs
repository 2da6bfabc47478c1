//! # `morrow` - Lazy Promise Primitives
//!
//! Lazy, thread-safe promise primitives with exactly-once triggering.
//!
//! The centerpiece is [`LazyPromise`]: a handle to a computation that is
//! described at construction but not started until a consumer first observes
//! it. At most one start ever occurs, no matter how many clones of the handle
//! exist or how many threads race to observe it, and a handle that is
//! explicitly abandoned before observation cancels the computation instead of
//! running it.
//!
//! ## Guarantees
//!
//! - **Exactly-once triggering**: the `not started -> triggered` transition
//!   is a single compare-exchange; concurrent observers have exactly one
//!   winner and all of them converge on the same [`Promise`].
//! - **No lock across user code**: the trigger cell releases its captured
//!   description before scheduling, so the callback runs without holding any
//!   lock belonging to this crate.
//! - **Forced-asynchronous start**: the thread that wins the trigger race
//!   never runs the callback itself; it only arranges for it to run, even on
//!   a context that would permit inline execution. Observing a lazy promise
//!   from inside another callback cannot reenter or grow the stack.
//! - **Inert when unread**: dropping every handle without observing releases
//!   the captured closure and context without recording any outcome.
//! - **Identity equality**: handles compare by the cell they are wired to,
//!   never by the computation they describe.
//!
//! ## Architecture
//!
//! Three small layers:
//!
//! 1. **Contexts** ([`Context`], [`Executor`]): named execution venues with
//!    an explicit synchronous/deferred submission contract.
//! 2. **Promises** ([`Promise`], [`Resolver`], [`Outcome`]): a shared,
//!    multi-observer container for one eventual outcome, resolved at most
//!    once through a single-use capability. Combinators are out of scope.
//! 3. **Lazy handles** ([`LazyPromise`]): the trigger state machine layered
//!    on top, owning the deferred description until first observation or
//!    abandonment.
//!
//! ## Example
//!
//! ```
//! use morrow::{Context, LazyPromise, Outcome};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let runs = Arc::new(AtomicUsize::new(0));
//! let lazy = LazyPromise::<u32, String>::new(&Context::Background, {
//!     let runs = runs.clone();
//!     move |resolver| {
//!         runs.fetch_add(1, Ordering::SeqCst);
//!         resolver.fulfill(42);
//!     }
//! });
//!
//! // Cloning and holding the handle runs nothing.
//! let other = lazy.clone();
//! assert_eq!(runs.load(Ordering::SeqCst), 0);
//!
//! // Both observers share one outcome and one execution.
//! assert_eq!(lazy.promise().wait(), Outcome::Fulfilled(42));
//! assert_eq!(other.promise().wait(), Outcome::Fulfilled(42));
//! assert_eq!(runs.load(Ordering::SeqCst), 1);
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod context;
pub mod lazy;
pub mod promise;

pub use context::{Context, Executor};
pub use lazy::LazyPromise;
pub use promise::{Outcome, Promise, Resolver};

/// A [`Promise`] whose error type is [`anyhow::Error`].
pub type AnyPromise<T> = Promise<T, anyhow::Error>;

/// A [`LazyPromise`] whose error type is [`anyhow::Error`].
pub type AnyLazyPromise<T> = LazyPromise<T, anyhow::Error>;

// Compile-time layout checks: handles stay a single pointer.
const _: () = {
    use core::mem;

    assert!(mem::size_of::<Promise<u64, u64>>() == mem::size_of::<usize>());
    assert!(mem::size_of::<LazyPromise<u64, u64>>() == mem::size_of::<usize>());
    assert!(mem::size_of::<Resolver<u64, u64>>() == mem::size_of::<usize>());
};
