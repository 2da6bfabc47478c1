//! Scheduling contexts: where promise callbacks run.
//!
//! A [`Context`] names an execution venue. Every callback this crate runs is
//! handed to a context through [`Context::execute`], which carries an explicit
//! `is_synchronous` contract: when `false`, the submitting thread is
//! guaranteed to regain control before the work can run.

use std::fmt;
use std::sync::Arc;

/// A user-supplied execution venue.
///
/// Implementations receive ownership of the work and are expected to run it
/// on their own executor. Work submitted through a [`Context`] with
/// `is_synchronous = false` must not run on the submitting thread before
/// `execute` returns; an implementation that runs work inline forfeits the
/// reentrancy guarantees of the lazy trigger path.
pub trait Executor: Send + Sync {
    /// Runs `work` on this executor.
    fn execute(&self, work: Box<dyn FnOnce() + Send>);
}

/// The context in which a promise body or callback is evaluated.
#[derive(Clone)]
pub enum Context {
    /// Executes synchronously where the engine permits it.
    ///
    /// Rarely what you want outside tests. Code paths that force deferred
    /// scheduling (the lazy trigger path in particular) fall back to
    /// [`Context::Background`] instead of running inline.
    Immediate,
    /// Executes on the shared rayon thread pool.
    Background,
    /// Executes synchronously only where the engine explicitly permits it
    /// (eager promise bodies, observers on already-resolved promises), and on
    /// the wrapped context everywhere else.
    NowOr(Arc<Context>),
    /// Executes on a user-supplied [`Executor`].
    Custom(Arc<dyn Executor>),
}

impl Context {
    /// Wraps `inner` in a now-or context.
    ///
    /// Callbacks registered on an already-resolved promise run synchronously
    /// before the registration returns; everything else, including the lazy
    /// trigger path, behaves as `inner`.
    pub fn now_or(inner: Context) -> Self {
        Context::NowOr(Arc::new(inner))
    }

    /// Wraps a user-supplied executor.
    pub fn custom(executor: Arc<dyn Executor>) -> Self {
        Context::Custom(executor)
    }

    /// Submits `work` to this context.
    ///
    /// `is_synchronous` is a hard contract, not a hint: when `false`, `work`
    /// never runs on the calling thread before this method returns, even on
    /// [`Context::Immediate`]. When `true`, contexts that permit inline
    /// execution run `work` before returning.
    pub fn execute(&self, is_synchronous: bool, work: Box<dyn FnOnce() + Send>) {
        match self {
            Context::Immediate => {
                if is_synchronous {
                    work();
                } else {
                    rayon::spawn(work);
                }
            }
            Context::Background => rayon::spawn(work),
            Context::NowOr(inner) => {
                if is_synchronous {
                    work();
                } else {
                    inner.execute(false, work);
                }
            }
            Context::Custom(executor) => executor.execute(work),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::Background
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::Immediate => f.write_str("Immediate"),
            Context::Background => f.write_str("Background"),
            Context::NowOr(inner) => f.debug_tuple("NowOr").field(inner).finish(),
            Context::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Queues submitted work instead of running it.
    struct ManualExecutor {
        queue: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
    }

    impl ManualExecutor {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                queue: Mutex::new(Vec::new()),
            })
        }

        fn run_all(&self) -> usize {
            let drained: Vec<_> = std::mem::take(&mut *self.queue.lock().unwrap());
            let count = drained.len();
            for work in drained {
                work();
            }
            count
        }
    }

    impl Executor for ManualExecutor {
        fn execute(&self, work: Box<dyn FnOnce() + Send>) {
            self.queue.lock().unwrap().push(work);
        }
    }

    #[test]
    fn test_immediate_runs_inline_when_synchronous() {
        let ran = Arc::new(AtomicUsize::new(0));
        let r = ran.clone();
        Context::Immediate.execute(true, Box::new(move || {
            r.fetch_add(1, Ordering::Relaxed);
        }));
        assert_eq!(ran.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_custom_executor_defers() {
        let executor = ManualExecutor::new();
        let context = Context::custom(executor.clone());
        let ran = Arc::new(AtomicUsize::new(0));

        let r = ran.clone();
        context.execute(false, Box::new(move || {
            r.fetch_add(1, Ordering::Relaxed);
        }));

        assert_eq!(ran.load(Ordering::Relaxed), 0);
        assert_eq!(executor.run_all(), 1);
        assert_eq!(ran.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_now_or_defers_to_inner_when_asynchronous() {
        let executor = ManualExecutor::new();
        let context = Context::now_or(Context::custom(executor.clone()));
        let ran = Arc::new(AtomicUsize::new(0));

        let r = ran.clone();
        context.execute(false, Box::new(move || {
            r.fetch_add(1, Ordering::Relaxed);
        }));
        assert_eq!(ran.load(Ordering::Relaxed), 0);
        executor.run_all();
        assert_eq!(ran.load(Ordering::Relaxed), 1);

        let r = ran.clone();
        context.execute(true, Box::new(move || {
            r.fetch_add(1, Ordering::Relaxed);
        }));
        assert_eq!(ran.load(Ordering::Relaxed), 2);
    }
}
