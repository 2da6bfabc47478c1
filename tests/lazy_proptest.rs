use morrow::{Context, LazyPromise, Outcome, Promise};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum Operation {
    Observe,
    Abandon,
}

proptest! {
    /// Any sequence of observe/abandon calls on clones of one handle yields
    /// at most one execution, and every observed promise agrees on the
    /// outcome decided by the first effective operation.
    #[test]
    fn test_operation_sequences_converge(ops in proptest::collection::vec(
        prop_oneof![Just(Operation::Observe), Just(Operation::Abandon)],
        1..12
    )) {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let lazy = LazyPromise::<u32, String>::new(&Context::Background, move |resolver| {
            c.fetch_add(1, Ordering::SeqCst);
            resolver.fulfill(7);
        });

        let mut observed: Vec<Promise<u32, String>> = Vec::new();
        for op in &ops {
            match op {
                Operation::Observe => observed.push(lazy.promise()),
                Operation::Abandon => lazy.clone().abandon(),
            }
        }

        let outcomes: Vec<_> = observed.iter().map(Promise::wait).collect();
        for pair in outcomes.windows(2) {
            prop_assert_eq!(&pair[0], &pair[1]);
        }

        // The first operation decides the cell's fate.
        let runs = counter.load(Ordering::SeqCst);
        match ops[0] {
            Operation::Observe => {
                prop_assert_eq!(runs, 1);
                prop_assert_eq!(&outcomes[0], &Outcome::Fulfilled(7));
            }
            Operation::Abandon => {
                prop_assert_eq!(runs, 0);
                for outcome in &outcomes {
                    prop_assert_eq!(outcome, &Outcome::Cancelled);
                }
            }
        }

        // Identity: every observation of one cell is the same promise.
        for pair in observed.windows(2) {
            prop_assert!(pair[0].ptr_eq(&pair[1]));
        }
    }
}
