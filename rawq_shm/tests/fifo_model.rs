//! Randomized put/get sequences checked against a `VecDeque` model.

use proptest::prelude::*;
use rawq_shm::{GetError, PutError, RingQueue};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

static CASE: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Clone)]
enum Op {
    Put(Vec<u8>),
    Get(usize),
}

fn op_strategy(capacity: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..=capacity + 2).prop_map(Op::Put),
        (0..=capacity + 2).prop_map(Op::Get),
    ]
}

fn scenario() -> impl Strategy<Value = (usize, Vec<Op>)> {
    (1usize..48).prop_flat_map(|capacity| {
        (
            Just(capacity),
            prop::collection::vec(op_strategy(capacity), 1..64),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn queue_matches_model((capacity, ops) in scenario()) {
        let name = format!(
            "rawq_model_{}_{}",
            std::process::id(),
            CASE.fetch_add(1, Ordering::Relaxed)
        );
        let mut queue = RingQueue::create(&name, capacity).unwrap();
        let mut model: VecDeque<u8> = VecDeque::new();

        for op in ops {
            match op {
                Op::Put(data) => {
                    let result = queue.put(&data);
                    if data.len() > capacity {
                        let too_large = matches!(result, Err(PutError::ItemTooLarge { .. }));
                        prop_assert!(too_large);
                    } else if model.len() == capacity {
                        prop_assert!(matches!(result, Err(PutError::QueueFull)));
                    } else if data.len() > capacity - model.len() {
                        let short = matches!(result, Err(PutError::InsufficientSpace { .. }));
                        prop_assert!(short);
                    } else {
                        prop_assert!(result.is_ok());
                        model.extend(&data);
                    }
                }
                Op::Get(length) => {
                    let result = queue.get(length);
                    if model.is_empty() {
                        prop_assert!(matches!(result, Err(GetError::QueueEmpty)));
                    } else if length > model.len() {
                        let short = matches!(result, Err(GetError::InsufficientData { .. }));
                        prop_assert!(short);
                    } else {
                        let expected: Vec<u8> = model.drain(..length).collect();
                        prop_assert_eq!(result.unwrap(), expected);
                    }
                }
            }

            prop_assert_eq!(queue.len(), model.len());
            prop_assert_eq!(queue.free_space(), capacity - model.len());
            let snapshot = queue.control().snapshot();
            prop_assert!(snapshot.head < capacity as u64);
            prop_assert!(snapshot.tail < capacity as u64);
        }

        queue.release().unwrap();
    }
}
