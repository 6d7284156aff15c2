use std::collections::HashSet;

use proptest::prelude::*;

use crate::{
    HeapSettings, Object, ObjectRef, VM, VMCreateInfo, Visitable, VmError,
};

#[derive(Debug, Clone)]
enum Op {
    PushScalar(i64),
    PushPair,
    Pop,
    Dup,
    SetTail(usize, usize),
    Collect,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof! {
        4 => any::<i64>().prop_map(Op::PushScalar),
        3 => Just(Op::PushPair),
        3 => Just(Op::Pop),
        1 => Just(Op::Dup),
        1 => (0usize..16, 0usize..16).prop_map(|(a, b)| Op::SetTail(a, b)),
        1 => Just(Op::Collect),
    }
}

fn arb_settings() -> impl Strategy<Value = HeapSettings> {
    (1usize..12, 1usize..4, proptest::option::of(1usize..6)).prop_map(
        |(initial_threshold, growth_factor, min_threshold)| HeapSettings {
            initial_threshold,
            growth_factor,
            min_threshold,
            heap_limit: None,
        },
    )
}

/// Everything reachable from the stack, computed without the marker.
fn reachable(vm: &VM) -> HashSet<ObjectRef> {
    let mut seen = HashSet::new();
    let mut pending: Vec<ObjectRef> = vm.stack().stack().to_vec();

    while let Some(r) = pending.pop() {
        if !seen.insert(r) {
            continue;
        }
        let object = vm.heap().get(r).expect("reachable object must be live");
        object.visit_edges(&mut |edge| pending.push(edge));
    }
    seen
}

fn all_objects(vm: &VM) -> HashSet<ObjectRef> {
    vm.heap().objects().map(|(r, _)| r).collect()
}

fn nth_from_top(vm: &VM, n: usize) -> Option<ObjectRef> {
    let depth = vm.stack().depth();
    if depth == 0 {
        return None;
    }
    vm.stack().stack_get_nth(n % depth)
}

/// Stack errors are expected from random sequences; anything else is a bug.
fn check(result: Result<(), VmError>) -> Result<(), TestCaseError> {
    if let Err(err) = result {
        prop_assert!(
            matches!(
                err,
                VmError::StackOverflow { .. } | VmError::StackUnderflow { .. }
            ),
            "unexpected error: {}",
            err
        );
    }
    Ok(())
}

fn apply(vm: &mut VM, op: &Op) -> Result<(), TestCaseError> {
    match *op {
        Op::PushScalar(value) => check(vm.push_scalar(value).map(drop)),
        Op::PushPair => check(vm.push_pair().map(drop)),
        Op::Pop => check(vm.pop().map(drop)),
        Op::Dup => match vm.peek() {
            Some(top) => check(vm.push(top)),
            None => Ok(()),
        },
        Op::SetTail(a, b) => {
            if let (Some(pair), Some(tail)) =
                (nth_from_top(vm, a), nth_from_top(vm, b))
            {
                if vm.get(pair).is_some_and(|obj| obj.is_pair()) {
                    prop_assert_eq!(vm.set_tail(pair, tail), Ok(()));
                }
            }
            Ok(())
        }
        Op::Collect => {
            vm.collect();
            Ok(())
        }
    }
}

proptest! {
    #[test]
    fn collect_frees_exactly_the_unreachable(
        settings in arb_settings(),
        ops in prop::collection::vec(arb_op(), 0..200),
    ) {
        let mut vm = VM::new(VMCreateInfo {
            stack_size: 32,
            heap: settings.clone(),
        });

        for op in &ops {
            apply(&mut vm, op)?;
        }

        let live = reachable(&vm);
        let before = all_objects(&vm);
        prop_assert!(live.is_subset(&before));

        let stats = vm.collect();

        for r in &live {
            prop_assert!(vm.heap().is_live(*r));
        }
        for r in before.difference(&live) {
            prop_assert!(!vm.heap().is_live(*r));
        }
        prop_assert_eq!(stats.freed, before.len() - live.len());
        prop_assert_eq!(vm.num_objects(), live.len());
        prop_assert_eq!(vm.heap().objects().count(), vm.num_objects());
        prop_assert!(vm.heap().objects().all(|(_, obj)| !obj.is_marked()));
        prop_assert_eq!(
            vm.max_objects(),
            (vm.num_objects() * settings.growth_factor)
                .max(settings.min_threshold())
        );
    }

    #[test]
    fn allocation_never_frees_reachable_objects(
        settings in arb_settings(),
        ops in prop::collection::vec(arb_op(), 0..200),
    ) {
        let mut vm = VM::new(VMCreateInfo { stack_size: 32, heap: settings });

        for op in &ops {
            let live = reachable(&vm);
            apply(&mut vm, op)?;

            for r in &live {
                prop_assert!(vm.heap().is_live(*r));
            }
            prop_assert_eq!(vm.heap().objects().count(), vm.num_objects());
        }
    }

    #[test]
    fn pairs_keep_their_operands(
        values in prop::collection::vec(any::<i64>(), 2..40),
    ) {
        let mut vm = VM::new(VMCreateInfo {
            stack_size: 64,
            heap: HeapSettings { initial_threshold: 2, ..Default::default() },
        });

        for &value in &values {
            vm.push_scalar(value).unwrap();
        }
        while vm.stack().depth() > 1 {
            vm.push_pair().unwrap();
        }
        vm.collect();

        // right-nested pairs from the top down, so the scalars come back in order
        let mut scalars = Vec::new();
        let mut pending = vec![vm.peek().unwrap()];
        while let Some(r) = pending.pop() {
            match vm.get(r).unwrap() {
                Object::Scalar(value) => scalars.push(value),
                Object::Pair { head, tail } => {
                    pending.push(tail);
                    pending.push(head);
                }
            }
        }
        let expected_objects = 2 * values.len() - 1;
        prop_assert_eq!(scalars, values);
        prop_assert_eq!(vm.num_objects(), expected_objects);
    }
}
