use std::{collections::HashSet, fmt::Write};

use crate::{Heap, Object, ObjectRef, VM, VmError};

/// Printed in place of a pair that is already being printed further up.
pub const CYCLE_MARKER: &str = "...";

enum Step {
    Value(ObjectRef),
    Text(&'static str),
    Close(ObjectRef),
}

/// Renders `root` as text: scalars as literals, pairs as `(head, tail)`.
///
/// Walks with an explicit stack so deeply nested pairs do not recurse.
/// A pair reached again while it is still open prints as [`CYCLE_MARKER`].
pub fn render(heap: &Heap, root: ObjectRef) -> Result<String, VmError> {
    let mut output = String::new();
    let mut open: HashSet<ObjectRef> = HashSet::new();
    let mut steps = vec![Step::Value(root)];

    while let Some(step) = steps.pop() {
        match step {
            Step::Text(text) => output.push_str(text),
            Step::Close(r) => {
                open.remove(&r);
                output.push(')');
            }
            Step::Value(r) => {
                let object = heap.get(r).ok_or(VmError::InvalidReference(r))?;
                match object.object {
                    Object::Scalar(value) => {
                        let _ = write!(&mut output, "{value}");
                    }
                    Object::Pair { .. } if open.contains(&r) => {
                        output.push_str(CYCLE_MARKER);
                    }
                    Object::Pair { head, tail } => {
                        open.insert(r);
                        output.push('(');
                        steps.push(Step::Close(r));
                        steps.push(Step::Value(tail));
                        steps.push(Step::Text(", "));
                        steps.push(Step::Value(head));
                    }
                }
            }
        }
    }

    Ok(output)
}

impl VM {
    /// Renders a reference with [`render`].
    pub fn render(&self, r: ObjectRef) -> Result<String, VmError> {
        render(self.heap(), r)
    }

    /// Renders the stack top first, one `[index] value` line per root.
    pub fn stack_to_string(&self) -> String {
        let depth = self.stack().depth();
        let mut output = String::new();

        for i in 0..depth {
            let Some(r) = self.stack().stack_get_nth(i) else {
                break;
            };
            let pretty = render(self.heap(), r)
                .unwrap_or_else(|err| format!("<{err}>"));

            let _ = writeln!(&mut output, "[{:02}] {}", depth - i - 1, pretty);
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use crate::{VM, VMCreateInfo};

    use super::*;

    fn create_vm() -> VM {
        VM::new(VMCreateInfo::default())
    }

    #[test]
    fn scalars_render_as_literals() {
        let mut vm = create_vm();
        let r = vm.push_scalar(-42).unwrap();
        assert_eq!(vm.render(r).unwrap(), "-42");
    }

    #[test]
    fn nested_pairs_render_head_then_tail() {
        let mut vm = create_vm();
        vm.push_scalar(1).unwrap();
        vm.push_scalar(2).unwrap();
        vm.push_pair().unwrap();
        vm.push_scalar(3).unwrap();
        vm.push_scalar(4).unwrap();
        vm.push_pair().unwrap();
        let root = vm.push_pair().unwrap();

        assert_eq!(vm.render(root).unwrap(), "((1, 2), (3, 4))");
    }

    #[test]
    fn shared_substructure_is_not_a_cycle() {
        let mut vm = create_vm();
        let one = vm.push_scalar(1).unwrap();
        vm.push(one).unwrap();
        let inner = vm.push_pair().unwrap();
        vm.push(inner).unwrap();
        let outer = vm.push_pair().unwrap();

        assert_eq!(vm.render(outer).unwrap(), "((1, 1), (1, 1))");
    }

    #[test]
    fn cycles_render_with_marker() {
        let mut vm = create_vm();
        vm.push_scalar(1).unwrap();
        vm.push_scalar(2).unwrap();
        let a = vm.push_pair().unwrap();
        vm.set_tail(a, a).unwrap();

        assert_eq!(vm.render(a).unwrap(), "(1, ...)");
    }

    #[test]
    fn dead_references_are_rejected() {
        let mut vm = create_vm();
        let r = vm.push_scalar(5).unwrap();
        vm.pop().unwrap();
        vm.collect();

        assert_eq!(vm.render(r), Err(VmError::InvalidReference(r)));
    }

    #[test]
    fn stack_listing_is_top_first() {
        let mut vm = create_vm();
        vm.push_scalar(1).unwrap();
        vm.push_scalar(2).unwrap();
        vm.push_pair().unwrap();
        vm.push_scalar(3).unwrap();

        assert_eq!(vm.stack_to_string(), "[01] 3\n[00] (1, 2)\n");
    }
}
