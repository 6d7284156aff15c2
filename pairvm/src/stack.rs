use crate::{ObjectRef, VmError};

/// The operand stack. Every entry is a root.
///
/// Storage grows on demand up to `capacity`; pushing past it is reported as
/// [`VmError::StackOverflow`].
#[derive(Debug, Clone)]
pub struct Stack {
    values: Vec<ObjectRef>,
    capacity: usize,
}

impl Stack {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            values: Vec::new(),
            capacity,
        }
    }

    /// Returns the active portion of the stack, bottom first
    #[must_use]
    pub fn stack(&self) -> &[ObjectRef] {
        &self.values
    }

    /// Returns the current stack depth
    #[must_use]
    pub fn depth(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fails unless `n` more values can be pushed.
    pub fn ensure_space(&self, n: usize) -> Result<(), VmError> {
        if self.depth() + n > self.capacity {
            return Err(VmError::StackOverflow {
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Fails unless at least `n` values are on the stack.
    pub fn ensure_depth(&self, n: usize) -> Result<(), VmError> {
        if self.depth() < n {
            return Err(VmError::StackUnderflow {
                needed: n,
                depth: self.depth(),
            });
        }
        Ok(())
    }

    /// Pushes a value onto the stack
    pub fn push(&mut self, value: ObjectRef) -> Result<(), VmError> {
        self.ensure_space(1)?;
        self.values.push(value);
        Ok(())
    }

    /// Pops a value from the stack
    pub fn pop(&mut self) -> Result<ObjectRef, VmError> {
        self.values.pop().ok_or(VmError::StackUnderflow {
            needed: 1,
            depth: 0,
        })
    }

    #[must_use]
    pub fn peek(&self) -> Option<ObjectRef> {
        self.values.last().copied()
    }

    /// Gets the nth value from the top of the stack (0-indexed)
    #[must_use]
    pub fn stack_get_nth(&self, n: usize) -> Option<ObjectRef> {
        if n >= self.depth() {
            return None;
        }
        self.values.get(self.depth() - 1 - n).copied()
    }

    /// Drops every root.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}
