use log::info;

use crate::{
    GarbageCollectionStats, Heap, HeapSettings, Object, ObjectRef, Stack,
    VmError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VMCreateInfo {
    /// Maximum number of simultaneous roots.
    pub stack_size: usize,
    pub heap: HeapSettings,
}

impl Default for VMCreateInfo {
    fn default() -> Self {
        Self {
            stack_size: 256,
            heap: HeapSettings::default(),
        }
    }
}

/// A stack machine whose operand stack is the root set of its heap.
///
/// Dropping a `VM` tears it down the same way [`VM::teardown`] does.
#[derive(Debug)]
pub struct VM {
    heap: Heap,
    stack: Stack,
    closed: bool,
}

impl VM {
    /// # Panics
    /// Panics if `info` is rejected by [`VM::try_new`].
    pub fn new(info: VMCreateInfo) -> Self {
        Self::try_new(info).expect("Invalid VM settings")
    }

    pub fn try_new(info: VMCreateInfo) -> Result<Self, VmError> {
        if info.stack_size == 0 {
            return Err(VmError::InvalidSettings("stack_size must be > 0"));
        }
        let heap = Heap::new(info.heap)?;

        Ok(Self {
            heap,
            stack: Stack::new(info.stack_size),
            closed: false,
        })
    }

    #[must_use]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    #[must_use]
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    #[must_use]
    pub fn num_objects(&self) -> usize {
        self.heap.num_objects()
    }

    #[must_use]
    pub fn max_objects(&self) -> usize {
        self.heap.max_objects()
    }

    /// Returns the object behind `r` if it is still live.
    #[must_use]
    pub fn get(&self, r: ObjectRef) -> Option<Object> {
        self.heap.get(r).map(|obj| obj.object)
    }

    fn ensure_live(&self, r: ObjectRef) -> Result<(), VmError> {
        if self.heap.is_live(r) {
            Ok(())
        } else {
            Err(VmError::InvalidReference(r))
        }
    }

    // ── Stack ─────────────────────────────────────────────────────────

    /// Pushes an existing live object, making it a root.
    pub fn push(&mut self, r: ObjectRef) -> Result<(), VmError> {
        self.ensure_live(r)?;
        self.stack.push(r)
    }

    pub fn pop(&mut self) -> Result<ObjectRef, VmError> {
        self.stack.pop()
    }

    #[must_use]
    pub fn peek(&self) -> Option<ObjectRef> {
        self.stack.peek()
    }

    // ── Allocation ────────────────────────────────────────────────────

    /// `( -- scalar )`
    pub fn push_scalar(&mut self, value: i64) -> Result<ObjectRef, VmError> {
        self.stack.ensure_space(1)?;
        let r = self.heap.allocate(Object::Scalar(value), &self.stack)?;
        self.stack.push(r)?;
        Ok(r)
    }

    /// `( head tail -- pair )`
    ///
    /// The operands stay on the stack until the pair exists, so a collection
    /// triggered by the allocation keeps them alive.
    pub fn push_pair(&mut self) -> Result<ObjectRef, VmError> {
        self.stack.ensure_depth(2)?;
        let (Some(tail), Some(head)) =
            (self.stack.stack_get_nth(0), self.stack.stack_get_nth(1))
        else {
            return Err(VmError::StackUnderflow {
                needed: 2,
                depth: self.stack.depth(),
            });
        };

        let r = self.heap.allocate(Object::Pair { head, tail }, &self.stack)?;
        self.stack.pop()?;
        self.stack.pop()?;
        self.stack.push(r)?;
        Ok(r)
    }

    pub fn set_head(
        &mut self,
        pair: ObjectRef,
        head: ObjectRef,
    ) -> Result<(), VmError> {
        let (_, tail) = self.pair_fields(pair)?;
        self.replace_pair(pair, head, tail)
    }

    pub fn set_tail(
        &mut self,
        pair: ObjectRef,
        tail: ObjectRef,
    ) -> Result<(), VmError> {
        let (head, _) = self.pair_fields(pair)?;
        self.replace_pair(pair, head, tail)
    }

    fn pair_fields(
        &self,
        pair: ObjectRef,
    ) -> Result<(ObjectRef, ObjectRef), VmError> {
        let object = self.get(pair).ok_or(VmError::InvalidReference(pair))?;
        object.as_pair().ok_or(VmError::NotAPair(pair))
    }

    fn replace_pair(
        &mut self,
        pair: ObjectRef,
        head: ObjectRef,
        tail: ObjectRef,
    ) -> Result<(), VmError> {
        self.ensure_live(head)?;
        self.ensure_live(tail)?;
        let object = self
            .heap
            .get_mut(pair)
            .ok_or(VmError::InvalidReference(pair))?;
        object.object = Object::Pair { head, tail };
        Ok(())
    }

    // ── Collection ────────────────────────────────────────────────────

    /// Forces a collection with the stack as the root set.
    pub fn collect(&mut self) -> GarbageCollectionStats {
        self.heap.collect(&self.stack)
    }

    /// Drops every root, collects once and releases the VM.
    pub fn teardown(mut self) -> GarbageCollectionStats {
        self.shutdown()
    }

    fn shutdown(&mut self) -> GarbageCollectionStats {
        self.closed = true;
        self.stack.clear();
        let stats = self.heap.collect(&self.stack);
        info!(
            "vm torn down after {} collections, {} objects freed in total",
            self.heap.collections(),
            self.heap.total_freed()
        );
        stats
    }
}

impl Drop for VM {
    fn drop(&mut self) {
        if !self.closed {
            self.shutdown();
        }
    }
}
