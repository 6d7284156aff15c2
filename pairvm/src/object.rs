use std::fmt;

/// Handle to an object owned by a [`crate::Heap`].
///
/// The `generation` of a handle must match the generation of its slot, so a
/// handle to a freed object never resolves to whatever reuses the slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ObjectRef {
    #[must_use]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[must_use]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.index, self.generation)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Object {
    Scalar(i64),
    Pair { head: ObjectRef, tail: ObjectRef },
}

impl Object {
    #[must_use]
    pub fn is_pair(&self) -> bool {
        matches!(self, Object::Pair { .. })
    }

    #[must_use]
    pub fn as_scalar(&self) -> Option<i64> {
        match *self {
            Object::Scalar(value) => Some(value),
            Object::Pair { .. } => None,
        }
    }

    #[must_use]
    pub fn as_pair(&self) -> Option<(ObjectRef, ObjectRef)> {
        match *self {
            Object::Pair { head, tail } => Some((head, tail)),
            Object::Scalar(_) => None,
        }
    }
}

/// An object as stored in the heap.
///
/// `next` threads every live object into the heap chain, newest first.
#[derive(Debug, Clone)]
pub struct HeapObject {
    pub object: Object,
    marked: bool,
    pub(crate) next: Option<ObjectRef>,
}

impl HeapObject {
    pub(crate) fn new(object: Object, next: Option<ObjectRef>) -> Self {
        Self {
            object,
            marked: false,
            next,
        }
    }

    #[must_use]
    pub fn is_marked(&self) -> bool {
        self.marked
    }

    /// Sets the mark flag. Returns `false` if the object was already marked.
    pub(crate) fn mark(&mut self) -> bool {
        !std::mem::replace(&mut self.marked, true)
    }

    pub(crate) fn unmark(&mut self) {
        self.marked = false;
    }
}
