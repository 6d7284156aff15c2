use std::fmt;

use crate::ObjectRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    /// A push was attempted while the stack held `capacity` roots.
    StackOverflow { capacity: usize },
    /// An operation needed `needed` operands but the stack held `depth`.
    StackUnderflow { needed: usize, depth: usize },
    /// The live set still filled the heap after a collection.
    OutOfMemory { live: usize, limit: usize },
    /// The handle does not name a live object.
    InvalidReference(ObjectRef),
    /// A pair operation was applied to a scalar.
    NotAPair(ObjectRef),
    InvalidSettings(&'static str),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::StackOverflow { capacity } => {
                write!(f, "stack overflow: capacity of {capacity} roots reached")
            }
            VmError::StackUnderflow { needed, depth } => write!(
                f,
                "stack underflow: needed {needed} operands, found {depth}"
            ),
            VmError::OutOfMemory { live, limit } => write!(
                f,
                "out of memory: {live} live objects, heap limit is {limit}"
            ),
            VmError::InvalidReference(r) => {
                write!(f, "invalid reference {r}: object is not live")
            }
            VmError::NotAPair(r) => write!(f, "object {r} is not a pair"),
            VmError::InvalidSettings(reason) => {
                write!(f, "invalid settings: {reason}")
            }
        }
    }
}

impl std::error::Error for VmError {}
