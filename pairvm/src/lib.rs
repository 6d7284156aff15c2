mod error;
mod format;
mod heap;
mod object;
mod stack;
mod visitor;
mod vm;

pub use error::VmError;
pub use format::{CYCLE_MARKER, render};
pub use heap::{GarbageCollectionStats, Heap, HeapSettings, Objects};
pub use object::*;
pub use stack::Stack;
pub use visitor::{RootProvider, Visitable};
pub use vm::*;

#[cfg(test)]
mod properties;
