use crate::{HeapObject, Object, ObjectRef, Stack};

/// Enumerates the outgoing references of a heap object.
pub trait Visitable {
    fn visit_edges(&self, visitor: &mut dyn FnMut(ObjectRef));
}

/// Supplies the live roots of a collection.
///
/// Every reference handed to `visitor` is treated as reachable by definition.
pub trait RootProvider {
    fn visit_roots(&self, visitor: &mut dyn FnMut(ObjectRef));
}

// scalars have no edges, pairs visit head before tail
impl Visitable for Object {
    #[inline]
    fn visit_edges(&self, visitor: &mut dyn FnMut(ObjectRef)) {
        match *self {
            Object::Scalar(_) => (),
            Object::Pair { head, tail } => {
                visitor(head);
                visitor(tail);
            }
        }
    }
}

impl Visitable for HeapObject {
    #[inline]
    fn visit_edges(&self, visitor: &mut dyn FnMut(ObjectRef)) {
        self.object.visit_edges(visitor);
    }
}

impl RootProvider for Stack {
    fn visit_roots(&self, visitor: &mut dyn FnMut(ObjectRef)) {
        self.stack().iter().for_each(|&root| visitor(root));
    }
}

impl RootProvider for Vec<ObjectRef> {
    fn visit_roots(&self, visitor: &mut dyn FnMut(ObjectRef)) {
        self.iter().for_each(|&root| visitor(root));
    }
}
