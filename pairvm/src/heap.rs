//! Mark-and-sweep heap for scalars and pairs.
//!
//! Objects live in a dense vector of slots addressed by [`ObjectRef`]. Live
//! slots are additionally threaded into a chain (newest first) which the
//! sweeper walks. Roots come from a [`RootProvider`], edges from
//! [`Visitable`].

use log::{debug, info, trace};

use crate::{HeapObject, Object, ObjectRef, RootProvider, Visitable, VmError};

// ── Heap settings ─────────────────────────────────────────────────────

/// Controls when collections run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapSettings {
    /// Number of live objects that triggers the first collection.
    pub initial_threshold: usize,
    /// The next threshold is the survivor count times this factor.
    pub growth_factor: usize,
    /// Lower bound for the recomputed threshold, defaults to `initial_threshold`.
    pub min_threshold: Option<usize>,
    /// Hard cap on live objects. Allocating past it is an out-of-memory error.
    pub heap_limit: Option<usize>,
}

impl Default for HeapSettings {
    fn default() -> Self {
        Self {
            initial_threshold: 8,
            growth_factor: 2,
            min_threshold: None,
            heap_limit: None,
        }
    }
}

impl HeapSettings {
    #[inline]
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.initial_threshold == 0 {
            return Err("initial_threshold must be > 0");
        }
        if self.growth_factor == 0 {
            return Err("growth_factor must be > 0");
        }
        if self.min_threshold == Some(0) {
            return Err("min_threshold must be > 0");
        }
        if let Some(limit) = self.heap_limit {
            if limit < self.initial_threshold {
                return Err("heap_limit must be at least initial_threshold");
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn min_threshold(&self) -> usize {
        self.min_threshold.unwrap_or(self.initial_threshold)
    }
}

// ── Statistics ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GarbageCollectionStats {
    /// Objects in the heap when the collection started.
    pub before: usize,
    pub freed: usize,
    pub live: usize,
    /// `max_objects` after the collection.
    pub threshold: usize,
}

// ── Heap ──────────────────────────────────────────────────────────────

#[derive(Debug)]
enum Slot {
    Occupied {
        generation: u32,
        object: HeapObject,
    },
    Free {
        generation: u32,
        next_free: Option<u32>,
    },
}

#[derive(Debug)]
pub struct Heap {
    settings: HeapSettings,
    slots: Vec<Slot>,
    free_head: Option<u32>,
    first_object: Option<ObjectRef>,
    num_objects: usize,
    max_objects: usize,
    collections: usize,
    total_freed: usize,
    last_collection: Option<GarbageCollectionStats>,
}

impl Heap {
    pub fn new(settings: HeapSettings) -> Result<Self, VmError> {
        settings.validate().map_err(VmError::InvalidSettings)?;
        let max_objects = settings.initial_threshold;

        Ok(Self {
            settings,
            slots: Vec::new(),
            free_head: None,
            first_object: None,
            num_objects: 0,
            max_objects,
            collections: 0,
            total_freed: 0,
            last_collection: None,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &HeapSettings {
        &self.settings
    }

    /// Number of objects currently in the heap.
    #[must_use]
    pub fn num_objects(&self) -> usize {
        self.num_objects
    }

    /// Allocation count that triggers the next collection.
    #[must_use]
    pub fn max_objects(&self) -> usize {
        self.max_objects
    }

    #[must_use]
    pub fn collections(&self) -> usize {
        self.collections
    }

    #[must_use]
    pub fn total_freed(&self) -> usize {
        self.total_freed
    }

    #[must_use]
    pub fn last_collection(&self) -> Option<GarbageCollectionStats> {
        self.last_collection
    }

    #[must_use]
    pub fn get(&self, r: ObjectRef) -> Option<&HeapObject> {
        match self.slots.get(r.index())? {
            Slot::Occupied { generation, object }
                if *generation == r.generation =>
            {
                Some(object)
            }
            _ => None,
        }
    }

    pub(crate) fn get_mut(&mut self, r: ObjectRef) -> Option<&mut HeapObject> {
        match self.slots.get_mut(r.index())? {
            Slot::Occupied { generation, object }
                if *generation == r.generation =>
            {
                Some(object)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn is_live(&self, r: ObjectRef) -> bool {
        self.get(r).is_some()
    }

    /// Iterates the heap chain, newest object first.
    #[must_use]
    pub fn objects(&self) -> Objects<'_> {
        Objects {
            heap: self,
            cursor: self.first_object,
        }
    }

    // ── Allocation ────────────────────────────────────────────────────

    /// Stores `object` and returns its handle.
    ///
    /// Runs a collection first if the threshold has been reached. `roots`
    /// must cover every handle the caller still needs, including the edges
    /// of `object` itself.
    pub fn allocate(
        &mut self,
        object: Object,
        roots: &dyn RootProvider,
    ) -> Result<ObjectRef, VmError> {
        debug_assert!(
            {
                let mut edges_live = true;
                object.visit_edges(&mut |edge| {
                    edges_live &= self.is_live(edge);
                });
                edges_live
            },
            "allocating an object with dead edges"
        );

        let at_limit = self
            .settings
            .heap_limit
            .is_some_and(|limit| self.num_objects >= limit);

        if self.num_objects >= self.max_objects || at_limit {
            debug!(
                "allocation threshold {} reached with {} objects, collecting",
                self.max_objects, self.num_objects
            );
            self.collect(roots);
        }

        if let Some(limit) = self.settings.heap_limit {
            if self.num_objects >= limit {
                return Err(VmError::OutOfMemory {
                    live: self.num_objects,
                    limit,
                });
            }
        }

        let heap_object = HeapObject::new(object, self.first_object);
        let r = match self.free_head {
            Some(index) => self.reuse_slot(index, heap_object),
            None => self.push_slot(heap_object)?,
        };

        self.first_object = Some(r);
        self.num_objects += 1;
        trace!("allocated {} as {:?}", r, object);
        Ok(r)
    }

    fn reuse_slot(&mut self, index: u32, object: HeapObject) -> ObjectRef {
        let slot = &mut self.slots[index as usize];
        let Slot::Free {
            generation,
            next_free,
        } = *slot
        else {
            unreachable!("free list links an occupied slot");
        };

        self.free_head = next_free;
        *slot = Slot::Occupied { generation, object };
        ObjectRef { index, generation }
    }

    fn push_slot(&mut self, object: HeapObject) -> Result<ObjectRef, VmError> {
        let out_of_memory = VmError::OutOfMemory {
            live: self.num_objects,
            limit: self.slots.len(),
        };
        let index = u32::try_from(self.slots.len())
            .map_err(|_| out_of_memory.clone())?;
        self.slots.try_reserve(1).map_err(|_| out_of_memory)?;

        self.slots.push(Slot::Occupied {
            generation: 0,
            object,
        });
        Ok(ObjectRef {
            index,
            generation: 0,
        })
    }

    fn free_slot(&mut self, r: ObjectRef) {
        let slot = &mut self.slots[r.index()];
        debug_assert!(matches!(slot, Slot::Occupied { .. }));

        // bumping the generation invalidates every outstanding handle
        *slot = Slot::Free {
            generation: r.generation.wrapping_add(1),
            next_free: self.free_head,
        };
        self.free_head = Some(r.index);
        trace!("freed {}", r);
    }

    // ── Marking ───────────────────────────────────────────────────────

    /// Marks everything reachable from `root`. Returns the number of objects
    /// that were newly marked.
    pub fn mark(&mut self, root: ObjectRef) -> usize {
        let mut worklist = vec![root];
        self.drain_worklist(&mut worklist)
    }

    /// Marks everything reachable from `roots`.
    pub fn mark_all(&mut self, roots: &dyn RootProvider) -> usize {
        let mut worklist = Vec::new();
        roots.visit_roots(&mut |root| worklist.push(root));
        self.drain_worklist(&mut worklist)
    }

    fn drain_worklist(&mut self, worklist: &mut Vec<ObjectRef>) -> usize {
        let mut marked = 0;

        while let Some(r) = worklist.pop() {
            // stale roots handed in by the caller are skipped
            let Some(object) = self.get_mut(r) else {
                trace!("skipping dead reference {r} while marking");
                continue;
            };

            // already marked: shared or cyclic structure
            if !object.mark() {
                continue;
            }
            marked += 1;
            object.visit_edges(&mut |edge| worklist.push(edge));
        }

        marked
    }

    // ── Sweeping ──────────────────────────────────────────────────────

    /// Frees every unmarked object and unmarks the survivors. Returns the
    /// number of objects freed.
    pub fn sweep(&mut self) -> usize {
        let mut freed = 0;
        let mut previous: Option<ObjectRef> = None;
        let mut cursor = self.first_object;

        while let Some(current) = cursor {
            let Some(object) = self.get_mut(current) else {
                unreachable!("heap chain links dead reference {current}");
            };
            let next = object.next;

            if object.is_marked() {
                object.unmark();
                previous = Some(current);
            } else {
                match previous {
                    None => self.first_object = next,
                    Some(previous) => self.relink(previous, next),
                }
                self.free_slot(current);
                self.num_objects -= 1;
                freed += 1;
            }

            cursor = next;
        }

        freed
    }

    /// Clears marks left behind by a [`Heap::mark`] that was never swept.
    fn clear_marks(&mut self) {
        let mut cursor = self.first_object;
        while let Some(current) = cursor {
            let Some(object) = self.get_mut(current) else {
                unreachable!("heap chain links dead reference {current}");
            };
            object.unmark();
            cursor = object.next;
        }
    }

    fn relink(&mut self, r: ObjectRef, next: Option<ObjectRef>) {
        if let Some(object) = self.get_mut(r) {
            object.next = next;
        }
    }

    // ── Collection ────────────────────────────────────────────────────

    /// Runs a full mark-and-sweep cycle and recomputes the threshold.
    pub fn collect(
        &mut self,
        roots: &dyn RootProvider,
    ) -> GarbageCollectionStats {
        let before = self.num_objects;

        self.clear_marks();
        self.mark_all(roots);
        let freed = self.sweep();

        let threshold = self.next_threshold();
        if threshold != self.max_objects {
            debug!("threshold {} -> {}", self.max_objects, threshold);
        }
        self.max_objects = threshold;

        let stats = GarbageCollectionStats {
            before,
            freed,
            live: self.num_objects,
            threshold,
        };
        self.collections += 1;
        self.total_freed += freed;
        self.last_collection = Some(stats);

        info!("collected {} objects, {} remaining", freed, self.num_objects);
        stats
    }

    fn next_threshold(&self) -> usize {
        self.num_objects
            .saturating_mul(self.settings.growth_factor)
            .max(self.settings.min_threshold())
    }
}

/// Iterator over the heap chain.
pub struct Objects<'a> {
    heap: &'a Heap,
    cursor: Option<ObjectRef>,
}

impl<'a> Iterator for Objects<'a> {
    type Item = (ObjectRef, &'a HeapObject);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor?;
        let object = self.heap.get(current)?;
        self.cursor = object.next;
        Some((current, object))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
