//! Fixed-capacity storage for tree records
//!
//! Nothing in here ever frees a single record. Records are handed out front to back from a caller supplied slice
//! and are addressed by their index, which stays valid for as long as the backing slice is borrowed.

use crate::fdt::{DtbNode, Property};
use thiserror_no_std::Error;

/// The number of node slots in a [`TreeStorage`] if nothing else is specified
pub const DEFAULT_NODES: usize = 64;

/// The number of property slots in a [`TreeStorage`] if nothing else is specified
pub const DEFAULT_PROPS: usize = 512;

/// The error returned when an arena has no free slot left
#[derive(Debug, Error, Eq, PartialEq, Copy, Clone)]
#[error("The arena is exhausted, all {capacity} slots are in use")]
pub struct ArenaExhausted {
    pub capacity: usize,
}

/// A monotonic arena allocator
///
/// The arena places values into consecutive slots of the given backing slice.
/// Allocation order is preserved which means that [`as_slice()`](Arena::as_slice) yields values in the order in
/// which they were allocated.
#[derive(Debug)]
pub struct Arena<'a, Content> {
    /// The backing memory
    slots: &'a mut [Content],
    /// Number of slots that are already handed out
    len: usize,
}

impl<'a, Content> Arena<'a, Content> {
    /// Create a new arena from the given slice of memory.
    ///
    /// The current content of the slice is irrelevant, every slot is overwritten when it is allocated.
    pub fn new(slots: &'a mut [Content]) -> Self {
        Self { slots, len: 0 }
    }

    /// Move `value` into the next free slot and return the index of that slot
    pub fn alloc(&mut self, value: Content) -> Result<usize, ArenaExhausted> {
        let capacity = self.capacity();
        let slot = self
            .slots
            .get_mut(self.len)
            .ok_or(ArenaExhausted { capacity })?;
        *slot = value;
        self.len += 1;
        Ok(self.len - 1)
    }

    pub fn get(&self, index: usize) -> Option<&Content> {
        self.as_slice().get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Content> {
        self.as_mut_slice().get_mut(index)
    }

    /// How many values have been allocated so far
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// How many values fit into the arena in total
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// All allocated values in allocation order
    pub fn as_slice(&self) -> &[Content] {
        &self.slots[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [Content] {
        &mut self.slots[..self.len]
    }

    /// Give up the ability to allocate and return the allocated values for the whole lifetime of the backing memory
    pub fn into_slice(self) -> &'a [Content] {
        let slots: &'a [Content] = self.slots;
        &slots[..self.len]
    }
}

/// Backing memory for one parsed device tree.
///
/// `NODES` bounds the number of nodes (including the synthetic root) and `PROPS` bounds the number of properties
/// that can be stored across all nodes.
/// Because [`new()`](TreeStorage::new) is a `const fn`, the storage can live in a `static` when no stack is big
/// enough yet.
pub struct TreeStorage<'buf, const NODES: usize = DEFAULT_NODES, const PROPS: usize = DEFAULT_PROPS> {
    pub(crate) nodes: [DtbNode<'buf>; NODES],
    pub(crate) props: [Property<'buf>; PROPS],
}

impl<'buf, const NODES: usize, const PROPS: usize> TreeStorage<'buf, NODES, PROPS> {
    pub const fn new() -> Self {
        Self {
            nodes: [DtbNode::EMPTY; NODES],
            props: [Property::EMPTY; PROPS],
        }
    }

    /// Split the storage into one arena for nodes and one for properties
    pub fn arenas(&mut self) -> (Arena<'_, DtbNode<'buf>>, Arena<'_, Property<'buf>>) {
        (Arena::new(&mut self.nodes), Arena::new(&mut self.props))
    }
}

impl<'buf, const NODES: usize, const PROPS: usize> Default for TreeStorage<'buf, NODES, PROPS> {
    fn default() -> Self {
        Self::new()
    }
}
