//! A priority queue that stores its elements by value.
//!
//! Insertion and deletion of any element have *O*(log(*n*)) time complexity. Checking
//! the root is *O*(1).
//!
//! # Examples
//!
//! A minimal event scheduler that fires the earliest deadline first and lets a pending
//! event be cancelled through the [`Slot`] it was scheduled into:
//!
//! ```
//! use binheap::{BinaryHeap, GrowthPolicy};
//!
//! struct Event {
//!     at: u64,
//!     name: &'static str,
//! }
//!
//! let earliest = |parent: &Event, child: &Event| parent.at <= child.at;
//! let mut queue = BinaryHeap::try_with_growth(earliest, 16, GrowthPolicy::DOUBLING)?;
//!
//! queue.insert(Event { at: 30, name: "flush" })?;
//! let slot = queue.insert(Event { at: 10, name: "tick" })?;
//!
//! // Slots name positions, so they are only good until the next mutation.
//! assert_eq!(queue.delete(slot).name, "tick");
//!
//! queue.insert(Event { at: 20, name: "retry" })?;
//! let mut fired = Vec::new();
//! while let Some(event) = queue.pop() {
//!     fired.push(event.name);
//! }
//! assert_eq!(fired, ["retry", "flush"]);
//! # Ok::<(), binheap::TryReserveError>(())
//! ```

use core::fmt;
use core::mem;
use core::ptr;
use core::slice;

use crate::error::{handle_error, TryReserveError};
use crate::raw::RawStore;
use crate::sift::{self, Untracked};
use crate::{Allocator, Global, GrowthPolicy, HeapOrder, MinOrder};


/// Names a slot of a [`BinaryHeap`].
///
/// A `Slot` denotes *whatever element currently occupies that position*, not one
/// particular element: any later insertion or deletion may move elements between slots.
/// Callers that need a handle that follows an element around should use an
/// [`IntrusiveHeap`](crate::IntrusiveHeap) instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot(usize);

impl Slot {
    /// The slot holding the root.
    pub const ROOT: Slot = Slot(0);

    /// Returns the array index this slot names.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A binary heap that stores its elements by value, ordered by a [`HeapOrder`].
///
/// The element at the root is one that may be the parent of every other element, so a
/// [`MinOrder`] makes this a min-heap and a [`MaxOrder`](crate::MaxOrder) a max-heap.
///
/// It is a logic error for an element or the order to be modified in such a way that
/// the element's ordering relative to any other element changes while it is in the
/// heap. The behavior resulting from such a logic error is not specified, but will be
/// encapsulated to the `BinaryHeap` that observed the logic error and not result in
/// undefined behavior.
///
/// The backing store holds `capacity + 1` slots, grows by the heap's [`GrowthPolicy`]
/// only when an insertion finds it full, and never shrinks.
///
/// # Time complexity
///
/// | [insert] | [delete]      | [delete_root] | [peek_root] |
/// |----------|---------------|---------------|-------------|
/// | *O*(log(*n*)) | *O*(log(*n*)) | *O*(log(*n*)) | *O*(1) |
///
/// [insert]: BinaryHeap::insert
/// [delete]: BinaryHeap::delete
/// [delete_root]: BinaryHeap::delete_root
/// [peek_root]: BinaryHeap::peek_root
pub struct BinaryHeap<T, O = MinOrder<T>, A: Allocator = Global> {
    buf: RawStore<T, A>,
    len: usize,
    growth: GrowthPolicy,
    order: O,
}

impl<T, O: HeapOrder<T>> BinaryHeap<T, O> {
    /// Creates an empty heap with room for a single element that doubles whenever full.
    ///
    /// # Panics
    ///
    /// Aborts (via [`handle_alloc_error`](alloc::alloc::handle_alloc_error)) if the
    /// initial allocation fails.
    #[must_use]
    pub fn new(order: O) -> Self {
        Self::with_capacity(order, 1)
    }

    /// Creates an empty heap with room for `capacity` elements that doubles whenever full.
    ///
    /// # Panics
    ///
    /// Panics if the slot array would exceed `isize::MAX` bytes, and aborts if the
    /// allocation fails.
    #[must_use]
    pub fn with_capacity(order: O, capacity: usize) -> Self {
        Self::try_with_growth(order, capacity, GrowthPolicy::DOUBLING)
            .unwrap_or_else(|e| handle_error(e))
    }

    /// Creates an empty heap with room for `capacity` elements that grows by `growth`.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot array cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use binheap::{BinaryHeap, GrowthPolicy, MaxOrder};
    ///
    /// let growth = GrowthPolicy::new(0, 0, 10);
    /// let heap = BinaryHeap::<u32, _>::try_with_growth(MaxOrder::new(), 10, growth)?;
    /// assert_eq!(heap.capacity(), 10);
    /// assert!(heap.is_empty());
    /// # Ok::<(), binheap::TryReserveError>(())
    /// ```
    pub fn try_with_growth(
        order: O,
        capacity: usize,
        growth: GrowthPolicy,
    ) -> Result<Self, TryReserveError> {
        Self::try_with_growth_in(order, capacity, growth, Global)
    }
}

impl<T, O: HeapOrder<T>, A: Allocator> BinaryHeap<T, O, A> {
    /// Like [`try_with_growth`](BinaryHeap::try_with_growth), but with the slot array
    /// allocated by `alloc`.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot array cannot be allocated.
    pub fn try_with_growth_in(
        order: O,
        capacity: usize,
        growth: GrowthPolicy,
        alloc: A,
    ) -> Result<Self, TryReserveError> {
        let buf = RawStore::try_with_capacity_in(capacity, alloc)?;
        Ok(BinaryHeap { buf, len: 0, growth, order })
    }

    /// Inserts `item` and returns the slot it settled in.
    ///
    /// If the heap is full, the backing store first grows by the heap's [`GrowthPolicy`].
    ///
    /// # Errors
    ///
    /// If growing fails, `item` is dropped and the heap is left exactly as it was.
    ///
    /// # Examples
    ///
    /// ```
    /// use binheap::{BinaryHeap, MinOrder, Slot};
    ///
    /// let mut heap = BinaryHeap::new(MinOrder::new());
    /// heap.insert(3)?;
    /// heap.insert(5)?;
    /// assert_eq!(heap.insert(1)?, Slot::ROOT);
    /// assert_eq!(heap.len(), 3);
    /// # Ok::<(), binheap::TryReserveError>(())
    /// ```
    pub fn insert(&mut self, item: T) -> Result<Slot, TryReserveError> {
        if self.len == self.buf.capacity() {
            self.buf.try_grow(&self.growth)?;
        }

        let pos = self.len;
        // SAFETY: pos < capacity, and slots at len and above are vacant.
        unsafe { self.buf.ptr().add(pos).write(item) };
        self.len += 1;

        let (data, order) = self.parts_mut();
        // SAFETY: pos == data.len() - 1
        Ok(Slot(unsafe { sift::sift_up::<_, _, Untracked>(data, pos, order) }))
    }

    /// Inserts `item` and returns the slot it settled in.
    ///
    /// # Panics
    ///
    /// Panics on capacity overflow and aborts if growing the backing store fails. Use
    /// [`insert`](Self::insert) to handle those cases instead.
    pub fn push(&mut self, item: T) -> Slot {
        self.insert(item).unwrap_or_else(|e| handle_error(e))
    }

    /// Removes and returns the element in `slot`.
    ///
    /// The last element takes over the vacated slot and is sifted towards the root or
    /// the leaves, whichever direction it disagrees with its new neighbours.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not occupied, i.e. `slot.index() >= self.len()`.
    pub fn delete(&mut self, slot: Slot) -> T {
        self.delete_at(slot.0)
    }

    /// Removes and returns the root.
    ///
    /// # Panics
    ///
    /// Panics if the heap is empty.
    pub fn delete_root(&mut self) -> T {
        assert!(!self.is_empty(), "delete_root called on an empty heap");
        self.delete_at(0)
    }

    /// Removes and returns the root, or `None` if the heap is empty.
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() { None } else { Some(self.delete_at(0)) }
    }

    fn delete_at(&mut self, pos: usize) -> T {
        assert!(pos < self.len, "slot {pos} is not occupied in a heap of length {}", self.len);
        self.len -= 1;
        // SAFETY: the first len + 1 slots are initialised, and self.len no longer counts
        //  the last of them, which `remove` vacates.
        unsafe {
            let data = slice::from_raw_parts_mut(self.buf.ptr(), self.len + 1);
            sift::remove::<_, _, Untracked>(data, pos, &self.order)
        }
    }

    fn parts_mut(&mut self) -> (&mut [T], &O) {
        // SAFETY: the first len slots are initialised.
        (unsafe { slice::from_raw_parts_mut(self.buf.ptr(), self.len) }, &self.order)
    }
}

impl<T, O, A: Allocator> BinaryHeap<T, O, A> {
    /// Returns the root.
    ///
    /// # Panics
    ///
    /// Panics if the heap is empty.
    #[must_use]
    pub fn peek_root(&self) -> &T {
        assert!(!self.is_empty(), "peek_root called on an empty heap");
        &self.as_slice()[0]
    }

    /// Returns the root, or `None` if the heap is empty.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.as_slice().first()
    }

    /// Returns the element in `slot`, or `None` if the slot is not occupied.
    #[must_use]
    pub fn get(&self, slot: Slot) -> Option<&T> {
        self.as_slice().get(slot.0)
    }

    /// Resolves a reference to one of this heap's elements into the slot that holds it.
    ///
    /// # Panics
    ///
    /// Panics if `item` does not point at an occupied slot of this heap, or if `T` is
    /// zero-sized (all such elements share one address).
    ///
    /// # Examples
    ///
    /// ```
    /// use binheap::{BinaryHeap, MinOrder, Slot};
    ///
    /// let mut heap = BinaryHeap::new(MinOrder::new());
    /// for x in [4, 8, 2, 6] {
    ///     heap.push(x);
    /// }
    /// assert_eq!(heap.slot_of(heap.peek_root()), Slot::ROOT);
    ///
    /// let slot = heap.slot_of(heap.iter().find(|&&x| x == 6).unwrap());
    /// assert_eq!(heap.delete(slot), 6);
    /// ```
    #[must_use]
    pub fn slot_of(&self, item: &T) -> Slot {
        let size = mem::size_of::<T>();
        assert!(size != 0, "zero-sized elements cannot be resolved by address");

        let base = self.buf.ptr() as usize;
        let addr = ptr::addr_of!(*item) as usize;
        assert!(addr >= base, "element does not belong to this heap");

        let offset = addr - base;
        assert!(offset % size == 0, "element address is misaligned within this heap");

        let index = offset / size;
        assert!(index < self.len, "element does not belong to this heap");
        Slot(index)
    }

    /// Returns the number of elements in the heap.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the heap holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of elements the heap can hold before it next grows.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Returns the policy by which the heap grows.
    #[must_use]
    pub fn growth(&self) -> &GrowthPolicy {
        &self.growth
    }

    /// Returns the heap's order.
    #[must_use]
    pub fn order(&self) -> &O {
        &self.order
    }

    /// Returns the allocator backing the heap.
    #[must_use]
    pub fn allocator(&self) -> &A {
        self.buf.allocator()
    }

    /// Returns the elements in slot order, which is breadth-first through the tree.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: the first len slots are initialised.
        unsafe { slice::from_raw_parts(self.buf.ptr(), self.len) }
    }

    /// Returns an iterator visiting all elements in slot order.
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Drops every element, keeping the backing store's capacity.
    pub fn clear(&mut self) {
        let elems: *mut [T] = ptr::slice_from_raw_parts_mut(self.buf.ptr(), self.len);
        // Forget the elements first, so a panicking destructor leaks rather than
        // double-drops.
        self.len = 0;
        // SAFETY: the slots were initialised and are no longer counted.
        unsafe { ptr::drop_in_place(elems) };
    }
}

impl<T, O, A: Allocator> Drop for BinaryHeap<T, O, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: fmt::Debug, O, A: Allocator> fmt::Debug for BinaryHeap<T, O, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T, O, A: Allocator> IntoIterator for &'a BinaryHeap<T, O, A> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> slice::Iter<'a, T> {
        self.iter()
    }
}
