//! A priority queue of caller-owned elements that can be deleted through stable handles.
//!
//! Each element lives in a *capsule*: an ordinary struct of the caller's, borrowed by
//! the heap for its whole lifetime, that embeds a [`HeapEntry`]. The heap stores only
//! pointers to those entries and writes every entry's current slot back into it as
//! elements move, so an [`EntryRef`] keeps naming the same element however the heap is
//! reshuffled. The capsule is recovered from its entry by subtracting the entry
//! field's offset, which [`impl_capsule!`](crate::impl_capsule) computes at compile
//! time.
//!
//! # Examples
//!
//! ```
//! use binheap::{impl_capsule, HeapEntry, IntrusiveHeap};
//! use std::cell::Cell;
//!
//! struct Timer {
//!     deadline: Cell<u64>,
//!     entry: HeapEntry,
//! }
//!
//! impl_capsule!(Timer, entry);
//!
//! impl Timer {
//!     fn new(deadline: u64) -> Self {
//!         Timer { deadline: Cell::new(deadline), entry: HeapEntry::new() }
//!     }
//! }
//!
//! let (a, b, c) = (Timer::new(30), Timer::new(10), Timer::new(20));
//! let mut timers = IntrusiveHeap::new(|p: &Timer, c: &Timer| p.deadline <= c.deadline);
//!
//! let a_ref = timers.push(&a);
//! timers.push(&b);
//! timers.push(&c);
//! assert!(a.entry.is_linked());
//!
//! // Handles follow their element, so `a` can be rescheduled or cancelled at any time.
//! a.deadline.set(5);
//! timers.update(a_ref);
//! assert_eq!(timers.peek().map(|t| t.deadline.get()), Some(5));
//!
//! let cancelled = timers.delete(a_ref);
//! assert!(std::ptr::eq(cancelled, &a));
//! assert!(!a.entry.is_linked());
//! assert_eq!(timers.pop().map(|t| t.deadline.get()), Some(10));
//! ```

use core::cell::Cell;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::ptr::NonNull;
use core::slice;

use crate::error::{handle_error, TryReserveError};
use crate::raw::RawStore;
use crate::sift::{self, Placement};
use crate::{Allocator, Global, GrowthPolicy, HeapOrder, MinOrder};

#[cfg(test)]
mod tests;

const DETACHED: usize = usize::MAX;

/// The field a capsule embeds to take part in an [`IntrusiveHeap`].
///
/// It holds the slot its capsule occupies while linked into a heap, and a sentinel
/// otherwise. The heap maintains it; callers only read it.
pub struct HeapEntry {
    idx: Cell<usize>,
}

impl HeapEntry {
    /// Creates an entry that is not linked into any heap.
    #[must_use]
    pub const fn new() -> Self {
        HeapEntry { idx: Cell::new(DETACHED) }
    }

    /// Returns the slot this entry occupies, or `None` if it is not linked.
    #[inline]
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self.idx.get() {
            DETACHED => None,
            idx => Some(idx),
        }
    }

    /// Returns `true` if the entry is linked into a heap.
    #[inline]
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.idx.get() != DETACHED
    }
}

impl Default for HeapEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HeapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapEntry").field("index", &self.index()).finish()
    }
}

/// A type that embeds a [`HeapEntry`] and can therefore be linked into an
/// [`IntrusiveHeap`].
///
/// Implement it with [`impl_capsule!`](crate::impl_capsule) rather than by hand.
///
/// # Safety
///
/// `ENTRY_OFFSET` must be the byte offset of a field of type `HeapEntry` within `Self`.
pub unsafe trait Capsule {
    /// Byte offset of the embedded [`HeapEntry`].
    const ENTRY_OFFSET: usize;

    /// Returns the embedded entry.
    #[inline]
    fn heap_entry(&self) -> &HeapEntry {
        // SAFETY: guaranteed by the implementor.
        unsafe { &*(self as *const Self).cast::<u8>().add(Self::ENTRY_OFFSET).cast::<HeapEntry>() }
    }
}

/// Implements [`Capsule`] for a struct from the name of its [`HeapEntry`] field.
///
/// ```
/// use binheap::{impl_capsule, Capsule, HeapEntry};
///
/// struct Task {
///     priority: u8,
///     link: HeapEntry,
/// }
///
/// impl_capsule!(Task, link);
///
/// let task = Task { priority: 3, link: HeapEntry::new() };
/// assert!(std::ptr::eq(task.heap_entry(), &task.link));
/// ```
///
/// The field must be a `HeapEntry`:
///
/// ```compile_fail
/// use binheap::impl_capsule;
///
/// struct Task {
///     priority: u8,
/// }
///
/// impl_capsule!(Task, priority);
/// ```
#[macro_export]
macro_rules! impl_capsule {
    ($capsule:ty, $field:ident) => {
        // SAFETY: the field is checked to be a `HeapEntry` below.
        unsafe impl $crate::Capsule for $capsule {
            const ENTRY_OFFSET: usize = ::core::mem::offset_of!($capsule, $field);
        }

        const _: () = {
            #[allow(dead_code)]
            fn entry_field_is_a_heap_entry(capsule: &$capsule) -> &$crate::HeapEntry {
                &capsule.$field
            }
        };
    };
}

/// Recovers a pointer to the capsule of type `$capsule` whose field `$field` is the
/// [`HeapEntry`] at `$ptr`.
///
/// The arithmetic itself is safe; dereferencing the result is only sound if `$ptr` really
/// points into such a capsule and carries its provenance, as pointers handed out by
/// [`EntryRef::as_ptr`] do.
///
/// ```
/// use binheap::{capsule_of, impl_capsule, EntryRef, HeapEntry};
///
/// struct Task {
///     priority: u8,
///     link: HeapEntry,
/// }
///
/// impl_capsule!(Task, link);
///
/// let task = Task { priority: 3, link: HeapEntry::new() };
/// let entry = EntryRef::of(&task).as_ptr();
/// let task_ptr = capsule_of!(entry.as_ptr(), Task, link);
/// assert_eq!(unsafe { (*task_ptr).priority }, 3);
/// ```
#[macro_export]
macro_rules! capsule_of {
    ($ptr:expr, $capsule:ty, $field:ident) => {{
        let entry: *const $crate::HeapEntry = $ptr;
        entry
            .cast::<u8>()
            .wrapping_sub(::core::mem::offset_of!($capsule, $field))
            .cast::<$capsule>()
            .cast_mut()
    }};
}

/// Recovers the capsule embedding `entry`.
///
/// # Safety
///
/// `entry` must point at the [`HeapEntry`] of a live `C`, with provenance over the
/// whole capsule.
#[inline]
pub unsafe fn capsule_of<C: Capsule>(entry: NonNull<HeapEntry>) -> NonNull<C> {
    // SAFETY: the capsule starts `ENTRY_OFFSET` bytes before its entry.
    unsafe { NonNull::new_unchecked(entry.as_ptr().cast::<u8>().sub(C::ENTRY_OFFSET).cast()) }
}

/// A handle to a capsule borrowed for `'a`, addressed through its [`HeapEntry`].
///
/// This is what an [`IntrusiveHeap`] stores. Unlike a [`Slot`](crate::Slot) it names an
/// element rather than a position, so it stays valid across any number of insertions
/// and deletions.
pub struct EntryRef<'a, C: Capsule> {
    ptr: NonNull<HeapEntry>,
    _marker: PhantomData<&'a C>,
}

impl<'a, C: Capsule> EntryRef<'a, C> {
    /// Returns the handle of `capsule`.
    #[inline]
    #[must_use]
    pub fn of(capsule: &'a C) -> Self {
        let base = NonNull::from(capsule).cast::<u8>();
        // SAFETY: the entry lies within the capsule, so the offset pointer is in bounds
        //  and non-null.
        let ptr = unsafe { NonNull::new_unchecked(base.as_ptr().add(C::ENTRY_OFFSET)).cast() };
        EntryRef { ptr, _marker: PhantomData }
    }

    /// Returns the capsule this handle refers to.
    #[inline]
    #[must_use]
    pub fn capsule(self) -> &'a C {
        // SAFETY: `ptr` was derived from a `&'a C` in `of`.
        unsafe { capsule_of::<C>(self.ptr).as_ref() }
    }

    /// Returns the capsule's entry.
    #[inline]
    #[must_use]
    pub fn entry(self) -> &'a HeapEntry {
        // SAFETY: as above.
        unsafe { self.ptr.as_ref() }
    }

    /// Returns the slot the capsule occupies, or `None` if it is not linked.
    #[inline]
    #[must_use]
    pub fn index(self) -> Option<usize> {
        self.entry().index()
    }

    /// Returns a pointer to the capsule's entry, valid for reads for `'a` and carrying
    /// the provenance of the whole capsule.
    #[inline]
    #[must_use]
    pub fn as_ptr(self) -> NonNull<HeapEntry> {
        self.ptr
    }
}

impl<C: Capsule> Clone for EntryRef<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: Capsule> Copy for EntryRef<'_, C> {}

impl<C: Capsule> PartialEq for EntryRef<'_, C> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<C: Capsule> Eq for EntryRef<'_, C> {}

impl<C: Capsule> Hash for EntryRef<'_, C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ptr.hash(state);
    }
}

impl<C: Capsule> fmt::Debug for EntryRef<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntryRef").field(&self.ptr).finish()
    }
}

/// Writes each entry's new slot into it.
enum Linked {}

impl<C: Capsule> Placement<EntryRef<'_, C>> for Linked {
    #[inline(always)]
    fn placed(elt: &EntryRef<'_, C>, pos: usize) {
        elt.entry().idx.set(pos);
    }
}

/// Orders entries by their capsules.
struct ByCapsule<'o, O>(&'o O);

impl<C: Capsule, O: HeapOrder<C>> HeapOrder<EntryRef<'_, C>> for ByCapsule<'_, O> {
    #[inline]
    fn cmp_ok(&self, parent: &EntryRef<'_, C>, child: &EntryRef<'_, C>) -> bool {
        self.0.cmp_ok(parent.capsule(), child.capsule())
    }
}

/// A binary heap of capsules borrowed for `'a`, ordered by a [`HeapOrder`] over the
/// capsules.
///
/// The heap never owns its elements: it links and unlinks them. A capsule may be linked
/// into at most one heap at a time, and every capsule still linked when the heap is
/// cleared or dropped is unlinked again.
///
/// Capsules are shared with the caller, so any mutable priority has to live in a
/// [`Cell`] or similar. Changing it while the capsule is linked is a logic error unless
/// [`update`](IntrusiveHeap::update) is called straight afterwards; the heap stays
/// memory-safe either way.
///
/// Growth follows the heap's [`GrowthPolicy`] exactly as for a
/// [`BinaryHeap`](crate::BinaryHeap).
pub struct IntrusiveHeap<'a, C: Capsule, O = MinOrder<C>, A: Allocator = Global> {
    buf: RawStore<EntryRef<'a, C>, A>,
    len: usize,
    growth: GrowthPolicy,
    order: O,
}

impl<'a, C: Capsule, O: HeapOrder<C>> IntrusiveHeap<'a, C, O> {
    /// Creates an empty heap with room for a single capsule that doubles whenever full.
    ///
    /// # Panics
    ///
    /// Aborts if the initial allocation fails.
    #[must_use]
    pub fn new(order: O) -> Self {
        Self::with_capacity(order, 1)
    }

    /// Creates an empty heap with room for `capacity` capsules that doubles whenever
    /// full.
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

    /// Creates an empty heap with room for `capacity` capsules that grows by `growth`.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot array cannot be allocated.
    pub fn try_with_growth(
        order: O,
        capacity: usize,
        growth: GrowthPolicy,
    ) -> Result<Self, TryReserveError> {
        Self::try_with_growth_in(order, capacity, growth, Global)
    }
}

impl<'a, C: Capsule, O: HeapOrder<C>, A: Allocator> IntrusiveHeap<'a, C, O, A> {
    /// Like [`try_with_growth`](IntrusiveHeap::try_with_growth), but with the slot array
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
        Ok(IntrusiveHeap { buf, len: 0, growth, order })
    }

    /// Links `capsule` into the heap and returns its handle.
    ///
    /// # Errors
    ///
    /// If the heap is full and growing it fails, the capsule is left unlinked and the
    /// heap exactly as it was.
    ///
    /// # Panics
    ///
    /// Panics if the capsule is already linked into a heap.
    pub fn insert(&mut self, capsule: &'a C) -> Result<EntryRef<'a, C>, TryReserveError> {
        let entry = EntryRef::of(capsule);
        assert!(!entry.entry().is_linked(), "capsule is already linked into a heap");

        if self.len == self.buf.capacity() {
            self.buf.try_grow(&self.growth)?;
        }

        let pos = self.len;
        // SAFETY: pos < capacity, and slots at len and above are vacant.
        unsafe { self.buf.ptr().add(pos).write(entry) };
        self.len += 1;

        // SAFETY: the first len slots are initialised, and pos == len - 1.
        unsafe {
            let data = slice::from_raw_parts_mut(self.buf.ptr(), self.len);
            sift::sift_up::<_, _, Linked>(data, pos, &ByCapsule(&self.order));
        }
        Ok(entry)
    }

    /// Links `capsule` into the heap and returns its handle.
    ///
    /// # Panics
    ///
    /// Panics if the capsule is already linked, on capacity overflow, and aborts if
    /// growing the backing store fails.
    pub fn push(&mut self, capsule: &'a C) -> EntryRef<'a, C> {
        self.insert(capsule).unwrap_or_else(|e| handle_error(e))
    }

    /// Unlinks the capsule behind `entry` and returns it.
    ///
    /// # Panics
    ///
    /// Panics if the capsule is not linked into this heap.
    pub fn delete(&mut self, entry: EntryRef<'a, C>) -> &'a C {
        let pos = self.resolve(entry);
        self.delete_at(pos)
    }

    /// Unlinks the root and returns it.
    ///
    /// # Panics
    ///
    /// Panics if the heap is empty.
    pub fn delete_root(&mut self) -> &'a C {
        assert!(!self.is_empty(), "delete_root called on an empty heap");
        self.delete_at(0)
    }

    /// Unlinks the root and returns it, or `None` if the heap is empty.
    pub fn pop(&mut self) -> Option<&'a C> {
        if self.is_empty() { None } else { Some(self.delete_at(0)) }
    }

    /// Restores the heap order around the capsule behind `entry` after its priority
    /// changed, in either direction.
    ///
    /// # Panics
    ///
    /// Panics if the capsule is not linked into this heap.
    pub fn update(&mut self, entry: EntryRef<'a, C>) {
        let pos = self.resolve(entry);
        // SAFETY: the first len slots are initialised, and pos < len.
        unsafe {
            let data = slice::from_raw_parts_mut(self.buf.ptr(), self.len);
            sift::repair::<_, _, Linked>(data, pos, &ByCapsule(&self.order));
        }
    }

    fn delete_at(&mut self, pos: usize) -> &'a C {
        debug_assert!(pos < self.len);
        self.len -= 1;
        // SAFETY: the first len + 1 slots are initialised, and self.len no longer counts
        //  the last of them, which `remove` vacates.
        let removed = unsafe {
            let data = slice::from_raw_parts_mut(self.buf.ptr(), self.len + 1);
            data[pos].entry().idx.set(DETACHED);
            sift::remove::<_, _, Linked>(data, pos, &ByCapsule(&self.order))
        };
        removed.capsule()
    }
}

impl<'a, C: Capsule, O, A: Allocator> IntrusiveHeap<'a, C, O, A> {
    /// Returns the slot holding `entry`, which must be linked into this heap.
    fn resolve(&self, entry: EntryRef<'a, C>) -> usize {
        let pos = entry.entry().idx.get();
        assert!(
            self.as_slice().get(pos) == Some(&entry),
            "capsule is not linked into this heap"
        );
        pos
    }

    /// Returns the root's handle.
    ///
    /// # Panics
    ///
    /// Panics if the heap is empty.
    #[must_use]
    pub fn peek_root(&self) -> EntryRef<'a, C> {
        assert!(!self.is_empty(), "peek_root called on an empty heap");
        self.as_slice()[0]
    }

    /// Returns the root, or `None` if the heap is empty.
    #[must_use]
    pub fn peek(&self) -> Option<&'a C> {
        self.as_slice().first().map(|entry| entry.capsule())
    }

    /// Returns `true` if `capsule` is linked into this heap.
    #[must_use]
    pub fn contains(&self, capsule: &C) -> bool {
        let entry = capsule.heap_entry();
        entry
            .index()
            .and_then(|pos| self.as_slice().get(pos))
            .is_some_and(|slot| core::ptr::eq(slot.entry(), entry))
    }

    /// Returns the number of linked capsules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no capsule is linked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of capsules the heap can hold before it next grows.
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

    /// Returns the handles in slot order.
    #[must_use]
    pub fn as_slice(&self) -> &[EntryRef<'a, C>] {
        // SAFETY: the first len slots are initialised.
        unsafe { slice::from_raw_parts(self.buf.ptr(), self.len) }
    }

    /// Returns an iterator visiting all linked capsules in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &'a C> + '_ {
        self.as_slice().iter().map(|entry| entry.capsule())
    }

    /// Unlinks every capsule, keeping the backing store's capacity.
    pub fn clear(&mut self) {
        for entry in self.as_slice() {
            entry.entry().idx.set(DETACHED);
        }
        self.len = 0;
    }
}

impl<C: Capsule, O, A: Allocator> Drop for IntrusiveHeap<'_, C, O, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<C: Capsule + fmt::Debug, O, A: Allocator> fmt::Debug for IntrusiveHeap<'_, C, O, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
