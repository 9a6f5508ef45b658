//! Invariant repair for an array-encoded complete binary tree.
//!
//! The slot at `i` has its parent at `(i - 1) >> 1` and its children at `2i + 1` and
//! `2i + 2`. Every function here works on a slice holding exactly the live elements
//! of a heap, and is generic over a [`Placement`] hook so that heaps whose elements
//! track their own position learn about every slot write.

use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ptr;

use crate::HeapOrder;

#[inline(always)]
pub(crate) const fn parent(pos: usize) -> usize {
    (pos - 1) >> 1
}

/// `None` once the index leaves `usize`, which only zero-sized elements can reach.
#[inline(always)]
pub(crate) fn left(pos: usize) -> Option<usize> {
    pos.checked_mul(2)?.checked_add(1)
}

/// Notified whenever an element is written into slot `pos`.
pub(crate) trait Placement<T> {
    fn placed(elt: &T, pos: usize);
}

/// For elements that do not know where they live.
pub(crate) enum Untracked {}

impl<T> Placement<T> for Untracked {
    #[inline(always)]
    fn placed(_: &T, _: usize) {}
}

// The sift functions move an element out of the slice (leaving behind a hole), shift
// along the others and move the removed element back into the slice at the final
// location of the hole. The `Hole` type is used to represent this, and makes sure the
// hole is filled back at the end of its scope, even if the order panics.
// Using a hole reduces the constant factor compared to using swaps, which involves
// twice as many moves.

/// Hole represents a hole in a slice i.e., an index without valid value
/// (because it was moved from or duplicated).
/// In drop, `Hole` will restore the slice by filling the hole
/// position with the value that was originally removed.
struct Hole<'a, T: 'a, P: Placement<T>> {
    data: &'a mut [T],
    elt: ManuallyDrop<T>,
    pos: usize,
    _placement: PhantomData<P>,
}

impl<'a, T, P: Placement<T>> Hole<'a, T, P> {
    /// Create a new `Hole` at index `pos`.
    ///
    /// Unsafe because pos must be within the data slice.
    #[inline]
    unsafe fn new(data: &'a mut [T], pos: usize) -> Self {
        debug_assert!(pos < data.len());
        // SAFE: pos should be inside the slice
        let elt = unsafe { ptr::read(data.get_unchecked(pos)) };
        Hole { data, elt: ManuallyDrop::new(elt), pos, _placement: PhantomData }
    }

    #[inline]
    fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns a reference to the element removed.
    #[inline]
    fn element(&self) -> &T {
        &self.elt
    }

    /// Returns a reference to the element at `index`.
    ///
    /// Unsafe because index must be within the data slice and not equal to pos.
    #[inline]
    unsafe fn get(&self, index: usize) -> &T {
        debug_assert!(index != self.pos);
        debug_assert!(index < self.data.len());
        unsafe { self.data.get_unchecked(index) }
    }

    /// Move hole to new location, reporting the displaced element's new slot.
    ///
    /// Unsafe because index must be within the data slice and not equal to pos.
    #[inline]
    unsafe fn move_to(&mut self, index: usize) {
        debug_assert!(index != self.pos);
        debug_assert!(index < self.data.len());
        unsafe {
            let ptr = self.data.as_mut_ptr();
            let index_ptr: *const _ = ptr.add(index);
            let hole_ptr = ptr.add(self.pos);
            ptr::copy_nonoverlapping(index_ptr, hole_ptr, 1);
            P::placed(&*hole_ptr, self.pos);
        }
        self.pos = index;
    }
}

impl<T, P: Placement<T>> Drop for Hole<'_, T, P> {
    #[inline]
    fn drop(&mut self) {
        // fill the hole again
        unsafe {
            let pos = self.pos;
            let slot = self.data.get_unchecked_mut(pos);
            ptr::copy_nonoverlapping(&*self.elt, slot, 1);
            P::placed(slot, pos);
        }
    }
}

/// Moves the element at `pos` towards the root until its parent may sit above it.
/// Returns the element's final slot.
///
/// # Safety
///
/// The caller must guarantee that `pos < data.len()`.
pub(crate) unsafe fn sift_up<T, O, P>(data: &mut [T], pos: usize, order: &O) -> usize
where
    O: HeapOrder<T> + ?Sized,
    P: Placement<T>,
{
    // SAFETY: The caller guarantees that pos < data.len()
    let mut hole = unsafe { Hole::<T, P>::new(data, pos) };

    while hole.pos() > 0 {
        let parent = parent(hole.pos());

        // SAFETY: hole.pos() > 0, so parent < hole.pos() is a valid index
        //  and != hole.pos().
        if order.cmp_ok(unsafe { hole.get(parent) }, hole.element()) {
            break;
        }

        // SAFETY: Same as above
        unsafe { hole.move_to(parent) };
    }

    hole.pos()
}

/// Moves the element at `pos` towards the leaves, each time swapping it with the child
/// that may parent its sibling, until it may sit above that child. Returns the
/// element's final slot.
///
/// # Safety
///
/// The caller must guarantee that `pos < data.len()`.
pub(crate) unsafe fn sift_down<T, O, P>(data: &mut [T], pos: usize, order: &O) -> usize
where
    O: HeapOrder<T> + ?Sized,
    P: Placement<T>,
{
    // SAFETY: The caller guarantees that pos < data.len().
    let mut hole = unsafe { Hole::<T, P>::new(data, pos) };
    let len = hole.len();

    loop {
        let mut child = match left(hole.pos()) {
            Some(child) if child < len => child,
            _ => break,
        };

        // The right child wins whenever it may parent the left one.
        // SAFETY: child < child + 1 < len, and both differ from hole.pos().
        if child + 1 < len
            && order.cmp_ok(unsafe { hole.get(child + 1) }, unsafe { hole.get(child) })
        {
            child += 1;
        }

        // if we are already in order, stop.
        // SAFETY: child is either the old child or the old child + 1, both proven
        //  to be valid indexes != hole.pos().
        if order.cmp_ok(hole.element(), unsafe { hole.get(child) }) {
            break;
        }

        // SAFETY: same as above.
        unsafe { hole.move_to(child) };
    }

    hole.pos()
}

/// Restores the heap invariant after the element at `pos` was replaced, sifting in
/// whichever direction the new element disagrees with its surroundings.
///
/// # Safety
///
/// The caller must guarantee that `pos < data.len()`.
pub(crate) unsafe fn repair<T, O, P>(data: &mut [T], pos: usize, order: &O) -> usize
where
    O: HeapOrder<T> + ?Sized,
    P: Placement<T>,
{
    debug_assert!(pos < data.len());
    // SAFETY: pos > 0 implies parent(pos) < pos < data.len().
    if pos == 0 || order.cmp_ok(unsafe { data.get_unchecked(parent(pos)) }, unsafe {
        data.get_unchecked(pos)
    }) {
        // SAFETY: the caller guarantees that pos < data.len()
        unsafe { sift_down::<T, O, P>(data, pos, order) }
    } else {
        // SAFETY: as above
        unsafe { sift_up::<T, O, P>(data, pos, order) }
    }
}

/// Takes the element at `pos` out of the heap, fills its slot with the last element and
/// repairs the invariant around it.
///
/// `data` must still include the last slot, which is vacated: its contents are moved
/// (bitwise) elsewhere or returned.
///
/// # Safety
///
/// The caller must guarantee that `pos < data.len()`, and must already have shrunk its
/// own length so that it no longer counts `data[data.len() - 1]` as initialised.
pub(crate) unsafe fn remove<T, O, P>(data: &mut [T], pos: usize, order: &O) -> T
where
    O: HeapOrder<T> + ?Sized,
    P: Placement<T>,
{
    debug_assert!(pos < data.len());
    let last = data.len() - 1;

    // SAFETY: pos <= last < data.len(). After the read the slot at pos is logically
    //  empty, and it is refilled at once unless it is the vacated last slot.
    let removed = unsafe { ptr::read(data.get_unchecked(pos)) };
    if pos != last {
        let data = unsafe {
            let base = data.as_mut_ptr();
            ptr::copy_nonoverlapping(base.add(last), base.add(pos), 1);
            data.get_unchecked_mut(..last)
        };
        P::placed(&data[pos], pos);
        // SAFETY: pos < last == data.len()
        unsafe { repair::<T, O, P>(data, pos, order) };
    }
    removed
}
