//! The contiguous slot array shared by both heap variants.

use core::alloc::Layout;
use core::marker::PhantomData;
use core::ptr::NonNull;

use crate::error::{TryReserveError, TryReserveErrorKind::*};
use crate::{Allocator, Global, GrowthPolicy};

/// An allocation of `capacity + 1` slots of `T`.
///
/// The spare slot keeps the layout non-empty for a zero capacity. `RawStore` never reads,
/// writes or drops the slots; its owner tracks which of them are initialised.
pub(crate) struct RawStore<T, A: Allocator = Global> {
    ptr: NonNull<T>,
    cap: usize,
    alloc: A,
    _marker: PhantomData<T>,
}

// SAFETY: `RawStore` owns its slots exactly as a `Vec<T, A>` would.
unsafe impl<T: Send, A: Allocator + Send> Send for RawStore<T, A> {}
// SAFETY: as above.
unsafe impl<T: Sync, A: Allocator + Sync> Sync for RawStore<T, A> {}

#[inline]
fn slots_layout<T>(capacity: usize) -> Result<Layout, TryReserveError> {
    let slots = capacity.checked_add(1).ok_or(CapacityOverflow)?;
    Ok(Layout::array::<T>(slots).map_err(crate::TryReserveErrorKind::from)?)
}

impl<T, A: Allocator> RawStore<T, A> {
    pub(crate) fn try_with_capacity_in(capacity: usize, alloc: A) -> Result<Self, TryReserveError> {
        let layout = slots_layout::<T>(capacity)?;
        let ptr = alloc.allocate(layout).map_err(|_| AllocError { layout })?;
        Ok(RawStore { ptr: ptr.cast(), cap: capacity, alloc, _marker: PhantomData })
    }

    /// The number of slots the owner may fill before it must call [`try_grow`](Self::try_grow).
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.cap
    }

    #[inline]
    pub(crate) fn ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    #[inline]
    pub(crate) fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Moves the slots into an allocation sized by `growth`, preserving their contents.
    ///
    /// On error nothing changes: the old allocation and capacity stay in place.
    pub(crate) fn try_grow(&mut self, growth: &GrowthPolicy) -> Result<(), TryReserveError> {
        let new_cap = growth.next_capacity(self.cap).ok_or(CapacityOverflow)?;
        let new_layout = slots_layout::<T>(new_cap)?;
        let old_layout = slots_layout::<T>(self.cap)?;

        // SAFETY: `self.ptr` was allocated by `self.alloc` with `old_layout`, and the new
        //  layout is at least as large since `new_cap > self.cap`.
        let ptr = unsafe { self.alloc.grow(self.ptr.cast(), old_layout, new_layout) }
            .map_err(|_| AllocError { layout: new_layout })?;

        self.ptr = ptr.cast();
        self.cap = new_cap;
        Ok(())
    }
}

impl<T, A: Allocator> Drop for RawStore<T, A> {
    fn drop(&mut self) {
        // The layout was valid when the slots were allocated, so this always matches.
        if let Ok(layout) = slots_layout::<T>(self.cap) {
            // SAFETY: the slots were allocated by `self.alloc` with exactly this layout.
            unsafe { self.alloc.deallocate(self.ptr.cast(), layout) }
        }
    }
}
