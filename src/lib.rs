//! Array-backed binary heaps that order their elements by a caller-supplied comparator
//! rather than the [`Ord`] trait, and that can delete an arbitrary element given a handle.
//!
//! Two variants are provided:
//!
//! * [`BinaryHeap`] stores its elements by value. Insertion hands back a [`Slot`] naming
//!   the array position the element ended up in, which can later be passed to
//!   [`BinaryHeap::delete`].
//! * [`IntrusiveHeap`] stores pointers to [`HeapEntry`] fields embedded in caller-owned
//!   structs (*capsules*). The heap keeps each entry's position up to date, so an
//!   [`EntryRef`] stays valid however much the heap is reshuffled, and the capsule is
//!   recovered from its entry through a compile-time field offset.
//!
//! Both variants grow their backing store according to a [`GrowthPolicy`] and never
//! shrink it. Allocation failure is reported as a [`TryReserveError`] and leaves the
//! heap untouched.
//!
//! # Example
//!
//! ```
//! use binheap::{BinaryHeap, GrowthPolicy, MinOrder};
//!
//! let mut heap = BinaryHeap::try_with_growth(MinOrder::default(), 4, GrowthPolicy::DOUBLING)?;
//! for x in [26, 35, 12, 20, 5] {
//!     heap.insert(x)?;
//! }
//! assert_eq!(heap.capacity(), 8);
//! assert_eq!(*heap.peek_root(), 5);
//!
//! let slot = heap.slot_of(heap.iter().find(|&&x| x == 20).unwrap());
//! assert_eq!(heap.delete(slot), 20);
//! assert_eq!(heap.delete_root(), 5);
//! assert_eq!(heap.delete_root(), 12);
//! # Ok::<(), binheap::TryReserveError>(())
//! ```
#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![cfg_attr(feature = "allocator_api", feature(allocator_api))]
#![cfg_attr(feature = "error_in_core", feature(error_in_core))]
// documentation controls
#![cfg_attr(docsrs, feature(doc_auto_cfg, doc_cfg))]

extern crate alloc;

mod polyfill;

mod default;
mod error;
mod growth;
mod raw;
mod sift;

pub mod binary_heap;
pub mod intrusive;

pub use binary_heap::{BinaryHeap, Slot};
pub use default::{MaxOrder, MinOrder};
pub use error::{TryReserveError, TryReserveErrorKind};
pub use growth::GrowthPolicy;
pub use intrusive::{Capsule, EntryRef, HeapEntry, IntrusiveHeap};
pub use polyfill::{AllocError, Allocator, Global};

/// A comparator that decides whether two elements may stand in a parent/child
/// relationship within a heap.
///
/// `cmp_ok(parent, child)` must return `true` iff `parent` is allowed to sit above
/// `child`: for a min-heap that is `parent <= child`, for a max-heap `parent >= child`.
/// The comparator must describe a total preorder and behave the same on every call for
/// the lifetime of the heap that stores it. A comparator that violates this leaves the
/// heap in an unspecified (but memory-safe) order; heaps never re-validate themselves.
///
/// Any `Fn(&T, &T) -> bool` is a `HeapOrder<T>`, and [`MinOrder`] / [`MaxOrder`] delegate
/// to [`Ord`].
pub trait HeapOrder<T: ?Sized> {
    /// Returns `true` if `parent` and `child` are in correct parent/child order.
    fn cmp_ok(&self, parent: &T, child: &T) -> bool;
}

impl<T: ?Sized, F> HeapOrder<T> for F
where
    F: Fn(&T, &T) -> bool,
{
    #[inline]
    fn cmp_ok(&self, parent: &T, child: &T) -> bool {
        self(parent, child)
    }
}

#[cfg(test)]
mod testing;
