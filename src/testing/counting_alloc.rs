use core::alloc::Layout;
use core::cell::Cell;
use core::ptr::NonNull;

use crate::{AllocError, Allocator, Global};

/// An allocator that counts what passes through it and refuses to allocate once its
/// budget of allocations is spent.
///
/// Growth goes through the default `grow`, i.e. one `allocate` plus one `deallocate`,
/// so every reallocation shows up as one more allocation.
#[derive(Debug)]
pub(crate) struct CountingAlloc {
    budget: Cell<Option<usize>>,
    allocations: Cell<usize>,
    live_bytes: Cell<usize>,
}

impl CountingAlloc {
    pub(crate) fn unlimited() -> Self {
        CountingAlloc {
            budget: Cell::new(None),
            allocations: Cell::new(0),
            live_bytes: Cell::new(0),
        }
    }

    pub(crate) fn with_budget(budget: usize) -> Self {
        let alloc = Self::unlimited();
        alloc.budget.set(Some(budget));
        alloc
    }

    /// Allows `budget` more allocations, or any number with `None`.
    pub(crate) fn set_budget(&self, budget: Option<usize>) {
        self.budget.set(budget);
    }

    /// Successful allocations so far.
    pub(crate) fn allocations(&self) -> usize {
        self.allocations.get()
    }

    pub(crate) fn live_bytes(&self) -> usize {
        self.live_bytes.get()
    }
}

unsafe impl Allocator for CountingAlloc {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        match self.budget.get() {
            Some(0) => return Err(AllocError),
            Some(n) => self.budget.set(Some(n - 1)),
            None => {}
        }
        let ptr = Global.allocate(layout)?;
        self.allocations.set(self.allocations.get() + 1);
        self.live_bytes.set(self.live_bytes.get() + layout.size());
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.live_bytes.set(self.live_bytes.get() - layout.size());
        unsafe { Global.deallocate(ptr, layout) }
    }
}
