#![allow(unused_imports)]

mod definitions {
    use cfg_if::cfg_if;

    cfg_if! {
        if #[cfg(feature = "allocator_api")] {
            pub use alloc::alloc::{AllocError, Allocator, Global};
        } else {
            use core::alloc::Layout;
            use core::fmt;
            use core::ptr::{self, NonNull};

            /// The error returned when an [`Allocator`] cannot satisfy a request.
            #[derive(Copy, Clone, PartialEq, Eq, Debug)]
            pub struct AllocError;

            impl fmt::Display for AllocError {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str("memory allocation failed")
                }
            }

            /// A stable stand-in for the standard library's `Allocator` trait, with the same
            /// method signatures so that implementations carry over to the `allocator_api`
            /// feature unchanged.
            ///
            /// # Safety
            ///
            /// Blocks returned by `allocate` and `grow` must be valid for the requested layout
            /// and remain valid until passed to `deallocate` (or `grow`) on the same allocator.
            pub unsafe trait Allocator {
                fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError>;

                /// # Safety
                ///
                /// `ptr` must denote a block currently allocated by this allocator with `layout`.
                unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

                /// # Safety
                ///
                /// `ptr` must denote a block currently allocated by this allocator with
                /// `old_layout`, and `new_layout.size() >= old_layout.size()`.
                unsafe fn grow(
                    &self,
                    ptr: NonNull<u8>,
                    old_layout: Layout,
                    new_layout: Layout,
                ) -> Result<NonNull<[u8]>, AllocError> {
                    debug_assert!(new_layout.size() >= old_layout.size());
                    let new_ptr = self.allocate(new_layout)?;
                    unsafe {
                        ptr::copy_nonoverlapping(
                            ptr.as_ptr(),
                            new_ptr.cast::<u8>().as_ptr(),
                            old_layout.size(),
                        );
                        self.deallocate(ptr, old_layout);
                    }
                    Ok(new_ptr)
                }
            }

            /// The global memory allocator.
            #[derive(Copy, Clone, Default, Debug)]
            pub struct Global;

            unsafe impl Allocator for Global {
                #[inline]
                fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
                    let data = if layout.size() == 0 {
                        layout.align() as *mut u8
                    } else {
                        unsafe { alloc::alloc::alloc(layout) }
                    };
                    let data = NonNull::new(data).ok_or(AllocError)?;
                    Ok(NonNull::slice_from_raw_parts(data, layout.size()))
                }

                #[inline]
                unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
                    if layout.size() != 0 {
                        unsafe { alloc::alloc::dealloc(ptr.as_ptr(), layout) }
                    }
                }

                #[inline]
                unsafe fn grow(
                    &self,
                    ptr: NonNull<u8>,
                    old_layout: Layout,
                    new_layout: Layout,
                ) -> Result<NonNull<[u8]>, AllocError> {
                    debug_assert!(new_layout.size() >= old_layout.size());
                    if old_layout.size() == 0 {
                        return self.allocate(new_layout);
                    }
                    if old_layout.align() != new_layout.align() {
                        let new_ptr = self.allocate(new_layout)?;
                        unsafe {
                            ptr::copy_nonoverlapping(
                                ptr.as_ptr(),
                                new_ptr.cast::<u8>().as_ptr(),
                                old_layout.size(),
                            );
                            self.deallocate(ptr, old_layout);
                        }
                        return Ok(new_ptr);
                    }
                    let data = unsafe {
                        alloc::alloc::realloc(ptr.as_ptr(), old_layout, new_layout.size())
                    };
                    let data = NonNull::new(data).ok_or(AllocError)?;
                    Ok(NonNull::slice_from_raw_parts(data, new_layout.size()))
                }
            }

            unsafe impl<A: Allocator + ?Sized> Allocator for &A {
                #[inline]
                fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
                    (**self).allocate(layout)
                }

                #[inline]
                unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
                    unsafe { (**self).deallocate(ptr, layout) }
                }

                #[inline]
                unsafe fn grow(
                    &self,
                    ptr: NonNull<u8>,
                    old_layout: Layout,
                    new_layout: Layout,
                ) -> Result<NonNull<[u8]>, AllocError> {
                    unsafe { (**self).grow(ptr, old_layout, new_layout) }
                }
            }
        }
    }

    cfg_if! {
        if #[cfg(feature = "error_in_core")] {
            pub use core::error::Error;
        } else if #[cfg(feature = "std")] {
            pub use std::error::Error;
        }
    }
}

pub use definitions::{AllocError, Allocator, Global};
#[cfg(any(feature = "error_in_core", feature = "std"))]
pub(crate) use definitions::Error;
