//! Orders that make heaps behave like ordinary [`Ord`]-based priority queues.
//!
//! These are what most callers want; a closure `Fn(&T, &T) -> bool` (or any other
//! [`HeapOrder`]) is only needed when the order is not `T`'s natural one.

use crate::HeapOrder;
use core::{fmt, marker::PhantomData};

/// A zero-sized order that puts the least element (per [`Ord`]) at the root.
pub struct MinOrder<T: ?Sized>(PhantomData<fn(&T)>);

/// A zero-sized order that puts the greatest element (per [`Ord`]) at the root.
pub struct MaxOrder<T: ?Sized>(PhantomData<fn(&T)>);

macro_rules! ord_orders {
    // end of recursion
    () => {};

    ($(#[$attrs:meta])* $order:ident => $op:tt $(, $($rest:tt)*)?) => {
        impl<T: ?Sized> $order<T> {
            /// Creates the order.
            #[must_use]
            pub const fn new() -> Self {
                Self(PhantomData)
            }
        }

        impl<T: ?Sized> Default for $order<T> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<T: ?Sized> Clone for $order<T> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T: ?Sized> Copy for $order<T> {}

        impl<T: ?Sized> fmt::Debug for $order<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(stringify!($order))
            }
        }

        $(#[$attrs])*
        impl<T: ?Sized + Ord> HeapOrder<T> for $order<T> {
            #[inline]
            fn cmp_ok(&self, parent: &T, child: &T) -> bool {
                parent $op child
            }
        }

        $(ord_orders!($($rest)*);)?
    };
}

ord_orders! {
    // Delegate to `T`'s `PartialOrd` operators rather than `Ord::cmp`, so that
    // types whose two implementations disagree behave as they would in `std`.
    MinOrder => <=,
    MaxOrder => >=,
}
