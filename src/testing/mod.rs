//! Helpers shared by the unit tests.

mod counting_alloc;

pub(crate) use counting_alloc::CountingAlloc;
pub(crate) use crash_test::{CrashTestDummy, Panic};
