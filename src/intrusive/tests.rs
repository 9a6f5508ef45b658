use super::*;
use crate::test_helpers::test_rng;
use crate::testing::CountingAlloc;
use crate::TryReserveErrorKind;
use core::mem;
use rand::seq::SliceRandom;
use rand::Rng;
use std::panic::{catch_unwind, AssertUnwindSafe};

#[derive(Debug)]
struct Job {
    key: Cell<i32>,
    entry: HeapEntry,
}

crate::impl_capsule!(Job, entry);

impl Job {
    fn new(key: i32) -> Self {
        Job { key: Cell::new(key), entry: HeapEntry::new() }
    }
}

fn by_key(parent: &Job, child: &Job) -> bool {
    parent.key.get() <= child.key.get()
}

/// A key that makes `tripping_by_key` panic.
const TRIP: i32 = i32::MIN;

fn tripping_by_key(parent: &Job, child: &Job) -> bool {
    if parent.key.get() == TRIP || child.key.get() == TRIP {
        panic!("comparator tripped");
    }
    by_key(parent, child)
}

fn jobs(keys: &[i32]) -> Vec<Job> {
    keys.iter().copied().map(Job::new).collect()
}

/// Checks the heap order and that every linked entry knows its own slot.
fn check_invariant<C: Capsule, O: HeapOrder<C>, A: Allocator>(heap: &IntrusiveHeap<'_, C, O, A>) {
    let data = heap.as_slice();
    for (i, entry) in data.iter().enumerate() {
        assert_eq!(entry.index(), Some(i), "entry in slot {i} lost track of its position");
        if i > 0 {
            assert!(heap.order().cmp_ok(data[(i - 1) / 2].capsule(), entry.capsule()));
        }
    }
    assert!(heap.len() <= heap.capacity());
}

fn keys_in_order<O, A>(heap: &mut IntrusiveHeap<'_, Job, O, A>) -> Vec<i32>
where
    O: HeapOrder<Job>,
    A: Allocator,
{
    let mut out = Vec::new();
    while let Some(job) = heap.pop() {
        assert!(!job.entry.is_linked());
        check_invariant(heap);
        out.push(job.key.get());
    }
    out
}

#[test]
fn test_insert_then_delete_in_order() {
    let pool = jobs(&[26, 35, 12, 20, 5, 34, 23, 14, 24, 9]);
    let seven = Job::new(7);
    let mut heap: IntrusiveHeap<'_, Job, _> =
        IntrusiveHeap::try_with_growth(by_key, 10, GrowthPolicy::DOUBLING).unwrap();

    for job in &pool {
        heap.insert(job).unwrap();
        check_invariant(&heap);
    }
    assert_eq!(heap.peek_root().capsule().key.get(), 5);
    assert_eq!(heap.capacity(), 10);

    let handle = heap.insert(&seven).unwrap();
    assert_eq!(heap.capacity(), 20);
    assert_eq!(heap.len(), 11);
    assert_eq!(handle.index(), Some(1));

    assert!(core::ptr::eq(heap.delete(handle), &seven));
    assert_eq!(heap.len(), 10);
    assert!(!seven.entry.is_linked());
    check_invariant(&heap);

    assert_eq!(keys_in_order(&mut heap), [5, 9, 12, 14, 20, 23, 24, 26, 34, 35]);
    assert!(pool.iter().all(|job| !job.entry.is_linked()));
}

#[test]
fn test_handles_survive_reshuffling() {
    let mut rng = test_rng();
    let keys: Vec<i32> = (0..200).map(|_| rng.gen_range(-100..100)).collect();
    let pool = jobs(&keys);
    let mut heap = IntrusiveHeap::new(by_key);

    let mut handles: Vec<EntryRef<'_, Job>> = pool.iter().map(|job| heap.push(job)).collect();
    check_invariant(&heap);

    handles.shuffle(&mut rng);
    let (gone, kept) = handles.split_at(120);
    for &handle in gone {
        let job = heap.delete(handle);
        assert!(core::ptr::eq(job, handle.capsule()));
        assert_eq!(handle.index(), None);
        check_invariant(&heap);
    }

    assert_eq!(heap.len(), kept.len());
    for &handle in kept {
        assert!(heap.contains(handle.capsule()));
        let pos = handle.index().unwrap();
        assert_eq!(heap.as_slice()[pos], handle);
    }

    let mut expected: Vec<i32> = kept.iter().map(|h| h.capsule().key.get()).collect();
    expected.sort_unstable();
    assert_eq!(keys_in_order(&mut heap), expected);
}

#[test]
fn test_delete_every_handle() {
    let mut rng = test_rng();
    let pool: Vec<Job> = (0..100).map(|_| Job::new(rng.gen_range(-50..50))).collect();
    let mut heap =
        IntrusiveHeap::try_with_growth(by_key, 1, GrowthPolicy::new(0, 0, 0)).unwrap();

    let mut handles: Vec<_> = pool.iter().map(|job| heap.insert(job).unwrap()).collect();
    assert_eq!(heap.capacity(), 100);
    check_invariant(&heap);

    handles.shuffle(&mut rng);
    for handle in handles {
        assert!(core::ptr::eq(heap.delete(handle), handle.capsule()));
        assert!(!handle.entry().is_linked());
        check_invariant(&heap);
    }

    assert!(heap.is_empty());
    assert_eq!(heap.capacity(), 100);
    assert!(pool.iter().all(|job| !job.entry.is_linked()));
}

#[test]
fn test_panic_in_order_keeps_positions() {
    fn check_positions<O>(heap: &IntrusiveHeap<'_, Job, O>, pool: &[Job], extra: &Job) {
        for (i, entry) in heap.as_slice().iter().enumerate() {
            assert_eq!(entry.index(), Some(i));
        }
        let linked = pool.iter().chain([extra]).filter(|job| job.entry.is_linked()).count();
        assert_eq!(linked, heap.len());
    }

    let pool = jobs(&[1, 2, 3, 4, 5, 6, 7]);
    let trip = Job::new(TRIP);
    let mut heap = IntrusiveHeap::new(tripping_by_key);
    for job in &pool {
        heap.push(job);
    }

    // Trips on the first comparison with its parent.
    let result = catch_unwind(AssertUnwindSafe(|| heap.push(&trip)));
    assert!(result.is_err());
    assert_eq!(heap.len(), 8);
    assert_eq!(trip.entry.index(), Some(7));
    check_positions(&heap, &pool, &trip);

    // The root leaves, then `trip` moves up from the last slot and trips while sifting down.
    let result = catch_unwind(AssertUnwindSafe(|| heap.delete_root()));
    assert!(result.is_err());
    assert_eq!(heap.len(), 7);
    assert!(!pool[0].entry.is_linked());
    assert_eq!(trip.entry.index(), Some(0));
    check_positions(&heap, &pool, &trip);

    trip.key.set(0);
    heap.update(EntryRef::of(&trip));
    assert_eq!(keys_in_order(&mut heap), [0, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn test_random_operations() {
    let mut rng = test_rng();
    let pool: Vec<Job> = (0..64).map(|_| Job::new(rng.gen_range(0..32))).collect();
    let mut heap = IntrusiveHeap::try_with_growth(by_key, 0, GrowthPolicy::new(0, 0, 3)).unwrap();

    for _ in 0..3000 {
        let job = &pool[rng.gen_range(0..pool.len())];
        match rng.gen_range(0..5) {
            0 | 1 if !heap.contains(job) => {
                heap.insert(job).unwrap();
            }
            2 if heap.contains(job) => {
                heap.delete(EntryRef::of(job));
            }
            3 if heap.contains(job) => {
                job.key.set(rng.gen_range(0..32));
                heap.update(EntryRef::of(job));
            }
            _ => {
                let min = heap.iter().map(|job| job.key.get()).min();
                assert_eq!(heap.pop().map(|job| job.key.get()), min);
            }
        }
        check_invariant(&heap);
        assert_eq!(heap.len(), pool.iter().filter(|job| job.entry.is_linked()).count());
    }
}

#[test]
fn test_update_either_direction() {
    let pool = jobs(&[10, 20, 30, 40, 50, 60, 70]);
    let mut heap = IntrusiveHeap::new(by_key);
    let handles: Vec<_> = pool.iter().map(|job| heap.push(job)).collect();

    pool[6].key.set(0);
    heap.update(handles[6]);
    assert_eq!(heap.peek_root(), handles[6]);
    check_invariant(&heap);

    pool[6].key.set(100);
    heap.update(handles[6]);
    assert_eq!(heap.peek_root(), handles[0]);
    check_invariant(&heap);

    // Unchanged keys leave everything in place.
    let before = heap.as_slice().to_vec();
    heap.update(handles[3]);
    assert_eq!(heap.as_slice(), before);

    assert_eq!(keys_in_order(&mut heap), [10, 20, 30, 40, 50, 60, 100]);
}

#[test]
fn test_max_order() {
    #[derive(Debug)]
    struct Word {
        text: &'static str,
        link: HeapEntry,
    }
    crate::impl_capsule!(Word, link);

    impl PartialEq for Word {
        fn eq(&self, other: &Self) -> bool {
            self.text == other.text
        }
    }
    impl Eq for Word {}
    impl PartialOrd for Word {
        fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
            Some(self.cmp(other))
        }
    }
    impl Ord for Word {
        fn cmp(&self, other: &Self) -> core::cmp::Ordering {
            self.text.cmp(other.text)
        }
    }

    let words: Vec<Word> = ["pear", "apple", "quince", "fig"]
        .into_iter()
        .map(|text| Word { text, link: HeapEntry::new() })
        .collect();
    let mut heap = IntrusiveHeap::new(crate::MaxOrder::new());
    for word in &words {
        heap.push(word);
    }
    let drained: Vec<&str> = core::iter::from_fn(|| heap.pop()).map(|w| w.text).collect();
    assert_eq!(drained, ["quince", "pear", "fig", "apple"]);
}

#[test]
fn test_contains() {
    let pool = jobs(&[3, 1, 2]);
    let other = Job::new(0);
    let mut heap = IntrusiveHeap::new(by_key);
    let mut elsewhere = IntrusiveHeap::new(by_key);

    heap.push(&pool[0]);
    heap.push(&pool[1]);
    elsewhere.push(&other);

    assert!(heap.contains(&pool[0]));
    assert!(heap.contains(&pool[1]));
    assert!(!heap.contains(&pool[2]));
    // Linked, but into a different heap, at a slot this heap also has.
    assert_eq!(other.entry.index(), Some(0));
    assert!(!heap.contains(&other));
    assert!(elsewhere.contains(&other));
}

#[test]
#[should_panic(expected = "already linked")]
fn test_insert_twice() {
    let job = Job::new(1);
    let mut heap = IntrusiveHeap::new(by_key);
    heap.push(&job);
    heap.push(&job);
}

#[test]
#[should_panic(expected = "already linked")]
fn test_insert_into_second_heap() {
    let job = Job::new(1);
    let mut first = IntrusiveHeap::new(by_key);
    let mut second = IntrusiveHeap::new(by_key);
    first.push(&job);
    second.push(&job);
}

#[test]
#[should_panic(expected = "not linked into this heap")]
fn test_delete_stale_handle() {
    let pool = jobs(&[1, 2]);
    let mut heap = IntrusiveHeap::new(by_key);
    let handle = heap.push(&pool[0]);
    heap.push(&pool[1]);
    heap.delete(handle);
    heap.delete(handle);
}

#[test]
#[should_panic(expected = "not linked into this heap")]
fn test_delete_from_other_heap() {
    let pool = jobs(&[1, 2]);
    let mut heap = IntrusiveHeap::new(by_key);
    let mut elsewhere = IntrusiveHeap::new(by_key);
    heap.push(&pool[0]);
    let handle = elsewhere.push(&pool[1]);
    heap.delete(handle);
}

#[test]
#[should_panic(expected = "empty heap")]
fn test_peek_root_empty() {
    let heap: IntrusiveHeap<'_, Job, _> = IntrusiveHeap::new(by_key);
    let _ = heap.peek_root();
}

#[test]
fn test_capsule_recovery() {
    let job = Job::new(42);
    assert_eq!(Job::ENTRY_OFFSET, mem::offset_of!(Job, entry));
    assert!(core::ptr::eq(job.heap_entry(), &job.entry));

    let handle = EntryRef::of(&job);
    assert!(core::ptr::eq(handle.entry(), &job.entry));
    assert!(core::ptr::eq(handle.capsule(), &job));

    let by_macro = crate::capsule_of!(handle.as_ptr().as_ptr(), Job, entry);
    assert!(core::ptr::eq(by_macro, &job));

    let by_fn = unsafe { capsule_of::<Job>(handle.as_ptr()) };
    assert_eq!(unsafe { by_fn.as_ref() }.key.get(), 42);
}

#[test]
fn test_clear_and_drop_unlink() {
    let pool = jobs(&[5, 4, 3, 2, 1]);
    {
        let mut heap = IntrusiveHeap::with_capacity(by_key, 2);
        for job in &pool {
            heap.push(job);
        }
        let capacity = heap.capacity();
        heap.clear();
        assert!(heap.is_empty());
        assert_eq!(heap.capacity(), capacity);
        assert!(pool.iter().all(|job| !job.entry.is_linked()));

        heap.push(&pool[0]);
        heap.push(&pool[1]);
    }
    assert!(pool.iter().all(|job| !job.entry.is_linked()));

    // Unlinked capsules may join another heap.
    let mut heap = IntrusiveHeap::new(by_key);
    heap.push(&pool[0]);
    assert_eq!(heap.peek().map(|job| job.key.get()), Some(5));
}

#[test]
fn test_failed_growth_leaves_capsule_unlinked() {
    let alloc = CountingAlloc::with_budget(1);
    let pool = jobs(&[3, 1, 2]);
    let mut heap =
        IntrusiveHeap::try_with_growth_in(by_key, 2, GrowthPolicy::DOUBLING, &alloc).unwrap();
    heap.insert(&pool[0]).unwrap();
    heap.insert(&pool[1]).unwrap();

    let err = heap.insert(&pool[2]).unwrap_err();
    assert!(matches!(err.kind(), TryReserveErrorKind::AllocError { .. }));
    assert!(!pool[2].entry.is_linked());
    assert_eq!(heap.len(), 2);
    assert_eq!(heap.capacity(), 2);
    check_invariant(&heap);

    alloc.set_budget(None);
    heap.insert(&pool[2]).unwrap();
    assert_eq!(heap.capacity(), 4);
    assert_eq!(alloc.allocations(), 2);
    assert_eq!(keys_in_order(&mut heap), [1, 2, 3]);
}

#[test]
fn test_debug() {
    let job = Job::new(9);
    assert_eq!(format!("{:?}", job.entry), "HeapEntry { index: None }");

    let mut heap = IntrusiveHeap::new(by_key);
    heap.push(&job);
    assert_eq!(format!("{:?}", job.entry), "HeapEntry { index: Some(0) }");
    assert!(format!("{heap:?}").starts_with("[Job { key: Cell { value: 9 }"));
}
