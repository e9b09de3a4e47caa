//! Property tests for the arena bump invariant, scope rollback and pool
//! round trips.

use core::alloc::Layout;
use core::ptr::NonNull;

use basalt_memory::allocator::{Allocator, HeapAllocator, HeapConfig, Pool};
use basalt_memory::arena::Arena;
use proptest::prelude::*;

fn request() -> impl Strategy<Value = (usize, usize)> {
    (0usize..96, 0u32..7).prop_map(|(size, shift)| (size, 1usize << shift))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn arena_offset_is_monotonic_and_bounded(
        requests in proptest::collection::vec(request(), 1..64),
    ) {
        let mut buffer = vec![0u8; 1024];
        let base = buffer.as_ptr() as usize;
        let arena = Arena::from_buffer(&mut buffer);

        let mut consumed = 0usize;
        for (size, align) in requests {
            let before = arena.total_allocated();
            let layout = Layout::from_size_align(size, align).unwrap();
            match unsafe { arena.allocate(layout) } {
                Ok(block) => {
                    let addr = block.cast::<u8>().as_ptr() as usize;
                    prop_assert!(addr >= base + consumed);
                    prop_assert_eq!(addr % align, 0);
                    prop_assert!(addr + size <= base + arena.capacity());
                    consumed += size + align;
                    prop_assert_eq!(arena.total_allocated(), consumed);
                }
                Err(err) => {
                    prop_assert!(err.is_out_of_memory());
                    prop_assert!(before + size + align > arena.capacity());
                    prop_assert_eq!(arena.total_allocated(), before);
                }
            }
            prop_assert!(arena.total_allocated() >= before);
            prop_assert!(arena.total_allocated() <= arena.capacity());
        }
    }

    #[test]
    fn temp_scope_restores_offset(
        prefix in proptest::collection::vec(request(), 0..8),
        inside in proptest::collection::vec(request(), 0..16),
    ) {
        let mut buffer = vec![0u8; 2048];
        let mut arena = Arena::from_buffer(&mut buffer);
        for (size, align) in prefix {
            let _ = unsafe { arena.allocate(Layout::from_size_align(size, align).unwrap()) };
        }
        let before = arena.total_allocated();

        {
            let scope = arena.begin_temp();
            for (size, align) in inside {
                let _ = unsafe { scope.allocate(Layout::from_size_align(size, align).unwrap()) };
            }
        }

        prop_assert_eq!(arena.total_allocated(), before);
        prop_assert_eq!(arena.temp_count(), 0);
    }

    #[test]
    fn nested_scopes_restore_outer_offset(
        outer in 0usize..200,
        inner in 0usize..200,
    ) {
        let mut buffer = vec![0u8; 1024];
        let mut arena = Arena::from_buffer(&mut buffer);
        let before = arena.total_allocated();

        let mut s1 = arena.begin_temp();
        let _ = s1.alloc_slice_copy(&vec![0u8; outer]);
        let mid = s1.total_allocated();
        {
            let s2 = s1.begin_temp();
            let _ = s2.alloc_slice_copy(&vec![0u8; inner]);
            prop_assert_eq!(s2.temp_count(), 2);
            s2.end().unwrap();
        }
        prop_assert_eq!(s1.total_allocated(), mid);
        s1.end().unwrap();

        prop_assert_eq!(arena.total_allocated(), before);
        prop_assert_eq!(arena.temp_count(), 0);
    }

    #[test]
    fn pool_round_trip_in_any_order(
        order in Just((0..12).collect::<Vec<usize>>()).prop_shuffle(),
    ) {
        let heap = HeapAllocator::new();
        let pool = Pool::new_in(&heap, 12, 24, 8).unwrap();
        let layout = Layout::from_size_align(24, 8).unwrap();

        let blocks: Vec<NonNull<u8>> = (0..12)
            .map(|_| unsafe { pool.allocate(layout).unwrap().cast() })
            .collect();
        let overflow = unsafe { pool.allocate(layout) };
        prop_assert!(overflow.is_err());

        for i in order {
            unsafe { pool.release(blocks[i]) };
        }

        for _ in 0..12 {
            let block = unsafe { pool.allocate(layout) };
            prop_assert!(block.is_ok());
        }
        let exhausted = unsafe { pool.allocate(layout) };
        prop_assert!(exhausted.is_err_and(|err| err.is_out_of_memory()));
    }

    #[test]
    fn heap_counters_balance(
        sizes in proptest::collection::vec(0usize..512, 1..32),
    ) {
        let heap = HeapAllocator::with_config(HeapConfig::single_threaded()).unwrap();
        let mut live = Vec::new();
        let mut expected = 0usize;

        for size in sizes {
            let layout = Layout::from_size_align(size, 8).unwrap();
            let block = unsafe { heap.allocate(layout).unwrap() };
            let recorded = unsafe { heap.allocated_size(block.cast()) }.unwrap();
            prop_assert!(recorded >= size);
            prop_assert_eq!(recorded % size_of::<usize>(), 0);
            expected += recorded;
            live.push(block.cast::<u8>());
        }
        prop_assert_eq!(heap.total_allocated(), Some(expected));

        for block in live {
            unsafe { heap.release(block) };
        }
        prop_assert_eq!(heap.total_allocated(), Some(0));
        prop_assert_eq!(heap.live_allocations(), 0);
    }
}
