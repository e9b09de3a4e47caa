//! Integration tests for the multimap.

use basalt_collections::MultiHashTable;
use basalt_memory::allocator::HeapAllocator;
use basalt_memory::arena::Arena;
use pretty_assertions::assert_eq;
use rstest::rstest;

#[test]
fn test_three_values_under_one_key() {
    let heap = HeapAllocator::new();
    let mut table = MultiHashTable::new_in(&heap);
    table.insert(5, "a").expect("insert");
    table.insert(5, "b").expect("insert");
    table.insert(5, "c").expect("insert");

    assert_eq!(table.count(5), 3);

    let mut seen = Vec::new();
    let mut cursor = table.find_first(5);
    while let Some(index) = cursor {
        seen.push(*table.entry(index).expect("entry").value());
        cursor = table.find_next(index);
    }
    seen.sort_unstable();
    assert_eq!(seen, vec!["a", "b", "c"]);

    assert!(table.remove(5));
    assert_eq!(table.count(5), 2);
}

#[rstest]
#[case(1)]
#[case(7)]
#[case(64)]
fn test_remove_all_counts(#[case] copies: usize) {
    let heap = HeapAllocator::new();
    let mut table = MultiHashTable::new_in(&heap);
    for i in 0..copies {
        table.insert(11, i).expect("insert");
        table.insert(12, i).expect("insert");
    }

    assert_eq!(table.remove_all(11), copies);
    assert!(!table.has(11));
    assert_eq!(table.count(12), copies);
    assert_eq!(table.len(), copies);
}

#[test]
fn test_mixed_keys_keep_their_values() {
    let heap = HeapAllocator::new();
    let mut table = MultiHashTable::with_capacity_in(&heap, 300).expect("table");
    for key in 0..100u64 {
        for copy in 0..3u64 {
            table.insert(key, key * 10 + copy).expect("insert");
        }
    }
    assert_eq!(table.len(), 300);

    for key in 0..100u64 {
        let mut values: Vec<u64> = table.get_all(key).copied().collect();
        values.sort_unstable();
        assert_eq!(values, vec![key * 10, key * 10 + 1, key * 10 + 2]);
    }
}

#[test]
fn test_remove_entry_by_index_while_walking() {
    let heap = HeapAllocator::new();
    let mut table = MultiHashTable::new_in(&heap);
    for value in 0..6u32 {
        table.insert(u64::from(value % 2), value).expect("insert");
    }

    // drop the odd values under key 1, restarting the walk after each removal
    while let Some(index) = table.find_first(1) {
        let removed = table.remove_entry(index).expect("entry");
        assert_eq!(removed.key(), 1);
    }
    assert_eq!(table.count(1), 0);
    assert_eq!(table.count(0), 3);
    assert_eq!(table.len(), 3);
}

#[test]
fn test_clear_and_reuse() {
    let heap = HeapAllocator::new();
    let mut table = MultiHashTable::new_in(&heap);
    for i in 0..50u64 {
        table.insert(i % 5, i).expect("insert");
    }
    table.clear();
    assert!(table.is_empty());
    assert_eq!(table.count(0), 0);

    table.insert(0, 1).expect("insert");
    assert_eq!(table.count(0), 1);
}

#[test]
fn test_failed_insert_stores_nothing_and_retry_does_not_duplicate() {
    let mut buffer = [0u8; 400];
    let arena = Arena::from_buffer(&mut buffer);
    let mut table = MultiHashTable::new_in(&arena);

    let mut key = 0u64;
    while table.insert(key, key).is_ok() {
        key += 1;
    }
    let len = table.len();
    assert_eq!(len as u64, key);

    // the arena never frees, so a retry fails the same way
    assert!(table.insert(key, key).is_err());
    assert_eq!(table.len(), len);
    assert_eq!(table.count(key), 0);
    for stored in 0..key {
        assert_eq!(table.count(stored), 1);
    }
}
