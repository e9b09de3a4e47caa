//! Shared engine behind [`HashTable`](super::HashTable) and
//! [`MultiHashTable`](super::MultiHashTable)
//!
//! Two parallel arrays:
//! - `hashes[b]` holds the index of the first entry of bucket `b`, or [`NIL`]
//! - `entries` is dense; each entry links to the next one of its bucket
//!
//! ## Invariants
//!
//! - Following `next` from `hashes[b]` visits exactly the entries whose
//!   `key % hashes.len() == b`, each once, and terminates
//! - `entries.len() * 4 <= hashes.len() * 3` after every insert
//! - `hashes` is empty only while `entries` is empty

use basalt_memory::allocator::Allocator;
use basalt_memory::error::MemoryResult;

#[cfg(feature = "logging")]
use tracing::trace;

use crate::array::DynArray;

/// Chain terminator and empty-bucket marker.
pub(crate) const NIL: isize = -1;

/// One key/value pair in the dense entry array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<T> {
    key: u64,
    next: isize,
    value: T,
}

impl<T> Entry<T> {
    /// The entry's key
    pub fn key(&self) -> u64 {
        self.key
    }

    /// The entry's value
    pub fn value(&self) -> &T {
        &self.value
    }
}

/// Where a key was (or would be) found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Probe {
    pub(crate) bucket: usize,
    /// Entry whose `next` points at `index`; `None` when `index` heads the chain
    pub(crate) prev: Option<usize>,
    pub(crate) index: Option<usize>,
}

impl Probe {
    const MISS: Self = Self {
        bucket: 0,
        prev: None,
        index: None,
    };
}

#[inline]
fn link(index: usize) -> isize {
    index as isize
}

#[inline]
fn unlink(raw: isize) -> Option<usize> {
    (raw != NIL).then_some(raw as usize)
}

pub(crate) struct RawTable<T: Copy, A: Allocator + Clone> {
    hashes: DynArray<isize, A>,
    entries: DynArray<Entry<T>, A>,
}

impl<T: Copy, A: Allocator + Clone> RawTable<T, A> {
    pub(crate) fn new_in(alloc: A) -> Self {
        Self {
            hashes: DynArray::new_in(alloc.clone()),
            entries: DynArray::new_in(alloc),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn bucket_count(&self) -> usize {
        self.hashes.len()
    }

    pub(crate) fn entries(&self) -> &[Entry<T>] {
        &self.entries
    }

    pub(crate) fn allocator(&self) -> &A {
        self.entries.allocator()
    }

    pub(crate) fn value_mut(&mut self, index: usize) -> &mut T {
        &mut self.entries[index].value
    }

    fn bucket_of(&self, key: u64) -> usize {
        debug_assert!(!self.hashes.is_empty());
        (key % self.hashes.len() as u64) as usize
    }

    /// First entry for `key` in its bucket chain.
    pub(crate) fn find(&self, key: u64) -> Probe {
        if self.hashes.is_empty() {
            return Probe::MISS;
        }

        let bucket = self.bucket_of(key);
        let mut prev = None;
        let mut cursor = unlink(self.hashes[bucket]);
        while let Some(i) = cursor {
            if self.entries[i].key == key {
                break;
            }
            prev = Some(i);
            cursor = unlink(self.entries[i].next);
        }
        Probe {
            bucket,
            prev,
            index: cursor,
        }
    }

    /// Next entry after `index` in its chain that carries the same key.
    pub(crate) fn find_next(&self, index: usize) -> Option<usize> {
        let key = self.entries.get(index)?.key;
        let mut cursor = unlink(self.entries[index].next);
        while let Some(i) = cursor {
            if self.entries[i].key == key {
                return Some(i);
            }
            cursor = unlink(self.entries[i].next);
        }
        None
    }

    /// Locates entry `index` itself, with its chain predecessor.
    fn locate(&self, index: usize) -> Probe {
        let bucket = self.bucket_of(self.entries[index].key);
        let mut prev = None;
        let mut cursor = unlink(self.hashes[bucket]);
        while let Some(i) = cursor {
            if i == index {
                break;
            }
            prev = Some(i);
            cursor = unlink(self.entries[i].next);
        }
        debug_assert_eq!(cursor, Some(index), "entry missing from its chain");
        Probe {
            bucket,
            prev,
            index: cursor,
        }
    }

    /// Grows the buckets so one more entry stays within the load factor.
    fn make_room(&mut self) -> MemoryResult<()> {
        if self.hashes.is_empty() {
            self.grow()?;
        }
        let next = self.entries.len() + 1;
        if next * 4 > self.hashes.len() * 3 {
            self.rehash(2 * next + 8)?;
        }
        Ok(())
    }

    /// Appends an entry and links it at the head of its bucket.
    fn push_entry(&mut self, key: u64, value: T) -> MemoryResult<usize> {
        let bucket = self.bucket_of(key);
        let index = self.entries.len();
        self.entries.push(Entry {
            key,
            next: self.hashes[bucket],
            value,
        })?;
        self.hashes[bucket] = link(index);
        Ok(index)
    }

    /// Adds an entry even if `key` is already present.
    ///
    /// On error nothing was added.
    pub(crate) fn insert(&mut self, key: u64, value: T) -> MemoryResult<usize> {
        self.make_room()?;
        self.push_entry(key, value)
    }

    /// Overwrites the first entry for `key`, or adds one.
    ///
    /// On error nothing was added.
    pub(crate) fn set(&mut self, key: u64, value: T) -> MemoryResult<()> {
        if let Some(index) = self.find(key).index {
            self.entries[index].value = value;
            return Ok(());
        }
        self.make_room()?;
        self.push_entry(key, value)?;
        Ok(())
    }

    /// Removes the first entry for `key`.
    pub(crate) fn remove(&mut self, key: u64) -> Option<Entry<T>> {
        let probe = self.find(key);
        probe.index?;
        Some(self.erase(probe))
    }

    /// Removes the entry at `index`.
    pub(crate) fn remove_at(&mut self, index: usize) -> Option<Entry<T>> {
        if index >= self.entries.len() {
            return None;
        }
        let probe = self.locate(index);
        Some(self.erase(probe))
    }

    /// Unlinks the probed entry and fills its slot with the last entry.
    fn erase(&mut self, probe: Probe) -> Entry<T> {
        let Probe {
            bucket,
            prev,
            index: Some(index),
        } = probe
        else {
            unreachable!("erase called with a miss");
        };

        let next = self.entries[index].next;
        match prev {
            Some(p) => self.entries[p].next = next,
            None => self.hashes[bucket] = next,
        }

        let last = self.entries.len() - 1;
        if index != last {
            // Whoever pointed at `last` must now point at `index`.
            let moved = self.locate(last);
            match moved.prev {
                Some(p) => self.entries[p].next = link(index),
                None => self.hashes[moved.bucket] = link(index),
            }
        }

        // `swap_remove` moves `last` into `index` and hands back the removed entry.
        match self.entries.swap_remove(index) {
            Some(removed) => removed,
            None => unreachable!("index checked against len"),
        }
    }

    /// Grows the bucket array so that `capacity` entries fit without a rehash.
    pub(crate) fn reserve(&mut self, capacity: usize) -> MemoryResult<()> {
        let buckets = capacity.saturating_mul(4).div_ceil(3);
        if buckets > self.hashes.len() {
            self.rehash(buckets)?;
        }
        if capacity > self.entries.len() {
            self.entries.reserve(capacity - self.entries.len())?;
        }
        Ok(())
    }

    fn grow(&mut self) -> MemoryResult<()> {
        self.rehash(2 * self.entries.len() + 8)
    }

    /// Rebuilds every chain over `bucket_count` buckets.
    ///
    /// Entries keep their dense positions; chains are relinked head-first, so
    /// chain order is not insertion order. On error the table is unchanged.
    fn rehash(&mut self, bucket_count: usize) -> MemoryResult<()> {
        debug_assert!(bucket_count > 0);

        let mut hashes = DynArray::with_capacity_in(self.hashes.allocator().clone(), bucket_count)?;
        hashes.resize(bucket_count, NIL)?;

        for index in 0..self.entries.len() {
            let bucket = (self.entries[index].key % bucket_count as u64) as usize;
            self.entries[index].next = hashes[bucket];
            hashes[bucket] = link(index);
        }

        #[cfg(feature = "logging")]
        trace!(
            entries = self.entries.len(),
            from = self.hashes.len(),
            to = bucket_count,
            "hash table rehash"
        );

        self.hashes = hashes;
        Ok(())
    }

    /// Forgets every entry; storage is kept, buckets are rebuilt on next insert.
    pub(crate) fn clear(&mut self) {
        self.hashes.clear();
        self.entries.clear();
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let mut seen = vec![false; self.entries.len()];
        for (bucket, &head) in self.hashes.iter().enumerate() {
            let mut cursor = unlink(head);
            while let Some(i) = cursor {
                assert!(!seen[i], "entry {i} reached twice");
                seen[i] = true;
                let key = self.entries[i].key;
                assert_eq!((key % self.hashes.len() as u64) as usize, bucket);
                cursor = unlink(self.entries[i].next);
            }
        }
        assert!(seen.iter().all(|&s| s), "entry missing from every chain");
        assert!(self.entries.len() * 4 <= self.hashes.len() * 3 || self.entries.is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_memory::allocator::HeapAllocator;
    use basalt_memory::arena::Arena;

    #[test]
    fn test_empty_table_lookup() {
        let heap = HeapAllocator::new();
        let table = RawTable::<u32, _>::new_in(&heap);
        assert_eq!(table.find(42), Probe::MISS);
        assert_eq!(table.bucket_count(), 0);
        assert_eq!(heap.live_allocations(), 0);
    }

    #[test]
    fn test_first_insert_grows_to_eight() {
        let heap = HeapAllocator::new();
        let mut table = RawTable::new_in(&heap);
        table.set(3, 30u32).unwrap();
        assert_eq!(table.bucket_count(), 8);
        table.check_invariants();
    }

    #[test]
    fn test_rehash_sizes() {
        let heap = HeapAllocator::new();
        let mut table = RawTable::new_in(&heap);
        // 8 buckets hold 6 entries; the 7th triggers 2 * 7 + 8
        for key in 0..6 {
            table.set(key, key).unwrap();
        }
        assert_eq!(table.bucket_count(), 8);
        table.set(6, 6).unwrap();
        assert_eq!(table.bucket_count(), 22);
        table.check_invariants();
    }

    #[test]
    fn test_rehash_with_no_entries() {
        let heap = HeapAllocator::new();
        let mut table = RawTable::<u8, _>::new_in(&heap);
        table.grow().unwrap();
        assert_eq!(table.bucket_count(), 8);
        assert!(table.hashes.iter().all(|&h| h == NIL));
        table.check_invariants();
    }

    #[test]
    fn test_chain_collisions_and_removal() {
        let heap = HeapAllocator::new();
        let mut table = RawTable::new_in(&heap);
        table.reserve(4).unwrap();
        let buckets = table.bucket_count() as u64;

        // all in bucket 1
        let keys = [1, 1 + buckets, 1 + 2 * buckets, 1 + 3 * buckets];
        for (i, &key) in keys.iter().enumerate() {
            table.set(key, i as u32).unwrap();
        }
        assert_eq!(table.bucket_count() as u64, buckets);
        table.check_invariants();

        // middle of the chain, then the head, then the tail
        assert_eq!(table.remove(keys[1]).map(|e| e.value), Some(1));
        table.check_invariants();
        assert_eq!(table.remove(keys[3]).map(|e| e.value), Some(3));
        table.check_invariants();
        assert_eq!(table.remove(keys[0]).map(|e| e.value), Some(0));
        table.check_invariants();

        let probe = table.find(keys[2]);
        assert_eq!(probe.index.map(|i| table.entries()[i].value), Some(2));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove_last_remaining_entry() {
        let heap = HeapAllocator::new();
        let mut table = RawTable::new_in(&heap);
        table.set(9, 'x').unwrap();
        assert_eq!(table.remove(9).map(|e| e.value), Some('x'));
        assert_eq!(table.len(), 0);
        assert_eq!(table.find(9).index, None);
        table.check_invariants();
    }

    #[test]
    fn test_swap_repairs_predecessor_of_moved_entry() {
        let heap = HeapAllocator::new();
        let mut table = RawTable::new_in(&heap);
        table.reserve(6).unwrap();
        let b = table.bucket_count() as u64;

        // indices 0, 2 and 3 share bucket 2; index 3 heads the chain
        table.insert(2, 0u8).unwrap();
        table.insert(5, 1).unwrap();
        table.insert(2 + b, 2).unwrap();
        table.insert(2 + 2 * b, 3).unwrap();
        table.check_invariants();

        // moving the last entry into slot 1 rewires the head of bucket 2
        table.remove_at(1).unwrap();
        table.check_invariants();
        assert_eq!(table.entries()[1].key(), 2 + 2 * b);
        assert_eq!(table.find(2 + 2 * b).index, Some(1));
        assert_eq!(table.find(2 + b).index, Some(2));

        // index 0 is the chain tail; the moved entry has a predecessor
        table.remove_at(0).unwrap();
        table.check_invariants();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_failed_growth_adds_nothing() {
        // 8 buckets (72 bytes) and 8 entries (200 bytes) fit; 22 buckets do not
        let mut buffer = [0u8; 400];
        let arena = Arena::from_buffer(&mut buffer);
        let mut table = RawTable::new_in(&arena);
        for key in 0..6u64 {
            table.insert(key, key).unwrap();
        }
        assert_eq!(table.bucket_count(), 8);

        for _ in 0..2 {
            let err = table.insert(6, 6).unwrap_err();
            assert!(err.is_out_of_memory());
            assert_eq!(table.len(), 6);
            assert_eq!(table.find(6).index, None);
        }
        assert!(table.set(6, 6).is_err());
        assert_eq!(table.len(), 6);

        // overwriting needs no room
        table.set(3, 30).unwrap();
        assert_eq!(table.find(3).index.map(|i| table.entries()[i].value), Some(30));
        table.check_invariants();
    }

    #[test]
    fn test_find_next_skips_other_keys() {
        let heap = HeapAllocator::new();
        let mut table = RawTable::new_in(&heap);
        table.reserve(8).unwrap();
        let b = table.bucket_count() as u64;

        table.insert(4, 'a').unwrap();
        table.insert(4 + b, 'b').unwrap();
        table.insert(4, 'c').unwrap();
        table.insert(4 + b, 'd').unwrap();
        table.insert(4, 'e').unwrap();

        let mut values = Vec::new();
        let mut cursor = table.find(4).index;
        while let Some(i) = cursor {
            values.push(table.entries()[i].value);
            cursor = table.find_next(i);
        }
        values.sort_unstable();
        assert_eq!(values, vec!['a', 'c', 'e']);
    }

    #[test]
    fn test_clear_then_reuse() {
        let heap = HeapAllocator::new();
        let mut table = RawTable::new_in(&heap);
        for key in 0..100 {
            table.set(key, key * 2).unwrap();
        }
        table.clear();
        assert_eq!(table.len(), 0);
        assert_eq!(table.find(10).index, None);

        table.set(10, 1).unwrap();
        assert_eq!(table.bucket_count(), 8);
        table.check_invariants();
    }
}
