//! Hash table that keeps every value inserted under a key

use core::fmt;
use core::iter::FusedIterator;

use basalt_memory::allocator::Allocator;
use basalt_memory::error::MemoryResult;

use super::raw::{Entry, RawTable};

/// A `u64`-keyed multimap
///
/// Values under one key are reached by walking the bucket chain with
/// [`find_first`](Self::find_first) and [`find_next`](Self::find_next), or
/// with [`get_all`](Self::get_all). Their order is unspecified.
///
/// Entry indices are stable until the next removal or [`clear`](Self::clear).
///
/// # Examples
///
/// ```
/// use basalt_collections::MultiHashTable;
/// use basalt_memory::allocator::HeapAllocator;
///
/// let heap = HeapAllocator::new();
/// let mut table = MultiHashTable::new_in(&heap);
/// table.insert(1, 'a')?;
/// table.insert(1, 'b')?;
/// table.insert(2, 'c')?;
///
/// assert_eq!(table.count(1), 2);
/// let mut under_one: Vec<char> = table.get_all(1).copied().collect();
/// under_one.sort_unstable();
/// assert_eq!(under_one, ['a', 'b']);
/// # Ok::<(), basalt_memory::MemoryError>(())
/// ```
pub struct MultiHashTable<T: Copy, A: Allocator + Clone> {
    raw: RawTable<T, A>,
}

impl<T: Copy, A: Allocator + Clone> MultiHashTable<T, A> {
    /// Creates an empty table; nothing is allocated until the first insert
    pub fn new_in(alloc: A) -> Self {
        Self {
            raw: RawTable::new_in(alloc),
        }
    }

    /// Creates a table that holds `capacity` entries without rehashing
    pub fn with_capacity_in(alloc: A, capacity: usize) -> MemoryResult<Self> {
        let mut table = Self::new_in(alloc);
        table.reserve(capacity)?;
        Ok(table)
    }

    /// Number of entries across all keys
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// True when the table holds no entries
    pub fn is_empty(&self) -> bool {
        self.raw.len() == 0
    }

    /// Number of buckets; zero until the first insert or reserve
    pub fn bucket_count(&self) -> usize {
        self.raw.bucket_count()
    }

    /// The allocator backing both arrays
    pub fn allocator(&self) -> &A {
        self.raw.allocator()
    }

    /// Adds `value` under `key`, keeping values already there
    ///
    /// Returns the new entry's index; a rehash never moves entries.
    pub fn insert(&mut self, key: u64, value: T) -> MemoryResult<usize> {
        self.raw.insert(key, value)
    }

    /// True if at least one entry has `key`
    pub fn has(&self, key: u64) -> bool {
        self.raw.find(key).index.is_some()
    }

    /// Index of the first entry for `key` in its chain
    pub fn find_first(&self, key: u64) -> Option<usize> {
        self.raw.find(key).index
    }

    /// Index of the next entry after `index` with the same key
    ///
    /// Returns `None` at the end of the chain or for an out-of-range index.
    pub fn find_next(&self, index: usize) -> Option<usize> {
        self.raw.find_next(index)
    }

    /// The entry at `index`
    pub fn entry(&self, index: usize) -> Option<&Entry<T>> {
        self.raw.entries().get(index)
    }

    /// Number of entries with `key`
    pub fn count(&self, key: u64) -> usize {
        self.get_all(key).count()
    }

    /// Iterates every value stored under `key`
    pub fn get_all(&self, key: u64) -> ValuesFor<'_, T, A> {
        ValuesFor {
            raw: &self.raw,
            cursor: self.raw.find(key).index,
        }
    }

    /// Removes one entry with `key`; returns whether one was present
    pub fn remove(&mut self, key: u64) -> bool {
        self.raw.remove(key).is_some()
    }

    /// Removes the entry at `index` and returns it
    ///
    /// The last entry moves into `index`, so indices held from before the
    /// call may now name a different entry.
    pub fn remove_entry(&mut self, index: usize) -> Option<Entry<T>> {
        self.raw.remove_at(index)
    }

    /// Removes every entry with `key`; returns how many were removed
    pub fn remove_all(&mut self, key: u64) -> usize {
        let mut removed = 0;
        while self.raw.remove(key).is_some() {
            removed += 1;
        }
        removed
    }

    /// Makes room for `capacity` entries without rehashing
    pub fn reserve(&mut self, capacity: usize) -> MemoryResult<()> {
        self.raw.reserve(capacity)
    }

    /// Removes every entry
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// The dense entry array, in storage order
    pub fn entries(&self) -> &[Entry<T>] {
        self.raw.entries()
    }

    /// Iterates `(key, &value)` pairs in storage order
    pub fn iter(&self) -> impl Iterator<Item = (u64, &T)> + '_ {
        self.raw.entries().iter().map(|e| (e.key(), e.value()))
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        self.raw.check_invariants();
    }
}

impl<T: Copy + fmt::Debug, A: Allocator + Clone> fmt::Debug for MultiHashTable<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Iterator over the values stored under one key, from
/// [`MultiHashTable::get_all`]
pub struct ValuesFor<'t, T: Copy, A: Allocator + Clone> {
    raw: &'t RawTable<T, A>,
    cursor: Option<usize>,
}

impl<'t, T: Copy, A: Allocator + Clone> Iterator for ValuesFor<'t, T, A> {
    type Item = &'t T;

    fn next(&mut self) -> Option<&'t T> {
        let index = self.cursor?;
        self.cursor = self.raw.find_next(index);
        Some(self.raw.entries()[index].value())
    }
}

impl<T: Copy, A: Allocator + Clone> FusedIterator for ValuesFor<'_, T, A> {}

#[cfg(test)]
mod tests {
    use super::*;
    use basalt_memory::allocator::HeapAllocator;

    #[test]
    fn test_duplicates_are_kept() {
        let heap = HeapAllocator::new();
        let mut table = MultiHashTable::new_in(&heap);
        for value in [10u32, 20, 30] {
            table.insert(7, value).unwrap();
        }
        table.insert(8, 99).unwrap();

        assert_eq!(table.len(), 4);
        assert_eq!(table.count(7), 3);
        assert_eq!(table.count(8), 1);
        assert_eq!(table.count(9), 0);

        let mut values: Vec<u32> = table.get_all(7).copied().collect();
        values.sort_unstable();
        assert_eq!(values, vec![10, 20, 30]);
        table.check_invariants();
    }

    #[test]
    fn test_chain_walk_by_index() {
        let heap = HeapAllocator::new();
        let mut table = MultiHashTable::new_in(&heap);
        let first = table.insert(3, 'x').unwrap();
        let second = table.insert(3, 'y').unwrap();
        assert_eq!((first, second), (0, 1));

        let mut walked = Vec::new();
        let mut cursor = table.find_first(3);
        while let Some(i) = cursor {
            walked.push(i);
            cursor = table.find_next(i);
        }
        walked.sort_unstable();
        assert_eq!(walked, vec![0, 1]);
        assert_eq!(table.find_next(100), None);
        assert_eq!(table.entry(1).map(Entry::key), Some(3));
    }

    #[test]
    fn test_remove_one_then_all() {
        let heap = HeapAllocator::new();
        let mut table = MultiHashTable::new_in(&heap);
        for i in 0..5u64 {
            table.insert(1, i).unwrap();
            table.insert(2, i).unwrap();
        }

        assert!(table.remove(1));
        assert_eq!(table.count(1), 4);
        assert_eq!(table.remove_all(1), 4);
        assert_eq!(table.remove_all(1), 0);
        assert!(!table.remove(1));
        assert_eq!(table.count(2), 5);
        table.check_invariants();
    }

    #[test]
    fn test_remove_entry_moves_last() {
        let heap = HeapAllocator::new();
        let mut table = MultiHashTable::new_in(&heap);
        table.insert(1, 'a').unwrap();
        table.insert(2, 'b').unwrap();
        table.insert(3, 'c').unwrap();

        let removed = table.remove_entry(0).unwrap();
        assert_eq!((removed.key(), *removed.value()), (1, 'a'));
        assert_eq!(table.entry(0).map(Entry::key), Some(3));
        assert_eq!(table.find_first(3), Some(0));
        assert!(table.remove_entry(2).is_none());
        table.check_invariants();
    }

    #[test]
    fn test_many_values_under_one_key_survive_rehash() {
        let heap = HeapAllocator::new();
        let mut table = MultiHashTable::new_in(&heap);
        for i in 0..200u32 {
            table.insert(42, i).unwrap();
        }
        assert!(table.bucket_count() > 8);
        assert_eq!(table.count(42), 200);
        assert_eq!(table.get_all(42).map(|v| u64::from(*v)).sum::<u64>(), 199 * 200 / 2);
        table.check_invariants();
    }
}
