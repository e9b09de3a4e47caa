//! Single-value hash table

use core::fmt;

use basalt_memory::allocator::Allocator;
use basalt_memory::error::MemoryResult;

use super::raw::{Entry, RawTable};

/// A `u64`-keyed map holding at most one value per key
///
/// Entries live in one dense array, so iteration is a linear scan. Removal
/// fills the hole with the last entry, which changes iteration order.
///
/// # Examples
///
/// ```
/// use basalt_collections::HashTable;
/// use basalt_memory::allocator::HeapAllocator;
///
/// let heap = HeapAllocator::new();
/// let mut table = HashTable::new_in(&heap);
/// table.set(7, "seven")?;
/// table.set(7, "SEVEN")?;
///
/// assert_eq!(table.len(), 1);
/// assert_eq!(table.get_or(7, ""), "SEVEN");
/// assert_eq!(table.get_or(8, "missing"), "missing");
/// # Ok::<(), basalt_memory::MemoryError>(())
/// ```
pub struct HashTable<T: Copy, A: Allocator + Clone> {
    raw: RawTable<T, A>,
}

impl<T: Copy, A: Allocator + Clone> HashTable<T, A> {
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

    /// Number of entries
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

    /// True if `key` is present
    pub fn has(&self, key: u64) -> bool {
        self.raw.find(key).index.is_some()
    }

    /// The value stored under `key`
    pub fn get(&self, key: u64) -> Option<&T> {
        let index = self.raw.find(key).index?;
        Some(self.raw.entries()[index].value())
    }

    /// The value stored under `key`, or `default`
    pub fn get_or(&self, key: u64, default: T) -> T {
        self.get(key).copied().unwrap_or(default)
    }

    /// Mutable access to the value stored under `key`
    pub fn get_mut(&mut self, key: u64) -> Option<&mut T> {
        let index = self.raw.find(key).index?;
        Some(self.raw.value_mut(index))
    }

    /// Stores `value` under `key`, replacing any previous value
    ///
    /// # Errors
    /// Fails only when growing storage fails; the table is then unchanged.
    pub fn set(&mut self, key: u64, value: T) -> MemoryResult<()> {
        self.raw.set(key, value)
    }

    /// Removes `key`; returns whether it was present
    pub fn remove(&mut self, key: u64) -> bool {
        self.raw.remove(key).is_some()
    }

    /// Removes `key` and returns its value
    pub fn take(&mut self, key: u64) -> Option<T> {
        self.raw.remove(key).map(|entry| *entry.value())
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

    /// Iterates keys in storage order
    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.raw.entries().iter().map(Entry::key)
    }

    /// Iterates values in storage order
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.raw.entries().iter().map(Entry::value)
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        self.raw.check_invariants();
    }
}

impl<T: Copy + fmt::Debug, A: Allocator + Clone> fmt::Debug for HashTable<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
