//! Insertion-ordered record storage with a side-car hash index.
//!
//! Records live contiguously in a `Vec`. A separate open-addressing table maps
//! each record's key hash to its position. The table is sized at twice the
//! logical capacity, so it is never more than half full and every probe
//! sequence reaches an empty slot. Appends place one entry; removals and
//! growth rebuild the table from scratch, so there are no tombstones.

use super::{sort::quick_sort, Keyed};
use crate::error::{AppError, AppResult};

const INITIAL_CAPACITY: usize = 4;

#[derive(Debug, Clone, Copy)]
struct Slot {
    hash: u64,
    position: usize,
}

/// Growable record array with O(1) expected lookup by key
#[derive(Debug, Clone)]
pub struct IndexedCollection<T> {
    records: Vec<T>,
    capacity: usize,
    table: Vec<Option<Slot>>,
    /// Set by deferred inserts until the next full rebuild
    stale: bool,
}

impl<T: Keyed> IndexedCollection<T> {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
            table: vec![None; capacity * 2],
            stale: false,
        }
    }

    /// Append a record, keeping the index current.
    ///
    /// No duplicate-key check happens here. With duplicate keys, lookups
    /// resolve to the earliest inserted record.
    pub fn insert(&mut self, record: T) {
        let resized = self.reserve_slot();
        self.records.push(record);
        if resized || self.stale {
            self.rebuild_index();
        } else {
            self.index_position(self.records.len() - 1);
        }
    }

    /// Append without touching the index. Call [`rebuild_index`] once the
    /// batch is complete; until then lookups fall back to a linear scan.
    ///
    /// [`rebuild_index`]: IndexedCollection::rebuild_index
    pub fn insert_deferred(&mut self, record: T) {
        self.reserve_slot();
        self.records.push(record);
        self.stale = true;
    }

    /// Remove the record at `position`, shifting later records left.
    pub fn remove_at(&mut self, position: usize) -> AppResult<T> {
        if position >= self.records.len() {
            return Err(AppError::IndexOutOfRange {
                index: position,
                len: self.records.len(),
            });
        }
        let removed = self.records.remove(position);
        self.rebuild_index();
        Ok(removed)
    }

    /// Mutate the record at `position` in place.
    ///
    /// If the mutation changes the key's hash the index is rebuilt.
    pub fn update_at<R>(&mut self, position: usize, update: impl FnOnce(&mut T) -> R) -> AppResult<R> {
        let len = self.records.len();
        let record = self
            .records
            .get_mut(position)
            .ok_or(AppError::IndexOutOfRange { index: position, len })?;
        let before = T::hash_key(record.key());
        let result = update(record);
        if T::hash_key(record.key()) != before {
            self.rebuild_index();
        }
        Ok(result)
    }

    /// Replace the record at `position`, returning the previous one.
    pub fn replace_at(&mut self, position: usize, record: T) -> AppResult<T> {
        self.update_at(position, |slot| std::mem::replace(slot, record))
    }

    /// Probe the index for `key`, returning the record's position.
    pub fn hash_lookup(&self, key: &T::Key) -> Option<usize> {
        if self.stale {
            return self.records.iter().position(|r| r.key() == key);
        }

        let hash = T::hash_key(key);
        let size = self.table.len();
        let mut slot = (hash % size as u64) as usize;
        for _ in 0..size {
            match self.table[slot] {
                None => return None,
                Some(entry) => {
                    if entry.hash == hash && self.records[entry.position].key() == key {
                        return Some(entry.position);
                    }
                }
            }
            slot = (slot + 1) % size;
        }
        None
    }

    pub fn find(&self, key: &T::Key) -> Option<&T> {
        self.hash_lookup(key).map(|position| &self.records[position])
    }

    pub fn contains_key(&self, key: &T::Key) -> bool {
        self.hash_lookup(key).is_some()
    }

    /// Rebuild the whole index from the backing array
    pub fn rebuild_index(&mut self) {
        self.table.iter_mut().for_each(|slot| *slot = None);
        for position in 0..self.records.len() {
            self.index_position(position);
        }
        self.stale = false;
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.rebuild_index();
    }

    fn index_position(&mut self, position: usize) {
        let hash = T::hash_key(self.records[position].key());
        let size = self.table.len();
        let mut slot = (hash % size as u64) as usize;
        while self.table[slot].is_some() {
            slot = (slot + 1) % size;
        }
        self.table[slot] = Some(Slot { hash, position });
    }

    /// Double capacity when full. Returns true if the table was reallocated.
    fn reserve_slot(&mut self) -> bool {
        if self.records.len() < self.capacity {
            return false;
        }
        self.capacity *= 2;
        self.records.reserve_exact(self.capacity - self.records.len());
        self.table = vec![None; self.capacity * 2];
        true
    }
}

impl<T> IndexedCollection<T> {
    pub fn get(&self, position: usize) -> Option<&T> {
        self.records.get(position)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn table_size(&self) -> usize {
        self.table.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.records
    }

    /// Sorted copy of the records; the collection itself is untouched.
    pub fn sorted_view<F>(&self, less: F) -> Vec<T>
    where
        T: Clone,
        F: FnMut(&T, &T) -> bool,
    {
        let mut sorted = self.records.clone();
        quick_sort(&mut sorted, less);
        sorted
    }
}

impl<T: Keyed> Default for IndexedCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed> FromIterator<T> for IndexedCollection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut collection = Self::new();
        for record in iter {
            collection.insert_deferred(record);
        }
        collection.rebuild_index();
        collection
    }
}

impl<'a, T> IntoIterator for &'a IndexedCollection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Binary search over a caller-sorted slice.
///
/// Returns the first position whose key is equivalent to `target`, where
/// equivalence is `!less(a, b) && !less(b, a)`.
pub fn binary_search_sorted<'a, T, K, F, C>(
    sorted: &'a [T],
    target: &K,
    key_of: F,
    mut less: C,
) -> Option<usize>
where
    K: ?Sized + 'a,
    F: Fn(&'a T) -> &'a K,
    C: FnMut(&K, &K) -> bool,
{
    let mut low = 0;
    let mut high = sorted.len();
    while low < high {
        let mid = low + (high - low) / 2;
        if less(key_of(&sorted[mid]), target) {
            low = mid + 1;
        } else {
            high = mid;
        }
    }
    match sorted.get(low) {
        Some(record) if !less(target, key_of(record)) => Some(low),
        _ => None,
    }
}
