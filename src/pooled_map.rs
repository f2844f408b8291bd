//! PooledMap: the heap-backed map that `CapacityPool` hands out.
//!
//! Entries live in a `Vec` in enumeration order; a hashbrown `HashTable`
//! indexes them by position. Each entry keeps its precomputed hash, so moving
//! entries into another map with the same comparer never calls back into
//! the comparer. Removal is swap-remove: the last entry takes the freed
//! position and its index slot is patched.

use crate::comparer::{ComparerCell, SharedComparer};
use crate::error::{Error, Result};
use core::fmt;
use hashbrown::HashTable;

#[derive(Debug)]
struct Bucket<K, V> {
    hash: u64,
    key: K,
    value: V,
}

pub struct PooledMap<K, V> {
    index: HashTable<usize>,
    entries: Vec<Bucket<K, V>>,
    comparer: ComparerCell<K>,
}

impl<K, V> PooledMap<K, V> {
    /// A map built outside the pool. Its comparer is fixed, so the pool will
    /// not retain it when it is returned.
    pub fn with_capacity(capacity: usize, comparer: SharedComparer<K>) -> Self {
        Self::build(capacity, ComparerCell::fixed(comparer))
    }

    pub(crate) fn rebindable(capacity: usize, comparer: SharedComparer<K>) -> Self {
        Self::build(capacity, ComparerCell::rebindable(comparer))
    }

    fn build(capacity: usize, comparer: ComparerCell<K>) -> Self {
        Self {
            index: HashTable::with_capacity(capacity),
            entries: Vec::with_capacity(capacity),
            comparer,
        }
    }

    pub fn comparer(&self) -> &SharedComparer<K> {
        self.comparer.get()
    }

    pub(crate) fn comparer_cell(&self) -> &ComparerCell<K> {
        &self.comparer
    }

    pub(crate) fn comparer_cell_mut(&mut self) -> &mut ComparerCell<K> {
        &mut self.comparer
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries the map holds before its storage reallocates.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    fn find(&self, hash: u64, key: &K) -> Option<usize> {
        let cmp = self.comparer.get();
        let entries = &self.entries;
        self.index
            .find(hash, |&i| cmp.equivalent(&entries[i].key, key))
            .copied()
    }

    fn push_unique(&mut self, hash: u64, key: K, value: V) {
        let i = self.entries.len();
        self.entries.push(Bucket { hash, key, value });
        let entries = &self.entries;
        self.index.insert_unique(hash, i, |&j| entries[j].hash);
    }

    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        let hash = self.comparer.get().hash_key(&key);
        if self.find(hash, &key).is_some() {
            return Err(Error::DuplicateKey);
        }
        self.push_unique(hash, key, value);
        Ok(())
    }

    /// Insert or overwrite, returning the previous value.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.comparer.get().hash_key(&key);
        match self.find(hash, &key) {
            Some(i) => Some(core::mem::replace(&mut self.entries[i].value, value)),
            None => {
                self.push_unique(hash, key, value);
                None
            }
        }
    }

    pub fn replace(&mut self, key: &K, value: V) -> Result<V> {
        self.get_mut(key)
            .map(|v| core::mem::replace(v, value))
            .ok_or(Error::KeyNotFound)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let i = self.find(self.comparer.get().hash_key(key), key)?;
        Some(&self.entries[i].value)
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let i = self.find(self.comparer.get().hash_key(key), key)?;
        let b = &self.entries[i];
        Some((&b.key, &b.value))
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let i = self.find(self.comparer.get().hash_key(key), key)?;
        Some(&mut self.entries[i].value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(self.comparer.get().hash_key(key), key).is_some()
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.entries.iter().any(|b| b.value == *value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let hash = self.comparer.get().hash_key(key);
        let cmp = self.comparer.get();
        let entries = &self.entries;
        let (i, _) = self
            .index
            .find_entry(hash, |&i| cmp.equivalent(&entries[i].key, key))
            .ok()?
            .remove();
        Some(self.swap_remove_index(i))
    }

    /// Remove the first entry in enumeration order.
    pub fn take_first(&mut self) -> Option<(K, V)> {
        let hash = self.entries.first()?.hash;
        if let Ok(slot) = self.index.find_entry(hash, |&j| j == 0) {
            slot.remove();
        }
        Some(self.swap_remove_index(0))
    }

    // The index slot for `i` must already be gone.
    fn swap_remove_index(&mut self, i: usize) -> (K, V) {
        let last = self.entries.len() - 1;
        if i != last {
            let moved = self.entries[last].hash;
            if let Some(slot) = self.index.find_mut(moved, |&j| j == last) {
                *slot = i;
            }
        }
        let b = self.entries.swap_remove(i);
        (b.key, b.value)
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.entries.clear();
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.entries.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> impl ExactSizeIterator<Item = (&K, &mut V)> {
        self.entries.iter_mut().map(|b| (&b.key, &mut b.value))
    }

    /// Move every entry out in enumeration order.
    pub fn drain(&mut self) -> impl ExactSizeIterator<Item = (K, V)> + '_ {
        self.index.clear();
        self.entries.drain(..).map(|b| (b.key, b.value))
    }

    /// Move every entry into `dest`, keeping enumeration order and reusing
    /// the stored hashes. `dest` must be empty and hash keys the same way.
    pub(crate) fn transfer_into(&mut self, dest: &mut Self) {
        debug_assert!(dest.is_empty());
        self.index.clear();
        for b in self.entries.drain(..) {
            dest.push_unique(b.hash, b.key, b.value);
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for PooledMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Iterator over a `PooledMap` in enumeration order.
pub struct Iter<'m, K, V> {
    it: core::slice::Iter<'m, Bucket<K, V>>,
}

impl<'m, K, V> Iterator for Iter<'m, K, V> {
    type Item = (&'m K, &'m V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|b| (&b.key, &b.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
