//! FixedTable: a chained hash table over two caller-owned buffers.
//!
//! `buckets[b]` holds a 1-based index into `entries` (0 = empty bucket).
//! Each entry's `next` is either a chain link (`-1` terminates) or, for a
//! freed slot, an encoded free-list link. Freed slots store
//! `FREE_LIST_BASE - next_free`, which is always `<= -2`, so enumeration can
//! tell tombstones from chain ends without consulting the payload.
//!
//! The table never grows. Capacity equals the buffer length.

use crate::comparer::{DefaultComparer, KeyComparer};
use crate::error::{Error, Result};
use core::fmt;
use core::hash::Hash;
use core::iter::FusedIterator;

const END_OF_CHAIN: i32 = -1;
const FREE_LIST_BASE: i32 = -3;
/// Largest buffer length whose highest slot index still encodes as a
/// free-list link without overflowing `i32`.
const MAX_CAPACITY: usize = (i32::MAX - 1) as usize;

/// One slot of a table's entry buffer.
pub struct Entry<K, V> {
    hash_code: u32,
    next: i32,
    slot: Option<(K, V)>,
}

impl<K, V> Entry<K, V> {
    /// An unused slot. Lets callers build buffers with `[Entry::VACANT; N]`.
    pub const VACANT: Self = Entry {
        hash_code: 0,
        next: END_OF_CHAIN,
        slot: None,
    };

    #[inline]
    fn is_live(&self) -> bool {
        self.next >= END_OF_CHAIN
    }
}

impl<K, V> Default for Entry<K, V> {
    fn default() -> Self {
        Self::VACANT
    }
}

pub struct FixedTable<'a, K, V, C = DefaultComparer> {
    buckets: &'a mut [i32],
    entries: &'a mut [Entry<K, V>],
    // High-water mark of allocated slots; nothing at or past it is referenced.
    live_count: usize,
    free_list: i32,
    free_count: usize,
    fast_mod_multiplier: u64,
    comparer: C,
}

impl<'a, K, V> FixedTable<'a, K, V>
where
    K: Hash + Eq,
{
    pub fn new(buckets: &'a mut [i32], entries: &'a mut [Entry<K, V>]) -> Result<Self> {
        Self::with_comparer(buckets, entries, DefaultComparer::new())
    }
}

impl<'a, K, V, C> FixedTable<'a, K, V, C>
where
    C: KeyComparer<K>,
{
    /// Build a table over `buckets` and `entries`, which must have the same
    /// non-zero length. Both buffers are reset; stale entries are dropped.
    pub fn with_comparer(
        buckets: &'a mut [i32],
        entries: &'a mut [Entry<K, V>],
        comparer: C,
    ) -> Result<Self> {
        if buckets.len() != entries.len() {
            return Err(Error::InvalidArgument(
                "bucket and entry buffers differ in length",
            ));
        }
        if entries.is_empty() {
            return Err(Error::InvalidArgument("fixed buffers must not be empty"));
        }
        if entries.len() > MAX_CAPACITY {
            return Err(Error::InvalidArgument("fixed buffers are too large"));
        }
        buckets.fill(0);
        for e in entries.iter_mut() {
            *e = Entry::VACANT;
        }
        let fast_mod_multiplier = fast_mod_multiplier(buckets.len() as u32);
        Ok(Self {
            buckets,
            entries,
            live_count: 0,
            free_list: END_OF_CHAIN,
            free_count: 0,
            fast_mod_multiplier,
            comparer,
        })
    }

    pub fn comparer(&self) -> &C {
        &self.comparer
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.live_count - self.free_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    #[inline]
    fn hash_of(&self, key: &K) -> u32 {
        (self.comparer.hash_key(key) as u32) & 0x7FFF_FFFF
    }

    #[inline]
    fn bucket_of(&self, hash: u32) -> usize {
        fast_mod(hash, self.buckets.len() as u32, self.fast_mod_multiplier) as usize
    }

    fn find_index(&self, hash: u32, key: &K) -> Option<usize> {
        let mut i = self.buckets[self.bucket_of(hash)] - 1;
        while i >= 0 {
            let e = &self.entries[i as usize];
            if e.hash_code == hash {
                if let Some((k, _)) = &e.slot {
                    if self.comparer.equivalent(k, key) {
                        return Some(i as usize);
                    }
                }
            }
            i = e.next;
        }
        None
    }

    // Caller guarantees the key is absent. Hands the pair back when full.
    fn insert_unique(&mut self, hash: u32, key: K, value: V) -> Result<usize, (K, V)> {
        let index = if self.free_count > 0 {
            let index = self.free_list as usize;
            debug_assert!(self.entries[index].next <= FREE_LIST_BASE - END_OF_CHAIN);
            self.free_list = FREE_LIST_BASE - self.entries[index].next;
            self.free_count -= 1;
            index
        } else if self.live_count < self.entries.len() {
            let index = self.live_count;
            self.live_count += 1;
            index
        } else {
            return Err((key, value));
        };

        let bucket = self.bucket_of(hash);
        let entry = &mut self.entries[index];
        entry.hash_code = hash;
        entry.next = self.buckets[bucket] - 1;
        entry.slot = Some((key, value));
        self.buckets[bucket] = index as i32 + 1;
        Ok(index)
    }

    /// Insert a pair whose key is known to be absent from this table.
    pub(crate) fn insert_new(&mut self, key: K, value: V) -> Result<(), (K, V)> {
        let hash = self.hash_of(&key);
        debug_assert!(self.find_index(hash, &key).is_none());
        self.insert_unique(hash, key, value).map(|_| ())
    }

    /// Add a new entry. Fails with `DuplicateKey` if the key is present and
    /// with `CapacityExceeded` if every slot is taken.
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        let hash = self.hash_of(&key);
        if self.find_index(hash, &key).is_some() {
            return Err(Error::DuplicateKey);
        }
        let capacity = self.capacity();
        self.insert_unique(hash, key, value)
            .map(|_| ())
            .map_err(|_| Error::CapacityExceeded { capacity })
    }

    /// Insert or overwrite. Returns the previous value when the key existed.
    pub fn set(&mut self, key: K, value: V) -> Result<Option<V>> {
        let hash = self.hash_of(&key);
        if let Some(i) = self.find_index(hash, &key) {
            return Ok(self.entries[i]
                .slot
                .as_mut()
                .map(|(_, v)| core::mem::replace(v, value)));
        }
        let capacity = self.capacity();
        self.insert_unique(hash, key, value)
            .map(|_| None)
            .map_err(|_| Error::CapacityExceeded { capacity })
    }

    /// Overwrite the value of an existing key; `KeyNotFound` otherwise.
    pub fn replace(&mut self, key: &K, value: V) -> Result<V> {
        self.get_mut(key)
            .map(|v| core::mem::replace(v, value))
            .ok_or(Error::KeyNotFound)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let i = self.find_index(self.hash_of(key), key)?;
        self.entries[i].slot.as_ref().map(|(_, v)| v)
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let i = self.find_index(self.hash_of(key), key)?;
        self.entries[i].slot.as_ref().map(|(k, v)| (k, v))
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let i = self.find_index(self.hash_of(key), key)?;
        self.entries[i].slot.as_mut().map(|(_, v)| v)
    }

    /// Like `get`, but an absent key is an error.
    pub fn require(&self, key: &K) -> Result<&V> {
        self.get(key).ok_or(Error::KeyNotFound)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find_index(self.hash_of(key), key).is_some()
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.values().any(|v| v == value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Unlink the entry for `key` and push its slot onto the free list.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let hash = self.hash_of(key);
        let bucket = self.bucket_of(hash);
        let mut last = END_OF_CHAIN;
        let mut i = self.buckets[bucket] - 1;
        while i >= 0 {
            let idx = i as usize;
            let e = &self.entries[idx];
            let hit = e.hash_code == hash
                && e
                    .slot
                    .as_ref()
                    .is_some_and(|(k, _)| self.comparer.equivalent(k, key));
            if hit {
                let next = e.next;
                if last < 0 {
                    self.buckets[bucket] = next + 1;
                } else {
                    self.entries[last as usize].next = next;
                }
                let entry = &mut self.entries[idx];
                let pair = entry.slot.take();
                entry.next = FREE_LIST_BASE - self.free_list;
                self.free_list = i;
                self.free_count += 1;
                return pair;
            }
            last = i;
            i = e.next;
        }
        None
    }

    pub fn clear(&mut self) {
        if self.live_count == 0 {
            return;
        }
        self.buckets.fill(0);
        for e in &mut self.entries[..self.live_count] {
            *e = Entry::VACANT;
        }
        self.reset_counters();
    }

    fn reset_counters(&mut self) {
        self.live_count = 0;
        self.free_list = END_OF_CHAIN;
        self.free_count = 0;
    }

    /// Live entries in slot order. Once removals have happened this is not
    /// insertion order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.entries[..self.live_count].iter(),
            remaining: self.len(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let remaining = self.len();
        IterMut {
            it: self.entries[..self.live_count].iter_mut(),
            remaining,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    /// Move every entry out, leaving the table empty. Entries not consumed
    /// before the iterator is dropped are dropped with it.
    pub fn drain(&mut self) -> Drain<'_, K, V> {
        let remaining = self.len();
        let live = self.live_count;
        self.buckets.fill(0);
        self.reset_counters();
        Drain {
            it: self.entries[..live].iter_mut(),
            remaining,
        }
    }
}

impl<'a, K, V, C> fmt::Debug for FixedTable<'a, K, V, C>
where
    K: fmt::Debug,
    V: fmt::Debug,
    C: KeyComparer<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'t, 'a, K, V, C> IntoIterator for &'t FixedTable<'a, K, V, C>
where
    C: KeyComparer<K>,
{
    type Item = (&'t K, &'t V);
    type IntoIter = Iter<'t, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over live entries of a `FixedTable`.
pub struct Iter<'t, K, V> {
    it: core::slice::Iter<'t, Entry<K, V>>,
    remaining: usize,
}

impl<'t, K, V> Iterator for Iter<'t, K, V> {
    type Item = (&'t K, &'t V);

    fn next(&mut self) -> Option<Self::Item> {
        for e in self.it.by_ref() {
            if !e.is_live() {
                continue;
            }
            if let Some((k, v)) = &e.slot {
                self.remaining -= 1;
                return Some((k, v));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Mutable iterator over live entries of a `FixedTable`.
pub struct IterMut<'t, K, V> {
    it: core::slice::IterMut<'t, Entry<K, V>>,
    remaining: usize,
}

impl<'t, K, V> Iterator for IterMut<'t, K, V> {
    type Item = (&'t K, &'t mut V);

    fn next(&mut self) -> Option<Self::Item> {
        for e in self.it.by_ref() {
            if !e.is_live() {
                continue;
            }
            if let Some((k, v)) = &mut e.slot {
                self.remaining -= 1;
                return Some((&*k, v));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// Draining iterator returned by `FixedTable::drain`.
pub struct Drain<'t, K, V> {
    it: core::slice::IterMut<'t, Entry<K, V>>,
    remaining: usize,
}

impl<K, V> Iterator for Drain<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        for e in self.it.by_ref() {
            let live = e.is_live();
            let slot = core::mem::replace(e, Entry::VACANT).slot;
            if !live {
                continue;
            }
            if let Some(pair) = slot {
                self.remaining -= 1;
                return Some(pair);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> Drop for Drain<'_, K, V> {
    fn drop(&mut self) {
        for e in self.it.by_ref() {
            *e = Entry::VACANT;
        }
    }
}

impl<K, V> ExactSizeIterator for Drain<'_, K, V> {}
impl<K, V> FusedIterator for Drain<'_, K, V> {}

// Lemire's fast modulo: exact for every u32 value and non-zero divisor.
#[inline]
fn fast_mod_multiplier(divisor: u32) -> u64 {
    (u64::MAX / u64::from(divisor)).wrapping_add(1)
}

#[inline]
fn fast_mod(value: u32, divisor: u32, multiplier: u64) -> u32 {
    let low = multiplier.wrapping_mul(u64::from(value));
    ((u128::from(low) * u128::from(divisor)) >> 64) as u32
}
