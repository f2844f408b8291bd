//! HybridMap: a `FixedTable` over caller buffers, spilling into a pooled
//! `ElasticMap` once the table is full.
//!
//! Invariant: whenever the elastic tier holds entries, the fixed tier is
//! full. Removing from the fixed tier immediately pulls the first entry of
//! the elastic tier back into the freed slot. Both tiers share one
//! `SharedComparer`, so a key is equal in one tier exactly when it is equal
//! in the other.

use crate::capacity_pool::CapacityPool;
use crate::comparer::{default_shared, SharedComparer};
use crate::elastic::{Elastic, ElasticMap};
use crate::error::{Error, Result};
use crate::fixed_table::{Entry, FixedTable};
use crate::pooled_map::PooledMap;
use core::fmt;
use core::hash::Hash;
use log::debug;
use std::sync::Arc;

pub struct HybridMap<'a, K, V> {
    tier1: FixedTable<'a, K, V, SharedComparer<K>>,
    tier2: Option<ElasticMap<K, V>>,
    pool: Arc<CapacityPool<PooledMap<K, V>>>,
    tier2_capacity: usize,
}

impl<'a, K, V> HybridMap<'a, K, V>
where
    K: Hash + Eq + Send + 'static,
    V: Send + 'static,
{
    /// A hybrid map using the key's own `Hash`/`Eq` and the shared pool.
    pub fn new(buckets: &'a mut [i32], entries: &'a mut [Entry<K, V>]) -> Result<Self> {
        Self::with_comparer(buckets, entries, default_shared())
    }
}

impl<'a, K, V> HybridMap<'a, K, V>
where
    K: Send + 'static,
    V: Send + 'static,
{
    pub fn with_comparer(
        buckets: &'a mut [i32],
        entries: &'a mut [Entry<K, V>],
        comparer: SharedComparer<K>,
    ) -> Result<Self> {
        Self::with_pool(buckets, entries, comparer, CapacityPool::shared())
    }
}

impl<'a, K, V> HybridMap<'a, K, V> {
    /// Build over caller buffers, renting the elastic tier from `pool`.
    pub fn with_pool(
        buckets: &'a mut [i32],
        entries: &'a mut [Entry<K, V>],
        comparer: SharedComparer<K>,
        pool: Arc<CapacityPool<PooledMap<K, V>>>,
    ) -> Result<Self> {
        let tier1 = FixedTable::with_comparer(buckets, entries, comparer)?;
        let tier2_capacity = tier1.capacity();
        Ok(Self {
            tier1,
            tier2: None,
            pool,
            tier2_capacity,
        })
    }

    /// Capacity requested when the elastic tier is first rented. Defaults to
    /// the fixed tier's capacity.
    pub fn with_tier2_capacity(mut self, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidArgument("capacity must be non-zero"));
        }
        self.tier2_capacity = capacity;
        Ok(self)
    }

    pub fn comparer(&self) -> &SharedComparer<K> {
        self.tier1.comparer()
    }

    pub fn len(&self) -> usize {
        self.tier1.len() + self.tier2.as_ref().map_or(0, Elastic::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_tier1_full(&self) -> bool {
        self.tier1.is_full()
    }

    pub fn is_tier2_rented(&self) -> bool {
        self.tier2.is_some()
    }

    pub fn tier1_capacity(&self) -> usize {
        self.tier1.capacity()
    }

    fn tier2_mut(&mut self) -> &mut ElasticMap<K, V> {
        let Self {
            tier1,
            tier2,
            pool,
            tier2_capacity,
        } = self;
        tier2.get_or_insert_with(|| {
            debug!(
                "fixed tier full at {} entries; renting elastic tier of {}",
                tier1.capacity(),
                tier2_capacity
            );
            let mut elastic = Elastic::with_pool(pool.clone(), tier1.comparer().clone());
            elastic.re_rent(*tier2_capacity);
            elastic
        })
    }

    /// Add a new entry. Fails with `DuplicateKey` if either tier holds the key.
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        if self.contains_key(&key) {
            return Err(Error::DuplicateKey);
        }
        match self.tier1.insert_new(key, value) {
            Ok(()) => Ok(()),
            Err((key, value)) => self.tier2_mut().insert(key, value),
        }
    }

    /// Insert or overwrite in whichever tier holds the key.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        if let Some(slot) = self.get_mut(&key) {
            return Some(core::mem::replace(slot, value));
        }
        if let Err((key, value)) = self.tier1.insert_new(key, value) {
            return self.tier2_mut().set(key, value);
        }
        None
    }

    pub fn replace(&mut self, key: &K, value: V) -> Result<V> {
        self.get_mut(key)
            .map(|slot| core::mem::replace(slot, value))
            .ok_or(Error::KeyNotFound)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.tier1
            .get(key)
            .or_else(|| self.tier2.as_ref()?.get(key))
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.tier1
            .get_key_value(key)
            .or_else(|| self.tier2.as_ref()?.get_key_value(key))
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        match self.tier1.get_mut(key) {
            Some(v) => Some(v),
            None => self.tier2.as_mut()?.get_mut(key),
        }
    }

    pub fn require(&self, key: &K) -> Result<&V> {
        self.get(key).ok_or(Error::KeyNotFound)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.tier1.contains_key(key) || self.tier2.as_ref().is_some_and(|t| t.contains_key(key))
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.tier1.contains_value(value)
            || self.tier2.as_ref().is_some_and(|t| t.contains_value(value))
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        if let Some(pair) = self.tier1.remove_entry(key) {
            self.backfill();
            return Some(pair);
        }
        self.tier2.as_mut()?.remove_entry(key)
    }

    // Refill the fixed tier's single free slot from the elastic tier.
    fn backfill(&mut self) {
        let Some(tier2) = self.tier2.as_mut() else {
            return;
        };
        if let Some((key, value)) = tier2.take_first() {
            if let Err((key, value)) = self.tier1.insert_new(key, value) {
                let _ = tier2.insert(key, value);
            }
        }
    }

    /// Empty both tiers. A rented elastic tier stays rented.
    pub fn clear(&mut self) {
        self.tier1.clear();
        if let Some(tier2) = self.tier2.as_mut() {
            tier2.clear();
        }
    }

    /// Fixed-tier entries first, then elastic-tier entries.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.tier1
            .iter()
            .chain(self.tier2.iter().flat_map(|t| t.iter()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.tier1
            .iter_mut()
            .chain(self.tier2.iter_mut().flat_map(|t| t.iter_mut()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    /// Move every entry into a plain `Vec`, returning the elastic tier's
    /// backing map to the pool.
    pub fn into_entries(mut self) -> Vec<(K, V)> {
        let mut out = Vec::with_capacity(self.len());
        out.extend(self.tier1.drain());
        if let Some(tier2) = self.tier2.as_mut() {
            out.extend(tier2.drain());
        }
        out
    }

    /// Release the elastic tier, if rented. The caller's buffers keep
    /// whatever the fixed tier held.
    pub fn dispose(self) {}
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for HybridMap<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
