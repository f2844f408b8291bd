//! Elastic: one pool-rented container that re-rents a larger one when full.
//!
//! The backing container is rented on first growth (or eagerly through
//! `with_capacity_in`). Growing rents a container of at least
//! `max(capacity * 2, MIN_GROWTH_CAPACITY, len + additional)`, moves every
//! element across in order, and hands the old container back to the pool.
//! Dropping an `Elastic` returns its backing container exactly once.

use crate::capacity_pool::{CapacityPool, Poolable};
use crate::comparer::SharedComparer;
use crate::error::{Error, Result};
use crate::pooled_map::PooledMap;
use core::fmt;
use log::trace;
use std::sync::Arc;

/// Smallest capacity a growing container rents.
pub const MIN_GROWTH_CAPACITY: usize = 4;

pub struct Elastic<C: Poolable> {
    backing: Option<C>,
    comparer: C::Comparer,
    pool: Arc<CapacityPool<C>>,
}

pub type ElasticMap<K, V> = Elastic<PooledMap<K, V>>;
pub type ElasticList<T> = Elastic<Vec<T>>;

impl<C: Poolable> Elastic<C> {
    /// Nothing is rented until the first insertion.
    pub fn with_pool(pool: Arc<CapacityPool<C>>, comparer: C::Comparer) -> Self {
        Self {
            backing: None,
            comparer,
            pool,
        }
    }

    /// Rent a backing container of at least `capacity` up front.
    pub fn with_capacity_in(
        pool: Arc<CapacityPool<C>>,
        comparer: C::Comparer,
        capacity: usize,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidArgument("capacity must be non-zero"));
        }
        let mut this = Self::with_pool(pool, comparer);
        this.re_rent(capacity);
        Ok(this)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.backing.as_ref().map_or(0, Poolable::len)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.backing.as_ref().map_or(0, Poolable::capacity)
    }

    /// Whether a backing container is currently held.
    pub fn is_rented(&self) -> bool {
        self.backing.is_some()
    }

    pub fn backing(&self) -> Option<&C> {
        self.backing.as_ref()
    }

    pub fn pool(&self) -> &Arc<CapacityPool<C>> {
        &self.pool
    }

    /// Make room for `additional` more elements, re-renting if needed.
    ///
    /// Fails with `CapacityExceeded` and leaves the container untouched when
    /// `len + additional` overflows.
    pub fn try_grow(&mut self, additional: usize) -> Result<()> {
        let needed = self
            .len()
            .checked_add(additional)
            .ok_or(Error::CapacityExceeded {
                capacity: self.capacity(),
            })?;
        self.grow_to(needed);
        Ok(())
    }

    fn grow_to(&mut self, needed: usize) {
        let capacity = self.capacity();
        if needed <= capacity {
            return;
        }
        self.re_rent(
            capacity
                .saturating_mul(2)
                .max(MIN_GROWTH_CAPACITY)
                .max(needed),
        );
    }

    /// Swap in a pooled container of at least `min_capacity`. A no-op when
    /// the current one is already large enough.
    pub fn re_rent(&mut self, min_capacity: usize) {
        if self.backing.is_some() && self.capacity() >= min_capacity {
            return;
        }
        let mut next = self.pool.rent(min_capacity, self.comparer.clone());
        trace!(
            "elastic re-rent: capacity {} -> {}",
            self.capacity(),
            next.capacity()
        );
        if let Some(mut old) = self.backing.take() {
            old.transfer_into(&mut next);
            self.pool.release(old);
        }
        self.backing = Some(next);
    }

    // Room for one more element. `len` is bounded by the backing's
    // allocation, so `len + 1` cannot overflow.
    fn reserve_one(&mut self) -> &mut C {
        self.grow_to(self.len() + 1);
        let (pool, comparer) = (&self.pool, &self.comparer);
        self.backing
            .get_or_insert_with(|| pool.rent(MIN_GROWTH_CAPACITY, comparer.clone()))
    }

    /// Empty the container but keep the rented backing.
    pub fn clear(&mut self) {
        if let Some(b) = self.backing.as_mut() {
            b.clear();
        }
    }

    /// Return the backing container to the pool.
    pub fn dispose(self) {}
}

impl<C: Poolable> Drop for Elastic<C> {
    fn drop(&mut self) {
        if let Some(backing) = self.backing.take() {
            self.pool.release(backing);
        }
    }
}

impl<K, V> Elastic<PooledMap<K, V>>
where
    K: Send + 'static,
    V: Send + 'static,
{
    /// An elastic map drawing from the shared pool for its type.
    pub fn new(comparer: SharedComparer<K>) -> Self {
        Self::with_pool(CapacityPool::shared(), comparer)
    }
}

impl<K, V> Elastic<PooledMap<K, V>> {
    pub fn comparer(&self) -> &SharedComparer<K> {
        &self.comparer
    }

    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        if self.contains_key(&key) {
            return Err(Error::DuplicateKey);
        }
        self.reserve_one().insert(key, value)
    }

    /// Insert or overwrite, returning the previous value.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        if let Some(slot) = self.get_mut(&key) {
            return Some(core::mem::replace(slot, value));
        }
        self.reserve_one().set(key, value)
    }

    pub fn replace(&mut self, key: &K, value: V) -> Result<V> {
        self.get_mut(key)
            .map(|v| core::mem::replace(v, value))
            .ok_or(Error::KeyNotFound)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.backing.as_ref()?.get(key)
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.backing.as_ref()?.get_key_value(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.backing.as_mut()?.get_mut(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.backing.as_ref().is_some_and(|m| m.contains_key(key))
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.backing.as_ref().is_some_and(|m| m.contains_value(value))
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.backing.as_mut()?.remove(key)
    }

    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        self.backing.as_mut()?.remove_entry(key)
    }

    /// Remove the first entry in enumeration order.
    pub fn take_first(&mut self) -> Option<(K, V)> {
        self.backing.as_mut()?.take_first()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.backing.iter().flat_map(|m| m.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.backing.iter_mut().flat_map(|m| m.iter_mut())
    }

    pub fn drain(&mut self) -> impl Iterator<Item = (K, V)> + '_ {
        self.backing.iter_mut().flat_map(|m| m.drain())
    }
}

impl<T> Elastic<Vec<T>>
where
    T: Send + 'static,
{
    /// An elastic list drawing from the shared pool for its type.
    pub fn new() -> Self {
        Self::with_pool(CapacityPool::shared(), ())
    }
}

impl<T: Send + 'static> Default for Elastic<Vec<T>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Elastic<Vec<T>> {
    pub fn as_slice(&self) -> &[T] {
        self.backing.as_deref().unwrap_or(&[])
    }

    pub fn push(&mut self, value: T) {
        self.reserve_one().push(value);
    }

    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        if index > self.len() {
            return Err(Error::InvalidArgument("index out of range"));
        }
        self.reserve_one().insert(index, value);
        Ok(())
    }

    pub fn remove_at(&mut self, index: usize) -> Result<T> {
        match self.backing.as_mut() {
            Some(v) if index < v.len() => Ok(v.remove(index)),
            _ => Err(Error::InvalidArgument("index out of range")),
        }
    }

    pub fn pop(&mut self) -> Option<T> {
        self.backing.as_mut()?.pop()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.backing.as_mut()?.get_mut(index)
    }

    pub fn set(&mut self, index: usize, value: T) -> Result<T> {
        self.get_mut(index)
            .map(|slot| core::mem::replace(slot, value))
            .ok_or(Error::InvalidArgument("index out of range"))
    }

    pub fn index_of(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.as_slice().iter().position(|v| v == value)
    }

    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.as_slice().contains(value)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.backing.iter_mut().flat_map(|v| v.drain(..))
    }
}

impl<C> fmt::Debug for Elastic<C>
where
    C: Poolable + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Elastic")
            .field("backing", &self.backing)
            .finish_non_exhaustive()
    }
}
