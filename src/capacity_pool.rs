//! CapacityPool: a bounded free list of heap containers kept sorted by
//! capacity.
//!
//! `rent` takes the smallest pooled container whose capacity covers the
//! request (best fit) and `release` puts one back at its sorted position.
//! Both run under one mutex per pool. Neither ever fails: oversized
//! requests are allocated directly, and containers the pool cannot keep are
//! dropped.
//!
//! Payload destructors never run while the mutex is held: containers are
//! cleared before they are inserted and after they are taken out.

use crate::comparer::SharedComparer;
use crate::error::{Error, Result};
use crate::pooled_map::PooledMap;
use core::any::{Any, TypeId};
use log::{debug, trace};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const DEFAULT_MAX_POOL_SIZE: usize = 16;
pub const DEFAULT_MAX_CAPACITY: usize = 1024;

/// A heap container the pool can hand out and take back.
pub trait Poolable: Sized {
    /// Equality semantics rebound on every rent (`()` for lists).
    type Comparer: Clone;

    fn allocate(capacity: usize, comparer: Self::Comparer) -> Self;
    fn capacity(&self) -> usize;
    fn len(&self) -> usize;
    fn clear(&mut self);
    fn rebind(&mut self, comparer: Self::Comparer);
    /// Containers whose comparer cannot be swapped are never pooled.
    fn is_rebindable(&self) -> bool;
    /// Move every element into the empty `dest`, preserving order.
    fn transfer_into(&mut self, dest: &mut Self);
}

impl<T> Poolable for Vec<T> {
    type Comparer = ();

    fn allocate(capacity: usize, _: ()) -> Self {
        Vec::with_capacity(capacity)
    }

    fn capacity(&self) -> usize {
        Vec::capacity(self)
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn clear(&mut self) {
        Vec::clear(self)
    }

    fn rebind(&mut self, _: ()) {}

    fn is_rebindable(&self) -> bool {
        true
    }

    fn transfer_into(&mut self, dest: &mut Self) {
        debug_assert!(dest.is_empty());
        dest.append(self);
    }
}

impl<K, V> Poolable for PooledMap<K, V> {
    type Comparer = SharedComparer<K>;

    fn allocate(capacity: usize, comparer: SharedComparer<K>) -> Self {
        PooledMap::rebindable(capacity, comparer)
    }

    fn capacity(&self) -> usize {
        PooledMap::capacity(self)
    }

    fn len(&self) -> usize {
        PooledMap::len(self)
    }

    fn clear(&mut self) {
        PooledMap::clear(self)
    }

    fn rebind(&mut self, comparer: SharedComparer<K>) {
        self.comparer_cell_mut().rebind(comparer);
    }

    fn is_rebindable(&self) -> bool {
        self.comparer_cell().is_rebindable()
    }

    fn transfer_into(&mut self, dest: &mut Self) {
        PooledMap::transfer_into(self, dest)
    }
}

/// Bounds on what a pool retains.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PoolConfig {
    /// Most containers held at once; further returns are dropped.
    pub max_pool_size: usize,
    /// Largest capacity the pool keeps; bigger rents bypass the pool.
    pub max_capacity: usize,
}

impl PoolConfig {
    pub fn new(max_pool_size: usize, max_capacity: usize) -> Self {
        Self {
            max_pool_size,
            max_capacity,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.max_pool_size == 0 {
            return Err(Error::InvalidArgument("max_pool_size must be non-zero"));
        }
        if self.max_capacity == 0 {
            return Err(Error::InvalidArgument("max_capacity must be non-zero"));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_POOL_SIZE, DEFAULT_MAX_CAPACITY)
    }
}

/// Counters describing how a pool has been used.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PoolStats {
    /// Containers currently held.
    pub pooled: usize,
    /// Rents served from the pool.
    pub rent_hits: u64,
    /// Rents that found no large enough container and allocated.
    pub rent_misses: u64,
    /// Rents above `max_capacity`, allocated without touching the pool.
    pub oversized_rents: u64,
    pub returns_accepted: u64,
    pub returns_discarded: u64,
}

struct Slots<C> {
    // Ascending by capacity.
    sorted: Vec<C>,
    stats: PoolStats,
}

pub struct CapacityPool<C> {
    config: PoolConfig,
    slots: Mutex<Slots<C>>,
}

impl<C: Poolable> CapacityPool<C> {
    pub fn new() -> Self {
        Self::build(PoolConfig::default())
    }

    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: PoolConfig) -> Self {
        Self {
            config,
            slots: Mutex::new(Slots {
                sorted: Vec::with_capacity(config.max_pool_size),
                stats: PoolStats::default(),
            }),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Slots<C>> {
        // Every critical section leaves `sorted` ordered, so a poisoned lock
        // still guards consistent state.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand out an empty container with capacity of at least `required`,
    /// bound to `comparer`.
    pub fn rent(&self, required: usize, comparer: C::Comparer) -> C {
        if required > self.config.max_capacity {
            self.lock().stats.oversized_rents += 1;
            trace!(
                "rent of {} exceeds pooled maximum {}; allocating directly",
                required,
                self.config.max_capacity
            );
            return C::allocate(required, comparer);
        }

        let found = {
            let mut slots = self.lock();
            let i = slots.sorted.partition_point(|c| c.capacity() < required);
            if i < slots.sorted.len() {
                slots.stats.rent_hits += 1;
                Some(slots.sorted.remove(i))
            } else {
                slots.stats.rent_misses += 1;
                None
            }
        };

        match found {
            Some(mut c) => {
                c.clear();
                c.rebind(comparer);
                c
            }
            None => C::allocate(required, comparer),
        }
    }

    /// Take a container back. Oversized, foreign, or surplus containers are
    /// dropped.
    pub fn release(&self, mut container: C) {
        let capacity = container.capacity();
        if capacity > self.config.max_capacity || !container.is_rebindable() {
            self.lock().stats.returns_discarded += 1;
            trace!("discarding returned container of capacity {}", capacity);
            return;
        }

        container.clear();
        let rejected = {
            let mut slots = self.lock();
            if slots.sorted.len() >= self.config.max_pool_size {
                slots.stats.returns_discarded += 1;
                Some(container)
            } else {
                let i = slots.sorted.partition_point(|c| c.capacity() <= capacity);
                slots.sorted.insert(i, container);
                slots.stats.returns_accepted += 1;
                None
            }
        };
        if rejected.is_some() {
            trace!("pool full; dropping container of capacity {}", capacity);
        }
    }

    /// Containers currently held.
    pub fn len(&self) -> usize {
        self.lock().sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacities of the pooled containers, ascending.
    pub fn capacities(&self) -> Vec<usize> {
        self.lock().sorted.iter().map(Poolable::capacity).collect()
    }

    pub fn stats(&self) -> PoolStats {
        let slots = self.lock();
        PoolStats {
            pooled: slots.sorted.len(),
            ..slots.stats
        }
    }

    /// Drop every pooled container.
    pub fn purge(&self) {
        let drained = core::mem::take(&mut self.lock().sorted);
        drop(drained);
    }
}

impl<C: Poolable> Default for CapacityPool<C> {
    fn default() -> Self {
        Self::new()
    }
}

type Registry = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

static SHARED_POOLS: Lazy<Mutex<Registry>> = Lazy::new(|| Mutex::new(HashMap::new()));

impl<C> CapacityPool<C>
where
    C: Poolable + Send + 'static,
{
    /// The process-wide pool for containers of type `C`. Created on first
    /// use with the default configuration and never torn down.
    pub fn shared() -> Arc<Self> {
        let mut registry = SHARED_POOLS.lock().unwrap_or_else(PoisonError::into_inner);
        let pool = registry
            .entry(TypeId::of::<C>())
            .or_insert_with(|| {
                debug!(
                    "creating shared pool for {}",
                    core::any::type_name::<C>()
                );
                let pool: Arc<dyn Any + Send + Sync> = Arc::new(Self::new());
                pool
            })
            .clone();
        match pool.downcast::<Self>() {
            Ok(pool) => pool,
            Err(_) => unreachable!("shared pools are keyed by container type"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparer::{default_shared, FnComparer};

    fn returned(pool: &CapacityPool<Vec<u8>>, capacities: &[usize]) {
        for &c in capacities {
            pool.release(Vec::with_capacity(c));
        }
    }

    #[test]
    fn returns_are_kept_sorted() {
        let pool = CapacityPool::<Vec<u8>>::new();
        returned(&pool, &[64, 8, 32, 8, 128, 16]);
        assert_eq!(pool.capacities(), vec![8, 8, 16, 32, 64, 128]);
    }

    #[test]
    fn rent_picks_smallest_sufficient_container() {
        let pool = CapacityPool::<Vec<u8>>::new();
        let small = Vec::<u8>::with_capacity(10);
        let mid = Vec::<u8>::with_capacity(20);
        let big = Vec::<u8>::with_capacity(40);
        let mid_ptr = mid.as_ptr();
        pool.release(big);
        pool.release(small);
        pool.release(mid);

        let got = pool.rent(15, ());
        assert_eq!(got.as_ptr(), mid_ptr);
        assert_eq!(pool.capacities(), vec![10, 40]);
        assert_eq!(pool.stats().rent_hits, 1);
    }

    #[test]
    fn rent_without_fit_allocates() {
        let pool = CapacityPool::<Vec<u8>>::new();
        returned(&pool, &[4, 8]);
        let got = pool.rent(100, ());
        assert!(got.capacity() >= 100);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.stats().rent_misses, 1);
    }

    #[test]
    fn pool_size_is_bounded() {
        let pool = CapacityPool::<Vec<u8>>::new();
        let caps: Vec<usize> = (1..=DEFAULT_MAX_POOL_SIZE + 1).collect();
        returned(&pool, &caps);
        assert_eq!(pool.len(), DEFAULT_MAX_POOL_SIZE);
        assert!(!pool.capacities().contains(&(DEFAULT_MAX_POOL_SIZE + 1)));
        let stats = pool.stats();
        assert_eq!(stats.returns_accepted, DEFAULT_MAX_POOL_SIZE as u64);
        assert_eq!(stats.returns_discarded, 1);

        // The dropped container cannot come back: this is a miss.
        let _ = pool.rent(DEFAULT_MAX_POOL_SIZE + 1, ());
        assert_eq!(pool.stats().rent_misses, 1);
    }

    #[test]
    fn oversized_containers_bypass_the_pool() {
        let pool = CapacityPool::<Vec<u8>>::with_config(PoolConfig::new(4, 64)).unwrap();
        let v = pool.rent(65, ());
        assert!(v.capacity() >= 65);
        assert_eq!(pool.stats().oversized_rents, 1);
        pool.release(v);
        assert!(pool.is_empty());
        assert_eq!(pool.stats().returns_discarded, 1);
    }

    #[test]
    fn returned_containers_come_back_empty() {
        let pool = CapacityPool::<Vec<String>>::new();
        let mut v = pool.rent(4, ());
        v.push("payload".into());
        pool.release(v);
        let v = pool.rent(1, ());
        assert!(v.is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(matches!(
            CapacityPool::<Vec<u8>>::with_config(PoolConfig::new(0, 10)),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            CapacityPool::<Vec<u8>>::with_config(PoolConfig::new(10, 0)),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn maps_are_rebound_on_rent() {
        let pool = CapacityPool::<PooledMap<u32, u32>>::new();
        let mut m = pool.rent(8, default_shared());
        m.insert(1, 1).unwrap();
        m.insert(11, 11).unwrap();
        pool.release(m);

        let mod10: SharedComparer<u32> = Arc::new(FnComparer::new(
            |k: &u32| u64::from(*k % 10),
            |a: &u32, b: &u32| a % 10 == b % 10,
        ));
        let mut m = pool.rent(8, mod10);
        assert!(m.is_empty());
        m.insert(1, 1).unwrap();
        assert_eq!(m.insert(11, 11), Err(Error::DuplicateKey));
    }

    #[test]
    fn foreign_maps_are_never_pooled() {
        let pool = CapacityPool::<PooledMap<u32, u32>>::new();
        pool.release(PooledMap::with_capacity(8, default_shared()));
        assert!(pool.is_empty());
        assert_eq!(pool.stats().returns_discarded, 1);
    }

    #[test]
    fn shared_pool_is_a_singleton_per_type() {
        let a = CapacityPool::<Vec<(u16, u64)>>::shared();
        let b = CapacityPool::<Vec<(u16, u64)>>::shared();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn concurrent_rent_and_release_keep_order() {
        let pool = CapacityPool::<Vec<u64>>::new();
        std::thread::scope(|s| {
            for t in 0..4usize {
                let pool = &pool;
                s.spawn(move || {
                    for i in 0..200usize {
                        let v = pool.rent(1 + (i * 7 + t) % 300, ());
                        pool.release(v);
                    }
                });
            }
        });
        let caps = pool.capacities();
        assert!(caps.len() <= DEFAULT_MAX_POOL_SIZE);
        assert!(caps.windows(2).all(|w| w[0] <= w[1]));
    }
}
