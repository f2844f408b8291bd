//! HybridList: a `FixedList` over a caller buffer followed by a pooled
//! `ElasticList`.
//!
//! Logical index `i` lives in the fixed tier when `i < tier1.len()` and in
//! the elastic tier at `i - tier1.len()` otherwise. The fixed tier stays full
//! while the elastic tier is non-empty: inserting into a full fixed tier
//! pushes its last element to the front of the elastic tier, and removing
//! from the fixed tier pulls the elastic tier's first element back.

use crate::capacity_pool::CapacityPool;
use crate::elastic::{Elastic, ElasticList};
use crate::error::{Error, Result};
use crate::fixed_list::FixedList;
use core::fmt;
use log::debug;
use std::sync::Arc;

pub struct HybridList<'a, T> {
    tier1: FixedList<'a, T>,
    tier2: Option<ElasticList<T>>,
    pool: Arc<CapacityPool<Vec<T>>>,
    tier2_capacity: usize,
}

impl<'a, T: Send + 'static> HybridList<'a, T> {
    pub fn new(slots: &'a mut [Option<T>]) -> Result<Self> {
        Self::with_pool(slots, CapacityPool::shared())
    }
}

impl<'a, T> HybridList<'a, T> {
    pub fn with_pool(slots: &'a mut [Option<T>], pool: Arc<CapacityPool<Vec<T>>>) -> Result<Self> {
        let tier1 = FixedList::new(slots)?;
        let tier2_capacity = tier1.capacity();
        Ok(Self {
            tier1,
            tier2: None,
            pool,
            tier2_capacity,
        })
    }

    /// Capacity requested when the elastic tier is first rented.
    pub fn with_tier2_capacity(mut self, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidArgument("capacity must be non-zero"));
        }
        self.tier2_capacity = capacity;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.tier1.len() + self.tier2_len()
    }

    fn tier2_len(&self) -> usize {
        self.tier2.as_ref().map_or(0, Elastic::len)
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

    fn tier2_mut(&mut self) -> &mut ElasticList<T> {
        let Self {
            tier1,
            tier2,
            pool,
            tier2_capacity,
        } = self;
        tier2.get_or_insert_with(|| {
            debug!(
                "fixed tier full at {} elements; renting elastic tier of {}",
                tier1.capacity(),
                tier2_capacity
            );
            let mut elastic = Elastic::with_pool(pool.clone(), ());
            elastic.re_rent(*tier2_capacity);
            elastic
        })
    }

    pub fn push(&mut self, value: T) {
        if let Err(value) = self.tier1.try_push(value) {
            self.tier2_mut().push(value);
        }
    }

    pub fn pop(&mut self) -> Option<T> {
        match self.tier2.as_mut().and_then(|t| t.pop()) {
            Some(v) => Some(v),
            None => self.tier1.pop(),
        }
    }

    /// Insert at `index`, shifting later elements right across both tiers.
    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        if index > self.len() {
            return Err(Error::InvalidArgument("index out of range"));
        }
        let fixed = self.tier1.capacity();
        if index >= fixed {
            return self.tier2_mut().insert(index - fixed, value);
        }
        if self.tier1.is_full() {
            if let Some(evicted) = self.tier1.pop() {
                self.tier2_mut().insert(0, evicted)?;
            }
        }
        self.tier1.insert(index, value)
    }

    /// Remove the element at `index`, shifting later elements left across
    /// both tiers.
    pub fn remove_at(&mut self, index: usize) -> Result<T> {
        if index >= self.len() {
            return Err(Error::InvalidArgument("index out of range"));
        }
        let split = self.tier1.len();
        let Some(tier2) = self.tier2.as_mut() else {
            return self.tier1.remove_at(index);
        };
        if index >= split {
            return tier2.remove_at(index - split);
        }
        let removed = self.tier1.remove_at(index)?;
        if !tier2.is_empty() {
            let first = tier2.remove_at(0)?;
            if let Err(first) = self.tier1.try_push(first) {
                tier2.insert(0, first)?;
            }
        }
        Ok(removed)
    }

    /// Remove the first element equal to `value`.
    pub fn remove(&mut self, value: &T) -> bool
    where
        T: PartialEq,
    {
        match self.index_of(value) {
            Some(i) => self.remove_at(i).is_ok(),
            None => false,
        }
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        let split = self.tier1.len();
        if index < split {
            self.tier1.get(index)
        } else {
            self.tier2.as_ref()?.get(index - split)
        }
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        let split = self.tier1.len();
        if index < split {
            self.tier1.get_mut(index)
        } else {
            self.tier2.as_mut()?.get_mut(index - split)
        }
    }

    /// Overwrite the element at `index`, returning the old one.
    pub fn set(&mut self, index: usize, value: T) -> Result<T> {
        self.get_mut(index)
            .map(|slot| core::mem::replace(slot, value))
            .ok_or(Error::InvalidArgument("index out of range"))
    }

    pub fn index_of(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.iter().position(|v| v == value)
    }

    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.iter().any(|v| v == value)
    }

    /// Empty both tiers. A rented elastic tier stays rented.
    pub fn clear(&mut self) {
        self.tier1.clear();
        if let Some(tier2) = self.tier2.as_mut() {
            tier2.clear();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.tier1
            .iter()
            .chain(self.tier2.iter().flat_map(|t| t.iter()))
    }

    /// Move every element into a plain `Vec` in list order.
    pub fn into_vec(mut self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len());
        out.extend(self.tier1.drain());
        if let Some(tier2) = self.tier2.as_mut() {
            out.extend(tier2.drain());
        }
        out
    }

    /// Release the elastic tier, if rented.
    pub fn dispose(self) {}
}

impl<T: fmt::Debug> fmt::Debug for HybridList<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
