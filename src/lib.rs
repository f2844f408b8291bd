//! tiered-collections: maps and lists that live in caller-provided fixed
//! buffers and spill into pooled heap containers only when those buffers
//! run out.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep the common small case allocation-free and make the large
//!   case reuse heap storage across call sites.
//! - Layers:
//!   - FixedTable<K, V, C> / FixedList<T>: bounded containers over borrowed
//!     buffers. They never allocate and never grow; a full container reports
//!     `CapacityExceeded`.
//!   - CapacityPool<C>: a bounded free list of heap containers sorted by
//!     capacity. `rent` is best fit, `release` is a sorted insert.
//!   - Elastic<C>: one pool-rented container that re-rents a larger one when
//!     it runs out of room, moving its contents across in order.
//!   - HybridMap / HybridList: a fixed tier in front of a lazily rented
//!     elastic tier.
//!
//! Constraints
//! - Data only flows upward: a hybrid touches its elastic tier only once the
//!   fixed tier is full, and an elastic container touches the pool only when
//!   its own capacity is insufficient.
//! - The fixed tier is full whenever the elastic tier is non-empty. Removals
//!   from the fixed tier backfill from the elastic tier immediately.
//! - Failed operations leave the container exactly as it was.
//! - Pools never fail: oversized requests allocate directly and surplus
//!   returns are dropped.
//!
//! Tombstones
//! - A FixedTable entry's `next` is a chain link (`>= -1`) while live and an
//!   encoded free-list link (`<= -2`) once freed. Enumeration skips the
//!   latter without inspecting the payload.
//!
//! Comparers
//! - Equality and hashing go through `KeyComparer`, not `K: Hash + Eq`.
//!   Pooled maps hold their comparer in a `ComparerCell` that is rebound on
//!   every rent, so one allocation can serve unrelated call sites. Maps built
//!   outside the pool carry a fixed cell and are never retained by it.
//!
//! Threading
//! - Containers are plain owned values with `&mut self` mutation and no
//!   internal synchronization. Pools are `Sync`: each holds one mutex, and
//!   payload destructors never run while it is held.
//! - `CapacityPool::shared()` is a lazily created, never torn down pool per
//!   container type. Tests and embedders can inject their own pool instead.
//!
//! Notes and non-goals
//! - Tier-one buffers are borrowed, so a hybrid cannot outlive them.
//! - Which elastic entry migrates into a freed fixed slot is unspecified
//!   beyond "first in enumeration order".

pub mod capacity_pool;
pub mod comparer;
pub mod elastic;
pub mod error;
pub mod fixed_list;
pub mod fixed_table;
#[cfg(test)]
mod fixed_table_proptest;
pub mod hybrid_list;
pub mod hybrid_map;
pub mod pooled_map;

// Public surface
pub use capacity_pool::{CapacityPool, PoolConfig, PoolStats, Poolable};
pub use comparer::{default_shared, ComparerCell, DefaultComparer, FnComparer, KeyComparer, SharedComparer};
pub use elastic::{Elastic, ElasticList, ElasticMap};
pub use error::{Error, Result};
pub use fixed_list::FixedList;
pub use fixed_table::{Entry, FixedTable};
pub use hybrid_list::HybridList;
pub use hybrid_map::HybridMap;
pub use pooled_map::PooledMap;
