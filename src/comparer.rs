//! Key equality and hashing, decoupled from the key type.
//!
//! Containers never call `K: Hash`/`K: Eq` directly; they go through a
//! `KeyComparer`. Pooled maps keep their comparer in a `ComparerCell` so one
//! physical map can serve unrelated call sites with different equality
//! semantics across successive rents.

use core::fmt;
use core::hash::{BuildHasher, Hash};
use std::collections::hash_map::RandomState;
use std::sync::Arc;

/// Equality and hashing for keys of type `K`.
///
/// `equivalent(a, b)` must imply `hash_key(a) == hash_key(b)`.
pub trait KeyComparer<K: ?Sized> {
    fn hash_key(&self, key: &K) -> u64;
    fn equivalent(&self, a: &K, b: &K) -> bool;
}

/// Comparer shared between a hybrid container's tiers and handed to pooled maps.
pub type SharedComparer<K> = Arc<dyn KeyComparer<K> + Send + Sync>;

/// Uses the key's own `Hash` and `Eq` with a `BuildHasher`.
#[derive(Clone, Debug, Default)]
pub struct DefaultComparer<S = RandomState> {
    hasher: S,
}

impl DefaultComparer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S> DefaultComparer<S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self { hasher }
    }
}

impl<K, S> KeyComparer<K> for DefaultComparer<S>
where
    K: ?Sized + Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn hash_key(&self, key: &K) -> u64 {
        self.hasher.hash_one(key)
    }

    #[inline]
    fn equivalent(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

/// Comparer assembled from a pair of closures.
///
/// ```
/// use tiered_collections::{FnComparer, KeyComparer};
///
/// let ci = FnComparer::new(
///     |s: &String| s.to_ascii_lowercase().len() as u64,
///     |a: &String, b: &String| a.eq_ignore_ascii_case(b),
/// );
/// assert!(ci.equivalent(&"Key".to_string(), &"kEY".to_string()));
/// ```
#[derive(Clone)]
pub struct FnComparer<H, E> {
    hash: H,
    eq: E,
}

impl<H, E> FnComparer<H, E> {
    pub fn new(hash: H, eq: E) -> Self {
        Self { hash, eq }
    }
}

impl<K, H, E> KeyComparer<K> for FnComparer<H, E>
where
    K: ?Sized,
    H: Fn(&K) -> u64,
    E: Fn(&K, &K) -> bool,
{
    #[inline]
    fn hash_key(&self, key: &K) -> u64 {
        (self.hash)(key)
    }

    #[inline]
    fn equivalent(&self, a: &K, b: &K) -> bool {
        (self.eq)(a, b)
    }
}

impl<K, T> KeyComparer<K> for Arc<T>
where
    K: ?Sized,
    T: ?Sized + KeyComparer<K>,
{
    #[inline]
    fn hash_key(&self, key: &K) -> u64 {
        (**self).hash_key(key)
    }

    #[inline]
    fn equivalent(&self, a: &K, b: &K) -> bool {
        (**self).equivalent(a, b)
    }
}

/// A `SharedComparer` around a fresh `DefaultComparer`.
pub fn default_shared<K>() -> SharedComparer<K>
where
    K: Hash + Eq + 'static,
{
    Arc::new(DefaultComparer::new())
}

/// Indirection between a pooled container and its equality function.
///
/// A rebindable cell is swapped on every rent. A fixed cell belongs to a
/// container that was built outside the pool; the pool refuses to retain it.
pub struct ComparerCell<K> {
    comparer: SharedComparer<K>,
    rebindable: bool,
}

impl<K> ComparerCell<K> {
    pub fn rebindable(comparer: SharedComparer<K>) -> Self {
        Self {
            comparer,
            rebindable: true,
        }
    }

    pub fn fixed(comparer: SharedComparer<K>) -> Self {
        Self {
            comparer,
            rebindable: false,
        }
    }

    #[inline]
    pub fn get(&self) -> &SharedComparer<K> {
        &self.comparer
    }

    #[inline]
    pub fn is_rebindable(&self) -> bool {
        self.rebindable
    }

    pub(crate) fn rebind(&mut self, comparer: SharedComparer<K>) {
        debug_assert!(self.rebindable, "fixed comparer cells are never rebound");
        self.comparer = comparer;
    }
}

impl<K> fmt::Debug for ComparerCell<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComparerCell")
            .field("rebindable", &self.rebindable)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_comparer_agrees_with_eq_and_hash() {
        let c = DefaultComparer::new();
        let a = "alpha".to_string();
        let b = "alpha".to_string();
        assert!(KeyComparer::<String>::equivalent(&c, &a, &b));
        assert_eq!(
            KeyComparer::<String>::hash_key(&c, &a),
            KeyComparer::<String>::hash_key(&c, &b)
        );
        assert!(!KeyComparer::<String>::equivalent(&c, &a, &"beta".to_string()));
    }

    #[test]
    fn arc_delegates_to_inner_comparer() {
        let shared: SharedComparer<u32> = Arc::new(FnComparer::new(
            |k: &u32| u64::from(*k % 10),
            |a: &u32, b: &u32| a % 10 == b % 10,
        ));
        assert!(shared.equivalent(&3u32, &13u32));
        assert_eq!(shared.hash_key(&3u32), shared.hash_key(&23u32));
    }

    #[test]
    fn rebinding_swaps_the_comparer() {
        let mut cell = ComparerCell::rebindable(default_shared::<u32>());
        assert!(cell.is_rebindable());
        assert!(!cell.get().equivalent(&1u32, &11u32));

        cell.rebind(Arc::new(FnComparer::new(
            |k: &u32| u64::from(*k % 10),
            |a: &u32, b: &u32| a % 10 == b % 10,
        )));
        assert!(cell.get().equivalent(&1u32, &11u32));

        let fixed = ComparerCell::fixed(default_shared::<u32>());
        assert!(!fixed.is_rebindable());
    }
}
