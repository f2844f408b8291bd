// HybridMap integration suite.
//
// Invariants exercised:
// - Placement: the fixed tier fills first; the elastic tier is rented only
//   once the fixed tier is full and an insertion still needs room.
// - Packing: whenever the elastic tier holds entries, the fixed tier is full.
// - Uniqueness: duplicate keys are rejected across both tiers without
//   mutating either.
// - Export: `into_entries` yields exactly the union of both tiers.
use std::collections::HashMap;
use std::sync::Arc;
use tiered_collections::{
    default_shared, CapacityPool, Entry, Error, FnComparer, HybridMap, PooledMap, SharedComparer,
};

fn fresh_pool<K, V>() -> Arc<CapacityPool<PooledMap<K, V>>> {
    Arc::new(CapacityPool::new())
}

// Test: the three-slot walkthrough.
// Verifies: tier flags and counts after filling, spilling, and removing.
#[test]
fn three_slot_scenario() {
    let mut buckets = [0i32; 3];
    let mut entries: [Entry<i32, i32>; 3] = [Entry::VACANT; 3];
    let mut m = HybridMap::new(&mut buckets, &mut entries).unwrap();

    m.insert(1, 1).unwrap();
    m.insert(2, 2).unwrap();
    m.insert(3, 3).unwrap();
    assert!(m.is_tier1_full());
    assert!(!m.is_tier2_rented());

    m.insert(4, 4).unwrap();
    assert!(m.is_tier2_rented());
    assert_eq!(m.len(), 4);

    assert_eq!(m.remove(&1), Some(1));
    assert_eq!(m.len(), 3);
    assert!(!m.contains_key(&1));
    assert!(m.is_tier1_full());
    assert!(m.is_tier2_rented());
}

// Test: a failed insert is invisible.
// Verifies: DuplicateKey leaves count, values and tier state untouched.
#[test]
fn duplicate_insert_changes_nothing() {
    let mut buckets = [0i32; 2];
    let mut entries: [Entry<&str, u8>; 2] = [Entry::VACANT; 2];
    let mut m =
        HybridMap::with_pool(&mut buckets, &mut entries, default_shared(), fresh_pool()).unwrap();
    m.insert("a", 1).unwrap();
    m.insert("b", 2).unwrap();
    assert_eq!(m.insert("a", 9), Err(Error::DuplicateKey));
    assert!(!m.is_tier2_rented());
    assert_eq!(m.len(), 2);
    assert_eq!(m.get(&"a"), Some(&1));
}

// Test: round-trip against a plain HashMap.
// Verifies: after mixed inserts and removals, exported entries match the
// model exactly with no duplicates.
#[test]
fn export_matches_model() {
    let mut buckets = [0i32; 4];
    let mut entries: [Entry<u64, u64>; 4] = [Entry::VACANT; 4];
    let mut m =
        HybridMap::with_pool(&mut buckets, &mut entries, default_shared(), fresh_pool()).unwrap();
    let mut model = HashMap::new();

    for k in 0..20u64 {
        m.insert(k, k * k).unwrap();
        model.insert(k, k * k);
    }
    for k in (0..20u64).step_by(3) {
        assert_eq!(m.remove(&k), model.remove(&k));
        assert!(model.len() <= 4 || m.is_tier1_full());
    }
    assert_eq!(m.len(), model.len());

    let exported = m.into_entries();
    assert_eq!(exported.len(), model.len());
    let as_map: HashMap<u64, u64> = exported.into_iter().collect();
    assert_eq!(as_map, model);
}

// Test: draining the elastic tier through fixed-tier removals.
// Verifies: the fixed tier stays full until the elastic tier is empty.
#[test]
fn fixed_tier_stays_full_while_tier2_has_entries() {
    let mut buckets = [0i32; 3];
    let mut entries: [Entry<u32, ()>; 3] = [Entry::VACANT; 3];
    let mut m =
        HybridMap::with_pool(&mut buckets, &mut entries, default_shared(), fresh_pool()).unwrap();
    for k in 0..8 {
        m.insert(k, ()).unwrap();
    }
    while m.len() > 3 {
        let first = *m.keys().next().unwrap();
        m.remove(&first).unwrap();
        assert!(m.is_tier1_full());
    }
    let first = *m.keys().next().unwrap();
    m.remove(&first).unwrap();
    assert!(!m.is_tier1_full());
    assert_eq!(m.len(), 2);
}

// Test: custom equality reaches the elastic tier.
// Verifies: case-insensitive keys collide across the tier boundary.
#[test]
fn case_insensitive_comparer() {
    let ci: SharedComparer<String> = Arc::new(FnComparer::new(
        |k: &String| {
            k.bytes()
                .fold(0u64, |h, b| h.wrapping_mul(31).wrapping_add(b.to_ascii_lowercase() as u64))
        },
        |a: &String, b: &String| a.eq_ignore_ascii_case(b),
    ));
    let mut buckets = [0i32; 2];
    let mut entries: [Entry<String, u32>; 2] = [Entry::VACANT; 2];
    let mut m = HybridMap::with_pool(&mut buckets, &mut entries, ci, fresh_pool()).unwrap();
    for (i, k) in ["One", "Two", "Three", "Four"].iter().enumerate() {
        m.insert(k.to_string(), i as u32).unwrap();
    }
    assert_eq!(m.get(&"FOUR".to_string()), Some(&3));
    assert_eq!(m.set("three".into(), 30), Some(2));
    assert_eq!(m.len(), 4);
    assert_eq!(m.insert("tWo".into(), 0), Err(Error::DuplicateKey));
}

// Test: elastic storage is recycled between hybrids.
// Verifies: a disposed hybrid's backing map serves the next hybrid's spill.
#[test]
fn tier2_storage_is_reused() {
    let pool = fresh_pool::<u32, u32>();
    {
        let mut buckets = [0i32; 1];
        let mut entries: [Entry<u32, u32>; 1] = [Entry::VACANT; 1];
        let mut m =
            HybridMap::with_pool(&mut buckets, &mut entries, default_shared(), pool.clone())
                .unwrap();
        m.insert(1, 1).unwrap();
        m.insert(2, 2).unwrap();
        m.dispose();
    }
    assert_eq!(pool.len(), 1);

    let mut buckets = [0i32; 1];
    let mut entries: [Entry<u32, u32>; 1] = [Entry::VACANT; 1];
    let mut m =
        HybridMap::with_pool(&mut buckets, &mut entries, default_shared(), pool.clone()).unwrap();
    m.insert(10, 10).unwrap();
    m.insert(20, 20).unwrap();
    assert!(pool.is_empty());
    assert_eq!(pool.stats().rent_hits, 1);
    assert_eq!(m.get(&20), Some(&20));
    assert_eq!(m.get(&2), None);
}
