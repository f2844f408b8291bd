#![cfg(test)]

// State-machine property tests for FixedTable against std's HashMap, with
// a table small enough that the key pool regularly overflows it.

use crate::comparer::{DefaultComparer, KeyComparer};
use crate::error::Error;
use crate::fixed_table::{Entry, FixedTable};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hasher};

const CAPACITY: usize = 5;

#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    Set(usize, i32),
    Replace(usize, i32),
    Remove(usize),
    Get(usize),
    Iterate,
    Clear,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::btree_set("[a-z]{1,4}", 1..=8).prop_flat_map(|keys| {
        let pool: Vec<String> = keys.into_iter().collect();
        let idx = 0..pool.len();
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Set(i, v)),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Replace(i, v)),
            3 => idx.clone().prop_map(Op::Remove),
            2 => idx.clone().prop_map(Op::Get),
            1 => Just(Op::Iterate),
            1 => Just(Op::Clear),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run<C: KeyComparer<String>>(
    comparer: C,
    pool: &[String],
    ops: Vec<Op>,
) -> Result<(), TestCaseError> {
    let mut buckets = [0i32; CAPACITY];
    let mut entries: [Entry<String, i32>; CAPACITY] = [Entry::VACANT; CAPACITY];
    let mut sut = FixedTable::with_comparer(&mut buckets, &mut entries, comparer)
        .map_err(|e| TestCaseError::fail(e.to_string()))?;
    let mut model: HashMap<String, i32> = HashMap::new();

    for op in ops {
        match op {
            Op::Insert(i, v) => {
                let k = pool[i].clone();
                match sut.insert(k.clone(), v) {
                    Ok(()) => {
                        prop_assert!(!model.contains_key(&k));
                        prop_assert!(model.len() < CAPACITY);
                        model.insert(k, v);
                    }
                    Err(Error::DuplicateKey) => prop_assert!(model.contains_key(&k)),
                    Err(Error::CapacityExceeded { capacity }) => {
                        prop_assert_eq!(capacity, CAPACITY);
                        prop_assert!(!model.contains_key(&k));
                        prop_assert_eq!(model.len(), CAPACITY);
                    }
                    Err(e) => prop_assert!(false, "unexpected error {e}"),
                }
            }
            Op::Set(i, v) => {
                let k = pool[i].clone();
                match sut.set(k.clone(), v) {
                    Ok(prev) => prop_assert_eq!(prev, model.insert(k, v)),
                    Err(Error::CapacityExceeded { .. }) => {
                        prop_assert!(!model.contains_key(&k));
                        prop_assert_eq!(model.len(), CAPACITY);
                    }
                    Err(e) => prop_assert!(false, "unexpected error {e}"),
                }
            }
            Op::Replace(i, v) => {
                let k = &pool[i];
                match model.get_mut(k) {
                    Some(mv) => {
                        prop_assert_eq!(sut.replace(k, v), Ok(*mv));
                        *mv = v;
                    }
                    None => prop_assert_eq!(sut.replace(k, v), Err(Error::KeyNotFound)),
                }
            }
            Op::Remove(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.remove_entry(k), model.remove_entry(k));
            }
            Op::Get(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.get(k), model.get(k));
                prop_assert_eq!(sut.contains_key(k), model.contains_key(k));
            }
            Op::Iterate => {
                let seen: BTreeMap<_, _> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                let expected: BTreeMap<_, _> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(sut.iter().len(), model.len());
                prop_assert_eq!(seen, expected);
            }
            Op::Clear => {
                sut.clear();
                model.clear();
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_full(), model.len() == CAPACITY);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run(DefaultComparer::new(), &pool, ops)?;
    }
}

// Every key lands in one bucket, so every lookup walks a single chain
// threaded through live slots and recycled tombstones alike.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run(DefaultComparer::with_hasher(ConstBuildHasher), &pool, ops)?;
    }
}

// Removing k entries from a full table and adding k fresh keys never
// reports CapacityExceeded.
proptest! {
    #[test]
    fn prop_free_list_reuse(remove_mask in proptest::collection::vec(any::<bool>(), CAPACITY)) {
        let mut buckets = [0i32; CAPACITY];
        let mut entries: [Entry<u32, u32>; CAPACITY] = [Entry::VACANT; CAPACITY];
        let mut sut = FixedTable::new(&mut buckets, &mut entries).unwrap();
        for k in 0..CAPACITY as u32 {
            sut.insert(k, k).unwrap();
        }
        let mut removed = 0u32;
        for (k, remove) in remove_mask.iter().enumerate() {
            if *remove {
                prop_assert_eq!(sut.remove(&(k as u32)), Some(k as u32));
                removed += 1;
            }
        }
        for n in 0..removed {
            prop_assert_eq!(sut.insert(100 + n, n), Ok(()));
        }
        prop_assert!(sut.is_full());
        prop_assert_eq!(
            sut.insert(999, 0),
            Err(Error::CapacityExceeded { capacity: CAPACITY })
        );
    }
}
