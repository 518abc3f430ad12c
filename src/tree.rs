//! The public entry points: bulk `construct` from sorted input, and `lookup`
//! by key. `BpTree` itself owns no heap state; it's a zero-sized handle whose
//! methods borrow the storage.

use crate::address::Address;
use crate::block;
use crate::builder;
use crate::chain;
use crate::error::{Error, Result};
use crate::storage::BlockStorage;

/// A persistent B+ tree index over a [`BlockStorage`].
///
/// Construction and lookup are the only two operations; there is no
/// insert/delete/rebalance surface (the tree is built once from sorted input
/// and read thereafter).
pub struct BpTree;

impl BpTree {
    /// Builds a tree from `sorted_entries` (must be strictly increasing by
    /// key) and writes the root pointer and tree height to the storage's meta
    /// block. Fails with [`Error::UnsortedInput`] before writing anything
    /// beyond the data chains already built for prior entries.
    pub fn construct(storage: &mut impl BlockStorage, sorted_entries: &[(u64, Vec<u8>)]) -> Result<()> {
        let mut leaves = Vec::with_capacity(sorted_entries.len());
        let mut previous_key: Option<u64> = None;

        for (key, payload) in sorted_entries {
            if let Some(previous) = previous_key {
                if *key <= previous {
                    return Err(Error::UnsortedInput { key: *key, previous });
                }
            }
            previous_key = Some(*key);

            let head = chain::build_data_chain(storage, payload)?;
            leaves.push((*key, head));
        }

        log::debug!("construct: built {} data chains, laying out index", leaves.len());
        builder::build_index(storage, leaves)
    }

    /// Looks up `key`, descending from the root through exactly `height`
    /// node layers (tracked in the meta block) before treating the current
    /// block as a data-chain head.
    pub fn lookup(storage: &impl BlockStorage, key: u64) -> Result<Vec<u8>> {
        let (root, height) = builder::read_meta(storage)?;
        if root.is_empty() {
            return Err(Error::NotFound);
        }

        let mut address = root;
        let mut levels_remaining = height;

        loop {
            let block = storage.get(address)?;
            let pairs = block::decode_node_block(&block, address)?;
            let found = search_floor(&pairs, key);
            let (entry_key, child) = match found {
                Some(entry) => entry,
                None => {
                    log::debug!("lookup: key {} below smallest key in node {}", key, address);
                    return Err(Error::NotFound);
                }
            };

            levels_remaining -= 1;
            if levels_remaining == 0 {
                if entry_key != key {
                    log::debug!("lookup: key {} not found (closest was {})", key, entry_key);
                    return Err(Error::NotFound);
                }
                return chain::read_data_chain(storage, child);
            }

            address = child;
            log::trace!("lookup: descending to {}, {} levels remaining", address, levels_remaining);
        }
    }
}

/// Binary-searches sorted `pairs` for the entry with the largest key `<= key`.
fn search_floor(pairs: &[(u64, Address)], key: u64) -> Option<(u64, Address)> {
    if pairs.is_empty() || key < pairs[0].0 {
        return None;
    }
    match pairs.binary_search_by_key(&key, |(k, _)| *k) {
        Ok(i) => Some(pairs[i]),
        Err(i) => Some(pairs[i - 1]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::mem::MemStorage;

    fn entries(pairs: &[(u64, &str)]) -> Vec<(u64, Vec<u8>)> {
        pairs.iter().map(|(k, v)| (*k, v.as_bytes().to_vec())).collect()
    }

    #[test]
    fn single_entry_short_payload() {
        let mut storage = MemStorage::new(64);
        BpTree::construct(&mut storage, &entries(&[(42, "hello")])).unwrap();
        assert_eq!(BpTree::lookup(&storage, 42).unwrap(), b"hello".to_vec());
        assert!(matches!(BpTree::lookup(&storage, 0), Err(Error::NotFound)));
    }

    #[test]
    fn three_entries_fit_in_one_node() {
        let mut storage = MemStorage::new(64);
        let payload5 = "5".repeat(100);
        let payload7 = "7".repeat(100);
        let payload9 = "9".repeat(100);
        BpTree::construct(
            &mut storage,
            &entries(&[(5, &payload5), (7, &payload7), (9, &payload9)]),
        )
        .unwrap();
        assert_eq!(BpTree::lookup(&storage, 7).unwrap(), payload7.as_bytes().to_vec());
    }

    #[test]
    fn four_entries_force_two_leaves() {
        let mut storage = MemStorage::new(64);
        BpTree::construct(
            &mut storage,
            &entries(&[(1, "a"), (2, "b"), (3, "c"), (4, "d")]),
        )
        .unwrap();
        assert_eq!(BpTree::lookup(&storage, 3).unwrap(), b"c".to_vec());
        assert_eq!(BpTree::lookup(&storage, 1).unwrap(), b"a".to_vec());
        assert_eq!(BpTree::lookup(&storage, 4).unwrap(), b"d".to_vec());
    }

    #[test]
    fn empty_tree_always_not_found() {
        let mut storage = MemStorage::new(64);
        BpTree::construct(&mut storage, &[]).unwrap();
        assert!(matches!(BpTree::lookup(&storage, 1), Err(Error::NotFound)));
    }

    #[test]
    fn missing_key_between_entries_is_not_found() {
        let mut storage = MemStorage::new(64);
        BpTree::construct(&mut storage, &entries(&[(10, "ten"), (20, "twenty")])).unwrap();
        assert!(matches!(BpTree::lookup(&storage, 15), Err(Error::NotFound)));
        assert!(matches!(BpTree::lookup(&storage, 25), Err(Error::NotFound)));
    }

    #[test]
    fn unsorted_input_is_rejected() {
        let mut storage = MemStorage::new(64);
        let result = BpTree::construct(&mut storage, &entries(&[(2, "b"), (1, "a")]));
        assert!(matches!(result, Err(Error::UnsortedInput { key: 1, previous: 2 })));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let mut storage = MemStorage::new(64);
        let result = BpTree::construct(&mut storage, &entries(&[(1, "a"), (1, "b")]));
        assert!(result.is_err());
    }

    #[test]
    fn many_entries_all_round_trip() {
        let mut storage = MemStorage::new(64);
        let data: Vec<(u64, Vec<u8>)> = (0..500u64)
            .map(|k| (k, format!("value-{}", k).into_bytes()))
            .collect();
        BpTree::construct(&mut storage, &data).unwrap();
        for (k, v) in &data {
            assert_eq!(&BpTree::lookup(&storage, *k).unwrap(), v);
        }
        assert!(matches!(BpTree::lookup(&storage, 10_000), Err(Error::NotFound)));
    }

    #[test]
    fn long_payloads_round_trip_through_full_tree() {
        let mut storage = MemStorage::new(64);
        let data: Vec<(u64, Vec<u8>)> = (0..20u64)
            .map(|k| (k, vec![k as u8; 1000]))
            .collect();
        BpTree::construct(&mut storage, &data).unwrap();
        for (k, v) in &data {
            assert_eq!(&BpTree::lookup(&storage, *k).unwrap(), v);
        }
    }
}
