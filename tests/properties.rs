//! Property tests covering lookup correctness, block codec round trips, and
//! tree-structure invariants. Random sorted key sets and payloads are
//! generated with `proptest`.

use std::collections::BTreeMap;

use proptest::collection::{hash_set, vec};
use proptest::prelude::*;

use bptree::address::Address;
use bptree::block;
use bptree::storage::mem::MemStorage;
use bptree::storage::BlockStorage;
use bptree::BpTree;

const BLOCK_SIZE: u64 = 64;

fn sorted_entries(keys: Vec<u64>, payloads: Vec<Vec<u8>>) -> Vec<(u64, Vec<u8>)> {
    let mut deduped: BTreeMap<u64, Vec<u8>> = BTreeMap::new();
    for (key, payload) in keys.into_iter().zip(payloads.into_iter()) {
        deduped.insert(key, payload);
    }
    deduped.into_iter().collect()
}

fn node_pairs(block_size: u64) -> impl Strategy<Value = Vec<(u64, Address)>> {
    let max = block::max_fanout(block_size);
    vec((any::<u64>(), any::<u64>().prop_map(|v| Address(v.max(2)))), 0..=max)
}

proptest! {
    // P1 / P2: lookup recovers every input payload exactly, and reports
    // NotFound for every key that was not present in the input.
    #[test]
    fn lookup_recovers_inputs_and_rejects_absent_keys(
        keys in hash_set(0u64..10_000, 0..40),
    ) {
        let mut keys: Vec<u64> = keys.into_iter().collect();
        keys.sort_unstable();
        // Derive each payload deterministically from its key so we don't
        // need a second, independently-sized strategy to keep in sync.
        let payloads: Vec<Vec<u8>> = keys.iter().map(|&k| vec![(k % 251) as u8; (k % 300) as usize]).collect();
        let entries = sorted_entries(keys.clone(), payloads);

        let mut storage = MemStorage::new(BLOCK_SIZE);
        BpTree::construct(&mut storage, &entries).unwrap();

        for (key, payload) in &entries {
            prop_assert_eq!(&BpTree::lookup(&storage, *key).unwrap(), payload);
        }

        let present: std::collections::HashSet<u64> = entries.iter().map(|(k, _)| *k).collect();
        for absent in [10_001u64, 10_002, 20_000] {
            if !present.contains(&absent) {
                prop_assert!(BpTree::lookup(&storage, absent).is_err());
            }
        }
    }

    // P5: decode(encode(pairs)) == pairs for any pairs within fan-out.
    #[test]
    fn node_block_round_trips(pairs in node_pairs(BLOCK_SIZE)) {
        let encoded = block::encode_node_block(&pairs, BLOCK_SIZE).unwrap();
        let decoded = block::decode_node_block(&encoded, Address(2)).unwrap();
        prop_assert_eq!(decoded, pairs);
    }

    // P6: packing more than F entries fails with NodeOverflow.
    #[test]
    fn oversized_node_block_is_rejected(
        extra in 1usize..8,
    ) {
        let max = block::max_fanout(BLOCK_SIZE);
        let pairs: Vec<(u64, Address)> = (0..(max + extra) as u64)
            .map(|k| (k, Address(k + 2)))
            .collect();
        prop_assert!(block::encode_node_block(&pairs, BLOCK_SIZE).is_err());
    }

    // P7: any payload survives a build_data_chain / read_data_chain round trip.
    #[test]
    fn data_chain_round_trips(payload in vec(any::<u8>(), 0..2000)) {
        let mut storage = MemStorage::new(BLOCK_SIZE);
        let head = bptree::chain::build_data_chain(&mut storage, &payload).unwrap();
        let recovered = bptree::chain::read_data_chain(&storage, head).unwrap();
        prop_assert_eq!(recovered, payload);
    }

    // P8: keys are sorted ascending at every level of the built tree.
    #[test]
    fn every_level_is_sorted(
        keys in hash_set(0u64..10_000, 1..60),
    ) {
        let mut keys: Vec<u64> = keys.into_iter().collect();
        keys.sort_unstable();
        let entries: Vec<(u64, Vec<u8>)> = keys.iter().map(|&k| (k, vec![0u8; 4])).collect();

        let mut storage = MemStorage::new(BLOCK_SIZE);
        BpTree::construct(&mut storage, &entries).unwrap();
        let (root, height) = bptree::builder::read_meta(&storage).unwrap();

        fn walk(storage: &MemStorage, address: Address, levels_remaining: u64) {
            let block = storage.get(address).unwrap();
            let pairs = block::decode_node_block(&block, address).unwrap();
            let node_keys: Vec<u64> = pairs.iter().map(|(k, _)| *k).collect();
            assert!(node_keys.windows(2).all(|w| w[0] <= w[1]));
            if levels_remaining > 1 {
                for (_, child) in &pairs {
                    walk(storage, *child, levels_remaining - 1);
                }
            }
        }

        if !root.is_empty() {
            walk(&storage, root, height);
        }
    }
}
