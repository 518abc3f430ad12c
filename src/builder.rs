//! The node layer: bulk-loads successive index layers bottom-up from a sorted
//! sequence of `(key, child address)` pairs until a single root block remains,
//! then records the root address and tree height in the meta block.

use byteorder::{ByteOrder, LittleEndian};

use crate::address::Address;
use crate::block;
use crate::error::Result;
use crate::storage::BlockStorage;

/// Builds the index layers over `leaves` (sorted, one entry per data-chain
/// head) and writes the root address + tree height to the meta block.
///
/// An empty `leaves` writes `(EMPTY, 0)` to meta; lookups against such a tree
/// fail immediately with `NotFound`.
pub fn build_index(storage: &mut impl BlockStorage, leaves: Vec<(u64, Address)>) -> Result<()> {
    if leaves.is_empty() {
        return write_meta(storage, Address::EMPTY, 0);
    }

    let block_size = storage.block_size();
    let fanout = block::max_fanout(block_size);

    let mut current = leaves;
    let mut height: u64 = 0;

    while current.len() > fanout {
        let groups = partition_with_redistribution(&current, fanout);
        let mut next_layer = Vec::with_capacity(groups.len());
        for group in groups {
            let group_min_key = group[0].0;
            let address = write_node(storage, &group)?;
            next_layer.push((group_min_key, address));
        }
        height += 1;
        log::debug!(
            "builder: wrote index layer {} with {} nodes ({} entries below)",
            height,
            next_layer.len(),
            current.len()
        );
        current = next_layer;
    }

    let root_address = write_node(storage, &current)?;
    height += 1;
    log::debug!("builder: wrote root {} at height {}", root_address, height);
    write_meta(storage, root_address, height)
}

fn write_node(storage: &mut impl BlockStorage, pairs: &[(u64, Address)]) -> Result<Address> {
    let block = block::encode_node_block(pairs, storage.block_size())?;
    let address = storage.malloc()?;
    storage.set(address, &block)?;
    log::trace!("builder: wrote node {} with {} entries", address, pairs.len());
    Ok(address)
}

/// Splits `current` into groups of at most `fanout` entries, keeping every
/// group's length within `[ceil(fanout/2), fanout]` where possible. The
/// natural trailing partial group is merged with its predecessor and re-split
/// evenly whenever it would otherwise fall under the minimum occupancy.
///
/// Only called when `current.len() > fanout`, so this always yields at least
/// two groups.
fn partition_with_redistribution(
    current: &[(u64, Address)],
    fanout: usize,
) -> Vec<Vec<(u64, Address)>> {
    let min_occupancy = (fanout + 1) / 2;
    let mut groups: Vec<Vec<(u64, Address)>> =
        current.chunks(fanout).map(|chunk| chunk.to_vec()).collect();

    if let Some(last) = groups.last() {
        if groups.len() >= 2 && last.len() < min_occupancy {
            let last = groups.pop().unwrap();
            let second_last = groups.pop().unwrap();
            let mut combined = second_last;
            combined.extend(last);

            if combined.len() >= 2 * min_occupancy {
                let first_len = combined.len() - min_occupancy;
                let (first, second) = combined.split_at(first_len);
                groups.push(first.to_vec());
                groups.push(second.to_vec());
            } else {
                // Can only happen if `current.len() <= fanout`, which this
                // function is never called with; kept as a defensive
                // fallback rather than a panic.
                groups.push(combined);
            }
        }
    }

    groups
}

fn write_meta(storage: &mut impl BlockStorage, root: Address, height: u64) -> Result<()> {
    let mut block = vec![0u8; storage.block_size() as usize];
    block[0..8].copy_from_slice(&root.to_le_bytes());
    LittleEndian::write_u64(&mut block[8..16], height);
    storage.set(storage.meta(), &block)
}

/// Reads the `(root address, tree height)` pair out of the meta block.
pub fn read_meta(storage: &impl BlockStorage) -> Result<(Address, u64)> {
    let block = storage.get(storage.meta())?;
    let root = Address::from_le_bytes(block[0..8].try_into().unwrap());
    let height = LittleEndian::read_u64(&block[8..16]);
    Ok((root, height))
}
