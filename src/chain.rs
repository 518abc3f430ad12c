//! The data layer: stitches an arbitrary-length payload into a chain of
//! fixed-size blocks, and reassembles a chain back into a payload.

use crate::address::Address;
use crate::block;
use crate::error::Result;
use crate::storage::BlockStorage;

/// Splits `payload` into a chain of data blocks and writes them to `storage`,
/// pre-allocating every address before writing so that each block can record
/// its successor. Returns the address of the head block.
///
/// `payload.len() == 0` still produces one head block, with an empty fragment
/// and `total_length = 0`.
pub fn build_data_chain(storage: &mut impl BlockStorage, payload: &[u8]) -> Result<Address> {
    let block_size = storage.block_size();
    let head_cap = block::head_capacity(block_size);
    let follow_cap = block::follow_capacity(block_size);
    let total_length = payload.len() as u64;

    let (head_fragment, rest) = if payload.len() > head_cap {
        payload.split_at(head_cap)
    } else {
        (payload, &[][..])
    };

    let follow_fragments: Vec<&[u8]> = rest.chunks(follow_cap).collect();
    let chain_len = 1 + follow_fragments.len();

    let mut addresses = Vec::with_capacity(chain_len);
    for _ in 0..chain_len {
        addresses.push(storage.malloc()?);
    }

    for (i, fragment) in follow_fragments.iter().enumerate() {
        let next = if i + 1 < follow_fragments.len() {
            addresses[i + 2]
        } else {
            storage.empty()
        };
        let block = block::encode_data_block(fragment, next, block_size)?;
        storage.set(addresses[i + 1], &block)?;
        log::trace!("chain: wrote follow block {} ({} bytes)", addresses[i + 1], fragment.len());
    }

    let head_next = if follow_fragments.is_empty() { storage.empty() } else { addresses[1] };
    let head_block = block::encode_data_head_block(head_fragment, head_next, total_length, block_size)?;
    storage.set(addresses[0], &head_block)?;
    log::trace!(
        "chain: wrote head block {} (total_length={}, {} blocks)",
        addresses[0],
        total_length,
        chain_len
    );

    Ok(addresses[0])
}

/// Reads the chain rooted at `head`, starting from a known data-chain head block,
/// and reassembles the original payload, trimmed to its recorded `total_length`.
pub fn read_data_chain(storage: &impl BlockStorage, head: Address) -> Result<Vec<u8>> {
    let head_block = storage.get(head)?;
    let (fragment, mut next, total_length) = block::decode_data_head_block(&head_block);
    let mut payload = fragment.to_vec();

    while !next.is_empty() {
        let block = storage.get(next)?;
        let (fragment, follow_next) = block::decode_data_block(&block);
        payload.extend_from_slice(fragment);
        next = follow_next;
    }

    payload.truncate(total_length as usize);
    Ok(payload)
}
