//! Encoding and decoding of the two block kinds the tree persists:
//! data blocks (a payload fragment plus a chain pointer) and node blocks
//! (a count-prefixed array of sorted `(key, child)` pairs).
//!
//! All multi-byte fields are little-endian, fixed across the whole format.

use byteorder::{ByteOrder, LittleEndian};

use crate::address::Address;
use crate::error::{Error, Result};

/// Byte offset/width of the `next` pointer present in every data block.
const NEXT_SIZE: usize = 8;
/// Additional byte width of the `total_length` field in a head data block.
const LENGTH_SIZE: usize = 8;
/// Byte width of the `count` prefix in a node block.
const COUNT_SIZE: usize = 8;
/// Byte width of one `(key, child)` pair in a node block.
const PAIR_SIZE: usize = 16;

/// Maximum number of `(key, child)` pairs a node block of `block_size` bytes can hold.
pub fn max_fanout(block_size: u64) -> usize {
    ((block_size as usize).saturating_sub(COUNT_SIZE)) / PAIR_SIZE
}

/// Maximum payload fragment a non-head data block of `block_size` bytes can hold.
pub fn follow_capacity(block_size: u64) -> usize {
    (block_size as usize).saturating_sub(NEXT_SIZE)
}

/// Maximum payload fragment the head block of a chain can hold.
pub fn head_capacity(block_size: u64) -> usize {
    (block_size as usize).saturating_sub(NEXT_SIZE + LENGTH_SIZE)
}

/// Encodes a non-head data block: `next` (8 bytes LE) + `fragment`, zero-padded to `block_size`.
pub fn encode_data_block(fragment: &[u8], next: Address, block_size: u64) -> Result<Vec<u8>> {
    let capacity = follow_capacity(block_size);
    if fragment.len() > capacity {
        return Err(Error::EncodingOverflow { len: fragment.len(), capacity });
    }
    let mut block = vec![0u8; block_size as usize];
    block[0..NEXT_SIZE].copy_from_slice(&next.to_le_bytes());
    block[NEXT_SIZE..NEXT_SIZE + fragment.len()].copy_from_slice(fragment);
    Ok(block)
}

/// Decodes a non-head data block into its raw `(block_size - 8)`-byte fragment and `next`.
pub fn decode_data_block(block: &[u8]) -> (&[u8], Address) {
    let next = Address::from_le_bytes(block[0..NEXT_SIZE].try_into().unwrap());
    (&block[NEXT_SIZE..], next)
}

/// Encodes the head data block of a chain: `next` + `total_length` + `fragment`, zero-padded.
pub fn encode_data_head_block(
    fragment: &[u8],
    next: Address,
    total_length: u64,
    block_size: u64,
) -> Result<Vec<u8>> {
    let capacity = head_capacity(block_size);
    if fragment.len() > capacity {
        return Err(Error::EncodingOverflow { len: fragment.len(), capacity });
    }
    let mut block = vec![0u8; block_size as usize];
    block[0..NEXT_SIZE].copy_from_slice(&next.to_le_bytes());
    LittleEndian::write_u64(&mut block[NEXT_SIZE..NEXT_SIZE + LENGTH_SIZE], total_length);
    let fragment_start = NEXT_SIZE + LENGTH_SIZE;
    block[fragment_start..fragment_start + fragment.len()].copy_from_slice(fragment);
    Ok(block)
}

/// Decodes a head data block into its raw fragment, `next`, and `total_length`.
pub fn decode_data_head_block(block: &[u8]) -> (&[u8], Address, u64) {
    let next = Address::from_le_bytes(block[0..NEXT_SIZE].try_into().unwrap());
    let total_length = LittleEndian::read_u64(&block[NEXT_SIZE..NEXT_SIZE + LENGTH_SIZE]);
    let fragment_start = NEXT_SIZE + LENGTH_SIZE;
    (&block[fragment_start..], next, total_length)
}

/// Encodes a node block: `count` (8 bytes LE) followed by `count` sorted `(key, child)` pairs.
///
/// Fails with [`Error::NodeOverflow`] if `pairs` would not fit in one block of `block_size` bytes.
pub fn encode_node_block(pairs: &[(u64, Address)], block_size: u64) -> Result<Vec<u8>> {
    let max = max_fanout(block_size);
    if pairs.len() > max {
        return Err(Error::NodeOverflow { count: pairs.len(), max });
    }
    let mut block = vec![0u8; block_size as usize];
    LittleEndian::write_u64(&mut block[0..COUNT_SIZE], pairs.len() as u64);
    let mut offset = COUNT_SIZE;
    for (key, child) in pairs {
        LittleEndian::write_u64(&mut block[offset..offset + 8], *key);
        block[offset + 8..offset + 16].copy_from_slice(&child.to_le_bytes());
        offset += PAIR_SIZE;
    }
    Ok(block)
}

/// Decodes a node block's `(key, child)` pairs, ignoring trailing unused bytes.
///
/// Fails with [`Error::MalformedBlock`] if the encoded `count` could not possibly
/// fit in a block this size.
pub fn decode_node_block(block: &[u8], address: Address) -> Result<Vec<(u64, Address)>> {
    let count = LittleEndian::read_u64(&block[0..COUNT_SIZE]) as usize;
    let needed = count
        .checked_mul(PAIR_SIZE)
        .and_then(|pairs_size| pairs_size.checked_add(COUNT_SIZE));
    match needed {
        Some(needed) if needed <= block.len() => {}
        _ => {
            return Err(Error::MalformedBlock {
                address,
                reason: format!(
                    "node count {} does not fit in a {}-byte block",
                    count,
                    block.len()
                ),
            });
        }
    }
    let mut pairs = Vec::with_capacity(count);
    let mut offset = COUNT_SIZE;
    for _ in 0..count {
        let key = LittleEndian::read_u64(&block[offset..offset + 8]);
        let child = Address::from_le_bytes(block[offset + 8..offset + 16].try_into().unwrap());
        pairs.push((key, child));
        offset += PAIR_SIZE;
    }
    Ok(pairs)
}
