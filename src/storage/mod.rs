//! The block-addressable storage abstraction the tree is built over.
//!
//! This is deliberately a narrow capability trait rather than an inheritance
//! hierarchy: any type that can `get`/`set`/`malloc` fixed-size blocks can back
//! a tree. Two implementations ship here: [`mem::MemStorage`] for tests and
//! [`file::FileStorage`] for a real on-disk, memory-mapped store.

pub mod file;
pub mod mem;

use crate::address::Address;
use crate::error::Result;

/// The narrow block I/O interface the tree operates through.
///
/// Implementations must guarantee:
/// - every address returned by `malloc` is distinct from `empty()`, `meta()`, and every
///   previously returned address;
/// - `set` rejects blocks whose length differs from `block_size()`;
/// - `get` fails if the address was never `set` (or `malloc`'d with no following `set`).
pub trait BlockStorage {
    /// Reads the block at `address`. Fails if `address` was never written.
    fn get(&self, address: Address) -> Result<Vec<u8>>;

    /// Writes a block. `block.len()` must equal `block_size()`.
    fn set(&mut self, address: Address, block: &[u8]) -> Result<()>;

    /// Returns a fresh, writable address.
    fn malloc(&mut self) -> Result<Address>;

    /// The `EMPTY` sentinel address.
    fn empty(&self) -> Address {
        Address::EMPTY
    }

    /// The `META` sentinel address, holding the tree's root pointer and height.
    fn meta(&self) -> Address {
        Address::META
    }

    /// Total bytes currently allocated.
    fn size(&self) -> u64;

    /// The fixed block size `B` this storage was constructed with.
    fn block_size(&self) -> u64;
}
