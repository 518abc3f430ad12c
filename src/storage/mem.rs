use crate::address::Address;
use crate::error::{Error, Result};
use crate::storage::BlockStorage;

/// An in-memory, map-backed [`BlockStorage`]. Used by the unit and property
/// tests; not safe for concurrent writers.
pub struct MemStorage {
    block_size: u64,
    blocks: Vec<Option<Vec<u8>>>,
}

impl MemStorage {
    /// Creates a fresh, empty store with the given block size. Reserves
    /// addresses 0 (`EMPTY`) and 1 (`META`) up front; `malloc` starts at 2.
    pub fn new(block_size: u64) -> MemStorage {
        let zero = vec![0u8; block_size as usize];
        MemStorage {
            block_size,
            // index 0 is EMPTY (never read), index 1 is META.
            blocks: vec![None, Some(zero)],
        }
    }
}

impl BlockStorage for MemStorage {
    fn get(&self, address: Address) -> Result<Vec<u8>> {
        match self.blocks.get(address.0 as usize) {
            Some(Some(block)) => Ok(block.clone()),
            _ => Err(Error::Storage(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("block {} was never written", address),
            ))),
        }
    }

    fn set(&mut self, address: Address, block: &[u8]) -> Result<()> {
        if block.len() as u64 != self.block_size {
            return Err(Error::EncodingOverflow {
                len: block.len(),
                capacity: self.block_size as usize,
            });
        }
        let index = address.0 as usize;
        if index >= self.blocks.len() {
            self.blocks.resize_with(index + 1, || None);
        }
        self.blocks[index] = Some(block.to_vec());
        log::trace!("mem storage: wrote block {}", address);
        Ok(())
    }

    fn malloc(&mut self) -> Result<Address> {
        let address = Address(self.blocks.len() as u64);
        self.blocks.push(None);
        Ok(address)
    }

    fn size(&self) -> u64 {
        self.blocks.iter().filter(|b| b.is_some()).count() as u64 * self.block_size
    }

    fn block_size(&self) -> u64 {
        self.block_size
    }
}
