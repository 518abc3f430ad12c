//! A file-backed, memory-mapped [`BlockStorage`].
//!
//! The on-disk layout is a fixed-size preamble (magic bytes, block size,
//! block count, and an optional SHA-256 checksum of the block region) followed
//! by blocks packed back to back, one block per allocated address. Growth uses
//! a doubling strategy: remap only when the backing file is too small for the
//! next write.
use std::cmp::max;
use std::fs::{File, OpenOptions};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use memmap::{MmapMut, MmapOptions};
use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::error::{Error, Result};
use crate::storage::BlockStorage;

const MAGIC: &[u8; 8] = b"BPTREE01";
pub const PREAMBLE_SIZE: usize = 64;
const ONE_GIB: u64 = 1024 * 1024 * 1024;

/// A growable memory-mapped region of uniform `B`-byte blocks.
struct ExtensibleMmap {
    backing: File,
    ram: MmapMut,
}

impl ExtensibleMmap {
    fn on(backing: File) -> std::io::Result<Self> {
        let len = backing.metadata()?.len();
        let ram = if len == 0 {
            // mmap of a zero-length file is invalid; bootstrap with one page.
            backing.set_len(4096)?;
            unsafe { MmapOptions::new().map_mut(&backing)? }
        } else {
            unsafe { MmapOptions::new().map_mut(&backing)? }
        };
        Ok(ExtensibleMmap { backing, ram })
    }

    fn ensure_capacity(&mut self, len: u64) -> std::io::Result<()> {
        let cur_size = self.ram.len() as u64;
        if cur_size < len {
            let new_size = max(len, if cur_size > ONE_GIB { cur_size + ONE_GIB } else { cur_size * 2 });
            log::debug!("file storage: growing backing file to {} bytes", new_size);
            self.backing.set_len(new_size)?;
            self.ram.flush_async()?;
            let mut new_ram = unsafe { MmapOptions::new().map_mut(&self.backing)? };
            std::mem::swap(&mut self.ram, &mut new_ram);
            if new_size > 8 * ONE_GIB {
                log::warn!("file storage: backing file grew past 8 GiB ({} bytes)", new_size);
            }
        }
        Ok(())
    }
}

/// A file-backed storage adapter. Blocks live at `PREAMBLE_SIZE + address * block_size`.
pub struct FileStorage {
    mmap: ExtensibleMmap,
    block_size: u64,
    block_count: u64,
    /// Tracks which addresses within `0..block_count` have actually been
    /// `set()`, as opposed to merely `malloc()`'d. `block_count` alone only
    /// bounds the mapped region; an allocated-but-unwritten address must
    /// still fail `get()`, matching `MemStorage`.
    written: Vec<bool>,
}

impl FileStorage {
    /// Creates a brand new, empty store backed by `path`, truncating any existing file.
    pub fn create<P: AsRef<Path>>(path: P, block_size: u64) -> Result<FileStorage> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let mut mmap = ExtensibleMmap::on(file)?;
        mmap.ensure_capacity(PREAMBLE_SIZE as u64 + block_size * 2)?;
        let mut storage = FileStorage {
            mmap,
            block_size,
            block_count: 2,
            // EMPTY (address 0) is never written; META (address 1) is zeroed below.
            written: vec![false, false],
        };
        storage.write_preamble()?;
        // Reserve EMPTY (address 0, never read) and zero out META (address 1).
        let meta_zero = vec![0u8; block_size as usize];
        storage.set(Address::META, &meta_zero)?;
        log::debug!("file storage: created new store, block_size={}", block_size);
        Ok(storage)
    }

    /// Opens an existing store. If `verify_checksum` is set, recomputes the
    /// SHA-256 of the block region and compares it to the stored checksum.
    pub fn open<P: AsRef<Path>>(path: P, verify_checksum: bool) -> Result<FileStorage> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let mmap = ExtensibleMmap::on(file)?;
        let preamble = &mmap.ram[..PREAMBLE_SIZE];
        if &preamble[0..8] != MAGIC {
            return Err(Error::MalformedBlock {
                address: Address::EMPTY,
                reason: "bad magic bytes in file preamble".to_string(),
            });
        }
        let block_size = LittleEndian::read_u64(&preamble[8..16]);
        let block_count = LittleEndian::read_u64(&preamble[16..24]);
        let stored_checksum = preamble[24..56].to_vec();

        // A reopened file is assumed to be a fully completed (or at least
        // fully `set()`) store: every address below `block_count` has a
        // block on disk, except the EMPTY sentinel at address 0, which is
        // never written (see `create`).
        let mut written = vec![true; block_count as usize];
        if let Some(empty_slot) = written.get_mut(0) {
            *empty_slot = false;
        }
        let storage = FileStorage { mmap, block_size, block_count, written };

        if verify_checksum {
            let found = storage.compute_checksum();
            if found != stored_checksum {
                return Err(Error::MalformedBlock {
                    address: Address::EMPTY,
                    reason: "checksum mismatch in file preamble".to_string(),
                });
            }
        }
        log::debug!(
            "file storage: opened store, block_size={}, block_count={}",
            block_size,
            block_count
        );
        Ok(storage)
    }

    fn compute_checksum(&self) -> Vec<u8> {
        let region_len = (self.block_count * self.block_size) as usize;
        let region = &self.mmap.ram[PREAMBLE_SIZE..PREAMBLE_SIZE + region_len];
        let mut hasher = Sha256::new();
        hasher.input(region);
        hasher.result().to_vec()
    }

    /// Recomputes and writes the checksum, and flushes to disk. Callers should
    /// invoke this once after a bulk-load `construct` completes; lookups never
    /// need it.
    pub fn finalize(&mut self) -> Result<()> {
        let checksum = self.compute_checksum();
        self.mmap.ram[24..56].copy_from_slice(&checksum);
        self.mmap.ram.flush()?;
        Ok(())
    }

    fn write_preamble(&mut self) -> Result<()> {
        self.mmap.ram[0..8].copy_from_slice(MAGIC);
        LittleEndian::write_u64(&mut self.mmap.ram[8..16], self.block_size);
        LittleEndian::write_u64(&mut self.mmap.ram[16..24], self.block_count);
        // checksum left zeroed until finalize().
        Ok(())
    }

    fn offset(&self, address: Address) -> usize {
        PREAMBLE_SIZE + address.0 as usize * self.block_size as usize
    }
}

impl BlockStorage for FileStorage {
    fn get(&self, address: Address) -> Result<Vec<u8>> {
        let index = address.0 as usize;
        if !self.written.get(index).copied().unwrap_or(false) {
            return Err(Error::Storage(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("block {} was never written", address),
            )));
        }
        let start = self.offset(address);
        let end = start + self.block_size as usize;
        Ok(self.mmap.ram[start..end].to_vec())
    }

    fn set(&mut self, address: Address, block: &[u8]) -> Result<()> {
        if block.len() as u64 != self.block_size {
            return Err(Error::EncodingOverflow {
                len: block.len(),
                capacity: self.block_size as usize,
            });
        }
        let needed = PREAMBLE_SIZE as u64 + (address.0 + 1) * self.block_size;
        self.mmap.ensure_capacity(needed)?;
        let start = self.offset(address);
        let end = start + self.block_size as usize;
        self.mmap.ram[start..end].copy_from_slice(block);
        if address.0 + 1 > self.block_count {
            self.block_count = address.0 + 1;
            LittleEndian::write_u64(&mut self.mmap.ram[16..24], self.block_count);
        }
        let index = address.0 as usize;
        if index >= self.written.len() {
            self.written.resize(index + 1, false);
        }
        self.written[index] = true;
        log::trace!("file storage: wrote block {}", address);
        Ok(())
    }

    fn malloc(&mut self) -> Result<Address> {
        let address = Address(self.block_count);
        self.block_count += 1;
        LittleEndian::write_u64(&mut self.mmap.ram[16..24], self.block_count);
        let needed = PREAMBLE_SIZE as u64 + self.block_count * self.block_size;
        self.mmap.ensure_capacity(needed)?;
        self.written.push(false);
        Ok(address)
    }

    fn size(&self) -> u64 {
        self.block_count * self.block_size
    }

    fn block_size(&self) -> u64 {
        self.block_size
    }
}
