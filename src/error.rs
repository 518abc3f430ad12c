use crate::address::Address;

/// Errors surfaced by the block codec, the bulk-load builder, and the reader.
///
/// The core never retries; every failure here is fatal to the operation that
/// raised it and is handed straight back to the caller.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("fragment of {len} bytes exceeds block capacity of {capacity} bytes")]
    EncodingOverflow { len: usize, capacity: usize },

    #[error("{count} entries exceed node fan-out of {max}")]
    NodeOverflow { count: usize, max: usize },

    #[error("key not found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("malformed block at {address}: {reason}")]
    MalformedBlock { address: Address, reason: String },

    #[error("input not sorted: key {key} <= previous key {previous}")]
    UnsortedInput { key: u64, previous: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;
