use std::fmt;

/// An opaque block address, as produced by a [`crate::storage::BlockStorage`] allocator.
///
/// `Address(0)` is reserved for [`crate::storage::BlockStorage::empty`] and is never
/// returned by `malloc`; `Address(1)` is reserved for `meta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub u64);

impl Address {
    pub const EMPTY: Address = Address(0);
    pub const META: Address = Address(1);

    #[inline]
    pub fn is_empty(&self) -> bool {
        *self == Address::EMPTY
    }

    #[inline]
    pub fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    #[inline]
    pub fn from_le_bytes(bytes: [u8; 8]) -> Address {
        Address(u64::from_le_bytes(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for Address {
    fn from(v: u64) -> Address {
        Address(v)
    }
}
