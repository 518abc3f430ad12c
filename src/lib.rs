//! A persistent B+ tree indexed data store built over a block-addressable
//! storage abstraction.
//!
//! The tree is bulk-loaded once from a sorted sequence of `(key, payload)`
//! pairs ([`tree::BpTree::construct`]) and thereafter supports point lookups
//! ([`tree::BpTree::lookup`]). There is no insert/delete/rebalance path after
//! construction; live mutation is a follow-on design.

pub mod address;
pub mod block;
pub mod builder;
pub mod chain;
pub mod error;
pub mod storage;
pub mod tree;

pub use address::Address;
pub use error::{Error, Result};
pub use storage::BlockStorage;
pub use tree::BpTree;
