// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! HAMT used as the chain's authenticated map. Nodes are `(bitfield,
//! pointers)` pairs where a pointer is either a link to a child node or an
//! inline bucket of key-value entries.
//!
//! Reads are lazy: child nodes are fetched from the block store only when a
//! search descends through them, and cached per link afterwards.

mod bitfield;
mod error;
mod hamt;
mod hash;
mod hash_algorithm;
mod hash_bits;
mod node;
mod pointer;

pub use self::bitfield::Bitfield;
pub use self::error::Error;
pub use self::hamt::Hamt;
pub use self::hash::Hash;
pub use self::hash_algorithm::{HashAlgorithm, Sha256};
pub(crate) use self::hash_bits::HashBits;

use serde::{Deserialize, Serialize};

/// Maximum number of entries a bucket holds before it is split into a child
/// node.
const MAX_ARRAY_WIDTH: usize = 3;

/// Default bit width for indexing a hash at each depth level.
pub const DEFAULT_BIT_WIDTH: u32 = 8;

pub(crate) type HashedKey = [u8; 32];

/// Raw byte map key. The chain keys its authenticated maps on wire bytes, so
/// the key hash must cover exactly these bytes with no framing.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, std::hash::Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BytesKey(#[serde(with = "serde_bytes")] pub Vec<u8>);

impl Hash for BytesKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write(&self.0);
    }
}

impl AsRef<[u8]> for BytesKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for BytesKey {
    fn from(bz: Vec<u8>) -> Self {
        BytesKey(bz)
    }
}

impl From<&[u8]> for BytesKey {
    fn from(s: &[u8]) -> Self {
        Self(s.to_vec())
    }
}

impl From<&str> for BytesKey {
    fn from(s: &str) -> Self {
        Self::from(s.as_bytes())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct KeyValuePair<K, V>(K, V);

impl<K, V> KeyValuePair<K, V> {
    pub fn key(&self) -> &K {
        &self.0
    }
    pub fn value(&self) -> &V {
        &self.1
    }
    pub fn new(key: K, value: V) -> Self {
        KeyValuePair(key, value)
    }
}
