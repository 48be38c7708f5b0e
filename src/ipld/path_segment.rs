// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt;

use crate::ipld_hamt::BytesKey;

/// Represents a key in a map, an index in a list, or a raw byte key of a
/// reified trie node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// Key in a map
    String(String),
    /// Index in a list
    Int(usize),
    /// Raw byte key in a reified view; the chain's authenticated maps key on
    /// wire bytes which need not be valid utf-8.
    Bytes(Vec<u8>),
}

impl PathSegment {
    /// Return index or conversion from string to index.
    /// If the segment cannot be converted, None is returned.
    pub fn to_index(&self) -> Option<usize> {
        match self {
            PathSegment::String(s) => s.parse().ok(),
            PathSegment::Int(i) => Some(*i),
            PathSegment::Bytes(_) => None,
        }
    }
}

impl From<usize> for PathSegment {
    fn from(i: usize) -> Self {
        Self::Int(i)
    }
}

impl From<String> for PathSegment {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&BytesKey> for PathSegment {
    fn from(k: &BytesKey) -> Self {
        Self::Bytes(k.0.clone())
    }
}

impl From<&str> for PathSegment {
    fn from(s: &str) -> Self {
        // Try to parse as usize to avoid heap allocations.
        // (Int and String segments are handled the same in traversals)
        match s.parse::<usize>() {
            Ok(u) => PathSegment::Int(u),
            Err(_) => PathSegment::String(s.to_owned()),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PathSegment::String(s) => write!(f, "{s}"),
            PathSegment::Int(i) => write!(f, "{i}"),
            PathSegment::Bytes(bz) => {
                for b in bz {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}
