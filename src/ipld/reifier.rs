// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use sha2::{Digest, Sha256};

use crate::ipld_hamt::HashBits;

use super::selector::LinkResolver;
use super::{Error, Ipld};

/// Name under which the trie view is registered for `ExploreInterpretAs`
/// guards. Links inside the reified view are dag-cbor, BLAKE2b-256, CID v1.
pub const HAMT_ADL: &str = "hamt";

/// Trie parameter of the chain's state map.
const HAMT_ADL_BIT_WIDTH: u32 = 5;

/// Promotes a raw decoded node into the structured view registered under
/// `name`. The walk engine calls this when it meets a reify guard.
pub(crate) fn reify(name: &str, node: &Ipld) -> Result<ReifiedNode, Error> {
    match name {
        HAMT_ADL => Ok(ReifiedNode::Hamt(ReifiedHamt::new(
            node,
            HAMT_ADL_BIT_WIDTH,
        )?)),
        other => Err(Error::Custom(format!("no reifier registered for {other}"))),
    }
}

/// A reified node; field access resolves through the underlying data
/// structure with on-demand block fetches.
pub(crate) enum ReifiedNode {
    Hamt(ReifiedHamt),
}

impl ReifiedNode {
    pub(crate) async fn lookup<L>(
        &self,
        key: &[u8],
        resolver: &mut Option<L>,
    ) -> Result<Option<Ipld>, Error>
    where
        L: LinkResolver + Send + Sync,
    {
        match self {
            ReifiedNode::Hamt(hamt) => hamt.lookup(key, resolver).await,
        }
    }
}

/// Map view over a raw trie root. A keyed lookup descends by hashed key,
/// loading only the node blocks on the search path; nothing outside the path
/// is touched.
pub(crate) struct ReifiedHamt {
    bit_width: u32,
    root: Ipld,
}

impl ReifiedHamt {
    pub(crate) fn new(root: &Ipld, bit_width: u32) -> Result<Self, Error> {
        // validate the node shape up front so lookups can assume it
        decompose_node(root)?;
        Ok(Self {
            bit_width,
            root: root.clone(),
        })
    }

    pub(crate) async fn lookup<L>(
        &self,
        key: &[u8],
        resolver: &mut Option<L>,
    ) -> Result<Option<Ipld>, Error>
    where
        L: LinkResolver + Send + Sync,
    {
        let hash: [u8; 32] = Sha256::digest(key).into();
        let mut bits = HashBits::new(&hash);
        let mut node = self.root.clone();

        loop {
            let (bitfield, pointers) = decompose_node(&node)?;
            let idx = bits
                .next(self.bit_width)
                .map_err(|e| Error::Custom(e.to_string()))?;
            if !test_bit(bitfield, idx) {
                return Ok(None);
            }
            let cindex = ones_below(bitfield, idx);
            let pointer = pointers
                .get(cindex)
                .ok_or_else(|| Error::Custom("trie pointer index out of bounds".into()))?;

            let map = match pointer {
                Ipld::Map(m) => m,
                _ => return Err(Error::Custom("malformed trie pointer".into())),
            };
            if let Some(Ipld::Link(cid)) = map.get("0") {
                let resolver = resolver
                    .as_mut()
                    .ok_or_else(|| Error::Link("no link resolver for reified lookup".into()))?;
                node = resolver
                    .load_link(cid)
                    .await
                    .map_err(Error::Link)?
                    .ok_or_else(|| Error::Link(format!("block {cid} not found")))?;
            } else if let Some(Ipld::List(kvs)) = map.get("1") {
                for kv in kvs {
                    if let Ipld::List(pair) = kv {
                        if let (Some(Ipld::Bytes(k)), Some(v)) = (pair.first(), pair.get(1)) {
                            if k.as_slice() == key {
                                return Ok(Some(v.clone()));
                            }
                        }
                    }
                }
                return Ok(None);
            } else {
                return Err(Error::Custom("malformed trie pointer".into()));
            }
        }
    }
}

/// Splits a raw trie node into its bitfield bytes and pointer list.
fn decompose_node(node: &Ipld) -> Result<(&[u8], &[Ipld]), Error> {
    match node {
        Ipld::List(items) => match (items.first(), items.get(1), items.len()) {
            (Some(Ipld::Bytes(bitfield)), Some(Ipld::List(pointers)), 2) => {
                Ok((bitfield, pointers))
            }
            _ => Err(Error::Custom("node is not a (bitfield, pointers) pair".into())),
        },
        _ => Err(Error::Custom("node is not a (bitfield, pointers) pair".into())),
    }
}

// The bitfield arrives as a minimal big-endian byte string; bit 0 is the
// least significant bit of the last byte.
fn test_bit(bitfield: &[u8], idx: u32) -> bool {
    let byte = (idx / 8) as usize;
    if byte >= bitfield.len() {
        return false;
    }
    bitfield[bitfield.len() - 1 - byte] & (1 << (idx % 8)) != 0
}

fn ones_below(bitfield: &[u8], idx: u32) -> usize {
    (0..idx).filter(|&i| test_bit(bitfield, i)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitfield_bit_order() {
        // 0b0001_0000 0b0000_0011: bits 0, 1 and 12 set
        let bf = [0x10u8, 0x03];
        assert!(test_bit(&bf, 0));
        assert!(test_bit(&bf, 1));
        assert!(!test_bit(&bf, 2));
        assert!(test_bit(&bf, 12));
        assert!(!test_bit(&bf, 200));
        assert_eq!(ones_below(&bf, 12), 2);
        assert_eq!(ones_below(&bf, 1), 1);
    }

    #[test]
    fn unknown_reifier_name() {
        assert!(reify("car", &Ipld::Null).is_err());
    }
}
