// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use once_cell::unsync::OnceCell;
use serde::{de::DeserializeOwned, ser, Deserialize, Serialize};

use crate::blockstore::BlockStore;
use crate::encoding::Code::Blake2b256;
use crate::encoding::{BytesSer, DAG_CBOR};

use super::{bmap_bytes, init_sized_vec, nodes_for_height, Error};

/// This represents a link to another Node
#[derive(Debug)]
pub(crate) enum Link<V> {
    /// Unchanged link to data with a cache.
    Cid {
        cid: Cid,
        cache: OnceCell<Box<Node<V>>>,
    },
    /// Modifications have been made to the link, requires flush to clear
    Dirty(Box<Node<V>>),
}

impl<V> PartialEq for Link<V>
where
    V: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Link::Cid { cid: a, .. }, Link::Cid { cid: b, .. }) => a == b,
            (Link::Dirty(a), Link::Dirty(b)) => a == b,
            _ => false,
        }
    }
}

impl<V> From<Cid> for Link<V> {
    fn from(cid: Cid) -> Link<V> {
        Link::Cid {
            cid,
            cache: Default::default(),
        }
    }
}

/// Node represents either a shard of values in the form of bytes or links to
/// other nodes. A node is either leaf or internal, never both.
#[derive(PartialEq, Debug)]
pub(crate) enum Node<V> {
    /// Node is a link node, contains array of Cid or cached sub nodes.
    Link { links: Vec<Option<Link<V>>> },
    /// Leaf node, this array contains only values.
    Leaf { vals: Vec<Option<V>> },
}

impl<V> Serialize for Node<V>
where
    V: Serialize,
{
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        match &self {
            Node::Leaf { vals } => {
                let mut values = Vec::<&V>::with_capacity(vals.len());
                let mut bmap = vec![0u8; ((vals.len().saturating_sub(1)) / 8) + 1];
                for (i, v) in vals.iter().enumerate() {
                    if let Some(val) = v {
                        values.push(val);
                        bmap[i / 8] |= 1 << (i % 8);
                    }
                }
                (BytesSer(&bmap), Vec::<&Cid>::new(), values).serialize(s)
            }
            Node::Link { links } => {
                let mut collapsed = Vec::<&Cid>::with_capacity(links.len());
                let mut bmap = vec![0u8; ((links.len().saturating_sub(1)) / 8) + 1];
                for (i, v) in links.iter().enumerate() {
                    if let Some(val) = v {
                        if let Link::Cid { cid, .. } = val {
                            collapsed.push(cid);
                            bmap[i / 8] |= 1 << (i % 8);
                        } else {
                            return Err(ser::Error::custom(Error::Cached));
                        }
                    }
                }
                (BytesSer(&bmap), collapsed, Vec::<&V>::new()).serialize(s)
            }
        }
    }
}

/// The structure an AMT node has on the wire: a slot bitmap and compacted
/// lists of links and values. Expanded into a sized [Node] before use.
#[derive(Serialize, Deserialize)]
pub(crate) struct CollapsedNode<V>(#[serde(with = "serde_bytes")] Vec<u8>, Vec<Cid>, Vec<V>);

impl<V> CollapsedNode<V> {
    pub(crate) fn expand(self, bit_width: u32) -> Result<Node<V>, Error> {
        let CollapsedNode(bmap, links, values) = self;
        if !links.is_empty() && !values.is_empty() {
            return Err(Error::LinksAndValues);
        }

        if bmap_bytes(bit_width) != bmap.len() {
            return Err(Error::Other(format!(
                "expected bitfield of length {}, found bitfield with length {}",
                bmap_bytes(bit_width),
                bmap.len()
            )));
        }

        if !links.is_empty() {
            for cid in &links {
                if cid.codec() != DAG_CBOR {
                    return Err(Error::Other(format!(
                        "internal amt nodes must be dag-cbor, link was codec {:#x}",
                        cid.codec()
                    )));
                }
            }
            let mut links_iter = links.into_iter();
            let mut links = init_sized_vec::<Link<V>>(bit_width);
            for (i, v) in links.iter_mut().enumerate() {
                if bmap[i / 8] & (1 << (i % 8)) != 0 {
                    *v = Some(Link::from(links_iter.next().ok_or_else(|| {
                        Error::Other(
                            "Bitmap contained more set bits than links provided".to_string(),
                        )
                    })?))
                }
            }
            if links_iter.next().is_some() {
                return Err(Error::Other(
                    "Bitmap contained less set bits than links provided".to_string(),
                ));
            }
            Ok(Node::Link { links })
        } else {
            let mut val_iter = values.into_iter();
            let mut vals = init_sized_vec::<V>(bit_width);
            for (i, v) in vals.iter_mut().enumerate() {
                if bmap[i / 8] & (1 << (i % 8)) != 0 {
                    *v = Some(val_iter.next().ok_or_else(|| {
                        Error::Other(
                            "Bitmap contained more set bits than values provided".to_string(),
                        )
                    })?)
                }
            }
            if val_iter.next().is_some() {
                return Err(Error::Other(
                    "Bitmap contained less set bits than values provided".to_string(),
                ));
            }
            Ok(Node::Leaf { vals })
        }
    }
}

impl<V> Node<V>
where
    V: Serialize + DeserializeOwned,
{
    /// Empty node. This is an invalid format and should only be used
    /// temporarily to avoid allocations.
    pub(super) fn empty() -> Self {
        Node::Leaf {
            vals: Default::default(),
        }
    }

    /// Flushes cache for node, replacing any cached values with a Cid variant
    pub(super) fn flush<DB: BlockStore>(&mut self, bs: &DB) -> Result<(), Error> {
        if let Node::Link { links } = self {
            for link in links.iter_mut().flatten() {
                // links should only be flushed if the bitmap is set.
                if let Link::Dirty(n) = link {
                    // flush sub node to clear caches
                    n.flush(bs)?;

                    // Puts node in blockstore and retrieves its CID
                    let cid = bs.put(n, Blake2b256)?;

                    // Replace the data with some arbitrary node to move
                    // without requiring clone
                    let existing = std::mem::replace(n, Box::new(Node::empty()));

                    // Can keep the flushed node in link cache
                    let cache = OnceCell::from(existing);
                    *link = Link::Cid { cid, cache };
                }
            }
        }

        Ok(())
    }

    /// Returns true if there are no values in the node.
    pub(super) fn is_empty(&self) -> bool {
        match self {
            Node::Link { links } => links.iter().all(|l| l.is_none()),
            Node::Leaf { vals } => vals.iter().all(|l| l.is_none()),
        }
    }

    /// Gets value at given index of Amt given height
    pub(super) fn get<DB: BlockStore>(
        &self,
        bs: &DB,
        height: u32,
        bit_width: u32,
        i: u64,
    ) -> Result<Option<&V>, Error> {
        let sub_i = i / nodes_for_height(bit_width, height);

        match self {
            Node::Leaf { vals, .. } => Ok(vals.get(i as usize).and_then(|v| v.as_ref())),
            Node::Link { links, .. } => match links.get(sub_i as usize).and_then(|v| v.as_ref()) {
                Some(Link::Cid { cid, cache }) => {
                    let cached_node = cache.get_or_try_init(|| {
                        bs.get::<CollapsedNode<V>>(cid)?
                            .ok_or_else(|| Error::CidNotFound(cid.to_string()))?
                            .expand(bit_width)
                            .map(Box::new)
                    })?;

                    cached_node.get(
                        bs,
                        height - 1,
                        bit_width,
                        i % nodes_for_height(bit_width, height),
                    )
                }
                Some(Link::Dirty(n)) => n.get(
                    bs,
                    height - 1,
                    bit_width,
                    i % nodes_for_height(bit_width, height),
                ),
                None => Ok(None),
            },
        }
    }

    /// Set value in node
    pub(super) fn set<DB: BlockStore>(
        &mut self,
        bs: &DB,
        height: u32,
        bit_width: u32,
        i: u64,
        val: V,
    ) -> Result<Option<V>, Error> {
        if height == 0 {
            return Ok(self.set_leaf(i, val));
        }

        let nfh = nodes_for_height(bit_width, height);

        // If dividing by nodes for height should give an index for link in
        // node
        let idx = (i / nfh) as usize;

        if let Node::Link { links } = self {
            links[idx] = match &mut links[idx] {
                Some(Link::Cid { cid, cache }) => {
                    let cache_node = std::mem::take(cache);
                    let sub_node = if let Some(sn) = cache_node.into_inner() {
                        sn
                    } else {
                        // Only retrieve sub node if not found in cache
                        bs.get::<CollapsedNode<V>>(cid)?
                            .ok_or_else(|| Error::CidNotFound(cid.to_string()))?
                            .expand(bit_width)
                            .map(Box::new)?
                    };

                    Some(Link::Dirty(sub_node))
                }
                None => {
                    let node = match height {
                        1 => Node::Leaf {
                            vals: init_sized_vec(bit_width),
                        },
                        _ => Node::Link {
                            links: init_sized_vec(bit_width),
                        },
                    };
                    Some(Link::Dirty(Box::new(node)))
                }
                Some(Link::Dirty(node)) => return node.set(bs, height - 1, bit_width, i % nfh, val),
            };

            if let Some(Link::Dirty(n)) = &mut links[idx] {
                n.set(bs, height - 1, bit_width, i % nfh, val)
            } else {
                unreachable!("Value is set as cached")
            }
        } else {
            unreachable!("should not be handled");
        }
    }

    fn set_leaf(&mut self, i: u64, val: V) -> Option<V> {
        match self {
            Node::Leaf { vals } => std::mem::replace(
                vals.get_mut(i as usize).expect("index within leaf width"),
                Some(val),
            ),
            Node::Link { .. } => panic!("set_leaf should never be called on a shard of links"),
        }
    }

    pub(super) fn for_each_while<S, F>(
        &self,
        bs: &S,
        height: u32,
        bit_width: u32,
        offset: u64,
        f: &mut F,
    ) -> Result<bool, Error>
    where
        F: FnMut(u64, &V) -> Result<bool, Error>,
        S: BlockStore,
    {
        match self {
            Node::Leaf { vals } => {
                for (i, v) in (0u64..).zip(vals.iter()) {
                    if let Some(v) = v {
                        let keep_going = f(offset + i, v)?;

                        if !keep_going {
                            return Ok(false);
                        }
                    }
                }
            }
            Node::Link { links } => {
                for (i, l) in (0u64..).zip(links.iter()) {
                    if let Some(l) = l {
                        let offs = offset + (i * nodes_for_height(bit_width, height));
                        let keep_going = match l {
                            Link::Dirty(sub) => {
                                sub.for_each_while(bs, height - 1, bit_width, offs, f)?
                            }
                            Link::Cid { cid, cache } => {
                                let cached_node = cache.get_or_try_init(|| {
                                    bs.get::<CollapsedNode<V>>(cid)?
                                        .ok_or_else(|| Error::CidNotFound(cid.to_string()))?
                                        .expand(bit_width)
                                        .map(Box::new)
                                })?;

                                cached_node.for_each_while(bs, height - 1, bit_width, offs, f)?
                            }
                        };

                        if !keep_going {
                            return Ok(false);
                        }
                    }
                }
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{from_slice, to_vec};

    #[test]
    fn serialize_node_symmetric() {
        let node = Node::Leaf { vals: vec![None] };
        let nbz = to_vec(&node).unwrap();
        assert_eq!(
            from_slice::<CollapsedNode<u8>>(&nbz)
                .unwrap()
                .expand(0)
                .unwrap(),
            node
        );
    }

    #[test]
    fn rejects_node_with_links_and_values() {
        // (bitmap 0b11, one link, one value)
        let cid = crate::encoding::new_from_cbor(&[0x01], Blake2b256);
        let node = CollapsedNode(vec![0x03], vec![cid], vec![1u64]);
        assert_eq!(node.expand(3).unwrap_err(), Error::LinksAndValues);
    }

    #[test]
    fn rejects_bitmap_length_mismatch() {
        let node: CollapsedNode<u64> = CollapsedNode(vec![0x01, 0x00], vec![], vec![1]);
        assert!(matches!(node.expand(3).unwrap_err(), Error::Other(_)));
    }

    #[test]
    fn rejects_wrong_popcount() {
        // bitmap claims two set bits, only one value supplied
        let node: CollapsedNode<u64> = CollapsedNode(vec![0x03], vec![], vec![1]);
        assert!(matches!(node.expand(3).unwrap_err(), Error::Other(_)));
        // bitmap claims one set bit, two values supplied
        let node: CollapsedNode<u64> = CollapsedNode(vec![0x01], vec![], vec![1, 2]);
        assert!(matches!(node.expand(3).unwrap_err(), Error::Other(_)));
    }

    #[test]
    fn rejects_non_dag_cbor_links() {
        use multihash::MultihashDigest;
        let raw_cid = Cid::new_v1(0x55, multihash::Code::Blake2b256.digest(&[0x01]));
        let node: CollapsedNode<u64> = CollapsedNode(vec![0x01], vec![raw_cid], vec![]);
        assert!(matches!(node.expand(3).unwrap_err(), Error::Other(_)));
    }
}
