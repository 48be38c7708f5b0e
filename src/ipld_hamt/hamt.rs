// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::borrow::Borrow;
use std::marker::PhantomData;

use cid::Cid;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};

use crate::blockstore::BlockStore;
use crate::encoding::Code::Blake2b256;

use super::node::Node;
use super::{BytesKey, Error, Hash, HashAlgorithm, Sha256, DEFAULT_BIT_WIDTH};

/// Implementation of the HAMT data structure for IPLD.
///
/// # Examples
///
/// ```
/// use lumen::ipld_hamt::Hamt;
/// use lumen::blockstore::MemoryBlockStore;
///
/// let store = MemoryBlockStore::default();
///
/// let mut map: Hamt<_, _, u64> = Hamt::new(&store);
/// map.set(1, "a".to_string()).unwrap();
/// assert_eq!(map.get(&1).unwrap(), Some(&"a".to_string()));
/// let cid = map.flush().unwrap();
/// ```
#[derive(Debug)]
pub struct Hamt<'a, BS, V, K = BytesKey, H = Sha256> {
    root: Node<K, V, H>,
    store: &'a BS,

    bit_width: u32,
    hash: PhantomData<H>,
}

impl<BS, V, K, H> Serialize for Hamt<'_, BS, V, K, H>
where
    K: Serialize,
    V: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.root.serialize(serializer)
    }
}

impl<'a, BS, V, K, H> Hamt<'a, BS, V, K, H>
where
    K: Hash + Eq + PartialOrd + Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
    BS: BlockStore,
    H: HashAlgorithm,
{
    pub fn new(store: &'a BS) -> Self {
        Self::new_with_bit_width(store, DEFAULT_BIT_WIDTH)
    }

    /// Construct hamt with a bit width
    pub fn new_with_bit_width(store: &'a BS, bit_width: u32) -> Self {
        Self {
            root: Node::default(),
            store,
            bit_width,
            hash: Default::default(),
        }
    }

    /// Lazily instantiate a hamt from this root Cid.
    pub fn load(cid: &Cid, store: &'a BS) -> Result<Self, Error> {
        Self::load_with_bit_width(cid, store, DEFAULT_BIT_WIDTH)
    }

    /// Lazily instantiate a hamt from this root Cid with a specified bit
    /// width.
    pub fn load_with_bit_width(cid: &Cid, store: &'a BS, bit_width: u32) -> Result<Self, Error> {
        match store
            .get(cid)
            .map_err(|e| Error::Store(e.to_string()))?
        {
            Some(root) => Ok(Self {
                root,
                store,
                bit_width,
                hash: Default::default(),
            }),
            None => Err(Error::CidNotFound(cid.to_string())),
        }
    }

    /// Returns a reference to the underlying store of the Hamt.
    pub fn store(&self) -> &'a BS {
        self.store
    }

    /// Inserts a key-value pair into the HAMT.
    ///
    /// If the HAMT did not have this key present, `None` is returned.
    ///
    /// If the HAMT did have this key present, the value is updated, and the
    /// old value is returned.
    pub fn set(&mut self, key: K, value: V) -> Result<Option<V>, Error>
    where
        V: PartialEq,
    {
        self.root
            .set(key, value, self.store, self.bit_width, true)
            .map(|(r, _)| r)
    }

    /// Returns a reference to the value corresponding to the key.
    #[inline]
    pub fn get<Q: ?Sized>(&self, k: &Q) -> Result<Option<&V>, Error>
    where
        K: Borrow<Q>,
        Q: Hash + Eq,
    {
        match self.root.get(k, self.store, self.bit_width)? {
            Some(v) => Ok(Some(v)),
            None => Ok(None),
        }
    }

    /// Returns true if the HAMT contains no key value pairs.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Flush root and return Cid for hamt
    pub fn flush(&mut self) -> Result<Cid, Error> {
        self.root.flush(self.store)?;
        self.store
            .put(&self.root, Blake2b256)
            .map_err(|e| Error::Store(e.to_string()))
    }

    /// Iterates over each KV in the Hamt and runs a function on the values.
    ///
    /// This function will constrain all values to be of the same type.
    #[inline]
    pub fn for_each<F>(&self, mut f: F) -> Result<(), Error>
    where
        F: FnMut(&K, &V) -> Result<(), Error>,
    {
        self.root.for_each(self.store, &mut f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockstore::{BSStats, MemoryBlockStore, TrackingBlockStore};

    #[test]
    fn set_get_flush_reload() {
        let store = MemoryBlockStore::default();
        let mut map: Hamt<_, String> = Hamt::new_with_bit_width(&store, 5);
        for i in 0..200u64 {
            map.set(BytesKey(i.to_be_bytes().to_vec()), i.to_string())
                .unwrap();
        }
        let cid = map.flush().unwrap();

        let back: Hamt<_, String> = Hamt::load_with_bit_width(&cid, &store, 5).unwrap();
        for i in 0..200u64 {
            assert_eq!(
                back.get(&BytesKey(i.to_be_bytes().to_vec())).unwrap(),
                Some(&i.to_string())
            );
        }
        assert_eq!(back.get(&BytesKey(b"missing".to_vec())).unwrap(), None);
    }

    #[test]
    fn overwrite_returns_previous() {
        let store = MemoryBlockStore::default();
        let mut map: Hamt<_, String> = Hamt::new(&store);
        assert_eq!(map.set("a".into(), "x".to_string()).unwrap(), None);
        assert_eq!(
            map.set("a".into(), "y".to_string()).unwrap(),
            Some("x".to_string())
        );
        assert_eq!(map.get(&BytesKey::from("a")).unwrap(), Some(&"y".to_string()));
    }

    #[test]
    fn lazy_search_fetches_only_path_nodes() {
        let store = MemoryBlockStore::default();
        let mut map: Hamt<_, u64> = Hamt::new_with_bit_width(&store, 5);
        for i in 0..5_000u64 {
            map.set(BytesKey(i.to_be_bytes().to_vec()), i).unwrap();
        }
        let cid = map.flush().unwrap();

        let tracked = TrackingBlockStore::new(&store);
        let map: Hamt<_, u64> = Hamt::load_with_bit_width(&cid, &tracked, 5).unwrap();
        map.get(&BytesKey(42u64.to_be_bytes().to_vec())).unwrap();
        let stats: BSStats = *map.store().stats.borrow();
        // root load plus at most a handful of inner nodes, never the full
        // tree
        assert!(stats.r >= 2 && stats.r <= 5, "reads: {}", stats.r);
        assert_eq!(stats.w, 0);
    }

    #[test]
    fn for_each_visits_every_entry() {
        let store = MemoryBlockStore::default();
        let mut map: Hamt<_, u64> = Hamt::new(&store);
        for i in 0..50u64 {
            map.set(BytesKey(i.to_be_bytes().to_vec()), i).unwrap();
        }
        let mut count = 0;
        map.for_each(|_, _| {
            count += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(count, 50);
    }
}
