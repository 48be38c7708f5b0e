// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;

use crate::blockstore::BlockStore;
use crate::encoding::Code::Blake2b256;
use crate::encoding::{de::DeserializeOwned, ser::Serialize};

use super::root::{Root, RootV0};
use super::{nodes_for_height, Error, DEFAULT_BIT_WIDTH, MAX_HEIGHT, MAX_INDEX};

/// Array Mapped Trie used as a sparse vector, serializable to a CID.
///
/// Usage:
/// ```
/// use lumen::ipld_amt::Amt;
/// use lumen::blockstore::MemoryBlockStore;
///
/// let db = MemoryBlockStore::default();
/// let mut amt = Amt::new(&db);
///
/// amt.set(2, "foo".to_owned()).unwrap();
/// assert_eq!(amt.get(2).unwrap(), Some(&"foo".to_owned()));
/// assert_eq!(amt.count(), 1);
///
/// // Generate cid by calling flush to remove cache
/// let cid = amt.flush().unwrap();
/// ```
#[derive(Debug)]
pub struct Amt<'db, V, BS> {
    root: Root<V>,
    block_store: &'db BS,
}

impl<'db, V, BS> Amt<'db, V, BS>
where
    V: DeserializeOwned + Serialize,
    BS: BlockStore,
{
    /// Constructor for Root AMT node
    pub fn new(block_store: &'db BS) -> Self {
        Self::new_with_bit_width(block_store, DEFAULT_BIT_WIDTH)
    }

    /// Construct new Amt with given bit width
    pub fn new_with_bit_width(block_store: &'db BS, bit_width: u32) -> Self {
        Self {
            root: Root::new(bit_width),
            block_store,
        }
    }

    /// Construct a new vector in the legacy "adt0" format, which has a fixed
    /// bit width of 8 and omits it from the serialized header.
    pub fn new_adt0(block_store: &'db BS) -> Self {
        Self {
            root: Root::new_v0(),
            block_store,
        }
    }

    /// Gets the bit width of the vector's nodes.
    pub fn bit_width(&self) -> u32 {
        self.root.bit_width
    }

    /// Constructs an AMT with a blockstore and a Cid of the root of the AMT
    pub fn load(cid: &Cid, block_store: &'db BS) -> Result<Self, Error> {
        let root: Root<V> = block_store
            .get(cid)?
            .ok_or_else(|| Error::CidNotFound(cid.to_string()))?;

        // Sanity check, this should never be possible.
        if root.height > MAX_HEIGHT {
            return Err(Error::MaxHeight(root.height, MAX_HEIGHT));
        }

        Ok(Self { root, block_store })
    }

    /// Constructs an AMT from a root in the legacy "adt0" format.
    pub fn load_adt0(cid: &Cid, block_store: &'db BS) -> Result<Self, Error> {
        let RootV0(root) = block_store
            .get(cid)?
            .ok_or_else(|| Error::CidNotFound(cid.to_string()))?;

        if root.height > MAX_HEIGHT {
            return Err(Error::MaxHeight(root.height, MAX_HEIGHT));
        }

        Ok(Self { root, block_store })
    }

    /// Gets the height of the `Amt`.
    pub fn height(&self) -> u32 {
        self.root.height
    }

    /// Gets count of elements added in the `Amt`.
    pub fn count(&self) -> u64 {
        self.root.count
    }

    /// Generates an AMT with block store and array of cbor marshallable
    /// objects and returns Cid
    pub fn new_from_iter(
        block_store: &'db BS,
        vals: impl IntoIterator<Item = V>,
    ) -> Result<Cid, Error> {
        let mut t = Self::new(block_store);

        t.batch_set(vals)?;

        t.flush()
    }

    /// Get value at index of AMT
    pub fn get(&self, i: u64) -> Result<Option<&V>, Error> {
        if i > MAX_INDEX {
            return Err(Error::OutOfRange(i));
        }

        // Short-circuit without any block fetch when the index is past the
        // capacity of the current tree.
        if i >= nodes_for_height(self.bit_width(), self.height() + 1) {
            return Ok(None);
        }

        self.root
            .node
            .get(self.block_store, self.height(), self.bit_width(), i)
    }

    /// Set value at index
    pub fn set(&mut self, i: u64, val: V) -> Result<(), Error> {
        if i > MAX_INDEX {
            return Err(Error::OutOfRange(i));
        }

        while i >= nodes_for_height(self.bit_width(), self.height() + 1) {
            // node at index exists
            if !self.root.node.is_empty() {
                // Parent node for expansion
                let mut new_links: Vec<Option<super::node::Link<V>>> =
                    super::init_sized_vec(self.root.bit_width);

                // Take root node to be moved down
                let node = std::mem::replace(&mut self.root.node, super::Node::empty());

                // Set link to child node being expanded
                new_links[0] = Some(super::node::Link::Dirty(Box::new(node)));

                self.root.node = super::Node::Link { links: new_links };
            } else {
                // If first expansion is before a value inserted, convert base
                // node to Link
                self.root.node = super::Node::Link {
                    links: super::init_sized_vec(self.bit_width()),
                };
            }
            // Increment height after each iteration
            self.root.height += 1;
        }

        if self
            .root
            .node
            .set(self.block_store, self.height(), self.bit_width(), i, val)?
            .is_none()
        {
            self.root.count += 1;
        }

        Ok(())
    }

    /// Batch set (naive for now)
    pub fn batch_set(&mut self, vals: impl IntoIterator<Item = V>) -> Result<(), Error> {
        for (i, val) in vals.into_iter().enumerate() {
            self.set(i as u64, val)?;
        }

        Ok(())
    }

    /// flush root and return Cid used as key in block store
    pub fn flush(&mut self) -> Result<Cid, Error> {
        self.root.node.flush(self.block_store)?;
        Ok(self.block_store.put(&self.root, Blake2b256)?)
    }

    /// Iterates over each value in the Amt and runs a function on the values.
    ///
    /// The index in the amt is a `u64` and the value is the generic parameter
    /// `V` as defined in the Amt. Iteration is in ascending index order,
    /// fetching node blocks lazily.
    ///
    /// # Examples
    ///
    /// ```
    /// use lumen::ipld_amt::Amt;
    /// use lumen::blockstore::MemoryBlockStore;
    ///
    /// let store = MemoryBlockStore::default();
    ///
    /// let mut map: Amt<String, _> = Amt::new(&store);
    /// map.set(1, "One".to_owned()).unwrap();
    /// map.set(4, "Four".to_owned()).unwrap();
    ///
    /// let mut values: Vec<(u64, String)> = Vec::new();
    /// map.for_each(|i, v| {
    ///    values.push((i, v.clone()));
    ///    Ok(())
    /// }).unwrap();
    /// assert_eq!(&values, &[(1, "One".to_owned()), (4, "Four".to_owned())]);
    /// ```
    #[inline]
    pub fn for_each<F>(&self, mut f: F) -> Result<(), Error>
    where
        F: FnMut(u64, &V) -> Result<(), Error>,
    {
        self.for_each_while(|i, x| {
            f(i, x)?;
            Ok(true)
        })
    }

    /// Iterates over each value in the Amt and runs a function on the values,
    /// for as long as that function keeps returning `true`.
    pub fn for_each_while<F>(&self, mut f: F) -> Result<(), Error>
    where
        F: FnMut(u64, &V) -> Result<bool, Error>,
    {
        self.root
            .node
            .for_each_while(self.block_store, self.height(), self.bit_width(), 0, &mut f)
            .map(|_| ())
    }
}
