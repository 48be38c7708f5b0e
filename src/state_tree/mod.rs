// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! View over the chain's actor-state map. The map is a HAMT keyed by wire
//! address bytes with one record per actor.

use cid::Cid;
use indexmap::IndexMap;

use crate::address::Address;
use crate::bigint::{bigint_ser, TokenAmount};
use crate::blockstore::BlockStore;
use crate::encoding::tuple::*;
use crate::ipld::selector::Selector;
use crate::ipld::HAMT_ADL;
use crate::ipld_hamt::{BytesKey, Error as HamtError, Hamt};

/// Bit width of the state map trie.
pub const STATE_TREE_BIT_WIDTH: u32 = 5;

/// State of an actor: its code, the root of its own state, the next message
/// sequence number, and its balance.
#[derive(PartialEq, Eq, Clone, Debug, Serialize_tuple, Deserialize_tuple)]
pub struct ActorState {
    /// Link to code for the actor.
    pub code: Cid,
    /// Link to the state of the actor.
    pub state: Cid,
    /// Sequence of the actor.
    pub sequence: u64,
    /// Tokens available to the actor.
    #[serde(with = "bigint_ser")]
    pub balance: TokenAmount,
}

impl ActorState {
    pub fn new(code: Cid, state: Cid, balance: TokenAmount, sequence: u64) -> Self {
        Self {
            code,
            state,
            sequence,
            balance,
        }
    }
}

/// State tree over a content-addressed store. Reads descend the trie lazily,
/// so a store populated by a partial-state exchange is sufficient to resolve
/// the actors it covers.
pub struct StateTree<'db, BS> {
    hamt: Hamt<'db, BS, ActorState>,
}

impl<'db, BS> StateTree<'db, BS>
where
    BS: BlockStore,
{
    /// Constructs an empty state tree.
    pub fn new(store: &'db BS) -> Self {
        Self {
            hamt: Hamt::new_with_bit_width(store, STATE_TREE_BIT_WIDTH),
        }
    }

    /// Constructs the tree for a given root Cid.
    pub fn load(root: &Cid, store: &'db BS) -> Result<Self, HamtError> {
        Ok(Self {
            hamt: Hamt::load_with_bit_width(root, store, STATE_TREE_BIT_WIDTH)?,
        })
    }

    /// Get actor state from an address.
    pub fn get_actor(&self, addr: &Address) -> Result<Option<&ActorState>, HamtError> {
        self.hamt.get(&BytesKey(addr.to_bytes()))
    }

    /// Set actor state for an address, replacing any prior record.
    pub fn set_actor(&mut self, addr: &Address, actor: ActorState) -> Result<(), HamtError> {
        self.hamt.set(BytesKey(addr.to_bytes()), actor)?;
        Ok(())
    }

    /// Persist dirty nodes and return the new root Cid.
    pub fn flush(&mut self) -> Result<Cid, HamtError> {
        self.hamt.flush()
    }
}

/// Selector that walks the state trie to a single actor's record: a reify
/// guard over the root, then a field lookup keyed by the actor's wire bytes.
/// An engine evaluating it touches exactly the blocks on the search path.
pub fn actor_selector(addr: &Address) -> Selector {
    let mut fields = IndexMap::with_capacity(1);
    fields.insert(BytesKey(addr.to_bytes()), Selector::Matcher);
    Selector::ExploreInterpretAs {
        adl: HAMT_ADL.to_owned(),
        next: Box::new(Selector::ExploreFields { fields }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockstore::MemoryBlockStore;
    use crate::encoding::{new_from_cbor, Code::Blake2b256};

    #[test]
    fn set_flush_get_actor() {
        let store = MemoryBlockStore::default();
        let mut tree = StateTree::new(&store);
        let code = new_from_cbor(b"code", Blake2b256);
        let head = new_from_cbor(b"head", Blake2b256);

        let addr = Address::new_id(42);
        tree.set_actor(&addr, ActorState::new(code, head, 10_000.into(), 3))
            .unwrap();
        let root = tree.flush().unwrap();

        let tree = StateTree::load(&root, &store).unwrap();
        let actor = tree.get_actor(&addr).unwrap().unwrap();
        assert_eq!(actor.sequence, 3);
        assert_eq!(actor.balance, 10_000.into());
        assert_eq!(tree.get_actor(&Address::new_id(43)).unwrap(), None);
    }
}
