// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use derive_builder::Builder;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::address::Address;
use crate::bigint::bigint_ser::{BigIntDe, BigIntSer};
use crate::bigint::{BigInt, TokenAmount};
use crate::encoding::{self, new_from_cbor, Cbor, Code::Blake2b256, Error as EncodingError};
use crate::ipld::Ipld;

use super::{ChainEpoch, TipsetKeys};

/// Header of a block.
///
/// The wire form is a fixed 16-field array in canonical order. The fields a
/// light client reads are typed; consensus-only fields pass through as
/// opaque [Ipld] so that re-encoding a received header is byte-identical and
/// its cid can be re-derived.
///
/// Usage:
/// ```
/// use lumen::blocks::{BlockHeader, TipsetKeys};
/// use lumen::address::Address;
///
/// BlockHeader::builder()
///     .miner_address(Address::new_id(0)) // optional
///     .epoch(1) // optional
///     .build()
///     .unwrap();
/// ```
#[derive(Clone, Debug, Builder)]
#[builder(name = "BlockHeaderBuilder")]
pub struct BlockHeader {
    /// The address of the miner actor that mined this block.
    #[builder(default = "Address::new_id(0)")]
    miner_address: Address,

    /// The verifiable oracle randomness used to elect this block's author.
    /// Opaque to the client.
    #[builder(default = "Ipld::Null")]
    ticket: Ipld,

    /// Election proof; opaque to the client.
    #[builder(default = "Ipld::Null")]
    election_proof: Ipld,

    /// Beacon entries; opaque to the client.
    #[builder(default = "Ipld::List(Vec::new())")]
    beacon_entries: Ipld,

    /// Winning PoSt proofs; opaque to the client.
    #[builder(default = "Ipld::List(Vec::new())")]
    winning_post_proof: Ipld,

    /// The set of parents this block was based on. Typically one, but can be
    /// several in the case where there were multiple winning ticket holders
    /// for an epoch.
    #[builder(default)]
    parents: TipsetKeys,

    /// The aggregate chain weight of the parent set.
    #[builder(default)]
    weight: BigInt,

    /// The period in which a new block is generated. There may be multiple
    /// rounds in an epoch.
    #[builder(default)]
    epoch: ChainEpoch,

    /// The cid of the parent state root after calculating parent tipset.
    #[builder(default)]
    state_root: Cid,

    /// The cid of the root of an array of message receipts of the parent
    /// tipset.
    #[builder(default)]
    message_receipts: Cid,

    /// The cid of the merkle links for bls_messages and secp_messages.
    #[builder(default)]
    messages: Cid,

    /// Aggregate signature of miner in block; opaque to the client.
    #[builder(default = "Ipld::Null")]
    bls_aggregate: Ipld,

    /// The block timestamp, in seconds since the Unix epoch.
    #[builder(default)]
    timestamp: u64,

    /// The miner's signature over the header; opaque to the client.
    #[builder(default = "Ipld::Null")]
    signature: Ipld,

    #[builder(default)]
    fork_signal: u64,

    /// The base fee of the parent block.
    #[builder(default)]
    parent_base_fee: TokenAmount,

    /// Cached cid of the block header, derived on first access.
    #[builder(default, setter(skip))]
    cached_cid: OnceCell<Cid>,

    /// Cached serialized bytes of the header.
    #[builder(default, setter(skip))]
    cached_bytes: OnceCell<Vec<u8>>,
}

impl PartialEq for BlockHeader {
    fn eq(&self, other: &Self) -> bool {
        self.cid().eq(other.cid())
    }
}

impl Cbor for BlockHeader {
    fn marshal_cbor(&self) -> Result<Vec<u8>, EncodingError> {
        Ok(self.cached_bytes().clone())
    }
    fn cid(&self) -> Result<Cid, EncodingError> {
        Ok(*self.cid())
    }
}

impl Serialize for BlockHeader {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (
            &self.miner_address,
            &self.ticket,
            &self.election_proof,
            &self.beacon_entries,
            &self.winning_post_proof,
            &self.parents,
            BigIntSer(&self.weight),
            &self.epoch,
            &self.state_root,
            &self.message_receipts,
            &self.messages,
            &self.bls_aggregate,
            &self.timestamp,
            &self.signature,
            &self.fork_signal,
            BigIntSer(&self.parent_base_fee),
        )
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BlockHeader {
    fn deserialize<D>(deserializer: D) -> Result<Self, <D as Deserializer<'de>>::Error>
    where
        D: Deserializer<'de>,
    {
        let (
            miner_address,
            ticket,
            election_proof,
            beacon_entries,
            winning_post_proof,
            parents,
            BigIntDe(weight),
            epoch,
            state_root,
            message_receipts,
            messages,
            bls_aggregate,
            timestamp,
            signature,
            fork_signal,
            BigIntDe(parent_base_fee),
        ) = Deserialize::deserialize(deserializer)?;

        Ok(BlockHeader {
            miner_address,
            ticket,
            election_proof,
            beacon_entries,
            winning_post_proof,
            parents,
            weight,
            epoch,
            state_root,
            message_receipts,
            messages,
            bls_aggregate,
            timestamp,
            signature,
            fork_signal,
            parent_base_fee,
            cached_bytes: Default::default(),
            cached_cid: Default::default(),
        })
    }
}

impl BlockHeader {
    /// Generates a BlockHeader builder as a constructor
    pub fn builder() -> BlockHeaderBuilder {
        BlockHeaderBuilder::default()
    }
    /// Getter for BlockHeader parents
    pub fn parents(&self) -> &TipsetKeys {
        &self.parents
    }
    /// Getter for BlockHeader weight
    pub fn weight(&self) -> &BigInt {
        &self.weight
    }
    /// Getter for BlockHeader epoch
    pub fn epoch(&self) -> ChainEpoch {
        self.epoch
    }
    /// Getter for BlockHeader miner_address
    pub fn miner_address(&self) -> &Address {
        &self.miner_address
    }
    /// Getter for BlockHeader messages
    pub fn messages(&self) -> &Cid {
        &self.messages
    }
    /// Getter for BlockHeader message_receipts
    pub fn message_receipts(&self) -> &Cid {
        &self.message_receipts
    }
    /// Getter for BlockHeader state_root
    pub fn state_root(&self) -> &Cid {
        &self.state_root
    }
    /// Getter for BlockHeader timestamp
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }
    /// Getter for BlockHeader parent_base_fee
    pub fn parent_base_fee(&self) -> &BigInt {
        &self.parent_base_fee
    }
    /// Getter for BlockHeader fork_signal
    pub fn fork_signal(&self) -> u64 {
        self.fork_signal
    }
    /// Getter for BlockHeader cid. The cid is derived from the re-encoded
    /// header bytes and cached after the first call.
    pub fn cid(&self) -> &Cid {
        self.cached_cid
            .get_or_init(|| new_from_cbor(self.cached_bytes(), Blake2b256))
    }
    /// Updates cache and returns reference to the serialized header bytes.
    fn cached_bytes(&self) -> &Vec<u8> {
        self.cached_bytes
            .get_or_init(|| encoding::to_vec(self).expect("header serialization cannot fail"))
    }
}

/// human-readable string representation of a block CID
impl fmt::Display for BlockHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "BlockHeader: {:?}", self.cid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{from_slice, to_vec};

    #[test]
    fn symmetric_header_encoding() {
        let header = BlockHeader::builder()
            .miner_address(Address::new_id(100))
            .epoch(33)
            .parents(TipsetKeys(vec![new_from_cbor(b"parent", Blake2b256)]))
            .state_root(new_from_cbor(b"state", Blake2b256))
            .message_receipts(new_from_cbor(b"receipts", Blake2b256))
            .messages(new_from_cbor(b"messages", Blake2b256))
            .parent_base_fee(BigInt::from(100))
            .build()
            .unwrap();

        let bz = to_vec(&header).unwrap();
        let decoded: BlockHeader = from_slice(&bz).unwrap();
        assert_eq!(decoded, header);
        // re-encoding the decoded header reproduces the received bytes
        assert_eq!(decoded.marshal_cbor().unwrap(), bz);
        assert_eq!(decoded.cid(), header.cid());
    }
}
