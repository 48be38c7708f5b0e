// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;

use crate::encoding::tuple::*;
use crate::encoding::Cbor;

use super::BlockHeader;

/// Block message used as serialized `gossipsub` messages for the blocks
/// topic. Carries the header plus the cid lists of both message lanes.
#[derive(Clone, Debug, PartialEq, Serialize_tuple, Deserialize_tuple)]
pub struct GossipBlock {
    pub header: BlockHeader,
    pub bls_messages: Vec<Cid>,
    pub secpk_messages: Vec<Cid>,
}

impl Cbor for GossipBlock {}

impl GossipBlock {
    /// The cid identifying a gossiped block is the cid of its header,
    /// re-derived from the header bytes; the gossip payload itself is larger
    /// than the header and hashes differently.
    pub fn cid(&self) -> &Cid {
        self.header.cid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::encoding::{from_slice, to_vec};

    #[test]
    fn gossip_block_cid_is_header_cid() {
        use crate::encoding::{new_from_cbor, Code::Blake2b256};

        let header = BlockHeader::builder()
            .miner_address(Address::new_id(7))
            .epoch(5)
            .state_root(new_from_cbor(b"state", Blake2b256))
            .message_receipts(new_from_cbor(b"receipts", Blake2b256))
            .messages(new_from_cbor(b"messages", Blake2b256))
            .build()
            .unwrap();
        let header_cid = *header.cid();

        let block = GossipBlock {
            header,
            bls_messages: vec![],
            secpk_messages: vec![new_from_cbor(b"a-message", Blake2b256)],
        };
        let bz = to_vec(&block).unwrap();
        let decoded: GossipBlock = from_slice(&bz).unwrap();

        assert_eq!(decoded.cid(), &header_cid);
        // the gossip payload hashes differently from the header alone
        assert_ne!(Cbor::cid(&decoded).unwrap(), header_cid);
    }
}
