// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use libp2p::core::ProtocolName;

use crate::bigint::{bigint_ser, BigInt};
use crate::blocks::ChainEpoch;
use crate::encoding::tuple::*;

use super::codec::CborRequestResponse;

/// Libp2p Hello protocol ID.
pub const HELLO_PROTOCOL_ID: &[u8] = b"/fil/hello/1.0.0";

/// Type to satisfy `ProtocolName` interface for Hello RPC.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct HelloProtocolName;

impl ProtocolName for HelloProtocolName {
    fn protocol_name(&self) -> &[u8] {
        HELLO_PROTOCOL_ID
    }
}

/// Hello protocol codec to be used within the RPC service.
pub type HelloCodec = CborRequestResponse<HelloProtocolName, HelloRequest, HelloResponse>;

/// Handshake sent to every newly connected peer, announcing the sender's
/// current head and genesis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct HelloRequest {
    pub heaviest_tip_set: Vec<Cid>,
    pub heaviest_tipset_height: ChainEpoch,
    #[serde(with = "bigint_ser")]
    pub heaviest_tipset_weight: BigInt,
    pub genesis_cid: Cid,
}

/// Response to a Hello message. This just handles latency of the peer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct HelloResponse {
    /// Time of arrival to peer in UNIX nanoseconds.
    pub arrival: u64,
    /// Time sent from peer in UNIX nanoseconds.
    pub sent: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{from_slice, new_from_cbor, to_vec, Code::Blake2b256};

    #[test]
    fn hello_symmetric_ser() {
        let orig_msg = HelloRequest {
            heaviest_tip_set: vec![new_from_cbor(&[], Blake2b256)],
            heaviest_tipset_height: 7,
            heaviest_tipset_weight: BigInt::from(1_000u32),
            genesis_cid: new_from_cbor(b"genesis", Blake2b256),
        };
        let bz = to_vec(&orig_msg).unwrap();
        let msg: HelloRequest = from_slice(&bz).unwrap();
        assert_eq!(msg, orig_msg);
    }
}
