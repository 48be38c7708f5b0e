// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use libp2p::core::ProtocolName;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use cid::Cid;

use crate::blocks::BlockHeader;
use crate::encoding::tuple::*;
use crate::message::{SignedMessage, UnsignedMessage};

use super::codec::CborRequestResponse;

/// Libp2p protocol ID for `ChainExchange`.
pub const CHAIN_XCHG_PROTOCOL_ID: &[u8] = b"/fil/chain/xchg/0.0.1";

/// Type to satisfy `ProtocolName` interface for `ChainExchange` RPC.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ChainExchangeProtocolName;

impl ProtocolName for ChainExchangeProtocolName {
    fn protocol_name(&self) -> &[u8] {
        CHAIN_XCHG_PROTOCOL_ID
    }
}

/// `ChainExchange` protocol codec to be used within the RPC service.
pub type ChainExchangeCodec =
    CborRequestResponse<ChainExchangeProtocolName, ChainExchangeRequest, ChainExchangeResponse>;

/// `ChainExchange` Filecoin header set bit.
pub const HEADERS: u64 = 0b01;
/// `ChainExchange` Filecoin messages set bit.
pub const MESSAGES: u64 = 0b10;

/// The payload that gets sent to another node to request for blocks and
/// messages.
#[derive(Clone, Debug, PartialEq, Serialize_tuple, Deserialize_tuple)]
pub struct ChainExchangeRequest {
    /// The tipset [Cid] to start the request from.
    pub start: Vec<Cid>,
    /// The amount of epochs to request.
    pub request_len: u64,
    /// 1 = Block only, 2 = Messages only, 3 = Blocks and Messages.
    pub options: u64,
}

impl ChainExchangeRequest {
    /// If a request has the [HEADERS] bit set and requests Filecoin headers.
    pub fn include_blocks(&self) -> bool {
        self.options & HEADERS > 0
    }

    /// If a request has the [MESSAGES] bit set and requests messages of a
    /// block.
    pub fn include_messages(&self) -> bool {
        self.options & MESSAGES > 0
    }
}

/// Status codes of a chain_exchange response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainExchangeResponseStatus {
    /// All is well.
    Success,
    /// We could not fetch all blocks requested (but at least we returned
    /// the `Head` requested). Not considered an error.
    PartialResponse,
    /// Request.Start not found.
    BlockNotFound,
    /// Requester is making too many requests.
    GoAway,
    /// Internal error occurred.
    InternalError,
    /// Request was bad.
    BadRequest,
    /// Other undefined response code.
    Other(i32),
}

impl Serialize for ChainExchangeResponseStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use ChainExchangeResponseStatus::*;
        let code: i32 = match self {
            Success => 0,
            PartialResponse => 101,
            BlockNotFound => 201,
            GoAway => 202,
            InternalError => 203,
            BadRequest => 204,
            Other(i) => *i,
        };
        code.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ChainExchangeResponseStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, <D as Deserializer<'de>>::Error>
    where
        D: Deserializer<'de>,
    {
        let code: i32 = Deserialize::deserialize(deserializer)?;

        use ChainExchangeResponseStatus::*;
        let status = match code {
            0 => Success,
            101 => PartialResponse,
            201 => BlockNotFound,
            202 => GoAway,
            203 => InternalError,
            204 => BadRequest,
            x => Other(x),
        };
        Ok(status)
    }
}

/// The response to a ChainExchange request.
#[derive(Clone, Debug, PartialEq, Serialize_tuple, Deserialize_tuple)]
pub struct ChainExchangeResponse {
    /// Status code of the response.
    pub status: ChainExchangeResponseStatus,
    /// Status message indicating failure reason.
    pub message: String,
    /// The tipsets requested.
    pub chain: Vec<TipsetBundle>,
}

impl ChainExchangeResponse {
    /// Converts chain_exchange response into result. Returns an error with
    /// the protocol's failure string if the response status is neither
    /// success nor partial.
    pub fn into_result(self) -> Result<Vec<TipsetBundle>, String> {
        if self.status != ChainExchangeResponseStatus::Success
            && self.status != ChainExchangeResponseStatus::PartialResponse
        {
            return Err(format!("Status {:?}: {}", self.status, self.message));
        }
        Ok(self.chain)
    }
}

/// Contains all bls and secp messages and their indexes per block
#[derive(Clone, Debug, PartialEq, Serialize_tuple, Deserialize_tuple)]
pub struct CompactedMessages {
    /// Unsigned bls messages.
    pub bls_msgs: Vec<UnsignedMessage>,
    /// Describes which block each message belongs to.
    pub bls_msg_includes: Vec<Vec<u64>>,

    /// Signed secp messages.
    pub secp_msgs: Vec<SignedMessage>,
    /// Describes which block each message belongs to.
    pub secp_msg_includes: Vec<Vec<u64>>,
}

/// Contains the blocks and messages in a particular tipset
#[derive(Clone, Debug, PartialEq, Default, Serialize_tuple, Deserialize_tuple)]
pub struct TipsetBundle {
    /// The blocks in the tipset.
    pub blocks: Vec<BlockHeader>,

    /// Compressed messages format.
    pub messages: Option<CompactedMessages>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{from_slice, to_vec};

    #[test]
    fn status_codes_are_bit_exact() {
        for (status, code) in [
            (ChainExchangeResponseStatus::Success, 0i32),
            (ChainExchangeResponseStatus::PartialResponse, 101),
            (ChainExchangeResponseStatus::BlockNotFound, 201),
            (ChainExchangeResponseStatus::GoAway, 202),
            (ChainExchangeResponseStatus::InternalError, 203),
            (ChainExchangeResponseStatus::BadRequest, 204),
        ] {
            let bz = to_vec(&status).unwrap();
            assert_eq!(bz, to_vec(&code).unwrap());
            assert_eq!(from_slice::<ChainExchangeResponseStatus>(&bz).unwrap(), status);
        }
    }

    #[test]
    fn non_ok_statuses_fail_into_result() {
        let ok = ChainExchangeResponse {
            status: ChainExchangeResponseStatus::PartialResponse,
            message: String::new(),
            chain: vec![TipsetBundle::default()],
        };
        assert_eq!(ok.into_result().unwrap().len(), 1);

        let failed = ChainExchangeResponse {
            status: ChainExchangeResponseStatus::GoAway,
            message: "too many requests".into(),
            chain: vec![],
        };
        let err = failed.into_result().unwrap_err();
        assert!(err.contains("too many requests"));
    }
}
