// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{Error, Protocol, BLS_PUB_LEN, PAYLOAD_HASH_LEN};

/// Payload is the data of the Address. Variants are the supported Address
/// protocols.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Payload {
    /// ID protocol address.
    ID(u64),
    /// SECP256K1 key address, 20 byte hash of PublicKey
    Secp256k1([u8; PAYLOAD_HASH_LEN]),
    /// Actor protocol address, 20 byte hash of actor data
    Actor([u8; PAYLOAD_HASH_LEN]),
    /// BLS key address, full 48 byte public key
    BLS([u8; BLS_PUB_LEN]),
}

impl Payload {
    /// Returns the protocol the payload is associated with.
    pub fn protocol(&self) -> Protocol {
        match self {
            Payload::ID(_) => Protocol::ID,
            Payload::Secp256k1(_) => Protocol::Secp256k1,
            Payload::Actor(_) => Protocol::Actor,
            Payload::BLS(_) => Protocol::BLS,
        }
    }

    /// Returns the variable encoded bytes of the payload; ID addresses encode
    /// the id as an unsigned varint.
    pub fn to_raw_bytes(self) -> Vec<u8> {
        match self {
            Payload::ID(id) => {
                let mut buf = unsigned_varint::encode::u64_buffer();
                unsigned_varint::encode::u64(id, &mut buf).to_vec()
            }
            Payload::Secp256k1(b) => b.to_vec(),
            Payload::Actor(b) => b.to_vec(),
            Payload::BLS(b) => b.to_vec(),
        }
    }

    /// Interprets the raw payload bytes for a given protocol.
    pub fn new(protocol: Protocol, payload: &[u8]) -> Result<Self, Error> {
        let payload = match protocol {
            Protocol::ID => {
                let (id, remaining) =
                    unsigned_varint::decode::u64(payload).map_err(|_| Error::InvalidPayload)?;
                if !remaining.is_empty() {
                    return Err(Error::InvalidPayload);
                }
                Self::ID(id)
            }
            Protocol::Secp256k1 => Self::Secp256k1(
                payload
                    .try_into()
                    .map_err(|_| Error::InvalidPayloadLength(payload.len()))?,
            ),
            Protocol::Actor => Self::Actor(
                payload
                    .try_into()
                    .map_err(|_| Error::InvalidPayloadLength(payload.len()))?,
            ),
            Protocol::BLS => Self::BLS(
                payload
                    .try_into()
                    .map_err(|_| Error::InvalidPayloadLength(payload.len()))?,
            ),
        };
        Ok(payload)
    }
}
