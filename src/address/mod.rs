// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod errors;
mod network;
mod payload;
mod protocol;

pub use self::errors::Error;
pub use self::network::Network;
pub use self::payload::Payload;
pub use self::protocol::Protocol;

use std::fmt;
use std::str::FromStr;

use blake2b_simd::Params;
use data_encoding::Encoding;
use data_encoding_macro::new_encoding;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Hash length of payload for Secp and Actor addresses.
pub const PAYLOAD_HASH_LEN: usize = 20;

/// Uncompressed secp public key used for validation of Secp addresses.
pub const SECP_PUB_LEN: usize = 65;

/// BLS public key length used for validation of BLS addresses.
pub const BLS_PUB_LEN: usize = 48;

/// Length of the checksum hash for string encoded addresses.
pub const CHECKSUM_HASH_LEN: usize = 4;

/// The max encoded string length of an address: `2` network and protocol
/// characters, then the base32 of a BLS payload with checksum.
const MAX_ADDRESS_STRING_LEN: usize = 2 + 84;

const ADDRESS_ENCODER: Encoding = new_encoding! {
    symbols: "abcdefghijklmnopqrstuvwxyz234567",
    padding: None,
};

/// Address is the struct that defines the protocol and data payload conversion
/// from either a public key or value. The wire form is the protocol byte
/// followed by the raw payload; the string form adds a network prefix and a
/// BLAKE2b checksum.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Address {
    network: Network,
    payload: Payload,
}

impl Address {
    fn new(network: Network, payload: Payload) -> Self {
        Self { network, payload }
    }

    /// Creates address from encoded bytes (the wire form).
    pub fn from_bytes(bz: &[u8]) -> Result<Self, Error> {
        if bz.len() < 2 {
            return Err(Error::InvalidLength);
        }
        let protocol = Protocol::from_byte(bz[0])?;
        Ok(Self::new(
            Network::default(),
            Payload::new(protocol, &bz[1..])?,
        ))
    }

    /// Generates new address using ID protocol.
    pub fn new_id(id: u64) -> Self {
        Self::new(Network::default(), Payload::ID(id))
    }

    /// Generates new address using Secp256k1 pubkey.
    pub fn new_secp256k1(pubkey: &[u8]) -> Result<Self, Error> {
        if pubkey.len() != SECP_PUB_LEN {
            return Err(Error::InvalidSECPLength(pubkey.len()));
        }
        Ok(Self::new(
            Network::default(),
            Payload::Secp256k1(address_hash(pubkey)),
        ))
    }

    /// Generates new address using the Actor protocol.
    pub fn new_actor(data: &[u8]) -> Self {
        Self::new(Network::default(), Payload::Actor(address_hash(data)))
    }

    /// Generates new address using BLS pubkey.
    pub fn new_bls(pubkey: &[u8]) -> Result<Self, Error> {
        if pubkey.len() != BLS_PUB_LEN {
            return Err(Error::InvalidBLSLength(pubkey.len()));
        }
        let mut key = [0u8; BLS_PUB_LEN];
        key.copy_from_slice(pubkey);
        Ok(Self::new(Network::default(), Payload::BLS(key)))
    }

    /// Returns protocol for Address
    pub fn protocol(&self) -> Protocol {
        self.payload.protocol()
    }

    /// Returns the `Payload` object from the address, where the respective
    /// protocol data is attached.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the raw bytes data of the payload, without the protocol byte.
    pub fn payload_bytes(&self) -> Vec<u8> {
        self.payload.to_raw_bytes()
    }

    /// Returns network configuration of Address
    pub fn network(&self) -> Network {
        self.network
    }

    /// Sets the network for the address and returns a mutable reference to it
    pub fn set_network(&mut self, network: Network) -> &mut Self {
        self.network = network;
        self
    }

    /// Returns encoded bytes of Address: the protocol byte followed by the
    /// payload bytes.
    pub fn to_bytes(self) -> Vec<u8> {
        let mut bz = self.payload.to_raw_bytes();
        bz.insert(0, self.protocol() as u8);
        bz
    }

    /// Returns the id of an ID address, if it is one.
    pub fn id(&self) -> Result<u64, Error> {
        match self.payload {
            Payload::ID(id) => Ok(id),
            _ => Err(Error::NonIDAddress),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.network.to_prefix();
        let protocol = self.protocol();

        match self.payload {
            Payload::ID(id) => write!(f, "{prefix}{protocol}{id}"),
            _ => {
                let mut bz = self.payload.to_raw_bytes();

                // payload bytes followed by calculated checksum
                bz.extend(checksum(&self.to_bytes()));
                write!(f, "{prefix}{protocol}{}", ADDRESS_ENCODER.encode(&bz))
            }
        }
    }
}

impl FromStr for Address {
    type Err = Error;
    fn from_str(addr: &str) -> Result<Self, Error> {
        if addr.len() > MAX_ADDRESS_STRING_LEN || addr.len() < 3 {
            return Err(Error::InvalidLength);
        }
        let network = match addr.get(0..1) {
            Some("f") => Network::Mainnet,
            Some("t") => Network::Testnet,
            _ => return Err(Error::UnknownNetwork),
        };

        // get protocol from second character
        let protocol = match addr.get(1..2) {
            Some("0") => Protocol::ID,
            Some("1") => Protocol::Secp256k1,
            Some("2") => Protocol::Actor,
            Some("3") => Protocol::BLS,
            _ => return Err(Error::UnknownProtocol),
        };

        let raw = addr.get(2..).ok_or(Error::InvalidLength)?;
        if protocol == Protocol::ID {
            if raw.len() > 20 {
                // 20 is max u64 as string
                return Err(Error::InvalidLength);
            }
            let id = raw.parse::<u64>().map_err(|_| Error::InvalidPayload)?;
            return Ok(Self::new(network, Payload::ID(id)));
        }

        // decode using byte32 encoding
        let mut payload = ADDRESS_ENCODER.decode(raw.as_bytes())?;
        if payload.len() <= CHECKSUM_HASH_LEN {
            return Err(Error::InvalidLength);
        }
        // split off checksum
        let cksm = payload.split_off(payload.len() - CHECKSUM_HASH_LEN);

        // sanity check to make sure address hash values are correct length
        if (protocol == Protocol::Secp256k1 || protocol == Protocol::Actor)
            && payload.len() != PAYLOAD_HASH_LEN
        {
            return Err(Error::InvalidPayload);
        }
        if protocol == Protocol::BLS && payload.len() != BLS_PUB_LEN {
            return Err(Error::InvalidPayload);
        }

        // validate checksum over protocol byte + payload
        let mut ingest = payload.clone();
        ingest.insert(0, protocol as u8);
        if !validate_checksum(&ingest, cksm) {
            return Err(Error::InvalidChecksum);
        }

        Ok(Self::new(network, Payload::new(protocol, &payload)?))
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let address_bytes = self.to_bytes();
        serde_bytes::Serialize::serialize(&address_bytes, s)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bz: Vec<u8> = serde_bytes::Deserialize::deserialize(deserializer)?;
        Address::from_bytes(&bz).map_err(de::Error::custom)
    }
}

/// Checksum calculates the 4 byte checksum hash
pub fn checksum(ingest: &[u8]) -> Vec<u8> {
    blake2b_variable(ingest, CHECKSUM_HASH_LEN)
}

/// Validates the checksum against the ingest data
pub fn validate_checksum(ingest: &[u8], expect: Vec<u8>) -> bool {
    let digest = checksum(ingest);
    digest == expect
}

/// Returns an address hash for given data
fn address_hash(ingest: &[u8]) -> [u8; 20] {
    let digest = blake2b_variable(ingest, PAYLOAD_HASH_LEN);

    let mut hash = [0u8; 20];
    hash.copy_from_slice(&digest);
    hash
}

fn blake2b_variable(ingest: &[u8], length: usize) -> Vec<u8> {
    Params::new()
        .hash_length(length)
        .to_state()
        .update(ingest)
        .finalize()
        .as_bytes()
        .to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_and_payload_roundtrip() {
        let addr = Address::new_id(1024);
        assert_eq!(addr.to_bytes(), vec![0x00, 0x80, 0x08]);
        assert_eq!(Address::from_bytes(&addr.to_bytes()).unwrap(), addr);
        assert_eq!(addr.to_string(), "t01024");
        assert_eq!("t01024".parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn bad_prefixes() {
        assert_eq!("x01".parse::<Address>(), Err(Error::UnknownNetwork));
        assert_eq!("t71".parse::<Address>(), Err(Error::UnknownProtocol));
    }

    #[test]
    fn corrupted_checksum() {
        // last character changed
        let res = "t15ihq5ibzwki2b4ep2f46avlkrqzhpqgtga7pdrr".parse::<Address>();
        assert!(matches!(
            res,
            Err(Error::InvalidChecksum) | Err(Error::Base32Decoding(_))
        ));
    }
}
