// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::borrow::Cow;

use libsecp256k1::{
    recover, Message, PublicKey, RecoveryId, SecretKey, Signature as EcdsaSignature,
};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{de, ser};

use crate::address::{Address, Protocol};
use crate::encoding::blake2b_256;
use crate::encoding::repr::*;

use super::errors::Error;

/// Secp256k1 signature length in bytes: `r || s || v`.
pub const SECP_SIG_LEN: usize = 65;
/// Secp256k1 public key length in bytes (uncompressed form).
pub const SECP_PUB_LEN: usize = 65;

/// Signature variants for signatures carried on chain.
#[derive(
    Clone, Debug, PartialEq, FromPrimitive, Copy, Eq, Serialize_repr, Deserialize_repr, Hash,
)]
#[repr(u8)]
pub enum SignatureType {
    Secp256k1 = 1,
    BLS = 2,
}

/// A cryptographic signature, represented in bytes, of any key protocol. The
/// wire form carries the signature type as a leading byte.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    sig_type: SignatureType,
    bytes: Vec<u8>,
}

impl ser::Serialize for Signature {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        let mut bytes = Vec::with_capacity(self.bytes.len() + 1);
        // Insert signature type byte
        bytes.push(self.sig_type as u8);
        bytes.extend_from_slice(&self.bytes);

        serde_bytes::Serialize::serialize(&bytes, serializer)
    }
}

impl<'de> de::Deserialize<'de> for Signature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let bytes: Cow<'de, [u8]> = serde_bytes::Deserialize::deserialize(deserializer)?;
        if bytes.is_empty() {
            return Err(de::Error::custom("Cannot deserialize empty bytes"));
        }

        // Remove signature type byte
        let sig_type = SignatureType::from_u8(bytes[0])
            .ok_or_else(|| de::Error::custom("Invalid signature type byte (must be 1 or 2)"))?;

        Ok(Signature {
            bytes: bytes[1..].to_vec(),
            sig_type,
        })
    }
}

impl Signature {
    /// Creates a SECP Signature given the raw bytes.
    pub fn new_secp256k1(bytes: Vec<u8>) -> Self {
        Self {
            sig_type: SignatureType::Secp256k1,
            bytes,
        }
    }

    /// Returns reference to signature bytes, without the type byte.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns [SignatureType] for the signature.
    pub fn signature_type(&self) -> SignatureType {
        self.sig_type
    }

    /// Checks if a signature is valid given data and address.
    pub fn verify(&self, data: &[u8], addr: &Address) -> Result<(), String> {
        match addr.protocol() {
            Protocol::Secp256k1 => verify_secp256k1_sig(self.bytes(), data, addr),
            _ => Err("Address must be a resolved secp key to verify a signature".to_owned()),
        }
    }
}

/// Returns `String` error if a secp256k1 signature is invalid.
fn verify_secp256k1_sig(signature: &[u8], data: &[u8], addr: &Address) -> Result<(), String> {
    if signature.len() != SECP_SIG_LEN {
        return Err(format!(
            "Invalid Secp256k1 signature length. Was {}, must be 65",
            signature.len()
        ));
    }

    // blake2b 256 hash
    let hash = blake2b_256(data);

    // Ecrecover with hash and signature
    let mut sig = [0u8; SECP_SIG_LEN];
    sig[..].copy_from_slice(signature);
    let rec_addr = ecrecover(&hash, &sig).map_err(|e| e.to_string())?;

    // Check payload against recovered address; the network prefix is a
    // display concern and does not affect validity.
    if rec_addr.payload() == addr.payload() {
        Ok(())
    } else {
        Err("Secp signature verification failed".to_owned())
    }
}

/// Signs a data payload with a secp256k1 private key. The payload is hashed
/// with BLAKE2b-256 and the signature is returned in `r || s || v` form, with
/// `v` being the recovery id supplied by the underlying library.
pub(crate) fn sign_secp256k1(priv_key: &[u8], data: &[u8]) -> Result<Signature, Error> {
    let priv_key = SecretKey::parse_slice(priv_key)?;
    let msg_hash = blake2b_256(data);
    let message = Message::parse(&msg_hash);
    let (sig, recovery_id) = libsecp256k1::sign(&message, &priv_key);

    let mut sig_bytes = [0u8; SECP_SIG_LEN];
    sig_bytes[..64].copy_from_slice(&sig.serialize());
    sig_bytes[64] = recovery_id.serialize();
    Ok(Signature::new_secp256k1(sig_bytes.to_vec()))
}

/// Derives the uncompressed public key and its address for a secp256k1
/// private key.
pub fn to_public(priv_key: &[u8]) -> Result<(Vec<u8>, Address), Error> {
    let priv_key = SecretKey::parse_slice(priv_key)?;
    let public_key = PublicKey::from_secret_key(&priv_key).serialize().to_vec();
    let address = Address::new_secp256k1(&public_key)?;
    Ok((public_key, address))
}

/// Return Address for a message given its signing bytes hash and signature.
pub fn ecrecover(hash: &[u8; 32], signature: &[u8; SECP_SIG_LEN]) -> Result<Address, Error> {
    // generate types to recover key from
    let rec_id = RecoveryId::parse(signature[64])?;
    let message = Message::parse(hash);

    // Signature value without recovery byte
    let mut s = [0u8; 64];
    s.clone_from_slice(signature[..64].as_ref());
    // generate Signature
    let sig = EcdsaSignature::parse_standard(&s)?;

    let key = recover(&message, &sig, &rec_id)?;
    let ret = key.serialize();
    let addr = Address::new_secp256k1(&ret)?;
    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsecp256k1::SecretKey;
    use rand::rngs::OsRng;

    #[test]
    fn secp_sign_and_recover() {
        let priv_key = SecretKey::random(&mut OsRng);
        let pub_key = PublicKey::from_secret_key(&priv_key);
        let secp_addr = Address::new_secp256k1(&pub_key.serialize()).unwrap();

        let data = [8u8; 62];
        let sig = sign_secp256k1(&priv_key.serialize(), &data).unwrap();
        assert_eq!(sig.bytes().len(), SECP_SIG_LEN);

        let hash = blake2b_256(&data);
        let mut raw = [0u8; SECP_SIG_LEN];
        raw.copy_from_slice(sig.bytes());
        assert_eq!(ecrecover(&hash, &raw).unwrap(), secp_addr);

        sig.verify(&data, &secp_addr).unwrap();
        assert!(sig.verify(&[0u8; 4], &secp_addr).is_err());
    }

    #[test]
    fn rejects_wrong_address_protocol() {
        let sig = Signature::new_secp256k1(vec![0; SECP_SIG_LEN]);
        assert!(sig.verify(&[], &Address::new_id(10)).is_err());
    }
}
