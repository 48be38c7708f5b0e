// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use indexmap::IndexMap;
use libsecp256k1::SecretKey;
use rand::rngs::OsRng;

use crate::address::Address;
use crate::crypto::signature::sign_secp256k1;
use crate::crypto::{to_public, Signature, SignatureType, Signer};

use super::errors::Error;

/// KeyInfo struct, this contains the type of key and the private key.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct KeyInfo {
    key_type: SignatureType,
    private_key: Vec<u8>,
}

impl KeyInfo {
    /// Return a new KeyInfo given the key_type and private_key
    pub fn new(key_type: SignatureType, private_key: Vec<u8>) -> Self {
        KeyInfo {
            key_type,
            private_key,
        }
    }

    /// Return a reference to the key_type
    pub fn key_type(&self) -> SignatureType {
        self.key_type
    }

    /// Return a reference to the private_key
    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }
}

/// A Key, derived from imported KeyInfo: holds the public key and the
/// address the key signs for.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Key {
    pub key_info: KeyInfo,
    pub public_key: Vec<u8>,
    pub address: Address,
}

impl Key {
    /// Derive public key and address for the given key info. Only secp keys
    /// can sign for this client.
    pub fn new(key_info: KeyInfo) -> Result<Key, Error> {
        if key_info.key_type != SignatureType::Secp256k1 {
            return Err(Error::UnsupportedKeyType(format!(
                "{:?}",
                key_info.key_type
            )));
        }
        let (public_key, address) = to_public(&key_info.private_key)?;
        Ok(Key {
            key_info,
            public_key,
            address,
        })
    }
}

/// Process-local set of signing keys, resolved by address.
///
/// The store is deliberately ephemeral and insecure: keys live in memory in
/// the clear and are gone on process exit. Insertion order is kept so the
/// default key (the first imported) is deterministic.
#[derive(Debug, Default)]
pub struct KeyStore {
    keys: IndexMap<Address, Key>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key to the store, returning the address that resolves to it.
    /// Importing an already-present key is a no-op.
    pub fn import(&mut self, key_info: KeyInfo) -> Result<Address, Error> {
        let key = Key::new(key_info)?;
        let address = key.address;
        self.keys.entry(address).or_insert(key);
        Ok(address)
    }

    /// Generate a new secp key, add it to the store and return its address.
    pub fn generate(&mut self) -> Result<Address, Error> {
        let private_key = SecretKey::random(&mut OsRng).serialize().to_vec();
        self.import(KeyInfo::new(SignatureType::Secp256k1, private_key))
    }

    /// Return the key that signs for a given address.
    pub fn get(&self, addr: &Address) -> Option<&Key> {
        self.keys.get(addr)
    }

    /// The default signing key: insertion-order first.
    pub fn default_key(&self) -> Option<&Key> {
        self.keys.first().map(|(_, k)| k)
    }

    /// Addresses of all stored keys, in insertion order.
    pub fn list(&self) -> Vec<Address> {
        self.keys.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Signer for KeyStore {
    fn sign_bytes(&self, data: &[u8], address: &Address) -> Result<Signature, anyhow::Error> {
        let key = self
            .get(address)
            .ok_or_else(|| anyhow::anyhow!("key for address {address} not found"))?;
        Ok(sign_secp256k1(key.key_info.private_key(), data)?)
    }
}
