// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::address::Address;
use crate::bigint::TokenAmount;
use crate::crypto::{Signature, Signer};
use crate::encoding::tuple::*;
use crate::encoding::Cbor;

use super::{Message, MethodNum, Serialized, UnsignedMessage};

/// Represents a wrapped message with signature bytes.
#[derive(PartialEq, Clone, Debug, Serialize_tuple, Deserialize_tuple, Hash, Eq)]
pub struct SignedMessage {
    pub message: UnsignedMessage,
    pub signature: Signature,
}

impl SignedMessage {
    /// Generate a new signed message from an unsigned message and a signer.
    ///
    /// The signed payload is the cid bytes of the encoded unsigned message,
    /// not the message bytes themselves.
    pub fn new(message: UnsignedMessage, signer: &impl Signer) -> Result<Self, anyhow::Error> {
        let bz = message.cid()?.to_bytes();
        let signature = signer.sign_bytes(&bz, &message.from)?;
        Ok(SignedMessage { message, signature })
    }

    /// Returns reference to the unsigned message.
    pub fn message(&self) -> &UnsignedMessage {
        &self.message
    }

    /// Returns signature of the signed message.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Consumes self and returns it's unsigned message.
    pub fn into_message(self) -> UnsignedMessage {
        self.message
    }

    /// Checks if the signed message signature is valid for the sender.
    pub fn verify(&self) -> Result<(), String> {
        let bz = self
            .message
            .cid()
            .map_err(|e| e.to_string())?
            .to_bytes();
        self.signature.verify(&bz, &self.message.from)
    }
}

impl Message for SignedMessage {
    fn from(&self) -> &Address {
        self.message.from()
    }
    fn to(&self) -> &Address {
        self.message.to()
    }
    fn sequence(&self) -> u64 {
        self.message.sequence()
    }
    fn value(&self) -> &TokenAmount {
        self.message.value()
    }
    fn method_num(&self) -> MethodNum {
        self.message.method_num()
    }
    fn params(&self) -> &Serialized {
        self.message.params()
    }
    fn gas_limit(&self) -> i64 {
        self.message.gas_limit()
    }
    fn gas_fee_cap(&self) -> &TokenAmount {
        self.message.gas_fee_cap()
    }
    fn gas_premium(&self) -> &TokenAmount {
        self.message.gas_premium()
    }
    fn required_funds(&self) -> TokenAmount {
        self.message.required_funds()
    }
}

// The cid of a signed message re-hashes the signed wire form, which differs
// from the unsigned message cid carried in block secp message lists.
impl Cbor for SignedMessage {}
