// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod gas;
mod message_receipt;
mod signed_message;
mod unsigned_message;

pub use self::gas::{estimate_gas, BLOCK_GAS_TARGET, MIN_GAS_PREMIUM};
pub use self::message_receipt::MessageReceipt;
pub use self::signed_message::SignedMessage;
pub use self::unsigned_message::{MessageBuilder, UnsignedMessage};

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::bigint::TokenAmount;

/// Method number of a message call.
pub type MethodNum = u64;

/// Method parameters and receipt return values, opaque to the client.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Serialized {
    #[serde(with = "serde_bytes")]
    bytes: Vec<u8>,
}

impl Serialized {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Message interface to interact with signed and unsigned messages in a
/// generic context.
pub trait Message {
    /// Returns the from address of the message.
    fn from(&self) -> &Address;
    /// Returns the destination address of the message.
    fn to(&self) -> &Address;
    /// Returns the message sequence or nonce.
    fn sequence(&self) -> u64;
    /// Returns the amount sent in message.
    fn value(&self) -> &TokenAmount;
    /// Returns the method number to be called.
    fn method_num(&self) -> MethodNum;
    /// Returns the encoded parameters for the method call.
    fn params(&self) -> &Serialized;
    /// Returns the gas limit for the message.
    fn gas_limit(&self) -> i64;
    /// Returns the max price that can be paid per unit of gas.
    fn gas_fee_cap(&self) -> &TokenAmount;
    /// Returns the portion of the fee offered to the miner.
    fn gas_premium(&self) -> &TokenAmount;
    /// Returns the maximum amount the message can cost the sender.
    fn required_funds(&self) -> TokenAmount;
}
