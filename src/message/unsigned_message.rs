// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use derive_builder::Builder;

use crate::address::Address;
use crate::bigint::{bigint_ser, TokenAmount};
use crate::encoding::tuple::*;
use crate::encoding::Cbor;

use super::{Message, MethodNum, Serialized};

/// Default Unsigned message representation.
///
/// The canonical wire form is a fixed 10-element cbor array in declaration
/// order; token amounts are sign-prefixed big-endian byte strings.
///
/// Usage:
/// ```
/// use lumen::message::{UnsignedMessage, Message};
/// use lumen::address::Address;
///
/// let message = UnsignedMessage::builder()
///     .to(Address::new_id(0))
///     .from(Address::new_id(1))
///     .sequence(0)
///     .build()
///     .unwrap();
/// assert_eq!(message.sequence(), 0);
/// ```
#[derive(PartialEq, Clone, Debug, Builder, Hash, Eq, Serialize_tuple, Deserialize_tuple)]
#[builder(name = "MessageBuilder")]
pub struct UnsignedMessage {
    #[builder(default)]
    pub version: u64,
    pub to: Address,
    pub from: Address,
    #[builder(default)]
    pub sequence: u64,
    #[builder(default)]
    #[serde(with = "bigint_ser")]
    pub value: TokenAmount,
    #[builder(default)]
    pub gas_limit: i64,
    #[builder(default)]
    #[serde(with = "bigint_ser")]
    pub gas_fee_cap: TokenAmount,
    #[builder(default)]
    #[serde(with = "bigint_ser")]
    pub gas_premium: TokenAmount,
    #[builder(default)]
    pub method_num: MethodNum,
    #[builder(default)]
    pub params: Serialized,
}

impl UnsignedMessage {
    /// Generates an UnsignedMessage builder as a constructor.
    pub fn builder() -> MessageBuilder {
        MessageBuilder::default()
    }
}

impl Message for UnsignedMessage {
    fn from(&self) -> &Address {
        &self.from
    }
    fn to(&self) -> &Address {
        &self.to
    }
    fn sequence(&self) -> u64 {
        self.sequence
    }
    fn value(&self) -> &TokenAmount {
        &self.value
    }
    fn method_num(&self) -> MethodNum {
        self.method_num
    }
    fn params(&self) -> &Serialized {
        &self.params
    }
    fn gas_limit(&self) -> i64 {
        self.gas_limit
    }
    fn gas_fee_cap(&self) -> &TokenAmount {
        &self.gas_fee_cap
    }
    fn gas_premium(&self) -> &TokenAmount {
        &self.gas_premium
    }
    fn required_funds(&self) -> TokenAmount {
        &self.gas_fee_cap * self.gas_limit + &self.value
    }
}

impl Cbor for UnsignedMessage {}
