// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::encoding::tuple::*;

use super::Serialized;

/// Result of a state transition from a message applied to the chain, kept in
/// the receipts vector rooted at a header's `parent_message_receipts`.
#[derive(PartialEq, Eq, Clone, Debug, Serialize_tuple, Deserialize_tuple)]
pub struct MessageReceipt {
    pub exit_code: i64,
    pub return_data: Serialized,
    pub gas_used: i64,
}

impl MessageReceipt {
    /// Returns true for receipts of messages that executed without error.
    pub fn is_ok(&self) -> bool {
        self.exit_code == 0
    }
}
