// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use thiserror::Error;

use crate::crypto::Error as CryptoError;
use crate::encoding::Error as EncodingError;
use crate::ipld_amt::Error as AmtError;
use crate::ipld_hamt::Error as HamtError;
use crate::libp2p::NetworkError;

/// Client error
#[derive(Debug, Error)]
pub enum Error {
    /// `push_message` requires at least one imported key
    #[error("no keys in the key store")]
    EmptyKeyStore,
    /// A key type the client cannot sign with
    #[error("unsupported key type for signing: {0}")]
    UnsupportedKeyType(String),
    /// The message was not seen within the inclusion horizon
    #[error("message {0} not included on chain")]
    NotIncluded(Cid),
    /// The receipts vector had no entry at the message's index
    #[error("no receipt at index {0} of the receipts vector")]
    ReceiptNotFound(u64),
    /// The caller's cancellation token fired
    #[error("operation cancelled")]
    Cancelled,
    /// The block subscription was closed under a waiter
    #[error("block subscription closed")]
    SubscriptionClosed,
    /// The graph-exchange collaborator failed to drain the request
    #[error("graph exchange request failed: {0}")]
    Exchange(String),
    #[error("network error: {0}")]
    Network(#[from] NetworkError),
    #[error("key error: {0}")]
    Key(#[from] CryptoError),
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),
    #[error("receipts vector error: {0}")]
    Amt(#[from] AmtError),
    #[error("state tree error: {0}")]
    State(#[from] HamtError),
    #[error("{0}")]
    Other(String),
}
