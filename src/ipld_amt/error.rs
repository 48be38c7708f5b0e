// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

use crate::blockstore::Error as StoreError;
use crate::encoding::Error as EncodingError;

/// AMT Error
#[derive(Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// Index was not in range for the vector
    #[error("index {0} out of range for the amt")]
    OutOfRange(u64),
    /// Height of root node is greater than the sanity bound
    #[error("failed to load amt: height {0} exceeds maximum of {1}")]
    MaxHeight(u32, u32),
    /// A node was both a leaf and a link shard
    #[error("amt node cannot be both leaf and non-leaf")]
    LinksAndValues,
    /// Cid not found in store error
    #[error("cid ({0}) did not match any in database")]
    CidNotFound(String),
    /// Serialized vector cannot be flushed with cached sub nodes
    #[error("tried to serialize without flushing cache")]
    Cached,
    /// Error interacting with underlying store
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// Serialization error
    #[error("encoding error: {0}")]
    Encoding(String),
    /// Custom AMT error
    #[error("{0}")]
    Other(String),
}

impl From<EncodingError> for Error {
    fn from(e: EncodingError) -> Error {
        Error::Encoding(e.to_string())
    }
}
