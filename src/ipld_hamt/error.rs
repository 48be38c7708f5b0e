// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

use crate::encoding::Error as EncodingError;

/// HAMT Error
#[derive(Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// Maximum depth exceeded while consuming hash bits
    #[error("Maximum depth reached")]
    MaxDepth,
    /// Block referenced by the trie was not found in the store
    #[error("Cid ({0}) did not match any in database")]
    CidNotFound(String),
    /// Error interacting with the underlying store
    #[error("Store error: {0}")]
    Store(String),
    /// Serialization error while reading or writing nodes
    #[error("Encoding error: {0}")]
    Encoding(String),
    /// Custom HAMT error
    #[error("{0}")]
    Custom(&'static str),
}

impl From<EncodingError> for Error {
    fn from(e: EncodingError) -> Error {
        Error::Encoding(e.to_string())
    }
}
