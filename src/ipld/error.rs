// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

use crate::encoding::Error as CborError;

/// Ipld error
#[derive(Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{0}")]
    Encoding(String),
    #[error("Failed to traverse link: {0}")]
    Link(String),
    #[error("{0}")]
    Custom(String),
}

impl From<CborError> for Error {
    fn from(e: CborError) -> Error {
        Error::Encoding(e.to_string())
    }
}
