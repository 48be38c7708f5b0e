// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use data_encoding::DecodeError;
use thiserror::Error;

/// Address error
#[derive(Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Unknown address network")]
    UnknownNetwork,
    #[error("Unknown address protocol")]
    UnknownProtocol,
    #[error("Invalid address payload")]
    InvalidPayload,
    #[error("Invalid address length")]
    InvalidLength,
    #[error("Invalid payload length, wanted: {0}")]
    InvalidPayloadLength(usize),
    #[error("Invalid BLS pub key length, wanted: {0}")]
    InvalidBLSLength(usize),
    #[error("Invalid SECP pub key length, wanted: {0}")]
    InvalidSECPLength(usize),
    #[error("Cannot get id from non id address")]
    NonIDAddress,
    #[error("Invalid address checksum")]
    InvalidChecksum,
    #[error("Decoding for address failed: {0}")]
    Base32Decoding(#[from] DecodeError),
}
