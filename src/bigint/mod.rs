// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod bigint_ser;

pub use num_bigint::BigInt;

/// Token amounts carried by messages and block headers. Arbitrary precision,
/// serialized on the wire as a sign-prefixed big-endian magnitude.
pub type TokenAmount = BigInt;

/// Limit of bytes accepted for a deserialized big integer. Mirrors the
/// bound the reference implementation places on chain-carried numbers.
pub const MAX_BIGINT_SIZE: usize = 128;
