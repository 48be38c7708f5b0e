// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod errors;
pub mod signature;
mod signer;

pub use self::errors::Error;
pub use self::signature::{
    ecrecover, to_public, Signature, SignatureType, SECP_PUB_LEN, SECP_SIG_LEN,
};
pub use self::signer::Signer;
