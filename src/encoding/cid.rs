// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub use cid::{Cid, Version};
use multihash::MultihashDigest;
pub use multihash::{Code, Multihash};

use super::errors::Error;

/// Multicodec identifier for dag-cbor blocks.
pub const DAG_CBOR: u64 = 0x71;

/// Constructs a `Cid` for a block of encoded bytes using the default version
/// and dag-cbor codec.
pub fn new_from_cbor(bz: &[u8], code: Code) -> Cid {
    let hash = code.digest(bz);
    Cid::new_v1(DAG_CBOR, hash)
}

/// Checks that a block of bytes is correctly identified by a `Cid`, by
/// re-hashing the bytes with the Cid's multihash code. Integrity failures are
/// surfaced and must not be retried with the same bytes.
pub fn verify_block(cid: &Cid, bz: &[u8]) -> Result<(), Error> {
    let code = Code::try_from(cid.hash().code()).map_err(|e| Error {
        description: e.to_string(),
        protocol: super::CodecProtocol::Cbor,
    })?;
    if &code.digest(bz) != cid.hash() {
        return Err(Error {
            description: format!("block bytes do not hash to {cid}"),
            protocol: super::CodecProtocol::Cbor,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cid_identifies_bytes() {
        let cid = new_from_cbor(&[0x18, 0x2a], Code::Blake2b256);
        assert_eq!(cid.codec(), DAG_CBOR);
        verify_block(&cid, &[0x18, 0x2a]).unwrap();
        assert!(verify_block(&cid, &[0x18, 0x2b]).is_err());
    }
}
