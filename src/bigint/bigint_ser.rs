// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use num_bigint::{BigInt, Sign};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::MAX_BIGINT_SIZE;

/// Wrapper for serializing a big int reference to a byte string.
#[derive(Serialize)]
#[serde(transparent)]
pub struct BigIntSer<'a>(#[serde(with = "self")] pub &'a BigInt);

/// Wrapper for deserializing a byte string into a big int.
#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct BigIntDe(#[serde(with = "self")] pub BigInt);

pub fn serialize<S>(int: &BigInt, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let (sign, mut bz) = int.to_bytes_be();

    // Insert sign byte at start of encoded bytes
    match sign {
        Sign::Minus => bz.insert(0, 1),
        Sign::Plus => bz.insert(0, 0),
        Sign::NoSign => bz = Vec::new(),
    }
    if bz.len() > MAX_BIGINT_SIZE {
        return Err(serde::ser::Error::custom("big integer exceeded max size"));
    }

    serde_bytes::Serialize::serialize(&bz, serializer)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<BigInt, D::Error>
where
    D: Deserializer<'de>,
{
    let mut bz: Vec<u8> = serde_bytes::Deserialize::deserialize(deserializer)?;
    if bz.is_empty() {
        return Ok(BigInt::default());
    }
    if bz.len() > MAX_BIGINT_SIZE {
        return Err(serde::de::Error::custom("big integer exceeded max size"));
    }

    let sign_byte = bz.remove(0);
    let sign: Sign = match sign_byte {
        1 => Sign::Minus,
        0 => Sign::Plus,
        _ => {
            return Err(serde::de::Error::custom(
                "First byte must be valid sign (0, 1)",
            ));
        }
    };
    Ok(BigInt::from_bytes_be(sign, &bz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{from_slice, to_vec};

    fn roundtrip(int: BigInt) {
        let bz = to_vec(&BigIntSer(&int)).unwrap();
        let BigIntDe(out) = from_slice(&bz).unwrap();
        assert_eq!(out, int);
    }

    #[test]
    fn bigint_roundtrips() {
        roundtrip(BigInt::from(0));
        roundtrip(BigInt::from(1));
        roundtrip(BigInt::from(u64::MAX));
        roundtrip(BigInt::from(10u128.pow(18)));
        roundtrip(BigInt::from(-1) * BigInt::from(10u128.pow(18)));
    }

    #[test]
    fn zero_is_empty_bytes() {
        let bz = to_vec(&BigIntSer(&BigInt::default())).unwrap();
        // cbor empty byte string
        assert_eq!(bz, &[0x40]);
    }

    #[test]
    fn sign_prefix() {
        let bz = to_vec(&BigIntSer(&BigInt::from(12))).unwrap();
        assert_eq!(bz, &[0x42, 0x00, 0x0c]);
    }
}
