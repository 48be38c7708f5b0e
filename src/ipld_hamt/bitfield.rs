// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// 256 bit set, one bit per slot of a trie node. Serialized as a big-endian
/// byte string with leading zero bytes stripped.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bitfield([u64; 4]);

impl Bitfield {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn test_bit(&self, idx: u32) -> bool {
        debug_assert!(idx < 256);
        self.0[(idx / 64) as usize] & (1 << (idx % 64)) != 0
    }

    pub fn set_bit(&mut self, idx: u32) {
        debug_assert!(idx < 256);
        self.0[(idx / 64) as usize] |= 1 << (idx % 64);
    }

    pub fn clear_bit(&mut self, idx: u32) {
        debug_assert!(idx < 256);
        self.0[(idx / 64) as usize] &= !(1 << (idx % 64));
    }

    pub fn count_ones(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns a bitfield with the `n` least significant bits set.
    pub fn set_bits_le(mut self, n: u32) -> Self {
        for i in 0..n {
            self.set_bit(i);
        }
        self
    }

    pub fn and(mut self, other: &Self) -> Self {
        for (w, o) in self.0.iter_mut().zip(other.0.iter()) {
            *w &= o;
        }
        self
    }

    fn to_bytes_be(self) -> Vec<u8> {
        let mut bz = Vec::with_capacity(32);
        for word in self.0.iter().rev() {
            bz.extend_from_slice(&word.to_be_bytes());
        }
        // Minimal representation, strip leading zero bytes
        let start = bz.iter().position(|&b| b != 0).unwrap_or(bz.len());
        bz.split_off(start)
    }

    fn from_bytes_be(bz: &[u8]) -> Result<Self, &'static str> {
        if bz.len() > 32 {
            return Err("bitfield larger than 256 bits");
        }
        let mut padded = [0u8; 32];
        padded[32 - bz.len()..].copy_from_slice(bz);

        let mut words = [0u64; 4];
        for (i, chunk) in padded.chunks_exact(8).enumerate() {
            // chunk 0 holds the most significant word
            words[3 - i] = u64::from_be_bytes(chunk.try_into().expect("chunk is 8 bytes"));
        }
        Ok(Self(words))
    }
}

impl Serialize for Bitfield {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bz = self.to_bytes_be();
        serde_bytes::Serialize::serialize(bz.as_slice(), serializer)
    }
}

impl<'de> Deserialize<'de> for Bitfield {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bz: Vec<u8> = serde_bytes::Deserialize::deserialize(deserializer)?;
        Self::from_bytes_be(&bz).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_count() {
        let mut bf = Bitfield::zero();
        bf.set_bit(0);
        bf.set_bit(17);
        bf.set_bit(255);
        assert!(bf.test_bit(17));
        assert!(!bf.test_bit(16));
        assert_eq!(bf.count_ones(), 3);
        bf.clear_bit(17);
        assert_eq!(bf.count_ones(), 2);
    }

    #[test]
    fn serializes_minimal_big_endian() {
        let mut bf = Bitfield::zero();
        bf.set_bit(4);
        let bz = crate::encoding::to_vec(&bf).unwrap();
        // byte string of one byte, 0b0001_0000
        assert_eq!(bz, vec![0x41, 0x10]);
        let back: Bitfield = crate::encoding::from_slice(&bz).unwrap();
        assert_eq!(back, bf);
    }

    #[test]
    fn empty_bitfield_is_empty_bytes() {
        let bz = crate::encoding::to_vec(&Bitfield::zero()).unwrap();
        assert_eq!(bz, vec![0x40]);
    }
}
