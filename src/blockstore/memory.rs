// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::RwLock;

use ahash::AHashMap;
use cid::Cid;

use super::{BlockStore, Error};

/// A thread-safe `HashMap` wrapper, the default in-memory block store
/// backend.
#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<AHashMap<Vec<u8>, Vec<u8>>>,
}

impl BlockStore for MemoryBlockStore {
    fn get_bytes(&self, cid: &Cid) -> Result<Option<Vec<u8>>, Error> {
        Ok(self
            .blocks
            .read()
            .map_err(|e| Error::Backend(e.to_string()))?
            .get(&cid.to_bytes())
            .cloned())
    }

    fn put_keyed(&self, cid: &Cid, bytes: &[u8]) -> Result<(), Error> {
        self.blocks
            .write()
            .map_err(|e| Error::Backend(e.to_string()))?
            .insert(cid.to_bytes(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::Code::Blake2b256;

    #[test]
    fn roundtrip() {
        let store = MemoryBlockStore::default();
        let cid = store.put(&(8u8, "test".to_string()), Blake2b256).unwrap();
        let back: Option<(u8, String)> = store.get(&cid).unwrap();
        assert_eq!(back, Some((8, "test".to_string())));
    }

    #[test]
    fn unknown_cid_is_none() {
        let store = MemoryBlockStore::default();
        let cid = crate::encoding::new_from_cbor(&[0x01], Blake2b256);
        assert_eq!(store.get_bytes(&cid).unwrap(), None);
    }
}
