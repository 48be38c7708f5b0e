// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod memory;
mod tracking;

pub use self::memory::MemoryBlockStore;
pub use self::tracking::{BSStats, TrackingBlockStore};

use cid::Cid;
use thiserror::Error;

use crate::encoding::{de::DeserializeOwned, from_slice, new_from_cbor, ser::Serialize, to_vec};
use crate::encoding::{Code, Error as EncodingError};

/// Block store error
#[derive(Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl From<EncodingError> for Error {
    fn from(e: EncodingError) -> Self {
        Error::Encoding(e.to_string())
    }
}

/// Content-addressed store for ipld data. Blocks are immutable and addressed
/// by Cid; backends only need to supply raw byte access, the typed helpers
/// are derived. A `get` on an unknown Cid yields `Ok(None)`; callers that
/// require presence surface it as not-found.
pub trait BlockStore {
    /// Get raw block bytes by Cid.
    fn get_bytes(&self, cid: &Cid) -> Result<Option<Vec<u8>>, Error>;

    /// Write raw block bytes keyed by Cid.
    fn put_keyed(&self, cid: &Cid, bytes: &[u8]) -> Result<(), Error>;

    /// Get typed object from block store by Cid.
    fn get<T>(&self, cid: &Cid) -> Result<Option<T>, Error>
    where
        T: DeserializeOwned,
    {
        match self.get_bytes(cid)? {
            Some(bz) => Ok(Some(
                from_slice(&bz).map_err(EncodingError::from)?,
            )),
            None => Ok(None),
        }
    }

    /// Put an object in the block store and return the Cid identifier.
    fn put<S>(&self, obj: &S, code: Code) -> Result<Cid, Error>
    where
        S: Serialize,
    {
        let bytes = to_vec(obj).map_err(EncodingError::from)?;
        self.put_raw(bytes, code)
    }

    /// Put raw bytes in the block store and return the Cid identifier.
    fn put_raw(&self, bytes: Vec<u8>, code: Code) -> Result<Cid, Error> {
        let cid = new_from_cbor(&bytes, code);
        self.put_keyed(&cid, &bytes)?;
        Ok(cid)
    }
}

impl<BS: BlockStore> BlockStore for &BS {
    fn get_bytes(&self, cid: &Cid) -> Result<Option<Vec<u8>>, Error> {
        (*self).get_bytes(cid)
    }

    fn put_keyed(&self, cid: &Cid, bytes: &[u8]) -> Result<(), Error> {
        (*self).put_keyed(cid, bytes)
    }
}
