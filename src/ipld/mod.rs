// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod de;
mod error;
mod path;
mod path_segment;
mod reifier;
pub mod selector;
mod ser;

pub use self::error::Error;
pub use self::path::Path;
pub use self::path_segment::PathSegment;
pub use self::reifier::HAMT_ADL;

use std::collections::BTreeMap;

use cid::Cid;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::encoding::{from_slice, to_vec, Cbor, Error as EncodingError};

/// Represents the IPLD data model used when decoding chain blocks before they
/// are converted into typed records. Holding an explicit sum type at the
/// codec boundary keeps positional wire formats out of the rest of the crate.
#[derive(Debug, Clone, PartialEq)]
pub enum Ipld {
    /// Represents a null value.
    Null,

    /// Represents a boolean value.
    Bool(bool),

    /// Represents a signed integer value.
    Integer(i128),

    /// Represents a floating point value.
    Float(f64),

    /// Represents a String.
    String(String),

    /// Represents Bytes.
    Bytes(Vec<u8>),

    /// Represents a list of IPLD objects.
    List(Vec<Ipld>),

    /// Represents a map of strings to Ipld objects.
    Map(BTreeMap<String, Ipld>),

    /// Represents a link to another piece of data through a content
    /// identifier (`Cid`).
    Link(Cid),
}

impl Ipld {
    pub(crate) fn lookup_segment(&self, segment: &PathSegment) -> Option<&Self> {
        match self {
            Self::Map(map) => match segment {
                PathSegment::String(s) => map.get(s),
                PathSegment::Int(i) => map.get(&i.to_string()),
                PathSegment::Bytes(bz) => std::str::from_utf8(bz).ok().and_then(|s| map.get(s)),
            },
            Self::List(list) => list.get(segment.to_index()?),
            _ => None,
        }
    }
}

impl Cbor for Ipld {}

/// Convert a serializable object into an IPLD value.
///
/// The conversion goes through the codec's byte form, which guarantees links
/// and byte strings are handled exactly as they would be on the wire.
pub fn to_ipld<T>(value: T) -> Result<Ipld, Error>
where
    T: Serialize,
{
    let buf = to_vec(&value).map_err(EncodingError::from)?;
    Ok(from_slice(buf.as_slice()).map_err(EncodingError::from)?)
}

/// Convert an `Ipld` value into a typed record.
pub fn from_ipld<T>(value: &Ipld) -> Result<T, Error>
where
    T: DeserializeOwned,
{
    let buf = to_vec(value).map_err(EncodingError::from)?;
    Ok(from_slice(buf.as_slice()).map_err(EncodingError::from)?)
}
