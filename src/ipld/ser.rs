// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::ser::Serialize;

use super::Ipld;

impl Serialize for Ipld {
    #[inline]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Ipld::Integer(v) => serializer.serialize_i128(*v),
            Ipld::Bytes(v) => serializer.serialize_bytes(v),
            Ipld::String(v) => serializer.serialize_str(v),
            Ipld::List(v) => v.serialize(serializer),
            Ipld::Map(v) => v.serialize(serializer),
            Ipld::Link(cid) => cid.serialize(serializer),
            Ipld::Float(v) => serializer.serialize_f64(*v),
            Ipld::Bool(v) => serializer.serialize_bool(*v),
            Ipld::Null => serializer.serialize_unit(),
        }
    }
}
