// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use serde::{
    de::{self, Deserialize, DeserializeOwned},
    ser::{self, Serialize},
};

use super::node::CollapsedNode;
use super::{init_sized_vec, Node, V0_BIT_WIDTH};

/// Wire variant of a vector root. The current format carries its bit width;
/// the legacy "adt0" format has a fixed width of 8 and a three-field header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V0,
    V3,
}

/// Root of an AMT vector, can be serialized and keeps track of height and
/// count.
#[derive(Debug)]
pub(super) struct Root<V> {
    pub version: Version,
    pub bit_width: u32,
    pub height: u32,
    pub count: u64,
    pub node: Node<V>,
}

impl<V> Root<V> {
    pub(super) fn new(bit_width: u32) -> Self {
        Self {
            version: Version::V3,
            bit_width,
            height: 0,
            count: 0,
            node: Node::Leaf {
                vals: init_sized_vec(bit_width),
            },
        }
    }

    pub(super) fn new_v0() -> Self {
        Self {
            version: Version::V0,
            ..Self::new(V0_BIT_WIDTH)
        }
    }
}

impl<V> ser::Serialize for Root<V>
where
    V: Serialize,
{
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        match self.version {
            Version::V3 => (self.bit_width, self.height, self.count, &self.node).serialize(s),
            Version::V0 => (self.height, self.count, &self.node).serialize(s),
        }
    }
}

impl<'de, V> de::Deserialize<'de> for Root<V>
where
    V: DeserializeOwned,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let (bit_width, height, count, node): (u32, u32, u64, CollapsedNode<V>) =
            Deserialize::deserialize(deserializer)?;
        Ok(Self {
            version: Version::V3,
            bit_width,
            height,
            count,
            node: node.expand(bit_width).map_err(de::Error::custom)?,
        })
    }
}

/// Deserialization shim for legacy roots; the header has no bit width field.
pub(super) struct RootV0<V>(pub Root<V>);

impl<'de, V> de::Deserialize<'de> for RootV0<V>
where
    V: DeserializeOwned,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let (height, count, node): (u32, u64, CollapsedNode<V>) =
            Deserialize::deserialize(deserializer)?;
        Ok(RootV0(Root {
            version: Version::V0,
            bit_width: V0_BIT_WIDTH,
            height,
            count,
            node: node.expand(V0_BIT_WIDTH).map_err(de::Error::custom)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{from_slice, to_vec};

    #[test]
    fn serialize_symmetric() {
        let mut root: Root<String> = Root::new(3);
        root.height = 2;
        root.count = 1;
        root.node = Node::Leaf {
            vals: init_sized_vec(3),
        };
        let rbz = to_vec(&root).unwrap();
        let back = from_slice::<Root<String>>(&rbz).unwrap();
        assert_eq!(back.height, 2);
        assert_eq!(back.count, 1);
        assert_eq!(back.bit_width, 3);
        assert_eq!(back.version, Version::V3);
    }
}
