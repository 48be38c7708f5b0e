// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use serde::{Deserialize, Serialize};

/// A set of Cids forming a unique key for a tipset. Headers reference their
/// parent tipset through this; equal keys imply the same sibling blocks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TipsetKeys(pub Vec<Cid>);

impl TipsetKeys {
    pub fn new(cids: Vec<Cid>) -> Self {
        Self(cids)
    }

    /// Returns tipset header cids.
    pub fn cids(&self) -> &[Cid] {
        &self.0
    }
}
