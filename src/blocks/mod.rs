// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod gossip_block;
mod header;
mod tipset;

pub use self::gossip_block::GossipBlock;
pub use self::header::{BlockHeader, BlockHeaderBuilder};
pub use self::tipset::TipsetKeys;

/// An epoch number of the chain.
pub type ChainEpoch = i64;
