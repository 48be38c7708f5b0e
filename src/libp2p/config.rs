// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use libp2p::Multiaddr;
use serde::Deserialize;

/// Libp2p config for the light client's network collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct Libp2pConfig {
    /// Local address.
    pub listening_multiaddr: Multiaddr,
    /// Bootstrap peer list.
    pub bootstrap_peers: Vec<Multiaddr>,
    /// Target peer count.
    pub target_peer_count: u32,
}

impl Default for Libp2pConfig {
    fn default() -> Self {
        Self {
            listening_multiaddr: "/ip4/0.0.0.0/tcp/0"
                .parse()
                .expect("fixed multiaddr is valid"),
            bootstrap_peers: Vec::new(),
            target_peer_count: 75,
        }
    }
}
