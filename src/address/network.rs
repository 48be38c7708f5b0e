// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

/// Network defines the preconfigured networks to use with address encoding
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// to_prefix is used to convert the network into a string
    /// used when converting address to string
    pub(super) fn to_prefix(self) -> &'static str {
        match self {
            Network::Mainnet => "f",
            Network::Testnet => "t",
        }
    }
}

impl Default for Network {
    /// The client is aimed at test networks, so addresses render with the
    /// `t` prefix unless overridden with `set_network`.
    fn default() -> Self {
        Network::Testnet
    }
}
