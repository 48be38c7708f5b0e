// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Light-client library for Filecoin-like chains.
//!
//! The crate lets an untrusted peer follow a chain without running a full
//! node: it decodes gossiped blocks, signs and publishes messages, and reads
//! selected pieces of on-chain state through verifiable content-addressed
//! traversals. Networking itself (transport, peer discovery) is delegated to
//! collaborator objects; see [`client`] for the seams.

pub mod address;
pub mod bigint;
pub mod blocks;
pub mod blockstore;
pub mod client;
pub mod crypto;
pub mod encoding;
pub mod ipld;
pub mod ipld_amt;
pub mod ipld_hamt;
pub mod libp2p;
pub mod message;
pub mod state_tree;
