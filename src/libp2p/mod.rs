// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

pub mod chain_exchange;
mod codec;
mod config;
mod gossip_params;
pub mod hello;

pub use self::codec::{CborRequestResponse, RequestResponseError};
pub use self::config::Libp2pConfig;
pub use self::gossip_params::{build_peer_score_params, build_peer_score_threshold, GossipParams};

use thiserror::Error;

// Re-export some libp2p types
pub use libp2p::core::PeerId;
pub use libp2p::gossipsub::IdentTopic;
pub use libp2p::multiaddr::Multiaddr;

use crate::blocks::GossipBlock;
use crate::encoding::{Cbor, Error as EncodingError};
use crate::message::SignedMessage;

/// `Gossipsub` Filecoin blocks topic identifier.
pub const PUBSUB_BLOCK_STR: &str = "/fil/blocks";
/// `Gossipsub` Filecoin messages topic identifier.
pub const PUBSUB_MSG_STR: &str = "/fil/msgs";

/// Blocks topic for a network.
pub fn block_topic(network_name: &str) -> IdentTopic {
    IdentTopic::new(format!("{PUBSUB_BLOCK_STR}/{network_name}"))
}

/// Messages topic for a network.
pub fn msgs_topic(network_name: &str) -> IdentTopic {
    IdentTopic::new(format!("{PUBSUB_MSG_STR}/{network_name}"))
}

/// Raw event delivered by the pub/sub facility for a subscribed topic.
#[derive(Debug, Clone)]
pub struct PubsubEvent {
    pub source: PeerId,
    pub topic: String,
    pub data: Vec<u8>,
}

/// Message types that can come over `GossipSub`
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone)]
pub enum PubsubMessage {
    /// Messages that come over the block topic
    Block(GossipBlock),
    /// Messages that come over the message topic
    Message(SignedMessage),
}

impl PubsubMessage {
    /// Decodes a raw gossip payload according to the topic it arrived on.
    /// Payloads on unknown topics yield `None`.
    pub fn decode(
        topic: &str,
        network_name: &str,
        data: &[u8],
    ) -> Result<Option<PubsubMessage>, EncodingError> {
        if topic == block_topic(network_name).hash().as_str() {
            Ok(Some(PubsubMessage::Block(GossipBlock::unmarshal_cbor(
                data,
            )?)))
        } else if topic == msgs_topic(network_name).hash().as_str() {
            Ok(Some(PubsubMessage::Message(
                SignedMessage::unmarshal_cbor(data)?,
            )))
        } else {
            Ok(None)
        }
    }
}

/// Network error surfaced by the publish/subscribe collaborator.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("failed to publish to topic: {0}")]
    Publish(String),
    #[error("dial failure: {0}")]
    Dial(String),
}
