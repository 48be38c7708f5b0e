// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::collections::HashMap;
use std::time::Duration;

use libp2p::gossipsub::{
    score_parameter_decay, PeerScoreParams, PeerScoreThresholds, TopicScoreParams,
};

use super::{block_topic, msgs_topic};

/// Tunable scoring knobs for the two chain topics. The defaults follow what
/// reference nodes ship; callers may override any of them before building the
/// libp2p score structures.
#[derive(Debug, Clone)]
pub struct GossipParams {
    /// Weight of the blocks topic in peer scoring.
    pub block_topic_weight: f64,
    /// Weight of the messages topic in peer scoring.
    pub msg_topic_weight: f64,
    /// Aggregate cap over all topic contributions.
    pub topic_score_cap: f64,
    /// Decay applied to accumulated behaviour penalties.
    pub behaviour_penalty_decay: Duration,
    /// Score below which gossip from a peer is ignored.
    pub gossip_threshold: f64,
}

impl Default for GossipParams {
    fn default() -> Self {
        Self {
            block_topic_weight: 0.1,
            msg_topic_weight: 0.1,
            topic_score_cap: 0.0,
            behaviour_penalty_decay: Duration::from_secs(60 * 60),
            gossip_threshold: -500.0,
        }
    }
}

fn build_msg_topic_config(params: &GossipParams) -> TopicScoreParams {
    TopicScoreParams {
        // expected 10 blocks/min
        topic_weight: params.msg_topic_weight,

        // 1 tick per second, maxes at 1 after 1 hour (1/3600)
        time_in_mesh_weight: 0.0002778,
        time_in_mesh_quantum: Duration::from_secs(1),
        time_in_mesh_cap: 1.0,

        // deliveries decay after 10min, cap at 100 tx
        first_message_deliveries_weight: 0.5,
        first_message_deliveries_decay: score_parameter_decay(Duration::from_secs(10 * 60)),
        first_message_deliveries_cap: 100.0,

        // Disabled for the chain topics
        mesh_message_deliveries_weight: 0.0,
        mesh_message_deliveries_decay: 0.0,
        mesh_message_deliveries_cap: 0.0,
        mesh_message_deliveries_threshold: 0.0,
        mesh_message_deliveries_window: Duration::from_millis(0),
        mesh_message_deliveries_activation: Duration::from_millis(0),
        mesh_failure_penalty_weight: 0.0,
        mesh_failure_penalty_decay: 0.0,

        // invalid messages decay after 1 hour
        invalid_message_deliveries_weight: -1000.0,
        invalid_message_deliveries_decay: score_parameter_decay(Duration::from_secs(60 * 60)),
    }
}

fn build_block_topic_config(params: &GossipParams) -> TopicScoreParams {
    TopicScoreParams {
        topic_weight: params.block_topic_weight,

        // 1 tick per second, maxes at 1 after 1 hour
        time_in_mesh_weight: 0.00027,
        time_in_mesh_quantum: Duration::from_secs(1),
        time_in_mesh_cap: 1.0,

        // deliveries decay after 1 hour, cap at 100 blocks
        first_message_deliveries_weight: 5.0,
        first_message_deliveries_decay: score_parameter_decay(Duration::from_secs(60 * 60)),
        first_message_deliveries_cap: 100.0,

        // Disabled for the chain topics
        mesh_message_deliveries_weight: 0.0,
        mesh_message_deliveries_decay: 0.0,
        mesh_message_deliveries_cap: 0.0,
        mesh_message_deliveries_threshold: 0.0,
        mesh_message_deliveries_window: Duration::from_millis(0),
        mesh_message_deliveries_activation: Duration::from_millis(0),
        mesh_failure_penalty_weight: 0.0,
        mesh_failure_penalty_decay: 0.0,

        // invalid messages decay after 1 hour
        invalid_message_deliveries_weight: -1000.0,
        invalid_message_deliveries_decay: score_parameter_decay(Duration::from_secs(60 * 60)),
    }
}

/// Builds peer score params for the two chain topics of a network.
pub fn build_peer_score_params(network_name: &str, params: &GossipParams) -> PeerScoreParams {
    let mut psp_topics = HashMap::new();

    // msg topic
    psp_topics.insert(
        msgs_topic(network_name).hash(),
        build_msg_topic_config(params),
    );
    // block topic
    psp_topics.insert(
        block_topic(network_name).hash(),
        build_block_topic_config(params),
    );

    PeerScoreParams {
        app_specific_weight: 1.0,

        ip_colocation_factor_threshold: 5.0,
        ip_colocation_factor_weight: -100.0,
        ip_colocation_factor_whitelist: Default::default(),

        behaviour_penalty_threshold: 6.0,
        behaviour_penalty_weight: -10.0,
        behaviour_penalty_decay: score_parameter_decay(params.behaviour_penalty_decay),

        decay_interval: Duration::from_secs(1),
        decay_to_zero: 0.01,

        topic_score_cap: params.topic_score_cap,

        retain_score: Duration::from_secs(6 * 60 * 60),
        topics: psp_topics,
    }
}

/// Builds the peer score thresholds, including the gossip threshold below
/// which a peer's gossip is ignored.
pub fn build_peer_score_threshold(params: &GossipParams) -> PeerScoreThresholds {
    PeerScoreThresholds {
        gossip_threshold: params.gossip_threshold,
        publish_threshold: -1000.0,
        graylist_threshold: -2500.0,
        accept_px_threshold: 1000.0,
        opportunistic_graft_threshold: 3.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_flow_through() {
        let params = GossipParams {
            block_topic_weight: 0.5,
            topic_score_cap: 10.0,
            ..Default::default()
        };
        let psp = build_peer_score_params("calibnet", &params);
        assert_eq!(psp.topic_score_cap, 10.0);
        let block = &psp.topics[&block_topic("calibnet").hash()];
        assert_eq!(block.topic_weight, 0.5);

        let thresholds = build_peer_score_threshold(&GossipParams::default());
        assert_eq!(thresholds.gossip_threshold, -500.0);
    }
}
