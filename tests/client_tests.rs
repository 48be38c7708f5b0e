// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Orchestrator tests: head tracking, message push, the wait-for-inclusion
//! state machine and receipt fetching, all against mock collaborators.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cid::Cid;
use tokio_util::sync::CancellationToken;

use lumen::address::Address;
use lumen::bigint::BigInt;
use lumen::blocks::{BlockHeader, GossipBlock};
use lumen::blockstore::{BlockStore, Error as StoreError, MemoryBlockStore};
use lumen::client::{
    ClientConfig, Error, GossipNetwork, GraphExchange, KeyInfo, LightClient,
};
use lumen::crypto::SignatureType;
use lumen::encoding::{new_from_cbor, Cbor, Code::Blake2b256};
use lumen::ipld::selector::Selector;
use lumen::ipld_amt::Amt;
use lumen::libp2p::{
    block_topic, msgs_topic, IdentTopic, Multiaddr, NetworkError, PeerId, PubsubEvent,
};
use lumen::message::{Message, MessageReceipt, Serialized, SignedMessage, UnsignedMessage};

struct MockNetwork {
    peer: PeerId,
    events_tx: flume::Sender<PubsubEvent>,
    events_rx: flume::Receiver<PubsubEvent>,
    published: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MockNetwork {
    fn new() -> Arc<Self> {
        let (events_tx, events_rx) = flume::unbounded();
        Arc::new(Self {
            peer: PeerId::random(),
            events_tx,
            events_rx,
            published: Mutex::new(Vec::new()),
        })
    }

    fn deliver_block(&self, network_name: &str, block: &GossipBlock) {
        self.events_tx
            .send(PubsubEvent {
                source: PeerId::random(),
                topic: block_topic(network_name).hash().into_string(),
                data: block.marshal_cbor().unwrap(),
            })
            .unwrap();
    }

    fn published_messages(&self) -> Vec<SignedMessage> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(_, data)| SignedMessage::unmarshal_cbor(data).unwrap())
            .collect()
    }
}

#[async_trait]
impl GossipNetwork for MockNetwork {
    fn local_peer(&self) -> PeerId {
        self.peer
    }

    fn peers(&self) -> Vec<PeerId> {
        vec![self.peer]
    }

    async fn dial(&self, _addr: Multiaddr) -> Result<(), NetworkError> {
        Ok(())
    }

    async fn publish(&self, topic: IdentTopic, data: Vec<u8>) -> Result<(), NetworkError> {
        self.published
            .lock()
            .unwrap()
            .push((topic.hash().into_string(), data));
        Ok(())
    }

    fn events(&self) -> flume::Receiver<PubsubEvent> {
        self.events_rx.clone()
    }
}

/// Remote-side store that remembers every block written to it, so the mock
/// exchange can replay them into the client's store.
#[derive(Default)]
struct FixtureStore {
    inner: MemoryBlockStore,
    blocks: Mutex<Vec<(Cid, Vec<u8>)>>,
}

impl BlockStore for FixtureStore {
    fn get_bytes(&self, cid: &Cid) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get_bytes(cid)
    }

    fn put_keyed(&self, cid: &Cid, bytes: &[u8]) -> Result<(), StoreError> {
        self.blocks.lock().unwrap().push((*cid, bytes.to_vec()));
        self.inner.put_keyed(cid, bytes)
    }
}

struct MockExchange {
    fixture: Arc<FixtureStore>,
    target: Arc<MemoryBlockStore>,
    requests: Mutex<Vec<(PeerId, Cid, Selector)>>,
}

#[async_trait]
impl GraphExchange for MockExchange {
    async fn pull(&self, peer: PeerId, root: Cid, selector: Selector) -> anyhow::Result<()> {
        self.requests.lock().unwrap().push((peer, root, selector));
        for (cid, bytes) in self.fixture.blocks.lock().unwrap().iter() {
            self.target.put_keyed(cid, bytes)?;
        }
        Ok(())
    }
}

const NETWORK: &str = "unit";
const TEST_KEY: [u8; 32] = [7u8; 32];

type TestClient = Arc<LightClient<MemoryBlockStore, MockNetwork, MockExchange>>;

fn setup(config: ClientConfig) -> (TestClient, Arc<MockNetwork>, Arc<FixtureStore>) {
    let store = Arc::new(MemoryBlockStore::default());
    let network = MockNetwork::new();
    let fixture = Arc::new(FixtureStore::default());
    let exchange = Arc::new(MockExchange {
        fixture: Arc::clone(&fixture),
        target: Arc::clone(&store),
        requests: Mutex::new(Vec::new()),
    });
    let client = LightClient::new(store, Arc::clone(&network), exchange, config);
    client.start();
    (client, network, fixture)
}

fn header(epoch: i64, receipts_root: Option<Cid>) -> BlockHeader {
    let receipts =
        receipts_root.unwrap_or_else(|| new_from_cbor(b"no-receipts", Blake2b256));
    BlockHeader::builder()
        .miner_address(Address::new_id(1000))
        .epoch(epoch)
        .state_root(new_from_cbor(b"state", Blake2b256))
        .messages(new_from_cbor(b"messages", Blake2b256))
        .message_receipts(receipts)
        .parent_base_fee(BigInt::from(100))
        .build()
        .unwrap()
}

fn block(epoch: i64, secpk: Vec<Cid>, receipts_root: Option<Cid>) -> GossipBlock {
    GossipBlock {
        header: header(epoch, receipts_root),
        bls_messages: vec![],
        secpk_messages: secpk,
    }
}

fn draft(to: u64) -> UnsignedMessage {
    UnsignedMessage::builder()
        .to(Address::new_id(to))
        .from(Address::new_id(0))
        .build()
        .unwrap()
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn head_is_replaced_on_each_delivery() {
    let (client, network, _) = setup(ClientConfig::new(NETWORK));
    let token = CancellationToken::new();

    // no head yet: get_head waits for the next delivery
    let waiter = {
        let client = Arc::clone(&client);
        let token = token.clone();
        tokio::spawn(async move { client.get_head(&token).await })
    };
    settle().await;
    network.deliver_block(NETWORK, &block(1, vec![], None));
    let head = waiter.await.unwrap().unwrap();
    assert_eq!(head.epoch(), 1);

    network.deliver_block(NETWORK, &block(2, vec![], None));
    settle().await;
    let head = client.get_head(&token).await.unwrap();
    assert_eq!(head.epoch(), 2);

    // hello announces the observed head
    let genesis = new_from_cbor(b"genesis", Blake2b256);
    let hello = client.build_hello(genesis).unwrap();
    assert_eq!(hello.heaviest_tipset_height, 2);
    assert_eq!(hello.heaviest_tip_set, vec![*head.cid()]);
    assert_eq!(hello.genesis_cid, genesis);
}

#[tokio::test]
async fn get_head_honors_cancellation() {
    let (client, _network, _) = setup(ClientConfig::new(NETWORK));
    let token = CancellationToken::new();
    token.cancel();
    assert!(matches!(
        client.get_head(&token).await,
        Err(Error::Cancelled)
    ));
}

#[tokio::test]
async fn push_message_fills_signs_and_publishes() {
    let (client, network, _) = setup(ClientConfig::new(NETWORK));
    let token = CancellationToken::new();

    let from = client
        .import_key(KeyInfo::new(SignatureType::Secp256k1, TEST_KEY.to_vec()))
        .unwrap();
    network.deliver_block(NETWORK, &block(1, vec![], None));
    settle().await;

    let cid = client.push_message(draft(9), &token).await.unwrap();

    let published = network.published_messages();
    assert_eq!(published.len(), 1);
    let signed = &published[0];

    // publication happened on the message topic
    let topics: Vec<String> = network
        .published
        .lock()
        .unwrap()
        .iter()
        .map(|(t, _)| t.clone())
        .collect();
    assert_eq!(topics, vec![msgs_topic(NETWORK).hash().into_string()]);

    // the returned cid re-hashes the signed wire form
    assert_eq!(Cbor::cid(signed).unwrap(), cid);

    // sender was taken from the key store, nonce from the tracker, gas from
    // the estimator
    assert_eq!(*signed.from(), from);
    assert_eq!(signed.sequence(), 0);
    assert_eq!(signed.gas_limit(), 500_000_000);
    assert_eq!(*signed.gas_premium(), BigInt::from(150_000));
    assert_eq!(*signed.gas_fee_cap(), BigInt::from(151_054));
    signed.verify().unwrap();
}

#[tokio::test]
async fn push_message_fails_fast_without_keys() {
    let (client, network, _) = setup(ClientConfig::new(NETWORK));
    let token = CancellationToken::new();
    network.deliver_block(NETWORK, &block(1, vec![], None));
    settle().await;

    assert!(matches!(
        client.push_message(draft(9), &token).await,
        Err(Error::EmptyKeyStore)
    ));
}

#[tokio::test]
async fn nonces_are_strictly_increasing_and_contiguous() {
    let (client, network, _) = setup(ClientConfig::new(NETWORK));
    let token = CancellationToken::new();

    client
        .import_key(KeyInfo::new(SignatureType::Secp256k1, TEST_KEY.to_vec()))
        .unwrap();
    network.deliver_block(NETWORK, &block(1, vec![], None));
    settle().await;

    let (a, b) = tokio::join!(
        client.push_message(draft(1), &token),
        client.push_message(draft(2), &token),
    );
    a.unwrap();
    b.unwrap();
    client.push_message(draft(3), &token).await.unwrap();

    let mut nonces: Vec<u64> = network
        .published_messages()
        .iter()
        .map(|m| m.sequence())
        .collect();
    nonces.sort_unstable();
    assert_eq!(nonces, vec![0, 1, 2]);
}

#[tokio::test]
async fn wait_message_resolves_receipt_from_next_block() {
    let (client, network, fixture) = setup(ClientConfig::new(NETWORK));
    let token = CancellationToken::new();

    // receipts vector served by the peer, in the legacy roots format
    let receipt = MessageReceipt {
        exit_code: 0,
        return_data: Serialized::new(vec![0xde, 0xad]),
        gas_used: 42,
    };
    let receipts_root = {
        let mut amt: Amt<MessageReceipt, _> = Amt::new_adt0(fixture.as_ref());
        amt.set(1, receipt.clone()).unwrap();
        amt.flush().unwrap()
    };

    let msg_cid = new_from_cbor(b"the-message", Blake2b256);
    let other_cid = new_from_cbor(b"other-message", Blake2b256);

    let waiter = {
        let client = Arc::clone(&client);
        let token = token.clone();
        tokio::spawn(async move { client.wait_message(msg_cid, &token).await })
    };
    settle().await;

    // a miss, then the inclusion at index 1, then the block whose parent
    // receipts carry the result
    network.deliver_block(NETWORK, &block(5, vec![other_cid], None));
    network.deliver_block(NETWORK, &block(6, vec![other_cid, msg_cid], None));
    network.deliver_block(NETWORK, &block(7, vec![], Some(receipts_root)));

    let resolved = waiter.await.unwrap().unwrap();
    assert_eq!(resolved, receipt);
}

#[tokio::test]
async fn wait_message_fails_past_inclusion_horizon() {
    let mut config = ClientConfig::new(NETWORK);
    config.inclusion_horizon = 2;
    let (client, network, _) = setup(config);
    let token = CancellationToken::new();

    let msg_cid = new_from_cbor(b"never-included", Blake2b256);
    let waiter = {
        let client = Arc::clone(&client);
        let token = token.clone();
        tokio::spawn(async move { client.wait_message(msg_cid, &token).await })
    };
    settle().await;

    for epoch in 0..3 {
        network.deliver_block(NETWORK, &block(epoch, vec![], None));
    }

    assert!(matches!(
        waiter.await.unwrap(),
        Err(Error::NotIncluded(c)) if c == msg_cid
    ));
}

#[tokio::test]
async fn wait_message_honors_cancellation() {
    let (client, _network, _) = setup(ClientConfig::new(NETWORK));
    let token = CancellationToken::new();

    let waiter = {
        let client = Arc::clone(&client);
        let token = token.clone();
        tokio::spawn(async move {
            client
                .wait_message(new_from_cbor(b"m", Blake2b256), &token)
                .await
        })
    };
    settle().await;
    token.cancel();
    assert!(matches!(waiter.await.unwrap(), Err(Error::Cancelled)));
}

#[tokio::test]
async fn fetch_receipts_omits_absent_indices() {
    let (client, network, fixture) = setup(ClientConfig::new(NETWORK));
    let token = CancellationToken::new();

    let receipt = MessageReceipt {
        exit_code: 0,
        return_data: Serialized::default(),
        gas_used: 7,
    };
    let receipts_root = {
        let mut amt: Amt<MessageReceipt, _> = Amt::new_adt0(fixture.as_ref());
        amt.set(3, receipt.clone()).unwrap();
        amt.flush().unwrap()
    };

    let peer = network.local_peer();
    let receipts = client
        .fetch_receipts(&receipts_root, peer, &[3, 9], &token)
        .await
        .unwrap();
    assert_eq!(receipts, vec![receipt]);
}

#[tokio::test]
async fn cancelled_subscription_stops_receiving() {
    let (client, network, _) = setup(ClientConfig::new(NETWORK));

    let mut sub = client.subscribe_to_blocks();
    settle().await;
    network.deliver_block(NETWORK, &block(1, vec![], None));
    settle().await;
    assert_eq!(sub.recv().await.unwrap().header.epoch(), 1);

    sub.cancel();
    network.deliver_block(NETWORK, &block(2, vec![], None));
    settle().await;
    assert!(sub.recv().await.is_none());
}
