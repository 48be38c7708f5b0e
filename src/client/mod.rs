// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Client orchestrator. Owns the pub/sub session, the key store, the nonce
//! tracker and the cached head; everything network-shaped is delegated to
//! the [GossipNetwork] and [GraphExchange] collaborators.

mod errors;
mod keystore;

pub use self::errors::Error;
pub use self::keystore::{Key, KeyInfo, KeyStore};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use ahash::AHashMap;
use async_trait::async_trait;
use cid::Cid;
use libp2p::gossipsub::IdentTopic;
use libp2p::{Multiaddr, PeerId};
use log::{debug, trace, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::address::Address;
use crate::blocks::{BlockHeader, GossipBlock};
use crate::blockstore::BlockStore;
use crate::encoding::Cbor;
use crate::ipld::selector::{explore_all_recursively, Selector};
use crate::ipld_amt::Amt;
use crate::libp2p::{hello::HelloRequest, msgs_topic, NetworkError, PubsubEvent, PubsubMessage};
use crate::message::{estimate_gas, MessageReceipt, SignedMessage, UnsignedMessage};
use crate::state_tree::{actor_selector, ActorState, StateTree};

/// Publish/subscribe facility supplied by the network collaborator. The
/// client never originates transport negotiation or peer discovery.
#[async_trait]
pub trait GossipNetwork: Send + Sync + 'static {
    /// The local peer id.
    fn local_peer(&self) -> PeerId;

    /// Currently connected peers.
    fn peers(&self) -> Vec<PeerId>;

    /// Dial a peer by multiaddr. Transport negotiation stays inside the
    /// collaborator.
    async fn dial(&self, addr: Multiaddr) -> Result<(), NetworkError>;

    /// Publish bytes on a gossip topic.
    async fn publish(&self, topic: IdentTopic, data: Vec<u8>) -> Result<(), NetworkError>;

    /// Raw gossip events for the topics the collaborator subscribed on the
    /// client's behalf.
    fn events(&self) -> flume::Receiver<PubsubEvent>;
}

/// Verifiable partial-state transport: a request resolves `root` against
/// `selector` at the remote peer and drains every matched block into the
/// client's block store, where content addresses are checked.
#[async_trait]
pub trait GraphExchange: Send + Sync + 'static {
    async fn pull(&self, peer: PeerId, root: Cid, selector: Selector) -> anyhow::Result<()>;
}

/// Configuration of the light client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Name of the network, the suffix of both gossip topics.
    pub network_name: String,
    /// Number of blocks scanned before a pushed message is considered not
    /// included.
    pub inclusion_horizon: u32,
    /// Recursion depth of the selector used when mirroring a receipts
    /// vector.
    pub receipts_walk_depth: u64,
}

impl ClientConfig {
    pub fn new(network_name: impl Into<String>) -> Self {
        Self {
            network_name: network_name.into(),
            inclusion_horizon: 6,
            receipts_walk_depth: 10,
        }
    }
}

type Subscribers = Arc<Mutex<HashMap<u64, flume::Sender<Arc<GossipBlock>>>>>;

/// The light client. See the crate docs for the overall shape; this type
/// carries all mutable state and is shared behind an [Arc].
pub struct LightClient<DB, NET, GX> {
    store: Arc<DB>,
    network: Arc<NET>,
    exchange: Arc<GX>,
    config: ClientConfig,
    keystore: RwLock<KeyStore>,
    nonces: Mutex<AHashMap<Address, u64>>,
    head_tx: watch::Sender<Option<Arc<BlockHeader>>>,
    subscribers: Subscribers,
    next_sub_id: AtomicU64,
}

impl<DB, NET, GX> LightClient<DB, NET, GX>
where
    DB: BlockStore + Send + Sync + 'static,
    NET: GossipNetwork,
    GX: GraphExchange,
{
    pub fn new(
        store: Arc<DB>,
        network: Arc<NET>,
        exchange: Arc<GX>,
        config: ClientConfig,
    ) -> Arc<Self> {
        let (head_tx, _) = watch::channel(None);
        Arc::new(Self {
            store,
            network,
            exchange,
            config,
            keystore: RwLock::new(KeyStore::new()),
            nonces: Mutex::new(AHashMap::new()),
            head_tx,
            subscribers: Default::default(),
            next_sub_id: AtomicU64::new(0),
        })
    }

    /// Spawns the gossip dispatch loop. The loop only decodes payloads and
    /// fans them out; anything heavier happens on the waiters' own tasks so
    /// the dispatcher is never blocked.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let events = client.network.events();
            while let Ok(event) = events.recv_async().await {
                client.handle_gossip(event);
            }
            debug!("gossip event channel closed, dispatch loop exiting");
        })
    }

    fn handle_gossip(&self, event: PubsubEvent) {
        let source = event.source;
        match PubsubMessage::decode(&event.topic, &self.config.network_name, &event.data) {
            Ok(Some(PubsubMessage::Block(block))) => self.handle_block(source, block),
            Ok(Some(PubsubMessage::Message(msg))) => {
                trace!("gossiped message from {source}: {:?}", msg.cid());
            }
            Ok(None) => trace!("payload on unknown topic {} from {source}", event.topic),
            Err(e) => warn!("dropping undecodable gossip payload from {source}: {e}"),
        }
    }

    fn handle_block(&self, source: PeerId, block: GossipBlock) {
        let cid = *block.cid();
        debug!(
            "block {cid} at epoch {} from {source}",
            block.header.epoch()
        );

        // Last write wins; gossip gives no ordering guarantee at this layer.
        self.head_tx
            .send_replace(Some(Arc::new(block.header.clone())));

        let block = Arc::new(block);
        let mut subs = self.subscribers.lock().expect("subscriber lock poisoned");
        subs.retain(|_, tx| tx.send(Arc::clone(&block)).is_ok());
    }

    /// Registers a listener for delivered blocks. The returned handle
    /// detaches the listener on [BlockSubscription::cancel] or drop.
    pub fn subscribe_to_blocks(&self) -> BlockSubscription {
        let (tx, rx) = flume::unbounded();
        let id = self.next_sub_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .insert(id, tx);
        BlockSubscription {
            id,
            rx,
            registry: Arc::clone(&self.subscribers),
        }
    }

    /// Returns the cached head, or waits for the next block delivery if no
    /// block has been observed yet.
    pub async fn get_head(&self, token: &CancellationToken) -> Result<Arc<BlockHeader>, Error> {
        let mut rx = self.head_tx.subscribe();
        loop {
            if let Some(head) = rx.borrow().clone() {
                return Ok(head);
            }
            tokio::select! {
                _ = token.cancelled() => return Err(Error::Cancelled),
                changed = rx.changed() => changed.map_err(|_| Error::SubscriptionClosed)?,
            }
        }
    }

    /// Imports a signing key, returning its address.
    pub fn import_key(&self, key_info: KeyInfo) -> Result<Address, Error> {
        self.keystore
            .write()
            .expect("keystore lock poisoned")
            .import(key_info)
    }

    /// Generates a fresh signing key, returning its address.
    pub fn generate_key(&self) -> Result<Address, Error> {
        self.keystore
            .write()
            .expect("keystore lock poisoned")
            .generate()
    }

    /// Addresses of the imported keys, in import order.
    pub fn list_keys(&self) -> Vec<Address> {
        self.keystore
            .read()
            .expect("keystore lock poisoned")
            .list()
    }

    fn next_nonce(&self, addr: &Address) -> u64 {
        let mut nonces = self.nonces.lock().expect("nonce lock poisoned");
        let counter = nonces.entry(*addr).or_insert(0);
        let nonce = *counter;
        *counter += 1;
        nonce
    }

    fn observe_nonce(&self, addr: &Address, seen: u64) {
        let mut nonces = self.nonces.lock().expect("nonce lock poisoned");
        let counter = nonces.entry(*addr).or_insert(0);
        *counter = (*counter).max(seen + 1);
    }

    /// Completes, signs and publishes a message, returning the cid of the
    /// signed form.
    ///
    /// The sender is the message's `from` key when it is in the store,
    /// otherwise the default key (the first imported). A zero nonce is
    /// replaced with the tracked next nonce for the sender; zero gas fields
    /// are filled from the current base fee.
    pub async fn push_message(
        &self,
        mut msg: UnsignedMessage,
        token: &CancellationToken,
    ) -> Result<Cid, Error> {
        let key = {
            let keystore = self.keystore.read().expect("keystore lock poisoned");
            match keystore.get(&msg.from) {
                Some(k) => k.clone(),
                None => keystore.default_key().ok_or(Error::EmptyKeyStore)?.clone(),
            }
        };
        msg.from = key.address;

        if msg.sequence == 0 {
            msg.sequence = self.next_nonce(&key.address);
        } else {
            // caller-seeded nonce; keep the tracker past it
            self.observe_nonce(&key.address, msg.sequence);
        }

        let head = self.get_head(token).await?;
        estimate_gas(&mut msg, head.parent_base_fee());

        let signed = {
            let keystore = self.keystore.read().expect("keystore lock poisoned");
            SignedMessage::new(msg, &*keystore).map_err(|e| Error::Other(e.to_string()))?
        };
        let data = signed.marshal_cbor()?;
        let cid = signed.cid()?;

        self.network
            .publish(msgs_topic(&self.config.network_name), data)
            .await?;
        debug!("published message {cid}");
        Ok(cid)
    }

    /// Waits until a pushed message lands on chain and resolves its receipt.
    ///
    /// Incoming blocks are scanned for the signed-message cid in their secp
    /// lane. On a hit at index `k` the receipt is read at `k` from the
    /// receipts vector rooted in the **next** block's header. Scanning more
    /// than the configured horizon of blocks without a hit fails.
    pub async fn wait_message(
        &self,
        msg_cid: Cid,
        token: &CancellationToken,
    ) -> Result<MessageReceipt, Error> {
        let mut sub = self.subscribe_to_blocks();

        // WAITING: scan delivered blocks for the message.
        let mut scanned = 0u32;
        let index = loop {
            let block = tokio::select! {
                _ = token.cancelled() => return Err(Error::Cancelled),
                b = sub.recv() => b.ok_or(Error::SubscriptionClosed)?,
            };
            if let Some(i) = block.secpk_messages.iter().position(|c| c == &msg_cid) {
                debug!(
                    "message {msg_cid} included at epoch {} index {i}",
                    block.header.epoch()
                );
                break i as u64;
            }
            scanned += 1;
            if scanned > self.config.inclusion_horizon {
                return Err(Error::NotIncluded(msg_cid));
            }
        };

        // AWAIT_RECEIPTS: the receipt is rooted in the next block's header.
        let next = tokio::select! {
            _ = token.cancelled() => return Err(Error::Cancelled),
            b = sub.recv() => b.ok_or(Error::SubscriptionClosed)?,
        };
        sub.cancel();

        let receipts_root = *next.header.message_receipts();
        let peer = self
            .network
            .peers()
            .into_iter()
            .next()
            .ok_or_else(|| Error::Other("no connected peers for receipt fetch".into()))?;

        let receipts = self
            .fetch_receipts(&receipts_root, peer, &[index], token)
            .await?;
        receipts
            .into_iter()
            .next()
            .ok_or(Error::ReceiptNotFound(index))
    }

    /// Mirrors the receipts vector rooted at `root` from `peer` into the
    /// local store, then resolves the receipts at `indices`. Absent entries
    /// are omitted, not errors.
    pub async fn fetch_receipts(
        &self,
        root: &Cid,
        peer: PeerId,
        indices: &[u64],
        token: &CancellationToken,
    ) -> Result<Vec<MessageReceipt>, Error> {
        let selector = explore_all_recursively(self.config.receipts_walk_depth);
        tokio::select! {
            _ = token.cancelled() => return Err(Error::Cancelled),
            res = self.exchange.pull(peer, *root, selector) => {
                res.map_err(|e| Error::Exchange(e.to_string()))?
            }
        }

        let amt: Amt<MessageReceipt, _> = Amt::load_adt0(root, self.store.as_ref())?;
        let mut receipts = Vec::with_capacity(indices.len());
        for &i in indices {
            if let Some(receipt) = amt.get(i)? {
                receipts.push(receipt.clone());
            }
        }
        Ok(receipts)
    }

    /// Fetches the blocks on the path to one actor's record from `peer` and
    /// resolves the record locally.
    pub async fn get_actor(
        &self,
        peer: PeerId,
        state_root: &Cid,
        addr: &Address,
        token: &CancellationToken,
    ) -> Result<Option<ActorState>, Error> {
        let selector = actor_selector(addr);
        tokio::select! {
            _ = token.cancelled() => return Err(Error::Cancelled),
            res = self.exchange.pull(peer, *state_root, selector) => {
                res.map_err(|e| Error::Exchange(e.to_string()))?
            }
        }

        let tree = StateTree::load(state_root, self.store.as_ref())?;
        Ok(tree.get_actor(addr)?.cloned())
    }

    /// Builds the hello payload announcing the current head, if one has been
    /// observed.
    pub fn build_hello(&self, genesis_cid: Cid) -> Option<HelloRequest> {
        let head = self.head_tx.subscribe().borrow().clone()?;
        Some(HelloRequest {
            heaviest_tip_set: vec![*head.cid()],
            heaviest_tipset_height: head.epoch(),
            heaviest_tipset_weight: head.weight().clone(),
            genesis_cid,
        })
    }
}

/// Handle for a registered block listener. Dropping the handle (or calling
/// [BlockSubscription::cancel]) detaches the listener.
pub struct BlockSubscription {
    id: u64,
    rx: flume::Receiver<Arc<GossipBlock>>,
    registry: Subscribers,
}

impl BlockSubscription {
    /// Receives the next delivered block; `None` once cancelled and drained.
    pub async fn recv(&mut self) -> Option<Arc<GossipBlock>> {
        self.rx.recv_async().await.ok()
    }

    /// Detaches the listener from the dispatch loop.
    pub fn cancel(&self) {
        self.registry
            .lock()
            .expect("subscriber lock poisoned")
            .remove(&self.id);
    }
}

impl Drop for BlockSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
