// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Partial-state traversal: walking an actor selector over a populated state
//! tree must touch exactly the blocks on the path to the actor's record.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cid::Cid;

use lumen::address::Address;
use lumen::bigint::BigInt;
use lumen::blockstore::{BlockStore, Error as StoreError, MemoryBlockStore};
use lumen::encoding::{new_from_cbor, Code::Blake2b256};
use lumen::ipld::selector::StoreResolver;
use lumen::ipld::{from_ipld, Ipld};
use lumen::state_tree::{actor_selector, ActorState, StateTree};

/// Store wrapper counting raw block reads across the walk.
#[derive(Clone)]
struct CountingStore {
    base: Arc<MemoryBlockStore>,
    reads: Arc<AtomicUsize>,
}

impl BlockStore for CountingStore {
    fn get_bytes(&self, cid: &Cid) -> Result<Option<Vec<u8>>, StoreError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.base.get_bytes(cid)
    }

    fn put_keyed(&self, cid: &Cid, bytes: &[u8]) -> Result<(), StoreError> {
        self.base.put_keyed(cid, bytes)
    }
}

fn populated_tree(store: &MemoryBlockStore, actors: u64) -> Cid {
    let code = new_from_cbor(b"account-code", Blake2b256);
    let mut tree = StateTree::new(store);
    for id in 0..actors {
        let head = new_from_cbor(format!("head-{id}").as_bytes(), Blake2b256);
        tree.set_actor(
            &Address::new_id(id),
            ActorState::new(code, head, BigInt::from(id), id),
        )
        .unwrap();
    }
    tree.flush().unwrap()
}

#[tokio::test]
async fn actor_selector_touches_only_the_search_path() {
    let store = Arc::new(MemoryBlockStore::default());
    let root = populated_tree(&store, 10_000);

    let reads = Arc::new(AtomicUsize::new(0));
    let resolver = StoreResolver::new(CountingStore {
        base: Arc::clone(&store),
        reads: Arc::clone(&reads),
    });

    let target = Address::new_id(1000);
    let matched: Arc<Mutex<Vec<Ipld>>> = Default::default();
    let matched_in = Arc::clone(&matched);

    actor_selector(&target)
        .walk_matching(&Ipld::Link(root), Some(resolver), move |_, ipld| {
            matched_in.lock().unwrap().push(ipld.clone());
            Ok(())
        })
        .await
        .unwrap();

    let matched = matched.lock().unwrap();
    assert_eq!(matched.len(), 1);
    let actor: ActorState = from_ipld(&matched[0]).unwrap();
    assert_eq!(actor.sequence, 1000);
    assert_eq!(actor.balance, BigInt::from(1000u32));

    // root plus two inner nodes; never the full state
    assert_eq!(reads.load(Ordering::Relaxed), 3);
}

#[tokio::test]
async fn absent_actor_matches_nothing() {
    let store = Arc::new(MemoryBlockStore::default());
    let root = populated_tree(&store, 100);

    let reads = Arc::new(AtomicUsize::new(0));
    let resolver = StoreResolver::new(CountingStore {
        base: Arc::clone(&store),
        reads: Arc::clone(&reads),
    });

    let matched = Arc::new(AtomicUsize::new(0));
    let matched_in = Arc::clone(&matched);
    actor_selector(&Address::new_id(100_000))
        .walk_matching(&Ipld::Link(root), Some(resolver), move |_, _| {
            matched_in.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(matched.load(Ordering::Relaxed), 0);
    // still bounded by the path depth
    assert!(reads.load(Ordering::Relaxed) <= 4);
}
