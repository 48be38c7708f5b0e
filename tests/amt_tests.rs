// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Vector and invariant tests for the sparse vector reader, including a
//! literal single-lane fixture produced by a reference node.

use lumen::bigint::{bigint_ser, BigInt};
use lumen::blockstore::{BlockStore, MemoryBlockStore, TrackingBlockStore};
use lumen::encoding::tuple::*;
use lumen::ipld::Ipld;
use lumen::ipld_amt::{Amt, Error, MAX_INDEX};

use cid::Cid;

/// Payment-channel lane state, the value type of the lane fixtures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
struct LaneState {
    #[serde(with = "bigint_ser")]
    redeemed: BigInt,
    nonce: u64,
}

const SINGLE_LANE_ROOT: &str = "bafy2bzacecgrc3fdxb227cvq4gppwctyypuw3j2upj2u2xvhpc3mhyfa7ao6u";
const SINGLE_LANE_BLOCK_B64: &str = "hAMAAYNBEICBgkMABfAB";

#[test]
fn single_lane_fixture() {
    let store = MemoryBlockStore::default();
    let root: Cid = SINGLE_LANE_ROOT.parse().unwrap();
    let block = base64::decode(SINGLE_LANE_BLOCK_B64).unwrap();

    // the fixture block must hash to its advertised address
    lumen::encoding::verify_block(&root, &block).unwrap();
    store.put_keyed(&root, &block).unwrap();

    let amt: Amt<LaneState, _> = Amt::load(&root, &store).unwrap();
    assert_eq!(amt.bit_width(), 3);
    assert_eq!(amt.height(), 0);
    assert_eq!(amt.count(), 1);

    let mut lanes = Vec::new();
    amt.for_each(|i, lane| {
        lanes.push((i, lane.clone()));
        Ok(())
    })
    .unwrap();
    assert_eq!(lanes.len(), 1);
    let (idx, lane) = &lanes[0];
    assert_eq!(*idx, 4);
    assert_eq!(amt.get(4).unwrap(), Some(lane));
    assert_eq!(amt.get(3).unwrap(), None);
}

#[test]
fn spaced_lanes_roundtrip() {
    let store = MemoryBlockStore::default();
    let indices: [u64; 8] = [0, 1, 2, 3, 4, 5, 13, 20];

    let mut amt: Amt<LaneState, _> = Amt::new_with_bit_width(&store, 3);
    for &i in &indices {
        amt.set(
            i,
            LaneState {
                redeemed: BigInt::from(i + 1),
                nonce: i + 1,
            },
        )
        .unwrap();
    }
    assert_eq!(amt.count(), 8);
    assert_eq!(amt.height(), 1);
    let root = amt.flush().unwrap();

    let amt: Amt<LaneState, _> = Amt::load(&root, &store).unwrap();
    assert_eq!(amt.count(), 8);
    assert_eq!(amt.height(), 1);

    let mut visited = Vec::new();
    amt.for_each(|i, lane| {
        assert_eq!(lane.redeemed, BigInt::from(i + 1));
        assert_eq!(lane.nonce, i + 1);
        visited.push(i);
        Ok(())
    })
    .unwrap();
    assert_eq!(visited, indices);
}

#[test]
fn get_fetches_at_most_height_plus_one_blocks() {
    let store = MemoryBlockStore::default();
    let mut amt: Amt<u64, _> = Amt::new_with_bit_width(&store, 3);
    for i in 0..500 {
        amt.set(i, i).unwrap();
    }
    let root = amt.flush().unwrap();

    let tracked = TrackingBlockStore::new(&store);
    let amt: Amt<u64, _> = Amt::load(&root, &tracked).unwrap();
    let height = amt.height();
    let after_load = tracked.stats.borrow().r;
    assert_eq!(after_load, 1);

    assert_eq!(amt.get(433).unwrap(), Some(&433));
    let reads = tracked.stats.borrow().r - after_load;
    assert!(
        reads <= height as usize + 1,
        "get read {reads} blocks at height {height}"
    );
}

#[test]
fn out_of_capacity_index_is_absent_without_fetches() {
    let store = MemoryBlockStore::default();
    let mut amt: Amt<u64, _> = Amt::new_with_bit_width(&store, 3);
    for i in 0..30 {
        amt.set(i, i).unwrap();
    }
    let root = amt.flush().unwrap();

    let tracked = TrackingBlockStore::new(&store);
    let amt: Amt<u64, _> = Amt::load(&root, &tracked).unwrap();
    let after_load = tracked.stats.borrow().r;

    // capacity at height 1 with width 8 is 64
    assert_eq!(amt.get(64).unwrap(), None);
    assert_eq!(amt.get(100_000).unwrap(), None);
    assert_eq!(tracked.stats.borrow().r, after_load);

    assert_eq!(amt.get(MAX_INDEX + 1), Err(Error::OutOfRange(MAX_INDEX + 1)));
}

#[test]
fn adt0_root_has_three_field_header() {
    let store = MemoryBlockStore::default();

    let mut amt: Amt<u64, _> = Amt::new_adt0(&store);
    for i in [0u64, 7, 300] {
        amt.set(i, i * 2).unwrap();
    }
    let root = amt.flush().unwrap();

    // the legacy header is (height, count, node); the current format adds
    // the bit width up front
    let raw: Ipld = store.get(&root).unwrap().unwrap();
    match raw {
        Ipld::List(fields) => assert_eq!(fields.len(), 3),
        other => panic!("root should be an array: {other:?}"),
    }

    let amt: Amt<u64, _> = Amt::load_adt0(&root, &store).unwrap();
    assert_eq!(amt.bit_width(), 8);
    assert_eq!(amt.count(), 3);
    assert_eq!(amt.get(7).unwrap(), Some(&14));
    assert_eq!(amt.get(8).unwrap(), None);

    // loading a legacy root as the current format fails on the header arity
    assert!(Amt::<u64, _>::load(&root, &store).is_err());
}

#[test]
fn iteration_is_lazy_and_ascending() {
    let store = MemoryBlockStore::default();
    let mut amt: Amt<u64, _> = Amt::new_with_bit_width(&store, 3);
    let indices: Vec<u64> = vec![1, 9, 66, 74, 512];
    for &i in &indices {
        amt.set(i, i).unwrap();
    }
    let root = amt.flush().unwrap();

    let tracked = TrackingBlockStore::new(&store);
    let amt: Amt<u64, _> = Amt::load(&root, &tracked).unwrap();

    let mut seen = Vec::new();
    amt.for_each_while(|i, _| {
        seen.push(i);
        Ok(i < 66)
    })
    .unwrap();
    assert_eq!(seen, vec![1, 9, 66]);

    // stopping early kept the tail subtrees unfetched
    let total_blocks = {
        let full = TrackingBlockStore::new(&store);
        let amt: Amt<u64, _> = Amt::load(&root, &full).unwrap();
        amt.for_each(|_, _| Ok(())).unwrap();
        full.stats.borrow().r
    };
    assert!(tracked.stats.borrow().r < total_blocks);
}
