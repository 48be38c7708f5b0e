// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod empty_map;
mod walk;
pub use self::walk::*;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::ops::SubAssign;

use crate::encoding::Cbor;
use crate::ipld_hamt::BytesKey;

use super::{Ipld, PathSegment};
use Selector::*;

/// Selectors are expressions that identify and select a subset of data from
/// an IPLD DAG. Selectors are themselves IPLD and can be serialized and
/// deserialized as such.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Selector {
    /// Matcher marks a node to be included in the "result" set.
    /// (All nodes traversed by a selector are in the "covered" set (which is
    /// a.k.a. "the merkle proof"); the "result" set is a subset of the
    /// "covered" set.)
    #[serde(rename = ".", with = "empty_map")]
    Matcher,

    /// ExploreAll is similar to a `*` -- it traverses all elements of an
    /// array, or all entries in a map, and applies a next selector to the
    /// reached nodes.
    #[serde(rename = "a")]
    ExploreAll {
        #[serde(rename = ">")]
        next: Box<Selector>,
    },

    /// ExploreFields traverses named fields in a map (or equivalently,
    /// struct, if traversing on typed/schema nodes) and applies a next
    /// selector to the reached nodes.
    ///
    /// Fields are raw byte keys: the chain's authenticated maps key on wire
    /// bytes. Insertion order is maintained and traversed using that order.
    #[serde(rename = "f")]
    ExploreFields {
        #[serde(rename = "f>")]
        fields: IndexMap<BytesKey, Selector>,
    },

    /// ExploreIndex traverses a specific index in a list, and applies a next
    /// selector to the reached node.
    #[serde(rename = "i")]
    ExploreIndex {
        #[serde(rename = "i")]
        index: usize,
        #[serde(rename = ">")]
        next: Box<Selector>,
    },

    /// ExploreRange traverses a list, and for each element in the range
    /// specified, will apply a next selector to those reached nodes.
    #[serde(rename = "r")]
    ExploreRange {
        #[serde(rename = "^")]
        start: usize,
        #[serde(rename = "$")]
        end: usize,
        #[serde(rename = ">")]
        next: Box<Selector>,
    },

    /// ExploreRecursive traverses some structure recursively. To guide this
    /// exploration, it uses a "sequence", which is another Selector tree;
    /// some leaf node in this sequence should contain an ExploreRecursiveEdge
    /// selector, which denotes the place recursion should occur.
    #[serde(rename = "R")]
    ExploreRecursive {
        #[serde(rename = ":>")]
        sequence: Box<Selector>,
        #[serde(rename = "l")]
        limit: RecursionLimit,
        /// If a node matches, we won't match it nor explore its children.
        #[serde(rename = "!")]
        stop_at: Option<Condition>,
        /// Used to index current step of the recursion; not serialized.
        #[serde(skip_deserializing, skip_serializing)]
        current: Option<Box<Selector>>,
    },

    /// ExploreRecursiveEdge is a special sentinel value which is used to mark
    /// the end of a sequence started by an ExploreRecursive selector: the
    /// recursion goes back to the initial state of the earlier
    /// ExploreRecursive selector, and proceeds again (with a decremented
    /// depth value).
    #[serde(rename = "@", with = "empty_map")]
    ExploreRecursiveEdge,

    /// ExploreUnion allows selection to continue with two or more distinct
    /// selectors while exploring the same tree of data.
    #[serde(rename = "|")]
    ExploreUnion(Vec<Selector>),

    /// ExploreInterpretAs triggers a named reifier on the loaded node and
    /// continues the walk against the reified view. The only registered
    /// reifier is the trie view used for partial state reads.
    #[serde(rename = "~")]
    ExploreInterpretAs {
        #[serde(rename = "as")]
        adl: String,
        #[serde(rename = ">")]
        next: Box<Selector>,
    },
}

impl Cbor for Selector {}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Copy)]
pub enum RecursionLimit {
    #[serde(rename = "none", with = "empty_map")]
    None,
    #[serde(rename = "depth")]
    Depth(u64),
}

impl SubAssign<u64> for RecursionLimit {
    fn sub_assign(&mut self, other: u64) {
        if let RecursionLimit::Depth(v) = self {
            *v -= other;
        }
    }
}

/// Condition expresses a predicate with a boolean result. Kept skeletal; the
/// client never emits conditions but must round-trip selectors that carry
/// them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Copy)]
pub enum Condition {
    #[serde(rename = "hasField")]
    HasField,
    #[serde(rename = "=")]
    HasValue,
    #[serde(rename = "%")]
    HasKind,
    #[serde(rename = "/")]
    IsLink,
}

impl Selector {
    /// Returns a vector of all path segments of interest, `None` variant is
    /// synonymous with all.
    pub fn interests(&self) -> Option<Vec<PathSegment>> {
        match self {
            ExploreAll { .. } => None,
            ExploreFields { fields } => Some(fields.keys().map(PathSegment::from).collect()),
            ExploreIndex { index, .. } => Some(vec![(*index).into()]),
            ExploreRange { start, end, .. } => {
                if end < start {
                    return None;
                }
                let mut inter = Vec::with_capacity(end - start);
                for i in *start..*end {
                    inter.push(PathSegment::from(i));
                }
                Some(inter)
            }
            ExploreRecursive {
                current, sequence, ..
            } => {
                if let Some(selector) = current {
                    selector.interests()
                } else {
                    sequence.interests()
                }
            }
            ExploreRecursiveEdge => {
                // Should never be called on this variant
                Some(vec![])
            }
            ExploreUnion(selectors) => {
                let mut segs = Vec::new();
                for m in selectors {
                    if let Some(i) = m.interests() {
                        segs.extend_from_slice(&i);
                    } else {
                        // if any member has all interests, union will as well
                        return None;
                    }
                }
                Some(segs)
            }
            ExploreInterpretAs { next, .. } => next.interests(),
            Matcher => {
                // Intentionally an empty vector
                Some(vec![])
            }
        }
    }

    /// Processes and returns resultant selector node
    pub fn explore(self, ipld: &Ipld, p: &PathSegment) -> Option<Selector> {
        match self {
            ExploreAll { next } => Some(*next),
            ExploreFields { mut fields } => {
                ipld.lookup_segment(p)?;
                match p {
                    PathSegment::String(s) => fields.remove(&BytesKey::from(s.as_str())),
                    PathSegment::Int(i) => fields.remove(&BytesKey::from(i.to_string().as_str())),
                    PathSegment::Bytes(bz) => fields.remove(&BytesKey(bz.clone())),
                }
            }
            ExploreIndex { index, next } => match ipld {
                Ipld::List(l) => {
                    let i = p.to_index()?;
                    if i != index || i >= l.len() {
                        None
                    } else {
                        // Path segment matches selector index
                        Some(*next)
                    }
                }
                _ => None,
            },
            ExploreRange { start, end, next } => {
                match ipld {
                    Ipld::List(l) => {
                        let i = p.to_index()?;
                        // Check to make sure index is within list bounds
                        if i < start || i >= end || i >= l.len() {
                            None
                        } else {
                            // Path segment is within the selector range
                            Some(*next)
                        }
                    }
                    _ => None,
                }
            }
            ExploreRecursive {
                current,
                sequence,
                mut limit,
                stop_at,
            } => {
                let next = current
                    .unwrap_or_else(|| sequence.clone())
                    .explore(ipld, p)?;

                if !has_recursive_edge(&next) {
                    return Some(ExploreRecursive {
                        sequence,
                        current: Some(next.into()),
                        limit,
                        stop_at,
                    });
                }

                if let RecursionLimit::Depth(depth) = limit {
                    if depth < 2 {
                        // Replaces recursive edge with None on last iteration
                        return replace_recursive_edge(next, None);
                    }
                    limit -= 1;
                }

                Some(ExploreRecursive {
                    current: replace_recursive_edge(next, Some(*sequence.clone())).map(Box::new),
                    sequence,
                    limit,
                    stop_at,
                })
            }
            ExploreUnion(selectors) => {
                // Push all valid explored selectors to new vector
                let replace_selectors: Vec<_> = selectors
                    .into_iter()
                    .filter_map(|s| s.explore(ipld, p))
                    .collect();

                Selector::from_selectors(replace_selectors)
            }
            // Without a traversal engine in the loop there is no view to
            // interpret; continue into the inner selector unchanged.
            ExploreInterpretAs { next, .. } => next.explore(ipld, p),
            ExploreRecursiveEdge => None,
            // Matcher is terminal selector
            Matcher => None,
        }
    }

    /// Returns true if matcher, false otherwise
    pub fn decide(&self) -> bool {
        match self {
            Matcher => true,
            ExploreUnion(selectors) => {
                for s in selectors {
                    if s.decide() {
                        return true;
                    }
                }
                false
            }
            ExploreRecursive {
                current, sequence, ..
            } => {
                if let Some(curr) = current {
                    curr.decide()
                } else {
                    sequence.decide()
                }
            }
            _ => false,
        }
    }

    fn from_selectors(mut vec: Vec<Self>) -> Option<Self> {
        match vec.len() {
            0 | 1 => vec.pop(),
            _ => Some(ExploreUnion(vec)),
        }
    }
}

fn replace_recursive_edge(next_sel: Selector, replace: Option<Selector>) -> Option<Selector> {
    match next_sel {
        ExploreRecursiveEdge => replace,
        ExploreUnion(selectors) => {
            // Push all valid explored selectors to new vector
            let replace_selectors: Vec<_> = selectors
                .into_iter()
                .filter_map(|s| replace_recursive_edge(s, replace.clone()))
                .collect();

            Selector::from_selectors(replace_selectors)
        }
        _ => Some(next_sel),
    }
}

fn has_recursive_edge(next_sel: &Selector) -> bool {
    match next_sel {
        ExploreRecursiveEdge { .. } => true,
        ExploreUnion(selectors) => selectors.iter().any(has_recursive_edge),
        _ => false,
    }
}

/// Selector covering every node reachable from the root, recursing through
/// links to a bounded depth. Graph-exchange requests for whole sub-DAGs (for
/// example a receipts vector) are built from this.
pub fn explore_all_recursively(depth: u64) -> Selector {
    ExploreRecursive {
        sequence: Box::new(ExploreAll {
            next: Box::new(ExploreRecursiveEdge),
        }),
        limit: RecursionLimit::Depth(depth),
        stop_at: None,
        current: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explore_all_keeps_recursing() {
        let sel = explore_all_recursively(10);
        let ipld = Ipld::List(vec![Ipld::Integer(1)]);
        let next = sel.explore(&ipld, &PathSegment::Int(0)).unwrap();
        match next {
            ExploreRecursive { limit, .. } => assert_eq!(limit, RecursionLimit::Depth(9)),
            other => panic!("unexpected selector: {other:?}"),
        }
    }

    #[test]
    fn matcher_decides() {
        assert!(Selector::Matcher.decide());
        assert!(!explore_all_recursively(2).decide());
    }
}
