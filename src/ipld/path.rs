// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::fmt;

use super::PathSegment;

/// Describes a series of steps across a tree or DAG of Ipld, where each step
/// is a map key or list index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    segments: Vec<PathSegment>,
}

impl Path {
    /// Returns the segments of the path.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Pushes a segment to the end of the path.
    pub fn push(&mut self, seg: PathSegment) {
        self.segments.push(seg);
    }

    /// Removes and returns the last segment of the path.
    pub fn pop(&mut self) -> Option<PathSegment> {
        self.segments.pop()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for seg in &self.segments {
            if !first {
                write!(f, "/")?;
            }
            write!(f, "{seg}")?;
            first = false;
        }
        Ok(())
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }
}
