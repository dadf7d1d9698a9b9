// Authenticated extended radix trie library.
//
// SPDX-License-Identifier: Apache-2.0
//
// Written in 2024-2025 by
//     Dr. Maxim Orlovsky <orlovsky@lnp-bp.org>
//
// Copyright (C) 2024-2025 LNP/BP Laboratories,
//                         Institute for Distributed and Cognitive Systems
// (InDCS), Switzerland. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Path search (§4.6.1): walking a trie from the root towards a key and
//! classifying how the walk ends.

use crate::arity::{Arity, PathUnit};
use crate::commitment::CommitmentModel;
use crate::store::{BufferedNodeStore, KVReader};

/// How a [`proof_path`] walk terminated.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum TraversalState {
    /// The trie has no root node at all.
    Empty,
    /// The walk consumed the whole remaining key exactly at a node's
    /// position.
    Terminal,
    /// The remaining key diverges from the last node's path fragment before
    /// the fragment ends. `common_len` is the length of the shared prefix.
    Split { common_len: usize },
    /// The remaining key exhausts the last node's path fragment and wants to
    /// branch further, but no such child exists. `common_len` is always
    /// equal to the fragment's length.
    Extend { common_len: usize },
}

/// Result of a [`proof_path`] walk: every node key visited, root first, and
/// how the walk ended.
#[derive(Clone, Debug)]
pub struct PathSearch {
    pub visited: Vec<Vec<PathUnit>>,
    pub state: TraversalState,
}

fn common_prefix_len(a: &[PathUnit], b: &[PathUnit]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Walks the trie from the root towards `key` (already unpacked into path
/// units), per §4.6.1.
pub fn proof_path<R, M>(
    store: &mut BufferedNodeStore<R, M>,
    arity: Arity,
    key: &[PathUnit],
) -> Result<PathSearch, R::Error>
where
    R: KVReader,
    M: CommitmentModel,
{
    let mut visited = Vec::new();
    let mut position: Vec<PathUnit> = Vec::new();

    loop {
        let Some(node) = store.get(&position)? else {
            assert!(visited.is_empty(), "a node referenced on the path must exist in the store");
            return Ok(PathSearch { visited, state: TraversalState::Empty });
        };
        visited.push(position.clone());

        let tail = &key[position.len()..];
        let frag = node.path_fragment.as_slice();

        if tail == frag {
            return Ok(PathSearch { visited, state: TraversalState::Terminal });
        }

        let common_len = common_prefix_len(tail, frag);
        if common_len < frag.len() {
            return Ok(PathSearch { visited, state: TraversalState::Split { common_len } });
        }

        // common_len == frag.len() < tail.len(), since tail != frag and frag is a prefix of tail.
        let digit = tail[frag.len()];
        let has_child = node.children.contains_key(&digit);
        let mut next_position = position.clone();
        next_position.extend_from_slice(frag);
        next_position.push(digit);

        if has_child {
            position = next_position;
            continue;
        }
        return Ok(PathSearch { visited, state: TraversalState::Extend { common_len } });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_prefix_len_examples() {
        assert_eq!(common_prefix_len(&[1, 2, 3], &[1, 2, 4]), 2);
        assert_eq!(common_prefix_len(&[], &[1]), 0);
        assert_eq!(common_prefix_len(&[1, 2], &[1, 2]), 2);
    }
}
