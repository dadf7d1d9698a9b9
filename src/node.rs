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

//! Trie node data and its binary serialization (§4.2).
//!
//! [`Node`] is intentionally context-free: it knows nothing about its own
//! position in the trie (its `full_key`). That context is supplied by
//! whoever is reading or writing it (the node store, §4.4), which is also
//! why the key-commitment optimization (§4.6.6) is only *flagged* here and
//! reconstructed one layer up.

use std::collections::BTreeMap;

use crate::arity::{Arity, PathUnit};
use crate::commitment::CommitmentModel;
use crate::error::NodeCodecError;

const F_TERMINAL: u8 = 0b0000_0001;
const F_CHILDREN: u8 = 0b0000_0010;
const F_PATH_FRAGMENT: u8 = 0b0000_0100;
const F_KEY_IS_TERMINAL: u8 = 0b0000_1000;

/// A single trie node (§3): a compressed path fragment, a sparse map from
/// branch digit to child vector commitment, and an optional terminal
/// commitment.
#[derive(Clone, Debug)]
pub struct Node<VC, TC> {
    /// Path units compressing the stretch of the trie between this node's
    /// storage position and its first branch (or terminal).
    pub path_fragment: Vec<PathUnit>,
    /// Vector commitment of each present child, keyed by branch digit.
    pub children: BTreeMap<PathUnit, VC>,
    /// Terminal commitment of a value stored at this node's position, if
    /// any. When [`Node::key_is_terminal`] is set this mirrors
    /// `commit_to_data(full_key)` but is never written to the blob.
    pub terminal: Option<TC>,
    /// Key-commitment optimization flag (§4.6.6): the terminal equals
    /// `commit_to_data(full_key)` and is omitted from serialization.
    pub key_is_terminal: bool,
}

impl<VC, TC> Node<VC, TC> {
    /// A fresh node with no path fragment, no children and no terminal.
    /// Not committing by itself — callers must populate it before it can be
    /// persisted.
    pub fn empty() -> Self {
        Node { path_fragment: Vec::new(), children: BTreeMap::new(), terminal: None, key_is_terminal: false }
    }

    /// Whether this node commits to anything at all (§3, invariant 1; §4.2:
    /// a non-committing node is never serialized).
    pub fn is_committing(&self) -> bool {
        self.terminal.is_some() || !self.children.is_empty() || self.key_is_terminal
    }
}

/// Serializes `node` per §4.2. Panics if the node is non-committing — that
/// is always a library bug, never a reachable user error (§7).
pub fn serialize<M: CommitmentModel>(
    model: &M,
    arity: Arity,
    node: &Node<M::VectorCommitment, M::TerminalCommitment>,
) -> Vec<u8> {
    assert!(
        node.is_committing(),
        "attempted to serialize a non-committing node (no terminal, no children, no key-is-terminal flag)"
    );

    let mut flags = 0u8;
    if !node.path_fragment.is_empty() {
        flags |= F_PATH_FRAGMENT;
    }
    if node.key_is_terminal {
        flags |= F_KEY_IS_TERMINAL;
    }
    if node.terminal.is_some() && !node.key_is_terminal {
        flags |= F_TERMINAL;
    }
    if !node.children.is_empty() {
        flags |= F_CHILDREN;
    }

    let mut out = vec![flags];

    if flags & F_PATH_FRAGMENT != 0 {
        let encoded = crate::codec::encode(&node.path_fragment, arity);
        out.extend_from_slice(&(encoded.len() as u16).to_le_bytes());
        out.extend_from_slice(&encoded);
    }
    if flags & F_TERMINAL != 0 {
        model.encode_tc(node.terminal.as_ref().expect("F_TERMINAL implies terminal is Some"), &mut out);
    }
    if flags & F_CHILDREN != 0 {
        let mut bitmap = vec![0u8; arity.bitmap_bytes()];
        for &unit in node.children.keys() {
            set_bit(&mut bitmap, unit);
        }
        out.extend_from_slice(&bitmap);
        // BTreeMap iterates in ascending key order already (§4.2: "in ascending unit order").
        for vc in node.children.values() {
            model.encode_vc(vc, &mut out);
        }
    }
    out
}

/// Parses a node blob produced by [`serialize`].
///
/// If [`Node::key_is_terminal`] comes back set, `node.terminal` is left as
/// `None`: the caller (the node store, which alone knows this node's full
/// key) is responsible for reconstructing it via
/// [`CommitmentModel::commit_to_key`].
pub fn deserialize<M: CommitmentModel>(
    model: &M,
    arity: Arity,
    blob: &[u8],
) -> Result<Node<M::VectorCommitment, M::TerminalCommitment>, NodeCodecError> {
    if blob.is_empty() {
        return Err(NodeCodecError::Empty);
    }
    let flags = blob[0];
    let mut pos = 1usize;

    let path_fragment = if flags & F_PATH_FRAGMENT != 0 {
        require(blob, pos, 2)?;
        let len = u16::from_le_bytes([blob[pos], blob[pos + 1]]) as usize;
        pos += 2;
        require(blob, pos, len)?;
        let fragment = crate::codec::decode(&blob[pos..pos + len], arity)?;
        pos += len;
        fragment
    } else {
        Vec::new()
    };

    let terminal = if flags & F_TERMINAL != 0 {
        let (tc, used) = model.decode_tc(&blob[pos..])?;
        pos += used;
        Some(tc)
    } else {
        None
    };

    let mut children = BTreeMap::new();
    if flags & F_CHILDREN != 0 {
        let bitmap_len = arity.bitmap_bytes();
        require(blob, pos, bitmap_len)?;
        let bitmap = blob[pos..pos + bitmap_len].to_vec();
        pos += bitmap_len;
        for unit in 0..arity.width() {
            if bit_is_set(&bitmap, unit as PathUnit) {
                let (vc, used) = model.decode_vc(&blob[pos..])?;
                pos += used;
                children.insert(unit as PathUnit, vc);
            }
        }
    }

    Ok(Node { path_fragment, children, terminal, key_is_terminal: flags & F_KEY_IS_TERMINAL != 0 })
}

fn require(blob: &[u8], pos: usize, needed: usize) -> Result<(), NodeCodecError> {
    if blob.len() < pos + needed {
        Err(NodeCodecError::UnexpectedEnd(pos + needed - blob.len()))
    } else {
        Ok(())
    }
}

fn set_bit(bitmap: &mut [u8], unit: PathUnit) {
    let idx = unit as usize;
    bitmap[idx / 8] |= 1 << (7 - (idx % 8));
}

fn bit_is_set(bitmap: &[u8], unit: PathUnit) -> bool {
    let idx = unit as usize;
    bitmap[idx / 8] & (1 << (7 - (idx % 8))) != 0
}
