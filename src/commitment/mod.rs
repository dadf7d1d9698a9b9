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

//! Commitment-model abstraction (§4.3, §4.8): the capability interface
//! implemented by each cryptographic scheme plugged into the trie engine.
//!
//! This mirrors the role `commit_verify::CommitVerify` plays for single
//! messages, generalized to a whole trie node (a path fragment, a sparse
//! child map and an optional terminal folded together into one vector
//! commitment).

pub mod hash;
#[cfg(feature = "verkle")]
pub mod verkle;

use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::arity::{Arity, PathUnit};
use crate::error::NodeCodecError;
use crate::node::Node;

pub use hash::{Blake2b160, Blake2b256, HashCommitmentModel};

/// A pluggable cryptographic commitment scheme (§4.3).
///
/// Implementations compute a [`CommitmentModel::VectorCommitment`] for a
/// whole trie node, and a [`CommitmentModel::TerminalCommitment`] for a
/// single user value. The trie engine only ever calls through this trait,
/// never assuming anything about the concrete representation of either
/// commitment type.
pub trait CommitmentModel {
    /// Commitment to a full node (path fragment + children + terminal).
    type VectorCommitment: Clone + Eq + Debug;
    /// Commitment to a single user value.
    type TerminalCommitment: Clone + Eq + Debug;

    /// Arity of paths this model expects; the engine honors it when packing
    /// and unpacking keys.
    fn path_arity(&self) -> Arity;

    /// An empty placeholder vector commitment, used only when deserializing
    /// a node that is about to have its fields filled in.
    fn new_vector_commitment(&self) -> Self::VectorCommitment;

    /// An empty placeholder terminal commitment, used only when
    /// deserializing.
    fn new_terminal_commitment(&self) -> Self::TerminalCommitment;

    /// The canonical terminal commitment for a value. Returns `None` for the
    /// empty value, which is the single overloaded signal meaning
    /// "delete" (§7).
    fn commit_to_data(&self, data: &[u8]) -> Option<Self::TerminalCommitment>;

    /// Commitment of a node computed from scratch. Returns `None` if the
    /// node has neither a terminal nor any children (a non-committing
    /// node, which must never be persisted — §4.2).
    fn calc_node_commitment(
        &self,
        node: &Node<Self::VectorCommitment, Self::TerminalCommitment>,
    ) -> Option<Self::VectorCommitment>;

    /// Mutates `node`'s stored terminal and child map per `child_updates`
    /// (entries mapping to `None` mean child removal) and `new_terminal`,
    /// then returns the node's new commitment (§4.6.4).
    ///
    /// `calc_delta` hints that the scheme may apply an incremental update
    /// against `prior` instead of rebuilding from scratch; this is purely
    /// an optimization and must be bit-identical to the non-delta path.
    #[allow(clippy::too_many_arguments)]
    fn update_node_commitment(
        &self,
        node: &mut Node<Self::VectorCommitment, Self::TerminalCommitment>,
        child_updates: &BTreeMap<PathUnit, Option<Self::VectorCommitment>>,
        new_terminal: Option<Self::TerminalCommitment>,
        calc_delta: bool,
        prior: Option<&Self::VectorCommitment>,
    ) -> Option<Self::VectorCommitment>;

    /// Value equality for vector commitments, including both sides absent.
    fn vc_eq(
        &self,
        a: Option<&Self::VectorCommitment>,
        b: Option<&Self::VectorCommitment>,
    ) -> bool {
        a == b
    }

    /// Value equality for terminal commitments, including both sides
    /// absent.
    fn tc_eq(
        &self,
        a: Option<&Self::TerminalCommitment>,
        b: Option<&Self::TerminalCommitment>,
    ) -> bool {
        a == b
    }

    /// Serializes a vector commitment into `out` (§4.2, §6.3).
    fn encode_vc(&self, vc: &Self::VectorCommitment, out: &mut Vec<u8>);

    /// Parses a vector commitment from the front of `buf`, returning it and
    /// the number of bytes consumed.
    fn decode_vc(&self, buf: &[u8]) -> Result<(Self::VectorCommitment, usize), NodeCodecError>;

    /// Serializes a terminal commitment into `out` (§4.2, §6.3).
    fn encode_tc(&self, tc: &Self::TerminalCommitment, out: &mut Vec<u8>);

    /// Parses a terminal commitment from the front of `buf`, returning it
    /// and the number of bytes consumed.
    fn decode_tc(&self, buf: &[u8]) -> Result<(Self::TerminalCommitment, usize), NodeCodecError>;

    /// Reconstructs the terminal commitment implied by the key-commitment
    /// optimization (§4.6.6): `commit_to_data(full_key)`, where `full_key`
    /// is the original byte key packed back from its unpacked path units.
    fn commit_to_key(&self, full_key_units: &[PathUnit]) -> Option<Self::TerminalCommitment> {
        let bytes = crate::codec::pack(full_key_units, self.path_arity()).unwrap_or_else(|err| {
            panic!(
                "key-commitment optimization requires a byte-aligned full key, got {} units: {}",
                full_key_units.len(),
                err
            )
        });
        self.commit_to_data(&bytes)
    }
}
