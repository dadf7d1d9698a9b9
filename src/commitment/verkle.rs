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

//! A placeholder polynomial (verkle-style) commitment model (§1, Out of
//! scope: "behavior beyond the `CommitmentModel` contract is not specified
//! here"). This exists only to demonstrate that [`CommitmentModel`] is
//! pluggable beyond the hash-based reference scheme; it is not a real
//! vector-commitment construction and carries no soundness guarantee.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use crate::arity::{Arity, PathUnit};
use crate::commitment::hash::{Blake2b256, DigestWidth};
use crate::commitment::CommitmentModel;
use crate::error::NodeCodecError;
use crate::node::Node;

/// Stand-in "evaluation point" for a would-be polynomial commitment: a
/// single digest over the node's slots, same as the hash scheme, tagged
/// distinctly so it is never confused with a real [`HashCommitmentModel`]
/// commitment.
///
/// [`HashCommitmentModel`]: crate::commitment::hash::HashCommitmentModel
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct VerkleStub {
    digest: <Blake2b256 as DigestWidth>::Bytes,
}

impl AsRef<[u8]> for VerkleStub {
    fn as_ref(&self) -> &[u8] { self.digest.as_ref() }
}

/// Terminal placeholder: a digest of the committed value, same shape as
/// [`VerkleStub`] but kept as a distinct type so the trait's two associated
/// types are never accidentally interchangeable.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct VerkleTerminalStub {
    digest: <Blake2b256 as DigestWidth>::Bytes,
}

const TAG_VERKLE_NODE: &str = "auth_trie:verkle-stub:node:v1";
const TAG_VERKLE_TERMINAL: &str = "auth_trie:verkle-stub:terminal:v1";

/// A [`CommitmentModel`] demonstrating that the trait is pluggable beyond
/// the hash-based reference scheme. Does not implement an actual
/// polynomial commitment; see the module docs.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct VerkleCommitmentModel {
    arity: Arity,
    _private: PhantomData<()>,
}

impl VerkleCommitmentModel {
    /// Constructs a stub model for `arity`.
    pub fn new(arity: Arity) -> Self { VerkleCommitmentModel { arity, _private: PhantomData } }
}

impl CommitmentModel for VerkleCommitmentModel {
    type VectorCommitment = VerkleStub;
    type TerminalCommitment = VerkleTerminalStub;

    fn path_arity(&self) -> Arity { self.arity }

    fn new_vector_commitment(&self) -> Self::VectorCommitment {
        VerkleStub { digest: <Blake2b256 as DigestWidth>::Bytes::default() }
    }

    fn new_terminal_commitment(&self) -> Self::TerminalCommitment {
        VerkleTerminalStub { digest: <Blake2b256 as DigestWidth>::Bytes::default() }
    }

    fn commit_to_data(&self, data: &[u8]) -> Option<Self::TerminalCommitment> {
        if data.is_empty() {
            return None;
        }
        Some(VerkleTerminalStub { digest: Blake2b256::hash(TAG_VERKLE_TERMINAL, &[data]) })
    }

    fn calc_node_commitment(&self, node: &Node<Self::VectorCommitment, Self::TerminalCommitment>) -> Option<Self::VectorCommitment> {
        if node.terminal.is_none() && node.children.is_empty() {
            return None;
        }
        let fragment = crate::codec::encode(&node.path_fragment, self.arity);
        let terminal_bytes = node.terminal.as_ref().map(|t| t.digest.as_ref().to_vec()).unwrap_or_default();
        let mut children_bytes = Vec::new();
        for (&digit, vc) in &node.children {
            children_bytes.push(digit);
            children_bytes.extend_from_slice(vc.digest.as_ref());
        }
        Some(VerkleStub {
            digest: Blake2b256::hash(TAG_VERKLE_NODE, &[&fragment, &terminal_bytes, &children_bytes]),
        })
    }

    fn update_node_commitment(
        &self,
        node: &mut Node<Self::VectorCommitment, Self::TerminalCommitment>,
        child_updates: &BTreeMap<PathUnit, Option<Self::VectorCommitment>>,
        new_terminal: Option<Self::TerminalCommitment>,
        _calc_delta: bool,
        _prior: Option<&Self::VectorCommitment>,
    ) -> Option<Self::VectorCommitment> {
        for (&digit, update) in child_updates {
            match update {
                Some(vc) => {
                    node.children.insert(digit, vc.clone());
                }
                None => {
                    node.children.remove(&digit);
                }
            }
        }
        node.terminal = new_terminal;
        self.calc_node_commitment(node)
    }

    fn encode_vc(&self, vc: &Self::VectorCommitment, out: &mut Vec<u8>) { out.extend_from_slice(vc.digest.as_ref()); }

    fn decode_vc(&self, buf: &[u8]) -> Result<(Self::VectorCommitment, usize), NodeCodecError> {
        let size = <Blake2b256 as DigestWidth>::SIZE;
        if buf.len() < size {
            return Err(NodeCodecError::TruncatedVectorCommitment);
        }
        let mut digest = <Blake2b256 as DigestWidth>::Bytes::default();
        digest.as_mut().copy_from_slice(&buf[..size]);
        Ok((VerkleStub { digest }, size))
    }

    fn encode_tc(&self, tc: &Self::TerminalCommitment, out: &mut Vec<u8>) { out.extend_from_slice(tc.digest.as_ref()); }

    fn decode_tc(&self, buf: &[u8]) -> Result<(Self::TerminalCommitment, usize), NodeCodecError> {
        let size = <Blake2b256 as DigestWidth>::SIZE;
        if buf.len() < size {
            return Err(NodeCodecError::TruncatedVectorCommitment);
        }
        let mut digest = <Blake2b256 as DigestWidth>::Bytes::default();
        digest.as_mut().copy_from_slice(&buf[..size]);
        Ok((VerkleTerminalStub { digest }, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_node_has_no_commitment() {
        let model = VerkleCommitmentModel::new(Arity::Byte);
        let node: Node<VerkleStub, VerkleTerminalStub> = Node::empty();
        assert!(model.calc_node_commitment(&node).is_none());
    }

    #[test]
    fn terminal_node_commits() {
        let model = VerkleCommitmentModel::new(Arity::Byte);
        let mut node: Node<VerkleStub, VerkleTerminalStub> = Node::empty();
        node.terminal = model.commit_to_data(b"value");
        assert!(model.calc_node_commitment(&node).is_some());
    }

    #[test]
    fn vc_roundtrips_through_encode_decode() {
        let model = VerkleCommitmentModel::new(Arity::Byte);
        let vc = model.commit_to_data(b"x").map(|tc| VerkleStub { digest: tc.digest }).unwrap();
        let mut buf = Vec::new();
        model.encode_vc(&vc, &mut buf);
        let (decoded, consumed) = model.decode_vc(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(decoded, vc);
    }
}
