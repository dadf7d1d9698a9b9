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

//! Reference commitment scheme (§6.3): fixed-size blake2b digests, with a
//! short-value inline optimization for terminal commitments.
//!
//! Node commitments are domain-separated tagged hashes over a fixed number
//! of slots — one per child branch digit, one for the terminal, one for the
//! compressed path fragment — so two nodes can never collide across
//! differently-shaped inputs. Domain tags are this crate's own convention;
//! the specification leaves the exact tag strings unspecified.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use blake2::Blake2b;
use digest::consts::{U20, U32};
use digest::Digest;

use crate::arity::{Arity, PathUnit};
use crate::commitment::CommitmentModel;
use crate::error::NodeCodecError;
use crate::node::Node;

pub(crate) const TAG_TERMINAL: &str = "auth_trie:terminal:v1";
const TAG_NODE: &str = "auth_trie:node:v1";
const TAG_FRAGMENT: &str = "auth_trie:fragment:v1";

mod sealed {
    pub trait Sealed {}
}

/// A digest width pluggable into [`HashCommitmentModel`] (§6.3: `H` is 20 or
/// 32 bytes). Sealed — the two markers below are the only implementors.
pub trait DigestWidth: sealed::Sealed + Copy + Clone + Eq + fmt::Debug + 'static {
    /// Digest length in bytes.
    const SIZE: usize;
    /// Fixed-size array holding one digest of this width.
    type Bytes: Copy + Clone + Eq + AsRef<[u8]> + AsMut<[u8]> + Default + fmt::Debug + Send + Sync;

    /// BIP340-style tagged hash: domain-separates `tag` from the message by
    /// hashing it twice into the engine before the actual `chunks`.
    fn hash(tag: &str, chunks: &[&[u8]]) -> Self::Bytes;
}

/// 160-bit (20-byte) blake2b digest width.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Blake2b160;

/// 256-bit (32-byte) blake2b digest width.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Blake2b256;

impl sealed::Sealed for Blake2b160 {}
impl sealed::Sealed for Blake2b256 {}

fn tagged_hash_bytes<D: Digest>(tag: &str, chunks: &[&[u8]]) -> Vec<u8> {
    let tag_hash = D::digest(tag.as_bytes());
    let mut engine = D::new();
    Digest::update(&mut engine, &tag_hash);
    Digest::update(&mut engine, &tag_hash);
    for chunk in chunks {
        Digest::update(&mut engine, chunk);
    }
    engine.finalize().to_vec()
}

impl DigestWidth for Blake2b160 {
    const SIZE: usize = 20;
    type Bytes = [u8; 20];

    fn hash(tag: &str, chunks: &[&[u8]]) -> Self::Bytes {
        let digest = tagged_hash_bytes::<Blake2b<U20>>(tag, chunks);
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest);
        out
    }
}

impl DigestWidth for Blake2b256 {
    const SIZE: usize = 32;
    type Bytes = [u8; 32];

    fn hash(tag: &str, chunks: &[&[u8]]) -> Self::Bytes {
        let digest = tagged_hash_bytes::<Blake2b<U32>>(tag, chunks);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        out
    }
}

/// A terminal commitment (§6.3): either an `H`-byte hash of the value, or —
/// for values no longer than `H` bytes — the value itself inlined in place
/// of the hash. `bytes` holds whichever of the two was chosen; `inline_len`
/// disambiguates a hash from an inline value that happens to also be `H`
/// bytes long. Node commitments (§4.7) hash these `bytes` directly, exactly
/// as stored, whichever form they take.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Terminal<H: DigestWidth> {
    bytes: Vec<u8>,
    inline_len: Option<usize>,
    _width: PhantomData<H>,
}

impl<H: DigestWidth> Terminal<H> {
    /// Whether `value` is the value this commitment was computed from.
    pub fn matches(&self, value: &[u8]) -> bool {
        match self.inline_len {
            Some(_) => self.bytes.as_slice() == value,
            None => self.bytes.as_slice() == H::hash(TAG_TERMINAL, &[value]).as_ref(),
        }
    }

    /// The raw bytes this commitment hashes as its node-commitment slot:
    /// the inlined value, or the `H`-byte value hash.
    pub(crate) fn bytes(&self) -> &[u8] { &self.bytes }

    /// Whether these bytes are an inlined value rather than a hash. Needed
    /// to disambiguate the two forms when they happen to share a length
    /// (a proof only carries raw bytes, not the commitment's own flag).
    pub(crate) fn is_inline(&self) -> bool { self.inline_len.is_some() }
}

/// Hashes a node's slots per §4.7 from raw parts, independent of any
/// concrete [`Node`]. Shared by [`HashCommitmentModel::hash_node`] and proof
/// verification, which reconstructs the same slots from disclosed proof
/// elements instead of a live node.
pub(crate) fn hash_slots<H: DigestWidth>(
    arity: Arity,
    path_fragment: &[PathUnit],
    terminal_bytes: Option<&[u8]>,
    children: &BTreeMap<PathUnit, H::Bytes>,
) -> H::Bytes {
    let width = arity.width();
    let mut slots: Vec<Vec<u8>> = Vec::with_capacity(width as usize + 2);
    for unit in 0..width {
        let slot = children
            .get(&(unit as PathUnit))
            .map(|vc| vc.as_ref().to_vec())
            .unwrap_or_else(|| vec![0u8; H::SIZE]);
        slots.push(slot);
    }
    slots.push(terminal_bytes.map(<[u8]>::to_vec).unwrap_or_else(|| vec![0u8; H::SIZE]));
    let fragment_bytes = crate::codec::encode(path_fragment, arity);
    slots.push(H::hash(TAG_FRAGMENT, &[&fragment_bytes]).as_ref().to_vec());

    let refs: Vec<&[u8]> = slots.iter().map(Vec::as_slice).collect();
    H::hash(TAG_NODE, &refs)
}

/// The reference commitment model (§6.3): [`HashCommitmentModel::new`] with
/// [`Blake2b160`] gives 20-byte digests, with [`Blake2b256`] gives 32-byte
/// digests.
#[derive(Clone, Debug)]
pub struct HashCommitmentModel<H: DigestWidth> {
    arity: Arity,
    _width: PhantomData<H>,
}

impl<H: DigestWidth> HashCommitmentModel<H> {
    pub fn new(arity: Arity) -> Self { HashCommitmentModel { arity, _width: PhantomData } }

    /// Hashes a node's slots per §4.7: one slot per child branch digit (in
    /// ascending digit order, zero-filled when absent), one terminal slot,
    /// and one slot for the digest of the node's encoded path fragment.
    ///
    /// Assumes `node.terminal` already reflects the logical terminal — the
    /// caller must have reconstructed it from the key-commitment
    /// optimization (§4.6.6) beforehand if [`Node::key_is_terminal`] is set.
    fn hash_node(&self, node: &Node<H::Bytes, Terminal<H>>) -> H::Bytes {
        hash_slots::<H>(self.arity, &node.path_fragment, node.terminal.as_ref().map(Terminal::bytes), &node.children)
    }
}

impl<H: DigestWidth> CommitmentModel for HashCommitmentModel<H> {
    type VectorCommitment = H::Bytes;
    type TerminalCommitment = Terminal<H>;

    fn path_arity(&self) -> Arity { self.arity }

    fn new_vector_commitment(&self) -> Self::VectorCommitment { H::Bytes::default() }

    fn new_terminal_commitment(&self) -> Self::TerminalCommitment {
        Terminal { bytes: Vec::new(), inline_len: None, _width: PhantomData }
    }

    fn commit_to_data(&self, data: &[u8]) -> Option<Self::TerminalCommitment> {
        if data.is_empty() {
            return None;
        }
        if data.len() <= H::SIZE {
            Some(Terminal { bytes: data.to_vec(), inline_len: Some(data.len()), _width: PhantomData })
        } else {
            let digest = H::hash(TAG_TERMINAL, &[data]);
            Some(Terminal { bytes: digest.as_ref().to_vec(), inline_len: None, _width: PhantomData })
        }
    }

    fn calc_node_commitment(
        &self,
        node: &Node<Self::VectorCommitment, Self::TerminalCommitment>,
    ) -> Option<Self::VectorCommitment> {
        node.is_committing().then(|| self.hash_node(node))
    }

    fn update_node_commitment(
        &self,
        node: &mut Node<Self::VectorCommitment, Self::TerminalCommitment>,
        child_updates: &BTreeMap<PathUnit, Option<Self::VectorCommitment>>,
        new_terminal: Option<Self::TerminalCommitment>,
        _calc_delta: bool,
        _prior: Option<&Self::VectorCommitment>,
    ) -> Option<Self::VectorCommitment> {
        for (&unit, update) in child_updates {
            match update {
                Some(vc) => {
                    node.children.insert(unit, vc.clone());
                }
                None => {
                    node.children.remove(&unit);
                }
            }
        }
        node.terminal = new_terminal;
        self.calc_node_commitment(node)
    }

    fn encode_vc(&self, vc: &Self::VectorCommitment, out: &mut Vec<u8>) { out.extend_from_slice(vc.as_ref()); }

    fn decode_vc(&self, buf: &[u8]) -> Result<(Self::VectorCommitment, usize), NodeCodecError> {
        if buf.len() < H::SIZE {
            return Err(NodeCodecError::TruncatedVectorCommitment);
        }
        let mut bytes = H::Bytes::default();
        bytes.as_mut().copy_from_slice(&buf[..H::SIZE]);
        Ok((bytes, H::SIZE))
    }

    fn encode_tc(&self, tc: &Self::TerminalCommitment, out: &mut Vec<u8>) {
        let tag = tc.inline_len.unwrap_or(0) as u8;
        out.push(tag);
        out.extend_from_slice(&tc.bytes);
    }

    fn decode_tc(&self, buf: &[u8]) -> Result<(Self::TerminalCommitment, usize), NodeCodecError> {
        let tag = *buf.first().ok_or(NodeCodecError::UnexpectedEnd(1))?;
        if tag == 0 {
            if buf.len() < 1 + H::SIZE {
                return Err(NodeCodecError::UnexpectedEnd(1 + H::SIZE - buf.len()));
            }
            let bytes = buf[1..1 + H::SIZE].to_vec();
            Ok((Terminal { bytes, inline_len: None, _width: PhantomData }, 1 + H::SIZE))
        } else if (tag as usize) <= H::SIZE {
            let len = tag as usize;
            if buf.len() < 1 + len {
                return Err(NodeCodecError::UnexpectedEnd(1 + len - buf.len()));
            }
            let bytes = buf[1..1 + len].to_vec();
            Ok((Terminal { bytes, inline_len: Some(len), _width: PhantomData }, 1 + len))
        } else {
            Err(NodeCodecError::InvalidTerminalTag(tag, H::SIZE))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_to_data_rejects_empty_value() {
        let model = HashCommitmentModel::<Blake2b256>::new(Arity::Byte);
        assert!(model.commit_to_data(b"").is_none());
    }

    #[test]
    fn short_values_are_inlined_long_values_are_hashed() {
        let model = HashCommitmentModel::<Blake2b160>::new(Arity::Byte);
        let short = model.commit_to_data(b"hi").unwrap();
        assert!(short.inline_len.is_some());
        let long = model.commit_to_data(&[0xAB; 64]).unwrap();
        assert!(long.inline_len.is_none());
    }

    #[test]
    fn terminal_commitment_roundtrips_both_forms() {
        let model = HashCommitmentModel::<Blake2b160>::new(Arity::Byte);
        for value in [b"hi".as_slice(), &[0xAB; 64]] {
            let tc = model.commit_to_data(value).unwrap();
            let mut buf = Vec::new();
            model.encode_tc(&tc, &mut buf);
            let (decoded, used) = model.decode_tc(&buf).unwrap();
            assert_eq!(used, buf.len());
            assert_eq!(decoded, tc);
            assert!(decoded.matches(value));
        }
    }

    #[test]
    fn vector_commitment_roundtrips() {
        let model = HashCommitmentModel::<Blake2b256>::new(Arity::Nibble);
        let vc = Blake2b256::hash("test", &[b"value"]);
        let mut buf = Vec::new();
        model.encode_vc(&vc, &mut buf);
        let (decoded, used) = model.decode_vc(&buf).unwrap();
        assert_eq!(used, 32);
        assert_eq!(decoded, vc);
    }

    #[test]
    fn node_commitment_is_independent_of_child_insertion_order() {
        let model = HashCommitmentModel::<Blake2b256>::new(Arity::Nibble);
        let mut a = Node::empty();
        a.children.insert(1, Blake2b256::hash("test", &[b"x"]));
        a.children.insert(5, Blake2b256::hash("test", &[b"y"]));

        let mut b = Node::empty();
        b.children.insert(5, Blake2b256::hash("test", &[b"y"]));
        b.children.insert(1, Blake2b256::hash("test", &[b"x"]));

        assert_eq!(model.calc_node_commitment(&a), model.calc_node_commitment(&b));
    }

    #[test]
    fn node_commitment_changes_with_path_fragment() {
        let model = HashCommitmentModel::<Blake2b256>::new(Arity::Nibble);
        let mut a = Node::empty();
        a.terminal = model.commit_to_data(b"v");
        let mut b = a.clone();
        b.path_fragment = vec![1, 2];
        assert_ne!(model.calc_node_commitment(&a), model.calc_node_commitment(&b));
    }

    #[test]
    fn non_committing_node_has_no_commitment() {
        let model = HashCommitmentModel::<Blake2b256>::new(Arity::Byte);
        let node: Node<_, _> = Node::empty();
        assert!(model.calc_node_commitment(&node).is_none());
    }
}
