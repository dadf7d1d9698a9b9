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

//! Proofs of inclusion and absence for the hash-based commitment scheme
//! (§4.7).
//!
//! A proof discloses every node on the path from the root to the key's
//! position, each stripped of the one child commitment that the verifier
//! recomputes by folding up from the next-deeper element; every other
//! sibling commitment is carried verbatim, since the verifier has no other
//! way to reconstruct it.

use std::collections::BTreeMap;

use crate::arity::{Arity, PathUnit};
use crate::commitment::hash::{hash_slots, DigestWidth, HashCommitmentModel};
use crate::error::{MalformedProof, VerifyError};
use crate::store::KVReader;
use crate::trie::{proof_path, TraversalState, Trie};

/// The terminal slot disclosed for one proof element: the raw bytes the
/// node-commitment hash folds in, and whether they are an inlined value or
/// an `H`-byte hash (the two can share a length, so the flag — not just the
/// byte count — is what disambiguates them, per §6.3).
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct TerminalSlot {
    pub bytes: Vec<u8>,
    pub inline: bool,
}

/// One disclosed node along the path from the root to a key (§4.7).
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ProofElement<H: DigestWidth> {
    pub path_fragment: Vec<PathUnit>,
    pub terminal: Option<TerminalSlot>,
    /// Sibling child commitments, excluding the slot at `child_index`.
    pub children: BTreeMap<PathUnit, H::Bytes>,
    /// The branch digit continuing on to the next (deeper) element, if any.
    /// `None` only for the last element in a proof.
    pub child_index: Option<PathUnit>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Outcome {
    Presence,
    Absence,
}

/// A proof that a key is present (with a given value) or absent in a trie
/// committed to by a particular root (§4.7, §6.1).
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Proof<H: DigestWidth> {
    arity: Arity,
    key: Vec<u8>,
    outcome: Outcome,
    elements: Vec<ProofElement<H>>,
}

/// Extracts a proof for `key` from `trie` (§4.7). Works whether `key` is
/// present or absent.
pub fn proof<R, H>(trie: &mut Trie<'_, R, HashCommitmentModel<H>>, key: &[u8]) -> Result<Proof<H>, R::Error>
where
    R: KVReader,
    H: DigestWidth,
{
    let arity = trie.arity();
    let key_units = crate::codec::unpack(key, arity);
    let store = trie.store_mut();
    let search = proof_path(store, arity, &key_units)?;

    let mut elements = Vec::with_capacity(search.visited.len());
    for (i, node_key) in search.visited.iter().enumerate() {
        let node = store.must_get(node_key)?;
        let child_index = search.visited.get(i + 1).map(|next_key| next_key[node_key.len() + node.path_fragment.len()]);

        let mut children = node.children.clone();
        if let Some(digit) = child_index {
            children.remove(&digit);
        }
        let terminal = node
            .terminal
            .as_ref()
            .map(|tc| TerminalSlot { bytes: tc.bytes().to_vec(), inline: tc.is_inline() });

        elements.push(ProofElement { path_fragment: node.path_fragment.clone(), terminal, children, child_index });
    }

    // `TraversalState::Terminal` only means the search ended exactly at `key`'s
    // position; a pure-branch node (terminal = None, children non-empty) is a
    // valid structure (invariant 1) that the search also reports as `Terminal`
    // for any key landing on it, even though no value was ever stored there.
    let has_terminal = elements.last().is_some_and(|e| e.terminal.is_some());
    let outcome = if matches!(search.state, TraversalState::Terminal) && has_terminal {
        Outcome::Presence
    } else {
        Outcome::Absence
    };
    Ok(Proof { arity, key: key.to_vec(), outcome, elements })
}

impl<H: DigestWidth> Proof<H> {
    /// Whether this is a proof of absence rather than inclusion.
    pub fn is_absence(&self) -> bool { matches!(self.outcome, Outcome::Absence) }

    /// The key this proof concerns, and the raw terminal bytes disclosed at
    /// its final element, if any.
    pub fn key_with_terminal(&self) -> (&[u8], Option<&TerminalSlot>) {
        (&self.key, self.elements.last().and_then(|e| e.terminal.as_ref()))
    }

    /// Recomputes the root commitment implied by this proof and checks it
    /// against `root`. When `value` is `Some`, also checks that a presence
    /// proof's disclosed terminal matches it (§4.7 verification algorithm).
    pub fn validate(&self, root: &H::Bytes, value: Option<&[u8]>) -> Result<(), VerifyError> {
        self.check_structure()?;

        let mut carry: Option<H::Bytes> = None;
        for element in self.elements.iter().rev() {
            let mut children = element.children.clone();
            if let Some(digit) = element.child_index {
                let deeper = carry.take().expect("every non-terminal element has a deeper element below it");
                children.insert(digit, deeper);
            }
            let terminal_bytes = element.terminal.as_ref().map(|t| t.bytes.as_slice());
            carry = Some(hash_slots::<H>(self.arity, &element.path_fragment, terminal_bytes, &children));
        }
        let computed = carry.expect("check_structure rejects empty proofs");
        if &computed != root {
            return Err(VerifyError::InvalidProof);
        }

        match (self.outcome, value) {
            (Outcome::Presence, Some(candidate)) => {
                let leaf = self.elements.last().and_then(|e| e.terminal.as_ref());
                let matches = leaf.is_some_and(|slot| terminal_slot_matches::<H>(slot, candidate));
                if !matches {
                    return Err(VerifyError::ValueMismatch);
                }
            }
            (Outcome::Absence, Some(_)) => return Err(VerifyError::ValueMismatch),
            (Outcome::Presence, None) | (Outcome::Absence, None) => {}
        }
        Ok(())
    }

    fn check_structure(&self) -> Result<(), MalformedProof> {
        if self.elements.is_empty() {
            return Err(MalformedProof::Empty);
        }
        let width = self.arity.width();
        for (i, element) in self.elements.iter().enumerate() {
            for &digit in element.children.keys() {
                if (digit as u16) >= width {
                    return Err(MalformedProof::ChildIndexOutOfRange(i, digit as u16, width));
                }
            }
            if let Some(digit) = element.child_index {
                if (digit as u16) >= width {
                    return Err(MalformedProof::ChildIndexOutOfRange(i, digit as u16, width));
                }
                if element.children.contains_key(&digit) {
                    return Err(MalformedProof::UnexpectedChildSlot(i, digit as u16));
                }
            } else if i + 1 != self.elements.len() {
                return Err(MalformedProof::FragmentMismatch(i));
            }
        }
        Ok(())
    }

    /// Hand-rolled binary serialization mirroring the node blob format
    /// (§4.2, §6.2): little-endian length prefixes, no external framework.
    pub fn bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(self.arity.family_tag());
        out.push(matches!(self.outcome, Outcome::Absence) as u8);
        out.extend_from_slice(&(self.key.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.key);
        out.extend_from_slice(&(self.elements.len() as u32).to_le_bytes());
        for element in &self.elements {
            let frag = crate::codec::encode(&element.path_fragment, self.arity);
            out.extend_from_slice(&(frag.len() as u16).to_le_bytes());
            out.extend_from_slice(&frag);

            match &element.terminal {
                Some(slot) => {
                    out.push(1);
                    out.push(slot.inline as u8);
                    out.extend_from_slice(&(slot.bytes.len() as u16).to_le_bytes());
                    out.extend_from_slice(&slot.bytes);
                }
                None => out.push(0),
            }

            out.extend_from_slice(&(element.children.len() as u16).to_le_bytes());
            for (&digit, vc) in &element.children {
                out.push(digit);
                out.extend_from_slice(vc.as_ref());
            }

            match element.child_index {
                Some(digit) => {
                    out.push(1);
                    out.push(digit);
                }
                None => out.push(0),
            }
        }
        out
    }

    /// Parses a proof produced by [`Proof::bytes`].
    pub fn from_bytes(buf: &[u8]) -> Result<Self, MalformedProof> {
        let mut pos = 0usize;
        let family = *buf.first().ok_or(MalformedProof::NodeCodec(crate::error::NodeCodecError::Empty))?;
        let arity = Arity::from_family_tag(family >> 5).ok_or(MalformedProof::NodeCodec(
            crate::error::NodeCodecError::Codec(crate::error::CodecError::MalformedEncoding(family)),
        ))?;
        pos += 1;

        let outcome_flag = *need(buf, pos)?;
        let outcome = if outcome_flag != 0 { Outcome::Absence } else { Outcome::Presence };
        pos += 1;

        let key_len = read_u32(buf, &mut pos)?;
        let key = read_bytes(buf, &mut pos, key_len)?.to_vec();

        let element_count = read_u32(buf, &mut pos)?;
        let mut elements = Vec::with_capacity(element_count);
        for _ in 0..element_count {
            let frag_len = read_u16(buf, &mut pos)?;
            let frag_bytes = read_bytes(buf, &mut pos, frag_len)?;
            let path_fragment = crate::codec::decode(frag_bytes, arity)
                .map_err(|e| MalformedProof::NodeCodec(crate::error::NodeCodecError::Codec(e)))?;

            let has_terminal = *need(buf, pos)?;
            pos += 1;
            let terminal = if has_terminal != 0 {
                let inline = *need(buf, pos)? != 0;
                pos += 1;
                let len = read_u16(buf, &mut pos)?;
                let bytes = read_bytes(buf, &mut pos, len)?.to_vec();
                Some(TerminalSlot { bytes, inline })
            } else {
                None
            };

            let child_count = read_u16(buf, &mut pos)?;
            let mut children = BTreeMap::new();
            for _ in 0..child_count {
                let digit = *need(buf, pos)?;
                pos += 1;
                let vc_bytes = read_bytes(buf, &mut pos, H::SIZE)?;
                let mut vc = H::Bytes::default();
                vc.as_mut().copy_from_slice(vc_bytes);
                children.insert(digit, vc);
            }

            let has_child_index = *need(buf, pos)?;
            pos += 1;
            let child_index = if has_child_index != 0 {
                let digit = *need(buf, pos)?;
                pos += 1;
                Some(digit)
            } else {
                None
            };

            elements.push(ProofElement { path_fragment, terminal, children, child_index });
        }

        Ok(Proof { arity, key, outcome, elements })
    }
}

fn terminal_slot_matches<H: DigestWidth>(slot: &TerminalSlot, value: &[u8]) -> bool {
    if slot.inline {
        slot.bytes == value
    } else {
        slot.bytes == H::hash(crate::commitment::hash::TAG_TERMINAL, &[value]).as_ref()
    }
}

fn need(buf: &[u8], pos: usize) -> Result<&u8, MalformedProof> {
    buf.get(pos).ok_or(MalformedProof::NodeCodec(crate::error::NodeCodecError::UnexpectedEnd(1)))
}

fn read_bytes(buf: &[u8], pos: &mut usize, len: usize) -> Result<&[u8], MalformedProof> {
    let end = *pos + len;
    let slice =
        buf.get(*pos..end).ok_or(MalformedProof::NodeCodec(crate::error::NodeCodecError::UnexpectedEnd(end - buf.len())))?;
    *pos = end;
    Ok(slice)
}

fn read_u16(buf: &[u8], pos: &mut usize) -> Result<usize, MalformedProof> {
    let bytes = read_bytes(buf, pos, 2)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]) as usize)
}

fn read_u32(buf: &[u8], pos: &mut usize) -> Result<usize, MalformedProof> {
    let bytes = read_bytes(buf, pos, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap as StdBTreeMap;

    use super::*;
    use crate::arity::Arity;
    use crate::commitment::{Blake2b256, HashCommitmentModel};
    use crate::store::KVWriter;

    #[derive(Default)]
    struct MemoryStore {
        data: RefCell<StdBTreeMap<Vec<u8>, Vec<u8>>>,
    }

    impl KVReader for MemoryStore {
        type Error = std::convert::Infallible;

        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
            Ok(self.data.borrow().get(key).cloned())
        }
    }

    impl KVWriter for MemoryStore {
        type Error = std::convert::Infallible;

        fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), Self::Error> {
            self.data.borrow_mut().insert(key.to_vec(), value.to_vec());
            Ok(())
        }

        fn delete(&mut self, key: &[u8]) -> Result<(), Self::Error> {
            self.data.borrow_mut().remove(key);
            Ok(())
        }
    }

    fn new_trie(arity: Arity) -> Trie<'static, MemoryStore, HashCommitmentModel<Blake2b256>> {
        let store: &'static MemoryStore = Box::leak(Box::new(MemoryStore::default()));
        Trie::new(HashCommitmentModel::new(arity), store, arity, false)
    }

    #[test]
    fn presence_proof_validates_against_root() {
        let mut trie = new_trie(Arity::Byte);
        trie.update(b"alpha", b"1").unwrap();
        trie.update(b"alter", b"2").unwrap();
        let root = trie.commit().unwrap();

        let p = proof(&mut trie, b"alpha").unwrap();
        assert!(!p.is_absence());
        p.validate(&root, Some(b"1")).unwrap();
        assert!(p.validate(&root, Some(b"wrong")).is_err());
    }

    #[test]
    fn absence_proof_validates_against_root() {
        let mut trie = new_trie(Arity::Byte);
        trie.update(b"alpha", b"1").unwrap();
        let root = trie.commit().unwrap();

        let p = proof(&mut trie, b"beta").unwrap();
        assert!(p.is_absence());
        p.validate(&root, None).unwrap();
    }

    #[test]
    fn absence_proof_for_a_pure_branch_node() {
        // "ab" is never inserted, but the root ends up as a pure-branch node
        // (terminal = None, children at b'1' and b'2') at exactly that path.
        let mut trie = new_trie(Arity::Byte);
        trie.update(b"ab1", b"1").unwrap();
        trie.update(b"ab2c", b"2").unwrap();
        trie.update(b"ab4", b"4").unwrap();
        let root = trie.commit().unwrap();

        let p = proof(&mut trie, b"ab").unwrap();
        assert!(p.is_absence());
        p.validate(&root, None).unwrap();
        assert!(p.validate(&root, Some(b"anything")).is_err());
    }

    #[test]
    fn proof_roundtrips_through_bytes() {
        let mut trie = new_trie(Arity::Nibble);
        trie.update(b"alpha", b"1").unwrap();
        trie.update(b"alter", b"2").unwrap();
        trie.commit();

        let p = proof(&mut trie, b"alter").unwrap();
        let encoded = p.bytes();
        let decoded = Proof::<Blake2b256>::from_bytes(&encoded).unwrap();
        assert_eq!(decoded, p);
    }
}
