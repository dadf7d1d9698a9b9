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

//! The trie engine (§4.6): update, delete, commit and reconcile, built over
//! the buffered node store.
//!
//! Storage keys are absolute path-unit prefixes: a node's key never changes
//! under a sibling's split or merge, which is what lets `Commit`'s
//! bottom-up recomputation write each child's freshly hashed commitment
//! straight into its parent's `children` map without any key rewriting.

mod path;

pub use path::{proof_path, PathSearch, TraversalState};

use std::collections::{BTreeMap, BTreeSet};

use crate::arity::{Arity, PathUnit};
use crate::commitment::CommitmentModel;
use crate::node::Node;
use crate::store::{BufferedNodeStore, KVReader, KVWriter};

/// An authenticated extended radix trie (§3, §6.1).
pub struct Trie<'r, R, M: CommitmentModel> {
    store: BufferedNodeStore<'r, R, M>,
    arity: Arity,
    opt_key_commit: bool,
    /// node key -> parent node key, for every non-root key currently live in
    /// the cache or touched since the last `clear_cache`.
    parents: BTreeMap<Vec<PathUnit>, Vec<PathUnit>>,
    /// node keys whose stored commitment is stale and must be recomputed on
    /// the next `commit()`.
    modified: BTreeSet<Vec<PathUnit>>,
}

impl<'r, R, M: CommitmentModel + Clone> Clone for Trie<'r, R, M> {
    fn clone(&self) -> Self {
        Trie {
            store: self.store.clone(),
            arity: self.arity,
            opt_key_commit: self.opt_key_commit,
            parents: self.parents.clone(),
            modified: self.modified.clone(),
        }
    }
}

impl<'r, R, M> Trie<'r, R, M>
where
    R: KVReader,
    M: CommitmentModel,
{
    /// Constructs a trie over `reader` using `model`. `arity` must match
    /// `model.path_arity()`.
    pub fn new(model: M, reader: &'r R, arity: Arity, opt_key_commit: bool) -> Self {
        assert_eq!(model.path_arity(), arity, "commitment model arity does not match the requested trie arity");
        Trie {
            store: BufferedNodeStore::new(reader, model),
            arity,
            opt_key_commit,
            parents: BTreeMap::new(),
            modified: BTreeSet::new(),
        }
    }

    /// Direct access to the node store for the proof scheme, which needs to
    /// walk the same path search the engine itself uses.
    pub(crate) fn store_mut(&mut self) -> &mut BufferedNodeStore<'r, R, M> { &mut self.store }

    pub(crate) fn arity(&self) -> Arity { self.arity }

    fn mark_modified(&mut self, visited: &[Vec<PathUnit>]) { self.modified.extend(visited.iter().cloned()); }

    /// Records parent links for every step of a path search. `visited` comes
    /// straight from [`proof_path`], so this is the only source of truth
    /// needed for ancestry — it works equally for nodes freshly created this
    /// session and nodes read back from a backing store that was populated
    /// in a previous one.
    fn register_ancestry(&mut self, visited: &[Vec<PathUnit>]) {
        for pair in visited.windows(2) {
            self.parents.insert(pair[1].clone(), pair[0].clone());
        }
    }

    fn maybe_key_is_terminal(&self, full_key: &[PathUnit], terminal: &Option<M::TerminalCommitment>) -> bool {
        self.opt_key_commit && *terminal == self.store.model().commit_to_key(full_key)
    }

    /// Sets `key`'s value. An empty value deletes the key (§4.6.2).
    pub fn update(&mut self, key: &[u8], value: &[u8]) -> Result<(), R::Error> {
        let Some(t) = self.store.model().commit_to_data(value) else {
            return self.delete(key);
        };
        let key_units = crate::codec::unpack(key, self.arity);
        let search = proof_path(&mut self.store, self.arity, &key_units)?;
        self.register_ancestry(&search.visited);

        match search.state {
            TraversalState::Empty => {
                let mut node: Node<M::VectorCommitment, M::TerminalCommitment> = Node::empty();
                node.path_fragment = key_units.clone();
                node.key_is_terminal = self.maybe_key_is_terminal(&key_units, &Some(t.clone()));
                node.terminal = Some(t);
                self.store.insert_new(Vec::new(), node);
                self.modified.insert(Vec::new());
            }
            TraversalState::Terminal => {
                let last_key = search.visited.last().expect("non-empty search").clone();
                let full_key: Vec<PathUnit> = {
                    let node = self.store.must_get(&last_key)?;
                    let mut full = last_key.clone();
                    full.extend_from_slice(&node.path_fragment);
                    full
                };
                let node = self.store.must_get_mut(&last_key)?;
                node.terminal = Some(t.clone());
                node.key_is_terminal = self.opt_key_commit
                    && node.terminal == self.store.model().commit_to_key(&full_key);
                self.mark_modified(&search.visited);
            }
            TraversalState::Extend { common_len } => {
                let last_key = search.visited.last().expect("non-empty search").clone();
                let node = self.store.must_get(&last_key)?;
                let frag = node.path_fragment.clone();
                let digit = key_units[last_key.len() + common_len];
                let mut child_position = last_key.clone();
                child_position.extend_from_slice(&frag);
                child_position.push(digit);

                let mut child: Node<M::VectorCommitment, M::TerminalCommitment> = Node::empty();
                child.path_fragment = key_units[last_key.len() + common_len + 1..].to_vec();
                child.key_is_terminal = self.maybe_key_is_terminal(&key_units, &Some(t.clone()));
                child.terminal = Some(t);

                self.store.insert_new(child_position.clone(), child);
                self.parents.insert(child_position.clone(), last_key.clone());
                self.modified.insert(child_position);

                let parent = self.store.must_get_mut(&last_key)?;
                parent.children.insert(digit, self.store.model().new_vector_commitment());
                self.mark_modified(&search.visited);
            }
            TraversalState::Split { common_len: s } => {
                let last_key = search.visited.last().expect("non-empty search").clone();
                let node = self.store.must_get(&last_key)?;
                let frag = node.path_fragment.clone();
                let split_digit = frag[s];

                let mut absorbed_position = last_key.clone();
                absorbed_position.extend_from_slice(&frag[..s]);
                absorbed_position.push(split_digit);

                let absorbed = Node {
                    path_fragment: frag[s + 1..].to_vec(),
                    children: node.children.clone(),
                    terminal: node.terminal.clone(),
                    key_is_terminal: node.key_is_terminal,
                };
                self.store.insert_new(absorbed_position.clone(), absorbed);
                self.parents.insert(absorbed_position.clone(), last_key.clone());
                self.modified.insert(absorbed_position);

                let tail_len = key_units.len() - last_key.len();
                if s < tail_len {
                    let new_digit = key_units[last_key.len() + s];
                    let mut new_position = last_key.clone();
                    new_position.extend_from_slice(&frag[..s]);
                    new_position.push(new_digit);

                    let mut new_child: Node<M::VectorCommitment, M::TerminalCommitment> = Node::empty();
                    new_child.path_fragment = key_units[last_key.len() + s + 1..].to_vec();
                    new_child.key_is_terminal = self.maybe_key_is_terminal(&key_units, &Some(t.clone()));
                    new_child.terminal = Some(t);

                    self.store.insert_new(new_position.clone(), new_child);
                    self.parents.insert(new_position.clone(), last_key.clone());
                    self.modified.insert(new_position);

                    let replaced = self.store.must_get_mut(&last_key)?;
                    replaced.path_fragment = frag[..s].to_vec();
                    replaced.children = BTreeMap::new();
                    replaced.children.insert(split_digit, self.store.model().new_vector_commitment());
                    replaced.children.insert(new_digit, self.store.model().new_vector_commitment());
                    replaced.terminal = None;
                    replaced.key_is_terminal = false;
                } else {
                    let replaced = self.store.must_get_mut(&last_key)?;
                    replaced.path_fragment = frag[..s].to_vec();
                    replaced.children = BTreeMap::new();
                    replaced.children.insert(split_digit, self.store.model().new_vector_commitment());
                    replaced.terminal = Some(t.clone());
                    replaced.key_is_terminal = self.opt_key_commit
                        && replaced.terminal == self.store.model().commit_to_key(&key_units);
                }
                self.mark_modified(&search.visited);
            }
        }
        Ok(())
    }

    /// Removes `key`, if present, and reorganizes the affected branch
    /// (§4.6.3).
    pub fn delete(&mut self, key: &[u8]) -> Result<(), R::Error> {
        let key_units = crate::codec::unpack(key, self.arity);
        let search = proof_path(&mut self.store, self.arity, &key_units)?;
        self.register_ancestry(&search.visited);
        if !matches!(search.state, TraversalState::Terminal) {
            return Ok(());
        }
        let last_key = search.visited.last().expect("terminal search is non-empty").clone();
        {
            let node = self.store.must_get_mut(&last_key)?;
            node.terminal = None;
            node.key_is_terminal = false;
        }
        self.mark_modified(&search.visited);
        self.reorg_check(last_key)?;
        Ok(())
    }

    /// Drops, merges, or leaves alone the node at `key` depending on its
    /// surviving child/terminal state (§4.6.3).
    fn reorg_check(&mut self, key: Vec<PathUnit>) -> Result<(), R::Error> {
        let node = self.store.must_get(&key)?;
        let is_root = key.is_empty();

        if node.terminal.is_none() && node.children.is_empty() {
            self.store.remove(&key);
            self.modified.remove(&key);
            if is_root {
                return Ok(());
            }
            if let Some(parent_key) = self.parents.remove(&key) {
                let digit = *key.last().expect("non-root key is non-empty");
                let parent = self.store.must_get_mut(&parent_key)?;
                parent.children.remove(&digit);
                self.modified.insert(parent_key.clone());
                self.reorg_check(parent_key)?;
            }
            return Ok(());
        }

        if node.terminal.is_none() && node.children.len() == 1 {
            let digit = *node.children.keys().next().expect("len == 1");
            let mut child_key = key.clone();
            child_key.extend_from_slice(&node.path_fragment);
            child_key.push(digit);
            let child = self.store.must_get(&child_key)?;

            let mut merged_fragment = node.path_fragment.clone();
            merged_fragment.push(digit);
            merged_fragment.extend_from_slice(&child.path_fragment);

            for &gc_digit in child.children.keys() {
                let mut gc_key = key.clone();
                gc_key.extend_from_slice(&merged_fragment);
                gc_key.push(gc_digit);
                self.parents.insert(gc_key, key.clone());
            }

            let child_children = child.children.clone();
            let child_terminal = child.terminal.clone();
            let child_key_is_terminal = child.key_is_terminal;

            self.store.remove(&child_key);
            self.parents.remove(&child_key);

            let node_mut = self.store.must_get_mut(&key)?;
            node_mut.path_fragment = merged_fragment;
            node_mut.children = child_children;
            node_mut.terminal = child_terminal;
            node_mut.key_is_terminal = child_key_is_terminal;

            self.modified.insert(key);
        }

        Ok(())
    }

    /// Recomputes commitments bottom-up for every node marked modified since
    /// the last call. Children are always processed before their parents
    /// (deeper keys sort first), and each node's freshly computed commitment
    /// is folded into its parent's pending `child_updates` batch, applied
    /// through [`CommitmentModel::update_node_commitment`] (§4.6.4).
    pub fn commit(&mut self) -> Option<M::VectorCommitment> {
        let mut keys: Vec<Vec<PathUnit>> = self.modified.iter().cloned().collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()));

        let mut pending: BTreeMap<Vec<PathUnit>, BTreeMap<PathUnit, Option<M::VectorCommitment>>> = BTreeMap::new();
        let mut recomputed = 0usize;

        for key in &keys {
            let Some(mut node) = self.store.peek_cached(key).cloned() else { continue };
            let child_updates = pending.remove(key).unwrap_or_default();

            let vc = if child_updates.is_empty() {
                self.store.model().calc_node_commitment(&node)
            } else {
                let terminal = node.terminal.clone();
                let vc = self.store.model().update_node_commitment(&mut node, &child_updates, terminal, false, None);
                if let Some(cached) = self.store.peek_cached_mut(key) {
                    *cached = node;
                }
                vc
            };
            log::trace!("recomputed commitment for node {key:?}: {vc:?}");
            recomputed += 1;

            if let Some(parent_key) = self.parents.get(key).cloned() {
                let digit = *key.last().expect("non-root keys are non-empty");
                pending.entry(parent_key).or_default().insert(digit, vc);
            }
        }
        self.modified.clear();

        let root_commitment =
            self.store.peek_cached(&Vec::new()).and_then(|root| self.store.model().calc_node_commitment(root));
        log::debug!(
            "commit recomputed {} node(s), root = {}",
            recomputed,
            root_commitment.as_ref().map_or("<empty>".to_string(), |vc| format!("{vc:?}"))
        );
        root_commitment
    }

    /// Reads back the node stored at `unpacked_key`, if any (§6.1).
    pub fn get_node(
        &mut self,
        unpacked_key: &[PathUnit],
    ) -> Result<Option<Node<M::VectorCommitment, M::TerminalCommitment>>, R::Error> {
        Ok(self.store.get(unpacked_key)?.cloned())
    }

    /// The root's commitment as of the last `commit()`, or `None` for an
    /// empty trie.
    pub fn root_commitment(&self) -> Option<M::VectorCommitment> {
        self.store.peek_cached(&Vec::new()).and_then(|root| self.store.model().calc_node_commitment(root))
    }

    /// Writes every dirty node and tombstone through `writer` (§4.5).
    pub fn persist_mutations<W: KVWriter>(&self, writer: &mut W) -> Result<usize, W::Error> {
        self.store.persist_mutations(writer)
    }

    /// Discards the cache, tombstones, and parent-link bookkeeping.
    pub fn clear_cache(&mut self) {
        self.store.clear_cache();
        self.parents.clear();
        self.modified.clear();
    }

    /// Applies `update` to every pair in `entries`, in order (§6.1).
    pub fn update_all<I>(&mut self, entries: I) -> Result<(), R::Error>
    where I: IntoIterator<Item = (Vec<u8>, Vec<u8>)> {
        for (k, v) in entries {
            self.update(&k, &v)?;
        }
        Ok(())
    }

    /// Returns every key in `entries` whose stored terminal does not match
    /// the given value, including keys entirely absent from the trie
    /// (§4.6.5).
    pub fn reconcile<I>(&mut self, entries: I) -> Result<Vec<Vec<u8>>, R::Error>
    where I: IntoIterator<Item = (Vec<u8>, Vec<u8>)> {
        let mut mismatched = Vec::new();
        for (k, v) in entries {
            let key_units = crate::codec::unpack(&k, self.arity);
            let search = proof_path(&mut self.store, self.arity, &key_units)?;
            let ok = match search.state {
                TraversalState::Terminal => {
                    let last_key = search.visited.last().expect("terminal search is non-empty");
                    let node = self.store.must_get(last_key)?;
                    let expected = self.store.model().commit_to_data(&v);
                    node.terminal == expected
                }
                _ => false,
            };
            if !ok {
                mismatched.push(k);
            }
        }
        Ok(mismatched)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap as StdBTreeMap;

    use super::*;
    use crate::commitment::{Blake2b256, HashCommitmentModel};

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
    fn insert_lookup_roundtrip() {
        let mut trie = new_trie(Arity::Byte);
        trie.update(b"a", b"k").unwrap();
        trie.update(b"ab", b"l").unwrap();
        trie.commit();

        let mismatched = trie.reconcile(vec![(b"a".to_vec(), b"k".to_vec()), (b"ab".to_vec(), b"l".to_vec())]).unwrap();
        assert!(mismatched.is_empty());
    }

    #[test]
    fn scenario_s1_insertion_order_independence() {
        let mut a = new_trie(Arity::Binary);
        a.update(b"a", b"k").unwrap();
        a.update(b"ab", b"l").unwrap();
        let root_a = a.commit();

        let mut b = new_trie(Arity::Binary);
        b.update(b"ab", b"l").unwrap();
        b.update(b"a", b"k").unwrap();
        let root_b = b.commit();

        assert_eq!(root_a, root_b);
        assert!(root_a.is_some());
    }

    #[test]
    fn scenario_s4_delete_restores_prior_root() {
        let mut a = new_trie(Arity::Byte);
        a.update(b"abcd", b"1").unwrap();
        a.update(b"ab1234", b"2").unwrap();
        a.commit();
        a.delete(b"ab1234").unwrap();
        let root_after_delete = a.commit();

        let mut b = new_trie(Arity::Byte);
        b.update(b"abcd", b"1").unwrap();
        let root_single = b.commit();

        assert_eq!(root_after_delete, root_single);
    }

    #[test]
    fn deleting_everything_empties_the_root() {
        let mut trie = new_trie(Arity::Byte);
        trie.update(b"x", b"1").unwrap();
        trie.update(b"y", b"2").unwrap();
        trie.commit();
        trie.delete(b"x").unwrap();
        trie.delete(b"y").unwrap();
        let root = trie.commit();
        assert!(root.is_none());
    }

    #[test]
    fn reconcile_reports_stale_and_missing_keys() {
        let mut trie = new_trie(Arity::Nibble);
        trie.update(b"present", b"value").unwrap();
        trie.commit();

        let mismatched = trie
            .reconcile(vec![
                (b"present".to_vec(), b"wrong".to_vec()),
                (b"missing".to_vec(), b"whatever".to_vec()),
                (b"present".to_vec(), b"value".to_vec()),
            ])
            .unwrap();
        assert_eq!(mismatched, vec![b"present".to_vec(), b"missing".to_vec()]);
    }
}
