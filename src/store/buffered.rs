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

//! Buffered (write-through cache) node store (§4.5): layers a dirty-tracked
//! cache and a tombstone set over the read-only [`NodeStore`].

use std::collections::{BTreeMap, BTreeSet};

use crate::arity::{Arity, PathUnit};
use crate::commitment::CommitmentModel;
use crate::node::{self, Node};
use crate::store::{KVReader, KVWriter, NodeStore};

pub struct BufferedNodeStore<'r, R, M: CommitmentModel> {
    inner: NodeStore<'r, R, M>,
    cache: BTreeMap<Vec<PathUnit>, Node<M::VectorCommitment, M::TerminalCommitment>>,
    deleted: BTreeSet<Vec<PathUnit>>,
}

// Written by hand for the same reason as `NodeStore`'s impl: avoids an
// unwanted `R: Clone` bound that `#[derive(Clone)]` would add.
impl<'r, R, M: CommitmentModel + Clone> Clone for BufferedNodeStore<'r, R, M> {
    fn clone(&self) -> Self {
        BufferedNodeStore { inner: self.inner.clone(), cache: self.cache.clone(), deleted: self.deleted.clone() }
    }
}

impl<'r, R, M> BufferedNodeStore<'r, R, M>
where
    R: KVReader,
    M: CommitmentModel,
{
    pub fn new(reader: &'r R, model: M) -> Self {
        BufferedNodeStore { inner: NodeStore::new(reader, model), cache: BTreeMap::new(), deleted: BTreeSet::new() }
    }

    pub fn model(&self) -> &M { self.inner.model() }

    pub fn arity(&self) -> Arity { self.inner.arity() }

    /// Reads `key`, first consulting the tombstone set, then the cache, then
    /// falling through to the read-only store (§4.5).
    pub fn get(
        &mut self,
        key: &[PathUnit],
    ) -> Result<Option<&Node<M::VectorCommitment, M::TerminalCommitment>>, R::Error> {
        if self.deleted.contains(key) {
            return Ok(None);
        }
        if !self.cache.contains_key(key) {
            log::trace!("node cache miss for key {key:?}, reading backing store");
            match self.inner.get_node(key)? {
                Some(node) => {
                    self.cache.insert(key.to_vec(), node);
                }
                None => return Ok(None),
            }
        }
        Ok(self.cache.get(key))
    }

    /// Like [`Self::get`], but panics if the node is not present — use only
    /// where the engine's own invariants guarantee it must be (§7).
    pub fn must_get(&mut self, key: &[PathUnit]) -> Result<Node<M::VectorCommitment, M::TerminalCommitment>, R::Error> {
        Ok(self
            .get(key)?
            .unwrap_or_else(|| panic!("node expected at key {key:?} is missing from the store"))
            .clone())
    }

    /// Mutable variant of [`Self::must_get`] returning a handle into the
    /// cache.
    pub fn must_get_mut(
        &mut self,
        key: &[PathUnit],
    ) -> Result<&mut Node<M::VectorCommitment, M::TerminalCommitment>, R::Error> {
        self.get(key)?;
        Ok(self
            .cache
            .get_mut(key)
            .unwrap_or_else(|| panic!("node expected at key {key:?} is missing from the store")))
    }

    /// Cache-only lookup, used by `commit()` once every touched node is
    /// already guaranteed cached.
    pub fn peek_cached(&self, key: &[PathUnit]) -> Option<&Node<M::VectorCommitment, M::TerminalCommitment>> {
        self.cache.get(key)
    }

    pub fn peek_cached_mut(
        &mut self,
        key: &[PathUnit],
    ) -> Option<&mut Node<M::VectorCommitment, M::TerminalCommitment>> {
        self.cache.get_mut(key)
    }

    /// Inserts a brand-new node. Panics if `key` is already cached (§4.5).
    pub fn insert_new(&mut self, key: Vec<PathUnit>, node: Node<M::VectorCommitment, M::TerminalCommitment>) {
        self.deleted.remove(&key);
        assert!(!self.cache.contains_key(&key), "insert_new on a key already present in the cache: {key:?}");
        self.cache.insert(key, node);
    }

    /// Overwrites an existing cached node. Panics if `key` is not cached
    /// (§4.5).
    pub fn replace(&mut self, key: &[PathUnit], node: Node<M::VectorCommitment, M::TerminalCommitment>) {
        assert!(self.cache.contains_key(key), "replace on a key absent from the cache: {key:?}");
        self.cache.insert(key.to_vec(), node);
    }

    /// Drops `key` from the cache and marks it for deletion on the next
    /// [`Self::persist_mutations`].
    pub fn remove(&mut self, key: &[PathUnit]) {
        self.cache.remove(key);
        self.deleted.insert(key.to_vec());
    }

    /// Clears a pending tombstone without touching the cache.
    pub fn un_delete(&mut self, key: &[PathUnit]) { self.deleted.remove(key); }

    /// Writes every cached node and every tombstone to `writer`. Does not
    /// clear the cache. Returns the total number of entries written.
    pub fn persist_mutations<W: KVWriter>(&self, writer: &mut W) -> Result<usize, W::Error> {
        let arity = self.arity();
        let model = self.model();
        let mut upserts = 0usize;
        for (key, n) in &self.cache {
            let encoded = crate::codec::encode(key, arity);
            let blob = node::serialize(model, arity, n);
            writer.put(&encoded, &blob)?;
            upserts += 1;
        }
        let mut tombstones = 0usize;
        for key in &self.deleted {
            let encoded = crate::codec::encode(key, arity);
            writer.delete(&encoded)?;
            tombstones += 1;
        }
        log::debug!("persisted {upserts} upsert(s) and {tombstones} tombstone(s)");
        Ok(upserts + tombstones)
    }

    /// Discards both the cache and the tombstone set.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.deleted.clear();
    }
}
