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

//! Read-only node store (§4.4): translates unpacked keys into encoded
//! storage keys, reads blobs from a [`KVReader`], and parses them into
//! [`Node`]s.

use crate::arity::{Arity, PathUnit};
use crate::commitment::CommitmentModel;
use crate::node::{self, Node};
use crate::store::KVReader;

/// Read-only decoder over a [`KVReader`], scoped to one commitment model and
/// arity.
pub struct NodeStore<'r, R, M> {
    reader: &'r R,
    model: M,
    arity: Arity,
}

// Written by hand rather than derived: `#[derive(Clone)]` would also demand
// `R: Clone`, even though `reader` is a shared reference and needs no such
// bound.
impl<'r, R, M: Clone> Clone for NodeStore<'r, R, M> {
    fn clone(&self) -> Self { NodeStore { reader: self.reader, model: self.model.clone(), arity: self.arity } }
}

impl<'r, R, M> NodeStore<'r, R, M>
where
    R: KVReader,
    M: CommitmentModel,
{
    pub fn new(reader: &'r R, model: M) -> Self {
        let arity = model.path_arity();
        NodeStore { reader, model, arity }
    }

    pub fn model(&self) -> &M { &self.model }

    pub fn arity(&self) -> Arity { self.arity }

    /// Reads and decodes the node stored at `full_key`, if any.
    ///
    /// A malformed blob is a programmer-fatal invariant violation (§7): this
    /// store must never hold bytes this library itself didn't write.
    pub fn get_node(
        &self,
        full_key: &[PathUnit],
    ) -> Result<Option<Node<M::VectorCommitment, M::TerminalCommitment>>, R::Error> {
        let encoded = crate::codec::encode(full_key, self.arity);
        let Some(blob) = self.reader.get(&encoded)? else {
            return Ok(None);
        };
        let mut parsed = node::deserialize(&self.model, self.arity, &blob)
            .unwrap_or_else(|err| panic!("corrupted node blob at key {full_key:?}: {err}"));
        if parsed.key_is_terminal {
            let mut full = full_key.to_vec();
            full.extend_from_slice(&parsed.path_fragment);
            parsed.terminal = self.model.commit_to_key(&full);
        }
        Ok(Some(parsed))
    }
}
