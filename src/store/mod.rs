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

//! Backing-store interfaces and the node stores layered on top of them
//! (§4.4, §4.5, §6.2).
//!
//! The concrete key/value engine, its iteration support and any bulk
//! import/export format are external collaborators out of scope for this
//! crate (§1); only the thin read/write interface it must satisfy lives
//! here.

pub mod buffered;
pub mod node_store;

pub use buffered::BufferedNodeStore;
pub use node_store::NodeStore;

/// Read side of the backing key/value store (§6.2).
///
/// The error type is an associated type rather than a boxed `dyn Error` so
/// that callers with their own error hierarchy can compose it with `#[from]`
/// instead of paying for type erasure (§7).
pub trait KVReader {
    type Error;

    /// Looks up `key`, returning `None` if absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::Error>;
}

/// Write side of the backing key/value store (§6.2).
pub trait KVWriter {
    type Error;

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), Self::Error>;
    fn delete(&mut self, key: &[u8]) -> Result<(), Self::Error>;
}
