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

// Coding conventions
#![deny(
    unsafe_code,
    dead_code,
    unused_variables,
    unused_mut,
    unused_imports,
    non_upper_case_globals,
    non_camel_case_types,
    non_snake_case
)]
#![warn(missing_docs)]

//! An authenticated extended radix trie: a key/value map whose root
//! commitment authenticates every entry, with a pluggable commitment
//! scheme (vector commitments per node, terminal commitments per value) and
//! configurable path arity (binary, nibble or byte digits).
//!
//! The engine ([`trie::Trie`]) is generic over both the arity and the
//! [`commitment::CommitmentModel`] in use; [`commitment::HashCommitmentModel`]
//! is the reference scheme, built on domain-separated blake2b digests.
//! Storage is delegated to a caller-supplied [`store::KVReader`] /
//! [`store::KVWriter`] pair, kept deliberately thin (§6.2).

#[macro_use]
extern crate amplify;

mod arity;
mod codec;
mod error;
mod node;

pub mod commitment;
pub mod proof;
pub mod store;
pub mod trie;

pub use arity::{Arity, PathUnit};
pub use commitment::{Blake2b160, Blake2b256, CommitmentModel, HashCommitmentModel};
pub use error::{CodecError, MalformedProof, NodeCodecError, VerifyError};
pub use node::Node;
pub use proof::{proof, Proof, ProofElement, TerminalSlot};
pub use store::{BufferedNodeStore, KVReader, KVWriter, NodeStore};
pub use trie::Trie;
