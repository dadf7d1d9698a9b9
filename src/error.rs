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

//! Error types for the key codec, node (de)serialization and proof
//! verification. Failures to maintain a library-internal invariant (a
//! missing cached node the engine itself just wrote, double-insertion into
//! the buffered store, serializing a non-committing node) are programmer
//! errors and are reported via `panic!`/`debug_assert!` rather than a
//! `Result` variant; see §7 of the specification this crate implements.

/// Error produced while packing, unpacking, encoding or decoding path units
/// and storage keys (§4.1).
#[derive(Copy, Clone, Eq, PartialEq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum CodecError {
    /// path unit {0} is out of range for arity {1}.
    InvalidPathUnit(u8, u16),

    /// storage key prefix byte {0:#04x} does not encode a recognized arity
    /// family.
    MalformedEncoding(u8),

    /// storage key padding bits are non-zero, indicating corrupted or
    /// foreign-written data.
    NonZeroPadding,

    /// storage key is truncated: expected at least {0} more byte(s).
    UnexpectedEnd(usize),

    /// {0} path units cannot be packed into whole bytes: not a multiple of
    /// {1} units per byte.
    MisalignedUnits(usize, usize),
}

/// Error produced while parsing a serialized node blob (§4.2).
#[derive(Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum NodeCodecError {
    /// node blob is empty.
    Empty,

    /// node blob is truncated: expected at least {0} more byte(s).
    UnexpectedEnd(usize),

    #[display(inner)]
    #[from]
    Codec(CodecError),

    /// terminal commitment tag byte {0:#04x} is invalid for a digest width of
    /// {1} bytes.
    InvalidTerminalTag(u8, usize),

    /// vector commitment slot is truncated.
    TruncatedVectorCommitment,
}

/// Structural errors detected while validating the shape of a proof, as
/// distinct from a commitment mismatch (§7: `MalformedProof` vs.
/// `InvalidProof`).
#[derive(Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum MalformedProof {
    /// proof contains no elements.
    Empty,

    /// proof element {0} has a path fragment which is not a prefix of the
    /// remaining key.
    FragmentMismatch(usize),

    /// proof element {0} carries an out-of-range child index {1} for arity
    /// {2}.
    ChildIndexOutOfRange(usize, u16, u16),

    /// proof element {0} includes a commitment at its own branching slot
    /// {1}, which must be supplied by the verifier instead.
    UnexpectedChildSlot(usize, u16),

    #[display(inner)]
    #[from]
    NodeCodec(NodeCodecError),
}

/// Outcome of proof verification (§4.7, §7).
#[derive(Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum VerifyError {
    /// the proof does not structurally match its claimed key and arity.
    #[display(inner)]
    #[from]
    Malformed(MalformedProof),

    /// the commitment recomputed from the proof does not match the claimed
    /// root.
    InvalidProof,

    /// the proof is a presence proof but the supplied candidate value does
    /// not match the committed terminal.
    ValueMismatch,
}
