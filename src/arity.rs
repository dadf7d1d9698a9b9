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

//! Path arity: the branching factor of the trie (§3, §4.1).

use std::fmt;

/// A single digit on a trie path. Values are always `< Arity::width()`.
pub type PathUnit = u8;

/// Branching factor of an extended radix trie.
///
/// A path unit occupies `log2(arity)` bits: a bit for [`Arity::Binary`], a
/// nibble for [`Arity::Nibble`], a whole byte for [`Arity::Byte`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Arity {
    /// Arity 2: each path unit is a single bit.
    Binary,
    /// Arity 16: each path unit is a nibble.
    Nibble,
    /// Arity 256: each path unit is a byte.
    Byte,
}

impl Arity {
    /// Number of distinct path units, i.e. the branching factor itself.
    pub const fn width(self) -> u16 {
        match self {
            Arity::Binary => 2,
            Arity::Nibble => 16,
            Arity::Byte => 256,
        }
    }

    /// Number of path units packed into a single byte of user-key input.
    pub const fn units_per_byte(self) -> usize {
        match self {
            Arity::Binary => 8,
            Arity::Nibble => 2,
            Arity::Byte => 1,
        }
    }

    /// Size in bytes of the child-presence bitmap in a serialized node
    /// (§4.2): `ceil(width / 8)`.
    pub const fn bitmap_bytes(self) -> usize {
        match self {
            Arity::Binary => 1,
            Arity::Nibble => 2,
            Arity::Byte => 32,
        }
    }

    /// Two-bit family tag embedded in the high bits of a storage-key prefix
    /// byte (§4.1, §9: "a single prefix byte ... whose low bits record the
    /// trailing-partial-unit count").
    pub(crate) const fn family_tag(self) -> u8 {
        match self {
            Arity::Binary => 0,
            Arity::Nibble => 1,
            Arity::Byte => 2,
        }
    }

    pub(crate) const fn from_family_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Arity::Binary),
            1 => Some(Arity::Nibble),
            2 => Some(Arity::Byte),
            _ => None,
        }
    }

    /// Whether `unit` is a valid path unit for this arity.
    pub const fn contains(self, unit: PathUnit) -> bool { (unit as u16) < self.width() }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.width()) }
}
