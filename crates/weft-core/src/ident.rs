// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier types for chores, hosts, tasks, reactive sources and code units.
use std::fmt;
use std::rc::Rc;

use blake3::Hasher;

/// Canonical 256-bit digest used to name code units.
pub type Hash = [u8; 32];

/// Arena handle for a chore held by the scheduler.
///
/// The generation guards against a stale handle observing a recycled slot:
/// once a chore settles its slot may be reused, and lookups with the old
/// generation return `None`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ChoreId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ChoreId {
    /// Slot index inside the arena.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation stamp of the slot at insertion time.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ChoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chore#{}.{}", self.index, self.generation)
    }
}

/// Identifier of a host: the subtree anchor a chore is attached to.
///
/// Host ids are allocated by a [`crate::HostTree`] implementation and are
/// only meaningful relative to the tree that issued them.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct HostId(pub u32);

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "host#{}", self.0)
    }
}

/// Identifier of a declared task (plain, resource or visible).
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TaskId(pub u32);

/// Identifier of a reactive value (signal).
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SignalId(pub u32);

/// Identifier of a reactive store.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct StoreId(pub u32);

/// Identity of a unit of executable code.
///
/// Two [`CodeRef`]s carrying the same `SymbolId` refer to the same code unit,
/// even when they were created independently.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SymbolId(pub Hash);

impl SymbolId {
    /// Returns the canonical byte representation of this id.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }
}

/// Produces a stable, domain-separated symbol identifier (prefix `b"symbol:"`) using BLAKE3.
pub fn make_symbol_id(label: &str) -> SymbolId {
    let mut hasher = Hasher::new();
    hasher.update(b"symbol:");
    hasher.update(label.as_bytes());
    SymbolId(hasher.finalize().into())
}

/// Lazily-resolved reference to a unit of executable code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeRef {
    /// Identity of the underlying code unit.
    pub symbol: SymbolId,
    /// Human-readable symbol name, used for sequence indices and diagnostics.
    pub name: Rc<str>,
}

impl CodeRef {
    /// Builds a code reference whose symbol is derived from `name`.
    pub fn new(name: &str) -> Self {
        Self {
            symbol: make_symbol_id(name),
            name: Rc::from(name),
        }
    }

    /// True when both references point at the same code unit.
    #[must_use]
    pub fn same_unit(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

/// Declaration index of a chore within its owner.
///
/// Numeric positions order declarations; named indices (attribute names,
/// code symbols) sort as `-1`, ahead of every declared position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SeqIndex {
    /// Position in the owner's declared sequence.
    Position(u32),
    /// Non-numeric index.
    Name(Rc<str>),
}

impl SeqIndex {
    /// Numeric value used by the comparator.
    #[must_use]
    pub fn ordinal(&self) -> i64 {
        match self {
            Self::Position(i) => i64::from(*i),
            Self::Name(_) => -1,
        }
    }

    /// Declared position, when numeric.
    #[must_use]
    pub fn position(&self) -> Option<u32> {
        match self {
            Self::Position(i) => Some(*i),
            Self::Name(_) => None,
        }
    }
}
