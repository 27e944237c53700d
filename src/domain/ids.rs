//! Numeric identifiers assigned by the catalog.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Book identifier (assigned as `max + 1`, seeded at 100)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(pub u32);

/// Member identifier (assigned as `max + 1`, seeded at 200)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub u32);

impl BookId {
    /// Seed used when the catalog holds no books; the first book gets `SEED + 1`.
    pub const SEED: BookId = BookId(100);

    /// The identifier following this one, or `None` at the top of the range
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl MemberId {
    /// Seed used when the catalog holds no members.
    pub const SEED: MemberId = MemberId(200);

    /// The identifier following this one, or `None` at the top of the range
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BookId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl FromStr for MemberId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl From<u32> for BookId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<u32> for MemberId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}
