use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Numbers per column pool. A template can never place more distinct values
/// from one column than this.
pub const POOL_SIZE: usize = 15;

/// The five bingo columns. Each is bound to a fixed, disjoint 15-number range,
/// so values from different columns can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    B,
    I,
    N,
    G,
    O,
}

/// A ball slot referenced a letter outside B/I/N/G/O. This is a
/// template-authoring defect and is surfaced where the letter is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid bingo column {0:?}, expected one of B, I, N, G, O")]
pub struct InvalidColumn(pub String);

impl Column {
    pub const ALL: [Column; 5] = [Column::B, Column::I, Column::N, Column::G, Column::O];

    /// The fixed value range backing this column:
    /// B: 1-15, I: 16-30, N: 31-45, G: 46-60, O: 61-75.
    pub fn range(self) -> RangeInclusive<u8> {
        match self {
            Column::B => 1..=15,
            Column::I => 16..=30,
            Column::N => 31..=45,
            Column::G => 46..=60,
            Column::O => 61..=75,
        }
    }

    /// The full 15-element pool for this column, in ascending order.
    pub fn pool(self) -> Vec<u8> {
        self.range().collect()
    }

    pub fn letter(self) -> char {
        match self {
            Column::B => 'B',
            Column::I => 'I',
            Column::N => 'N',
            Column::G => 'G',
            Column::O => 'O',
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Column::B => 0,
            Column::I => 1,
            Column::N => 2,
            Column::G => 3,
            Column::O => 4,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for Column {
    type Err = InvalidColumn;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "B" => Ok(Column::B),
            "I" => Ok(Column::I),
            "N" => Ok(Column::N),
            "G" => Ok(Column::G),
            "O" => Ok(Column::O),
            other => Err(InvalidColumn(other.to_string())),
        }
    }
}

impl Serialize for Column {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Column {
    fn deserialize<D>(deserializer: D) -> Result<Column, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Column::from_str(&s).map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}
