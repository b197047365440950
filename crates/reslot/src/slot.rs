use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::ReslotError;

/// Highest slot number shipped with the base game.
pub const MAX_VANILLA_SLOT: u32 = 7;

/// Offset between a slot number and its label index in the UI resources.
pub const LABEL_INDEX_OFFSET: u32 = 8;

/// A costume slot such as `c00` or `c123`.
///
/// Always lower case with at least two digits. Ordering follows the numeric
/// value, so `c9` style tokens never exist and `c08 < c10 < c100`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotToken(String);

impl SlotToken {
    pub fn from_number(number: u32) -> Self {
        Self(format!("c{:02}", number))
    }

    /// The numeric part of the token.
    pub fn number(&self) -> u32 {
        self.0[1..].parse().unwrap_or(0)
    }

    /// Digits substituted into a normalized path template.
    pub fn digits(&self) -> &str {
        &self.0[1..]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_vanilla(&self) -> bool {
        self.number() <= MAX_VANILLA_SLOT
    }

    /// `slot + 8`, the index used by `ui_chara_db` and `msg_name` labels.
    pub fn label_index(&self) -> u32 {
        self.number() + LABEL_INDEX_OFFSET
    }
}

impl FromStr for SlotToken {
    type Err = ReslotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let digits = lower
            .strip_prefix('c')
            .ok_or_else(|| ReslotError::InvalidSlot(s.to_string()))?;

        if digits.is_empty() || digits.len() > 3 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ReslotError::InvalidSlot(s.to_string()));
        }

        if digits.len() == 1 {
            return Ok(Self(format!("c0{}", digits)));
        }

        Ok(Self(lower))
    }
}

impl fmt::Display for SlotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Ord for SlotToken {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number()
            .cmp(&other.number())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for SlotToken {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for SlotToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SlotToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
