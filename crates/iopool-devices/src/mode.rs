//! Pool operating mode and its normalization.
//!
//! The API reports the mode as free text that has changed across API
//! generations. Only the four canonical modes are ever published; every
//! other spelling either maps through the alias table or is dropped.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating mode of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolMode {
    Standard,
    Opening,
    Winter,
    Initialization,
}

impl PoolMode {
    pub const ALL: [PoolMode; 4] = [
        PoolMode::Standard,
        PoolMode::Opening,
        PoolMode::Winter,
        PoolMode::Initialization,
    ];

    /// Canonical name, as published in the `pool_mode` capability.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Opening => "OPENING",
            Self::Winter => "WINTER",
            Self::Initialization => "INITIALIZATION",
        }
    }
}

impl fmt::Display for PoolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alternate spellings seen in API responses.
const ALIASES: &[(&str, PoolMode)] = &[
    ("GATEWAY", PoolMode::Standard),
    ("NORMAL", PoolMode::Standard),
    ("STD", PoolMode::Standard),
    ("OPEN", PoolMode::Opening),
    ("START", PoolMode::Initialization),
    ("INIT", PoolMode::Initialization),
    ("WINTERING", PoolMode::Winter),
];

/// Map a raw mode string to a canonical mode.
///
/// Case-insensitive, surrounding whitespace ignored. Returns `None` for
/// anything that is neither a canonical name nor a known alias.
pub fn normalize_mode(raw: &str) -> Option<PoolMode> {
    let upper = raw.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return None;
    }

    if let Some((_, mode)) = ALIASES.iter().find(|(alias, _)| *alias == upper) {
        return Some(*mode);
    }

    PoolMode::ALL.into_iter().find(|mode| mode.as_str() == upper)
}

/// Error returned when parsing an unknown mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown pool mode '{0}' (expects STANDARD|OPENING|WINTER|INITIALIZATION)")]
pub struct UnknownMode(pub String);

impl FromStr for PoolMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize_mode(s).ok_or_else(|| UnknownMode(s.to_string()))
    }
}
