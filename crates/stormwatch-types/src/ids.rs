//! Strike identifier.
//!
//! Strike records carry a strongly-typed ID so they cannot be mixed with
//! other UUIDs at compile time. IDs use UUID v7 (time-ordered), which
//! keeps freshly assigned identifiers unique across the lifetime of the
//! process.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Unique identifier for a lightning strike record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(transparent)]
pub struct StrikeId(pub Uuid);

impl StrikeId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The smallest possible identifier, used as a range bound when
    /// splitting the store at a timestamp.
    pub const fn min() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for StrikeId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for StrikeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
