//! Lightning strike records.
//!
//! A [`StrikeRecord`] is what the event store holds and what
//! `GET /api/lightning` returns. A [`NewStrike`] is the same record
//! before an identifier has been assigned -- the body accepted by
//! `POST /api/lightning` and produced by the simulated feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geo::Coordinates;
use crate::ids::StrikeId;

/// Strike intensity on a 1-10 scale.
///
/// Values outside the scale cannot be constructed; deserialization of an
/// out-of-range number fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Intensity(u8);

impl Intensity {
    /// Weakest representable strike.
    pub const MIN: Self = Self(1);
    /// Strongest representable strike.
    pub const MAX: Self = Self(10);

    /// Build an intensity, returning `None` if `value` is outside 1-10.
    pub fn new(value: i64) -> Option<Self> {
        u8::try_from(value)
            .ok()
            .filter(|v| (Self::MIN.0..=Self::MAX.0).contains(v))
            .map(Self)
    }

    /// The raw 1-10 value.
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Intensity {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("intensity {value} outside 1-10"))
    }
}

impl From<Intensity> for u8 {
    fn from(intensity: Intensity) -> Self {
        intensity.0
    }
}

impl core::fmt::Display for Intensity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored lightning strike.
///
/// Records are immutable once stored; the only way a record leaves the
/// store is eviction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StrikeRecord {
    /// Identifier assigned by the store at insertion.
    pub id: StrikeId,
    /// Where the strike landed.
    pub coordinates: Coordinates,
    /// Best-effort place label from reverse geocoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub location: Option<String>,
    /// Strike intensity (1-10).
    #[ts(type = "number")]
    pub intensity: Intensity,
    /// When the strike was recorded.
    pub timestamp: DateTime<Utc>,
}

impl StrikeRecord {
    /// Attach an identifier to a submission.
    ///
    /// The caller is responsible for having validated `strike.intensity`
    /// into `intensity`.
    pub fn from_new(id: StrikeId, strike: NewStrike, intensity: Intensity) -> Self {
        Self {
            id,
            coordinates: strike.coordinates,
            location: strike.location,
            intensity,
            timestamp: strike.timestamp,
        }
    }
}

/// A strike submission: a [`StrikeRecord`] without its identifier.
///
/// `intensity` is kept as a plain integer so out-of-range values reach
/// validation (and a 400 response) rather than failing to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct NewStrike {
    /// Where the strike landed.
    pub coordinates: Coordinates,
    /// Optional place label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub location: Option<String>,
    /// Requested intensity; must be within 1-10.
    #[ts(type = "number")]
    pub intensity: i64,
    /// When the strike was recorded.
    pub timestamp: DateTime<Utc>,
}
