//! Validation of strike submissions.
//!
//! Shared by the simulated feed and the `POST /api/lightning` path so
//! both apply identical rules. Out-of-range values are rejected, never
//! clamped.

use stormwatch_types::{Intensity, NewStrike};

use crate::error::StoreError;

/// Check a submission and return its typed intensity.
///
/// # Errors
///
/// Returns [`StoreError::Validation`] if the coordinates are not finite
/// or out of range, or if the intensity is outside 1-10.
pub fn validate(strike: &NewStrike) -> Result<Intensity, StoreError> {
    let coords = strike.coordinates;
    if !coords.lat.is_finite() || !coords.lon.is_finite() {
        return Err(StoreError::Validation {
            reason: format!("coordinates must be finite, got ({}, {})", coords.lat, coords.lon),
        });
    }
    if !coords.is_valid() {
        return Err(StoreError::Validation {
            reason: format!(
                "coordinates out of range: lat {} must be within [-90, 90], lon {} within [-180, 180]",
                coords.lat, coords.lon
            ),
        });
    }

    Intensity::new(strike.intensity).ok_or_else(|| StoreError::Validation {
        reason: format!("intensity {} must be within [1, 10]", strike.intensity),
    })
}
