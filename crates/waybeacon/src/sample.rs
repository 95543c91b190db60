//! Core sample types for waybeacon.
//!
//! This module defines the location sample — one GPS fix plus metadata —
//! that flows from a fix source through the buffer to the collector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single GPS fix correlated to an (optional) active trip.
///
/// Samples are validated at construction and immutable afterwards: latitude
/// must lie in `[-90, 90]`, longitude in `[-180, 180]`, and accuracy must be
/// a non-negative number of meters. All three must be finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    /// Identifier of the active trip, if a job was in progress at capture.
    trip_id: Option<String>,

    /// WGS84 latitude in degrees.
    latitude: f64,

    /// WGS84 longitude in degrees.
    longitude: f64,

    /// Device-reported radius of uncertainty in meters.
    accuracy: f64,

    /// When the fix was acquired (not when it was enqueued).
    captured_at: DateTime<Utc>,
}

impl LocationSample {
    /// Create a new sample, checking the data-model invariants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSample`] if any coordinate is out of range,
    /// the accuracy is negative, or any value is NaN/infinite.
    pub fn new(
        trip_id: Option<String>,
        latitude: f64,
        longitude: f64,
        accuracy: f64,
        captured_at: DateTime<Utc>,
    ) -> Result<Self> {
        validate_fix(latitude, longitude, accuracy)?;
        Ok(Self {
            trip_id,
            latitude,
            longitude,
            accuracy,
            captured_at,
        })
    }

    /// Build a sample from a raw device fix, stamping the active trip id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSample`] if the fix violates the data-model
    /// invariants.
    pub fn from_fix(fix: crate::source::RawFix, trip_id: Option<String>) -> Result<Self> {
        Self::new(trip_id, fix.latitude, fix.longitude, fix.accuracy, fix.captured_at)
    }

    /// The active trip id, if any.
    #[must_use]
    pub fn trip_id(&self) -> Option<&str> {
        self.trip_id.as_deref()
    }

    /// WGS84 latitude in degrees.
    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// WGS84 longitude in degrees.
    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Device-reported radius of uncertainty in meters.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// Acquisition time of the fix.
    #[must_use]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Re-check the data-model invariants.
    ///
    /// Construction already enforces them; this exists for samples that
    /// arrived through deserialization (e.g. reloaded from the store).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSample`] if any invariant is violated.
    pub fn validate(&self) -> Result<()> {
        validate_fix(self.latitude, self.longitude, self.accuracy)
    }

    /// BLAKE3 fingerprint over the sample's canonical fields.
    ///
    /// Two samples fingerprint equal iff every field is bit-identical; used
    /// to drop exact consecutive duplicates and to match delivered entries
    /// against the live buffer.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.trip_id.as_deref().unwrap_or("").as_bytes());
        hasher.update(&self.latitude.to_bits().to_le_bytes());
        hasher.update(&self.longitude.to_bits().to_le_bytes());
        hasher.update(&self.accuracy.to_bits().to_le_bytes());
        hasher.update(&self.captured_at.timestamp_millis().to_le_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

fn validate_fix(latitude: f64, longitude: f64, accuracy: f64) -> Result<()> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(Error::invalid_sample(format!(
            "latitude {latitude} outside [-90, 90]"
        )));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(Error::invalid_sample(format!(
            "longitude {longitude} outside [-180, 180]"
        )));
    }
    if !accuracy.is_finite() || accuracy < 0.0 {
        return Err(Error::invalid_sample(format!(
            "accuracy {accuracy} must be a non-negative number of meters"
        )));
    }
    Ok(())
}
