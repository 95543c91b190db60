//! Fix-source abstraction.
//!
//! A fix source is the external collaborator that produces raw GPS fixes —
//! a platform location API, a serial NMEA feed, a replay file. This crate
//! only consumes its output over a channel; configuring platform-level
//! tracking (permissions, background modes) is the source's own business.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

/// One raw device fix, before trip correlation.
///
/// Carries no validation: a source may emit garbage, and the ingestion path
/// rejects it when converting to a [`crate::sample::LocationSample`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawFix {
    /// WGS84 latitude in degrees.
    pub latitude: f64,

    /// WGS84 longitude in degrees.
    pub longitude: f64,

    /// Device-reported radius of uncertainty in meters.
    pub accuracy: f64,

    /// When the fix was acquired.
    pub captured_at: DateTime<Utc>,
}

/// A trait for device-specific fix sources.
///
/// Implementors provide the actual mechanism for acquiring fixes on a
/// specific platform and push them through the provided channel.
#[async_trait::async_trait]
pub trait FixSource: Send + Sync {
    /// The name of this fix source (for logging/debugging).
    fn name(&self) -> &'static str;

    /// Check if the source is currently producing fixes.
    fn is_running(&self) -> bool;

    /// Start the source and begin sending fixes.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails to start, such as when device
    /// permissions are missing.
    async fn start(&mut self, tx: mpsc::Sender<RawFix>) -> crate::error::Result<()>;

    /// Stop the source.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails to stop cleanly.
    fn stop(&mut self) -> crate::error::Result<()>;
}
