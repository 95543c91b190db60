//! `waybeacon` - Offline-buffered GPS telemetry uplink for field devices
//!
//! This library buffers location samples in a bounded durable store and
//! opportunistically delivers them to a remote collector, tolerating
//! transient network and auth failures without losing data beyond the
//! buffer bound.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod buffer;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod sample;
pub mod service;
pub mod source;
pub mod store;
pub mod transport;
pub mod uplink;

pub use buffer::SampleBuffer;
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use sample::LocationSample;
pub use service::{ServiceHandle, UplinkService};
pub use source::{FixSource, RawFix};
pub use store::{KvStore, MemoryStore, SqliteStore};
pub use transport::{DeliveryError, HttpTransport, Transport};
pub use uplink::{FlushOutcome, SubscriptionId, TelemetryUplinkClient};
