//! Bounded durable sample buffer.
//!
//! The buffer is an insertion-ordered queue of undelivered samples with a
//! fixed capacity: when full, the oldest sample is evicted first
//! (keep-most-recent-N). Every mutation is persisted to the durable store
//! as a JSON array under a fixed key; if the store write fails the buffer
//! keeps working in memory for that call and logs a warning.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::sample::LocationSample;
use crate::store::{keys, KvStore};

/// Default buffer capacity.
pub const DEFAULT_CAPACITY: usize = 100;

/// Bounded insertion-ordered queue of undelivered samples.
///
/// Samples leave the buffer only through confirmed delivery
/// ([`Self::remove_delivered`]), FIFO eviction on overflow, or an explicit
/// administrative [`Self::clear`]. Capacity must be at least 1; a zero
/// capacity is treated as 1.
pub struct SampleBuffer {
    samples: VecDeque<LocationSample>,
    capacity: usize,
    store: Arc<dyn KvStore>,
}

impl std::fmt::Debug for SampleBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleBuffer")
            .field("len", &self.samples.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl SampleBuffer {
    /// Load the buffer from the durable store.
    ///
    /// A missing key yields an empty buffer. An unreadable store or a
    /// corrupt payload also yields an empty buffer, with a warning; startup
    /// must not fail because of a bad buffer record. Samples that no longer
    /// pass validation are dropped on load. If the reloaded contents exceed
    /// `capacity` (e.g. the configured capacity shrank), the oldest entries
    /// are evicted immediately.
    pub fn load(store: Arc<dyn KvStore>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut samples = match store.get(keys::SAMPLE_BUFFER) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<LocationSample>>(&raw) {
                Ok(loaded) => {
                    let total = loaded.len();
                    let valid: VecDeque<LocationSample> = loaded
                        .into_iter()
                        .filter(|s| s.validate().is_ok())
                        .collect();
                    if valid.len() < total {
                        warn!(
                            "Dropped {} invalid samples while reloading buffer",
                            total - valid.len()
                        );
                    }
                    valid
                }
                Err(e) => {
                    warn!("Discarding corrupt buffer record: {e}");
                    VecDeque::new()
                }
            },
            Ok(None) => VecDeque::new(),
            Err(e) => {
                warn!("Could not read buffer from store, starting empty: {e}");
                VecDeque::new()
            }
        };

        while samples.len() > capacity {
            samples.pop_front();
        }

        debug!("Loaded buffer with {} samples", samples.len());
        Self {
            samples,
            capacity,
            store,
        }
    }

    /// Append a sample at the tail, evicting the oldest entry if at
    /// capacity.
    ///
    /// A sample whose fingerprint equals the current tail's is an exact
    /// consecutive duplicate and is dropped; returns `false` in that case,
    /// `true` when the sample was appended.
    pub fn push(&mut self, sample: LocationSample) -> bool {
        if let Some(tail) = self.samples.back() {
            if tail.fingerprint() == sample.fingerprint() {
                debug!("Skipping duplicate sample at buffer tail");
                return false;
            }
        }

        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        self.persist();
        true
    }

    /// Clone the current contents, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LocationSample> {
        self.samples.iter().cloned().collect()
    }

    /// Remove the entries of a delivered snapshot from the head of the
    /// buffer.
    ///
    /// `delivered` is matched front-anchored and in order: a delivered
    /// sample that no longer sits at the head (it was evicted while the
    /// delivery was in flight) is skipped. Samples recorded after the
    /// snapshot was taken are untouched. Returns the number of entries
    /// removed.
    pub fn remove_delivered(&mut self, delivered: &[LocationSample]) -> usize {
        let mut removed = 0;
        for sample in delivered {
            let matches = self
                .samples
                .front()
                .is_some_and(|head| head.fingerprint() == sample.fingerprint());
            if matches {
                self.samples.pop_front();
                removed += 1;
            }
        }
        if removed > 0 {
            self.persist();
        }
        removed
    }

    /// Administratively drop every buffered sample.
    ///
    /// This is the only implicit-delivery-free way the buffer empties
    /// entirely; delivery failures never clear it.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.persist();
    }

    /// Number of buffered samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The buffer's capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Write the current contents to the durable store, best-effort.
    fn persist(&self) {
        let serialized = match serde_json::to_string(&self.samples) {
            Ok(s) => s,
            Err(e) => {
                warn!("Could not serialize buffer, keeping in memory only: {e}");
                return;
            }
        };
        if let Err(e) = self.store.set(keys::SAMPLE_BUFFER, &serialized) {
            warn!("Could not persist buffer, keeping in memory only: {e}");
        }
    }
}
