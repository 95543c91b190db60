//! Telemetry uplink client.
//!
//! [`TelemetryUplinkClient`] owns the bounded durable buffer, the two-state
//! tracking machine, and the flush path to the collector. It is explicitly
//! constructed with its store and transport — there is no singleton — so the
//! composition root decides what it talks to and tests can substitute fakes.
//!
//! The capture path (`record_sample`) is synchronous and never touches the
//! network; the delivery path (`flush`) suspends only at the network await
//! and never holds the buffer lock across it. A sample recorded while a
//! flush is in flight lands in the buffer and survives regardless of the
//! flush outcome, because flush only removes the entries of its own
//! snapshot.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::buffer::SampleBuffer;
use crate::error::Result;
use crate::sample::LocationSample;
use crate::store::{keys, KvStore};
use crate::transport::{DeliveryError, Transport};

/// Outcome of a flush attempt.
///
/// Flush is best-effort: failures are reported here instead of as errors so
/// that a broken uplink can never abort the capture path.
#[derive(Debug)]
pub enum FlushOutcome {
    /// The whole snapshot was accepted and removed from the buffer.
    Delivered {
        /// Number of samples delivered.
        count: usize,
    },

    /// The buffer was empty; nothing was sent.
    Skipped,

    /// Delivery failed; the buffer is untouched.
    Failed {
        /// What went wrong.
        error: DeliveryError,
    },
}

impl FlushOutcome {
    /// Check if this outcome delivered any samples.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    /// Check if this outcome is a delivery failure.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Handle returned by [`TelemetryUplinkClient::subscribe`], used to
/// unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A tracking-state listener.
type TrackingListener = Box<dyn Fn(bool) + Send>;

struct TrackingState {
    tracking: bool,
    next_id: u64,
    listeners: Vec<(SubscriptionId, TrackingListener)>,
}

/// Client that buffers location samples durably and uplinks them
/// opportunistically.
pub struct TelemetryUplinkClient {
    buffer: Mutex<SampleBuffer>,
    tracking: Mutex<TrackingState>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn KvStore>,
}

impl std::fmt::Debug for TelemetryUplinkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryUplinkClient")
            .field("buffered", &self.buffered_count())
            .field("tracking", &self.is_tracking())
            .finish_non_exhaustive()
    }
}

impl TelemetryUplinkClient {
    /// Create a client over the given store and transport.
    ///
    /// The buffer is reloaded from the store, so samples left over from a
    /// previous run are delivered by the next flush.
    #[must_use]
    pub fn new(
        store: Arc<dyn KvStore>,
        transport: Arc<dyn Transport>,
        capacity: usize,
    ) -> Self {
        let buffer = SampleBuffer::load(Arc::clone(&store), capacity);
        Self {
            buffer: Mutex::new(buffer),
            tracking: Mutex::new(TrackingState {
                tracking: false,
                next_id: 0,
                listeners: Vec::new(),
            }),
            transport,
            store,
        }
    }

    /// Record a location sample.
    ///
    /// Appends to the buffer (evicting the oldest entry if at capacity) and
    /// persists best-effort. Synchronous: never waits on the network or on
    /// an in-flight flush. Returns `Ok(true)` if the sample was buffered,
    /// `Ok(false)` if it was dropped as an exact consecutive duplicate.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidSample`] if the sample fails the
    /// data-model invariants (possible for samples that arrived through
    /// deserialization); the buffer is unchanged in that case.
    pub fn record_sample(&self, sample: LocationSample) -> Result<bool> {
        sample.validate()?;
        let appended = self.lock_buffer().push(sample);
        if appended {
            debug!("Recorded sample, {} buffered", self.buffered_count());
        }
        Ok(appended)
    }

    /// Attempt to deliver every currently buffered sample.
    ///
    /// Snapshots the buffer, reads the bearer token from the store, and
    /// hands the snapshot to the transport. On success exactly the
    /// snapshot's entries are removed — samples recorded while the delivery
    /// was in flight stay buffered. On any failure (missing token,
    /// transport error, non-2xx) the buffer is left untouched and the
    /// failure is reported in the returned [`FlushOutcome`].
    pub async fn flush(&self) -> FlushOutcome {
        let snapshot = self.lock_buffer().snapshot();
        if snapshot.is_empty() {
            return FlushOutcome::Skipped;
        }

        let token = match self.store.get(keys::AUTH_TOKEN) {
            Ok(Some(token)) if !token.is_empty() => token,
            Ok(_) => {
                warn!("Flush skipped: no bearer token in store");
                return FlushOutcome::Failed {
                    error: DeliveryError::MissingToken,
                };
            }
            Err(e) => {
                warn!("Flush skipped: could not read bearer token: {e}");
                return FlushOutcome::Failed {
                    error: DeliveryError::MissingToken,
                };
            }
        };

        match self.transport.deliver(&snapshot, &token).await {
            Ok(()) => {
                let removed = self.lock_buffer().remove_delivered(&snapshot);
                info!("Delivered {removed} samples");
                FlushOutcome::Delivered { count: removed }
            }
            Err(error) => {
                warn!("Delivery failed, keeping {} samples: {error}", snapshot.len());
                FlushOutcome::Failed { error }
            }
        }
    }

    /// Enter the `Tracking` state.
    ///
    /// Idempotent: calling while already tracking notifies nobody.
    pub fn start_tracking(&self) {
        self.set_tracking(true);
    }

    /// Return to the `Idle` state.
    ///
    /// Idempotent: calling while already idle notifies nobody. Tracking
    /// state is independent of delivery outcomes; nothing here touches the
    /// buffer.
    pub fn stop_tracking(&self) {
        self.set_tracking(false);
    }

    /// Whether the client is currently in the `Tracking` state.
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.lock_tracking().tracking
    }

    /// Register a listener for tracking transitions.
    ///
    /// The listener is invoked with the current state exactly once before
    /// any transition-driven invocation, then on every real transition
    /// until unsubscribed. Listeners run synchronously with the lock held;
    /// they must not call back into this client.
    pub fn subscribe(&self, listener: impl Fn(bool) + Send + 'static) -> SubscriptionId {
        let mut state = self.lock_tracking();
        let id = SubscriptionId(state.next_id);
        state.next_id += 1;
        listener(state.tracking);
        state.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a previously registered listener.
    ///
    /// Returns `true` if the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.lock_tracking();
        let before = state.listeners.len();
        state.listeners.retain(|(sub_id, _)| *sub_id != id);
        state.listeners.len() < before
    }

    /// Snapshot of the buffered samples, oldest first.
    #[must_use]
    pub fn buffered(&self) -> Vec<LocationSample> {
        self.lock_buffer().snapshot()
    }

    /// Number of buffered samples.
    #[must_use]
    pub fn buffered_count(&self) -> usize {
        self.lock_buffer().len()
    }

    /// Administratively drop every buffered sample.
    ///
    /// The only way the buffer empties without confirmed delivery.
    pub fn clear_buffer(&self) {
        self.lock_buffer().clear();
        info!("Buffer cleared");
    }

    fn set_tracking(&self, tracking: bool) {
        let mut state = self.lock_tracking();
        if state.tracking == tracking {
            return;
        }
        state.tracking = tracking;
        debug!(
            "Tracking {}",
            if tracking { "started" } else { "stopped" }
        );
        for (_, listener) in &state.listeners {
            listener(tracking);
        }
    }

    fn lock_buffer(&self) -> MutexGuard<'_, SampleBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_tracking(&self) -> MutexGuard<'_, TrackingState> {
        self.tracking.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
