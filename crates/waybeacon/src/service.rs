//! Foreground uplink service loop.
//!
//! [`UplinkService`] wires the pieces together: it consumes raw fixes from
//! a source channel, stamps them with the active trip id, records them on
//! the client, and drives the periodic flush that retries undelivered
//! samples. The loop is the "external flush trigger" the client itself
//! deliberately doesn't own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::sample::LocationSample;
use crate::source::RawFix;
use crate::store::{keys, KvStore};
use crate::uplink::{FlushOutcome, TelemetryUplinkClient};

/// A handle to signal the service loop to stop.
///
/// This is a lightweight, cloneable handle that can be shared across tasks.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    stop_signal: Arc<AtomicBool>,
}

impl Default for ServiceHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceHandle {
    /// Create a new handle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stop_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signal the service to stop.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Check if the stop signal has been sent.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }

    /// Reset the stop signal.
    pub fn reset(&self) {
        self.stop_signal.store(false, Ordering::SeqCst);
    }
}

/// Service loop around a [`TelemetryUplinkClient`].
pub struct UplinkService {
    client: Arc<TelemetryUplinkClient>,
    store: Arc<dyn KvStore>,
    flush_interval: Duration,
}

impl std::fmt::Debug for UplinkService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UplinkService")
            .field("flush_interval", &self.flush_interval)
            .finish_non_exhaustive()
    }
}

impl UplinkService {
    /// Create a service around a client.
    #[must_use]
    pub fn new(
        client: Arc<TelemetryUplinkClient>,
        store: Arc<dyn KvStore>,
        flush_interval: Duration,
    ) -> Self {
        Self {
            client,
            store,
            flush_interval,
        }
    }

    /// Run the service loop until the fix channel closes or the handle
    /// signals stop.
    ///
    /// Each received fix is stamped with the active trip id and recorded;
    /// each interval tick attempts a flush. One final flush runs on the way
    /// out so a clean shutdown drains what it can.
    pub async fn run(&self, mut rx: mpsc::Receiver<RawFix>, handle: ServiceHandle) {
        info!(
            "Uplink service running, flushing every {:?}",
            self.flush_interval
        );
        let mut ticker = tokio::time::interval(self.flush_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick of a tokio interval fires immediately; swallow it
        // so the first flush happens one full interval in.
        ticker.tick().await;

        loop {
            if handle.should_stop() {
                break;
            }
            tokio::select! {
                maybe_fix = rx.recv() => match maybe_fix {
                    Some(fix) => self.ingest(fix),
                    None => break,
                },
                _ = ticker.tick() => {
                    self.flush_and_log().await;
                }
            }
        }

        info!("Uplink service stopping");
        self.flush_and_log().await;
    }

    /// Stamp a raw fix with the active trip id and record it.
    fn ingest(&self, fix: RawFix) {
        let trip_id = match self.store.get(keys::ACTIVE_TRIP) {
            Ok(trip) => trip.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!("Could not read active trip id, recording without: {e}");
                None
            }
        };

        match LocationSample::from_fix(fix, trip_id) {
            Ok(sample) => match self.client.record_sample(sample) {
                Ok(true) => {}
                Ok(false) => debug!("Dropped duplicate fix"),
                Err(e) => warn!("Rejected fix: {e}"),
            },
            Err(e) => warn!("Dropped malformed fix: {e}"),
        }
    }

    async fn flush_and_log(&self) {
        match self.client.flush().await {
            FlushOutcome::Delivered { count } => debug!("Flush delivered {count} samples"),
            FlushOutcome::Skipped => debug!("Flush skipped, buffer empty"),
            FlushOutcome::Failed { error } => {
                warn!("Flush failed, will retry next interval: {error}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::transport::{DeliveryError, Transport};
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct RecordingTransport {
        batches: Mutex<Vec<Vec<LocationSample>>>,
    }

    #[async_trait::async_trait]
    impl Transport for RecordingTransport {
        async fn deliver(
            &self,
            batch: &[LocationSample],
            _token: &str,
        ) -> std::result::Result<(), DeliveryError> {
            self.batches.lock().unwrap().push(batch.to_vec());
            Ok(())
        }
    }

    fn fix(lat: f64) -> RawFix {
        RawFix {
            latitude: lat,
            longitude: 0.0,
            accuracy: 5.0,
            captured_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap(),
        }
    }

    fn setup() -> (UplinkService, Arc<MemoryStore>, Arc<RecordingTransport>) {
        let store = Arc::new(MemoryStore::new());
        store.set(keys::AUTH_TOKEN, "tok").unwrap();
        let transport = Arc::new(RecordingTransport::default());
        let client = Arc::new(TelemetryUplinkClient::new(
            Arc::clone(&store) as Arc<dyn KvStore>,
            Arc::clone(&transport) as Arc<dyn Transport>,
            10,
        ));
        let service = UplinkService::new(
            client,
            Arc::clone(&store) as Arc<dyn KvStore>,
            Duration::from_secs(3600),
        );
        (service, store, transport)
    }

    #[test]
    fn test_handle_stop() {
        let handle = ServiceHandle::new();
        assert!(!handle.should_stop());

        handle.stop();
        assert!(handle.should_stop());

        handle.reset();
        assert!(!handle.should_stop());
    }

    #[test]
    fn test_handle_clone_shares_signal() {
        let handle1 = ServiceHandle::new();
        let handle2 = handle1.clone();

        handle1.stop();
        assert!(handle2.should_stop());
    }

    #[tokio::test]
    async fn test_run_ingests_and_flushes_on_close() {
        let (service, _store, transport) = setup();
        let (tx, rx) = mpsc::channel(8);

        tx.send(fix(1.0)).await.unwrap();
        tx.send(fix(2.0)).await.unwrap();
        drop(tx); // closing the channel ends the loop

        service.run(rx, ServiceHandle::new()).await;

        // The final flush delivered both fixes.
        let batches = transport.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
    }

    #[tokio::test]
    async fn test_ingest_stamps_active_trip() {
        let (service, store, transport) = setup();
        store.set(keys::ACTIVE_TRIP, "trip-12").unwrap();
        let (tx, rx) = mpsc::channel(8);

        tx.send(fix(1.0)).await.unwrap();
        drop(tx);

        service.run(rx, ServiceHandle::new()).await;

        let batches = transport.batches.lock().unwrap();
        assert_eq!(batches[0][0].trip_id(), Some("trip-12"));
    }

    #[tokio::test]
    async fn test_ingest_without_trip_records_null() {
        let (service, _store, transport) = setup();
        let (tx, rx) = mpsc::channel(8);

        tx.send(fix(1.0)).await.unwrap();
        drop(tx);

        service.run(rx, ServiceHandle::new()).await;

        let batches = transport.batches.lock().unwrap();
        assert_eq!(batches[0][0].trip_id(), None);
    }

    #[tokio::test]
    async fn test_malformed_fix_dropped_not_fatal() {
        let (service, _store, transport) = setup();
        let (tx, rx) = mpsc::channel(8);

        tx.send(fix(999.0)).await.unwrap(); // invalid latitude
        tx.send(fix(1.0)).await.unwrap();
        drop(tx);

        service.run(rx, ServiceHandle::new()).await;

        let batches = transport.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
        assert!((batches[0][0].latitude() - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_stopped_handle_exits_promptly() {
        let (service, _store, _transport) = setup();
        let (_tx, rx) = mpsc::channel::<RawFix>(1);

        let handle = ServiceHandle::new();
        handle.stop();

        // Must return even though the channel never closes.
        service.run(rx, handle).await;
    }
}
