//! Delivery transport for waybeacon.
//!
//! This module defines the transport seam between the uplink client and the
//! remote collector, plus the production HTTP implementation. The collector
//! accepts one sample per request: `POST <base>/api/v1/location/ping` with a
//! bearer token and a JSON body. Strictly 2xx counts as delivered; any other
//! status or transport error is a delivery failure.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::error::{Error, Result};
use crate::sample::LocationSample;

/// Path of the ingestion endpoint, relative to the collector base URL.
const PING_PATH: &str = "api/v1/location/ping";

/// Errors that can occur while delivering samples.
///
/// Authentication problems (missing or malformed token) are deliberately
/// shaped like network problems: the caller treats every variant the same
/// way — keep the buffer, try again on the next flush.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// No bearer token is available in the store.
    #[error("no bearer token available")]
    MissingToken,

    /// The stored token cannot be used as an HTTP header value.
    #[error("bearer token is not a valid header value")]
    InvalidToken,

    /// The collector answered with a non-2xx status.
    #[error("collector rejected sample with status {status}")]
    Rejected {
        /// The HTTP status code returned.
        status: u16,
    },

    /// The request failed before a response arrived (connect, timeout, TLS).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Wire body of one ingestion request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PingBody<'a> {
    /// Trip correlation id; `null` when no job was active.
    pub trip_id: Option<&'a str>,
    /// WGS84 latitude in degrees.
    pub latitude: f64,
    /// WGS84 longitude in degrees.
    pub longitude: f64,
    /// Radius of uncertainty in meters.
    pub accuracy: f64,
    /// Acquisition time, RFC 3339.
    pub timestamp: String,
}

impl<'a> PingBody<'a> {
    /// Build the wire body for a sample.
    #[must_use]
    pub fn from_sample(sample: &'a LocationSample) -> Self {
        Self {
            trip_id: sample.trip_id(),
            latitude: sample.latitude(),
            longitude: sample.longitude(),
            accuracy: sample.accuracy(),
            timestamp: sample.captured_at().to_rfc3339(),
        }
    }
}

/// A way of handing a batch of samples to the collector.
///
/// Implementations must be all-or-nothing from the caller's point of view:
/// return `Ok(())` only when the entire batch was accepted, so the caller
/// can safely trim exactly that batch from its buffer.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `batch` in order, authenticated with `token`.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] if any sample of the batch was not
    /// accepted.
    async fn deliver(&self, batch: &[LocationSample], token: &str)
        -> std::result::Result<(), DeliveryError>;
}

/// HTTP transport against the collector's ingestion endpoint.
///
/// The collector's wire contract is one sample per request, so a batch is
/// sent as sequential single-sample POSTs, stopping at the first failure.
/// Partially accepted batches are reported as failed and re-sent wholesale
/// by the next flush; the collector sees at-least-once delivery.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    ping_url: reqwest::Url,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport for the given collector base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] if the base URL is not an
    /// absolute http(s) URL.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let ping_url = Self::ping_url(base_url)?;
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Ok(Self { ping_url, client })
    }

    /// Resolve and validate the full ingestion URL for a base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] if the URL does not parse or
    /// uses a scheme other than http/https.
    pub fn ping_url(base_url: &str) -> Result<reqwest::Url> {
        let joined = format!("{}/{}", base_url.trim_end_matches('/'), PING_PATH);
        let url = reqwest::Url::parse(&joined).map_err(|e| Error::ConfigValidation {
            message: format!("invalid collector base url: {e}"),
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(Error::ConfigValidation {
                message: format!("collector base url must be http(s), got {}", url.scheme()),
            });
        }
        Ok(url)
    }

    fn auth_headers(token: &str) -> std::result::Result<HeaderMap, DeliveryError> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| DeliveryError::InvalidToken)?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn deliver(
        &self,
        batch: &[LocationSample],
        token: &str,
    ) -> std::result::Result<(), DeliveryError> {
        let headers = Self::auth_headers(token)?;

        for sample in batch {
            let resp = self
                .client
                .post(self.ping_url.clone())
                .headers(headers.clone())
                .json(&PingBody::from_sample(sample))
                .send()
                .await?;

            if !resp.status().is_success() {
                return Err(DeliveryError::Rejected {
                    status: resp.status().as_u16(),
                });
            }
        }

        debug!("Delivered {} samples", batch.len());
        Ok(())
    }
}
