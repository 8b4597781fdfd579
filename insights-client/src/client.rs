// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use http::StatusCode;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::connection_string::ConnectionString;
use crate::envelope::Envelope;
use crate::error::ClientError;
use crate::live_metrics::LiveMetrics;
use crate::telemetry::{Connect, MetricTelemetry, RequestTelemetry, TelemetryClient};
use crate::transport::Transport;

/// Number of buffered items that triggers an inline send.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 500;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct AppInsightsClientBuilder {
    connection_string: ConnectionString,
    live_metrics: bool,
    max_batch_size: usize,
    timeout: Duration,
}

impl AppInsightsClientBuilder {
    pub fn new(connection_string: ConnectionString) -> Self {
        Self {
            connection_string,
            live_metrics: false,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Enables publishing of live metrics counters on every flush.
    pub fn set_live_metrics(&mut self, enabled: bool) -> &mut Self {
        self.live_metrics = enabled;
        self
    }

    /// Sets the number of buffered items after which a batch is sent without waiting for
    /// [`TelemetryClient::flush`]. Values below 1 are raised to 1.
    pub fn set_max_batch_size(&mut self, max_batch_size: usize) -> &mut Self {
        self.max_batch_size = max_batch_size.max(1);
        self
    }

    /// Sets the timeout applied to each HTTP request.
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// # Errors
    /// Fails if the client's runtime cannot be started.
    pub fn build(&self) -> Result<AppInsightsClient, ClientError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ClientError::Runtime(e.to_string()))?;

        debug!(
            endpoint = self.connection_string.ingestion_endpoint(),
            live_metrics = self.live_metrics,
            max_batch_size = self.max_batch_size,
            timeout_ms = self.timeout.as_millis() as u64,
            "Building Application Insights client"
        );

        Ok(AppInsightsClient {
            connection_string: self.connection_string.clone(),
            buffer: Mutex::new(Vec::new()),
            max_batch_size: self.max_batch_size,
            live_metrics: self.live_metrics.then(LiveMetrics::default),
            transport: Transport::new(self.timeout),
            runtime,
        })
    }
}

/// Buffered client for the Application Insights ingestion endpoint.
///
/// Calls block the calling thread while a batch is in flight. They must not be made from within
/// an async runtime.
pub struct AppInsightsClient {
    connection_string: ConnectionString,
    buffer: Mutex<Vec<Envelope>>,
    max_batch_size: usize,
    live_metrics: Option<LiveMetrics>,
    transport: Transport,
    runtime: tokio::runtime::Runtime,
}

/// Body of a 200/206 answer of the track endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TrackResponse {
    items_received: usize,
    items_accepted: usize,
    errors: Vec<TrackError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TrackError {
    index: usize,
    #[serde(rename = "statusCode")]
    status_code: u16,
    message: String,
}

impl AppInsightsClient {
    pub fn builder(connection_string: ConnectionString) -> AppInsightsClientBuilder {
        AppInsightsClientBuilder::new(connection_string)
    }

    pub fn connection_string(&self) -> &ConnectionString {
        &self.connection_string
    }

    /// Number of items waiting for the next send.
    pub fn buffered(&self) -> usize {
        self.lock_buffer().map(|b| b.len()).unwrap_or_default()
    }

    fn lock_buffer(&self) -> Result<MutexGuard<'_, Vec<Envelope>>, ClientError> {
        self.buffer
            .lock()
            .map_err(|_| ClientError::Runtime("telemetry buffer poisoned".to_owned()))
    }

    fn enqueue(&self, envelope: Envelope) -> Result<(), ClientError> {
        let batch = {
            let mut buffer = self.lock_buffer()?;
            buffer.push(envelope);
            if buffer.len() < self.max_batch_size {
                return Ok(());
            }
            std::mem::take(&mut *buffer)
        };
        self.send_batch(batch)
    }

    fn send_batch(&self, batch: Vec<Envelope>) -> Result<(), ClientError> {
        let items = batch.len();
        let payload = serde_json::to_vec(&batch)?;
        let url = self.connection_string.track_url();

        let response = self
            .runtime
            .block_on(self.transport.post_json(&url, &[], payload))?;

        match response.status {
            StatusCode::OK => {
                debug!(items, "Telemetry batch accepted");
                Ok(())
            }
            StatusCode::PARTIAL_CONTENT => {
                let track: TrackResponse =
                    serde_json::from_slice(&response.body).unwrap_or_default();
                warn!(
                    items,
                    items_received = track.items_received,
                    items_accepted = track.items_accepted,
                    "Telemetry batch partially accepted"
                );
                for rejected in &track.errors {
                    debug!(
                        index = rejected.index,
                        status = rejected.status_code,
                        message = %rejected.message,
                        "Telemetry item rejected"
                    );
                }
                Ok(())
            }
            status => {
                let body = String::from_utf8_lossy(&response.body).into_owned();
                error!(status = status.as_u16(), items, "Telemetry batch rejected");
                Err(ClientError::Http {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    fn publish_live_metrics(&self) {
        let Some(live) = &self.live_metrics else {
            return;
        };
        if !live.has_pending() {
            debug!("No requests recorded, skipping live metrics");
            return;
        }
        let point = live.take_data_point(self.connection_string.instrumentation_key());
        let payload = match serde_json::to_vec(&[point]) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Failed to serialize live metrics");
                return;
            }
        };
        let headers = [(
            "x-ms-qps-transmission-time",
            chrono::Utc::now().timestamp_millis().to_string(),
        )];
        let url = self.connection_string.live_metrics_url();
        match self
            .runtime
            .block_on(self.transport.post_json(&url, &headers, payload))
        {
            Ok(response) if response.status.is_success() => {
                debug!("Live metrics published");
            }
            Ok(response) => {
                warn!(status = response.status.as_u16(), "Live metrics rejected");
            }
            Err(e) => warn!(error = %e, "Failed to publish live metrics"),
        }
    }
}

impl TelemetryClient for AppInsightsClient {
    fn track_request(&self, request: RequestTelemetry) -> Result<(), ClientError> {
        if let Some(live) = &self.live_metrics {
            live.record_request(request.duration.as_millis() as u64, request.success);
        }
        let envelope =
            Envelope::from_request(request, self.connection_string.instrumentation_key());
        self.enqueue(envelope)
    }

    fn track_metric(&self, metric: MetricTelemetry) -> Result<(), ClientError> {
        let envelope = Envelope::from_metric(metric, self.connection_string.instrumentation_key());
        self.enqueue(envelope)
    }

    fn flush(&self) -> Result<(), ClientError> {
        let batch = std::mem::take(&mut *self.lock_buffer()?);
        let result = if batch.is_empty() {
            debug!("Nothing to flush");
            Ok(())
        } else {
            self.send_batch(batch)
        };
        self.publish_live_metrics();
        result
    }
}

impl Connect for AppInsightsClient {
    fn connect(connection_string: ConnectionString, live_metrics: bool) -> Result<Self, ClientError> {
        AppInsightsClient::builder(connection_string)
            .set_live_metrics(live_metrics)
            .build()
    }
}
