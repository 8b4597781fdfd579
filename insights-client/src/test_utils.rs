// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory [`TelemetryClient`] for tests.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::connection_string::ConnectionString;
use crate::error::ClientError;
use crate::telemetry::{Connect, MetricTelemetry, RequestTelemetry, TelemetryClient};

/// Records every tracked item instead of sending it.
#[derive(Debug, Default)]
pub struct InMemoryClient {
    pub connection_string: Option<ConnectionString>,
    pub live_metrics: bool,
    requests: Mutex<Vec<RequestTelemetry>>,
    metrics: Mutex<Vec<MetricTelemetry>>,
    flushes: AtomicUsize,
    fail_tracking: AtomicBool,
}

impl InMemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `track_*` call fail with a 503.
    pub fn fail_tracking(&self) {
        self.fail_tracking.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<RequestTelemetry> {
        self.requests.lock().unwrap().clone()
    }

    pub fn metrics(&self) -> Vec<MetricTelemetry> {
        self.metrics.lock().unwrap().clone()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), ClientError> {
        if self.fail_tracking.load(Ordering::SeqCst) {
            return Err(ClientError::Http {
                status: 503,
                body: "unavailable".to_owned(),
            });
        }
        Ok(())
    }
}

impl TelemetryClient for InMemoryClient {
    fn track_request(&self, request: RequestTelemetry) -> Result<(), ClientError> {
        self.check()?;
        self.requests.lock().unwrap().push(request);
        Ok(())
    }

    fn track_metric(&self, metric: MetricTelemetry) -> Result<(), ClientError> {
        self.check()?;
        self.metrics.lock().unwrap().push(metric);
        Ok(())
    }

    fn flush(&self) -> Result<(), ClientError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Connect for InMemoryClient {
    fn connect(connection_string: ConnectionString, live_metrics: bool) -> Result<Self, ClientError> {
        Ok(Self {
            connection_string: Some(connection_string),
            live_metrics,
            ..Self::default()
        })
    }
}
