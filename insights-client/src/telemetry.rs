// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::connection_string::ConnectionString;
use crate::error::ClientError;

/// Custom dimensions attached to a telemetry item. Keys are unique, a later insert replaces the
/// earlier value.
pub type Properties = BTreeMap<String, String>;

/// Completion of one request, reported as an Application Insights `RequestData` item.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestTelemetry {
    pub id: String,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub duration: Duration,
    pub response_code: String,
    pub success: bool,
    pub url: Option<String>,
    /// Value of the `ai.operation.name` context tag.
    pub operation_name: Option<String>,
    pub properties: Properties,
}

impl RequestTelemetry {
    /// Creates a request item with a fresh random id and no properties.
    pub fn new(
        name: impl Into<String>,
        timestamp: DateTime<Utc>,
        duration: Duration,
        response_code: impl Into<String>,
        success: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            name: name.into(),
            timestamp,
            duration,
            response_code: response_code.into(),
            success,
            url: None,
            operation_name: None,
            properties: Properties::new(),
        }
    }
}

/// A single measurement, reported as an Application Insights `MetricData` item.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricTelemetry {
    pub name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub operation_name: Option<String>,
    pub properties: Properties,
}

impl MetricTelemetry {
    pub fn new(name: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            value,
            timestamp,
            operation_name: None,
            properties: Properties::new(),
        }
    }
}

/// Sink for telemetry items.
///
/// Implementations may buffer and may block while transmitting. They are shared between the
/// worker threads of the load-test host and must therefore be thread-safe.
pub trait TelemetryClient: Send + Sync {
    fn track_request(&self, request: RequestTelemetry) -> Result<(), ClientError>;

    fn track_metric(&self, metric: MetricTelemetry) -> Result<(), ClientError>;

    /// Transmits everything buffered so far.
    fn flush(&self) -> Result<(), ClientError>;
}

impl<T: TelemetryClient + ?Sized> TelemetryClient for Arc<T> {
    fn track_request(&self, request: RequestTelemetry) -> Result<(), ClientError> {
        (**self).track_request(request)
    }

    fn track_metric(&self, metric: MetricTelemetry) -> Result<(), ClientError> {
        (**self).track_metric(metric)
    }

    fn flush(&self) -> Result<(), ClientError> {
        (**self).flush()
    }
}

/// Construction of a client from resolved credentials, used by the listener at setup time.
pub trait Connect: TelemetryClient + Sized {
    /// # Errors
    /// Fails when the client cannot be initialised, e.g. its runtime cannot be started.
    fn connect(connection_string: ConnectionString, live_metrics: bool) -> Result<Self, ClientError>;
}
