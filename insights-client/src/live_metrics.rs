// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Live metrics counters.
//!
//! When enabled, every tracked request updates a small set of counters. On flush the counters
//! are drained into a monitoring data point which is posted to the live metrics endpoint.
//! Publishing is best effort: a failure is logged and never reaches the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

pub const METRIC_REQUESTS_PER_SECOND: &str = "\\ApplicationInsights\\Requests/Sec";
pub const METRIC_REQUEST_DURATION: &str = "\\ApplicationInsights\\Request Duration";
pub const METRIC_REQUESTS_FAILED_PER_SECOND: &str = "\\ApplicationInsights\\Requests Failed/Sec";

const DATA_POINT_VERSION: &str = "1.1";

#[derive(Debug)]
pub struct LiveMetrics {
    requests: AtomicU64,
    failed_requests: AtomicU64,
    duration_ms: AtomicU64,
    window_start: Mutex<Instant>,
}

impl Default for LiveMetrics {
    fn default() -> Self {
        Self {
            requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            duration_ms: AtomicU64::new(0),
            window_start: Mutex::new(Instant::now()),
        }
    }
}

impl LiveMetrics {
    pub fn record_request(&self, duration_ms: u64, success: bool) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.duration_ms.fetch_add(duration_ms, Ordering::Relaxed);
        if !success {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Whether any request was recorded since the previous drain.
    pub fn has_pending(&self) -> bool {
        self.requests.load(Ordering::Relaxed) > 0
    }

    /// Drains the counters into a data point covering the time since the previous drain.
    pub fn take_data_point(&self, instrumentation_key: &str) -> MonitoringDataPoint {
        let now = Instant::now();
        let elapsed = match self.window_start.lock() {
            Ok(mut start) => {
                let elapsed = now.duration_since(*start);
                *start = now;
                elapsed
            }
            Err(_) => std::time::Duration::ZERO,
        };
        let requests = self.requests.swap(0, Ordering::Relaxed);
        let failed = self.failed_requests.swap(0, Ordering::Relaxed);
        let duration_ms = self.duration_ms.swap(0, Ordering::Relaxed);
        compute_data_point(
            instrumentation_key,
            requests,
            failed,
            duration_ms,
            elapsed.as_secs_f64(),
        )
    }
}

fn compute_data_point(
    instrumentation_key: &str,
    requests: u64,
    failed: u64,
    duration_ms: u64,
    elapsed_secs: f64,
) -> MonitoringDataPoint {
    // Guard against a zero-length window when flush is called twice in a row.
    let window = elapsed_secs.max(1.0);
    let average_duration = if requests == 0 {
        0.0
    } else {
        duration_ms as f64 / requests as f64
    };

    MonitoringDataPoint {
        version: DATA_POINT_VERSION,
        instrumentation_key: instrumentation_key.to_owned(),
        instance: hostname(),
        machine_name: hostname(),
        timestamp: format!("/Date({})/", Utc::now().timestamp_millis()),
        metrics: vec![
            MetricPoint {
                name: METRIC_REQUESTS_PER_SECOND,
                value: requests as f64 / window,
                weight: 1,
            },
            MetricPoint {
                name: METRIC_REQUEST_DURATION,
                value: average_duration,
                weight: requests.max(1),
            },
            MetricPoint {
                name: METRIC_REQUESTS_FAILED_PER_SECOND,
                value: failed as f64 / window,
                weight: 1,
            },
        ],
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| String::from("unknown_hostname"))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MonitoringDataPoint {
    pub version: &'static str,
    pub instrumentation_key: String,
    pub instance: String,
    pub machine_name: String,
    pub timestamp: String,
    pub metrics: Vec<MetricPoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricPoint {
    pub name: &'static str,
    pub value: f64,
    pub weight: u64,
}
