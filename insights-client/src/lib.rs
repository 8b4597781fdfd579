// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Client side of the Application Insights ingestion protocol.
//!
//! Records produced by the load-test listener are handed to a [`TelemetryClient`]. The default
//! implementation, [`AppInsightsClient`], serialises them into ingestion envelopes, buffers them
//! and posts them in batches to the endpoint named by a [`ConnectionString`]. Transport is
//! deliberately thin: one POST per batch, no retries, no local storage.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod client;
pub mod connection_string;
pub mod envelope;
pub mod error;
pub mod live_metrics;
pub mod telemetry;
mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use client::{AppInsightsClient, AppInsightsClientBuilder};
pub use connection_string::ConnectionString;
pub use error::ClientError;
pub use telemetry::{Connect, MetricTelemetry, Properties, RequestTelemetry, TelemetryClient};
