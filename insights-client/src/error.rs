// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types for `insights-client`.

use thiserror::Error;

/// Errors that can occur while configuring the client or transmitting telemetry.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The connection string could not be parsed or lacks a required key.
    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),

    /// A batch of envelopes could not be serialised.
    #[error("failed to serialize telemetry: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The request could not be built (bad endpoint URI, invalid header value).
    #[error("failed to build request: {0}")]
    Request(String),

    /// The ingestion endpoint answered with a status other than 200 or 206.
    #[error("ingestion failed with status {status}: {body}")]
    Http {
        /// The HTTP status code (e.g. 400, 503).
        status: u16,
        /// The response body, lossy-decoded as UTF-8.
        body: String,
    },

    /// The connection to the endpoint failed.
    #[error("network error: {0}")]
    Network(String),

    /// The request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The client's runtime or internal state is unusable.
    #[error("client runtime error: {0}")]
    Runtime(String),
}
