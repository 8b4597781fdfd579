// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use insights_client::ClientError;
use thiserror::Error;

/// Invalid listener parameters. Raised by `setup_test`, before any sample is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid sampler regular expression '{pattern}': {source}")]
    InvalidSamplerRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid response header name '{name}': {source}")]
    InvalidResponseHeader {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    InvalidConnectionString(ClientError),

    #[error("no connection string or instrumentation key configured")]
    MissingCredentials,
}

/// A single sample could not be turned into telemetry. The sample is skipped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("sample timestamp {0} is out of range")]
    InvalidTimestamp(i64),
}

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Transmission failure reported by the telemetry client.
    #[error(transparent)]
    Client(#[from] ClientError),
}
