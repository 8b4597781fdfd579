// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Parsing of Application Insights connection strings.
//!
//! A connection string is a `;`-separated list of `Key=Value` pairs, e.g.
//!
//! ```text
//! InstrumentationKey=00000000-0000-0000-0000-000000000000;IngestionEndpoint=https://westeurope-5.in.applicationinsights.azure.com/
//! ```
//!
//! Keys are case-insensitive. Only `InstrumentationKey` is mandatory, the endpoints are derived
//! from `EndpointSuffix` or fall back to the global defaults.

use std::str::FromStr;

use crate::error::ClientError;

pub const DEFAULT_INGESTION_ENDPOINT: &str = "https://dc.services.visualstudio.com/";
pub const DEFAULT_LIVE_ENDPOINT: &str = "https://rt.services.visualstudio.com/";

const KEY_INSTRUMENTATION_KEY: &str = "instrumentationkey";
const KEY_INGESTION_ENDPOINT: &str = "ingestionendpoint";
const KEY_LIVE_ENDPOINT: &str = "liveendpoint";
const KEY_ENDPOINT_SUFFIX: &str = "endpointsuffix";

/// Credentials and endpoints of an Application Insights resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionString {
    instrumentation_key: String,
    ingestion_endpoint: String,
    live_endpoint: String,
}

impl ConnectionString {
    /// Parses a connection string.
    ///
    /// # Errors
    /// Fails when a segment is not a `Key=Value` pair or when no instrumentation key is present.
    pub fn parse(value: &str) -> Result<Self, ClientError> {
        let mut instrumentation_key = None;
        let mut ingestion_endpoint = None;
        let mut live_endpoint = None;
        let mut endpoint_suffix = None;

        for segment in value.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, val) = segment.split_once('=').ok_or_else(|| {
                ClientError::InvalidConnectionString(format!("malformed segment '{segment}'"))
            })?;
            let val = val.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                KEY_INSTRUMENTATION_KEY => instrumentation_key = Some(val.to_owned()),
                KEY_INGESTION_ENDPOINT => ingestion_endpoint = Some(normalize_endpoint(val)),
                KEY_LIVE_ENDPOINT => live_endpoint = Some(normalize_endpoint(val)),
                KEY_ENDPOINT_SUFFIX => endpoint_suffix = Some(val.trim_matches('.').to_owned()),
                // Authorization, ApplicationId and friends are accepted but unused.
                _ => {}
            }
        }

        let instrumentation_key = instrumentation_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ClientError::InvalidConnectionString("missing InstrumentationKey".to_owned())
            })?;

        let ingestion_endpoint = ingestion_endpoint
            .or_else(|| endpoint_suffix.as_ref().map(|s| format!("https://dc.{s}/")))
            .unwrap_or_else(|| DEFAULT_INGESTION_ENDPOINT.to_owned());
        let live_endpoint = live_endpoint
            .or_else(|| endpoint_suffix.as_ref().map(|s| format!("https://live.{s}/")))
            .unwrap_or_else(|| DEFAULT_LIVE_ENDPOINT.to_owned());

        Ok(Self {
            instrumentation_key,
            ingestion_endpoint,
            live_endpoint,
        })
    }

    /// Builds a connection string from a bare instrumentation key, using the default endpoints.
    pub fn from_instrumentation_key(key: &str) -> Result<Self, ClientError> {
        Self::parse(&format!("InstrumentationKey={}", key.trim()))
    }

    pub fn instrumentation_key(&self) -> &str {
        &self.instrumentation_key
    }

    /// Base URL of the ingestion service, always ending in `/`.
    pub fn ingestion_endpoint(&self) -> &str {
        &self.ingestion_endpoint
    }

    /// Base URL of the live metrics service, always ending in `/`.
    pub fn live_endpoint(&self) -> &str {
        &self.live_endpoint
    }

    /// Full URL batches are posted to.
    pub fn track_url(&self) -> String {
        format!("{}v2.1/track", self.ingestion_endpoint)
    }

    /// Full URL live metrics data points are posted to.
    pub fn live_metrics_url(&self) -> String {
        format!(
            "{}QuickPulseService.svc/post?ikey={}",
            self.live_endpoint, self.instrumentation_key
        )
    }
}

impl FromStr for ConnectionString {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.ends_with('/') {
        endpoint.to_owned()
    } else {
        format!("{endpoint}/")
    }
}
