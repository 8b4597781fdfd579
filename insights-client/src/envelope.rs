// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wire model of the ingestion endpoint.
//!
//! Each telemetry item travels as an [`Envelope`]; a batch is a JSON array of envelopes.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::telemetry::{MetricTelemetry, Properties, RequestTelemetry};

pub const REQUEST_ENVELOPE_NAME: &str = "Microsoft.ApplicationInsights.Request";
pub const METRIC_ENVELOPE_NAME: &str = "Microsoft.ApplicationInsights.Metric";

const TAG_OPERATION_NAME: &str = "ai.operation.name";
const TAG_SDK_VERSION: &str = "ai.internal.sdkVersion";
const SDK_VERSION: &str = concat!("rust:", env!("CARGO_PKG_VERSION"));

/// Data point kind `Measurement`, as opposed to a pre-aggregated value.
const DATA_POINT_MEASUREMENT: u8 = 0;

/// System variables for a telemetry item.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Type name of telemetry data item.
    pub name: &'static str,
    /// UTC ISO 8601 time with a trailing `Z`.
    pub time: String,
    pub i_key: String,
    pub tags: BTreeMap<&'static str, String>,
    pub data: Data,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "baseType", content = "baseData")]
pub enum Data {
    #[serde(rename = "RequestData")]
    Request(RequestData),
    #[serde(rename = "MetricData")]
    Metric(MetricData),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestData {
    pub ver: i32,
    pub id: String,
    pub name: String,
    pub duration: String,
    pub response_code: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricData {
    pub ver: i32,
    pub metrics: Vec<DataPoint>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DataPoint {
    pub name: String,
    pub kind: u8,
    pub value: f64,
    pub count: u32,
}

impl Envelope {
    pub fn from_request(request: RequestTelemetry, i_key: &str) -> Self {
        let tags = context_tags(request.operation_name);
        Self {
            name: REQUEST_ENVELOPE_NAME,
            time: format_time(&request.timestamp),
            i_key: i_key.to_owned(),
            tags,
            data: Data::Request(RequestData {
                ver: 2,
                id: request.id,
                name: request.name,
                duration: format_duration(request.duration),
                response_code: request.response_code,
                success: request.success,
                url: request.url,
                properties: request.properties,
            }),
        }
    }

    pub fn from_metric(metric: MetricTelemetry, i_key: &str) -> Self {
        let tags = context_tags(metric.operation_name);
        Self {
            name: METRIC_ENVELOPE_NAME,
            time: format_time(&metric.timestamp),
            i_key: i_key.to_owned(),
            tags,
            data: Data::Metric(MetricData {
                ver: 2,
                metrics: vec![DataPoint {
                    name: metric.name,
                    kind: DATA_POINT_MEASUREMENT,
                    value: metric.value,
                    count: 1,
                }],
                properties: metric.properties,
            }),
        }
    }
}

fn context_tags(operation_name: Option<String>) -> BTreeMap<&'static str, String> {
    let mut tags = BTreeMap::new();
    tags.insert(TAG_SDK_VERSION, SDK_VERSION.to_owned());
    if let Some(name) = operation_name {
        tags.insert(TAG_OPERATION_NAME, name);
    }
    tags
}

pub(crate) fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Formats a duration as `d.hh:mm:ss.ffffff`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!(
        "{}.{:02}:{:02}:{:02}.{:06}",
        secs / 86_400,
        (secs / 3_600) % 24,
        (secs / 60) % 60,
        secs % 60,
        duration.subsec_micros()
    )
}
