// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::borrow::Cow;

/// How the request data of a sample should be interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DataType {
    #[default]
    Text,
    Binary,
}

/// One completed sample, as handed over by the load-test host.
///
/// Times are milliseconds: `start_time`, `end_time` and `timestamp` since the Unix epoch, the
/// other timing fields as durations.
#[derive(Clone, Debug, Default)]
pub struct SampleResult {
    pub sample_label: String,
    pub successful: bool,
    pub response_code: String,

    /// Bytes received, headers included.
    pub bytes: u64,
    pub sent_bytes: u64,
    pub body_size: u64,

    pub connect_time: u64,
    pub idle_time: u64,
    pub latency: u64,
    /// Total elapsed time of the sample.
    pub elapsed: u64,
    pub start_time: i64,
    pub end_time: i64,
    /// Time the sample is reported at; the host picks start or end time.
    pub timestamp: i64,

    pub thread_name: String,
    pub group_threads: u32,
    pub all_threads: u32,
    pub sample_count: u32,
    pub error_count: u32,

    pub url: Option<String>,
    /// Raw response headers, one `Name: value` per line.
    pub response_headers: String,
    pub sampler_data: Option<String>,
    pub data_type: DataType,
    pub response_data: Vec<u8>,
}

impl SampleResult {
    /// The URL, or an empty string when the sample has none.
    pub fn url_as_str(&self) -> &str {
        self.url.as_deref().unwrap_or_default()
    }

    /// The response body decoded as UTF-8, invalid sequences replaced.
    pub fn response_data_as_string(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.response_data)
    }
}
