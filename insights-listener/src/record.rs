// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mapping of samples to telemetry items.

use std::time::Duration;

use chrono::{DateTime, Utc};
use insights_client::{MetricTelemetry, Properties, RequestTelemetry};
use regex::Regex;

use crate::config::{ListenerConfig, RESPONSE_HEADERS_PREFIX};
use crate::error::{ConfigError, RecordError};
use crate::payload::{RESPONSE_DATA_KEY, SAMPLE_DATA_KEY};
use crate::sample::SampleResult;

pub const BYTES: &str = "Bytes";
pub const SENT_BYTES: &str = "SentBytes";
pub const CONNECT_TIME: &str = "ConnectTime";
pub const ERROR_COUNT: &str = "ErrorCount";
pub const IDLE_TIME: &str = "IdleTime";
pub const LATENCY: &str = "Latency";
pub const BODY_SIZE: &str = "BodySize";
pub const TEST_START_TIME: &str = "TestStartTime";
pub const SAMPLE_START_TIME: &str = "SampleStartTime";
pub const SAMPLE_END_TIME: &str = "SampleEndTime";
pub const SAMPLE_LABEL: &str = "SampleLabel";
pub const THREAD_NAME: &str = "ThreadName";
pub const URL: &str = "URL";
pub const RESPONSE_CODE: &str = "ResponseCode";
pub const GRP_THREADS: &str = "GrpThreads";
pub const ALL_THREADS: &str = "AllThreads";
pub const SAMPLE_COUNT: &str = "SampleCount";

/// Name suffix of the metric holding the elapsed time.
pub const RESPONSE_TIME: &str = "ResponseTime";

/// Whether a property key is written by the listener itself and thus unavailable to custom
/// properties: the payload keys and every `aih.` header key.
pub fn is_reserved_property(key: &str) -> bool {
    key == SAMPLE_DATA_KEY || key == RESPONSE_DATA_KEY || key.starts_with(RESPONSE_HEADERS_PREFIX)
}

/// Finds one header in raw `Name: value` header text.
#[derive(Clone, Debug)]
struct HeaderExtractor {
    property: String,
    pattern: Regex,
}

impl HeaderExtractor {
    fn new(name: &str) -> Result<Self, ConfigError> {
        let pattern = Regex::new(&format!("(?im)^{}:(.*)$", regex::escape(name))).map_err(
            |source| ConfigError::InvalidResponseHeader {
                name: name.to_owned(),
                source,
            },
        )?;
        Ok(Self {
            property: format!("{RESPONSE_HEADERS_PREFIX}{name}"),
            pattern,
        })
    }

    fn extract<'a>(&self, headers: &'a str) -> Option<&'a str> {
        let value = self.pattern.captures(headers)?.get(1)?;
        Some(value.as_str().trim())
    }
}

/// Builds telemetry items for samples. Holds everything that does not change during a run.
#[derive(Clone, Debug)]
pub struct RecordBuilder {
    test_name: String,
    custom_properties: Properties,
    headers: Vec<HeaderExtractor>,
    test_start_time: i64,
}

impl RecordBuilder {
    /// # Errors
    /// Fails when a response header name cannot be turned into a pattern.
    pub fn new(config: &ListenerConfig) -> Result<Self, ConfigError> {
        let headers = config
            .response_headers
            .iter()
            .map(|name| HeaderExtractor::new(name))
            .collect::<Result<_, _>>()?;
        Ok(Self {
            test_name: config.test_name.clone(),
            custom_properties: config
                .custom_properties
                .iter()
                .filter(|(key, _)| !key.is_empty() && !is_reserved_property(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            headers,
            test_start_time: config.test_start_time,
        })
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    /// Property map of a sample: custom properties, then the fixed fields, then the extracted
    /// response headers. Later entries overwrite earlier ones.
    pub fn properties(&self, sample: &SampleResult) -> Properties {
        let mut properties = self.custom_properties.clone();
        let fixed = [
            (BYTES, sample.bytes.to_string()),
            (SENT_BYTES, sample.sent_bytes.to_string()),
            (CONNECT_TIME, sample.connect_time.to_string()),
            (ERROR_COUNT, sample.error_count.to_string()),
            (IDLE_TIME, format!("{:.1}", sample.idle_time as f64)),
            (LATENCY, format!("{:.1}", sample.latency as f64)),
            (BODY_SIZE, sample.body_size.to_string()),
            (TEST_START_TIME, self.test_start_time.to_string()),
            (SAMPLE_START_TIME, sample.start_time.to_string()),
            (SAMPLE_END_TIME, sample.end_time.to_string()),
            (SAMPLE_LABEL, sample.sample_label.clone()),
            (THREAD_NAME, sample.thread_name.clone()),
            (URL, sample.url_as_str().to_owned()),
            (RESPONSE_CODE, sample.response_code.clone()),
            (GRP_THREADS, sample.group_threads.to_string()),
            (ALL_THREADS, sample.all_threads.to_string()),
            (SAMPLE_COUNT, sample.sample_count.to_string()),
        ];
        properties.extend(fixed.map(|(key, value)| (key.to_owned(), value)));

        for header in &self.headers {
            if let Some(value) = header.extract(&sample.response_headers) {
                properties.insert(header.property.clone(), value.to_owned());
            }
        }
        properties
    }

    /// Request item for a sample, without payloads.
    ///
    /// # Errors
    /// Fails when the sample timestamp cannot be represented.
    pub fn build_request(&self, sample: &SampleResult) -> Result<RequestTelemetry, RecordError> {
        let mut request = RequestTelemetry::new(
            self.test_name.clone(),
            timestamp(sample)?,
            Duration::from_millis(sample.elapsed),
            sample.response_code.clone(),
            sample.successful,
        );
        request.url = sample.url.clone();
        request.operation_name = Some(self.test_name.clone());
        request.properties = self.properties(sample);
        Ok(request)
    }

    /// One metric item per numeric field of a sample, each carrying `properties`.
    ///
    /// # Errors
    /// Fails when the sample timestamp cannot be represented.
    pub fn build_metrics(
        &self,
        sample: &SampleResult,
        properties: &Properties,
    ) -> Result<Vec<MetricTelemetry>, RecordError> {
        let timestamp = timestamp(sample)?;
        let fields = [
            (RESPONSE_TIME, sample.elapsed),
            (LATENCY, sample.latency),
            (CONNECT_TIME, sample.connect_time),
            (IDLE_TIME, sample.idle_time),
            (BYTES, sample.bytes),
            (SENT_BYTES, sample.sent_bytes),
        ];
        Ok(fields
            .into_iter()
            .map(|(field, value)| {
                let mut metric = MetricTelemetry::new(
                    format!("{}.{field}", self.test_name),
                    value as f64,
                    timestamp,
                );
                metric.operation_name = Some(self.test_name.clone());
                metric.properties = properties.clone();
                metric
            })
            .collect())
    }
}

fn timestamp(sample: &SampleResult) -> Result<DateTime<Utc>, RecordError> {
    DateTime::from_timestamp_millis(sample.timestamp)
        .ok_or(RecordError::InvalidTimestamp(sample.timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADERS: &str = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nX-Request-Id:  abc-123 \r\nx-cache: HIT\r\n";

    fn config() -> ListenerConfig {
        ListenerConfig {
            test_name: "checkout".to_owned(),
            test_start_time: 1_700_000_000_000,
            ..Default::default()
        }
    }

    fn sample() -> SampleResult {
        SampleResult {
            sample_label: "login".to_owned(),
            successful: true,
            response_code: "200".to_owned(),
            bytes: 2048,
            sent_bytes: 512,
            body_size: 1900,
            connect_time: 7,
            idle_time: 12,
            latency: 40,
            elapsed: 55,
            start_time: 1_700_000_001_000,
            end_time: 1_700_000_001_055,
            timestamp: 1_700_000_001_000,
            thread_name: "Thread Group 1-1".to_owned(),
            group_threads: 5,
            all_threads: 10,
            sample_count: 1,
            error_count: 0,
            url: Some("https://shop.example.com/login".to_owned()),
            response_headers: HEADERS.to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn test_fixed_fields() {
        let builder = RecordBuilder::new(&config()).unwrap();
        let properties = builder.properties(&sample());

        let expected = [
            (BYTES, "2048"),
            (SENT_BYTES, "512"),
            (CONNECT_TIME, "7"),
            (ERROR_COUNT, "0"),
            (IDLE_TIME, "12.0"),
            (LATENCY, "40.0"),
            (BODY_SIZE, "1900"),
            (TEST_START_TIME, "1700000000000"),
            (SAMPLE_START_TIME, "1700000001000"),
            (SAMPLE_END_TIME, "1700000001055"),
            (SAMPLE_LABEL, "login"),
            (THREAD_NAME, "Thread Group 1-1"),
            (URL, "https://shop.example.com/login"),
            (RESPONSE_CODE, "200"),
            (GRP_THREADS, "5"),
            (ALL_THREADS, "10"),
            (SAMPLE_COUNT, "1"),
        ];
        for (key, value) in expected {
            assert_eq!(properties.get(key).map(String::as_str), Some(value), "{key}");
        }
        assert_eq!(properties.len(), expected.len());
    }

    #[test]
    fn test_fixed_fields_win_over_custom_properties() {
        let mut config = config();
        config.custom_properties = [("Bytes", "999"), ("environment", "staging")]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        let builder = RecordBuilder::new(&config).unwrap();
        let properties = builder.properties(&sample());
        assert_eq!(properties[BYTES], "2048");
        assert_eq!(properties["environment"], "staging");
    }

    #[test]
    fn test_reserved_custom_properties_are_dropped() {
        let mut config = config();
        config.response_headers = vec!["x-missing".to_owned()];
        config.custom_properties = [
            ("SampleData", "custom"),
            ("ResponseData", "custom"),
            ("aih.x-missing", "custom"),
            ("", "empty"),
            ("region", "westeurope"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();
        let builder = RecordBuilder::new(&config).unwrap();
        let properties = builder.properties(&sample());

        assert!(!properties.contains_key("SampleData"));
        assert!(!properties.contains_key("ResponseData"));
        assert!(!properties.contains_key("aih.x-missing"));
        assert!(!properties.contains_key(""));
        assert_eq!(properties["region"], "westeurope");
    }

    #[test]
    fn test_is_reserved_property() {
        assert!(is_reserved_property("SampleData"));
        assert!(is_reserved_property("ResponseData"));
        assert!(is_reserved_property("aih.content-type"));
        assert!(!is_reserved_property("sampledata"));
        assert!(!is_reserved_property("Bytes"));
    }

    #[test]
    fn test_missing_url() {
        let builder = RecordBuilder::new(&config()).unwrap();
        let mut sample = sample();
        sample.url = None;
        let request = builder.build_request(&sample).unwrap();
        assert_eq!(request.properties[URL], "");
        assert!(request.url.is_none());
    }

    #[test]
    fn test_header_extraction() {
        let mut config = config();
        config.response_headers = vec![
            "x-request-id".to_owned(),
            "content-type".to_owned(),
            "x-missing".to_owned(),
        ];
        let builder = RecordBuilder::new(&config).unwrap();
        let properties = builder.properties(&sample());
        assert_eq!(properties["aih.x-request-id"], "abc-123");
        assert_eq!(properties["aih.content-type"], "application/json");
        assert!(!properties.contains_key("aih.x-missing"));
    }

    #[test]
    fn test_header_name_is_matched_literally() {
        let mut config = config();
        config.response_headers = vec!["x.cache".to_owned(), "x-(".to_owned()];
        let builder = RecordBuilder::new(&config).unwrap();
        let properties = builder.properties(&sample());
        assert!(!properties.contains_key("aih.x.cache"));
        assert!(!properties.contains_key("aih.x-("));
    }

    #[test]
    fn test_header_must_start_a_line() {
        let mut config = config();
        config.response_headers = vec!["request-id".to_owned()];
        let builder = RecordBuilder::new(&config).unwrap();
        let properties = builder.properties(&sample());
        assert!(!properties.contains_key("aih.request-id"));
    }

    #[test]
    fn test_build_request() {
        let builder = RecordBuilder::new(&config()).unwrap();
        let request = builder.build_request(&sample()).unwrap();
        assert_eq!(request.name, "checkout");
        assert_eq!(request.operation_name.as_deref(), Some("checkout"));
        assert_eq!(request.timestamp.timestamp_millis(), 1_700_000_001_000);
        assert_eq!(request.duration, Duration::from_millis(55));
        assert_eq!(request.response_code, "200");
        assert!(request.success);
        assert_eq!(request.url.as_deref(), Some("https://shop.example.com/login"));
    }

    #[test]
    fn test_success_follows_sample_flag() {
        let builder = RecordBuilder::new(&config()).unwrap();
        let mut sample = sample();
        sample.successful = false;
        sample.error_count = 0;
        assert!(!builder.build_request(&sample).unwrap().success);
    }

    #[test]
    fn test_invalid_timestamp() {
        let builder = RecordBuilder::new(&config()).unwrap();
        let mut sample = sample();
        sample.timestamp = i64::MAX;
        assert_eq!(
            builder.build_request(&sample).unwrap_err(),
            RecordError::InvalidTimestamp(i64::MAX)
        );
        assert!(builder.build_metrics(&sample, &Properties::new()).is_err());
    }

    #[test]
    fn test_build_metrics() {
        let builder = RecordBuilder::new(&config()).unwrap();
        let sample = sample();
        let properties = builder.properties(&sample);
        let metrics = builder.build_metrics(&sample, &properties).unwrap();

        let values: Vec<(&str, f64)> = metrics
            .iter()
            .map(|m| (m.name.as_str(), m.value))
            .collect();
        assert_eq!(
            values,
            [
                ("checkout.ResponseTime", 55.0),
                ("checkout.Latency", 40.0),
                ("checkout.ConnectTime", 7.0),
                ("checkout.IdleTime", 12.0),
                ("checkout.Bytes", 2048.0),
                ("checkout.SentBytes", 512.0),
            ]
        );
        for metric in &metrics {
            assert_eq!(metric.properties, properties);
            assert_eq!(metric.operation_name.as_deref(), Some("checkout"));
            assert_eq!(metric.timestamp.timestamp_millis(), sample.timestamp);
        }
    }
}
