// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Typed listener configuration built from the host parameters.

use std::fmt;

use insights_client::{ConnectionString, Properties};
use insights_log::LogEventLevel;
use tracing::warn;

use crate::context::ListenerContext;
use crate::error::ConfigError;
use crate::record::is_reserved_property;

pub const KEY_TEST_NAME: &str = "testName";
pub const KEY_CONNECTION_STRING: &str = "connectionString";
pub const KEY_INSTRUMENTATION_KEY: &str = "instrumentationKey";
pub const KEY_LIVE_METRICS: &str = "liveMetrics";
pub const KEY_SAMPLERS_LIST: &str = "samplersList";
pub const KEY_USE_REGEX_FOR_SAMPLER_LIST: &str = "useRegexForSamplerList";
pub const KEY_RESPONSE_HEADERS: &str = "responseHeaders";
pub const KEY_LOG_SAMPLE_DATA: &str = "logSampleData";
pub const KEY_LOG_RESPONSE_DATA: &str = "logResponseData";
pub const KEY_TELEMETRY_TYPE: &str = "telemetryType";
pub const KEY_LOG_LEVEL: &str = "logLevel";
pub const KEY_LOG_FILE: &str = "logFile";

pub const DEFAULT_TEST_NAME: &str = "jmeter";
pub const DEFAULT_LIVE_METRICS: bool = true;
pub const DEFAULT_USE_REGEX_FOR_SAMPLER_LIST: bool = false;

/// Prefix of parameters forwarded as custom properties. The prefix is stripped.
pub const CUSTOM_PROPERTIES_PREFIX: &str = "ai.";
/// Prefix of the properties holding extracted response headers.
pub const RESPONSE_HEADERS_PREFIX: &str = "aih.";

pub const ENV_CONNECTION_STRING: &str = "APPLICATIONINSIGHTS_CONNECTION_STRING";

/// When a payload is attached to the telemetry of a sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DataLoggingOption {
    Always,
    #[default]
    OnFailure,
    Never,
}

impl DataLoggingOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "Always",
            Self::OnFailure => "OnFailure",
            Self::Never => "Never",
        }
    }

    /// Parses a parameter value. Never fails: legacy `true`/`false` map to `Always`/`Never`,
    /// anything unrecognised falls back to `OnFailure`.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("always") {
            Self::Always
        } else if value.eq_ignore_ascii_case("onfailure") {
            Self::OnFailure
        } else if value.eq_ignore_ascii_case("never") {
            Self::Never
        } else if value.eq_ignore_ascii_case("true") {
            warn!(value, "Boolean data logging option is deprecated, use Always");
            Self::Always
        } else if value.eq_ignore_ascii_case("false") {
            warn!(value, "Boolean data logging option is deprecated, use Never");
            Self::Never
        } else {
            if !value.is_empty() {
                warn!(value, "Unknown data logging option, using OnFailure");
            }
            Self::OnFailure
        }
    }

    /// Whether a payload is attached for a sample with the given outcome.
    pub fn permits(&self, successful: bool) -> bool {
        match self {
            Self::Always => true,
            Self::OnFailure => !successful,
            Self::Never => false,
        }
    }
}

impl From<&str> for DataLoggingOption {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl fmt::Display for DataLoggingOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of the telemetry produced for each sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TelemetryType {
    /// One request item per sample.
    #[default]
    Request,
    /// One metric item per numeric sample field.
    Metric,
}

impl TelemetryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Metric => "metric",
        }
    }

    fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.eq_ignore_ascii_case("metric") || value.eq_ignore_ascii_case("metrics") {
            Self::Metric
        } else {
            if !value.is_empty() && !value.eq_ignore_ascii_case("request") {
                warn!(value, "Unknown telemetry type, using request");
            }
            Self::Request
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListenerConfig {
    pub test_name: String,
    /// Resolved credentials. `None` only when nothing was configured.
    pub connection_string: Option<ConnectionString>,
    pub live_metrics: bool,
    /// Trimmed sampler list; empty reports every sample.
    pub samplers_list: String,
    pub use_regex_for_sampler_list: bool,
    /// Lower-cased header names to extract.
    pub response_headers: Vec<String>,
    pub log_sample_data: DataLoggingOption,
    pub log_response_data: DataLoggingOption,
    pub telemetry_type: TelemetryType,
    pub custom_properties: Properties,
    pub log_level: Option<LogEventLevel>,
    pub log_file: Option<String>,
    /// Start of the test run, milliseconds since the Unix epoch.
    pub test_start_time: i64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            test_name: DEFAULT_TEST_NAME.to_owned(),
            connection_string: None,
            live_metrics: DEFAULT_LIVE_METRICS,
            samplers_list: String::new(),
            use_regex_for_sampler_list: DEFAULT_USE_REGEX_FOR_SAMPLER_LIST,
            response_headers: Vec::new(),
            log_sample_data: DataLoggingOption::default(),
            log_response_data: DataLoggingOption::default(),
            telemetry_type: TelemetryType::default(),
            custom_properties: Properties::new(),
            log_level: None,
            log_file: None,
            test_start_time: 0,
        }
    }
}

impl ListenerConfig {
    /// Reads the configuration from the host parameters, falling back to the
    /// `APPLICATIONINSIGHTS_CONNECTION_STRING` environment variable for credentials.
    ///
    /// # Errors
    /// Fails when the configured connection string or instrumentation key is malformed.
    pub fn from_context(ctx: &ListenerContext) -> Result<Self, ConfigError> {
        Self::from_context_with_env(ctx, std::env::var(ENV_CONNECTION_STRING).ok())
    }

    /// Same as [`ListenerConfig::from_context`] with an explicit environment value.
    pub fn from_context_with_env(
        ctx: &ListenerContext,
        env_connection_string: Option<String>,
    ) -> Result<Self, ConfigError> {
        let connection_string = resolve_credentials(ctx, env_connection_string)?;

        let response_headers = ctx
            .get_parameter(KEY_RESPONSE_HEADERS)
            .map(parse_header_names)
            .unwrap_or_default();

        let custom_properties = ctx
            .parameter_names()
            .filter_map(|name| {
                let key = name.strip_prefix(CUSTOM_PROPERTIES_PREFIX)?;
                if key.is_empty() {
                    warn!(name, "Ignoring custom property without a name");
                    return None;
                }
                if is_reserved_property(key) {
                    warn!(name, "Ignoring custom property with a reserved name");
                    return None;
                }
                let value = ctx.get_parameter(name)?;
                Some((key.to_owned(), value.to_owned()))
            })
            .collect();

        let log_level = ctx
            .get_parameter(KEY_LOG_LEVEL)
            .filter(|value| !value.trim().is_empty())
            .and_then(|value| match value.parse::<LogEventLevel>() {
                Ok(level) => Some(level),
                Err(e) => {
                    warn!(error = %e, "Ignoring log level");
                    None
                }
            });

        let log_file = ctx
            .get_parameter(KEY_LOG_FILE)
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(str::to_owned);

        let test_start_time = ctx
            .test_start_time()
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

        Ok(Self {
            test_name: ctx
                .get_parameter_or(KEY_TEST_NAME, DEFAULT_TEST_NAME)
                .to_owned(),
            connection_string,
            live_metrics: ctx.get_bool_parameter(KEY_LIVE_METRICS, DEFAULT_LIVE_METRICS),
            samplers_list: ctx
                .get_parameter_or(KEY_SAMPLERS_LIST, "")
                .trim()
                .to_owned(),
            use_regex_for_sampler_list: ctx.get_bool_parameter(
                KEY_USE_REGEX_FOR_SAMPLER_LIST,
                DEFAULT_USE_REGEX_FOR_SAMPLER_LIST,
            ),
            response_headers,
            log_sample_data: ctx
                .get_parameter(KEY_LOG_SAMPLE_DATA)
                .map(DataLoggingOption::parse)
                .unwrap_or_default(),
            log_response_data: ctx
                .get_parameter(KEY_LOG_RESPONSE_DATA)
                .map(DataLoggingOption::parse)
                .unwrap_or_default(),
            telemetry_type: ctx
                .get_parameter(KEY_TELEMETRY_TYPE)
                .map(TelemetryType::parse)
                .unwrap_or_default(),
            custom_properties,
            log_level,
            log_file,
            test_start_time,
        })
    }

    /// Parameters the host shows when the listener is added to a test plan.
    pub fn default_parameters() -> ListenerContext {
        let mut ctx = ListenerContext::new();
        ctx.add_argument(KEY_TEST_NAME, DEFAULT_TEST_NAME)
            .add_argument(KEY_CONNECTION_STRING, "")
            .add_argument(KEY_LIVE_METRICS, DEFAULT_LIVE_METRICS.to_string())
            .add_argument(KEY_SAMPLERS_LIST, "")
            .add_argument(
                KEY_USE_REGEX_FOR_SAMPLER_LIST,
                DEFAULT_USE_REGEX_FOR_SAMPLER_LIST.to_string(),
            )
            .add_argument(KEY_RESPONSE_HEADERS, "")
            .add_argument(KEY_LOG_SAMPLE_DATA, DataLoggingOption::default().as_str())
            .add_argument(KEY_LOG_RESPONSE_DATA, DataLoggingOption::default().as_str())
            .add_argument(KEY_TELEMETRY_TYPE, TelemetryType::default().as_str())
            .add_argument(KEY_LOG_LEVEL, "")
            .add_argument(KEY_LOG_FILE, "");
        ctx
    }
}

/// Header names are split on `;`, trimmed and lower-cased. Empty names are dropped.
fn parse_header_names(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

fn resolve_credentials(
    ctx: &ListenerContext,
    env_connection_string: Option<String>,
) -> Result<Option<ConnectionString>, ConfigError> {
    let non_empty = |value: &str| {
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_owned())
    };

    if let Some(connection_string) = ctx.get_parameter(KEY_CONNECTION_STRING).and_then(non_empty) {
        return ConnectionString::parse(&connection_string)
            .map(Some)
            .map_err(ConfigError::InvalidConnectionString);
    }

    if let Some(key) = ctx.get_parameter(KEY_INSTRUMENTATION_KEY).and_then(non_empty) {
        warn!("instrumentationKey is deprecated, use connectionString instead");
        return ConnectionString::from_instrumentation_key(&key)
            .map(Some)
            .map_err(ConfigError::InvalidConnectionString);
    }

    match env_connection_string.as_deref().and_then(non_empty) {
        Some(connection_string) => ConnectionString::parse(&connection_string)
            .map(Some)
            .map_err(ConfigError::InvalidConnectionString),
        None => Ok(None),
    }
}
