// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicU64, Ordering};

use insights_client::{AppInsightsClient, Connect, TelemetryClient};
use insights_log::{
    logger_configure_file, logger_configure_std, logger_set_log_level, FileConfig, StdConfig,
    StdTarget,
};
use tracing::{debug, info, warn};

use crate::config::{ListenerConfig, TelemetryType};
use crate::context::ListenerContext;
use crate::error::{ConfigError, ListenerError, RecordError};
use crate::payload::attach_payloads;
use crate::record::RecordBuilder;
use crate::sample::SampleResult;
use crate::sampler_filter::SamplerFilter;

/// Lifecycle of a backend listener, driven by the load-test host.
///
/// `setup_test` is called once before the run, `handle_sample_results` concurrently from the host
/// worker threads, `teardown_test` once after every worker has stopped.
pub trait BackendListenerClient: Sized {
    /// Parameters offered to the user, with their default values.
    fn default_parameters() -> ListenerContext;

    /// # Errors
    /// Fails on invalid parameters or when the telemetry client cannot be created.
    fn setup_test(ctx: &ListenerContext) -> Result<Self, ListenerError>;

    /// # Errors
    /// Fails when the telemetry client rejects an item.
    fn handle_sample_results(&self, results: &[SampleResult]) -> Result<(), ListenerError>;

    /// # Errors
    /// Fails when the final flush fails.
    fn teardown_test(&mut self) -> Result<(), ListenerError>;
}

/// Sample counters since setup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub received: u64,
    /// Samples rejected by the sampler filter.
    pub filtered: u64,
    /// Samples that could not be turned into telemetry.
    pub skipped: u64,
    pub reported: u64,
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    filtered: AtomicU64,
    skipped: AtomicU64,
    reported: AtomicU64,
}

/// Listener forwarding samples to Application Insights.
#[derive(Debug)]
pub struct AzureBackendListener<C = AppInsightsClient> {
    config: ListenerConfig,
    filter: SamplerFilter,
    records: RecordBuilder,
    client: C,
    counters: Counters,
}

impl<C: TelemetryClient> AzureBackendListener<C> {
    /// Builds a listener around an existing client.
    ///
    /// # Errors
    /// Fails when the sampler list or a response header name is invalid.
    pub fn with_client(config: ListenerConfig, client: C) -> Result<Self, ConfigError> {
        let (filter, records) = compile(&config)?;
        Ok(Self::from_parts(config, filter, records, client))
    }

    fn from_parts(
        config: ListenerConfig,
        filter: SamplerFilter,
        records: RecordBuilder,
        client: C,
    ) -> Self {
        Self {
            config,
            filter,
            records,
            client,
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn filter(&self) -> &SamplerFilter {
        &self.filter
    }

    pub fn stats(&self) -> ListenerStats {
        ListenerStats {
            received: self.counters.received.load(Ordering::Relaxed),
            filtered: self.counters.filtered.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
            reported: self.counters.reported.load(Ordering::Relaxed),
        }
    }

    fn report(&self, sample: &SampleResult) -> Result<(), ListenerError> {
        match self.config.telemetry_type {
            TelemetryType::Request => {
                let mut request = match self.records.build_request(sample) {
                    Ok(request) => request,
                    Err(e) => {
                        self.skip(sample, &e);
                        return Ok(());
                    }
                };
                attach_payloads(
                    &mut request.properties,
                    sample,
                    self.config.log_sample_data,
                    self.config.log_response_data,
                );
                self.client.track_request(request)?;
            }
            TelemetryType::Metric => {
                let mut properties = self.records.properties(sample);
                attach_payloads(
                    &mut properties,
                    sample,
                    self.config.log_sample_data,
                    self.config.log_response_data,
                );
                let metrics = match self.records.build_metrics(sample, &properties) {
                    Ok(metrics) => metrics,
                    Err(e) => {
                        self.skip(sample, &e);
                        return Ok(());
                    }
                };
                for metric in metrics {
                    self.client.track_metric(metric)?;
                }
            }
        }
        self.counters.reported.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn skip(&self, sample: &SampleResult, error: &RecordError) {
        self.counters.skipped.fetch_add(1, Ordering::Relaxed);
        warn!(label = sample.sample_label, error = %error, "Skipping sample");
    }
}

impl<C: Connect> BackendListenerClient for AzureBackendListener<C> {
    fn default_parameters() -> ListenerContext {
        ListenerConfig::default_parameters()
    }

    fn setup_test(ctx: &ListenerContext) -> Result<Self, ListenerError> {
        let config = ListenerConfig::from_context(ctx)?;
        configure_logging(&config);

        let connection_string = config
            .connection_string
            .clone()
            .ok_or(ConfigError::MissingCredentials)?;

        let (filter, records) = compile(&config)?;
        let client = C::connect(connection_string, config.live_metrics)?;
        info!(
            test_name = config.test_name,
            telemetry_type = config.telemetry_type.as_str(),
            live_metrics = config.live_metrics,
            log_sample_data = %config.log_sample_data,
            log_response_data = %config.log_response_data,
            "Backend listener set up"
        );
        Ok(Self::from_parts(config, filter, records, client))
    }

    fn handle_sample_results(&self, results: &[SampleResult]) -> Result<(), ListenerError> {
        for sample in results {
            self.counters.received.fetch_add(1, Ordering::Relaxed);
            if !self.filter.should_report(&sample.sample_label) {
                self.counters.filtered.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            self.report(sample)?;
        }
        debug!(batch_size = results.len(), "Handled sample batch");
        Ok(())
    }

    fn teardown_test(&mut self) -> Result<(), ListenerError> {
        self.filter.clear();
        self.client.flush()?;
        let stats = self.stats();
        info!(
            received = stats.received,
            filtered = stats.filtered,
            skipped = stats.skipped,
            reported = stats.reported,
            "Backend listener torn down"
        );
        Ok(())
    }
}

fn compile(config: &ListenerConfig) -> Result<(SamplerFilter, RecordBuilder), ConfigError> {
    let filter = SamplerFilter::new(&config.samplers_list, config.use_regex_for_sampler_list)?;
    let records = RecordBuilder::new(config)?;
    Ok((filter, records))
}

/// Applies the `logLevel` and `logFile` parameters to the global logger. Failures only warn.
fn configure_logging(config: &ListenerConfig) {
    if let Some(path) = &config.log_file {
        if let Err(e) = logger_configure_file(FileConfig { path: path.clone() }) {
            warn!(error = %e, "Failed to configure file logging");
        }
    } else if config.log_level.is_some() {
        if let Err(e) = logger_configure_std(StdConfig {
            target: StdTarget::Err,
        }) {
            warn!(error = %e, "Failed to configure logging");
        }
    }

    if let Some(level) = config.log_level {
        if let Err(e) = logger_set_log_level(level) {
            warn!(error = %e, "Failed to set log level");
        }
    }
}

#[cfg(test)]
mod tests {
    use insights_client::test_utils::InMemoryClient;
    use insights_client::ClientError;

    use super::*;
    use crate::config::DataLoggingOption;

    fn config() -> ListenerConfig {
        ListenerConfig {
            test_name: "checkout".to_owned(),
            test_start_time: 1_700_000_000_000,
            ..Default::default()
        }
    }

    fn sample(label: &str, successful: bool) -> SampleResult {
        SampleResult {
            sample_label: label.to_owned(),
            successful,
            response_code: if successful { "200" } else { "500" }.to_owned(),
            elapsed: 20,
            timestamp: 1_700_000_001_000,
            sampler_data: Some("POST /cart".to_owned()),
            response_data: b"ok".to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_with_client_rejects_invalid_regex() {
        let mut config = config();
        config.samplers_list = "[".to_owned();
        config.use_regex_for_sampler_list = true;
        let err = AzureBackendListener::with_client(config, InMemoryClient::new()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSamplerRegex { .. }));
    }

    #[test]
    fn test_filter_and_stats() {
        let mut config = config();
        config.samplers_list = "login;checkout".to_owned();
        let listener = AzureBackendListener::with_client(config, InMemoryClient::new()).unwrap();

        listener
            .handle_sample_results(&[
                sample("login", true),
                sample("search", true),
                sample("checkout", false),
            ])
            .unwrap();

        let labels: Vec<String> = listener
            .client()
            .requests()
            .into_iter()
            .map(|r| r.properties["SampleLabel"].clone())
            .collect();
        assert_eq!(labels, ["login", "checkout"]);
        assert_eq!(
            listener.stats(),
            ListenerStats {
                received: 3,
                filtered: 1,
                skipped: 0,
                reported: 2,
            }
        );
    }

    #[test]
    fn test_skipped_sample_does_not_stop_batch() {
        let listener = AzureBackendListener::with_client(config(), InMemoryClient::new()).unwrap();
        let mut bad = sample("bad", true);
        bad.timestamp = i64::MIN;

        listener
            .handle_sample_results(&[sample("a", true), bad, sample("b", true)])
            .unwrap();

        assert_eq!(listener.client().requests().len(), 2);
        assert_eq!(listener.stats().skipped, 1);
    }

    #[test]
    fn test_client_error_propagates() {
        let client = InMemoryClient::new();
        client.fail_tracking();
        let listener = AzureBackendListener::with_client(config(), client).unwrap();
        let err = listener
            .handle_sample_results(&[sample("a", true)])
            .unwrap_err();
        assert!(matches!(
            err,
            ListenerError::Client(ClientError::Http { status: 503, .. })
        ));
    }

    #[test]
    fn test_metric_telemetry() {
        let mut config = config();
        config.telemetry_type = TelemetryType::Metric;
        config.log_response_data = DataLoggingOption::Always;
        let listener = AzureBackendListener::with_client(config, InMemoryClient::new()).unwrap();

        listener
            .handle_sample_results(&[sample("login", true)])
            .unwrap();

        let metrics = listener.client().metrics();
        assert_eq!(metrics.len(), 6);
        assert!(listener.client().requests().is_empty());
        for metric in &metrics {
            assert_eq!(metric.properties["ResponseData"], "ok");
            assert!(!metric.properties.contains_key("SampleData"));
        }
        assert_eq!(listener.stats().reported, 1);
    }

    #[test]
    fn test_teardown_clears_filter_and_flushes() {
        let mut config = config();
        config.samplers_list = "login".to_owned();
        let mut listener =
            AzureBackendListener::with_client(config, InMemoryClient::new()).unwrap();

        listener.teardown_test().unwrap();

        assert_eq!(listener.client().flush_count(), 1);
        assert!(!listener.filter().should_report("login"));
    }

    #[test]
    fn test_setup_requires_credentials() {
        if std::env::var(crate::config::ENV_CONNECTION_STRING).is_ok() {
            return;
        }
        let ctx: ListenerContext = [("testName", "checkout")].into_iter().collect();
        let err = AzureBackendListener::<InMemoryClient>::setup_test(&ctx).unwrap_err();
        assert!(matches!(
            err,
            ListenerError::Config(ConfigError::MissingCredentials)
        ));
    }

    #[test]
    fn test_setup_connects_with_resolved_credentials() {
        let ctx: ListenerContext = [
            (
                "connectionString",
                "InstrumentationKey=22222222-2222-2222-2222-222222222222",
            ),
            ("liveMetrics", "false"),
        ]
        .into_iter()
        .collect();
        let listener = AzureBackendListener::<InMemoryClient>::setup_test(&ctx).unwrap();
        let client = listener.client();
        assert_eq!(
            client
                .connection_string
                .as_ref()
                .map(|cs| cs.instrumentation_key()),
            Some("22222222-2222-2222-2222-222222222222")
        );
        assert!(!client.live_metrics);
    }
}
