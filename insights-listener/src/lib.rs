// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Backend listener forwarding load-test samples to Application Insights.
//!
//! The load-test host drives the listener through [`BackendListenerClient`]: it calls
//! `setup_test` once with the listener parameters, `handle_sample_results` for every batch of
//! completed samples (possibly from several threads), and `teardown_test` once at the end.
//!
//! Each sample goes through three stages:
//!
//! 1. [`SamplerFilter`] decides whether the sample is reported at all,
//! 2. [`RecordBuilder`] turns it into request (or metric) telemetry with a property map,
//! 3. [`payload::attach_payloads`] adds truncated request and response data when the configured
//!    [`DataLoggingOption`] allows it.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod config;
pub mod context;
pub mod error;
pub mod listener;
pub mod payload;
pub mod record;
pub mod sample;
pub mod sampler_filter;

pub use config::{DataLoggingOption, ListenerConfig, TelemetryType};
pub use context::ListenerContext;
pub use error::{ConfigError, ListenerError, RecordError};
pub use listener::{AzureBackendListener, BackendListenerClient, ListenerStats};
pub use record::RecordBuilder;
pub use sample::{DataType, SampleResult};
pub use sampler_filter::SamplerFilter;
