// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Global `tracing` setup for the listener.
//!
//! The load-test host owns the process, so nothing is installed implicitly: the host (or the
//! listener, when asked to through its parameters) calls one of the `logger_configure_*`
//! functions, which install a global subscriber on first use and reconfigure it afterwards.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

mod logger;

pub use logger::{
    logger_configure_file, logger_configure_std, logger_disable_file, logger_disable_std,
    logger_set_log_level, FileConfig, LogError, LogEventLevel, StdConfig, StdTarget,
};
