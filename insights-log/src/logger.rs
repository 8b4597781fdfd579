// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;
use std::str::FromStr;
use std::sync::{LazyLock, Mutex};

use thiserror::Error;
use tracing::subscriber::DefaultGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::reload::Handle;
use tracing_subscriber::{fmt, reload, EnvFilter, Layer, Registry};

#[derive(Debug, Error)]
pub enum LogError {
    #[error("logger not initialized")]
    NotInitialized,
    #[error("failed to set global default subscriber")]
    AlreadyInstalled,
    #[error("failed to acquire logger lock")]
    Poisoned,
    #[error("failed to update logger: {0}")]
    Reload(String),
    #[error("failed to open log file {path}: {reason}")]
    File { path: String, reason: String },
    #[error("unknown log level '{0}'")]
    UnknownLevel(String),
}

/// Log level for filtering log events.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogEventLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl FromStr for LogEventLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(LogError::UnknownLevel(s.to_owned())),
        }
    }
}

impl From<LogEventLevel> for LevelFilter {
    fn from(level: LogEventLevel) -> Self {
        match level {
            LogEventLevel::Trace => LevelFilter::TRACE,
            LogEventLevel::Debug => LevelFilter::DEBUG,
            LogEventLevel::Info => LevelFilter::INFO,
            LogEventLevel::Warn => LevelFilter::WARN,
            LogEventLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Configuration for file-based logging. Lines are written as JSON.
#[derive(Debug, Clone)]
pub struct FileConfig {
    pub path: String,
}

#[derive(Debug, Clone, Copy)]
pub enum StdTarget {
    Out,
    Err,
}

#[derive(Debug, Clone, Copy)]
pub struct StdConfig {
    pub target: StdTarget,
}

type BaseSubscriber = Layered<reload::Layer<EnvFilter, Registry>, Registry>;
type BoxedLayer = Box<dyn Layer<BaseSubscriber> + Send + Sync + 'static>;

struct Logger {
    layer_handle: Handle<Vec<BoxedLayer>, BaseSubscriber>,
    filter_handle: Handle<EnvFilter, Registry>,
    /// Only set for the thread-local subscriber used in tests.
    _guard: Option<DefaultGuard>,
    file_config: Option<FileConfig>,
    std_config: Option<StdConfig>,
}

impl Logger {
    #[cfg(test)]
    fn setup() -> Result<Self, LogError> {
        Self::setup_with_global(false)
    }

    fn setup_global() -> Result<Self, LogError> {
        Self::setup_with_global(true)
    }

    fn setup_with_global(global: bool) -> Result<Self, LogError> {
        let (filter_layer, filter_handle) = reload::Layer::new(env_filter());
        let (layers_layer, layer_handle) = reload::Layer::new(Vec::<BoxedLayer>::new());

        let subscriber = tracing_subscriber::registry()
            .with(filter_layer)
            .with(layers_layer);

        let guard = if global {
            tracing::subscriber::set_global_default(subscriber)
                .map_err(|_| LogError::AlreadyInstalled)?;
            None
        } else {
            Some(tracing::subscriber::set_default(subscriber))
        };

        Ok(Self {
            layer_handle,
            filter_handle,
            _guard: guard,
            file_config: None,
            std_config: None,
        })
    }

    /// Rebuilds the output layers from the current configuration.
    fn configure(&self) -> Result<(), LogError> {
        let file_layer = self.file_config.as_ref().map(file_layer).transpose()?;
        let std_layer = self.std_config.as_ref().map(std_layer);

        self.layer_handle
            .modify(|layers| {
                layers.clear();
                layers.extend(file_layer);
                layers.extend(std_layer);
            })
            .map_err(|e| LogError::Reload(e.to_string()))
    }

    fn configure_file(&mut self, file_config: FileConfig) -> Result<(), LogError> {
        self.file_config = Some(file_config);
        self.configure()
    }

    fn disable_file(&mut self) -> Result<(), LogError> {
        self.file_config = None;
        self.configure()
    }

    fn configure_std(&mut self, std_config: StdConfig) -> Result<(), LogError> {
        self.std_config = Some(std_config);
        self.configure()
    }

    fn disable_std(&mut self) -> Result<(), LogError> {
        self.std_config = None;
        self.configure()
    }

    fn set_log_level(&self, log_level: LogEventLevel) -> Result<(), LogError> {
        let level_filter = LevelFilter::from(log_level);
        self.filter_handle
            .modify(|filter| {
                *filter = EnvFilter::new(level_filter.to_string().to_lowercase());
            })
            .map_err(|e| LogError::Reload(e.to_string()))
    }
}

/// Environment filter honouring `RUST_LOG`, INFO otherwise.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(LevelFilter::INFO.to_string().to_lowercase()))
}

fn std_layer(config: &StdConfig) -> BoxedLayer {
    let layer = fmt::layer()
        .with_thread_names(true)
        .with_target(true)
        .with_ansi(false);
    match config.target {
        StdTarget::Out => layer.with_writer(std::io::stdout).boxed(),
        StdTarget::Err => layer.with_writer(std::io::stderr).boxed(),
    }
}

fn file_layer(config: &FileConfig) -> Result<BoxedLayer, LogError> {
    let path = Path::new(&config.path);
    let file_error = |reason: String| LogError::File {
        path: config.path.clone(),
        reason,
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| file_error("path has no file name".to_owned()))?;
    let directory = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(directory)
        .map_err(|e| file_error(e.to_string()))?;

    Ok(fmt::layer()
        .with_writer(appender)
        .with_thread_names(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .json()
        .boxed())
}

static LOGGER: LazyLock<Mutex<Option<Logger>>> = LazyLock::new(|| Mutex::new(None));

fn with_logger<F>(install: bool, f: F) -> Result<(), LogError>
where
    F: FnOnce(&mut Logger) -> Result<(), LogError>,
{
    let mut guard = LOGGER.lock().map_err(|_| LogError::Poisoned)?;
    match guard.as_mut() {
        Some(logger) => f(logger),
        None if install => {
            let mut logger = Logger::setup_global()?;
            f(&mut logger)?;
            *guard = Some(logger);
            Ok(())
        }
        None => Err(LogError::NotInitialized),
    }
}

/// Configures the global logger to write JSON lines to a file, installing it if needed.
pub fn logger_configure_file(file_config: FileConfig) -> Result<(), LogError> {
    with_logger(true, |logger| logger.configure_file(file_config))
}

/// Stops file logging, keeping the std stream output if any.
pub fn logger_disable_file() -> Result<(), LogError> {
    with_logger(false, Logger::disable_file)
}

/// Configures the global logger to write to stdout or stderr, installing it if needed.
pub fn logger_configure_std(std_config: StdConfig) -> Result<(), LogError> {
    with_logger(true, |logger| logger.configure_std(std_config))
}

/// Stops std stream logging, keeping the file output if any.
pub fn logger_disable_std() -> Result<(), LogError> {
    with_logger(false, Logger::disable_std)
}

/// Sets the minimum level of the global logger.
pub fn logger_set_log_level(log_level: LogEventLevel) -> Result<(), LogError> {
    with_logger(false, |logger| logger.set_log_level(log_level))
}
