//! Run settings.

use std::path::PathBuf;
use std::time::Duration;

use apex_coverage_core::ReportLayout;
use apex_coverage_tooling::{PollOptions, TestClassFilter};

use crate::error::{Error, Result};

/// How the discovered tests are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Enqueue with `runTestsAsynchronous` and poll the job.
    #[default]
    Async,
    /// One blocking `runTestsSynchronous` call.
    Sync,
}

impl ExecutionMode {
    /// Parse `async` / `sync`, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "async" | "asynchronous" => Some(Self::Async),
            "sync" | "synchronous" => Some(Self::Sync),
            _ => None,
        }
    }
}

/// Everything a coverage run needs besides the org session.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Where the report is written.
    pub output_path: PathBuf,
    /// Which classes count as tests.
    pub test_filter: TestClassFilter,
    pub mode: ExecutionMode,
    /// Async job polling.
    pub poll: PollOptions,
    pub layout: ReportLayout,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("coverage.json"),
            test_filter: TestClassFilter::default(),
            mode: ExecutionMode::default(),
            poll: PollOptions::default(),
            layout: ReportLayout::default(),
        }
    }
}

impl RunSettings {
    /// Create a new settings builder.
    pub fn builder() -> RunSettingsBuilder {
        RunSettingsBuilder::default()
    }

    /// Load settings from `COVERAGE_*` environment variables.
    ///
    /// Unset or empty variables keep their defaults:
    /// - `COVERAGE_OUTPUT` (`coverage.json`)
    /// - `COVERAGE_TEST_PATTERN` (`%Test%`)
    /// - `COVERAGE_NAMESPACE` (unpackaged classes only)
    /// - `COVERAGE_MODE` (`async` or `sync`)
    /// - `COVERAGE_POLL_INTERVAL_SECS` (10)
    /// - `COVERAGE_TIMEOUT_SECS` (1800)
    /// - `COVERAGE_LAYOUT` (`flat` or `enveloped`)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = Self::builder();

        if let Some(path) = get("COVERAGE_OUTPUT") {
            builder = builder.with_output_path(path);
        }
        if let Some(pattern) = get("COVERAGE_TEST_PATTERN") {
            builder = builder.with_test_pattern(pattern);
        }
        if let Some(namespace) = get("COVERAGE_NAMESPACE") {
            builder = builder.with_namespace(namespace);
        }
        if let Some(mode) = get("COVERAGE_MODE") {
            let mode = ExecutionMode::from_name(&mode).ok_or_else(|| {
                Error::settings("COVERAGE_MODE", format!("expected async or sync, got '{}'", mode))
            })?;
            builder = builder.with_mode(mode);
        }
        if let Some(secs) = get("COVERAGE_POLL_INTERVAL_SECS") {
            builder = builder.with_poll_interval(parse_secs("COVERAGE_POLL_INTERVAL_SECS", &secs)?);
        }
        if let Some(secs) = get("COVERAGE_TIMEOUT_SECS") {
            builder = builder.with_timeout(parse_secs("COVERAGE_TIMEOUT_SECS", &secs)?);
        }
        if let Some(layout) = get("COVERAGE_LAYOUT") {
            let layout = ReportLayout::from_name(&layout).ok_or_else(|| {
                Error::settings(
                    "COVERAGE_LAYOUT",
                    format!("expected flat or enveloped, got '{}'", layout),
                )
            })?;
            builder = builder.with_layout(layout);
        }

        Ok(builder.build())
    }
}

fn parse_secs(name: &'static str, value: &str) -> Result<Duration> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(Error::settings(name, "must be greater than zero")),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(Error::settings(name, format!("'{}': {}", value, e))),
    }
}

/// Builder for RunSettings.
#[derive(Debug, Default)]
pub struct RunSettingsBuilder {
    settings: RunSettings,
}

impl RunSettingsBuilder {
    /// Set the report path.
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.output_path = path.into();
        self
    }

    /// Set the SOQL LIKE pattern for test class names.
    pub fn with_test_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.settings.test_filter.name_pattern = pattern.into();
        self
    }

    /// Search a namespace instead of unpackaged classes.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.settings.test_filter.namespace = Some(namespace.into());
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.settings.mode = mode;
        self
    }

    /// Set the delay between async job status checks.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.settings.poll.interval = interval;
        self
    }

    /// Set how long to wait for the async job.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.settings.poll.timeout = timeout;
        self
    }

    pub fn with_layout(mut self, layout: ReportLayout) -> Self {
        self.settings.layout = layout;
        self
    }

    /// Build the settings.
    pub fn build(self) -> RunSettings {
        self.settings
    }
}
