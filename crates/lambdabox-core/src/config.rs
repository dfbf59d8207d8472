//! Sandbox configuration

use crate::{LambdaError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Smallest V8 heap a sandbox may be configured with
pub const MIN_HEAP_SIZE: usize = 8 * 1024 * 1024;

const MIB: usize = 1024 * 1024;

/// Configuration for a sandbox instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Maximum wall-clock time of a single lambda call. `None` means the call
    /// is never interrupted.
    pub timeout: Option<Duration>,

    /// V8 heap limit in bytes
    pub max_heap_size: usize,

    /// Bytes of console output a single call may capture
    pub max_console_bytes: usize,

    /// Rebuild the isolate after this many executions. Values above 1 let
    /// globals written by one call be seen by the next ones on that isolate.
    pub recycle_after: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            max_heap_size: 64 * MIB,
            max_console_bytes: MIB,
            recycle_after: 1,
        }
    }
}

impl SandboxConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> SandboxConfigBuilder {
        SandboxConfigBuilder::default()
    }

    /// Load a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `LAMBDABOX_*` environment overrides on top of `self`
    ///
    /// - `LAMBDABOX_TIMEOUT_MS` - call timeout, `0` disables it
    /// - `LAMBDABOX_MAX_HEAP_MB` - V8 heap limit
    /// - `LAMBDABOX_MAX_CONSOLE_BYTES` - console output cap per call
    /// - `LAMBDABOX_RECYCLE_AFTER` - executions per isolate
    pub fn with_env(self) -> Result<Self> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    /// Default config with environment overrides applied
    pub fn from_env() -> Result<Self> {
        Self::default().with_env()
    }

    fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(ms) = lookup("LAMBDABOX_TIMEOUT_MS") {
            let ms = parse_var::<u64>("LAMBDABOX_TIMEOUT_MS", &ms)?;
            self.timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }
        if let Some(mb) = lookup("LAMBDABOX_MAX_HEAP_MB") {
            let mb = parse_var::<usize>("LAMBDABOX_MAX_HEAP_MB", &mb)?;
            self.max_heap_size = mb.checked_mul(MIB).ok_or_else(|| {
                LambdaError::Config(format!("LAMBDABOX_MAX_HEAP_MB: {mb} MiB overflows usize"))
            })?;
        }
        if let Some(bytes) = lookup("LAMBDABOX_MAX_CONSOLE_BYTES") {
            self.max_console_bytes = parse_var("LAMBDABOX_MAX_CONSOLE_BYTES", &bytes)?;
        }
        if let Some(n) = lookup("LAMBDABOX_RECYCLE_AFTER") {
            self.recycle_after = parse_var("LAMBDABOX_RECYCLE_AFTER", &n)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject configurations the sandbox cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.recycle_after == 0 {
            return Err(LambdaError::Config("recycle_after must be at least 1".into()));
        }
        if self.max_heap_size < MIN_HEAP_SIZE {
            return Err(LambdaError::Config(format!(
                "max_heap_size must be at least {MIN_HEAP_SIZE} bytes, got {}",
                self.max_heap_size
            )));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(LambdaError::Config("timeout must be positive".into()));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| LambdaError::Config(format!("{key}: invalid value {value:?}")))
}

/// Builder for SandboxConfig
#[derive(Debug, Default)]
pub struct SandboxConfigBuilder {
    config: SandboxConfig,
}

impl SandboxConfigBuilder {
    #[must_use]
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.config.timeout = Some(duration);
        self
    }

    #[must_use]
    pub fn timeout_ms(self, ms: u64) -> Self {
        self.timeout(Duration::from_millis(ms))
    }

    #[must_use]
    pub fn no_timeout(mut self) -> Self {
        self.config.timeout = None;
        self
    }

    #[must_use]
    pub fn max_heap_size(mut self, bytes: usize) -> Self {
        self.config.max_heap_size = bytes;
        self
    }

    #[must_use]
    pub fn max_heap_size_mb(self, mb: usize) -> Self {
        self.max_heap_size(mb.saturating_mul(MIB))
    }

    #[must_use]
    pub fn max_console_bytes(mut self, bytes: usize) -> Self {
        self.config.max_console_bytes = bytes;
        self
    }

    #[must_use]
    pub fn recycle_after(mut self, executions: u64) -> Self {
        self.config.recycle_after = executions;
        self
    }

    #[must_use]
    pub fn build(self) -> SandboxConfig {
        self.config
    }
}
