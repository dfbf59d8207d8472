//! Error types for lambdabox-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LambdaError {
    #[error("{0}")]
    Transpile(String),

    /// Exception raised by the lambda or while loading it. Displays the
    /// exception message verbatim.
    #[error("{0}")]
    Runtime(String),

    #[error("timeout after {0} ms")]
    Timeout(u64),

    #[error("heap limit exceeded")]
    HeapLimitExceeded,

    #[error("console output limit exceeded")]
    ConsoleLimitExceeded,

    #[error("sandbox error: {0}")]
    Sandbox(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("msgpack encode error: {0}")]
    MessagePackEncode(#[from] rmp_serde::encode::Error),

    #[error("msgpack decode error: {0}")]
    MessagePackDecode(#[from] rmp_serde::decode::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl LambdaError {
    /// Whether the sandbox that produced this error must be torn down
    #[must_use]
    pub const fn poisons_sandbox(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::HeapLimitExceeded | Self::ConsoleLimitExceeded | Self::Sandbox(_)
        )
    }
}
