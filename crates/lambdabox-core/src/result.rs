//! Execution result types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Outcome class of a lambda invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum StatusCode {
    RuntimeError = 0,
    Ok = 1,
    SignatureInvalid = 3,
}

impl StatusCode {
    /// Fixed summary reported alongside the code
    #[must_use]
    pub const fn status_message(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::RuntimeError => "ERROR",
            Self::SignatureInvalid => {
                "ERROR: The function signature is not valid. It should be function(data)"
            }
        }
    }
}

impl From<StatusCode> for u8 {
    fn from(code: StatusCode) -> Self {
        code as Self
    }
}

impl TryFrom<u8> for StatusCode {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::RuntimeError),
            1 => Ok(Self::Ok),
            3 => Ok(Self::SignatureInvalid),
            other => Err(format!("unknown status code {other}")),
        }
    }
}

/// Result of a lambda invocation
///
/// Built through [`ExecutionResult::ok`], [`ExecutionResult::runtime_error`]
/// or [`ExecutionResult::signature_invalid`] so the field presence always
/// matches the status code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub status_code: StatusCode,

    pub status_message: String,

    /// Set iff the status is not `Ok`
    pub error: Option<String>,

    /// Value returned by the lambda, set iff the status is `Ok`
    pub response: Option<Value>,

    /// Captured console writes, one JSON text per write
    pub console_output: Option<Vec<String>>,

    /// Wall-clock time of the sandboxed call
    pub execution_time_in_ms: Option<f64>,
}

impl ExecutionResult {
    #[must_use]
    pub fn ok(response: Value, console_output: Vec<String>, elapsed: Duration) -> Self {
        Self {
            status_code: StatusCode::Ok,
            status_message: StatusCode::Ok.status_message().to_owned(),
            error: None,
            response: Some(response),
            console_output: Some(console_output),
            execution_time_in_ms: Some(elapsed.as_secs_f64() * 1000.0),
        }
    }

    /// Terminal failure. Partial console output and timing are discarded.
    #[must_use]
    pub fn runtime_error(message: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::RuntimeError,
            status_message: StatusCode::RuntimeError.status_message().to_owned(),
            error: Some(message.into()),
            response: None,
            console_output: None,
            execution_time_in_ms: None,
        }
    }

    /// Rejected before execution was attempted
    #[must_use]
    pub fn signature_invalid(message: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::SignatureInvalid,
            status_message: StatusCode::SignatureInvalid.status_message().to_owned(),
            error: Some(message.into()),
            response: None,
            console_output: Some(Vec::new()),
            execution_time_in_ms: Some(0.0),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code == StatusCode::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_code_serializes_as_integer() {
        assert_eq!(serde_json::to_value(StatusCode::SignatureInvalid).unwrap(), json!(3));
        let code: StatusCode = serde_json::from_value(json!(0)).unwrap();
        assert_eq!(code, StatusCode::RuntimeError);
        assert!(serde_json::from_value::<StatusCode>(json!(2)).is_err());
    }

    #[test]
    fn ok_result_wire_shape() {
        let result = ExecutionResult::ok(json!(6), vec!["\"hi\"".into()], Duration::from_millis(2));
        let wire = serde_json::to_value(&result).unwrap();
        assert_eq!(wire["statusCode"], json!(1));
        assert_eq!(wire["statusMessage"], json!("OK"));
        assert_eq!(wire["error"], Value::Null);
        assert_eq!(wire["response"], json!(6));
        assert_eq!(wire["consoleOutput"], json!(["\"hi\""]));
        assert!((wire["executionTimeInMs"].as_f64().unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn runtime_error_discards_output_and_timing() {
        let result = ExecutionResult::runtime_error("boom");
        assert_eq!(result.status_message, "ERROR");
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert_eq!(result.response, None);
        assert_eq!(result.console_output, None);
        assert_eq!(result.execution_time_in_ms, None);
    }

    #[test]
    fn signature_invalid_has_zero_time_and_empty_output() {
        let result = ExecutionResult::signature_invalid("bad");
        assert_eq!(result.status_code, StatusCode::SignatureInvalid);
        assert_eq!(result.console_output, Some(Vec::new()));
        assert_eq!(result.execution_time_in_ms, Some(0.0));
        assert!(!result.is_success());
    }
}
