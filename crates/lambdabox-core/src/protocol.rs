//! Wire format for callers handing lambdas to the pipeline
//!
//! Requests and results travel either as MessagePack or as JSON. The payload
//! and the response stay dynamic JSON values on both encodings.

use crate::{ExecutionResult, LambdaDefinition, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request to run a lambda once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub lambda: LambdaDefinition,
    /// Input payload, `null` when omitted
    #[serde(default)]
    pub data: Value,
}

/// Wire encodings understood by [`decode_as`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    MessagePack,
}

impl Encoding {
    /// Pick an encoding from a file extension (`json`, `msgpack`, `mpk`)
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "msgpack" | "mpk" => Some(Self::MessagePack),
            _ => None,
        }
    }
}

/// Encode a message to msgpack
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(msg)?)
}

/// Decode a message from msgpack
pub fn decode<'a, T: Deserialize<'a>>(data: &'a [u8]) -> Result<T> {
    Ok(rmp_serde::from_slice(data)?)
}

/// Decode bytes in the given encoding
pub fn decode_as<T: for<'a> Deserialize<'a>>(data: &[u8], encoding: Encoding) -> Result<T> {
    match encoding {
        Encoding::Json => Ok(serde_json::from_slice(data)?),
        Encoding::MessagePack => decode(data),
    }
}

/// Encode an execution result for the caller
pub fn encode_result(result: &ExecutionResult, encoding: Encoding) -> Result<Vec<u8>> {
    match encoding {
        Encoding::Json => Ok(serde_json::to_vec(result)?),
        Encoding::MessagePack => encode(result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Language, StatusCode};
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn request_from_json_without_data() {
        let req: ExecuteRequest = decode_as(
            br#"{ "lambda": { "body": "function(d) { return d; }", "language": "JAVASCRIPT" } }"#,
            Encoding::Json,
        )
        .unwrap();
        assert_eq!(req.lambda.language, Language::JavaScript);
        assert_eq!(req.data, Value::Null);
    }

    #[test]
    fn request_survives_msgpack() {
        let req = ExecuteRequest {
            lambda: LambdaDefinition::typescript("function(d: { x: number }) { return d.x; }"),
            data: json!({ "x": 5, "tags": ["a", "b"], "nested": { "ok": true } }),
        };
        let bytes = encode(&req).unwrap();
        let back: ExecuteRequest = decode_as(&bytes, Encoding::MessagePack).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn result_msgpack_keeps_camel_case_fields() {
        let result = ExecutionResult::ok(json!(6), vec![], Duration::from_millis(1));
        let bytes = encode_result(&result, Encoding::MessagePack).unwrap();
        let as_value: Value = decode(&bytes).unwrap();
        assert_eq!(as_value["statusCode"], json!(1));
        assert_eq!(as_value["response"], json!(6));

        let back: ExecutionResult = decode(&bytes).unwrap();
        assert_eq!(back.status_code, StatusCode::Ok);
    }

    #[test]
    fn encoding_from_extension() {
        assert_eq!(Encoding::from_extension("JSON"), Some(Encoding::Json));
        assert_eq!(Encoding::from_extension("mpk"), Some(Encoding::MessagePack));
        assert_eq!(Encoding::from_extension("txt"), None);
    }
}
