use glmrelay_core::{RawInput, SchemaVariant, StructuredResult};
use serde::Serialize;
use serde_json::Value;

// Input: whatever JSON the caller posts.
// A bare string or any JSON value. The free-text relay also accepts the
// legacy `{"data": ...}` envelope; structured variants prompt with the body as-is.
pub fn parse_body(body: &[u8], variant: SchemaVariant) -> Result<RawInput, serde_json::Error> {
    let value: Value = serde_json::from_slice(body)?;
    let value = match variant {
        SchemaVariant::FreeText => unwrap_envelope(value),
        _ => value,
    };
    Ok(RawInput::from(value))
}

fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

// Output: structured variants answer `{"data": <result>}`
#[derive(Debug, Serialize)]
pub struct DataEnvelope {
    pub data: StructuredResult,
}

// Errors: one fixed message per status, never internal detail
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: &'static str,
}

pub const BAD_REQUEST_DETAIL: &str = "请求体必须是合法的 JSON。";
pub const UPSTREAM_FAILURE_DETAIL: &str = "与 AI 服务通信时发生内部错误，请稍后再试。";
