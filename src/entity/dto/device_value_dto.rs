use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

/// body of POST /change-value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeValueDto {
    #[serde(rename = "newValue")]
    pub new_value: String,
}

impl ChangeValueDto {
    pub fn new(value: u8) -> Self {
        ChangeValueDto { new_value: value.to_string() }
    }
}

/// `value` field of a toggle / getvalue response, None when absent
pub fn value_field(resp: &Value) -> Option<&Value> {
    resp.get("value")
}

/// the device answers with either a number or its string form
pub fn value_equals(value: &Value, expected: u8) -> bool {
    match value {
        // 1 and 1.0 are the same value to the device
        Value::Number(n) => n.as_u64() == Some(expected as u64) || n.as_f64() == Some(expected as f64),
        Value::String(s) => s.trim() == expected.to_string(),
        _ => false,
    }
}

/// does the echoed /change-value object carry the requested value
pub fn echo_confirms(resp: &Value, expected: u8) -> bool {
    ["newValue", "value"]
        .iter()
        .filter_map(|key| resp.get(*key))
        .any(|v| value_equals(v, expected))
}
