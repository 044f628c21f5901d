use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One element of the relay's success body.
///
/// Wire shapes: `{"text": ..}`, `{"functionCall": {"name", "args"}}`, `{"object": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponsePart {
    Text(String),
    FunctionCall {
        name: String,
        args: Map<String, Value>,
    },
    /// Parsed structured output; only produced in schema mode.
    Object(Value),
}
