use serde::Deserialize;
use serde_json::Value;

/// Body of `POST /generate_content`.
///
/// `contents` and `history` stay loosely typed here; they are checked and
/// translated by the relay stages rather than rejected by serde.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayRequest {
    #[serde(default)]
    pub contents: Option<Value>,
    /// Checked when parameters are merged, so a bad value fails as an upstream error.
    #[serde(default)]
    pub parameters: Option<Value>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub response_schema: Option<Value>,
    #[serde(default = "empty_history")]
    pub history: Value,
    #[serde(default)]
    pub tools: Option<Vec<Value>>,
    #[serde(default)]
    pub system_instruction: Option<String>,
}

fn empty_history() -> Value {
    Value::Array(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_body_gets_defaults() {
        let req: RelayRequest = serde_json::from_value(json!({"contents": "hi"})).unwrap();

        assert_eq!(req.contents, Some(json!("hi")));
        assert_eq!(req.history, json!([]));
        assert!(req.parameters.is_none());
        assert!(req.response_schema.is_none());
    }

    #[test]
    fn explicit_null_history_is_kept_for_validation() {
        let req: RelayRequest =
            serde_json::from_value(json!({"contents": "hi", "history": null})).unwrap();
        assert_eq!(req.history, Value::Null);
    }

    #[test]
    fn non_object_parameters_still_deserialize() {
        let req: RelayRequest =
            serde_json::from_value(json!({"contents": "hi", "parameters": 5})).unwrap();
        assert_eq!(req.parameters, Some(json!(5)));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let req: RelayRequest =
            serde_json::from_value(json!({"contents": "hi", "stream": true})).unwrap();
        assert_eq!(req.contents, Some(json!("hi")));
    }
}
