use serde_json::Value;
use tracing::error;

use crate::api::model_client::RawPart;
use crate::error::RelayError;
use crate::types::{OutputMode, ResponsePart};

/// Map raw model parts onto the wire format, one-to-one and in order.
///
/// In JSON mode every text part must parse as JSON; a part that does not is
/// reported as an upstream failure.
pub fn normalize(raw: Vec<RawPart>, mode: OutputMode) -> Result<Vec<ResponsePart>, RelayError> {
    raw.into_iter()
        .map(|part| match (part, mode) {
            (RawPart::FunctionCall { name, args }, _) => Ok(ResponsePart::FunctionCall { name, args }),
            (RawPart::Text(text), OutputMode::Json) => serde_json::from_str::<Value>(&text)
                .map(ResponsePart::Object)
                .map_err(|e| {
                    error!(error = %e, "model output violated the response schema");
                    RelayError::Upstream(format!("response is not valid JSON for the schema: {e}"))
                }),
            (RawPart::Text(text), OutputMode::Text) => Ok(ResponsePart::Text(text)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    #[test]
    fn empty_input_is_empty_output() {
        assert!(normalize(Vec::new(), OutputMode::Text).unwrap().is_empty());
        assert!(normalize(Vec::new(), OutputMode::Json).unwrap().is_empty());
    }

    #[test]
    fn text_mode_preserves_order_and_content() {
        let raw = vec![
            RawPart::Text("one".into()),
            RawPart::FunctionCall {
                name: "lookup".into(),
                args: Map::new(),
            },
            RawPart::Text("one".into()),
        ];

        assert_eq!(
            normalize(raw, OutputMode::Text).unwrap(),
            vec![
                ResponsePart::Text("one".into()),
                ResponsePart::FunctionCall {
                    name: "lookup".into(),
                    args: Map::new()
                },
                ResponsePart::Text("one".into()),
            ]
        );
    }

    #[test]
    fn json_mode_parses_text_into_objects() {
        let raw = vec![RawPart::Text(r#"{"city": "Oslo", "temp": 4}"#.into())];

        assert_eq!(
            normalize(raw, OutputMode::Json).unwrap(),
            vec![ResponsePart::Object(json!({"city": "Oslo", "temp": 4}))]
        );
    }

    #[test]
    fn json_mode_keeps_function_calls() {
        let args = json!({"q": "x"}).as_object().cloned().unwrap();
        let raw = vec![RawPart::FunctionCall {
            name: "search".into(),
            args: args.clone(),
        }];

        assert_eq!(
            normalize(raw, OutputMode::Json).unwrap(),
            vec![ResponsePart::FunctionCall {
                name: "search".into(),
                args
            }]
        );
    }

    #[test]
    fn invalid_json_in_schema_mode_is_an_upstream_error() {
        let raw = vec![RawPart::Text("not json".into())];
        let err = normalize(raw, OutputMode::Json).unwrap_err();

        assert!(matches!(err, RelayError::Upstream(_)));
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
