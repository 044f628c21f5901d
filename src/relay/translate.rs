use serde_json::{Map, Value};

use super::history::ValidatedHistory;
use crate::types::{ContentPart, ConversationTurn, Role};

/// Convert validated history into provider-neutral turns, preserving order.
pub fn translate(history: &ValidatedHistory<'_>) -> Vec<ConversationTurn> {
    history
        .turns
        .iter()
        .map(|turn| {
            let parts = turn.parts.iter().map(classify_part).collect();
            ConversationTurn::new(turn.role, parts)
        })
        .collect()
}

/// Build the new `user` turn from the request's `contents`.
///
/// A string is one text part, a list yields one part per element and any
/// other value is classified as a single part.
pub fn prompt_turn(contents: &Value) -> ConversationTurn {
    let parts = match contents {
        Value::Array(items) if !items.is_empty() => items.iter().map(classify_part).collect(),
        other => vec![classify_part(other)],
    };
    ConversationTurn::new(Role::User, parts)
}

/// Decide which [`ContentPart`] a raw part entry denotes.
///
/// Total over any JSON value: structured parts are recognised by their
/// `functionCall` / `functionResponse` key and anything else becomes text.
pub fn classify_part(value: &Value) -> ContentPart {
    let Some(obj) = value.as_object() else {
        return ContentPart::Text(plain_text(value));
    };

    if let Some(call) = obj.get("functionCall") {
        return ContentPart::FunctionCall {
            name: field_name(call),
            args: call
                .get("args")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        };
    }

    if let Some(resp) = obj.get("functionResponse") {
        return ContentPart::FunctionResponse {
            name: field_name(resp),
            response: resp
                .get("response")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new())),
        };
    }

    match obj.get("text").and_then(Value::as_str) {
        Some(text) => ContentPart::Text(text.to_string()),
        None => ContentPart::Text(value.to_string()),
    }
}

fn field_name(v: &Value) -> String {
    v.get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
