use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "model" => Some(Role::Model),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One atomic unit inside a turn.
///
/// Serializes to the Gemini part shape: `{"text": ..}`,
/// `{"functionCall": {"name", "args"}}` or `{"functionResponse": {"name", "response"}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentPart {
    Text(String),
    FunctionCall {
        name: String,
        args: Map<String, Value>,
    },
    FunctionResponse {
        name: String,
        response: Value,
    },
}

/// A single provider-neutral chat turn. `parts` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub parts: Vec<ContentPart>,
}

impl ConversationTurn {
    pub fn new(role: Role, parts: Vec<ContentPart>) -> Self {
        Self { role, parts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parts_serialize_to_gemini_shape() {
        let turn = ConversationTurn::new(
            Role::Model,
            vec![
                ContentPart::Text("checking".into()),
                ContentPart::FunctionCall {
                    name: "lookup".into(),
                    args: json!({"q": "rust"}).as_object().cloned().unwrap(),
                },
            ],
        );

        assert_eq!(
            serde_json::to_value(&turn).unwrap(),
            json!({
                "role": "model",
                "parts": [
                    {"text": "checking"},
                    {"functionCall": {"name": "lookup", "args": {"q": "rust"}}}
                ]
            })
        );
    }

    #[test]
    fn role_parse_accepts_only_known_values() {
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("model"), Some(Role::Model));
        assert_eq!(Role::parse("system"), None);
        assert_eq!(Role::parse("User"), None);
    }
}
