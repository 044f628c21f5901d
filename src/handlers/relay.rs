use axum::{
    Json,
    extract::State,
    http::{Method, StatusCode, Uri},
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::middleware::signed_body::SignedBody;
use crate::relay::{self, Invocation};
use crate::router::RelayState;
use crate::types::{OutputMode, RelayRequest, ResponsePart};

/// POST /generate_content
///
/// Runs authenticate -> validate -> translate -> invoke -> normalize and stops
/// at the first failing stage. Authentication happens in [`SignedBody`].
pub async fn generate_content(
    State(state): State<RelayState>,
    SignedBody(body): SignedBody,
) -> Result<Json<Vec<ResponsePart>>, RelayError> {
    relay_request(&state, &body)
        .await
        .map(Json)
        .inspect_err(|e| match e {
            RelayError::Upstream(_) | RelayError::Config(_) => {}
            other => warn!(status = other.status().as_u16(), error = %other, "request rejected"),
        })
}

async fn relay_request(state: &RelayState, body: &[u8]) -> Result<Vec<ResponsePart>, RelayError> {
    let request = parse_body(body)?;

    let history = relay::validate(&request.history)?;
    let contents = match request.contents.as_ref() {
        None => return Err(RelayError::MissingContents),
        Some(Value::Array(items)) if items.is_empty() => return Err(RelayError::MissingContents),
        Some(contents) => contents,
    };
    debug!(history_turns = history.len(), "request validated");

    let model_name = request
        .model_name
        .as_deref()
        .unwrap_or(state.config.model_name.as_str());
    let invocation = Invocation {
        contents: relay::prompt_turn(contents),
        history: relay::translate(&history),
        parameters: request.parameters.as_ref(),
        model_name,
        response_schema: request.response_schema.as_ref(),
        tools: request.tools.as_deref(),
        system_instruction: request.system_instruction.as_deref(),
    };

    let raw = relay::invoke(invocation, state.client.as_ref()).await?;
    let mode = OutputMode::for_schema(request.response_schema.as_ref());
    let parts = relay::normalize(raw, mode)?;

    info!(model = model_name, parts = parts.len(), "generation relayed");
    Ok(parts)
}

/// The body must be a JSON object; unknown fields are ignored.
fn parse_body(body: &[u8]) -> Result<RelayRequest, RelayError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| RelayError::InvalidBody(e.to_string()))?;
    if !value.is_object() {
        return Err(RelayError::InvalidBody(
            "expected a JSON object".to_string(),
        ));
    }
    serde_json::from_value(value).map_err(|e| RelayError::InvalidBody(e.to_string()))
}

/// OPTIONS /generate_content
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Any method other than POST/OPTIONS on a known route.
pub async fn method_not_allowed(method: Method, uri: Uri) -> RelayError {
    debug!(%method, path = %uri.path(), "method not allowed");
    RelayError::MethodNotAllowed
}

pub async fn unsupported_path(uri: Uri) -> RelayError {
    debug!(path = %uri.path(), "unsupported path");
    RelayError::UnsupportedPath
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_object_bodies_are_rejected() {
        let bodies: [&[u8]; 4] = [b"[1, 2]", b"\"hi\"", b"not json", b""];
        for body in bodies {
            assert!(matches!(parse_body(body), Err(RelayError::InvalidBody(_))));
        }
    }

    #[test]
    fn object_body_parses() {
        let req = parse_body(br#"{"contents": "hi", "model_name": "gemini-2.0-flash"}"#).unwrap();
        assert_eq!(req.model_name.as_deref(), Some("gemini-2.0-flash"));
    }
}
