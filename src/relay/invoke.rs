use serde_json::Value;
use tracing::{debug, error};

use crate::api::model_client::{ModelClient, ModelRequest, RawPart};
use crate::error::{ClientError, RelayError};
use crate::types::{ConversationTurn, GenerationParameters, OutputMode};

/// Inputs to a single generation call, borrowed from the inbound request.
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    pub contents: ConversationTurn,
    pub history: Vec<ConversationTurn>,
    pub parameters: Option<&'a Value>,
    pub model_name: &'a str,
    pub response_schema: Option<&'a Value>,
    pub tools: Option<&'a [Value]>,
    pub system_instruction: Option<&'a str>,
}

impl Invocation<'_> {
    /// Merge parameters and pick the output mode.
    pub fn into_model_request(self) -> Result<ModelRequest, ClientError> {
        let parameters = GenerationParameters::with_overrides(self.parameters)?;
        Ok(ModelRequest {
            model_name: self.model_name.to_string(),
            history: self.history,
            contents: self.contents,
            parameters,
            output_mode: OutputMode::for_schema(self.response_schema),
            response_schema: self.response_schema.cloned(),
            tools: self.tools.map(<[Value]>::to_vec),
            system_instruction: self.system_instruction.map(str::to_string),
        })
    }
}

/// Make exactly one call to `client`.
///
/// Every failure, including malformed parameters, comes back as
/// [`RelayError::Upstream`].
pub async fn invoke(
    invocation: Invocation<'_>,
    client: &dyn ModelClient,
) -> Result<Vec<RawPart>, RelayError> {
    let request = invocation.into_model_request().map_err(upstream)?;
    debug!(
        model = %request.model_name,
        history_turns = request.history.len(),
        mode = request.output_mode.mime_type(),
        "invoking model"
    );
    if !request.parameters.extra.is_empty() {
        let ignored: Vec<&str> = request.parameters.extra.keys().map(String::as_str).collect();
        debug!(?ignored, "unrecognised generation parameters not sent upstream");
    }
    client.generate(&request).await.map_err(upstream)
}

fn upstream(e: ClientError) -> RelayError {
    error!(error = %e, "generation failed");
    RelayError::from(e)
}
