use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use super::model_client::{ModelClient, ModelRequest, RawPart};
use super::token::TokenSource;
use crate::config::Config;
use crate::error::{ClientError, RelayError};
use crate::types::ConversationTurn;

fn default_retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(1))
        .with_max_delay(Duration::from_secs(3))
        .with_max_times(3)
        .with_jitter()
}

/// [`ModelClient`] backed by the Vertex AI `generateContent` endpoint.
pub struct VertexClient {
    http: reqwest::Client,
    base_url: Url,
    project: String,
    region: String,
    token: TokenSource,
}

impl VertexClient {
    pub fn new(cfg: &Config) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("vertex-relay/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| RelayError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: cfg.vertex_base_url()?,
            project: cfg.project.clone(),
            region: cfg.region.clone(),
            token: TokenSource::new(cfg.vertex_access_token.clone()),
        })
    }

    /// `{base}/v1/projects/{project}/locations/{region}/publishers/google/models/{model}:generateContent`
    ///
    /// Each piece is pushed as a single, percent-encoded path segment.
    fn endpoint(&self, model: &str) -> Result<Url, ClientError> {
        if model.is_empty() || model.contains(['/', '\\']) || model == "." || model == ".." {
            return Err(ClientError::InvalidModel(model.to_string()));
        }

        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        let rpc = format!("{model}:generateContent");
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidModel(model.to_string()))?
            .pop_if_empty()
            .extend([
                "v1",
                "projects",
                self.project.as_str(),
                "locations",
                self.region.as_str(),
                "publishers",
                "google",
                "models",
                rpc.as_str(),
            ]);
        Ok(url)
    }

    async fn post_once(
        &self,
        url: &Url,
        token: &str,
        body: &VertexRequest<'_>,
    ) -> Result<GenerateContentResponse, ClientError> {
        let resp = self
            .http
            .post(url.clone())
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json::<GenerateContentResponse>().await?)
    }
}

#[async_trait]
impl ModelClient for VertexClient {
    async fn generate(&self, request: &ModelRequest) -> Result<Vec<RawPart>, ClientError> {
        let url = self.endpoint(&request.model_name)?;
        let body = VertexRequest::from_model_request(request);
        let token = self.token.access_token(&self.http).await?;

        let resp = (|| async { self.post_once(&url, &token, &body).await })
            .retry(default_retry_policy())
            .when(ClientError::is_retryable)
            .notify(|err, dur: Duration| {
                warn!(
                    "Vertex AI server error (will retry): {}, sleeping {:?}",
                    err, dur
                );
            })
            .await?;

        if let Some(usage) = resp.usage_metadata.as_ref() {
            info!(
                model = %request.model_name,
                prompt_tokens = usage.prompt_token_count.unwrap_or(0),
                candidates_tokens = usage.candidates_token_count.unwrap_or(0),
                total_tokens = usage.total_token_count.unwrap_or(0),
                "token usage"
            );
        }

        resp.into_raw_parts()
    }
}

/// Vertex `generateContent` request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexRequest<'a> {
    pub contents: Vec<&'a ConversationTurn>,
    pub generation_config: VertexGenerationConfig<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<&'a [Value]>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexGenerationConfig<'a> {
    pub temperature: f64,
    pub top_p: f64,
    pub max_output_tokens: u32,
    pub candidate_count: u32,
    pub response_mime_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<&'a Value>,
}

#[derive(Debug, Serialize)]
pub struct SystemInstruction<'a> {
    pub parts: [TextPart<'a>; 1],
}

#[derive(Debug, Serialize)]
pub struct TextPart<'a> {
    pub text: &'a str,
}

impl<'a> VertexRequest<'a> {
    /// History first, then the new user turn.
    pub fn from_model_request(request: &'a ModelRequest) -> Self {
        let contents = request
            .history
            .iter()
            .chain(std::iter::once(&request.contents))
            .collect();

        let params = &request.parameters;
        Self {
            contents,
            generation_config: VertexGenerationConfig {
                temperature: params.temperature,
                top_p: params.top_p,
                max_output_tokens: params.max_output_tokens,
                candidate_count: params.candidate_count,
                response_mime_type: request.output_mode.mime_type(),
                response_schema: request.response_schema.as_ref(),
            },
            system_instruction: request.system_instruction.as_deref().map(|text| {
                SystemInstruction {
                    parts: [TextPart { text }],
                }
            }),
            tools: request.tools.as_deref(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<VertexPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexPart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub function_call: Option<VertexFunctionCall>,
    #[serde(default)]
    pub thought: bool,
}

#[derive(Debug, Deserialize)]
pub struct VertexFunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u64>,
    pub candidates_token_count: Option<u64>,
    pub total_token_count: Option<u64>,
}

impl GenerateContentResponse {
    /// Parts of the first candidate; thoughts and unsupported parts are dropped.
    pub fn into_raw_parts(self) -> Result<Vec<RawPart>, ClientError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(ClientError::Blocked(reason));
            }
            return Ok(Vec::new());
        };

        if let Some(reason) = candidate.finish_reason.as_deref() {
            debug!(finish_reason = reason, "candidate finished");
        }

        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        Ok(parts
            .into_iter()
            .filter(|part| !part.thought)
            .filter_map(|part| match (part.function_call, part.text) {
                (Some(call), _) => Some(RawPart::FunctionCall {
                    name: call.name,
                    args: call.args,
                }),
                (None, Some(text)) => Some(RawPart::Text(text)),
                (None, None) => {
                    debug!("skipping part without text or function call");
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentPart, GenerationParameters, OutputMode, Role};
    use serde_json::json;

    fn model_request(schema: Option<Value>) -> ModelRequest {
        ModelRequest {
            model_name: "gemini-1.5-flash".into(),
            history: vec![
                ConversationTurn::new(Role::User, vec![ContentPart::Text("hello".into())]),
                ConversationTurn::new(Role::Model, vec![ContentPart::Text("hi!".into())]),
            ],
            contents: ConversationTurn::new(Role::User, vec![ContentPart::Text("how are you?".into())]),
            parameters: GenerationParameters::default(),
            output_mode: OutputMode::for_schema(schema.as_ref()),
            response_schema: schema,
            tools: Some(vec![json!({"functionDeclarations": [{"name": "lookup"}]})]),
            system_instruction: Some("be brief".into()),
        }
    }

    #[test]
    fn request_body_replays_history_then_prompt() {
        let request = model_request(None);
        let body = serde_json::to_value(VertexRequest::from_model_request(&request)).unwrap();

        assert_eq!(
            body,
            json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "hello"}]},
                    {"role": "model", "parts": [{"text": "hi!"}]},
                    {"role": "user", "parts": [{"text": "how are you?"}]}
                ],
                "generationConfig": {
                    "temperature": 1.0,
                    "topP": 0.95,
                    "maxOutputTokens": 8192,
                    "candidateCount": 1,
                    "responseMimeType": "text/plain"
                },
                "systemInstruction": {"parts": [{"text": "be brief"}]},
                "tools": [{"functionDeclarations": [{"name": "lookup"}]}]
            })
        );
    }

    #[test]
    fn schema_mode_sets_json_mime_type_and_schema() {
        let schema = json!({"type": "object", "properties": {"n": {"type": "integer"}}});
        let request = model_request(Some(schema.clone()));
        let body = serde_json::to_value(VertexRequest::from_model_request(&request)).unwrap();

        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"], schema);
    }

    #[test]
    fn response_parts_are_extracted_in_order() {
        let resp: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "thinking...", "thought": true},
                    {"text": "Let me check."},
                    {"functionCall": {"name": "lookup", "args": {"q": "rust"}}},
                    {"inlineData": {"mimeType": "image/png", "data": ""}}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 5, "totalTokenCount": 8}
        }))
        .unwrap();

        assert_eq!(
            resp.into_raw_parts().unwrap(),
            vec![
                RawPart::Text("Let me check.".into()),
                RawPart::FunctionCall {
                    name: "lookup".into(),
                    args: json!({"q": "rust"}).as_object().cloned().unwrap(),
                },
            ]
        );
    }

    #[test]
    fn blocked_prompt_is_an_error() {
        let resp: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();

        let err = resp.into_raw_parts().unwrap_err();
        assert!(matches!(err, ClientError::Blocked(reason) if reason == "SAFETY"));
    }

    #[test]
    fn no_candidates_yields_no_parts() {
        let resp = GenerateContentResponse::default();
        assert!(resp.into_raw_parts().unwrap().is_empty());
    }

    fn client_for(project: &str, region: &str) -> VertexClient {
        let cfg = Config {
            auth_token: "s".into(),
            project: project.into(),
            region: region.into(),
            vertex_access_token: Some("token".into()),
            ..Config::default()
        };
        VertexClient::new(&cfg).unwrap()
    }

    #[test]
    fn endpoint_targets_project_region_and_model() {
        let client = client_for("demo", "europe-west4");

        assert_eq!(
            client.endpoint("gemini-1.5-pro").unwrap().as_str(),
            "https://europe-west4-aiplatform.googleapis.com/v1/projects/demo/locations/europe-west4/publishers/google/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn model_names_cannot_leave_the_models_collection() {
        let client = client_for("demo", "us-central1");

        for model in [
            "../../../../../../v1/projects/other-proj/locations/us/endpoints/e",
            "publishers/other/models/x",
            "..",
            "",
            "a\\b",
        ] {
            assert!(
                matches!(client.endpoint(model), Err(ClientError::InvalidModel(_))),
                "{model:?} should be rejected"
            );
        }
    }

    #[test]
    fn query_and_fragment_characters_stay_inside_the_model_segment() {
        let client = client_for("demo", "us-central1");
        let url = client.endpoint("x?alt=sse#").unwrap();

        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
        assert_eq!(url.host_str(), Some("us-central1-aiplatform.googleapis.com"));
        assert_eq!(
            url.path(),
            "/v1/projects/demo/locations/us-central1/publishers/google/models/x%3Falt=sse%23:generateContent"
        );
    }

    #[test]
    fn endpoint_override_with_path_prefix_is_kept() {
        let cfg = Config {
            auth_token: "s".into(),
            project: "demo".into(),
            vertex_endpoint: Some(Url::parse("http://127.0.0.1:9000/proxy/").unwrap()),
            vertex_access_token: Some("token".into()),
            ..Config::default()
        };
        let client = VertexClient::new(&cfg).unwrap();

        assert_eq!(
            client.endpoint("gemini-1.5-flash").unwrap().as_str(),
            "http://127.0.0.1:9000/proxy/v1/projects/demo/locations/us-central1/publishers/google/models/gemini-1.5-flash:generateContent"
        );
    }
}
