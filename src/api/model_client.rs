use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::ClientError;
use crate::types::{ConversationTurn, GenerationParameters, OutputMode};

/// Everything a model client needs for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub model_name: String,
    /// Prior turns, replayed before `contents`.
    pub history: Vec<ConversationTurn>,
    /// The new user turn.
    pub contents: ConversationTurn,
    pub parameters: GenerationParameters,
    pub output_mode: OutputMode,
    pub response_schema: Option<Value>,
    pub tools: Option<Vec<Value>>,
    pub system_instruction: Option<String>,
}

/// A response part as produced by the model, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPart {
    Text(String),
    FunctionCall {
        name: String,
        args: Map<String, Value>,
    },
}

/// Opaque capability that talks to the hosted model.
///
/// Implementations own transport, upstream authentication, retry policy and
/// token accounting.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, request: &ModelRequest) -> Result<Vec<RawPart>, ClientError>;
}
