use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ClientError;

pub const DEFAULT_TEMPERATURE: f64 = 1.0;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;
pub const DEFAULT_TOP_P: f64 = 0.95;

/// Effective sampling parameters for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParameters {
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub top_p: f64,
    /// Always 1; multi-candidate output is not supported.
    pub candidate_count: u32,
    /// Unrecognised caller keys, kept but never sent upstream.
    #[serde(skip)]
    pub extra: Map<String, Value>,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            top_p: DEFAULT_TOP_P,
            candidate_count: 1,
            extra: Map::new(),
        }
    }
}

impl GenerationParameters {
    /// Shallow-merge caller overrides onto the defaults, key by key.
    ///
    /// Both `camelCase` and `snake_case` spellings are accepted. A `null`
    /// value keeps the default. Absent, `null` or `[]` overrides mean "use
    /// the defaults"; any other non-object is rejected.
    pub fn with_overrides(overrides: Option<&Value>) -> Result<Self, ClientError> {
        let mut params = Self::default();
        let overrides = match overrides {
            None | Some(Value::Null) => return Ok(params),
            Some(Value::Array(items)) if items.is_empty() => return Ok(params),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(ClientError::InvalidParameters(format!(
                    "`parameters` must be an object, got {other}"
                )));
            }
        };

        for (key, value) in overrides {
            if value.is_null() {
                continue;
            }
            match key.as_str() {
                "temperature" => params.temperature = as_float(key, value)?,
                "topP" | "top_p" => params.top_p = as_float(key, value)?,
                "maxOutputTokens" | "max_output_tokens" => {
                    params.max_output_tokens = value
                        .as_u64()
                        .and_then(|n| u32::try_from(n).ok())
                        .ok_or_else(|| invalid(key, "a non-negative integer", value))?;
                }
                "candidateCount" | "candidate_count" => {
                    debug!(value = %value, "ignoring caller candidate count");
                }
                _ => {
                    params.extra.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(params)
    }
}

fn as_float(key: &str, value: &Value) -> Result<f64, ClientError> {
    value.as_f64().ok_or_else(|| invalid(key, "a number", value))
}

fn invalid(key: &str, expected: &str, value: &Value) -> ClientError {
    ClientError::InvalidParameters(format!("`{key}` must be {expected}, got {value}"))
}

/// Free text versus schema-constrained JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

impl OutputMode {
    /// Schema presence is the only switch.
    pub fn for_schema(response_schema: Option<&Value>) -> Self {
        if response_schema.is_some() {
            OutputMode::Json
        } else {
            OutputMode::Text
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputMode::Text => "text/plain",
            OutputMode::Json => "application/json",
        }
    }
}
