use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::error::RelayError;

/// Environment variables recognised by [`Config::load`].
const ENV_KEYS: &[&str] = &[
    "vertex_cf_auth_token",
    "project",
    "region",
    "model_name",
    "host",
    "port",
    "loglevel",
    "vertex_endpoint",
    "vertex_access_token",
    "body_limit",
];

/// Process-wide settings, resolved once at startup and never mutated.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shared HMAC secret used to sign request bodies.
    #[serde(rename = "vertex_cf_auth_token")]
    pub auth_token: String,
    pub project: String,
    pub region: String,
    /// Model used when a request does not name one.
    pub model_name: String,
    pub host: String,
    pub port: u16,
    pub loglevel: String,
    /// Overrides `https://{region}-aiplatform.googleapis.com`.
    pub vertex_endpoint: Option<Url>,
    /// Static bearer token; when absent the metadata server is queried.
    pub vertex_access_token: Option<String>,
    pub body_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_token: String::new(),
            project: String::new(),
            region: "us-central1".to_string(),
            model_name: "gemini-1.5-flash".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            loglevel: "info".to_string(),
            vertex_endpoint: None,
            vertex_access_token: None,
            body_limit: 2 * 1024 * 1024,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("auth_token", &"<redacted>")
            .field("project", &self.project)
            .field("region", &self.region)
            .field("model_name", &self.model_name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("loglevel", &self.loglevel)
            .field("vertex_endpoint", &self.vertex_endpoint)
            .field(
                "vertex_access_token",
                &self.vertex_access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("body_limit", &self.body_limit)
            .finish()
    }
}

impl Config {
    /// Build the configuration from defaults overlaid with the environment.
    pub fn load() -> Result<Self, RelayError> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Env::raw().only(ENV_KEYS));
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self, RelayError> {
        let cfg: Config = figment
            .extract()
            .map_err(|e| RelayError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), RelayError> {
        if self.auth_token.is_empty() {
            return Err(RelayError::Config(
                "VERTEX_CF_AUTH_TOKEN must be set".to_string(),
            ));
        }
        if self.project.is_empty() {
            return Err(RelayError::Config("PROJECT must be set".to_string()));
        }
        Ok(())
    }

    pub fn secret_bytes(&self) -> &[u8] {
        self.auth_token.as_bytes()
    }

    /// Base URL of the regional Vertex AI endpoint.
    pub fn vertex_base_url(&self) -> Result<Url, RelayError> {
        if let Some(url) = self.vertex_endpoint.as_ref() {
            return Ok(url.clone());
        }
        Url::parse(&format!("https://{}-aiplatform.googleapis.com", self.region))
            .map_err(|e| RelayError::Config(format!("invalid region {:?}: {e}", self.region)))
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
