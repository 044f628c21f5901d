use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::ClientError;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh this long before the metadata server says the token expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug)]
pub struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Where the Vertex bearer token comes from.
#[derive(Debug)]
pub enum TokenSource {
    Static(String),
    /// Service-account token from the GCE metadata server, cached until close to expiry.
    Metadata { cache: Mutex<Option<CachedToken>> },
}

impl TokenSource {
    pub fn new(static_token: Option<String>) -> Self {
        match static_token {
            Some(token) if !token.is_empty() => TokenSource::Static(token),
            _ => TokenSource::Metadata {
                cache: Mutex::new(None),
            },
        }
    }

    pub async fn access_token(&self, http: &reqwest::Client) -> Result<String, ClientError> {
        let cache = match self {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::Metadata { cache } => cache,
        };

        let mut guard = cache.lock().await;
        if let Some(cached) = guard.as_ref()
            && Instant::now() < cached.refresh_at
        {
            return Ok(cached.value.clone());
        }

        let fetched = fetch_metadata_token(http).await?;
        let lifetime = Duration::from_secs(fetched.expires_in).saturating_sub(EXPIRY_MARGIN);
        info!(expires_in = fetched.expires_in, "fetched access token from metadata server");
        *guard = Some(CachedToken {
            value: fetched.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(fetched.access_token)
    }
}

async fn fetch_metadata_token(http: &reqwest::Client) -> Result<MetadataToken, ClientError> {
    debug!("requesting access token from metadata server");
    let resp = http
        .get(METADATA_TOKEN_URL)
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .map_err(|e| ClientError::Token(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Token(format!(
            "metadata server returned {status}: {body}"
        )));
    }

    resp.json::<MetadataToken>()
        .await
        .map_err(|e| ClientError::Token(e.to_string()))
}
