use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
};
use tracing::warn;

use crate::error::RelayError;
use crate::relay::signature::{self, SIGNATURE_HEADER};
use crate::router::RelayState;

/// Raw request body whose `X-Signature` header has been verified.
///
/// The HMAC covers the bytes exactly as received; the body is parsed only
/// after this extractor succeeds.
pub struct SignedBody(pub Bytes);

impl FromRequest<RelayState> for SignedBody {
    type Rejection = RelayError;

    async fn from_request(req: Request, state: &RelayState) -> Result<Self, Self::Rejection> {
        let provided = req
            .headers()
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| match rejection.status() {
                StatusCode::PAYLOAD_TOO_LARGE => RelayError::PayloadTooLarge,
                _ => RelayError::InvalidBody(rejection.body_text()),
            })?;

        if !signature::verify(&body, provided.as_deref(), state.config.secret_bytes()) {
            warn!(
                has_signature = provided.is_some(),
                body_len = body.len(),
                "rejecting request with invalid signature"
            );
            return Err(RelayError::InvalidSignature);
        }

        Ok(SignedBody(body))
    }
}
