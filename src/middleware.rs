//! Middlewares for routes.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::AppState;
use crate::crypto::matches_any;
use crate::error::{Result, ServerError};

const BASIC: &str = "Basic ";

/// Basic-auth gate accepting a fixed set of `user:secret` principals.
#[derive(Debug, Clone, Default)]
pub struct AuthGate {
    principals: Vec<String>,
}

impl AuthGate {
    /// Create a new [`AuthGate`].
    pub fn new(principals: Vec<String>) -> Self {
        Self { principals }
    }

    /// Check the `Authorization` header.
    ///
    /// Every failure is the same [`ServerError::Unauthorized`], whichever
    /// part of the credential was wrong.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<()> {
        let credentials = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix(BASIC))
            .and_then(|encoded| STANDARD.decode(encoded.trim()).ok())
            .ok_or(ServerError::Unauthorized)?;

        if matches_any(
            &credentials,
            self.principals.iter().map(|principal| principal.as_bytes()),
        ) {
            Ok(())
        } else {
            Err(ServerError::Unauthorized)
        }
    }
}

/// Middleware rejecting requests without accepted basic-auth credentials.
///
/// Runs before body extraction, validation and store access.
pub async fn require_basic_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response> {
    if let Err(err) = state.auth.authenticate(req.headers()) {
        tracing::warn!(
            method = %req.method(),
            path = %req.uri().path(),
            "rejected request with invalid credentials"
        );
        return Err(err);
    }

    Ok(next.run(req).await)
}
