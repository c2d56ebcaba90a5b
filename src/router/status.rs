//! Public health and metrics pages.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::{Result, ServerError};

const OKAY: &str = "okay";
const UNREACHABLE: &str = "unreachable";

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub name: String,
    pub version: String,
    pub http: String,
    pub store: String,
}

/// `GET /healthcheck`: 503 when the store does not answer.
pub async fn healthcheck(
    State(state): State<AppState>,
) -> (StatusCode, Json<Health>) {
    let (status, store) = match state.users.health().await {
        Ok(()) => (StatusCode::OK, OKAY),
        Err(err) => {
            tracing::warn!(error = %err, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, UNREACHABLE)
        },
    };

    (
        status,
        Json(Health {
            name: state.config.name.clone(),
            version: state.config.version().to_owned(),
            http: OKAY.to_owned(),
            store: store.to_owned(),
        }),
    )
}

/// `GET /metrics` in Prometheus text format.
pub async fn metrics(State(state): State<AppState>) -> Result<String> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or(ServerError::NotFound)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;

    use super::*;
    use crate::{app, make_request, test_state};

    #[tokio::test]
    async fn test_healthcheck_without_credentials() {
        let app = app(test_state());
        let response =
            make_request(None, app, Method::GET, "/healthcheck", String::default())
                .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Health = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.http, OKAY);
        assert_eq!(body.store, OKAY);
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_metrics_disabled() {
        let app = app(test_state());
        let response =
            make_request(None, app, Method::GET, "/metrics", String::default())
                .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
