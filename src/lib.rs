//! User account management API.
//!
//! Users are identified interchangeably by id, email or username, behind
//! HTTP basic authentication.

#![forbid(unsafe_code)]
pub mod config;
pub mod crypto;
mod database;
pub mod error;
pub mod middleware;
mod router;
pub mod telemetry;
pub mod user;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Method, StatusCode, header};
use axum::routing::{get, post};
use axum::{Router, middleware as AxumMiddleware};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

use crate::middleware::AuthGate;
use crate::user::{MemoryUserStore, PgUserStore, UserService, UserStore};
use crate::validation::Validator;

/// Credential accepted by [`test_state`].
#[cfg(test)]
pub(crate) const TEST_PRINCIPAL: &str = "wm:secret";

/// MUST NEVER be used in production.
#[cfg(test)]
pub(crate) async fn make_request(
    principal: Option<&str>,
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use base64::Engine;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(principal) = principal {
        let encoded = base64::engine::general_purpose::STANDARD.encode(principal);
        request = request.header(header::AUTHORIZATION, format!("Basic {encoded}"));
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// State on the in-memory store accepting [`TEST_PRINCIPAL`].
#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    let mut config = config::Configuration::default();
    config.allowed_users = vec![TEST_PRINCIPAL.to_owned()];

    AppState {
        users: UserService::new(
            Arc::new(MemoryUserStore::new()),
            Validator::new(&config.blocklist),
            config.store_timeout(),
        ),
        auth: Arc::new(AuthGate::new(config.allowed_users.clone())),
        config: Arc::new(config),
        metrics: None,
    }
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub users: UserService,
    pub auth: Arc<AuthGate>,
    pub metrics: Option<PrometheusHandle>,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)))
        // Remove sensitive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    // Everything here, fallback included, sits behind basic auth.
    let api = Router::new()
        // `POST /user` goes to `create`.
        .route("/user", post(router::user::create))
        // `GET|PUT|DELETE /user/:token`.
        .route(
            "/user/{token}",
            get(router::user::get)
                .put(router::user::update)
                .delete(router::user::delete),
        )
        .route("/user/username/", get(router::username::empty))
        .route("/user/username/{name}", get(router::username::handler))
        // `GET /isAdmin?id=:token`.
        .route("/isAdmin", get(router::admin::handler))
        .fallback(router::not_found)
        .layer(AxumMiddleware::from_fn_with_state(
            state.clone(),
            middleware::require_basic_auth,
        ));

    Router::new()
        .route("/healthcheck", get(router::status::healthcheck))
        .route("/metrics", get(router::status::metrics))
        .merge(api)
        .with_state(state)
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware)
}

/// Initialize the application state.
///
/// The store must answer once before this returns, so a server never
/// starts half-connected.
pub async fn initialize_state(
    metrics: Option<PrometheusHandle>,
) -> Result<AppState, Box<dyn std::error::Error>> {
    // read configuration file. let it in memory.
    let config = config::Configuration::default().read()?;

    let store: Arc<dyn UserStore> = match config.postgres {
        Some(ref postgres) => {
            let db = database::Database::new(postgres, config.store_timeout())
                .await?;
            // execute migrations scripts on start.
            db.migrate().await?;
            Arc::new(PgUserStore::new(db.postgres))
        },
        None => {
            tracing::warn!(
                "missing `postgres` entry on `config.yaml` file, users are kept in memory"
            );
            Arc::new(MemoryUserStore::new())
        },
    };

    let users = UserService::new(
        store,
        Validator::new(&config.blocklist),
        config.store_timeout(),
    );
    users.health().await?;
    tracing::info!("store reachable");

    Ok(AppState {
        users,
        auth: Arc::new(AuthGate::new(config.allowed_users.clone())),
        config,
        metrics,
    })
}
