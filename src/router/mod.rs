//! HTTP routes.
pub mod admin;
pub mod status;
pub mod user;
pub mod username;

use axum::Json;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ServerError;

/// JSON body deserialized then checked with [`Validate`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Valid<T>(pub T);

impl<T, S> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Valid(value))
    }
}

/// Every unknown route, including path-shaped tokens.
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}

#[cfg(test)]
pub(crate) mod tests {
    use axum::Router;
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};

    use crate::{app, make_request, test_state};

    /// Unique username and email, like the ones callers register.
    pub fn unique() -> Value {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let name = &id[..12];
        json!({ "username": name, "email": format!("{name}@email.com") })
    }

    pub async fn call(
        app: &Router,
        method: Method,
        path: &str,
        body: Value,
    ) -> (StatusCode, Value) {
        let principal = Some(crate::TEST_PRINCIPAL);
        let response =
            make_request(principal, app.clone(), method, path, body.to_string())
                .await;
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_path_like_routes() {
        let app = app(test_state());

        for path in [
            "/user//../../../../../../../../../../../etc/passwd",
            "/user/username//../../../../../../../../../../../etc/passwd",
            "/user/..%2F..%2Fetc%2Fpasswd",
            "/unknown",
        ] {
            let (status, body) = call(&app, Method::GET, path, Value::Null).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{path}");
            assert_eq!(body["status"], 404);
        }
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let app = app(test_state());
        let response = make_request(
            Some(crate::TEST_PRINCIPAL),
            app,
            Method::POST,
            "/user",
            "{not json".into(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
