//! Error handler for the account API.

use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

use crate::user::StoreError;
use crate::validation::Rejection;

pub type Result<T> = std::result::Result<T, ServerError>;

const BASIC_REALM: &str = r#"Basic realm="account-api", charset="UTF-8""#;

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error("`{0}` is a blocked word")]
    BlockedWord(String),

    #[error("{field} is already in use")]
    Conflict { field: &'static str },

    #[error("user not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("`{0}` cannot be used")]
    Forbidden(String),

    #[error("invalid 'Authorization' header")]
    Unauthorized,

    #[error("backing store is unavailable")]
    StoreUnavailable,

    #[error(transparent)]
    Json(#[from] JsonRejection),

    #[error("internal server error, {details}")]
    Internal {
        details: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ServerError {
    /// Single-field validation failure.
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(
            field,
            ValidationError::new("invalid").with_message(message.into().into()),
        );
        Self::Validation(errors)
    }

    /// HTTP status this error is answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Validation(_)
            | ServerError::BlockedWord(_)
            | ServerError::Conflict { .. }
            | ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::BadRequest(_) | ServerError::Json(_) => {
                StatusCode::BAD_REQUEST
            },
            ServerError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServerError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServerError::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Rejection> for ServerError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::InvalidFormat { field, reason } => {
                ServerError::invalid(field, reason)
            },
            Rejection::BlockedWord(word) => ServerError::BlockedWord(word),
        }
    }
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { field } => ServerError::Conflict { field },
            StoreError::NotFound => ServerError::NotFound,
            StoreError::Unavailable(source) => {
                tracing::warn!(error = %source, "store is unreachable");
                ServerError::StoreUnavailable
            },
            StoreError::Internal(source) => ServerError::Internal {
                details: "store failure".into(),
                source: Some(source),
            },
        }
    }
}

/// Structure for detailed error responses.
#[derive(Debug, Serialize)]
pub struct ResponseError {
    r#type: Option<String>,
    title: String,
    status: u16,
    detail: String,
    instance: Option<String>,
    errors: Option<Vec<FieldError>>,
}

impl ResponseError {
    /// Update error status code.
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code.as_u16();
        self
    }

    /// Update `title` field.
    pub fn title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    /// Add detailed error.
    pub fn details(mut self, description: &str) -> Self {
        self.detail = description.into();
        self
    }

    /// Automatically add errors field.
    pub fn errors(mut self, errors: &ValidationErrors) -> Self {
        self.errors = Some(parse_validation_errors(errors));
        self
    }

    /// Transform [`ResponseError`] into axum [`Response`].
    pub fn into_response(
        self,
    ) -> std::result::Result<Response, axum::http::Error> {
        if let Ok(body) = serde_json::to_string(&self) {
            Response::builder()
                .status(self.status)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
        } else {
            Ok(internal_server_error())
        }
    }
}

impl Default for ResponseError {
    fn default() -> Self {
        Self {
            r#type: None,
            title: "Internal server error.".to_owned(),
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            detail: String::default(),
            instance: None,
            errors: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct FieldError {
    field: String,
    message: String,
}

fn parse_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| FieldError {
                field: field.to_string(),
                message: issue
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| issue.code.to_string()),
            })
        })
        .collect()
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let response = ResponseError::default()
            .details(&self.to_string())
            .status(self.status());

        let response = match &self {
            ServerError::Validation(validation_errors) => response
                .title("There were validation errors with your request.")
                .errors(validation_errors),

            ServerError::BlockedWord(_) => {
                response.title("Username contains a blocked word.")
            },

            ServerError::Conflict { .. } => {
                response.title("User already exists.")
            },

            ServerError::NotFound => response.title("User not found."),

            ServerError::BadRequest(_) | ServerError::Json(_) => {
                response.title("Malformed request.")
            },

            ServerError::Forbidden(_) => {
                response.title("Username is not allowed.")
            },

            ServerError::Unauthorized => {
                let response = response
                    .title("Missing or invalid 'Authorization' header.")
                    .into_response()
                    .unwrap_or_else(|_| internal_server_error());
                let (mut parts, body) = response.into_parts();
                parts.headers.insert(
                    header::WWW_AUTHENTICATE,
                    header::HeaderValue::from_static(BASIC_REALM),
                );
                return Response::from_parts(parts, body);
            },

            ServerError::StoreUnavailable => {
                response.title("Service temporarily unavailable.")
            },

            ServerError::Internal { details, source } => {
                tracing::error!(err = ?source, %details, "server returned 500 status");

                ResponseError::default()
            },
        };

        response
            .into_response()
            .unwrap_or_else(|_| internal_server_error())
    }
}

fn internal_server_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(
            serde_json::json!({
                "type": null,
                "title": "Internal server error.",
                "status": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                "detail": null,
                "instance": null,
                "errors": null,
            })
            .to_string()
            .into(),
        )
        .unwrap_or_else(|_| Response::new("Internal server error".into()))
}
