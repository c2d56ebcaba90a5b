//! Username availability.

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::{Result, ServerError};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub username: String,
    pub in_use: bool,
}

/// `GET /user/username/{name}`: 200 when taken, 404 when available.
pub async fn handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Response>> {
    let user = state.users.username_in_use(&name).await?;

    Ok(Json(Response {
        username: user.username,
        in_use: true,
    }))
}

/// `GET /user/username/` without any name.
pub async fn empty() -> ServerError {
    ServerError::BadRequest("username is empty".into())
}
