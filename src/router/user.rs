//! Create, read, update and delete users.

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::Result;
use crate::router::Valid;
use crate::user::{User, UserFields};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub user: User,
}

/// `POST /user`.
pub async fn create(
    State(state): State<AppState>,
    Valid(fields): Valid<UserFields>,
) -> Result<Json<Response>> {
    let user = state.users.create(fields).await?;
    Ok(Json(Response { user }))
}

/// `GET /user/{token}`.
pub async fn get(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Response>> {
    let user = state.users.resolve(&token).await?;
    Ok(Json(Response { user }))
}

/// `PUT /user/{token}`.
pub async fn update(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Valid(fields): Valid<UserFields>,
) -> Result<Json<Response>> {
    let user = state.users.update(&token, fields).await?;
    Ok(Json(Response { user }))
}

/// `DELETE /user/{token}`.
pub async fn delete(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Response>> {
    let user = state.users.delete(&token).await?;
    Ok(Json(Response { user }))
}
