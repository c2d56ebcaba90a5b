//! Admin flag check.

use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::{Result, ServerError};

#[derive(Debug, Deserialize)]
pub struct IsAdminQuery {
    id: Option<String>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub is_admin: bool,
}

/// `GET /isAdmin?id={token}`. A missing `id` denotes no user.
pub async fn handler(
    State(state): State<AppState>,
    Query(query): Query<IsAdminQuery>,
) -> Result<Json<Response>> {
    let token = query
        .id
        .filter(|id| !id.is_empty())
        .ok_or(ServerError::NotFound)?;

    let user = state.users.resolve(&token).await?;
    Ok(Json(Response {
        is_admin: user.is_admin,
    }))
}
