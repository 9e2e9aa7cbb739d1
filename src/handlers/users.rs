//! User profile handlers
//!
//! Identity itself lives upstream; this surface only provisions the profile
//! record the event lifecycle needs.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::handlers::AppState;
use crate::middleware::auth::Principal;
use crate::models::user::{CreateUserRequest, User};
use crate::utils::errors::{CampusGateError, Result};

pub async fn create_user(
    State(state): State<AppState>,
    _principal: Principal,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>)> {
    if request.full_name.trim().is_empty() || !request.email.contains('@') {
        return Err(CampusGateError::InvalidInput(
            "A full name and a valid email are required".to_string(),
        ));
    }
    let user = state.db.users.create(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    _principal: Principal,
) -> Result<Json<User>> {
    let user = state
        .db
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(CampusGateError::UserNotFound { user_id })?;
    Ok(Json(user))
}
