//! Registration lifecycle handlers

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::handlers::AppState;
use crate::middleware::auth::Principal;
use crate::models::registration::{
    Registration, RegistrationOutcome, RejectRequest, SubmitRegistrationRequest,
};
use crate::utils::errors::{CampusGateError, Result};

pub async fn register(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    principal: Principal,
    Json(request): Json<SubmitRegistrationRequest>,
) -> Result<(StatusCode, Json<RegistrationOutcome>)> {
    let user = state
        .db
        .users
        .find_by_id(principal.user_id)
        .await?
        .ok_or(CampusGateError::UserNotFound { user_id: principal.user_id })?;

    let outcome = state
        .services
        .registration_service
        .submit(event_id, &user, request)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Multipart upload of a payment-proof image. The first file field wins;
/// field name is not significant.
pub async fn upload_payment_proof(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    principal: Principal,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>> {
    let mut bytes: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| CampusGateError::InvalidInput(format!("Malformed multipart body: {e}")))?
    {
        let data = field
            .bytes()
            .await
            .map_err(|e| CampusGateError::InvalidInput(format!("Failed to read upload: {e}")))?;
        if !data.is_empty() {
            bytes = Some(data.to_vec());
            break;
        }
    }

    let bytes = bytes.ok_or_else(|| {
        CampusGateError::InvalidInput("No proof image found in the upload".to_string())
    })?;

    let path = state
        .services
        .registration_service
        .upload_payment_proof(event_id, &principal, &bytes)
        .await?;
    Ok(Json(json!({"proof_path": path})))
}

pub async fn pending_payments(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    principal: Principal,
) -> Result<Json<Vec<Registration>>> {
    let pending = state
        .services
        .registration_service
        .pending_payments(event_id, &principal)
        .await?;
    Ok(Json(pending))
}

pub async fn approve_payment(
    State(state): State<AppState>,
    Path((event_id, registration_id)): Path<(i64, i64)>,
    principal: Principal,
) -> Result<Json<Registration>> {
    let registration = state
        .services
        .registration_service
        .approve_payment(event_id, registration_id, &principal)
        .await?;
    Ok(Json(registration))
}

pub async fn reject_payment(
    State(state): State<AppState>,
    Path((event_id, registration_id)): Path<(i64, i64)>,
    principal: Principal,
    Json(request): Json<RejectRequest>,
) -> Result<Json<Registration>> {
    let registration = state
        .services
        .registration_service
        .reject_payment(event_id, registration_id, &principal, &request.reason)
        .await?;
    Ok(Json(registration))
}

pub async fn pending_registrations(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    principal: Principal,
) -> Result<Json<Vec<Registration>>> {
    let pending = state
        .services
        .registration_service
        .pending_registrations(event_id, &principal)
        .await?;
    Ok(Json(pending))
}

pub async fn approve_registration(
    State(state): State<AppState>,
    Path((event_id, registration_id)): Path<(i64, i64)>,
    principal: Principal,
) -> Result<Json<Registration>> {
    let registration = state
        .services
        .registration_service
        .approve_registration(event_id, registration_id, &principal)
        .await?;
    Ok(Json(registration))
}

pub async fn reject_registration(
    State(state): State<AppState>,
    Path((event_id, registration_id)): Path<(i64, i64)>,
    principal: Principal,
    Json(request): Json<RejectRequest>,
) -> Result<Json<Registration>> {
    let registration = state
        .services
        .registration_service
        .reject_registration(event_id, registration_id, &principal, &request.reason)
        .await?;
    Ok(Json(registration))
}

pub async fn ticket_qr(
    State(state): State<AppState>,
    Path((event_id, registration_id)): Path<(i64, i64)>,
    principal: Principal,
) -> Result<Response> {
    let png = state
        .services
        .registration_service
        .ticket_qr(event_id, registration_id, &principal)
        .await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}
