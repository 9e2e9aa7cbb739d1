//! Event lifecycle handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::handlers::AppState;
use crate::middleware::auth::Principal;
use crate::models::event::{CreateEventRequest, EventStatus, UpdateEventRequest};
use crate::services::EventDetail;
use crate::utils::errors::{CampusGateError, Result};

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: String,
}

pub async fn create_event(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventDetail>)> {
    let detail = state.services.event_service.create(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    _principal: Principal,
) -> Result<Json<EventDetail>> {
    let detail = state.services.event_service.get(event_id).await?;
    Ok(Json(detail))
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    principal: Principal,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<EventDetail>> {
    let detail = state
        .services
        .event_service
        .update(event_id, &principal, request)
        .await?;
    Ok(Json(detail))
}

pub async fn transition_status(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    principal: Principal,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<EventDetail>> {
    let to = EventStatus::parse(&request.status).ok_or_else(|| {
        CampusGateError::InvalidInput(format!("Unknown event status '{}'", request.status))
    })?;
    let detail = state
        .services
        .event_service
        .transition(event_id, &principal, to)
        .await?;
    Ok(Json(detail))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    principal: Principal,
) -> Result<StatusCode> {
    state.services.event_service.delete(event_id, &principal).await?;
    Ok(StatusCode::NO_CONTENT)
}
