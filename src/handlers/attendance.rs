//! Attendance check-in handlers

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::handlers::AppState;
use crate::middleware::auth::Principal;
use crate::models::registration::{ManualAttendanceRequest, Registration, ScanHistoryEntry};
use crate::services::{AttendanceDashboard, ScanResult};
use crate::utils::errors::Result;

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    /// Raw scanner output: encrypted envelope JSON, legacy ticket JSON, or a
    /// bare ticket id.
    pub ticket: String,
}

pub async fn scan_ticket(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    principal: Principal,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ScanResult>> {
    let result = state
        .services
        .attendance_service
        .scan(event_id, &request.ticket, &principal)
        .await?;
    Ok(Json(result))
}

pub async fn manual_attendance(
    State(state): State<AppState>,
    Path((event_id, registration_id)): Path<(i64, i64)>,
    principal: Principal,
    Json(request): Json<ManualAttendanceRequest>,
) -> Result<Json<Registration>> {
    let registration = state
        .services
        .attendance_service
        .manual_override(
            event_id,
            registration_id,
            &principal,
            request.target_status,
            &request.reason,
        )
        .await?;
    Ok(Json(registration))
}

pub async fn dashboard(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    principal: Principal,
) -> Result<Json<AttendanceDashboard>> {
    let dashboard = state
        .services
        .attendance_service
        .dashboard(event_id, &principal)
        .await?;
    Ok(Json(dashboard))
}

pub async fn scan_history(
    State(state): State<AppState>,
    Path((event_id, registration_id)): Path<(i64, i64)>,
    principal: Principal,
) -> Result<Json<Vec<ScanHistoryEntry>>> {
    let entries = state
        .services
        .attendance_service
        .scan_history(event_id, registration_id, &principal)
        .await?;
    Ok(Json(entries))
}

pub async fn export_csv(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    principal: Principal,
) -> Result<Response> {
    let csv = state
        .services
        .attendance_service
        .export_csv(event_id, &principal)
        .await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"attendance.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}
