//! HTTP handlers module
//!
//! One handler module per resource area, wired into a single axum router.
//! Handlers stay thin: extract the principal and the request body, call the
//! matching service, map the domain error onto an HTTP status.

pub mod attendance;
pub mod events;
pub mod registrations;
pub mod users;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::database::DatabaseService;
use crate::services::ServiceFactory;
use crate::utils::errors::CampusGateError;

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub services: ServiceFactory,
    pub db: DatabaseService,
}

impl AppState {
    pub fn new(services: ServiceFactory, db: DatabaseService) -> Self {
        Self { services, db }
    }
}

impl IntoResponse for CampusGateError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if !self.is_client_error() {
            warn!(error = %self, "Request failed with server error");
        }

        let mut body = json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        // Duplicate scans carry the original mark so the scanner UI can show
        // who was checked in and when.
        if let CampusGateError::DuplicateScan { marked_at, participant } = &self {
            body["marked_at"] = json!(marked_at);
            body["participant"] = json!(participant);
        }

        (status, Json(body)).into_response()
    }
}

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users", post(users::create_user))
        .route("/users/{user_id}", get(users::get_user))
        .route("/events", post(events::create_event))
        .route("/events/{event_id}", get(events::get_event))
        .route("/events/{event_id}", patch(events::update_event))
        .route("/events/{event_id}", delete(events::delete_event))
        .route("/events/{event_id}/status", post(events::transition_status))
        .route("/events/{event_id}/register", post(registrations::register))
        .route(
            "/events/{event_id}/upload-payment-proof",
            post(registrations::upload_payment_proof),
        )
        .route(
            "/events/{event_id}/pending-payments",
            get(registrations::pending_payments),
        )
        .route(
            "/events/{event_id}/approve-payment/{registration_id}",
            post(registrations::approve_payment),
        )
        .route(
            "/events/{event_id}/reject-payment/{registration_id}",
            post(registrations::reject_payment),
        )
        .route(
            "/events/{event_id}/pending-registrations",
            get(registrations::pending_registrations),
        )
        .route(
            "/events/{event_id}/approve-registration/{registration_id}",
            post(registrations::approve_registration),
        )
        .route(
            "/events/{event_id}/reject-registration/{registration_id}",
            post(registrations::reject_registration),
        )
        .route(
            "/events/{event_id}/ticket/{registration_id}/qr",
            get(registrations::ticket_qr),
        )
        .route("/events/{event_id}/scan-ticket", post(attendance::scan_ticket))
        .route(
            "/events/{event_id}/manual-attendance/{registration_id}",
            post(attendance::manual_attendance),
        )
        .route("/events/{event_id}/attendance", get(attendance::dashboard))
        .route(
            "/events/{event_id}/attendance/{registration_id}/history",
            get(attendance::scan_history),
        )
        .route(
            "/events/{event_id}/attendance/export",
            get(attendance::export_csv),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Response {
    match crate::database::connection::health_check(&state.db.pool).await {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "ok"}))).into_response(),
        Err(e) => {
            warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unavailable"})),
            )
                .into_response()
        }
    }
}
