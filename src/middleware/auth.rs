//! Principal extraction middleware
//!
//! Upstream authentication is handled by the API gateway; it forwards the
//! resolved identity in `X-User-Id` and `X-User-Role` headers. This module
//! turns those headers into a typed `Principal` via an axum extractor.
//! Requests without a valid identity are rejected before any handler runs.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::{debug, warn};

use crate::models::event::Event;
use crate::utils::errors::CampusGateError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Caller role as resolved by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Participant,
    Organizer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Participant => "participant",
            Role::Organizer => "organizer",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "participant" => Some(Role::Participant),
            "organizer" => Some(Role::Organizer),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Authenticated caller identity
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Whether this caller may manage the given event. Admins manage
    /// everything; organizers manage only events they own.
    pub fn is_organizer_of(&self, event: &Event) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Organizer => event.organizer_id == self.user_id,
            Role::Participant => false,
        }
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = CampusGateError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or_else(|| {
                warn!("Request missing or malformed {} header", USER_ID_HEADER);
                CampusGateError::PermissionDenied("Missing caller identity".to_string())
            })?;

        let role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(Role::parse)
            .unwrap_or(Role::Participant);

        debug!(user_id = user_id, role = role.as_str(), "Principal resolved");
        Ok(Principal::new(user_id, role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event_owned_by(organizer_id: i64) -> Event {
        Event {
            id: 1,
            organizer_id,
            title: "Robotics Workshop".to_string(),
            description: None,
            event_type: "normal".to_string(),
            eligibility: "all".to_string(),
            registration_deadline: Utc::now(),
            starts_at: Utc::now(),
            ends_at: Utc::now(),
            capacity: Some(50),
            registration_fee: 0,
            requires_approval: false,
            status: "published".to_string(),
            form_schema: None,
            total_registrations: 0,
            total_revenue: 0,
            total_attendance: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_parse_round_trip() {
        for role in [Role::Participant, Role::Organizer, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn test_organizer_only_manages_own_events() {
        let event = event_owned_by(10);
        assert!(Principal::new(10, Role::Organizer).is_organizer_of(&event));
        assert!(!Principal::new(11, Role::Organizer).is_organizer_of(&event));
        assert!(!Principal::new(10, Role::Participant).is_organizer_of(&event));
    }

    #[test]
    fn test_admin_manages_any_event() {
        let event = event_owned_by(10);
        assert!(Principal::new(99, Role::Admin).is_organizer_of(&event));
    }
}
