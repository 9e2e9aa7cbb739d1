//! Event model and publication lifecycle rules
//!
//! An event moves through an explicit, organizer-driven status lifecycle.
//! The stored status is authoritative; nothing is recomputed from wall-clock
//! time. Edit rights narrow as the status advances.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::utils::errors::{CampusGateError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub organizer_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub event_type: String,
    pub eligibility: String,
    pub registration_deadline: DateTime<Utc>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: Option<i32>,
    pub registration_fee: i64,
    pub requires_approval: bool,
    pub status: String,
    pub form_schema: Option<serde_json::Value>,
    pub total_registrations: i32,
    pub total_revenue: i64,
    pub total_attendance: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One merchandise variant of an event, with its own stock and price
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MerchVariant {
    pub id: i64,
    pub event_id: i64,
    pub size: Option<String>,
    pub color: Option<String>,
    pub stock_quantity: i32,
    pub unit_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub event_type: EventType,
    pub eligibility: Eligibility,
    pub registration_deadline: DateTime<Utc>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: Option<i32>,
    #[serde(default)]
    pub registration_fee: i64,
    #[serde(default)]
    pub requires_approval: bool,
    pub form_schema: Option<serde_json::Value>,
    #[serde(default)]
    pub variants: Vec<CreateVariantRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVariantRequest {
    pub size: Option<String>,
    pub color: Option<String>,
    pub stock_quantity: i32,
    pub unit_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub capacity: Option<i32>,
    pub form_schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Normal,
    Merchandise,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Normal => "normal",
            EventType::Merchandise => "merchandise",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(EventType::Normal),
            "merchandise" => Some(EventType::Merchandise),
            _ => None,
        }
    }
}

/// Who may register for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    All,
    Campus,
    External,
}

impl Eligibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Eligibility::All => "all",
            Eligibility::Campus => "campus",
            Eligibility::External => "external",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(Eligibility::All),
            "campus" => Some(Eligibility::Campus),
            "external" => Some(Eligibility::External),
            _ => None,
        }
    }

    /// Whether a user with the given campus-student flag may register
    pub fn allows(&self, is_campus_student: bool) -> bool {
        match self {
            Eligibility::All => true,
            Eligibility::Campus => is_campus_student,
            Eligibility::External => !is_campus_student,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Draft,
    Published,
    Ongoing,
    Completed,
    Closed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Published => "published",
            EventStatus::Ongoing => "ongoing",
            EventStatus::Completed => "completed",
            EventStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(EventStatus::Draft),
            "published" => Some(EventStatus::Published),
            "ongoing" => Some(EventStatus::Ongoing),
            "completed" => Some(EventStatus::Completed),
            "closed" => Some(EventStatus::Closed),
            _ => None,
        }
    }

    /// Allowed organizer-driven transitions
    pub fn can_transition_to(&self, to: EventStatus) -> bool {
        matches!(
            (self, to),
            (EventStatus::Draft, EventStatus::Published)
                | (EventStatus::Published, EventStatus::Ongoing)
                | (EventStatus::Published, EventStatus::Closed)
                | (EventStatus::Published, EventStatus::Completed)
                | (EventStatus::Ongoing, EventStatus::Completed)
                | (EventStatus::Ongoing, EventStatus::Closed)
        )
    }

    /// Statuses that accept new registrations
    pub fn accepts_registrations(&self) -> bool {
        matches!(self, EventStatus::Published | EventStatus::Ongoing)
    }

    /// Entering this status marks every unscanned registration absent
    pub fn triggers_bulk_absence(&self) -> bool {
        matches!(self, EventStatus::Completed | EventStatus::Closed)
    }
}

impl Event {
    pub fn status(&self) -> EventStatus {
        EventStatus::parse(&self.status).unwrap_or(EventStatus::Draft)
    }

    pub fn event_type(&self) -> EventType {
        EventType::parse(&self.event_type).unwrap_or(EventType::Normal)
    }

    pub fn eligibility(&self) -> Eligibility {
        Eligibility::parse(&self.eligibility).unwrap_or(Eligibility::All)
    }

    pub fn is_merchandise(&self) -> bool {
        self.event_type() == EventType::Merchandise
    }

    /// Validate that this event currently accepts a registration submission.
    /// Capacity is checked separately against the live registration count.
    pub fn check_accepting_registrations(&self, now: DateTime<Utc>) -> Result<()> {
        if !self.status().accepts_registrations() {
            return Err(CampusGateError::RegistrationClosed {
                status: self.status.clone(),
            });
        }
        if now >= self.registration_deadline {
            return Err(CampusGateError::RegistrationClosed {
                status: "deadline passed".to_string(),
            });
        }
        Ok(())
    }

    /// Validate a field edit against the current status.
    ///
    /// Draft events are freely editable. Published events accept only the
    /// description plus monotonic increases to deadline and capacity. Later
    /// statuses reject all field edits.
    pub fn check_edit_allowed(&self, update: &UpdateEventRequest) -> Result<()> {
        match self.status() {
            EventStatus::Draft => Ok(()),
            EventStatus::Published => {
                if update.title.is_some() || update.form_schema.is_some() {
                    return Err(CampusGateError::InvalidInput(
                        "Only description, deadline and capacity can change after publishing".to_string(),
                    ));
                }
                if let Some(deadline) = update.registration_deadline {
                    if deadline < self.registration_deadline {
                        return Err(CampusGateError::InvalidInput(
                            "Registration deadline can only be extended".to_string(),
                        ));
                    }
                }
                if let (Some(new_capacity), Some(current)) = (update.capacity, self.capacity) {
                    if new_capacity < current {
                        return Err(CampusGateError::InvalidInput(
                            "Capacity can only be increased".to_string(),
                        ));
                    }
                }
                Ok(())
            }
            status => Err(CampusGateError::InvalidStateTransition {
                from: status.as_str().to_string(),
                to: "edit".to_string(),
            }),
        }
    }
}

impl CreateEventRequest {
    /// Structural invariants checked before a draft is created
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(CampusGateError::InvalidInput("Title is required".to_string()));
        }
        if self.starts_at >= self.ends_at {
            return Err(CampusGateError::InvalidInput(
                "Event start must be before event end".to_string(),
            ));
        }
        match self.event_type {
            EventType::Normal => {
                if self.capacity.map_or(true, |c| c <= 0) {
                    return Err(CampusGateError::InvalidInput(
                        "A normal event requires a positive capacity".to_string(),
                    ));
                }
            }
            EventType::Merchandise => {
                if self.variants.is_empty() {
                    return Err(CampusGateError::InvalidInput(
                        "A merchandise event requires at least one variant".to_string(),
                    ));
                }
            }
        }
        for variant in &self.variants {
            if variant.stock_quantity < 0 || variant.unit_price < 0 {
                return Err(CampusGateError::InvalidInput(
                    "Variant stock and price must be non-negative".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Fee actually stored: merchandise events carry their fee on the variant
    pub fn effective_fee(&self) -> i64 {
        match self.event_type {
            EventType::Normal => self.registration_fee,
            EventType::Merchandise => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn normal_request() -> CreateEventRequest {
        CreateEventRequest {
            title: "Tech Talk".to_string(),
            description: None,
            event_type: EventType::Normal,
            eligibility: Eligibility::All,
            registration_deadline: Utc::now() + Duration::days(1),
            starts_at: Utc::now() + Duration::days(2),
            ends_at: Utc::now() + Duration::days(3),
            capacity: Some(100),
            registration_fee: 0,
            requires_approval: false,
            form_schema: None,
            variants: vec![],
        }
    }

    fn published_event() -> Event {
        Event {
            id: 1,
            organizer_id: 1,
            title: "Tech Talk".to_string(),
            description: None,
            event_type: "normal".to_string(),
            eligibility: "all".to_string(),
            registration_deadline: Utc::now() + Duration::days(1),
            starts_at: Utc::now() + Duration::days(2),
            ends_at: Utc::now() + Duration::days(3),
            capacity: Some(100),
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
    fn test_transition_graph() {
        assert!(EventStatus::Draft.can_transition_to(EventStatus::Published));
        assert!(EventStatus::Published.can_transition_to(EventStatus::Ongoing));
        assert!(EventStatus::Published.can_transition_to(EventStatus::Closed));
        assert!(EventStatus::Ongoing.can_transition_to(EventStatus::Completed));
        assert!(!EventStatus::Draft.can_transition_to(EventStatus::Ongoing));
        assert!(!EventStatus::Completed.can_transition_to(EventStatus::Published));
        assert!(!EventStatus::Closed.can_transition_to(EventStatus::Completed));
    }

    #[test]
    fn test_merchandise_event_requires_variants() {
        let mut request = normal_request();
        request.event_type = EventType::Merchandise;
        request.capacity = None;
        assert!(request.validate().is_err());

        request.variants.push(CreateVariantRequest {
            size: Some("M".to_string()),
            color: Some("black".to_string()),
            stock_quantity: 50,
            unit_price: 500,
        });
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_merchandise_fee_forced_to_zero() {
        let mut request = normal_request();
        request.event_type = EventType::Merchandise;
        request.registration_fee = 250;
        request.variants.push(CreateVariantRequest {
            size: None,
            color: None,
            stock_quantity: 10,
            unit_price: 500,
        });
        assert_eq!(request.effective_fee(), 0);
    }

    #[test]
    fn test_normal_event_requires_capacity() {
        let mut request = normal_request();
        request.capacity = None;
        assert!(request.validate().is_err());
        request.capacity = Some(0);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_registration_window() {
        let mut event = published_event();
        assert!(event.check_accepting_registrations(Utc::now()).is_ok());

        event.status = "draft".to_string();
        assert!(event.check_accepting_registrations(Utc::now()).is_err());

        event.status = "ongoing".to_string();
        assert!(event.check_accepting_registrations(Utc::now()).is_ok());

        event.registration_deadline = Utc::now() - Duration::hours(1);
        assert!(event.check_accepting_registrations(Utc::now()).is_err());
    }

    #[test]
    fn test_published_edits_are_monotonic() {
        let event = published_event();

        let extend = UpdateEventRequest {
            title: None,
            description: Some("updated".to_string()),
            registration_deadline: Some(event.registration_deadline + Duration::days(1)),
            capacity: Some(150),
            form_schema: None,
        };
        assert!(event.check_edit_allowed(&extend).is_ok());

        let shrink = UpdateEventRequest {
            title: None,
            description: None,
            registration_deadline: None,
            capacity: Some(50),
            form_schema: None,
        };
        assert!(event.check_edit_allowed(&shrink).is_err());

        let retitle = UpdateEventRequest {
            title: Some("New title".to_string()),
            description: None,
            registration_deadline: None,
            capacity: None,
            form_schema: None,
        };
        assert!(event.check_edit_allowed(&retitle).is_err());
    }

    #[test]
    fn test_completed_event_is_frozen() {
        let mut event = published_event();
        event.status = "completed".to_string();
        let update = UpdateEventRequest {
            title: None,
            description: Some("late edit".to_string()),
            registration_deadline: None,
            capacity: None,
            form_schema: None,
        };
        assert!(event.check_edit_allowed(&update).is_err());
    }

    #[test]
    fn test_eligibility_filter() {
        assert!(Eligibility::All.allows(true));
        assert!(Eligibility::All.allows(false));
        assert!(Eligibility::Campus.allows(true));
        assert!(!Eligibility::Campus.allows(false));
        assert!(!Eligibility::External.allows(true));
        assert!(Eligibility::External.allows(false));
    }
}
