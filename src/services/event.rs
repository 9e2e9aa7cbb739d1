//! Event publication lifecycle service
//!
//! Events move through an explicit, organizer-driven status lifecycle:
//! draft -> published -> ongoing -> completed, with closed as an early
//! terminal exit. The stored status gates registration acceptance and
//! ticket scanning; entering completed or closed synchronously marks every
//! unscanned registration absent.

use tracing::info;

use crate::database::DatabaseService;
use crate::middleware::auth::Principal;
use crate::models::event::{CreateEventRequest, Event, EventStatus, MerchVariant, UpdateEventRequest};
use crate::services::attendance::AttendanceService;
use crate::services::notification::NotificationService;
use crate::utils::errors::{CampusGateError, Result};
use crate::utils::logging;

/// Event with its merchandise variants
#[derive(Debug, Clone, serde::Serialize)]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub variants: Vec<MerchVariant>,
}

/// Event publication lifecycle service
#[derive(Clone)]
pub struct EventService {
    db: DatabaseService,
    notifications: NotificationService,
    attendance: AttendanceService,
}

impl EventService {
    pub fn new(db: DatabaseService, notifications: NotificationService, attendance: AttendanceService) -> Self {
        Self { db, notifications, attendance }
    }

    /// Create a new draft event owned by the caller
    pub async fn create(&self, principal: &Principal, request: CreateEventRequest) -> Result<EventDetail> {
        request.validate()?;

        let event = self.db.events.create(principal.user_id, request).await?;
        let variants = self.db.events.find_variants(event.id).await?;

        info!(event_id = event.id, organizer_id = principal.user_id, "Event draft created");
        Ok(EventDetail { event, variants })
    }

    /// Fetch an event with its variants
    pub async fn get(&self, event_id: i64) -> Result<EventDetail> {
        let event = self.load(event_id).await?;
        let variants = self.db.events.find_variants(event_id).await?;
        Ok(EventDetail { event, variants })
    }

    /// Edit event fields, subject to the current status's edit rules
    pub async fn update(
        &self,
        event_id: i64,
        principal: &Principal,
        request: UpdateEventRequest,
    ) -> Result<EventDetail> {
        let event = self.require_organizer(event_id, principal).await?;
        event.check_edit_allowed(&request)?;

        let updated = self.db.events.update_fields(event_id, request).await?;
        let variants = self.db.events.find_variants(event_id).await?;

        info!(event_id = event_id, "Event updated");
        Ok(EventDetail { event: updated, variants })
    }

    /// Drive an explicit status transition.
    ///
    /// Publishing announces the event (best-effort); entering completed or
    /// closed marks every unscanned registration absent before returning.
    pub async fn transition(
        &self,
        event_id: i64,
        principal: &Principal,
        to: EventStatus,
    ) -> Result<EventDetail> {
        let event = self.require_organizer(event_id, principal).await?;
        let from = event.status();

        if !from.can_transition_to(to) {
            return Err(CampusGateError::InvalidStateTransition {
                from: from.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }

        let moved = self
            .db
            .events
            .transition_status(event_id, from.as_str(), to.as_str())
            .await?;
        if !moved {
            return Err(CampusGateError::AlreadyProcessed(
                "event status changed concurrently".to_string(),
            ));
        }

        logging::log_event_transition(event_id, from.as_str(), to.as_str(), principal.user_id);

        if to == EventStatus::Published {
            self.notifications.notify_event_published(&event);
        }
        if to.triggers_bulk_absence() {
            self.attendance.bulk_absence(event_id).await?;
        }

        self.get(event_id).await
    }

    /// Delete an event. Permitted only while still a draft; anything already
    /// attached (registrations, variants) is removed with it.
    pub async fn delete(&self, event_id: i64, principal: &Principal) -> Result<()> {
        let event = self.require_organizer(event_id, principal).await?;

        if event.status() != EventStatus::Draft {
            return Err(CampusGateError::InvalidStateTransition {
                from: event.status.clone(),
                to: "deleted".to_string(),
            });
        }

        self.db.events.delete(event_id).await?;
        info!(event_id = event_id, "Draft event deleted");
        Ok(())
    }

    async fn load(&self, event_id: i64) -> Result<Event> {
        self.db
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(CampusGateError::EventNotFound { event_id })
    }

    async fn require_organizer(&self, event_id: i64, principal: &Principal) -> Result<Event> {
        let event = self.load(event_id).await?;
        if !principal.is_organizer_of(&event) {
            return Err(CampusGateError::PermissionDenied(
                "Only the event organizer can manage this event".to_string(),
            ));
        }
        Ok(event)
    }
}
