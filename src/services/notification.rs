//! Notification service implementation
//!
//! Outbound confirmation and publication announcements as JSON webhook
//! posts. Dispatch is fire-and-forget: each message is sent from a spawned
//! task, and a delivery failure is logged but never propagated to the
//! operation that triggered it.

use std::time::Duration;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::settings::Settings;
use crate::models::event::Event;

/// Outbound notification payload
#[derive(Debug, Clone, Serialize)]
pub struct NotificationMessage {
    pub kind: String,
    pub event_id: i64,
    pub title: String,
    pub body: String,
}

/// Notification service for webhook dispatch
#[derive(Clone)]
pub struct NotificationService {
    client: reqwest::Client,
    webhook_url: Option<String>,
    enabled: bool,
}

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(settings: &Settings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.notifications.timeout_seconds))
            .build()
            .unwrap_or_default();

        Self {
            client,
            webhook_url: settings.notifications.webhook_url.clone(),
            enabled: settings.notifications.enabled,
        }
    }

    /// Announce that an event has been published
    pub fn notify_event_published(&self, event: &Event) {
        self.dispatch(NotificationMessage {
            kind: "event_published".to_string(),
            event_id: event.id,
            title: event.title.clone(),
            body: format!("Registrations are open for \"{}\"", event.title),
        });
    }

    /// Confirm a finalized registration to its owner
    pub fn notify_registration_confirmed(&self, event: &Event, user_id: i64, ticket_id: &str) {
        self.dispatch(NotificationMessage {
            kind: "registration_confirmed".to_string(),
            event_id: event.id,
            title: event.title.clone(),
            body: format!("Registration confirmed for user {user_id}, ticket {ticket_id}"),
        });
    }

    /// Tell a user their payment or registration was rejected
    pub fn notify_rejection(&self, event: &Event, user_id: i64, reason: &str) {
        self.dispatch(NotificationMessage {
            kind: "registration_rejected".to_string(),
            event_id: event.id,
            title: event.title.clone(),
            body: format!("Registration update for user {user_id}: {reason}"),
        });
    }

    /// Send the message from a detached task. Failure is logged, never
    /// surfaced to the caller.
    fn dispatch(&self, message: NotificationMessage) {
        if !self.enabled {
            debug!(kind = %message.kind, event_id = message.event_id, "Notifications disabled, skipping dispatch");
            return;
        }
        let Some(url) = self.webhook_url.clone() else {
            return;
        };

        let client = self.client.clone();
        tokio::spawn(async move {
            match client.post(&url).json(&message).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(kind = %message.kind, event_id = message.event_id, "Notification delivered");
                }
                Ok(response) => {
                    warn!(
                        kind = %message.kind,
                        event_id = message.event_id,
                        status = %response.status(),
                        "Notification rejected by webhook"
                    );
                }
                Err(e) => {
                    crate::utils::logging::log_notification_failure(
                        message.event_id,
                        &message.kind,
                        &e.to_string(),
                    );
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_service_drops_messages() {
        let settings = Settings::default();
        let service = NotificationService::new(&settings);
        let event = crate::models::event::Event {
            id: 1,
            organizer_id: 1,
            title: "Fest".to_string(),
            description: None,
            event_type: "normal".to_string(),
            eligibility: "all".to_string(),
            registration_deadline: chrono::Utc::now(),
            starts_at: chrono::Utc::now(),
            ends_at: chrono::Utc::now(),
            capacity: Some(10),
            registration_fee: 0,
            requires_approval: false,
            status: "published".to_string(),
            form_schema: None,
            total_registrations: 0,
            total_revenue: 0,
            total_attendance: 0,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        // Must not panic or block; dispatch is a no-op when disabled
        service.notify_event_published(&event);
        service.notify_registration_confirmed(&event, 42, "t-1");
    }
}
