//! Attendance check-in service
//!
//! Validates scanned tickets against the registration state machine and
//! records at most one present mark per registration without an explicit
//! override. A duplicate scan is a first-class outcome: it is audited as
//! `duplicate_rejected` and reported as a conflict carrying the original
//! mark, never silently accepted and never re-counted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::database::DatabaseService;
use crate::middleware::auth::Principal;
use crate::models::event::{Event, EventStatus};
use crate::models::registration::{
    AttendanceRow, AttendanceStatus, Registration, RegistrationStatus, ScanAction,
    ScanHistoryEntry,
};
use crate::services::inventory::{attendance_delta, InventoryService};
use crate::services::ticket::TicketService;
use crate::utils::errors::{CampusGateError, Result};
use crate::utils::logging;

const MIN_OVERRIDE_REASON_LEN: usize = 5;

/// Result of a successful scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub registration_id: i64,
    pub participant: String,
    pub marked_at: DateTime<Utc>,
}

/// Aggregated attendance view for an event
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceDashboard {
    pub event_id: i64,
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub not_checked: usize,
    pub rows: Vec<AttendanceRow>,
}

/// Attendance check-in service
#[derive(Clone)]
pub struct AttendanceService {
    db: DatabaseService,
    inventory: InventoryService,
    ticket: TicketService,
}

impl AttendanceService {
    pub fn new(db: DatabaseService, inventory: InventoryService, ticket: TicketService) -> Self {
        Self { db, inventory, ticket }
    }

    /// Validate a scanned ticket and record attendance.
    ///
    /// Legal only while the event is ongoing. The ticket identifier may be
    /// an encrypted QR envelope, a legacy plaintext payload, or a bare
    /// ticket ID.
    pub async fn scan(&self, event_id: i64, ticket_input: &str, principal: &Principal) -> Result<ScanResult> {
        let event = self.require_organizer(event_id, principal).await?;

        if event.status() != EventStatus::Ongoing {
            return Err(CampusGateError::ScanningClosed {
                status: event.status.clone(),
            });
        }

        let ticket_id = self.ticket.extract_ticket_id(ticket_input);
        let registration = self
            .db
            .registrations
            .find_by_ticket(event_id, &ticket_id)
            .await?
            .ok_or_else(|| CampusGateError::TicketNotFound {
                ticket: ticket_id.clone(),
                event_id,
            })?;

        registration.check_scannable()?;

        let participant = self.participant_name(&registration).await?;

        if registration.attendance() == AttendanceStatus::Present {
            return self.reject_duplicate(&registration, participant, principal).await;
        }

        let now = Utc::now();
        let marked = self
            .db
            .registrations
            .mark_present(registration.id, principal.user_id, now)
            .await?;
        if !marked {
            // Lost a race against another scanner; report it like any other
            // duplicate so the counter is not touched twice.
            let current = self.reload(registration.id).await?;
            return self.reject_duplicate(&current, participant, principal).await;
        }

        self.db
            .registrations
            .append_scan_history(registration.id, ScanAction::Scanned, principal.user_id, None)
            .await?;
        self.inventory.adjust_attendance(event_id, 1).await?;

        logging::log_attendance_action(event_id, Some(registration.id), "scanned", principal.user_id);

        Ok(ScanResult {
            registration_id: registration.id,
            participant,
            marked_at: now,
        })
    }

    /// Unconditionally overwrite the attendance state with an organizer
    /// override. The ledger moves by the signed delta relative to the
    /// previous state, so flapping between states never drifts the counter.
    pub async fn manual_override(
        &self,
        event_id: i64,
        registration_id: i64,
        principal: &Principal,
        target: AttendanceStatus,
        reason: &str,
    ) -> Result<Registration> {
        self.require_organizer(event_id, principal).await?;

        if reason.trim().len() < MIN_OVERRIDE_REASON_LEN {
            return Err(CampusGateError::InvalidInput(format!(
                "Override reason must be at least {MIN_OVERRIDE_REASON_LEN} characters"
            )));
        }
        if target == AttendanceStatus::NotChecked {
            return Err(CampusGateError::InvalidInput(
                "Attendance can only be overridden to present or absent".to_string(),
            ));
        }

        let registration = self
            .db
            .registrations
            .find_in_event(event_id, registration_id)
            .await?
            .ok_or(CampusGateError::RegistrationNotFound { registration_id })?;

        let previous = registration.attendance();
        let delta = attendance_delta(
            previous == AttendanceStatus::Present,
            target == AttendanceStatus::Present,
        );

        let overall = RegistrationStatus::derive(
            registration.payment_gate(),
            registration.registration_gate(),
            target,
        );

        let updated = self
            .db
            .registrations
            .override_attendance(
                registration_id,
                target.as_str(),
                overall.as_str(),
                principal.user_id,
                reason,
                Utc::now(),
            )
            .await?;

        let action = match target {
            AttendanceStatus::Present => ScanAction::ManualPresent,
            _ => ScanAction::ManualAbsent,
        };
        self.db
            .registrations
            .append_scan_history(registration_id, action, principal.user_id, Some(reason))
            .await?;

        self.inventory.adjust_attendance(event_id, delta).await?;

        info!(
            registration_id = registration_id,
            event_id = event_id,
            actor_id = principal.user_id,
            from = previous.as_str(),
            to = target.as_str(),
            delta = delta,
            "Attendance manually overridden"
        );

        Ok(updated)
    }

    /// Mark every still-unchecked registration absent. Fires synchronously
    /// when an event transitions to completed or closed; a batch update, not
    /// a scan, so no per-row audit entries are written.
    pub async fn bulk_absence(&self, event_id: i64) -> Result<u64> {
        let marked = self.db.registrations.bulk_mark_absent(event_id, Utc::now()).await?;
        if marked > 0 {
            info!(event_id = event_id, marked = marked, "Unscanned registrations marked absent");
        }
        Ok(marked)
    }

    /// Attendance dashboard: roster filtered to non-blocked payment status
    pub async fn dashboard(&self, event_id: i64, principal: &Principal) -> Result<AttendanceDashboard> {
        self.require_organizer(event_id, principal).await?;
        let rows = self.db.registrations.attendance_roster_rows(event_id).await?;

        let present = rows.iter().filter(|r| r.attendance_status == "present").count();
        let absent = rows.iter().filter(|r| r.attendance_status == "absent").count();
        let not_checked = rows.iter().filter(|r| r.attendance_status == "not_checked").count();

        Ok(AttendanceDashboard {
            event_id,
            total: rows.len(),
            present,
            absent,
            not_checked,
            rows,
        })
    }

    /// CSV export of the attendance roster
    pub async fn export_csv(&self, event_id: i64, principal: &Principal) -> Result<String> {
        let dashboard = self.dashboard(event_id, principal).await?;

        let mut csv = String::from("registration_id,user_id,full_name,email,ticket_id,attendance_status,marked_at,manual_override\n");
        for row in &dashboard.rows {
            let marked_at = row
                .attendance_marked_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default();
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{}\n",
                row.registration_id,
                row.user_id,
                csv_escape(&row.full_name),
                csv_escape(&row.email),
                row.ticket_id.as_deref().unwrap_or(""),
                row.attendance_status,
                marked_at,
                row.manual_override,
            ));
        }
        Ok(csv)
    }

    /// Audit trail for one registration, ordered by occurrence
    pub async fn scan_history(
        &self,
        event_id: i64,
        registration_id: i64,
        principal: &Principal,
    ) -> Result<Vec<ScanHistoryEntry>> {
        self.require_organizer(event_id, principal).await?;

        let registration = self
            .db
            .registrations
            .find_in_event(event_id, registration_id)
            .await?
            .ok_or(CampusGateError::RegistrationNotFound { registration_id })?;

        self.db.registrations.scan_history(registration.id).await
    }

    /// Audit a rejected duplicate and report the conflict with the original
    /// mark metadata.
    async fn reject_duplicate(
        &self,
        registration: &Registration,
        participant: String,
        principal: &Principal,
    ) -> Result<ScanResult> {
        self.db
            .registrations
            .append_scan_history(
                registration.id,
                ScanAction::DuplicateRejected,
                principal.user_id,
                Some("ticket already scanned"),
            )
            .await?;

        warn!(
            registration_id = registration.id,
            event_id = registration.event_id,
            actor_id = principal.user_id,
            "Duplicate scan rejected"
        );

        Err(CampusGateError::DuplicateScan {
            marked_at: registration.attendance_marked_at.unwrap_or(registration.updated_at),
            participant,
        })
    }

    async fn participant_name(&self, registration: &Registration) -> Result<String> {
        let user = self
            .db
            .users
            .find_by_id(registration.user_id)
            .await?
            .ok_or(CampusGateError::UserNotFound { user_id: registration.user_id })?;
        Ok(user.full_name)
    }

    async fn reload(&self, registration_id: i64) -> Result<Registration> {
        self.db
            .registrations
            .find_by_id(registration_id)
            .await?
            .ok_or(CampusGateError::RegistrationNotFound { registration_id })
    }

    async fn require_organizer(&self, event_id: i64, principal: &Principal) -> Result<Event> {
        let event = self
            .db
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(CampusGateError::EventNotFound { event_id })?;
        if !principal.is_organizer_of(&event) {
            return Err(CampusGateError::PermissionDenied(
                "Only the event organizer can manage attendance".to_string(),
            ));
        }
        Ok(event)
    }
}

/// Quote a CSV field when it contains a delimiter, quote or newline
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
