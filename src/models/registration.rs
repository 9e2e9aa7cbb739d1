//! Registration model and approval state machine
//!
//! A registration carries two independent approval gates (payment and
//! registration approval). The overall status is always derived from the
//! gates plus attendance, never stored independently of them. A ticket and
//! QR exist if and only if both gates are in a non-blocking state.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::models::event::{Event, MerchVariant};
use crate::utils::errors::{CampusGateError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Registration {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub status: String,
    pub payment_approval: String,
    pub registration_approval: String,
    pub payment_proof_path: Option<String>,
    pub payment_rejection_reason: Option<String>,
    pub registration_rejection_reason: Option<String>,
    pub ticket_id: Option<String>,
    pub qr_encrypted: Option<String>,
    pub qr_iv: Option<String>,
    pub attendance_status: String,
    pub attendance_marked_at: Option<DateTime<Utc>>,
    pub attendance_marked_by: Option<i64>,
    pub manual_override: bool,
    pub override_reason: Option<String>,
    pub variant_id: Option<i64>,
    pub quantity: Option<i32>,
    pub form_answers: Option<serde_json::Value>,
    pub team_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only audit entry for attendance activity on a registration
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScanHistoryEntry {
    pub id: i64,
    pub registration_id: i64,
    pub action: String,
    pub actor_id: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One approval gate on a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalGate {
    NotRequired,
    Pending,
    Approved,
    Rejected,
}

impl ApprovalGate {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalGate::NotRequired => "not_required",
            ApprovalGate::Pending => "pending",
            ApprovalGate::Approved => "approved",
            ApprovalGate::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_required" => Some(ApprovalGate::NotRequired),
            "pending" => Some(ApprovalGate::Pending),
            "approved" => Some(ApprovalGate::Approved),
            "rejected" => Some(ApprovalGate::Rejected),
            _ => None,
        }
    }

    /// Terminal non-blocking state: the gate no longer withholds a ticket
    pub fn is_cleared(&self) -> bool {
        matches!(self, ApprovalGate::NotRequired | ApprovalGate::Approved)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ApprovalGate::Pending)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, ApprovalGate::Rejected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Registered,
    Attended,
    Cancelled,
    Rejected,
    PendingApproval,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Registered => "registered",
            RegistrationStatus::Attended => "attended",
            RegistrationStatus::Cancelled => "cancelled",
            RegistrationStatus::Rejected => "rejected",
            RegistrationStatus::PendingApproval => "pending_approval",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "registered" => Some(RegistrationStatus::Registered),
            "attended" => Some(RegistrationStatus::Attended),
            "cancelled" => Some(RegistrationStatus::Cancelled),
            "rejected" => Some(RegistrationStatus::Rejected),
            "pending_approval" => Some(RegistrationStatus::PendingApproval),
            _ => None,
        }
    }

    /// Derive the overall status from the two gates and attendance.
    ///
    /// A rejection on either gate dominates; any pending required gate keeps
    /// the registration in pending approval; otherwise attendance decides
    /// between registered and attended.
    pub fn derive(
        payment: ApprovalGate,
        registration: ApprovalGate,
        attendance: AttendanceStatus,
    ) -> Self {
        if payment.is_rejected() || registration.is_rejected() {
            return RegistrationStatus::Rejected;
        }
        if payment.is_pending() || registration.is_pending() {
            return RegistrationStatus::PendingApproval;
        }
        if attendance == AttendanceStatus::Present {
            return RegistrationStatus::Attended;
        }
        RegistrationStatus::Registered
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    NotChecked,
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::NotChecked => "not_checked",
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_checked" => Some(AttendanceStatus::NotChecked),
            "present" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            _ => None,
        }
    }
}

/// Audit actions recorded in scan history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanAction {
    Scanned,
    ManualPresent,
    ManualAbsent,
    DuplicateRejected,
}

impl ScanAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanAction::Scanned => "scanned",
            ScanAction::ManualPresent => "manual_present",
            ScanAction::ManualAbsent => "manual_absent",
            ScanAction::DuplicateRejected => "duplicate_rejected",
        }
    }
}

/// Registration submission body. Exactly one payload arm must match the
/// event type; `RegistrationPayload::from_request` enforces that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRegistrationRequest {
    pub team_name: Option<String>,
    pub form_answers: Option<serde_json::Value>,
    pub variant_id: Option<i64>,
    pub quantity: Option<i32>,
}

/// Payload of a registration, discriminated by the parent event's type
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationPayload {
    FormAnswers(serde_json::Value),
    Merchandise { variant_id: i64, quantity: i32 },
}

impl RegistrationPayload {
    /// Validate the submission body against the event type so only one arm
    /// is ever populated.
    pub fn from_request(event: &Event, request: &SubmitRegistrationRequest) -> Result<Self> {
        if event.is_merchandise() {
            if request.form_answers.is_some() {
                return Err(CampusGateError::InvalidInput(
                    "Form answers are not accepted for a merchandise event".to_string(),
                ));
            }
            let variant_id = request.variant_id.ok_or_else(|| {
                CampusGateError::InvalidInput("A merchandise variant must be selected".to_string())
            })?;
            let quantity = request.quantity.unwrap_or(1);
            if quantity <= 0 {
                return Err(CampusGateError::InvalidInput(
                    "Quantity must be positive".to_string(),
                ));
            }
            Ok(RegistrationPayload::Merchandise { variant_id, quantity })
        } else {
            if request.variant_id.is_some() || request.quantity.is_some() {
                return Err(CampusGateError::InvalidInput(
                    "Merchandise selection is not accepted for a normal event".to_string(),
                ));
            }
            let answers = request
                .form_answers
                .clone()
                .unwrap_or(serde_json::Value::Null);
            Ok(RegistrationPayload::FormAnswers(answers))
        }
    }
}

/// Compute the initial approval gates for a submission.
///
/// Payment is required when money changes hands (variant price or event
/// fee). Registration approval is required when the event demands it.
pub fn initial_gates(event: &Event, variant: Option<&MerchVariant>) -> (ApprovalGate, ApprovalGate) {
    let owes_payment = match variant {
        Some(v) => v.unit_price > 0,
        None => event.registration_fee > 0,
    };
    let payment = if owes_payment {
        ApprovalGate::Pending
    } else {
        ApprovalGate::NotRequired
    };
    let registration = if event.requires_approval {
        ApprovalGate::Pending
    } else {
        ApprovalGate::NotRequired
    };
    (payment, registration)
}

impl Registration {
    pub fn status(&self) -> RegistrationStatus {
        RegistrationStatus::parse(&self.status).unwrap_or(RegistrationStatus::PendingApproval)
    }

    pub fn payment_gate(&self) -> ApprovalGate {
        ApprovalGate::parse(&self.payment_approval).unwrap_or(ApprovalGate::Pending)
    }

    pub fn registration_gate(&self) -> ApprovalGate {
        ApprovalGate::parse(&self.registration_approval).unwrap_or(ApprovalGate::Pending)
    }

    pub fn attendance(&self) -> AttendanceStatus {
        AttendanceStatus::parse(&self.attendance_status).unwrap_or(AttendanceStatus::NotChecked)
    }

    /// Both gates cleared: a ticket may exist and finalization may run
    pub fn gates_cleared(&self) -> bool {
        self.payment_gate().is_cleared() && self.registration_gate().is_cleared()
    }

    /// Finalization has not happened yet (the persisted marker is ticket_id)
    pub fn awaiting_finalization(&self) -> bool {
        self.gates_cleared() && self.ticket_id.is_none()
    }

    /// Ordered gating checks a ticket must pass before attendance can be
    /// recorded. Each violation carries its own named message.
    pub fn check_scannable(&self) -> Result<()> {
        match self.status() {
            RegistrationStatus::Cancelled => {
                return Err(CampusGateError::NotApprovedForCheckIn(
                    "registration is cancelled".to_string(),
                ))
            }
            RegistrationStatus::Rejected => {
                return Err(CampusGateError::NotApprovedForCheckIn(
                    "registration is rejected".to_string(),
                ))
            }
            RegistrationStatus::PendingApproval => {
                return Err(CampusGateError::NotApprovedForCheckIn(
                    "registration is awaiting approval".to_string(),
                ))
            }
            RegistrationStatus::Registered | RegistrationStatus::Attended => {}
        }

        let payment = self.payment_gate();
        if payment.is_pending() {
            return Err(CampusGateError::NotApprovedForCheckIn(
                "payment approval is pending".to_string(),
            ));
        }
        if payment.is_rejected() {
            return Err(CampusGateError::NotApprovedForCheckIn(
                "payment was rejected".to_string(),
            ));
        }

        let registration = self.registration_gate();
        if registration.is_pending() {
            return Err(CampusGateError::NotApprovedForCheckIn(
                "registration approval is pending".to_string(),
            ));
        }
        if registration.is_rejected() {
            return Err(CampusGateError::NotApprovedForCheckIn(
                "registration approval was rejected".to_string(),
            ));
        }

        if self.qr_encrypted.is_none() {
            return Err(CampusGateError::NotApprovedForCheckIn(
                "no ticket has been issued".to_string(),
            ));
        }

        Ok(())
    }
}

/// Flags returned to the caller after submission, indicating what remains
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationOutcome {
    pub registration_id: i64,
    pub status: RegistrationStatus,
    pub ticket_id: Option<String>,
    pub requires_payment_proof: bool,
    pub requires_approval: bool,
}

/// Read model for the attendance dashboard and CSV export
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceRow {
    pub registration_id: i64,
    pub user_id: i64,
    pub full_name: String,
    pub email: String,
    pub ticket_id: Option<String>,
    pub attendance_status: String,
    pub attendance_marked_at: Option<DateTime<Utc>>,
    pub manual_override: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualAttendanceRequest {
    pub target_status: AttendanceStatus,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::Event;

    fn event(fee: i64, requires_approval: bool, merchandise: bool) -> Event {
        Event {
            id: 1,
            organizer_id: 1,
            title: "Fest".to_string(),
            description: None,
            event_type: if merchandise { "merchandise" } else { "normal" }.to_string(),
            eligibility: "all".to_string(),
            registration_deadline: Utc::now(),
            starts_at: Utc::now(),
            ends_at: Utc::now(),
            capacity: Some(10),
            registration_fee: fee,
            requires_approval,
            status: "published".to_string(),
            form_schema: None,
            total_registrations: 0,
            total_revenue: 0,
            total_attendance: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn variant(price: i64) -> MerchVariant {
        MerchVariant {
            id: 9,
            event_id: 1,
            size: Some("M".to_string()),
            color: None,
            stock_quantity: 5,
            unit_price: price,
        }
    }

    fn registration() -> Registration {
        Registration {
            id: 1,
            event_id: 1,
            user_id: 2,
            status: "registered".to_string(),
            payment_approval: "not_required".to_string(),
            registration_approval: "not_required".to_string(),
            payment_proof_path: None,
            payment_rejection_reason: None,
            registration_rejection_reason: None,
            ticket_id: Some("t-1".to_string()),
            qr_encrypted: Some("aabb".to_string()),
            qr_iv: Some("ccdd".to_string()),
            attendance_status: "not_checked".to_string(),
            attendance_marked_at: None,
            attendance_marked_by: None,
            manual_override: false,
            override_reason: None,
            variant_id: None,
            quantity: None,
            form_answers: None,
            team_name: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_status_derivation() {
        use ApprovalGate::*;
        use AttendanceStatus::*;

        assert_eq!(
            RegistrationStatus::derive(NotRequired, NotRequired, NotChecked),
            RegistrationStatus::Registered
        );
        assert_eq!(
            RegistrationStatus::derive(Pending, NotRequired, NotChecked),
            RegistrationStatus::PendingApproval
        );
        assert_eq!(
            RegistrationStatus::derive(Approved, Pending, NotChecked),
            RegistrationStatus::PendingApproval
        );
        assert_eq!(
            RegistrationStatus::derive(Rejected, Pending, NotChecked),
            RegistrationStatus::Rejected
        );
        assert_eq!(
            RegistrationStatus::derive(Approved, Rejected, NotChecked),
            RegistrationStatus::Rejected
        );
        assert_eq!(
            RegistrationStatus::derive(Approved, Approved, Present),
            RegistrationStatus::Attended
        );
        assert_eq!(
            RegistrationStatus::derive(NotRequired, NotRequired, Absent),
            RegistrationStatus::Registered
        );
    }

    #[test]
    fn test_initial_gates_free_event() {
        let (payment, registration) = initial_gates(&event(0, false, false), None);
        assert_eq!(payment, ApprovalGate::NotRequired);
        assert_eq!(registration, ApprovalGate::NotRequired);
    }

    #[test]
    fn test_initial_gates_paid_event_with_approval() {
        let (payment, registration) = initial_gates(&event(150, true, false), None);
        assert_eq!(payment, ApprovalGate::Pending);
        assert_eq!(registration, ApprovalGate::Pending);
    }

    #[test]
    fn test_initial_gates_follow_variant_price() {
        let e = event(0, false, true);
        let (payment, _) = initial_gates(&e, Some(&variant(500)));
        assert_eq!(payment, ApprovalGate::Pending);

        let (payment, _) = initial_gates(&e, Some(&variant(0)));
        assert_eq!(payment, ApprovalGate::NotRequired);
    }

    #[test]
    fn test_payload_tagged_by_event_type() {
        let merch = event(0, false, true);
        let normal = event(0, false, false);

        let request = SubmitRegistrationRequest {
            team_name: None,
            form_answers: None,
            variant_id: Some(9),
            quantity: Some(2),
        };
        assert_eq!(
            RegistrationPayload::from_request(&merch, &request).unwrap(),
            RegistrationPayload::Merchandise { variant_id: 9, quantity: 2 }
        );
        // Merchandise selection against a normal event is rejected
        assert!(RegistrationPayload::from_request(&normal, &request).is_err());

        let request = SubmitRegistrationRequest {
            team_name: None,
            form_answers: Some(serde_json::json!({"q1": "yes"})),
            variant_id: None,
            quantity: None,
        };
        assert!(matches!(
            RegistrationPayload::from_request(&normal, &request).unwrap(),
            RegistrationPayload::FormAnswers(_)
        ));
        assert!(RegistrationPayload::from_request(&merch, &request).is_err());
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let merch = event(0, false, true);
        let request = SubmitRegistrationRequest {
            team_name: None,
            form_answers: None,
            variant_id: Some(9),
            quantity: Some(0),
        };
        assert!(RegistrationPayload::from_request(&merch, &request).is_err());
    }

    #[test]
    fn test_scannable_happy_path() {
        assert!(registration().check_scannable().is_ok());
    }

    #[test]
    fn test_scannable_blocked_by_pending_gate() {
        let mut reg = registration();
        reg.status = "pending_approval".to_string();
        reg.payment_approval = "pending".to_string();
        reg.ticket_id = None;
        reg.qr_encrypted = None;
        let err = reg.check_scannable().unwrap_err();
        assert!(err.to_string().contains("awaiting approval"));
    }

    #[test]
    fn test_scannable_blocked_by_rejected_payment() {
        let mut reg = registration();
        reg.status = "rejected".to_string();
        reg.payment_approval = "rejected".to_string();
        let err = reg.check_scannable().unwrap_err();
        assert!(err.to_string().contains("rejected"));
    }

    #[test]
    fn test_scannable_requires_issued_qr() {
        let mut reg = registration();
        reg.qr_encrypted = None;
        let err = reg.check_scannable().unwrap_err();
        assert!(err.to_string().contains("no ticket"));
    }

    #[test]
    fn test_ticket_implies_cleared_gates() {
        // Invariant: a ticket can only coexist with cleared gates
        let reg = registration();
        assert!(reg.ticket_id.is_some());
        assert!(reg.gates_cleared());
        assert!(!reg.awaiting_finalization());
    }

    #[test]
    fn test_awaiting_finalization_marker() {
        let mut reg = registration();
        reg.ticket_id = None;
        assert!(reg.awaiting_finalization());

        reg.payment_approval = "pending".to_string();
        assert!(!reg.awaiting_finalization());
    }
}
