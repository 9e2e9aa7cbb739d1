//! Registration lifecycle scenarios: gate computation, status derivation and
//! finalization readiness across the approval paths.

mod common;

use assert_matches::assert_matches;
use CampusGate::models::registration::{
    initial_gates, ApprovalGate, AttendanceStatus, RegistrationPayload, RegistrationStatus,
    SubmitRegistrationRequest,
};
use CampusGate::utils::errors::CampusGateError;

use common::{merch_event, published_event, registration, variant};

#[test]
fn free_open_event_finalizes_immediately() {
    let event = published_event(0, false);
    let (payment, approval) = initial_gates(&event, None);

    assert_eq!(payment, ApprovalGate::NotRequired);
    assert_eq!(approval, ApprovalGate::NotRequired);
    assert_eq!(
        RegistrationStatus::derive(payment, approval, AttendanceStatus::NotChecked),
        RegistrationStatus::Registered
    );

    let mut reg = registration("not_required", "not_required");
    reg.status = "registered".to_string();
    assert!(reg.awaiting_finalization());

    // Once the ticket is persisted the registration is settled.
    reg.ticket_id = Some("t-1".to_string());
    assert!(!reg.awaiting_finalization());
}

#[test]
fn paid_approval_event_holds_both_gates() {
    let event = published_event(150, true);
    let (payment, approval) = initial_gates(&event, None);

    assert_eq!(payment, ApprovalGate::Pending);
    assert_eq!(approval, ApprovalGate::Pending);
    assert_eq!(
        RegistrationStatus::derive(payment, approval, AttendanceStatus::NotChecked),
        RegistrationStatus::PendingApproval
    );
}

#[test]
fn dual_gate_flow_finalizes_only_after_both_approvals() {
    let mut reg = registration("pending", "pending");
    assert!(!reg.awaiting_finalization());

    // Payment cleared first; the registration gate still withholds the ticket.
    reg.payment_approval = "approved".to_string();
    assert!(!reg.awaiting_finalization());
    assert_eq!(
        RegistrationStatus::derive(reg.payment_gate(), reg.registration_gate(), reg.attendance()),
        RegistrationStatus::PendingApproval
    );

    // Second gate clears: finalization may now run exactly once.
    reg.registration_approval = "approved".to_string();
    assert!(reg.awaiting_finalization());
    assert_eq!(
        RegistrationStatus::derive(reg.payment_gate(), reg.registration_gate(), reg.attendance()),
        RegistrationStatus::Registered
    );
}

#[test]
fn rejection_on_either_gate_dominates() {
    for (payment, approval) in [("rejected", "approved"), ("approved", "rejected"), ("rejected", "pending")] {
        let reg = registration(payment, approval);
        assert_eq!(
            RegistrationStatus::derive(reg.payment_gate(), reg.registration_gate(), reg.attendance()),
            RegistrationStatus::Rejected,
            "payment={payment} approval={approval}"
        );
        assert!(!reg.awaiting_finalization());
    }
}

#[test]
fn merch_variant_price_requires_payment_even_without_fee() {
    let event = merch_event(false);
    assert_eq!(event.registration_fee, 0);

    let (payment, _) = initial_gates(&event, Some(&variant(30, 450)));
    assert_eq!(payment, ApprovalGate::Pending);

    // A zero-priced giveaway variant needs no payment gate.
    let (payment, _) = initial_gates(&event, Some(&variant(30, 0)));
    assert_eq!(payment, ApprovalGate::NotRequired);
}

#[test]
fn submission_payload_must_match_event_type() {
    let merch = merch_event(false);
    let normal = published_event(0, false);

    let merch_body = SubmitRegistrationRequest {
        team_name: None,
        form_answers: None,
        variant_id: Some(10),
        quantity: Some(2),
    };
    assert_matches!(
        RegistrationPayload::from_request(&merch, &merch_body),
        Ok(RegistrationPayload::Merchandise { variant_id: 10, quantity: 2 })
    );
    assert_matches!(
        RegistrationPayload::from_request(&normal, &merch_body),
        Err(CampusGateError::InvalidInput(_))
    );

    let form_body = SubmitRegistrationRequest {
        team_name: Some("Null Pointers".to_string()),
        form_answers: Some(serde_json::json!({"year": 3})),
        variant_id: None,
        quantity: None,
    };
    assert!(RegistrationPayload::from_request(&normal, &form_body).is_ok());
    assert_matches!(
        RegistrationPayload::from_request(&merch, &form_body),
        Err(CampusGateError::InvalidInput(_))
    );

    let zero_quantity = SubmitRegistrationRequest {
        team_name: None,
        form_answers: None,
        variant_id: Some(10),
        quantity: Some(0),
    };
    assert_matches!(
        RegistrationPayload::from_request(&merch, &zero_quantity),
        Err(CampusGateError::InvalidInput(_))
    );
}

#[test]
fn scan_gating_rejects_every_blocked_state_with_its_own_reason() {
    // Pending payment blocks before anything else.
    let mut reg = registration("pending", "approved");
    reg.status = "registered".to_string();
    assert_matches!(reg.check_scannable(), Err(CampusGateError::NotApprovedForCheckIn(msg)) if msg.contains("payment"));

    // Pending registration approval blocks next.
    let mut reg = registration("approved", "pending");
    reg.status = "registered".to_string();
    assert_matches!(reg.check_scannable(), Err(CampusGateError::NotApprovedForCheckIn(msg)) if msg.contains("registration approval"));

    // Cleared gates but no issued ticket.
    let mut reg = registration("approved", "approved");
    reg.status = "registered".to_string();
    assert_matches!(reg.check_scannable(), Err(CampusGateError::NotApprovedForCheckIn(msg)) if msg.contains("ticket"));

    // Fully issued ticket scans.
    reg.ticket_id = Some("t-9".to_string());
    reg.qr_encrypted = Some("aabb".to_string());
    reg.qr_iv = Some("ccdd".to_string());
    assert!(reg.check_scannable().is_ok());

    // A rejected registration never scans, even with a ticket attached.
    reg.status = "rejected".to_string();
    assert_matches!(reg.check_scannable(), Err(CampusGateError::NotApprovedForCheckIn(_)));
}
