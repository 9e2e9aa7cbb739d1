//! Shared builders for integration tests

use chrono::{Duration, Utc};
use CampusGate::models::event::{Event, MerchVariant};
use CampusGate::models::registration::Registration;

pub fn published_event(fee: i64, requires_approval: bool) -> Event {
    Event {
        id: 1,
        organizer_id: 100,
        title: "Inter-College Hackathon".to_string(),
        description: None,
        event_type: "normal".to_string(),
        eligibility: "all".to_string(),
        registration_deadline: Utc::now() + Duration::days(1),
        starts_at: Utc::now() + Duration::days(2),
        ends_at: Utc::now() + Duration::days(3),
        capacity: Some(200),
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

pub fn merch_event(requires_approval: bool) -> Event {
    let mut event = published_event(0, requires_approval);
    event.event_type = "merchandise".to_string();
    event.capacity = None;
    event
}

pub fn variant(stock: i32, price: i64) -> MerchVariant {
    MerchVariant {
        id: 10,
        event_id: 1,
        size: Some("M".to_string()),
        color: Some("navy".to_string()),
        stock_quantity: stock,
        unit_price: price,
    }
}

pub fn registration(payment: &str, approval: &str) -> Registration {
    Registration {
        id: 500,
        event_id: 1,
        user_id: 42,
        status: "pending_approval".to_string(),
        payment_approval: payment.to_string(),
        registration_approval: approval.to_string(),
        payment_proof_path: None,
        payment_rejection_reason: None,
        registration_rejection_reason: None,
        ticket_id: None,
        qr_encrypted: None,
        qr_iv: None,
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
