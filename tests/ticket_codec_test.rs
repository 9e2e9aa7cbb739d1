//! Ticket codec scenarios: envelope round trip, legacy decode tiers and
//! tamper behavior, exercised through the public service API.

use assert_matches::assert_matches;
use chrono::Utc;
use CampusGate::services::{TicketEnvelope, TicketIdentity, TicketService};
use CampusGate::utils::errors::TicketError;

fn codec() -> TicketService {
    TicketService::from_secret(&"0f".repeat(32)).unwrap()
}

fn identity() -> TicketIdentity {
    TicketIdentity {
        ticket_id: "TKT-2049".to_string(),
        user_id: 42,
        event_id: 7,
        event_name: "Annual Cultural Fest".to_string(),
        user_name: "Arjun Mehta".to_string(),
        registration_date: Utc::now(),
    }
}

#[test]
fn issued_ticket_round_trips_through_the_envelope() {
    let codec = codec();
    let identity = identity();
    let issued = codec.issue(&identity).unwrap();

    // PNG magic bytes confirm a rasterized image came back.
    assert_eq!(&issued.qr_png[..8], b"\x89PNG\r\n\x1a\n");

    let payload = serde_json::json!({ "data": issued.encrypted, "iv": issued.iv }).to_string();
    let decoded = codec.decode(&payload).unwrap();
    assert_eq!(decoded, identity);
}

#[test]
fn camel_case_wire_format() {
    let plaintext = serde_json::to_value(identity()).unwrap();
    for key in ["ticketId", "userId", "eventId", "eventName", "userName", "registrationDate"] {
        assert!(plaintext.get(key).is_some(), "missing wire key {key}");
    }
}

#[test]
fn scanner_input_degrades_through_legacy_tiers() {
    let codec = codec();
    let issued = codec.issue(&identity()).unwrap();

    let envelope = serde_json::json!({ "data": issued.encrypted, "iv": issued.iv }).to_string();
    assert_eq!(codec.extract_ticket_id(&envelope), "TKT-2049");
    assert_eq!(codec.extract_ticket_id(r#"{"ticketId": "TKT-1999"}"#), "TKT-1999");
    assert_eq!(codec.extract_ticket_id("\tTKT-1520 \n"), "TKT-1520");
}

#[test]
fn tampered_ciphertext_fails_to_decrypt() {
    let codec = codec();
    let issued = codec.issue(&identity()).unwrap();

    // Flip one hex nibble of the ciphertext.
    let mut data = issued.encrypted.clone();
    let flipped = if data.ends_with('0') { "1" } else { "0" };
    data.replace_range(data.len() - 1.., flipped);

    let envelope = TicketEnvelope { data, iv: issued.iv };
    assert_matches!(
        codec.decode_envelope(&envelope),
        Err(TicketError::DecryptionFailure(_) | TicketError::InvalidEnvelope(_))
    );
}

#[test]
fn malformed_envelopes_never_reach_the_cipher() {
    let codec = codec();
    assert_matches!(codec.decode("}{"), Err(TicketError::InvalidEnvelope(_)));
    assert_matches!(
        codec.decode(r#"{"data": "nothex", "iv": "00"}"#),
        Err(TicketError::InvalidEnvelope(_))
    );
    assert_matches!(
        codec.decode(r#"{"data": "aabb", "iv": "aa"}"#),
        Err(TicketError::InvalidEnvelope(_))
    );
}
