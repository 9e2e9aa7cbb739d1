//! Error handling for CampusGate
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Main error type for the CampusGate application
#[derive(Error, Debug)]
pub enum CampusGateError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ticket codec error: {0}")]
    Ticket(#[from] TicketError),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: i64 },

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: i64 },

    #[error("Registration not found: {registration_id}")]
    RegistrationNotFound { registration_id: i64 },

    #[error("User {user_id} has no registration for event {event_id}")]
    NotRegistered { user_id: i64, event_id: i64 },

    #[error("No registration matches ticket '{ticket}' for event {event_id}")]
    TicketNotFound { ticket: String, event_id: i64 },

    #[error("Unknown merchandise variant {variant_id} for event {event_id}")]
    VariantNotFound { variant_id: i64, event_id: i64 },

    #[error("Variant {variant_id} is out of stock: requested {requested}, available {available}")]
    OutOfStock {
        variant_id: i64,
        requested: i32,
        available: i32,
    },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Event is not accepting registrations (status: {status})")]
    RegistrationClosed { status: String },

    #[error("Ticket scanning is only open while the event is ongoing (current status: {status})")]
    ScanningClosed { status: String },

    #[error("User {user_id} is already registered for event {event_id}")]
    DuplicateRegistration { user_id: i64, event_id: i64 },

    #[error("Ticket already scanned at {marked_at} for {participant}")]
    DuplicateScan {
        marked_at: DateTime<Utc>,
        participant: String,
    },

    #[error("Approval already processed: {0}")]
    AlreadyProcessed(String),

    #[error("Registration is not approved for check-in: {0}")]
    NotApprovedForCheckIn(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Ticket codec specific errors
#[derive(Error, Debug)]
pub enum TicketError {
    #[error("Malformed ticket envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Ticket decryption failed: {0}")]
    DecryptionFailure(String),

    #[error("Invalid ticketing key: expected {expected} hex characters, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("QR rendering failed: {0}")]
    QrRendering(String),
}

/// Result type alias for CampusGate operations
pub type Result<T> = std::result::Result<T, CampusGateError>;

/// Result type alias for ticket codec operations
pub type TicketResult<T> = std::result::Result<T, TicketError>;

impl CampusGateError {
    /// HTTP status code this error maps to at the API boundary
    pub fn status_code(&self) -> u16 {
        match self {
            CampusGateError::UserNotFound { .. }
            | CampusGateError::EventNotFound { .. }
            | CampusGateError::RegistrationNotFound { .. }
            | CampusGateError::NotRegistered { .. }
            | CampusGateError::TicketNotFound { .. }
            | CampusGateError::VariantNotFound { .. } => 404,
            CampusGateError::PermissionDenied(_) => 403,
            CampusGateError::InvalidInput(_) | CampusGateError::Ticket(_) => 400,
            CampusGateError::DuplicateRegistration { .. }
            | CampusGateError::DuplicateScan { .. }
            | CampusGateError::AlreadyProcessed(_)
            | CampusGateError::OutOfStock { .. }
            | CampusGateError::InvalidStateTransition { .. }
            | CampusGateError::RegistrationClosed { .. }
            | CampusGateError::ScanningClosed { .. }
            | CampusGateError::NotApprovedForCheckIn(_) => 409,
            CampusGateError::ServiceUnavailable(_) => 503,
            _ => 500,
        }
    }

    /// Check if the error is a client-side problem rather than a server fault
    pub fn is_client_error(&self) -> bool {
        let code = self.status_code();
        (400..500).contains(&code)
    }
}
