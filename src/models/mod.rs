//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod user;
pub mod event;
pub mod registration;

// Re-export commonly used models
pub use user::{User, CreateUserRequest};
pub use event::{Event, MerchVariant, CreateEventRequest, CreateVariantRequest, UpdateEventRequest, EventType, EventStatus, Eligibility};
pub use registration::{Registration, ScanHistoryEntry, ApprovalGate, RegistrationStatus, AttendanceStatus, ScanAction, SubmitRegistrationRequest, RegistrationPayload, RegistrationOutcome, RejectRequest, ManualAttendanceRequest, initial_gates};
