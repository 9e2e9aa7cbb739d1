//! CampusGate event management backend
//!
//! A campus event-management backend for club events. Clubs publish events,
//! users register (optionally paying fees or selecting merchandise),
//! organizers approve payments and registrations, and attendance is taken by
//! scanning encrypted QR tickets at the door.

#![allow(non_snake_case)]

pub mod config;
pub mod handlers;
pub mod services;
pub mod models;
pub mod database;
pub mod middleware;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{CampusGateError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use handlers::{create_router, AppState};
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
