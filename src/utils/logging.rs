//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the CampusGate application.

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use crate::config::LoggingConfig;
use crate::utils::errors::Result;

/// Initialize logging based on configuration
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "campusgate.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
        .init();

    info!("Logging initialized with level: {}", config.level);
    Ok(())
}

/// Log registration lifecycle actions with structured data
pub fn log_registration_action(registration_id: i64, event_id: i64, action: &str, actor_id: i64) {
    info!(
        registration_id = registration_id,
        event_id = event_id,
        action = action,
        actor_id = actor_id,
        "Registration action performed"
    );
}

/// Log attendance actions (scans, overrides, bulk marking)
pub fn log_attendance_action(event_id: i64, registration_id: Option<i64>, action: &str, actor_id: i64) {
    info!(
        event_id = event_id,
        registration_id = registration_id,
        action = action,
        actor_id = actor_id,
        "Attendance action performed"
    );
}

/// Log event lifecycle transitions
pub fn log_event_transition(event_id: i64, from: &str, to: &str, actor_id: i64) {
    info!(
        event_id = event_id,
        from = from,
        to = to,
        actor_id = actor_id,
        "Event status transition"
    );
}

/// Log notification dispatch failures (never fatal)
pub fn log_notification_failure(event_id: i64, kind: &str, error: &str) {
    warn!(
        event_id = event_id,
        kind = kind,
        error = error,
        "Notification dispatch failed"
    );
}
