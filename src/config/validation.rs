//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{CampusGateError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_server_config(&settings.server)?;
    validate_database_config(&settings.database)?;
    validate_ticketing_config(&settings.ticketing)?;
    validate_notifications_config(&settings.notifications)?;
    validate_storage_config(&settings.storage)?;

    Ok(())
}

/// Validate HTTP server configuration
fn validate_server_config(config: &super::ServerConfig) -> Result<()> {
    if config.host.is_empty() {
        return Err(CampusGateError::Config(
            "Server host is required".to_string()
        ));
    }

    if config.port == 0 {
        return Err(CampusGateError::Config(
            "Server port must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(CampusGateError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(CampusGateError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(CampusGateError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate ticket encryption configuration
fn validate_ticketing_config(config: &super::TicketingConfig) -> Result<()> {
    if config.secret.len() != 64 {
        return Err(CampusGateError::Config(
            "Ticketing secret must be exactly 64 hex characters (32 bytes)".to_string()
        ));
    }

    if hex::decode(&config.secret).is_err() {
        return Err(CampusGateError::Config(
            "Ticketing secret must be valid hex".to_string()
        ));
    }

    Ok(())
}

/// Validate notification configuration
fn validate_notifications_config(config: &super::NotificationsConfig) -> Result<()> {
    if config.enabled && config.webhook_url.is_none() {
        return Err(CampusGateError::Config(
            "Webhook URL is required when notifications are enabled".to_string()
        ));
    }

    Ok(())
}

/// Validate storage configuration
fn validate_storage_config(config: &super::StorageConfig) -> Result<()> {
    if config.upload_dir.is_empty() {
        return Err(CampusGateError::Config(
            "Upload directory is required".to_string()
        ));
    }

    Ok(())
}
