//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ticketing: TicketingConfig,
    pub notifications: NotificationsConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Ticket encryption configuration
///
/// `secret` is the AES-256 key as 64 hex characters (32 bytes decoded).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TicketingConfig {
    pub secret: String,
}

/// Webhook/email notification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationsConfig {
    pub enabled: bool,
    pub webhook_url: Option<String>,
    pub timeout_seconds: u64,
}

/// Payment-proof image storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub upload_dir: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("CAMPUSGATE").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::CampusGateError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/campusgate".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            ticketing: TicketingConfig {
                secret: String::new(),
            },
            notifications: NotificationsConfig {
                enabled: false,
                webhook_url: None,
                timeout_seconds: 5,
            },
            storage: StorageConfig {
                upload_dir: "uploads/payment-proofs".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "logs".to_string(),
            },
        }
    }
}
