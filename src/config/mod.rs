//! Configuration module for the DSA roadmap backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to the JSON snapshot used for startup sync and export
    pub snapshot_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable text
    pub log_json: bool,
    /// Pause between metadata fetches during startup sync
    pub sync_delay: Duration,
    /// GraphQL endpoint of the metadata provider
    pub metadata_endpoint: String,
    /// Rewrite the snapshot file after every mutation
    pub auto_export: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("DSA_DB_PATH")
            .unwrap_or_else(|_| "./data/dsa_roadmap.sqlite".to_string())
            .into();

        let snapshot_path = env::var("DSA_SNAPSHOT_PATH")
            .unwrap_or_else(|_| "./data/seed_data.json".to_string())
            .into();

        let bind_addr = env::var("DSA_BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:5000".to_string())
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid DSA_BIND_ADDR: {}", e)))?;

        let log_level = env::var("DSA_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_json = env::var("DSA_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let sync_delay_ms: u64 = env::var("DSA_SYNC_DELAY_MS")
            .unwrap_or_else(|_| "500".to_string())
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid DSA_SYNC_DELAY_MS: {}", e)))?;

        let metadata_endpoint = env::var("DSA_METADATA_ENDPOINT")
            .unwrap_or_else(|_| "https://leetcode.com/graphql".to_string());

        let auto_export = env::var("DSA_AUTO_EXPORT")
            .map(|v| {
                !matches!(
                    v.trim().to_ascii_lowercase().as_str(),
                    "0" | "false" | "no" | "off"
                )
            })
            .unwrap_or(true);

        Ok(Self {
            db_path,
            snapshot_path,
            bind_addr,
            log_level,
            log_json,
            sync_delay: Duration::from_millis(sync_delay_ms),
            metadata_endpoint,
            auto_export,
        })
    }
}
