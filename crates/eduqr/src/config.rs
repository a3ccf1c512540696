/// Service configuration loaded from a JSON file
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Top-level service configuration. Every section is optional in the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub attendance: AttendanceConfig,
    pub audit: AuditConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "eduqr.sqlite3".to_string(),
        }
    }
}

/// Time thresholds of the attendance window, in minutes relative to the
/// course start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendanceConfig {
    /// How long before the start a token may already be generated
    pub token_lead_minutes: i64,
    /// Scans before this are `present`
    pub present_grace_minutes: i64,
    /// Scans before this (and after the present grace) are `late`
    pub late_grace_minutes: i64,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            token_lead_minutes: 15,
            present_grace_minutes: 15,
            late_grace_minutes: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Pending events kept before new ones are dropped
    pub queue_capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
        }
    }
}

impl ServiceConfig {
    /// Loads the configuration from a JSON file
    ///
    /// # Arguments
    /// * `path` - Path to the JSON configuration file
    ///
    /// # Returns
    /// * `Ok(ServiceConfig)` - Parsed configuration, missing fields defaulted
    /// * `Err` - If the file can't be read or parsed
    pub fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: ServiceConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`ServiceConfig::load_from_file`], but a missing file yields the
    /// defaults instead of an error.
    pub fn load_or_default(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn validate(&self) -> Result<(), String> {
        let a = &self.attendance;
        if a.token_lead_minutes < 0 || a.present_grace_minutes < 0 {
            return Err("attendance thresholds must not be negative".to_string());
        }
        if a.late_grace_minutes < a.present_grace_minutes {
            return Err(format!(
                "late_grace_minutes ({}) must not be below present_grace_minutes ({})",
                a.late_grace_minutes, a.present_grace_minutes
            ));
        }
        Ok(())
    }
}
