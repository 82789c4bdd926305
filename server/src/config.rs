//! Application configuration
//!
//! Central location for configuration constants, validation boundaries and
//! the environment-driven server configuration.

use crate::error::{AppError, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

// ===== Idea-map Grid Fallback =====

/// Number of columns used when placing cards that have no saved position
pub const GRID_COLUMNS: usize = 5;
/// Horizontal distance between fallback grid cells in canvas units
pub const GRID_SPACING_X: f64 = 300.0;
/// Vertical distance between fallback grid cells in canvas units
pub const GRID_SPACING_Y: f64 = 200.0;

/// Node type tag understood by the canvas renderer for card nodes
pub const CARD_NODE_TYPE: &str = "card";
/// Edge type used when an edge does not declare one
pub const DEFAULT_EDGE_TYPE: &str = "custom";

// ===== Auto-Layout =====

/// Width assumed for nodes that have not been measured yet
pub const DEFAULT_NODE_WIDTH: f64 = 260.0;
/// Height assumed for nodes that have not been measured yet
pub const DEFAULT_NODE_HEIGHT: f64 = 120.0;
/// Default distance between layers
pub const DEFAULT_RANK_SEP: f64 = 80.0;
/// Default distance between nodes of the same layer
pub const DEFAULT_NODE_SEP: f64 = 40.0;
/// Barycenter sweeps performed during crossing reduction
pub const CROSSING_SWEEPS: usize = 4;

// ===== Handles =====

pub const HANDLE_TOP: &str = "top";
pub const HANDLE_BOTTOM: &str = "bottom";
pub const HANDLE_LEFT: &str = "left";
pub const HANDLE_RIGHT: &str = "right";

// ===== Canvas Interaction =====

/// A connection released within this many pixels of a node counts as a hit
pub const CONNECT_TOLERANCE_PX: f64 = 20.0;
/// Title given to cards created by dropping a connection on empty canvas
pub const NEW_CARD_TITLE: &str = "New card";

// ===== Validation Limits =====

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_TAG_NAME_LENGTH: usize = 50;
pub const MAX_PROJECT_NAME_LENGTH: usize = 100;
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Minimum auto-save delay in milliseconds
pub const MIN_AUTO_SAVE_DELAY_MS: u32 = 100;
/// Maximum auto-save delay in milliseconds (5 minutes)
pub const MAX_AUTO_SAVE_DELAY_MS: u32 = 300_000;

// ===== Sessions & Client =====

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "backyard-session";
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 14;
/// Client-side timeout for single-item detail fetches
pub const DETAIL_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_DATABASE_PATH: &str = "backyard.db";
pub const DEFAULT_MAINTENANCE_FREQUENCY: &str = "6h";
pub const DEFAULT_PROJECT_RETENTION_DAYS: i64 = 30;

/// Runtime server configuration, read from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub session_ttl_hours: i64,
    pub maintenance_frequency: String,
    pub project_retention_days: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            maintenance_frequency: DEFAULT_MAINTENANCE_FREQUENCY.to_string(),
            project_retention_days: DEFAULT_PROJECT_RETENTION_DAYS,
        }
    }
}

impl ServerConfig {
    /// Build the configuration from `BACKYARD_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = lookup("BACKYARD_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Generic(format!("Invalid BACKYARD_BIND_ADDR: {}", e)))?;

        let database_path = lookup("BACKYARD_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));

        let session_ttl_hours = parse_positive(
            "BACKYARD_SESSION_TTL_HOURS",
            lookup("BACKYARD_SESSION_TTL_HOURS"),
            DEFAULT_SESSION_TTL_HOURS,
        )?;

        let project_retention_days = parse_positive(
            "BACKYARD_PROJECT_RETENTION_DAYS",
            lookup("BACKYARD_PROJECT_RETENTION_DAYS"),
            DEFAULT_PROJECT_RETENTION_DAYS,
        )?;

        let maintenance_frequency = lookup("BACKYARD_MAINTENANCE_FREQUENCY")
            .unwrap_or_else(|| DEFAULT_MAINTENANCE_FREQUENCY.to_string());

        Ok(Self {
            bind_addr,
            database_path,
            session_ttl_hours,
            maintenance_frequency,
            project_retention_days,
        })
    }
}

fn parse_positive(name: &str, raw: Option<String>, default: i64) -> Result<i64> {
    match raw {
        None => Ok(default),
        Some(value) => match value.trim().parse::<i64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(AppError::Generic(format!(
                "{} must be a positive integer, got '{}'",
                name, value
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = ServerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(config.session_ttl_hours, DEFAULT_SESSION_TTL_HOURS);
        assert_eq!(config.maintenance_frequency, "6h");
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("BACKYARD_BIND_ADDR", "0.0.0.0:8080"),
            ("BACKYARD_DATABASE_PATH", "/tmp/by.db"),
            ("BACKYARD_PROJECT_RETENTION_DAYS", "7"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.database_path, PathBuf::from("/tmp/by.db"));
        assert_eq!(config.project_retention_days, 7);
    }

    #[test]
    fn test_rejects_non_positive_ttl() {
        let result =
            ServerConfig::from_lookup(lookup_from(&[("BACKYARD_SESSION_TTL_HOURS", "0")]));
        assert!(result.is_err());
    }
}
