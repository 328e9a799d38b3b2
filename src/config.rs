//! Typed, environment-overridable configuration.
//!
//! Assembled once at process start from defaults plus environment variables;
//! validated eagerly and immutable for the life of the process — no hot reload.

use crate::error::{SoarError, SoarResult};
use serde::{Deserialize, Serialize};

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub sla: SlaDefaults,
    pub persistence: PersistenceConfig,
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn load_from_env() -> SoarResult<Self> {
        let mut config = AppConfig::default();

        if let Ok(val) = std::env::var("SOAR_LOG_LEVEL") {
            config.logging.level = val;
        }
        if let Ok(val) = std::env::var("SOAR_SERVICE_NAME") {
            config.service.name = val;
        }
        if let Ok(val) = std::env::var("MONGODB_URI") {
            config.persistence.mongodb_uri = Some(val);
        }
        if let Ok(val) = std::env::var("JWT_SECRET") {
            config.security.jwt_secret = Some(val);
        }
        if let Ok(val) = std::env::var("WEBHOOK_TRUSTED_IPS") {
            config.security.trusted_ips = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SoarResult<()> {
        if self.service.name.is_empty() {
            return Err(SoarError::Config("service name cannot be empty".into()));
        }
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(SoarError::Config(format!(
                "invalid log level: {}",
                self.logging.level
            )));
        }
        self.security.validate()?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            logging: LoggingConfig::default(),
            security: SecurityConfig::default(),
            sla: SlaDefaults::default(),
            persistence: PersistenceConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub version: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "cybersentinel-soar".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Security-filter knobs (§4.A). Defaults match the spec's stated defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: Option<String>,
    pub trusted_ips: Vec<String>,
    pub rate_limit_window_secs: u64,
    pub rate_limit_max_requests: u32,
    pub burst_window_secs: u64,
    pub burst_max_requests: u32,
    pub ip_cooloff_secs: u64,
    pub replay_window_secs: u64,
    pub timestamp_skew_secs: i64,
    pub playbook_flood_per_min: u32,
    pub global_flood_per_min: u32,
    pub dedup_window_secs: u64,
    pub fingerprint_bucket_secs: i64,
    pub approval_sweep_interval_secs: u64,
}

impl SecurityConfig {
    fn validate(&self) -> SoarResult<()> {
        if self.rate_limit_max_requests == 0 || self.burst_max_requests == 0 {
            return Err(SoarError::Config(
                "rate limit thresholds must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            trusted_ips: Vec::new(),
            rate_limit_window_secs: 60,
            rate_limit_max_requests: 100,
            burst_window_secs: 5,
            burst_max_requests: 20,
            ip_cooloff_secs: 300,
            replay_window_secs: 600,
            timestamp_skew_secs: 300,
            playbook_flood_per_min: 50,
            global_flood_per_min: 500,
            dedup_window_secs: 600,
            fingerprint_bucket_secs: 60,
            approval_sweep_interval_secs: 30,
        }
    }
}

/// Default SLA thresholds used when no policy resolves (global fallback).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaDefaults {
    pub acknowledge_ms: i64,
    pub containment_ms: i64,
    pub resolution_ms: i64,
}

impl Default for SlaDefaults {
    fn default() -> Self {
        Self {
            acknowledge_ms: 5 * 60 * 1000,
            containment_ms: 30 * 60 * 1000,
            resolution_ms: 4 * 60 * 60 * 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    pub mongodb_uri: Option<String>,
    pub max_concurrent_executions: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            mongodb_uri: None,
            max_concurrent_executions: 256,
        }
    }
}
