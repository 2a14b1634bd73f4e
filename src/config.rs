//! Runtime configuration from environment variables (and `.env`).

use std::env::VarError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::domain::aggregates::CheckoutPolicy;

pub const DEFAULT_ADMIN_PASSWORD: &str = "Karol25";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub log_level: String,
    pub default_admin_password: String,
    pub notification_ttl: Duration,
    pub checkout: CheckoutPolicy,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("data_dir", &self.data_dir)
            .field("log_level", &self.log_level)
            .field("default_admin_password", &"[redacted]")
            .field("notification_ttl", &self.notification_ttl)
            .field("checkout", &self.checkout)
            .finish()
    }
}

/// Load configuration, reading a `.env` file first if one exists.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is set to an unparseable value.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    build_app_config(|key| std::env::var(key))
}

/// Every variable is optional; the lookup is injected so tests need no process env.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let or_default = |var: &str, default: &str| -> String { lookup(var).unwrap_or_else(|_| default.to_string()) };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar { var: var.to_string(), reason };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match lookup(var) {
            Err(_) => Ok(default),
            Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                other => Err(invalid(var, format!("expected a boolean, got {other:?}"))),
            },
        }
    };

    let bind_addr = or_default("PALO_ROSA_BIND_ADDR", "127.0.0.1:8083")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("PALO_ROSA_BIND_ADDR", e.to_string()))?;
    let data_dir = PathBuf::from(or_default("PALO_ROSA_DATA_DIR", "./data"));
    let log_level = or_default("PALO_ROSA_LOG_LEVEL", "info");
    let default_admin_password = or_default("PALO_ROSA_ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD);
    let ttl_ms = or_default("PALO_ROSA_NOTIFICATION_TTL_MS", "4000")
        .parse::<u64>()
        .map_err(|e| invalid("PALO_ROSA_NOTIFICATION_TTL_MS", e.to_string()))?;
    let checkout = CheckoutPolicy {
        clear_cart_on_submit: parse_bool("PALO_ROSA_CLEAR_CART_ON_SUBMIT", false)?,
        reset_on_close: parse_bool("PALO_ROSA_RESET_WIZARD_ON_CLOSE", false)?,
    };

    Ok(AppConfig {
        bind_addr,
        data_dir,
        log_level,
        default_admin_password,
        notification_ttl: Duration::from_millis(ttl_ms),
        checkout,
    })
}
