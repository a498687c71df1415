//! Service config loader (strict parsing).

pub mod schema;

use std::fs;
use std::io::ErrorKind;

use bankmeter_core::error::{MetricsError, Result};

pub use schema::{MetricsSection, ServerSection, ServiceConfig};

/// Env var naming the config file when no CLI argument is given.
pub const CONFIG_ENV: &str = "BANKMETER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "bankmeter.yaml";

pub fn load_from_file(path: &str) -> Result<ServiceConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| MetricsError::Internal(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServiceConfig> {
    let cfg: ServiceConfig = serde_yaml::from_str(s)
        .map_err(|e| MetricsError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Explicit paths must exist. Without one, `bankmeter.yaml` is read if
/// present and built-in defaults are used otherwise.
pub fn load(explicit: Option<&str>) -> Result<ServiceConfig> {
    if let Some(path) = explicit {
        return load_from_file(path);
    }
    match fs::read_to_string(DEFAULT_CONFIG_PATH) {
        Ok(s) => load_from_str(&s),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(path = DEFAULT_CONFIG_PATH, "no config file, using defaults");
            Ok(ServiceConfig::default())
        }
        Err(e) => Err(MetricsError::Internal(format!(
            "read config failed ({DEFAULT_CONFIG_PATH}): {e}"
        ))),
    }
}
