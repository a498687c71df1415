use std::net::SocketAddr;

use serde::Deserialize;

use bankmeter_core::customizer::{CommonTags, APPLICATION_TAG};
use bankmeter_core::error::{MetricsError, Result};
use bankmeter_core::{RegistryConfig, Tags, TimerOptions};

const HEALTH_PATH: &str = "/actuator/health";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub metrics: MetricsSection,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            metrics: MetricsSection::default(),
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MetricsError::UnsupportedVersion);
        }
        self.server.validate()?;
        self.metrics.validate()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .map_err(|e| {
                MetricsError::BadConfig(format!("server.listen must be a valid SocketAddr: {e}"))
            })
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Scrape path.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_common_tags")]
    pub common_tags: Tags,

    /// Time every routed HTTP request as `http.server.requests`.
    #[serde(default = "default_true")]
    pub http_server_requests: bool,

    #[serde(default)]
    pub timer: TimerOptions,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            common_tags: default_common_tags(),
            http_server_requests: true,
            timer: TimerOptions::default(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        if !self.endpoint.starts_with('/') || self.endpoint.len() < 2 {
            return Err(MetricsError::BadConfig(
                "metrics.endpoint must be an absolute path like /actuator/prometheus".into(),
            ));
        }
        if self.endpoint == HEALTH_PATH {
            return Err(MetricsError::BadConfig(format!(
                "metrics.endpoint must not shadow {HEALTH_PATH}"
            )));
        }
        if !self.common_tags.contains_key(APPLICATION_TAG) {
            return Err(MetricsError::BadConfig(format!(
                "metrics.common_tags must contain `{APPLICATION_TAG}`"
            )));
        }
        self.timer.validate()?;
        Ok(())
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            timer: self.timer.clone(),
        }
    }
}

fn default_endpoint() -> String {
    "/actuator/prometheus".into()
}
fn default_common_tags() -> Tags {
    CommonTags::bankapp().tags().clone()
}
fn default_true() -> bool {
    true
}
