use std::time::Duration;

use serde::Deserialize;
use url::Url;
use wsnotify_core::error::{ClientError, Result};

use crate::connection::ReconnectPolicy;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    /// WebSocket endpoint, resolved once at startup.
    pub endpoint: String,

    #[serde(default)]
    pub reconnect: ReconnectSection,
}

impl ClientConfig {
    /// Version-1 config for `endpoint` with the default reconnect policy.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            version: 1,
            endpoint: endpoint.into(),
            reconnect: ReconnectSection::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ClientError::UnsupportedVersion);
        }

        let url = Url::parse(&self.endpoint)
            .map_err(|e| ClientError::Config(format!("endpoint is not a valid url: {e}")))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ClientError::Config(format!(
                "endpoint scheme must be ws or wss, got {}",
                url.scheme()
            )));
        }

        self.reconnect.validate()?;

        Ok(())
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            Duration::from_millis(self.reconnect.base_delay_ms),
            Duration::from_millis(self.reconnect.max_delay_ms),
            self.reconnect.max_attempts,
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconnectSection {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ReconnectSection {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl ReconnectSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=60_000).contains(&self.base_delay_ms) {
            return Err(ClientError::Config(
                "reconnect.base_delay_ms must be between 100 and 60000".into(),
            ));
        }
        if self.max_delay_ms < self.base_delay_ms || self.max_delay_ms > 600_000 {
            return Err(ClientError::Config(
                "reconnect.max_delay_ms must be >= base_delay_ms and <= 600000".into(),
            ));
        }
        if self.max_attempts > 100 {
            return Err(ClientError::Config(
                "reconnect.max_attempts must be at most 100".into(),
            ));
        }
        Ok(())
    }
}

fn default_version() -> u32 {
    1
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    30000
}
fn default_max_attempts() -> u32 {
    5
}
