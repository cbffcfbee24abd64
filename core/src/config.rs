//! Process-wide configuration, read once at startup.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::gateway::ToolChoice;
use crate::registry::SchemaVariant;

pub const DEFAULT_MODEL: &str = "glm-4-flash";
pub const DEFAULT_API_BASE: &str = "https://open.bigmodel.cn/api/paas/v4";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 60;

/// Immutable settings shared by every request.
#[derive(Clone)]
pub struct RelayConfig {
    api_key: String,
    pub model: String,
    pub api_base: String,
    pub variant: SchemaVariant,
    pub tool_choice: ToolChoice,
    pub bind_addr: SocketAddr,
    /// `None` leaves the upstream call unbounded.
    pub upstream_timeout: Option<Duration>,
}

impl RelayConfig {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("ZHIPUAI_API_KEY").ok_or(ConfigError::Missing("ZHIPUAI_API_KEY"))?;
        let model = get("ZHIPUAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_base = get("ZHIPUAI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let variant = match get("RELAY_VARIANT") {
            Some(v) => v.parse()?,
            None => SchemaVariant::FreeText,
        };
        let tool_choice = match get("RELAY_TOOL_CHOICE") {
            Some(v) => v.parse()?,
            None => ToolChoice::default(),
        };

        let bind_raw = get("RELAY_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.trim().parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
            var: "RELAY_BIND_ADDR",
            reason: format!("'{bind_raw}': {e}"),
        })?;

        let timeout_secs = match get("RELAY_UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                var: "RELAY_UPSTREAM_TIMEOUT_SECS",
                reason: format!("'{raw}': {e}"),
            })?,
            None => DEFAULT_UPSTREAM_TIMEOUT_SECS,
        };
        let upstream_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

        Ok(Self {
            api_key: api_key.trim().to_string(),
            model: model.trim().to_string(),
            api_base: api_base.trim().trim_end_matches('/').to_string(),
            variant,
            tool_choice,
            bind_addr,
            upstream_timeout,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("api_key", &"***")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("variant", &self.variant)
            .field("tool_choice", &self.tool_choice)
            .field("bind_addr", &self.bind_addr)
            .field("upstream_timeout", &self.upstream_timeout)
            .finish()
    }
}
