use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MessengerError;

/// Top-level configuration, usually read from `hookline.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HooklineConfig {
    #[serde(default)]
    pub facebook: FacebookConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration for the Facebook Messenger adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacebookConfig {
    /// Token the platform must echo during the subscription handshake.
    pub verify_token: Option<String>,
    /// Page access token used when the credential store has no entry for a page.
    pub page_access_token: Option<String>,
    /// App secret for `X-Hub-Signature-256` verification. Unset = no check.
    pub app_secret: Option<String>,
    /// Page id → access token entries seeded into the credential store.
    #[serde(default)]
    pub pages: BTreeMap<String, String>,
    /// Port for the webhook receiver server.
    #[serde(default = "default_webhook_port")]
    pub webhook_port: u16,
    /// Bind address for the webhook server.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

fn default_webhook_port() -> u16 {
    3400
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

impl Default for FacebookConfig {
    fn default() -> Self {
        Self {
            verify_token: None,
            page_access_token: None,
            app_secret: None,
            pages: BTreeMap::new(),
            webhook_port: default_webhook_port(),
            bind_address: default_bind_address(),
        }
    }
}

/// In-process job queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,
}

fn default_queue_capacity() -> usize {
    1024
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// JSON-lines file receiving one record per processed job.
    pub outcome_log: Option<std::path::PathBuf>,
}

/// Resolve a secret value that may reference an environment variable.
///
/// `env:NAME` reads `NAME` from the environment; anything else is returned as-is.
pub fn resolve_secret(value: &str) -> Result<String, MessengerError> {
    if let Some(var_name) = value.strip_prefix("env:") {
        std::env::var(var_name).map_err(|_| {
            MessengerError::Config(format!("environment variable '{}' not set", var_name))
        })
    } else {
        Ok(value.to_string())
    }
}

/// A configured value, unless it is absent or whitespace only.
pub fn configured(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn resolve_optional(value: &mut Option<String>) -> Result<(), MessengerError> {
    if let Some(raw) = value.as_deref() {
        *value = Some(resolve_secret(raw)?);
    }
    Ok(())
}

impl FacebookConfig {
    /// Replace every `env:` reference with its environment value.
    pub fn resolve_secrets(&mut self) -> Result<(), MessengerError> {
        resolve_optional(&mut self.verify_token)?;
        resolve_optional(&mut self.page_access_token)?;
        resolve_optional(&mut self.app_secret)?;
        for token in self.pages.values_mut() {
            *token = resolve_secret(token)?;
        }
        Ok(())
    }
}

/// Parse a TOML document into a config. Secrets are left unresolved.
pub fn parse_config(toml_str: &str) -> Result<HooklineConfig, MessengerError> {
    toml::from_str(toml_str).map_err(|e| MessengerError::Config(format!("invalid config: {}", e)))
}

/// Load the configuration file at `path` and resolve its secrets.
///
/// A missing file yields the default configuration.
pub fn load_config(path: &Path) -> Result<HooklineConfig, MessengerError> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MessengerError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            MessengerError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?
    } else {
        HooklineConfig::default()
    };

    config.facebook.resolve_secrets()?;
    Ok(config)
}
