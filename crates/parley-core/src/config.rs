use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::types::AddressingPolicy;

pub const DEFAULT_PORT: u16 = 18790;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a helpful assistant.";

/// Top-level config (parley.toml + PARLEY_* env overrides).
///
/// Nested keys are addressed with a double underscore in the environment,
/// e.g. `PARLEY_POLICY__ENABLE_MENTION=false`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub policy: AddressingPolicy,
    #[serde(default)]
    pub completion: CompletionConfig,
    pub rocketchat: Option<RocketChatConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Keep conversation contexts in process memory only (lost on restart).
    #[serde(default)]
    pub ephemeral: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            ephemeral: false,
        }
    }
}

/// Settings for the chat-completion backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// API key. When absent every completion fails with a visible error.
    pub api_key: Option<String>,
    /// Sent as `OpenAI-Organization` when set.
    pub organization: Option<String>,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    /// Client-side request timeout; 0 disables it.
    #[serde(default)]
    pub timeout_ms: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            organization: None,
            base_url: default_openai_base_url(),
            model: default_model(),
            system_instruction: default_system_instruction(),
            max_tokens: None,
            temperature: None,
            timeout_ms: 0,
        }
    }
}

/// Rocket.Chat REST credentials for the bot account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocketChatConfig {
    /// Server root, without trailing slash (e.g. `https://chat.example.com`).
    pub server_url: String,
    pub user_id: String,
    pub auth_token: String,
    /// Shared secret the outgoing webhook must echo back in its `token` field.
    pub webhook_token: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_system_instruction() -> String {
    DEFAULT_SYSTEM_INSTRUCTION.to_string()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.parley/parley.db", home)
}

#[derive(Deserialize)]
struct PolicySection {
    #[serde(default)]
    policy: AddressingPolicy,
}

impl ParleyConfig {
    /// Load config from a TOML file with PARLEY_* env var overrides.
    ///
    /// Falls back to ~/.parley/parley.toml when no path is given. A missing
    /// file is not an error: every section has defaults.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        Self::from_figment(figment_for(config_path))
    }

    pub fn from_figment(figment: Figment) -> crate::error::Result<Self> {
        figment
            .extract()
            .map_err(|e| crate::error::ParleyError::Config(e.to_string()))
    }

    /// Re-read only the `[policy]` section from the same sources as `load`.
    pub fn load_policy(config_path: Option<&str>) -> crate::error::Result<AddressingPolicy> {
        figment_for(config_path)
            .extract::<PolicySection>()
            .map(|s| s.policy)
            .map_err(|e| crate::error::ParleyError::Config(e.to_string()))
    }
}

fn figment_for(config_path: Option<&str>) -> Figment {
    let path = config_path
        .map(String::from)
        .unwrap_or_else(default_config_path);
    Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("PARLEY_").split("__"))
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.parley/parley.toml", home)
}
