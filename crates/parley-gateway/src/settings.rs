use std::sync::RwLock;

use async_trait::async_trait;
use tracing::warn;

use parley_bridge::SettingsReader;
use parley_core::config::ParleyConfig;
use parley_core::types::AddressingPolicy;

/// Re-reads the `[policy]` section on every event so flag changes apply
/// without a restart. Keeps the last good value when the file is unreadable.
pub struct PolicySettings {
    config_path: Option<String>,
    last: RwLock<AddressingPolicy>,
}

impl PolicySettings {
    pub fn new(config_path: Option<String>, initial: AddressingPolicy) -> Self {
        Self {
            config_path,
            last: RwLock::new(initial),
        }
    }
}

#[async_trait]
impl SettingsReader for PolicySettings {
    async fn policy_flags(&self) -> AddressingPolicy {
        match ParleyConfig::load_policy(self.config_path.as_deref()) {
            Ok(policy) => {
                *self.last.write().unwrap_or_else(|e| e.into_inner()) = policy;
                policy
            }
            Err(e) => {
                warn!(error = %e, "policy reload failed, keeping previous flags");
                *self.last.read().unwrap_or_else(|e| e.into_inner())
            }
        }
    }
}
