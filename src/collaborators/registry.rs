// Registry lookup side channel. Best effort only: any failure degrades to "Not Checked"
use crate::config::RegistryConfig;
use crate::types::{Result, VerifyError, NOT_CHECKED};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStatus {
    pub status: String,
    pub timestamp: String,
}

impl RegistryStatus {
    pub fn not_checked() -> Self {
        Self {
            status: NOT_CHECKED.to_string(),
            timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[async_trait]
pub trait RegistryLookup: Send + Sync {
    async fn lookup(&self, document_type: &str, document_number: &str) -> Result<RegistryStatus>;
}

/// Delegates the lookup to an external helper program (typically a browser-automation script).
///
/// Called as `<command> <document_type> <document_number>` with the credentials in
/// `REGISTRY_USERNAME` / `REGISTRY_PASSWORD`; it must print `{"status": .., "timestamp": ..}`.
pub struct CommandRegistry {
    command: PathBuf,
    username: String,
    password: String,
}

impl CommandRegistry {
    pub fn new(command: PathBuf, username: String, password: String) -> Self {
        Self { command, username, password }
    }

    /// `None` when the lookup is disabled, unconfigured, or credentials are absent.
    pub fn from_config(config: &RegistryConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let command = config.command.clone()?;
        let (username, password) = config.credentials()?;
        Some(Self::new(command, username, password))
    }
}

#[async_trait]
impl RegistryLookup for CommandRegistry {
    async fn lookup(&self, document_type: &str, document_number: &str) -> Result<RegistryStatus> {
        let output = Command::new(&self.command)
            .arg(document_type)
            .arg(document_number)
            .env("REGISTRY_USERNAME", &self.username)
            .env("REGISTRY_PASSWORD", &self.password)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| VerifyError::CollaboratorFailure(format!("registry helper: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VerifyError::CollaboratorFailure(format!(
                "registry helper exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|e| VerifyError::CollaboratorFailure(format!("registry response: {}", e)))
    }
}

/// Wraps an optional lookup with a deadline. Never fails.
#[derive(Clone)]
pub struct RegistryProbe {
    lookup: Option<Arc<dyn RegistryLookup>>,
    timeout: Duration,
}

impl RegistryProbe {
    pub fn disabled() -> Self {
        Self { lookup: None, timeout: Duration::from_secs(1) }
    }

    pub fn new(lookup: Arc<dyn RegistryLookup>, timeout: Duration) -> Self {
        Self { lookup: Some(lookup), timeout }
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        match CommandRegistry::from_config(config) {
            Some(registry) => Self::new(Arc::new(registry), Duration::from_secs(config.timeout_secs)),
            None => Self::disabled(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.lookup.is_some()
    }

    pub async fn check(&self, document_type: &str, document_number: Option<&str>) -> RegistryStatus {
        let (Some(lookup), Some(number)) = (&self.lookup, document_number) else {
            return RegistryStatus::not_checked();
        };
        match tokio::time::timeout(self.timeout, lookup.lookup(document_type, number)).await {
            Ok(Ok(status)) => {
                debug!(status = %status.status, "registry lookup complete");
                status
            }
            Ok(Err(e)) => {
                warn!(error = %e, "registry lookup failed");
                RegistryStatus::not_checked()
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "registry lookup timed out");
                RegistryStatus::not_checked()
            }
        }
    }
}
