//! Bridge configuration loaded from JSON.

use crate::error::Result;
use carbonchain_chain::LedgerConfig;
use carbonchain_core::Address;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "CARBONCHAIN_CONFIG";

/// Bounded retry for writes that fail with a retryable error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 50,
        }
    }
}

impl RetryPolicy {
    /// No retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff_ms: 0,
        }
    }

    /// Delay before the attempt after `attempt`; grows linearly.
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Account that signs every write.
    pub account: Address,
    /// Blocks at or above a write's block before it counts as confirmed.
    pub confirmations: u64,
    pub confirmation_timeout_ms: u64,
    pub retry: RetryPolicy,
    pub ledger: LedgerConfig,
    /// Deployment manifest to load instead of bootstrapping a fresh one.
    pub manifest_path: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            account: Address::ZERO,
            confirmations: 1,
            confirmation_timeout_ms: 5000,
            retry: RetryPolicy::default(),
            ledger: LedgerConfig::default(),
            manifest_path: None,
        }
    }
}

impl BridgeConfig {
    pub fn for_account(account: Address) -> Self {
        Self {
            account,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Load from the file named by `CARBONCHAIN_CONFIG`, or defaults when unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_json_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carbonchain_core::ErrorKind;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.confirmations, 1);
        assert_eq!(config.confirmation_timeout(), Duration::from_secs(5));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.ledger.data_dir, None);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = BridgeConfig::from_json_str(
            r#"{
                "account": "0x0101010101010101010101010101010101010101",
                "confirmations": 2,
                "retry": { "max_attempts": 5 },
                "ledger": { "data_dir": "/tmp/carbonchain", "flush_on_commit": true }
            }"#,
        )
        .unwrap();

        assert_eq!(config.account, Address([1u8; 20]));
        assert_eq!(config.confirmations, 2);
        assert_eq!(config.confirmation_timeout_ms, 5000);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.backoff_ms, 50);
        assert_eq!(
            config.ledger.data_dir.as_deref(),
            Some(Path::new("/tmp/carbonchain"))
        );
    }

    #[test]
    fn test_invalid_json() {
        let err = BridgeConfig::from_json_str(r#"{ "account": "nope" }"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.json");
        std::fs::write(&path, r#"{ "confirmation_timeout_ms": 250 }"#).unwrap();

        let config = BridgeConfig::from_json_file(&path).unwrap();
        assert_eq!(config.confirmation_timeout(), Duration::from_millis(250));

        let err = BridgeConfig::from_json_file(dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
    }

    #[test]
    fn test_backoff_grows_linearly() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(50));
        assert_eq!(policy.backoff(3), Duration::from_millis(150));
        assert_eq!(RetryPolicy::none().max_attempts, 1);
    }
}
