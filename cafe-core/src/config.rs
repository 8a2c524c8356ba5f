//! Configuration loading, following `opcua-core`'s `Config` trait: a
//! serde-backed struct that knows how to validate itself and round-trip
//! through YAML on disk.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Error returned from saving, loading, or validating a [`Config`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration is invalid: {0:?}")]
    Invalid(Vec<String>),
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A trait that handles the loading, saving, and validity of configuration
/// objects for the cafe client subsystem (`SPEC_FULL.md` §4.6).
pub trait Config: Serialize {
    /// Validate the config struct, returning a list of human-readable
    /// validation errors if it fails.
    fn validate(&self) -> Result<(), Vec<String>>;

    /// Save the configuration object to a file, refusing to write an invalid
    /// config.
    fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Err(errors) = self.validate() {
            return Err(ConfigError::Invalid(errors));
        }
        let s = serde_yaml::to_string(self)?;
        let mut f = File::create(path)?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Load the configuration object from the given path.
    fn load<A>(path: &Path) -> Result<A, ConfigError>
    where
        for<'de> A: Config + Deserialize<'de>,
    {
        let mut f = File::open(path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        let config: A = serde_yaml::from_str(&s)?;
        if let Err(errors) = config.validate() {
            return Err(ConfigError::Invalid(errors));
        }
        Ok(config)
    }
}

/// Everything the cafe client subsystem needs to know at startup: cafes to
/// talk to, the dispatch/backoff knobs of `spec.md` §4.3, poller cadence,
/// RPC deadlines, and where to keep its sqlite database.
///
/// Duration fields are stored in whole seconds so the struct round-trips
/// through plain YAML without a duration-specific serde adapter; `cafe-cli`
/// parses `humantime` strings from the command line into these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CafeNodeConfig {
    /// Cafe URLs known at startup. `Sessions::register` can add more later.
    pub cafe_urls: Vec<String>,
    pub sqlite_path: String,
    pub max_batch: usize,
    pub max_inflight: usize,
    pub max_inflight_per_cafe: usize,
    pub backoff_base_secs: u64,
    pub backoff_cap_secs: u64,
    pub backoff_jitter: f64,
    pub max_attempts: u32,
    pub poll_interval_secs: u64,
    pub msg_max_attempts: u32,
    pub default_rpc_timeout_secs: u64,
    pub store_upload_timeout_secs: u64,
    pub refresh_skew_secs: u64,
    pub nonce_max_age_secs: u64,
    /// Historically picked `Flush()` vs `Run()` at startup. Both remain
    /// callable directly; this only steers `cafe-cli`'s default
    /// (`spec.md` §9 Open Questions).
    pub is_mobile: bool,
}

impl Default for CafeNodeConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            cafe_urls: Vec::new(),
            sqlite_path: "cafe.db".to_string(),
            max_batch: MAX_BATCH,
            max_inflight: MAX_INFLIGHT,
            max_inflight_per_cafe: MAX_INFLIGHT_PER_CAFE,
            backoff_base_secs: BACKOFF_BASE.as_secs(),
            backoff_cap_secs: BACKOFF_CAP.as_secs(),
            backoff_jitter: BACKOFF_JITTER,
            max_attempts: MAX_ATTEMPTS,
            poll_interval_secs: POLL_INTERVAL.as_secs(),
            msg_max_attempts: MSG_MAX_ATTEMPTS,
            default_rpc_timeout_secs: DEFAULT_RPC_TIMEOUT.as_secs(),
            store_upload_timeout_secs: STORE_UPLOAD_TIMEOUT.as_secs(),
            refresh_skew_secs: REFRESH_SKEW.as_secs(),
            nonce_max_age_secs: NONCE_MAX_AGE.as_secs(),
            is_mobile: false,
        }
    }
}

impl CafeNodeConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_secs)
    }

    pub fn backoff_cap(&self) -> Duration {
        Duration::from_secs(self.backoff_cap_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn default_rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.default_rpc_timeout_secs)
    }

    pub fn store_upload_timeout(&self) -> Duration {
        Duration::from_secs(self.store_upload_timeout_secs)
    }

    pub fn refresh_skew(&self) -> Duration {
        Duration::from_secs(self.refresh_skew_secs)
    }

    pub fn nonce_max_age(&self) -> Duration {
        Duration::from_secs(self.nonce_max_age_secs)
    }
}

impl Config for CafeNodeConfig {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.max_batch == 0 {
            errors.push("max_batch must be non-zero".to_string());
        }
        if self.max_inflight == 0 {
            errors.push("max_inflight must be non-zero".to_string());
        }
        if self.max_inflight_per_cafe == 0 {
            errors.push("max_inflight_per_cafe must be non-zero".to_string());
        }
        if self.backoff_base_secs == 0 {
            errors.push("backoff_base_secs must be non-zero".to_string());
        }
        if self.backoff_cap_secs < self.backoff_base_secs {
            errors.push("backoff_cap_secs must be >= backoff_base_secs".to_string());
        }
        if !(0.0..=1.0).contains(&self.backoff_jitter) {
            errors.push("backoff_jitter must be between 0.0 and 1.0".to_string());
        }
        if self.max_attempts == 0 {
            errors.push("max_attempts must be non-zero".to_string());
        }
        if self.sqlite_path.is_empty() {
            errors.push("sqlite_path must not be empty".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(CafeNodeConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_max_batch_is_invalid() {
        let mut config = CafeNodeConfig::default();
        config.max_batch = 0;
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("max_batch")));
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut config = CafeNodeConfig::default();
        config.cafe_urls.push("https://cafe.example".to_string());
        config.save(&path).unwrap();
        let loaded = CafeNodeConfig::load(&path).unwrap();
        assert_eq!(loaded.cafe_urls, config.cafe_urls);
    }

    #[test]
    fn save_refuses_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut config = CafeNodeConfig::default();
        config.max_attempts = 0;
        assert!(config.save(&path).is_err());
        assert!(!path.exists());
    }
}
