//! File-system options and the open/copy/access vocabularies.

use std::collections::HashMap;
use std::time::Duration;

use smbfs_client::{SmbConfig, CONFIG_PREFIX};

use crate::error::{Result, SmbError};

/// Key for the NTLM domain in the options map.
pub const PROPERTY_KEY_DOMAIN: &str = "domain";
/// Key for the credential user in the options map.
pub const PROPERTY_KEY_USERNAME: &str = "username";
/// Key for the credential secret in the options map.
pub const PROPERTY_KEY_PASSWORD: &str = "password";
/// Key enabling the watch service for the file system.
pub const PROPERTY_KEY_WATCHSERVICE_ENABLED: &str = "smb.watchservice.enabled";
/// Key for the watch-service poll interval in milliseconds.
pub const PROPERTY_KEY_WATCHSERVICE_POLL_INTERVAL: &str = "smb.watchservice.pollInterval";

/// Polling cadence used when none is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(30_000);

/// Typed view of the options map accepted by the provider.
#[derive(Debug, Clone)]
pub struct FsOptions {
    pub domain: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub watch_enabled: bool,
    pub poll_interval: Duration,
    /// Keys carrying [`CONFIG_PREFIX`], passed to the collaborator
    /// untouched.
    pub client_properties: HashMap<String, String>,
}

impl Default for FsOptions {
    fn default() -> Self {
        Self {
            domain: None,
            username: None,
            password: None,
            watch_enabled: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            client_properties: HashMap::new(),
        }
    }
}

impl FsOptions {
    /// Parses the string map handed to the registry operations.
    pub fn from_map(env: &HashMap<String, String>) -> Result<Self> {
        let mut options = Self::default();
        for (key, value) in env {
            match key.as_str() {
                PROPERTY_KEY_DOMAIN => options.domain = Some(value.clone()),
                PROPERTY_KEY_USERNAME => options.username = Some(value.clone()),
                PROPERTY_KEY_PASSWORD => options.password = Some(value.clone()),
                PROPERTY_KEY_WATCHSERVICE_ENABLED => {
                    options.watch_enabled = value.parse().map_err(|_| {
                        SmbError::invalid_argument(format!(
                            "{} must be 'true' or 'false', got '{}'",
                            PROPERTY_KEY_WATCHSERVICE_ENABLED, value
                        ))
                    })?;
                }
                PROPERTY_KEY_WATCHSERVICE_POLL_INTERVAL => {
                    let millis: u64 = value.parse().map_err(|_| {
                        SmbError::invalid_argument(format!(
                            "{} must be an integer millisecond count, got '{}'",
                            PROPERTY_KEY_WATCHSERVICE_POLL_INTERVAL, value
                        ))
                    })?;
                    options.poll_interval = Duration::from_millis(millis);
                }
                key if key.starts_with(CONFIG_PREFIX) => {
                    options
                        .client_properties
                        .insert(key.to_string(), value.clone());
                }
                other => {
                    tracing::debug!("ignoring unrecognized file-system option '{}'", other);
                }
            }
        }
        Ok(options)
    }

    /// True when the options carry their own credential source.
    pub fn has_credentials(&self) -> bool {
        self.domain.is_some() || self.username.is_some()
    }

    /// Folds the pass-through properties into `base` to form the
    /// per-file-system collaborator context.
    pub fn apply_to(&self, base: &SmbConfig) -> SmbConfig {
        let mut config = base.clone();
        config
            .properties
            .extend(self.client_properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        config
    }
}

/// Options accepted when opening a byte channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenOption {
    Read,
    Write,
    Create,
    CreateNew,
    Append,
    TruncateExisting,
    Sync,
    Dsync,
    Sparse,
    DeleteOnClose,
}

/// Options accepted when copying or renaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyOption {
    ReplaceExisting,
    CopyAttributes,
}

/// Access modes checked by `check_access`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Read,
    Write,
}
