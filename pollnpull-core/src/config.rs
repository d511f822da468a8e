//! Runtime configuration.
//!
//! Values come from an optional YAML file and from command-line flags; the
//! flags win. [`ConfigFile::resolve`] validates the merged values once at
//! startup and produces an immutable [`Config`] that is handed to the engine
//! and adapter constructors.
//!
//! ```yaml
//! source_identifier: 1BxiMVs0XRA5nFMdKvBdBZjgmUUqptlbs74OgvE2upms
//! credentials_path: /etc/pollnpull/service-account.json
//! store_location: /var/lib/pollnpull/db.sqlite3
//! poll_interval_secs: 30
//! sheet_range: "Sheet1!R2C1:C4"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_STORE_LOCATION: &str = "db.sqlite3";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Rows 2.. of columns A-D: id, full name, organization, contact handle.
pub const DEFAULT_SHEET_RANGE: &str = "Sheet1!R2C1:C4";

/// Opaque secret used to authenticate against the source. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials(Vec<u8>);

impl Credentials {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credentials(<{} bytes redacted>)", self.0.len())
    }
}

/// Validated, immutable configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub source_identifier: String,
    pub credentials: Credentials,
    pub store_location: PathBuf,
    pub poll_interval: Duration,
    pub sheet_range: String,
}

/// Unvalidated configuration as read from YAML or assembled from flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub source_identifier: Option<String>,
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
    #[serde(default)]
    pub store_location: Option<PathBuf>,
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
    #[serde(default)]
    pub sheet_range: Option<String>,
}

impl ConfigFile {
    /// Load a YAML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay `overrides` on top of `self`; any value set in `overrides` wins.
    pub fn merge(self, overrides: ConfigFile) -> ConfigFile {
        ConfigFile {
            source_identifier: overrides.source_identifier.or(self.source_identifier),
            credentials_path: overrides.credentials_path.or(self.credentials_path),
            store_location: overrides.store_location.or(self.store_location),
            poll_interval_secs: overrides.poll_interval_secs.or(self.poll_interval_secs),
            sheet_range: overrides.sheet_range.or(self.sheet_range),
        }
    }

    /// Store location with the default applied. Needs no other validation.
    pub fn store_location(&self) -> PathBuf {
        self.store_location
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_LOCATION))
    }

    /// Validate, read the credential material and apply defaults.
    pub fn resolve(self) -> Result<Config, ConfigError> {
        let store_location = self.store_location();

        let source_identifier = self
            .source_identifier
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSourceIdentifier)?;

        let poll_interval = match self.poll_interval_secs {
            Some(0) => return Err(ConfigError::InvalidPollInterval),
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_POLL_INTERVAL,
        };

        let path = self.credentials_path.ok_or(ConfigError::MissingCredentials)?;
        let bytes = std::fs::read(&path)
            .map_err(|source| ConfigError::CredentialsUnreadable { path, source })?;

        Ok(Config {
            source_identifier,
            credentials: Credentials::new(bytes),
            store_location,
            poll_interval,
            sheet_range: self
                .sheet_range
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SHEET_RANGE.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_prefers_overrides() {
        let file = ConfigFile {
            source_identifier: Some("from-file".into()),
            poll_interval_secs: Some(60),
            ..ConfigFile::default()
        };
        let flags = ConfigFile {
            source_identifier: Some("from-flag".into()),
            ..ConfigFile::default()
        };
        let merged = file.merge(flags);
        assert_eq!(merged.source_identifier.as_deref(), Some("from-flag"));
        assert_eq!(merged.poll_interval_secs, Some(60));
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = Credentials::new(b"super-secret".to_vec());
        let printed = format!("{creds:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("12 bytes"));
    }

    #[test]
    fn store_location_defaults() {
        assert_eq!(
            ConfigFile::default().store_location(),
            PathBuf::from(DEFAULT_STORE_LOCATION)
        );
    }
}
