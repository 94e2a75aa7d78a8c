//! TOML configuration for the workflow and its services.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use carebook_contracts::error::{CarebookError, CarebookResult};
use carebook_reminders::ReminderPolicy;

use crate::external::ExternalCallPolicy;

/// External-call budget as it appears in the TOML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalConfig {
    pub timeout_secs: u64,
    pub retry_once: bool,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self { timeout_secs: 5, retry_once: true }
    }
}

/// Full workflow configuration.
///
/// Every section has defaults, so an empty TOML document is a valid
/// configuration.
///
/// ```toml
/// data_dir = "data"
/// forms_dir = "data/forms_sent"
///
/// [reminders]
/// offsets_hours = [24, 6, 1]
/// anchor = "appointment-time"   # or "call-time" for the legacy behavior
///
/// [external]
/// timeout_secs = 5
/// retry_once = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CarebookConfig {
    pub data_dir: PathBuf,
    pub forms_dir: PathBuf,
    pub reminders: ReminderPolicy,
    pub external: ExternalConfig,
}

impl Default for CarebookConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            forms_dir: PathBuf::from("data/forms_sent"),
            reminders: ReminderPolicy::default(),
            external: ExternalConfig::default(),
        }
    }
}

impl CarebookConfig {
    /// Parse `s` as a TOML configuration document.
    pub fn from_toml_str(s: &str) -> CarebookResult<Self> {
        toml::from_str(s).map_err(|e| CarebookError::Config {
            reason: format!("failed to parse configuration TOML: {}", e),
        })
    }

    /// Read and parse the configuration file at `path`.
    pub fn from_file(path: &Path) -> CarebookResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| CarebookError::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The runtime external-call policy this configuration describes.
    pub fn external_policy(&self) -> ExternalCallPolicy {
        ExternalCallPolicy {
            timeout: Duration::from_secs(self.external.timeout_secs),
            retry_once: self.external.retry_once,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use carebook_contracts::error::CarebookError;
    use carebook_reminders::ReminderAnchor;

    use super::CarebookConfig;

    #[test]
    fn empty_document_yields_defaults() {
        let config = CarebookConfig::from_toml_str("").unwrap();
        assert_eq!(config, CarebookConfig::default());
        assert_eq!(config.reminders.anchor, ReminderAnchor::AppointmentTime);
    }

    #[test]
    fn full_document_round_trips() {
        let toml = r#"
            data_dir = "/var/lib/carebook"
            forms_dir = "/var/lib/carebook/forms"

            [reminders]
            offsets_hours = [48, 12, 2]
            anchor = "call-time"

            [external]
            timeout_secs = 2
            retry_once = false
        "#;

        let config = CarebookConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/carebook"));
        assert_eq!(config.reminders.offsets_hours, [48, 12, 2]);
        assert_eq!(config.reminders.anchor, ReminderAnchor::CallTime);
        assert_eq!(config.external_policy().timeout.as_secs(), 2);
        assert!(!config.external_policy().retry_once);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let result = CarebookConfig::from_toml_str("this is not valid toml ][[[");
        match result {
            Err(CarebookError::Config { reason }) => {
                assert!(reason.contains("failed to parse configuration TOML"));
            }
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn missing_config_file_is_a_config_error() {
        let result = CarebookConfig::from_file(std::path::Path::new("/no/such/carebook.toml"));
        assert!(matches!(result, Err(CarebookError::Config { .. })));
    }
}
