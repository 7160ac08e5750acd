//! Configuration loading via `ortho-config`.

use std::ffi::OsString;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::monitor::RunMonitor;
use crate::path::PathTranslator;
use crate::transfer::TransferSettings;

/// Settings for the transfer pipeline derived from environment variables,
/// configuration files, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "SCANRELAY",
    discovery(
        app_name = "scanrelay",
        env_var = "SCANRELAY_CONFIG_PATH",
        config_file_name = "scanrelay.toml",
        dotfile_name = ".scanrelay.toml",
        project_file_name = "scanrelay.toml"
    )
)]
pub struct RelayConfig {
    /// Access token valid for the transfer flow's scope. Obtaining and
    /// refreshing it is left to the operator's login tooling.
    #[ortho_config(default = String::new())]
    pub access_token: String,
    /// Base URL of the Flows service.
    #[ortho_config(default = "https://flows.globus.org".to_owned())]
    pub flows_api_url: String,
    /// UUID of the transfer flow to run.
    #[ortho_config(default = String::new())]
    pub flow_id: String,
    /// UUID of the collection exposing the DAQ storage.
    #[ortho_config(default = String::new())]
    pub source_collection: String,
    /// UUID of the backup collection.
    #[ortho_config(default = String::new())]
    pub dest_collection: String,
    /// Root of the destination layout on the backup collection.
    #[ortho_config(default = "/backup".to_owned())]
    pub dest_base_path: String,
    /// Local mount point exposed by the source collection.
    #[ortho_config(default = "/xfel/ffs".to_owned())]
    pub local_prefix: String,
    /// Root marker used by the source collection in place of the prefix.
    #[ortho_config(default = "/~".to_owned())]
    pub remote_mount_token: String,
    /// Seconds between run status polls.
    #[ortho_config(default = 5)]
    pub poll_interval_secs: u64,
    /// Upper bound on monitoring a single run, in seconds. Unbounded when
    /// unset.
    pub max_monitor_secs: Option<u64>,
    /// Total submission attempts per scan, including the first one.
    #[ortho_config(default = 1)]
    pub submit_attempts: u32,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn guidance(&self) -> String {
        format!(
            "{}: set {} or add {} to scanrelay.toml",
            self.description, self.env_var, self.toml_key
        )
    }
}

const ACCESS_TOKEN: FieldMetadata = FieldMetadata::new(
    "Flows access token",
    "SCANRELAY_ACCESS_TOKEN",
    "access_token",
);
const FLOWS_API_URL: FieldMetadata =
    FieldMetadata::new("Flows API URL", "SCANRELAY_FLOWS_API_URL", "flows_api_url");
const FLOW_ID: FieldMetadata = FieldMetadata::new("flow ID", "SCANRELAY_FLOW_ID", "flow_id");
const SOURCE_COLLECTION: FieldMetadata = FieldMetadata::new(
    "source collection ID",
    "SCANRELAY_SOURCE_COLLECTION",
    "source_collection",
);
const DEST_COLLECTION: FieldMetadata = FieldMetadata::new(
    "destination collection ID",
    "SCANRELAY_DEST_COLLECTION",
    "dest_collection",
);
const DEST_BASE_PATH: FieldMetadata = FieldMetadata::new(
    "destination base path",
    "SCANRELAY_DEST_BASE_PATH",
    "dest_base_path",
);
const POLL_INTERVAL: FieldMetadata = FieldMetadata::new(
    "poll interval",
    "SCANRELAY_POLL_INTERVAL_SECS",
    "poll_interval_secs",
);
const SUBMIT_ATTEMPTS: FieldMetadata = FieldMetadata::new(
    "submission attempts",
    "SCANRELAY_SUBMIT_ATTEMPTS",
    "submit_attempts",
);

impl RelayConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}",
                metadata.guidance()
            )));
        }
        Ok(())
    }

    fn require_uuid(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        Self::require_field(value, metadata)?;
        Uuid::parse_str(value.trim()).map_err(|err| {
            ConfigError::InvalidField(format!(
                "invalid {} '{}' ({err}); expected a UUID",
                metadata.guidance(),
                value.trim()
            ))
        })?;
        Ok(())
    }

    fn require_positive(value: u64, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value == 0 {
            return Err(ConfigError::InvalidField(format!(
                "{} must be greater than zero",
                metadata.guidance()
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([OsString::from("scanrelay")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Checks the settings needed to talk to the Flows service.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the environment variable and TOML key
    /// of the first missing or malformed value.
    pub fn validate_client(&self) -> Result<(), ConfigError> {
        Self::require_field(&self.access_token, &ACCESS_TOKEN)?;
        Self::require_field(&self.flows_api_url, &FLOWS_API_URL)?;
        Self::require_uuid(&self.flow_id, &FLOW_ID)?;
        Self::require_positive(self.poll_interval_secs, &POLL_INTERVAL)
    }

    /// Performs semantic validation of every setting needed to submit
    /// transfers. Error messages include guidance on how to provide missing
    /// values via environment variables or configuration files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty
    /// and [`ConfigError::InvalidField`] when a value is malformed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_client()?;
        Self::require_uuid(&self.source_collection, &SOURCE_COLLECTION)?;
        Self::require_uuid(&self.dest_collection, &DEST_COLLECTION)?;
        Self::require_field(&self.dest_base_path, &DEST_BASE_PATH)?;
        Self::require_positive(u64::from(self.submit_attempts), &SUBMIT_ATTEMPTS)
    }

    /// Returns the configured path translator.
    #[must_use]
    pub fn translator(&self) -> PathTranslator {
        PathTranslator::new(&self.local_prefix, &self.remote_mount_token)
    }

    /// Builds the transfer settings for scan requests.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when validation fails.
    pub fn transfer_settings(&self) -> Result<TransferSettings, ConfigError> {
        self.validate()?;
        Ok(TransferSettings::new(
            self.source_collection.trim(),
            self.dest_collection.trim(),
            self.dest_base_path.trim(),
        )
        .with_translator(self.translator()))
    }

    /// Returns the delay between status polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Returns the monitoring deadline, if any.
    #[must_use]
    pub fn max_monitor_duration(&self) -> Option<Duration> {
        self.max_monitor_secs.map(Duration::from_secs)
    }

    /// Builds a run monitor from the polling settings.
    #[must_use]
    pub fn run_monitor(&self) -> RunMonitor {
        RunMonitor::new(self.poll_interval()).with_max_duration(self.max_monitor_duration())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a configuration value is present but malformed.
    #[error("invalid configuration field: {0}")]
    InvalidField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
