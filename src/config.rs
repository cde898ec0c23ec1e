//! Configuration file support for vex-discovery.
//!
//! Provides YAML-based configuration through `vex-discovery.config.yml`
//! files, including data structures, file loading, and validation.

use anyhow::{bail, Context};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::application::dto::{OciOptions, ProberOptions, OCI_SCHEME};
use crate::shared::security::{read_bounded_file, MAX_CONFIG_FILE_SIZE};
use crate::shared::Result;
use crate::vex_discovery::domain::Platform;

pub const CONFIG_FILENAME: &str = "vex-discovery.config.yml";

/// Top-level configuration file schema.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Upper bound in seconds for each registry call.
    pub timeout_secs: Option<u64>,
    /// Platform used when expanding image indexes, e.g. `linux/arm64`.
    pub platform: Option<String>,
    /// Prober options keyed by package URL type.
    #[serde(default)]
    pub probers: BTreeMap<String, serde_yaml_ng::Value>,
    /// Captures unknown fields for warnings.
    #[serde(flatten)]
    pub unknown_fields: HashMap<String, serde_yaml_ng::Value>,
}

impl ConfigFile {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Parsed platform; validated when the file was loaded.
    pub fn platform(&self) -> Result<Option<Platform>> {
        self.platform
            .as_deref()
            .map(|value| {
                value
                    .parse::<Platform>()
                    .map_err(|e| anyhow::anyhow!("Invalid config: platform: {}", e))
            })
            .transpose()
    }

    /// Converts the `probers` section into prober options
    ///
    /// The `oci` entry must match the OCI options schema. Entries for other
    /// types are passed through as custom options.
    pub fn prober_options(&self) -> Result<HashMap<String, ProberOptions>> {
        let mut options = HashMap::new();

        for (scheme, value) in &self.probers {
            let entry = if scheme == OCI_SCHEME {
                let oci: OciOptions = serde_yaml_ng::from_value(value.clone()).with_context(|| {
                    format!(
                        "Invalid config: probers.{}\n\n💡 Hint: Supported keys are 'repository' and 'repository_override'.",
                        scheme
                    )
                })?;
                ProberOptions::Oci(oci)
            } else {
                let custom = serde_json::to_value(value)
                    .with_context(|| format!("Invalid config: probers.{}", scheme))?;
                ProberOptions::Custom(custom)
            };
            options.insert(scheme.clone(), entry);
        }

        Ok(options)
    }
}

/// Load config from an explicit path. Returns an error if the file is not found.
pub fn load_config_from_path(path: &Path) -> Result<ConfigFile> {
    let content = read_bounded_file(path, "config file", MAX_CONFIG_FILE_SIZE).with_context(|| {
        format!(
            "Failed to read config file: {}\n\n💡 Hint: Check that the file exists and is readable.",
            path.display()
        )
    })?;

    let config: ConfigFile = serde_yaml_ng::from_str(&content).with_context(|| {
        format!(
            "Failed to parse config file: {}\n\n💡 Hint: Ensure the file contains valid YAML syntax.",
            path.display()
        )
    })?;

    validate_config(&config)?;
    warn_unknown_fields(&config);

    Ok(config)
}

/// Auto-discover config in a directory. Returns `None` silently if not found.
pub fn discover_config(dir: &Path) -> Result<Option<ConfigFile>> {
    let config_path = dir.join(CONFIG_FILENAME);

    if !config_path.exists() {
        return Ok(None);
    }

    let config = load_config_from_path(&config_path)?;
    Ok(Some(config))
}

/// Validate the loaded configuration.
fn validate_config(config: &ConfigFile) -> Result<()> {
    if config.timeout_secs == Some(0) {
        bail!(
            "Invalid config: timeout_secs must be greater than zero.\n\n\
             💡 Hint: Remove the field to use the default timeout."
        );
    }

    config.platform()?;
    config.prober_options()?;
    Ok(())
}

/// Warn about unknown fields and prober types without a built-in prober.
fn warn_unknown_fields(config: &ConfigFile) {
    for key in config.unknown_fields.keys() {
        warn!(field = %key, "unknown config field will be ignored");
    }
    for scheme in config.probers.keys().filter(|scheme| *scheme != OCI_SCHEME) {
        warn!(scheme = %scheme, "no built-in prober for this type; options kept as custom settings");
    }
}
