//! Runtime settings for admin runs
//!
//! [`AdminConfig::load`] reads `config/athena-admin.toml` when present and overlays
//! environment variables prefixed `ATHENA_ADMIN__`, e.g.
//! `ATHENA_ADMIN__DEFINITION_PATH=defs/prod.json`.

use crate::error::Result;
use crate::relocate::{parse_utc_offset, UtcOffsetShift};
use chrono::FixedOffset;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/athena-admin.toml";
const ENV_PREFIX: &str = "ATHENA_ADMIN";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AdminConfig {
    /// Definition file to apply
    #[serde(default = "default_definition_path")]
    pub definition_path: PathBuf,
    /// Root directory for the local object store, one subdirectory per bucket
    #[serde(default = "default_store_root")]
    pub store_root: PathBuf,
    /// Delete staged objects after copying them
    #[serde(default = "default_delete_pre_objects")]
    pub delete_pre_objects: bool,
    /// Shift UTC-staged keys into this offset before rendering partitions
    #[serde(default)]
    pub utc_offset: Option<String>,
    #[serde(default = "default_offset_trigger_key")]
    pub offset_trigger_key: String,
}

fn default_definition_path() -> PathBuf {
    PathBuf::from("definition.json")
}

fn default_store_root() -> PathBuf {
    PathBuf::from("store")
}

fn default_delete_pre_objects() -> bool {
    true
}

fn default_offset_trigger_key() -> String {
    "dt".to_string()
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            definition_path: default_definition_path(),
            store_root: default_store_root(),
            delete_pre_objects: default_delete_pre_objects(),
            utc_offset: None,
            offset_trigger_key: default_offset_trigger_key(),
        }
    }
}

fn environment(prefix: &str) -> Environment {
    Environment::with_prefix(prefix).separator("__")
}

impl AdminConfig {
    /// Load from `config/athena-admin.toml`, falling back to env vars
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from an explicit file, falling back to env vars
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::build(path.as_ref(), ENV_PREFIX)?)
    }

    fn build(path: &Path, env_prefix: &str) -> std::result::Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(environment(env_prefix))
            .build();

        let settings = match settings {
            Ok(cfg) => cfg,
            Err(err) => {
                // A file that exists but cannot be parsed is not fatal
                if path.exists() {
                    log::warn!(
                        "failed to load config file {}, falling back to env: {}",
                        path.display(),
                        err
                    );
                }
                Config::builder()
                    .add_source(environment(env_prefix))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        settings.try_deserialize::<AdminConfig>()
    }

    /// The configured offset, if any
    pub fn utc_offset(&self) -> Result<Option<FixedOffset>> {
        self.utc_offset.as_deref().map(parse_utc_offset).transpose()
    }

    /// Transform to hand to the relocator when an offset is configured
    pub fn offset_shift(&self) -> Result<Option<UtcOffsetShift>> {
        Ok(self
            .utc_offset()?
            .map(|offset| UtcOffsetShift::new(offset).trigger_key(self.offset_trigger_key.clone())))
    }
}
