use crate::environment::Environment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root of `config.toml`.
///
/// Every directory is optional; unset ones are resolved against the
/// platform data directory by the infrastructure layer.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct PhoenixConfig {
    /// Root of the per-environment world and blob stores.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Where seed packages are written and listed.
    #[serde(default)]
    pub seeds_dir: Option<PathBuf>,
    #[serde(default)]
    pub backups_dir: Option<PathBuf>,
    #[serde(default)]
    pub default_environment: Environment,
    /// Per-environment settings keyed by environment name (`LOCAL`, `BETA`, `PROD`).
    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub database_url: Option<String>,
}

impl PhoenixConfig {
    /// Settings for one environment, matching its name case-insensitively.
    pub fn environment(&self, environment: Environment) -> Option<&EnvironmentConfig> {
        let name = environment.to_string();
        self.environments
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
            .map(|(_, config)| config)
    }

    pub fn database_url(&self, environment: Environment) -> Option<&str> {
        self.environment(environment)?.database_url.as_deref()
    }
}
