pub mod environment;
pub mod housekeeping;
pub mod seed;

use anyhow::{Context as _, Result};
use phoenix_application::{EnvironmentUseCase, HousekeepingService, SeedUseCase};
use phoenix_core::Environment;
use phoenix_core::config::PhoenixConfig;
use phoenix_infrastructure::{
    BackupStorage, ConfigService, DirWorldStore, FileSystemBlobStore, StorePaths,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strum::IntoEnumIterator;

/// Resolved configuration and stores shared by every command.
pub struct Context {
    pub config: PhoenixConfig,
    pub paths: StorePaths,
    /// Environment selected with `--env`, or the configured default.
    pub environment: Environment,
    world_store: Arc<DirWorldStore>,
    blob_store: Arc<FileSystemBlobStore>,
}

impl Context {
    pub fn load(
        config_path: Option<PathBuf>,
        data_dir: Option<PathBuf>,
        environment: Option<Environment>,
    ) -> Result<Self> {
        let service = match config_path {
            Some(path) => ConfigService::new(path),
            None => ConfigService::default_location()?,
        };
        let mut config = service
            .load()
            .with_context(|| format!("Failed to load {}", service.path().display()))?;
        if let Some(dir) = data_dir {
            config.data_dir = Some(dir);
        }
        let paths = StorePaths::from_config(&config)?;
        let environment = environment.unwrap_or(config.default_environment);

        tracing::debug!(
            config = %service.path().display(),
            data_dir = %paths.data_dir.display(),
            environment = %environment,
            "Loaded configuration"
        );

        Ok(Self {
            world_store: Arc::new(DirWorldStore::new(&paths.data_dir)),
            blob_store: Arc::new(FileSystemBlobStore::new(&paths.data_dir)),
            config,
            paths,
            environment,
        })
    }

    pub fn seeds(&self) -> SeedUseCase {
        Environment::iter().fold(
            SeedUseCase::new(
                self.world_store.clone(),
                self.blob_store.clone(),
                self.environment,
                &self.paths.seeds_dir,
            ),
            |use_case, env| match self.config.database_url(env) {
                Some(url) => use_case.with_database_url(env, url),
                None => use_case,
            },
        )
    }

    pub fn environments(&self) -> EnvironmentUseCase {
        EnvironmentUseCase::new(
            self.world_store.clone(),
            self.blob_store.clone(),
            BackupStorage::new(&self.paths.backups_dir),
        )
    }

    pub fn housekeeping(&self) -> HousekeepingService {
        HousekeepingService::new(
            self.world_store.clone(),
            self.blob_store.clone(),
            &self.paths.seeds_dir,
        )
    }

    /// A package argument is either a path or a name under the packages root.
    pub fn resolve_package(&self, package: &Path) -> PathBuf {
        if package.exists() || package.components().count() > 1 {
            package.to_path_buf()
        } else {
            self.paths.seeds_dir.join(package)
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(temp_dir: &TempDir) -> PathBuf {
        let path = temp_dir.path().join("config.toml");
        let data_dir = temp_dir.path().join("data");
        fs::write(
            &path,
            format!(
                "data_dir = {:?}\ndefault_environment = \"BETA\"\n",
                data_dir.display().to_string()
            ),
        )
        .unwrap();
        path
    }

    #[test]
    fn test_load_applies_config_and_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let config = write_config(&temp_dir);

        let ctx = Context::load(Some(config.clone()), None, None).unwrap();
        assert_eq!(ctx.environment, Environment::Beta);
        assert_eq!(ctx.paths.data_dir, temp_dir.path().join("data"));
        assert_eq!(ctx.paths.seeds_dir, temp_dir.path().join("data").join("seeds"));

        let other = temp_dir.path().join("other");
        let ctx =
            Context::load(Some(config), Some(other.clone()), Some(Environment::Prod)).unwrap();
        assert_eq!(ctx.environment, Environment::Prod);
        assert_eq!(ctx.paths.data_dir, other);
    }

    #[test]
    fn test_resolve_package() {
        let temp_dir = TempDir::new().unwrap();
        let ctx = Context::load(Some(write_config(&temp_dir)), None, None).unwrap();

        assert_eq!(
            ctx.resolve_package(Path::new("w1_BETA_20240501_120000")),
            ctx.paths.seeds_dir.join("w1_BETA_20240501_120000")
        );
        assert_eq!(
            ctx.resolve_package(Path::new("elsewhere/pkg")),
            PathBuf::from("elsewhere/pkg")
        );
    }
}
