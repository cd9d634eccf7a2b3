use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::Environment;
use crate::shared::ValidationError;

/// Directory, relative to the working directory, holding the configuration files.
const CONFIGURATION_DIR: &str = "configuration";

/// Extensions tried, in order, for every configuration layer.
const EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Prefix of environment variables overriding file values, as in `APP_SEED__DEADLINE_MS`.
const ENV_PREFIX: &str = "APP";

/// Separator between nested keys in overriding environment variables.
const ENV_KEY_SEPARATOR: &str = "__";

/// Top level configuration that can be loaded with [`load_config`].
pub trait Config: DeserializeOwned {
    /// Checks values that deserialize fine but cannot be used.
    fn validate(&self) -> Result<(), ValidationError>;
}

#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("failed to read the working directory: {0}")]
    WorkingDirectory(#[source] io::Error),

    #[error("`APP_ENVIRONMENT` is invalid: {0}")]
    Environment(#[from] io::Error),

    #[error("`{0}` is not a directory")]
    NotADirectory(PathBuf),

    #[error("no `{stem}` configuration file in `{directory}` (tried {tried})")]
    MissingFile {
        stem: String,
        directory: PathBuf,
        tried: String,
    },

    #[error("invalid configuration file `{path}`: {source}")]
    InvalidFile {
        path: PathBuf,
        #[source]
        source: config::ConfigError,
    },

    #[error("failed to build the configuration: {0}")]
    Build(#[source] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),
}

/// Loads `T` from `./configuration` for the environment named by `APP_ENVIRONMENT`.
///
/// Values come from `base.{yaml,yml,json}`, then `{environment}.{yaml,yml,json}`, then
/// environment variables prefixed with `APP_` using `__` between nested keys
/// (`APP_SEED__SHAPE__CONTAINER_COUNT=5`). The result is validated before being returned.
pub fn load_config<T: Config>() -> Result<T, LoadConfigError> {
    let working_directory = std::env::current_dir().map_err(LoadConfigError::WorkingDirectory)?;
    let environment = Environment::load()?;

    load_config_from(&working_directory.join(CONFIGURATION_DIR), environment)
}

/// Same as [`load_config`] with an explicit directory and environment.
pub fn load_config_from<T: Config>(
    directory: &Path,
    environment: Environment,
) -> Result<T, LoadConfigError> {
    if !directory.is_dir() {
        return Err(LoadConfigError::NotADirectory(directory.to_path_buf()));
    }

    let mut builder = config::Config::builder();
    for stem in ["base", environment.as_str()] {
        let path = locate(directory, stem)?;
        builder = builder.add_source(config::File::from(path.clone()));

        // Building each layer on its own points parse errors at the offending file.
        if let Err(source) = builder.build_cloned() {
            return Err(LoadConfigError::InvalidFile { path, source });
        }
    }

    let overrides = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator(ENV_KEY_SEPARATOR);

    let loaded: T = builder
        .add_source(overrides)
        .build()
        .and_then(|settings| settings.try_deserialize())
        .map_err(LoadConfigError::Build)?;
    loaded.validate()?;

    Ok(loaded)
}

fn locate(directory: &Path, stem: &str) -> Result<PathBuf, LoadConfigError> {
    let candidates = EXTENSIONS.map(|extension| directory.join(format!("{stem}.{extension}")));

    if let Some(found) = candidates.iter().find(|path| path.is_file()) {
        return Ok(found.clone());
    }

    let tried = candidates
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");

    Err(LoadConfigError::MissingFile {
        stem: stem.to_string(),
        directory: directory.to_path_buf(),
        tried,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{SeederConfig, StoreConfig};
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("seed-config-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    const BASE: &str = "seed:\n  shape:\n    container_count: 100\n    groups_per_container: 1000\n    items_per_group: 10\nstore_a:\n  memory\nstore_b:\n  memory\n";

    #[test]
    fn environment_file_overrides_base_file() {
        let dir = scratch_dir("layered");
        fs::write(dir.join("base.yaml"), BASE).unwrap();
        fs::write(
            dir.join("dev.json"),
            r#"{"seed": {"shape": {"container_count": 2}}}"#,
        )
        .unwrap();

        let config: SeederConfig = load_config_from(&dir, Environment::Dev).unwrap();

        assert_eq!(config.seed.shape.container_count, 2);
        assert_eq!(config.seed.shape.groups_per_container, 1000);
        assert!(matches!(config.store_a, StoreConfig::Memory));
        assert_eq!(config.seed.queues.item_capacity, 200);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_environment_file_lists_tried_paths() {
        let dir = scratch_dir("missing");
        fs::write(dir.join("base.yaml"), BASE).unwrap();

        let err = load_config_from::<SeederConfig>(&dir, Environment::Prod).unwrap_err();

        match err {
            LoadConfigError::MissingFile { stem, tried, .. } => {
                assert_eq!(stem, "prod");
                assert!(tried.contains("prod.yaml"));
                assert!(tried.contains("prod.json"));
            }
            other => panic!("unexpected error: {other}"),
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn invalid_values_are_rejected_after_loading() {
        let dir = scratch_dir("invalid");
        fs::write(dir.join("base.yaml"), BASE).unwrap();
        fs::write(
            dir.join("dev.yaml"),
            "seed:\n  queues:\n    command_capacity: 0\n",
        )
        .unwrap();

        let err = load_config_from::<SeederConfig>(&dir, Environment::Dev).unwrap_err();

        assert!(matches!(
            err,
            LoadConfigError::Validation(ValidationError::ZeroQueueCapacity("command_capacity"))
        ));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_directory_is_reported() {
        let dir = std::env::temp_dir().join("seed-config-does-not-exist");

        let err = load_config_from::<SeederConfig>(&dir, Environment::Dev).unwrap_err();

        assert!(matches!(err, LoadConfigError::NotADirectory(_)));
    }
}
