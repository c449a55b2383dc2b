//! CLI command implementations for hbs-cache.
//!
//! Each module corresponds to a subcommand (`hbs-cache <command>`).

pub mod compile;
pub mod init;
pub mod inspect;
pub mod render;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use hbs_cache_core::config::CacheSetting;
use hbs_cache_core::loader::FilesystemLoader;
use hbs_cache_core::{project, HandlebarsEnvironment};

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub cache_dir: Option<PathBuf>,
    pub auto_reload: Option<bool>,
}

/// Load the config at `config_path`, apply overrides and build the environment.
pub fn build_environment(config_path: &Path, overrides: &Overrides) -> Result<HandlebarsEnvironment> {
    let mut config = project::load_config(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    if let Some(dir) = &overrides.cache_dir {
        config.options.cache = CacheSetting::Path(dir.clone());
    }
    if let Some(auto_reload) = overrides.auto_reload {
        config.options.auto_reload = Some(auto_reload);
    }
    tracing::debug!(config = %config_path.display(), paths = ?config.paths, "config loaded");
    if config.paths.is_empty() {
        anyhow::bail!("{} lists no template paths", config_path.display());
    }

    let loader = FilesystemLoader::new(config.paths);
    Ok(HandlebarsEnvironment::new(loader, config.options)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbs_cache_core::config::EnvironmentConfig;

    #[test]
    fn test_overrides_win_over_config() {
        let dir = tempfile::tempdir().unwrap();
        project::scaffold(dir.path()).unwrap();
        let config_path = dir.path().join(EnvironmentConfig::FILE_NAME);

        let env = build_environment(&config_path, &Overrides::default()).unwrap();
        assert!(env.is_auto_reload());

        let elsewhere = dir.path().join("other-cache");
        let overrides = Overrides {
            cache_dir: Some(elsewhere.clone()),
            auto_reload: Some(false),
        };
        let env = build_environment(&config_path, &overrides).unwrap();
        assert!(!env.is_auto_reload());
        assert!(env
            .cache_key("greeting.hbs")
            .unwrap()
            .as_path()
            .starts_with(&elsewhere));
    }

    #[test]
    fn test_missing_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_environment(&dir.path().join("nope.json"), &Overrides::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("nope.json"));
    }
}
