//! Environment options and the `hbs-cache.config.json` file.
//!
//! ```json
//! {
//!   "paths": ["templates"],
//!   "cache": "cache",
//!   "debug": false,
//!   "auto_reload": true,
//!   "flags": ["best_performance", "error_exception", "runtime_partials"],
//!   "fileext": [".hbs"]
//! }
//! ```
//!
//! Relative paths are resolved against the directory holding the config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compiler::{CompileFlags, CompileOptions};
use crate::error::{HbsError, Result};

/// The `cache` option. Only a non-empty directory path is accepted; anything
/// else (`false`, `null`, numbers, objects) is kept so it can be reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheSetting {
    Path(PathBuf),
    Invalid(serde_json::Value),
}

impl CacheSetting {
    /// The cache directory, or a configuration error.
    pub fn directory(&self) -> Result<&Path> {
        match self {
            Self::Path(path) if !path.as_os_str().is_empty() => Ok(path),
            Self::Path(_) => Err(HbsError::Configuration("empty path".to_string())),
            Self::Invalid(serde_json::Value::Null) => {
                Err(HbsError::Configuration("no cache configured".to_string()))
            }
            Self::Invalid(value) => Err(HbsError::Configuration(format!("got {value}"))),
        }
    }
}

impl Default for CacheSetting {
    fn default() -> Self {
        Self::Invalid(serde_json::Value::Null)
    }
}

impl From<PathBuf> for CacheSetting {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for CacheSetting {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

/// Options for [`crate::environment::HandlebarsEnvironment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentOptions {
    /// Re-check freshness on every load. `None` follows `debug`.
    pub auto_reload: Option<bool>,
    pub debug: bool,
    pub flags: CompileFlags,
    /// Partial search roots; empty means the loader's paths.
    pub basedir: Vec<PathBuf>,
    pub fileext: Vec<String>,
    pub cache: CacheSetting,
}

impl Default for EnvironmentOptions {
    fn default() -> Self {
        Self {
            auto_reload: None,
            debug: true,
            flags: CompileFlags::default(),
            basedir: Vec::new(),
            fileext: CompileOptions::default_fileext(),
            cache: CacheSetting::default(),
        }
    }
}

impl EnvironmentOptions {
    /// Defaults with the given cache directory.
    pub fn with_cache_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            cache: CacheSetting::Path(dir.into()),
            ..Self::default()
        }
    }

    /// Effective auto-reload setting.
    pub fn auto_reload(&self) -> bool {
        self.auto_reload.unwrap_or(self.debug)
    }

    /// Options for the compiler, falling back to `loader_paths` for partials.
    pub fn compile_options(&self, loader_paths: Vec<PathBuf>) -> CompileOptions {
        let basedir = if self.basedir.is_empty() {
            loader_paths
        } else {
            self.basedir.clone()
        };
        CompileOptions {
            flags: self.flags,
            basedir,
            fileext: self.fileext.clone(),
        }
    }
}

/// Contents of `hbs-cache.config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Template roots for the filesystem loader.
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    #[serde(flatten)]
    pub options: EnvironmentOptions,
}

impl EnvironmentConfig {
    pub const FILE_NAME: &'static str = "hbs-cache.config.json";

    /// Config written by `hbs-cache init`: `templates/` and `cache/` next to the file.
    pub fn default_for_project() -> Self {
        Self {
            paths: vec![PathBuf::from("templates")],
            options: EnvironmentOptions::with_cache_dir("cache"),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| HbsError::ConfigNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&contents).map_err(|e| HbsError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| HbsError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Make relative `paths`, `basedir` and `cache` relative to `base`.
    pub fn resolve_relative(&mut self, base: &Path) {
        let absolutize = |p: &mut PathBuf| {
            if p.is_relative() && !p.as_os_str().is_empty() {
                *p = base.join(&*p);
            }
        };
        self.paths.iter_mut().for_each(absolutize);
        self.options.basedir.iter_mut().for_each(absolutize);
        if let CacheSetting::Path(dir) = &mut self.options.cache {
            absolutize(dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_must_be_a_path() {
        for json in [r#"false"#, r#"null"#, r#"0"#, r#"{"dir":"x"}"#, r#""""#] {
            let setting: CacheSetting = serde_json::from_str(json).unwrap();
            let err = setting.directory().unwrap_err();
            assert!(matches!(err, HbsError::Configuration(_)), "{json}");
        }
        let setting: CacheSetting = serde_json::from_str(r#""/tmp/cache""#).unwrap();
        assert_eq!(setting.directory().unwrap(), Path::new("/tmp/cache"));
    }

    #[test]
    fn test_auto_reload_follows_debug() {
        let mut options = EnvironmentOptions::with_cache_dir("c");
        assert!(options.auto_reload());
        options.debug = false;
        assert!(!options.auto_reload());
        options.auto_reload = Some(true);
        assert!(options.auto_reload());
    }

    #[test]
    fn test_compile_options_basedir_fallback() {
        let mut options = EnvironmentOptions::with_cache_dir("c");
        let loader_paths = vec![PathBuf::from("templates")];
        assert_eq!(options.compile_options(loader_paths.clone()).basedir, loader_paths);

        options.basedir = vec![PathBuf::from("partials")];
        assert_eq!(
            options.compile_options(loader_paths).basedir,
            vec![PathBuf::from("partials")]
        );
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(EnvironmentConfig::FILE_NAME);
        let mut config = EnvironmentConfig::default_for_project();
        config.options.debug = false;
        config.options.flags = CompileFlags::STRICT | CompileFlags::ERROR_EXCEPTION;
        config.save(&path).unwrap();

        let loaded = EnvironmentConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_defaults_from_minimal_file() {
        let config: EnvironmentConfig =
            serde_json::from_str(r#"{"paths": ["views"], "cache": "var/cache"}"#).unwrap();
        assert_eq!(config.paths, vec![PathBuf::from("views")]);
        assert!(config.options.debug);
        assert_eq!(config.options.flags, CompileFlags::default());
        assert_eq!(config.options.fileext, vec![".hbs", ".handlebars"]);
        assert!(config.options.cache.directory().is_ok());
    }

    #[test]
    fn test_config_false_cache_is_rejected_after_parse() {
        let config: EnvironmentConfig = serde_json::from_str(r#"{"cache": false}"#).unwrap();
        assert!(config.options.cache.directory().is_err());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            EnvironmentConfig::load(&missing),
            Err(HbsError::ConfigNotFound { .. })
        ));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            EnvironmentConfig::load(&broken),
            Err(HbsError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_resolve_relative() {
        let mut config = EnvironmentConfig::default_for_project();
        config.options.basedir = vec![PathBuf::from("/abs/partials")];
        config.resolve_relative(Path::new("/srv/site"));

        assert_eq!(config.paths, vec![PathBuf::from("/srv/site/templates")]);
        assert_eq!(config.options.basedir, vec![PathBuf::from("/abs/partials")]);
        assert_eq!(
            config.options.cache,
            CacheSetting::Path(PathBuf::from("/srv/site/cache"))
        );
    }
}
