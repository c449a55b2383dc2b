//! Project directory creation and config I/O.
//!
//! ## Directory layout
//!
//! ```text
//! <project>/
//! ├── hbs-cache.config.json     # EnvironmentConfig
//! ├── context.json              # sample render data
//! ├── templates/
//! │   ├── greeting.hbs
//! │   └── header.hbs
//! └── cache/                    # compiled artifacts
//! ```

use std::path::Path;

use crate::config::EnvironmentConfig;
use crate::error::{HbsError, Result};
use crate::templates::embedded;

/// Create a new project with starter templates and a default config.
pub fn scaffold(project_dir: &Path) -> Result<EnvironmentConfig> {
    if project_dir.join(EnvironmentConfig::FILE_NAME).exists() {
        return Err(HbsError::Configuration(format!(
            "{} already contains {}",
            project_dir.display(),
            EnvironmentConfig::FILE_NAME
        )));
    }

    std::fs::create_dir_all(project_dir.join("templates"))?;
    std::fs::create_dir_all(project_dir.join("cache"))?;

    std::fs::write(project_dir.join("templates/greeting.hbs"), embedded::GREETING)?;
    std::fs::write(project_dir.join("templates/header.hbs"), embedded::HEADER)?;
    std::fs::write(project_dir.join("context.json"), embedded::CONTEXT_JSON)?;

    let config = EnvironmentConfig::default_for_project();
    config.save(&project_dir.join(EnvironmentConfig::FILE_NAME))?;
    Ok(config)
}

/// Load a config file, resolving its relative paths against its directory.
pub fn load_config(config_path: &Path) -> Result<EnvironmentConfig> {
    let mut config = EnvironmentConfig::load(config_path)?;
    let base = config_path.parent().unwrap_or(Path::new("."));
    config.resolve_relative(base);
    Ok(config)
}
