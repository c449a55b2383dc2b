use std::path::Path;

use anyhow::Result;

use hbs_cache_core::config::EnvironmentConfig;
use hbs_cache_core::project;

use crate::output;

/// Scaffold a project: config file, starter templates, sample context and an
/// empty cache directory.
pub fn run(dir: &Path) -> Result<()> {
    output::header(&format!("hbs-cache init: {}", dir.display()));

    output::step(1, 2, "Writing templates and sample context");
    let config = project::scaffold(dir)?;

    output::step(2, 2, &format!("Writing {}", EnvironmentConfig::FILE_NAME));
    output::key_value("Templates", &format!("{:?}", config.paths));
    if let Ok(cache) = config.options.cache.directory() {
        output::key_value("Cache", &cache.display().to_string());
    }

    output::success(&format!("Project created in {}", dir.display()));
    eprintln!();
    eprintln!("  Next steps:");
    eprintln!("    cd {}", dir.display());
    eprintln!("    hbs-cache render greeting.hbs --context context.json");
    eprintln!("    hbs-cache inspect greeting.hbs");
    eprintln!();

    Ok(())
}
