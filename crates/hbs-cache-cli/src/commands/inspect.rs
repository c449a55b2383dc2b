use std::path::Path;
use std::time::SystemTime;

use anyhow::Result;

use hbs_cache_core::environment::CacheStatus;

use crate::commands::{build_environment, Overrides};
use crate::output;

/// Show where a template's artifact lives and whether it would be reused.
pub fn run(config_path: &Path, overrides: &Overrides, name: &str) -> Result<()> {
    output::header(&format!("hbs-cache inspect: {name}"));
    let env = build_environment(config_path, overrides)?;
    let cache = env.cache();
    let key = env.cache_key(name)?;

    output::key_value("Artifact", &key.to_string());
    output::key_value("Auto-reload", &env.is_auto_reload().to_string());

    if !cache.exists(&key) {
        output::warning("not cached; the next render compiles it");
        return Ok(());
    }

    let written = cache.timestamp(&key);
    output::key_value("Written", &describe_age(written));
    match env.is_template_fresh(name, written) {
        Ok(true) => output::key_value("Source", "unchanged since compile"),
        Ok(false) => output::warning("source changed since compile"),
        Err(e) => output::warning(&e.to_string()),
    }

    match env.cache_status(name) {
        Ok(CacheStatus::Warm) => output::success("next render reuses the cached artifact"),
        Ok(CacheStatus::Stale) => output::warning("next render recompiles"),
        Ok(CacheStatus::Cold) => output::warning("not cached; the next render compiles it"),
        Err(e) => output::error(&e.to_string()),
    }
    Ok(())
}

fn describe_age(time: SystemTime) -> String {
    match SystemTime::now().duration_since(time) {
        Ok(age) if age.as_secs() < 120 => format!("{}s ago", age.as_secs()),
        Ok(age) if age.as_secs() < 7_200 => format!("{}m ago", age.as_secs() / 60),
        Ok(age) => format!("{}h ago", age.as_secs() / 3_600),
        Err(_) => "in the future".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_describe_age() {
        let now = SystemTime::now();
        assert_eq!(describe_age(now - Duration::from_secs(5)), "5s ago");
        assert_eq!(describe_age(now - Duration::from_secs(600)), "10m ago");
        assert_eq!(describe_age(now - Duration::from_secs(3 * 3_600)), "3h ago");
        assert_eq!(describe_age(now + Duration::from_secs(600)), "in the future");
    }
}
