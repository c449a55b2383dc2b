use std::path::Path;

use anyhow::Result;

use crate::commands::{build_environment, Overrides};
use crate::output;

/// Compile each template into the cache regardless of freshness.
///
/// Every name is attempted; the command fails if any of them did.
pub fn run(config_path: &Path, overrides: &Overrides, names: &[String]) -> Result<()> {
    output::header("hbs-cache compile");
    let env = build_environment(config_path, overrides)?;

    let mut failed = 0usize;
    for name in names {
        match env.compile(name) {
            Ok(code) => {
                output::success(name);
                let key = env.cache_key(name)?;
                output::key_value("Artifact", &key.to_string());
                output::key_value("Size", &format!("{} bytes", code.len()));
            }
            Err(e) => {
                failed += 1;
                output::error(&format!("{name}: {}", error_chain(&e)));
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} templates failed to compile", names.len());
    }
    Ok(())
}

/// `outer: inner: root` rendering of an error and its sources.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
