use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;

use hbs_cache_core::profiler::{Profile, ProfileGuard, RecordingProfiler, TracingProfiler};
use hbs_cache_core::{HandlebarsEnvironment, HbsError};

use crate::commands::{build_environment, Overrides};
use crate::output;

/// Render a template to stdout.
///
/// The context comes from `--data`, `--context`, or defaults to `{}`. With a
/// timeout the blocking load/render runs on tokio's blocking pool.
pub async fn run(
    config_path: &Path,
    overrides: &Overrides,
    name: &str,
    data: Option<&str>,
    context_path: Option<&Path>,
    timeout_ms: Option<u64>,
    profile: bool,
) -> Result<()> {
    let context = read_context(data, context_path)?;
    let env = build_environment(config_path, overrides)?;
    let recorder = profile.then(RecordingProfiler::new);
    let env = match &recorder {
        Some(recorder) => env.with_profiler(recorder.clone()),
        None => env.with_profiler(TracingProfiler::new()),
    };

    let html = render_profiled(env, name, context, timeout_ms, recorder.as_ref()).await?;
    print!("{html}");

    if let Some(recorder) = recorder {
        output::header("profile");
        output::profile_table(&recorder.completed());
    }
    Ok(())
}

/// Render, inside a root span on `recorder` when one is given.
async fn render_profiled(
    env: HandlebarsEnvironment,
    name: &str,
    context: Value,
    timeout_ms: Option<u64>,
    recorder: Option<&RecordingProfiler>,
) -> hbs_cache_core::Result<String> {
    let _root = recorder.map(|recorder| ProfileGuard::new(recorder, Profile::root("render")));
    match timeout_ms {
        Some(ms) => {
            render_with_timeout(env, name.to_string(), context, Duration::from_millis(ms)).await
        }
        None => env.render(name, &context),
    }
}

/// Parse the render context from inline JSON or a file.
pub fn read_context(data: Option<&str>, context_path: Option<&Path>) -> Result<Value> {
    if let Some(data) = data {
        return serde_json::from_str(data).context("parsing --data");
    }
    if let Some(path) = context_path {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        return serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()));
    }
    Ok(Value::Object(Default::default()))
}

/// Render on the blocking pool, giving up after `limit`.
///
/// On timeout the blocking task is left to finish in the background; its
/// result is discarded.
pub async fn render_with_timeout(
    env: HandlebarsEnvironment,
    name: String,
    context: Value,
    limit: Duration,
) -> hbs_cache_core::Result<String> {
    let task_name = name.clone();
    let task = tokio::task::spawn_blocking(move || env.render(&task_name, &context));
    match tokio::time::timeout(limit, task).await {
        Ok(joined) => joined.map_err(|e| HbsError::Other(e.into()))?,
        Err(_) => Err(HbsError::Timeout {
            name,
            millis: limit.as_millis() as u64,
        }),
    }
}
