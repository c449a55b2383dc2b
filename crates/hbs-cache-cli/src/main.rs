//! hbs-cache CLI — compile, cache and render Handlebars templates.
//!
//! Four commands: `init`, `render`, `compile`, and `inspect`. All but `init`
//! build a [`hbs_cache_core::HandlebarsEnvironment`] from the project's
//! `hbs-cache.config.json`, with cache directory and auto-reload overridable
//! from the command line.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "hbs-cache",
    about = "Compile, cache and render Handlebars templates",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to hbs-cache.config.json
    #[arg(
        long,
        global = true,
        env = "HBS_CACHE_CONFIG",
        default_value = "hbs-cache.config.json"
    )]
    config: PathBuf,

    /// Override the cache directory from the config file
    #[arg(long, global = true, env = "HBS_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Override auto-reload (defaults to the config's debug setting)
    #[arg(long, global = true)]
    auto_reload: Option<bool>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a project with starter templates and a config file
    Init {
        /// Project directory (created if missing)
        dir: PathBuf,
    },

    /// Render a template to stdout
    Render {
        /// Template name, relative to the configured template paths
        name: String,

        /// Render context as inline JSON
        #[arg(long, conflicts_with = "context")]
        data: Option<String>,

        /// Render context from a JSON file
        #[arg(long)]
        context: Option<PathBuf>,

        /// Abort if loading and rendering take longer than this
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print profile spans after rendering
        #[arg(long)]
        profile: bool,
    },

    /// Compile templates into the cache, ignoring freshness
    Compile {
        /// Template names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Show the cache entry for a template
    Inspect {
        /// Template name
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let overrides = commands::Overrides {
        cache_dir: cli.cache_dir,
        auto_reload: cli.auto_reload,
    };

    match cli.command {
        Commands::Init { dir } => {
            commands::init::run(&dir)?;
        }
        Commands::Render {
            name,
            data,
            context,
            timeout_ms,
            profile,
        } => {
            commands::render::run(
                &cli.config,
                &overrides,
                &name,
                data.as_deref(),
                context.as_deref(),
                timeout_ms,
                profile,
            )
            .await?;
        }
        Commands::Compile { names } => {
            commands::compile::run(&cli.config, &overrides, &names)?;
        }
        Commands::Inspect { name } => {
            commands::inspect::run(&cli.config, &overrides, &name)?;
        }
    }

    Ok(())
}
