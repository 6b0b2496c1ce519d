use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use reelname::api::CatalogApi;
use reelname::config::Config;
use reelname::model::Scene;
use reelname::process;

#[derive(Parser)]
#[command(name = "reelname", version, about = "Template-driven media library renamer")]
struct Cli {
    /// Path to the config file (default: ~/.config/reelname/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rename scene files according to the configured templates
    Rename {
        /// Scene ids to process (all scenes when omitted)
        scene_ids: Vec<String>,

        /// Report intended renames without touching anything, regardless of
        /// the config setting
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the config and check connectivity to the catalog API
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let mut config =
        Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Rename { scene_ids, dry_run } => {
            if dry_run {
                config.dry_run = true;
            }
            if config.dry_run {
                println!("DRY RUN - no files will be renamed");
            }

            let api = CatalogApi::connect(&config.api_url);
            let studios = api
                .all_studios()
                .context("Failed to fetch studios from the catalog API")?;

            let scenes: Vec<Scene> = if scene_ids.is_empty() {
                api.all_scenes()
                    .context("Failed to fetch scenes from the catalog API")?
            } else {
                let mut scenes = Vec::with_capacity(scene_ids.len());
                for id in &scene_ids {
                    match api
                        .scene_by_id(id)
                        .with_context(|| format!("Failed to fetch scene {id}"))?
                    {
                        Some(scene) => scenes.push(scene),
                        None => log::warn!("Scene {id} not found, skipping"),
                    }
                }
                scenes
            };
            println!("Processing {} scenes...", scenes.len());

            let stats = process::process_scenes(&config, &scenes, &studios)?;
            println!(
                "{} files: {} renamed, {} skipped, {} errors",
                stats.files, stats.renamed, stats.skipped, stats.errors
            );
        }

        Commands::Check => {
            println!(
                "Config OK: {} file name templates, {} directory templates",
                config.file_name_templates.len(),
                config.file_dir_templates.len()
            );
            let api = CatalogApi::connect(&config.api_url);
            let version = api
                .version()
                .context("Failed to query the catalog API version")?;
            println!("Catalog API {version} reachable at {}", config.api_url);
            if !config.dry_run && !config.database_path.is_file() {
                anyhow::bail!(
                    "catalog database not found at {}",
                    config.database_path.display()
                );
            }
            println!("Catalog database: {}", config.database_path.display());
        }
    }

    Ok(())
}
