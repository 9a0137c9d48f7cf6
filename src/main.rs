// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! shotsort: AI-powered screenshot organizer
//!
//! Sorts screenshots into category folders using OCR keywords and a local
//! vision model.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use shotsort::classify::classify_image;
use shotsort::config::{AppConfig, TransferMode};
use shotsort::organizer::{FileOutcome, Organizer, RunStatistics};
use shotsort::shutdown::{spawn_signal_listener, Shutdown};
use shotsort::signals::{
    acquire_text, acquire_visual, Capabilities, TextSignalExtractor, VisualSignalClassifier,
};
use shotsort::watcher::find_images;

/// shotsort CLI - AI-powered screenshot organizer
#[derive(Parser, Debug)]
#[command(name = "shotsort")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Classify screenshots with OCR and a vision model and file them by category", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Organize every image in the source folder once
    Organize(RunArgs),

    /// Keep watching the source folder and organize new images as they appear
    Watch(RunArgs),

    /// Show the category each image would get, without moving anything
    Classify {
        /// Images to classify
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },

    /// Show which signal backends are available
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Source folder (overrides config)
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Destination folder (overrides config)
    #[arg(short, long)]
    dest: Option<PathBuf>,

    /// Copy instead of move (overrides config)
    #[arg(long)]
    copy: bool,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Generating a config must work even when the current one is broken
    if let Some(Commands::Config {
        action: ConfigCommands::Generate { output, force },
    }) = &cli.command
    {
        return run_generate_config(output, *force);
    }

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;

    match cli.command {
        Some(Commands::Organize(args)) => run_organize(config, args, &cli.format).await,
        Some(Commands::Watch(args)) => run_watch(config, args, &cli.format).await,
        Some(Commands::Classify { images }) => run_classify(config, images, &cli.format).await,
        Some(Commands::Status) => run_status(config).await,
        Some(Commands::Config { action }) => run_config_command(config, action, &cli.config),
        None => run_organize(config, RunArgs::default(), &cli.format).await,
    }
}

fn apply_overrides(config: &mut AppConfig, args: &RunArgs) {
    if let Some(ref source) = args.source {
        config.source_folder = source.clone();
    }
    if let Some(ref dest) = args.dest {
        config.destination_folder = dest.clone();
    }
    if args.copy {
        config.move_or_copy = TransferMode::Copy;
    }
}

/// One-shot batch run
async fn run_organize(mut config: AppConfig, args: RunArgs, format: &str) -> anyhow::Result<()> {
    apply_overrides(&mut config, &args);
    info!("Starting one-time organization...");

    // Backends first: nothing is touched if classification is impossible
    let capabilities = Capabilities::acquire(&config).await?;

    let shutdown = Shutdown::new();
    let listener = shutdown.listener();
    spawn_signal_listener(shutdown);

    let source = config.source_folder.clone();
    let mut organizer = Organizer::new(config, capabilities);
    let outcomes = organizer
        .organize_once(&source, &listener)
        .await
        .with_context(|| format!("Cannot scan source folder {:?}", source))?;

    report(format, &outcomes, organizer.stats())?;
    Ok(())
}

/// Polling watch session, summarized on Ctrl+C
async fn run_watch(mut config: AppConfig, args: RunArgs, format: &str) -> anyhow::Result<()> {
    apply_overrides(&mut config, &args);
    info!("Starting watch mode...");

    let capabilities = Capabilities::acquire(&config).await?;

    let shutdown = Shutdown::new();
    let listener = shutdown.listener();
    spawn_signal_listener(shutdown);

    let source = config.source_folder.clone();
    let mut organizer = Organizer::new(config, capabilities);
    info!("Press Ctrl+C to stop");
    organizer
        .watch(&source, listener)
        .await
        .with_context(|| format!("Cannot watch source folder {:?}", source))?;

    report(format, &[], organizer.stats())?;
    Ok(())
}

fn report(format: &str, outcomes: &[FileOutcome], stats: &RunStatistics) -> anyhow::Result<()> {
    match format {
        "json" => {
            let output = serde_json::json!({
                "files": outcomes.iter().map(FileOutcome::to_json).collect::<Vec<_>>(),
                "summary": stats,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => println!("\n{}", stats),
    }
    Ok(())
}

/// Classify images without moving them
async fn run_classify(config: AppConfig, images: Vec<PathBuf>, format: &str) -> anyhow::Result<()> {
    let capabilities = Capabilities::acquire(&config).await?;

    let mut results = Vec::new();
    for image in images {
        if !image.is_file() {
            eprintln!("Not a file: {}", image.display());
            continue;
        }
        let result = classify_image(
            &image,
            &capabilities,
            &config.categories,
            config.min_confidence,
        )
        .await;

        if format == "text" {
            let visual = match result.visual.category {
                Some(ref category) => format!("{} ({:.0}%)", category, result.visual.confidence * 100.0),
                None => "-".to_string(),
            };
            println!(
                "{}: {} [keywords: {}, visual: {}]",
                image.display(),
                result.category,
                result.text_match.as_deref().unwrap_or("-"),
                visual
            );
        }
        results.push(serde_json::json!({
            "path": image.to_string_lossy(),
            "classification": result,
        }));
    }

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }

    Ok(())
}

/// Run status check
async fn run_status(config: AppConfig) -> anyhow::Result<()> {
    println!("shotsort v{} Status", env!("CARGO_PKG_VERSION"));
    println!("======================");

    match acquire_text(&config).await {
        Ok(Some(backend)) => println!("Text signal: {} (ready)", backend.name()),
        Ok(None) => println!("Text signal: disabled"),
        Err(e) => println!("Text signal: unavailable - {}", e),
    }

    match acquire_visual(&config).await {
        Ok(Some(backend)) => println!(
            "Visual signal: {} with model '{}' (ready)",
            backend.name(),
            config.visual_signal.model
        ),
        Ok(None) => println!("Visual signal: disabled"),
        Err(e) => println!("Visual signal: unavailable - {}", e),
    }

    println!("\nConfiguration:");
    println!("  Source: {}", config.source_folder.display());
    println!("  Destination: {}", config.destination_folder.display());
    println!(
        "  Categories: {}",
        config.categories.names().collect::<Vec<_>>().join(", ")
    );
    println!(
        "  Mode: {:?}, by date: {}, rename: {}",
        config.move_or_copy, config.organize_by_date, config.rename_files
    );

    match find_images(&config.source_folder, &config.image_extensions) {
        Ok(images) => {
            println!("\nImages waiting in source: {}", images.len());
            for image in images.iter().take(20) {
                let size = std::fs::metadata(image).map(|m| m.len()).unwrap_or(0);
                println!("  - {} ({:.2} MB)", image.display(), size as f64 / (1024.0 * 1024.0));
            }
            if images.len() > 20 {
                println!("  ... and {} more", images.len() - 20);
            }
        }
        Err(e) => println!("\nSource folder unreadable: {}", e),
    }

    Ok(())
}

fn run_generate_config(output: &Path, force: bool) -> anyhow::Result<()> {
    if output.exists() && !force {
        anyhow::bail!("{:?} already exists. Use --force to overwrite", output);
    }
    AppConfig::default().save(output)?;
    println!("Generated config at {:?}", output);
    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> anyhow::Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output, force } => run_generate_config(&output, force)?,
        ConfigCommands::Validate => {
            println!("Configuration at {:?} is valid", config_path);
            println!("  Categories: {}", config.categories.len());
            println!("  Text backend: {:?}", config.text_signal.backend);
            println!("  Visual backend: {:?} ({})", config.visual_signal.backend, config.visual_signal.model);
            println!("  Min confidence: {}", config.min_confidence);
        }
    }

    Ok(())
}
