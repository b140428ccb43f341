//! PromptCut command line entry point.
//!
//! Renders one or two clips according to a free-text prompt using ffmpeg,
//! ffprobe and the whisper CLI.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use promptcut::cli::{Args, Commands};
use promptcut::config::Config;
use promptcut::error::PromptCutError;
use promptcut::request::{EditRequest, MediaAsset};
use promptcut::workflow::Workflow;

const DEFAULT_CONFIG_FILE: &str = "promptcut.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    // init-config must work even when an existing config file is broken
    let config_path = args.config.as_deref();
    let workflow = || -> Result<Workflow> { Ok(Workflow::new(load_config(config_path)?)) };

    match args.command {
        Commands::Render { video1, video2, prompt, output, output_dir } => {
            let workflow = workflow()?;
            info!("Rendering {} with prompt {:?}", video1.display(), prompt);

            if let Err(e) = render(&workflow, video1, video2, prompt, output, output_dir).await {
                eprintln!("{}", serde_json::to_string(&e.payload())?);
                eprintln!("status: {}", e.status_code());
                std::process::exit(if e.status_code() == 400 { 2 } else { 1 });
            }
        }
        Commands::Intent { prompt } => {
            let workflow = workflow()?;
            let (intent, graph) = workflow.plan(&prompt);
            println!("{}", serde_json::to_string_pretty(&intent)?);
            if intent.wants_subtitles {
                println!("filter: {} (subtitle burn-in added after transcription)", graph.render());
            } else {
                println!("filter: {}", graph.render());
            }
            if let Err(e) = workflow.check_resources(&intent) {
                eprintln!("warning: a render would fail: {}", e);
            }
        }
        Commands::Check => {
            let workflow = workflow()?;
            let versions = workflow.check_dependencies().await?;
            for version in versions {
                println!("{}", version);
            }
            println!(
                "transcriber: {} (model {})",
                workflow.config().transcriber.binary_path,
                workflow.config().transcriber.model
            );
        }
        Commands::InitConfig { path } => {
            Config::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
    }

    info!("PromptCut finished");
    Ok(())
}

async fn render(
    workflow: &Workflow,
    video1: PathBuf,
    video2: Option<PathBuf>,
    prompt: String,
    output: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> std::result::Result<(), PromptCutError> {
    let primary = MediaAsset::from_file("video1", &video1).await?;
    let secondary = match &video2 {
        Some(path) => Some(MediaAsset::from_file("video2", path).await?),
        None => None,
    };
    let request = EditRequest::new(primary, secondary, prompt);

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(120));

    let listener = spinner.clone();
    let result = workflow
        .process_with_progress(&request, move |stage| listener.set_message(stage.to_string()))
        .await;

    let rendered = match result {
        Ok(rendered) => rendered,
        Err(e) => {
            spinner.abandon_with_message("Render failed");
            return Err(e);
        }
    };

    let destination = match (output, output_dir) {
        (Some(path), _) => path,
        (None, Some(dir)) => {
            tokio::fs::create_dir_all(&dir).await?;
            dir.join(&rendered.filename)
        }
        (None, None) => PathBuf::from(&rendered.filename),
    };
    tokio::fs::write(&destination, &rendered.data).await?;

    spinner.finish_with_message(format!("Wrote {}", destination.display()));
    info!("Wrote {} ({}, {} bytes)", destination.display(), rendered.content_type, rendered.data.len());
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };
    Ok(config)
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".promptcut").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation; the guard must outlive the program
    let file_appender = rolling::daily(&log_dir, "promptcut.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // stdout is reserved for command output
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}", log_level, log_dir.join("promptcut.log").display());

    Ok(())
}
