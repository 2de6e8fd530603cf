// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! vidlens: ask questions about a video
//!
//! Command-line front end: analyze a single video, serve the web UI,
//! check the Gemini connection and manage configuration.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use vidlens::config::AppConfig;
use vidlens::gemini::GeminiClient;
use vidlens::shutdown::shutdown_on_signal;
use vidlens::{Orchestrator, Result, VideoUpload, VidlensError};

/// vidlens CLI - multimodal video analysis
#[derive(Parser, Debug)]
#[command(name = "vidlens")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version)]
#[command(about = "Ask a Gemini agent questions about a video", long_about = None)]
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

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a video file
    Analyze {
        /// Video to analyze (.mp4 or .mov)
        video: PathBuf,

        /// What insights are you seeking from the video?
        #[arg(short = 'Q', long)]
        query: String,
    },

    /// Serve the web UI
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Open the page in a browser once listening
        #[arg(long)]
        open: bool,
    },

    /// Check the Gemini API and the configured model
    Status,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Create config.json and a .env template
    Init {
        /// Directory to initialize (default: current)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },
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
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    // Initialize tracing
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
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Analyze { video, query } => run_analyze(config, &video, &query, &cli.format).await,
        Commands::Serve { host, port, open } => run_serve(config, host, port, open).await,
        Commands::Status => run_status(config).await,
        Commands::Config { action } => run_config_command(config, action, &cli.config),
        Commands::Init { dir, force } => run_init(dir, force),
    }
}

/// Run one analysis and print the answer
async fn run_analyze(config: AppConfig, video: &Path, query: &str, format: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(VidlensError::EmptyQuery);
    }

    let upload = VideoUpload::from_path(video)?;
    let orchestrator = Orchestrator::from_config(&config)?;
    let cancel = shutdown_on_signal();

    info!("Processing the video and gathering data ...");

    let report = match orchestrator.analyze(&upload, query, &cancel).await {
        Ok(report) => report,
        Err(e) => {
            error!("An error occurred during analysis : {}", e);
            return Err(e);
        }
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => println!("{}", report.content),
    }

    Ok(())
}

/// Run the web UI until Ctrl+C
async fn run_serve(
    mut config: AppConfig,
    host: Option<String>,
    port: Option<u16>,
    open: bool,
) -> Result<()> {
    if let Some(host) = host {
        config.web.host = host;
    }
    if let Some(port) = port {
        config.web.port = port;
    }

    let orchestrator = Orchestrator::from_config(&config)?;
    info!("Agent: {} ({})", config.agent.name, config.agent.model);

    if open {
        let url = format!("http://{}:{}", config.web.host, config.web.port);
        if let Err(e) = launch_browser(&url) {
            warn!("Could not open {}: {}", url, e);
        }
    }

    vidlens::web::start_server(config, orchestrator, shutdown_on_signal()).await?;

    info!("vidlens stopped.");
    Ok(())
}

/// Hand `url` to the desktop's default browser
fn launch_browser(url: &str) -> std::io::Result<()> {
    let (program, prefix): (&str, &[&str]) = if cfg!(target_os = "macos") {
        ("open", &[])
    } else if cfg!(windows) {
        ("cmd", &["/c", "start"])
    } else {
        ("xdg-open", &[])
    };

    std::process::Command::new(program)
        .args(prefix)
        .arg(url)
        .spawn()
        .map(|_| ())
}

/// Run status check
async fn run_status(config: AppConfig) -> Result<()> {
    println!("vidlens v{} Status", env!("CARGO_PKG_VERSION"));
    println!("======================");

    let api_key = match config.agent.api_key() {
        Ok(key) => {
            println!("API key: {} is set", config.agent.api_key_env);
            key
        }
        Err(e) => {
            println!("API key: Error - {}", e);
            return Ok(());
        }
    };

    let client = GeminiClient::new(
        &config.agent.api_url,
        &api_key,
        Duration::from_secs(config.agent.timeout_secs),
    )?;

    match client.health_check().await {
        Ok(()) => println!("Gemini API: Reachable ({})", config.agent.api_url),
        Err(e) => {
            println!("Gemini API: Error - {}", e);
            return Ok(());
        }
    }

    match client.model_available(&config.agent.model).await {
        Ok(true) => println!("Model: {} available", config.agent.model),
        Ok(false) => {
            warn!("Model '{}' not listed by the API", config.agent.model);
            println!("Model: {} NOT available", config.agent.model);
        }
        Err(e) => println!("Model: Error - {}", e),
    }

    println!("\nConfiguration:");
    println!("  Web search: {}", if config.search.enabled { "DuckDuckGo" } else { "disabled" });
    println!("  Poll interval: {} ms", config.ingestion.poll_interval_ms);
    println!("  Max polls: {}", config.ingestion.max_poll_attempts);
    println!("  Uploads: {}", config.upload.allowed_extensions.join(", "));

    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Model: {}", config.agent.model);
            println!("  API key variable: {}", config.agent.api_key_env);
            println!("  Web UI: {}:{}", config.web.host, config.web.port);
        }
    }

    Ok(())
}

/// Initialize a new vidlens directory
fn run_init(dir: Option<PathBuf>, force: bool) -> Result<()> {
    let target = dir.unwrap_or_else(|| PathBuf::from("."));
    let config_path = target.join("config.json");

    if config_path.exists() && !force {
        return Err(VidlensError::Config(
            "config.json already exists. Use --force to overwrite".to_string()
        ));
    }

    std::fs::create_dir_all(&target)?;

    let config = AppConfig::default();
    config.save(&config_path)?;

    let env_path = target.join(".env");
    if !env_path.exists() {
        std::fs::write(&env_path, format!("{}=\n", config.agent.api_key_env))?;
    }

    println!("vidlens initialized in {:?}", target);
    println!("\nCreated:");
    println!("  - config.json");
    println!("  - .env");
    println!("\nNext steps:");
    println!("  1. Put your Gemini API key in .env ({})", config.agent.api_key_env);
    println!("  2. Start the UI: vidlens serve");

    Ok(())
}
