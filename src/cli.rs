//! CLI interface for arogya

use anyhow::{Result, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::consultation::Consultation;
use crate::security::CredentialSet;

#[derive(Parser)]
#[command(name = "arogya")]
#[command(about = "Voice and image consultation assistant", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (defaults to server.port)
        #[arg(short, long, env = "AROGYA_PORT")]
        port: Option<u16>,
    },
    /// Run one consultation from local files
    Diagnose {
        /// Recorded question (wav, mp3, m4a, ogg, webm)
        #[arg(short, long)]
        audio: PathBuf,
        /// Photo of the affected area (png, jpg, jpeg, gif, webp)
        #[arg(short, long)]
        image: PathBuf,
        /// Where to write the spoken answer (defaults to server.upload_dir)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Check configuration, credentials and tools
    Check,
    /// Configure the application
    Config {
        /// Display current configuration
        #[arg(long)]
        show: bool,
        /// Reset configuration to defaults
        #[arg(long)]
        reset: bool,
        /// Print the configuration file path
        #[arg(long)]
        path: bool,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            let config = Config::load()?;
            let (host, port) = (config.server.host.clone(), config.server.port);
            crate::server::start(config, &host, port).await?;
        }
        Some(Commands::Serve { host, port }) => {
            let config = Config::load()?;
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            println!("Starting web server on {}:{}", host, port);
            crate::server::start(config, &host, port).await?;
        }
        Some(Commands::Diagnose { audio, image, output_dir }) => {
            let mut config = Config::load()?;
            if let Some(dir) = output_dir {
                config.server.upload_dir = dir;
            }
            run_diagnose(&config, audio, image).await?;
        }
        Some(Commands::Check) => {
            let report = crate::health::run_health_check()?;
            if !report.healthy {
                anyhow::bail!("{}", report.summary);
            }
        }
        Some(Commands::Config { show, reset, path }) => {
            if reset {
                crate::config::reset_config()?;
            } else if path {
                println!("{}", crate::config::config_path()?.display());
            } else if show {
                crate::config::show_config()?;
            } else {
                println!("Configuration options:");
                println!("  --show     Display current configuration");
                println!("  --reset    Reset configuration to defaults");
                println!("  --path     Print the configuration file path");
                println!();
                println!("API keys are read from the environment or a .env file:");
                println!("  GROQ_API_KEY         transcription and image analysis");
                println!("  ELEVENLABS_API_KEY   premium voice (optional)");
                println!();
                println!("Default configuration:");
                println!("{}", crate::config::default_config_toml());
            }
        }
    }

    Ok(())
}

async fn run_diagnose(config: &Config, audio: PathBuf, image: PathBuf) -> Result<()> {
    let credentials = Arc::new(CredentialSet::from_env());
    let consultation = Consultation::from_config(credentials, config)?;

    println!("Analyzing {} and {}...", audio.display(), image.display());
    let result = consultation
        .diagnose(&audio, &image)
        .await
        .context("Consultation failed")?;

    println!();
    println!("Patient: {}", result.transcript);
    println!();
    println!("Doctor: {}", result.diagnosis);
    println!();
    match result.audio_response_path {
        Some(path) => println!("Audio response: {}", path.display()),
        None => println!("Audio response: unavailable"),
    }

    Ok(())
}
