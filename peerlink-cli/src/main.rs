//! PeerLink CLI - device identity management
//!
//! Creates the device keypair and certificate on first run and exposes the
//! public key and decryption for pairing.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use peerlink_cli::{config, DecryptCommand, InitCommand, ShowCommand};
use peerlink_common::logging::{Component, Logger};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "peerlink")]
#[command(about = "PeerLink CLI - manage this device's pairing identity")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration directory (default: ~/.peerlink)
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or load the device identity
    #[command(name = "init")]
    Init {
        /// Discard the existing identity and create a new one
        #[arg(short, long)]
        force: bool,
    },
    /// Show the device identity
    #[command(name = "show")]
    Show {
        /// Print the public key PEM for peers
        #[arg(long)]
        pem: bool,
    },
    /// Decrypt a ciphertext block sent by a peer
    #[command(name = "decrypt")]
    Decrypt {
        /// File holding the ciphertext
        #[arg(short, long)]
        input: PathBuf,

        /// Write plaintext here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Input is base64 text rather than raw bytes
        #[arg(long)]
        base64: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let logger = Arc::new(Logger::new_root(Component::CLI, "main"));

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => config::default_config_dir()?,
    };
    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Some(Commands::Init { force }) => {
            std::fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {config_dir:?}"))?;
            InitCommand::new(config_dir, logger).run(force, &mut stdout)?;
        }
        Some(Commands::Show { pem }) => {
            ShowCommand::new(config_dir, logger).run(pem, &mut stdout)?;
        }
        Some(Commands::Decrypt {
            input,
            output,
            base64,
        }) => {
            DecryptCommand::new(config_dir, logger).run(
                &input,
                output.as_deref(),
                base64,
                &mut stdout,
            )?;
        }
        None => {
            if peerlink_keys::IdentityConfig::exists(&config_dir) {
                println!("Identity configured. Use 'peerlink show' to display it.");
                println!("Use 'peerlink init --force' to rotate it.");
            } else {
                println!("No identity found. Use 'peerlink init' to create one.");
            }
        }
    }

    Ok(())
}
