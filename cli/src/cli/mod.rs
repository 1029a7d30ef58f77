pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "devrelay")]
#[command(author, version, about = "Local dev server with prefix-rewriting reverse proxy")]
pub struct Cli {
    /// Path to config file (checked in order: local devrelay.toml, ~/.config/devrelay/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the dev server
    Start {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate the configuration and print the compiled rules
    Check,

    /// Write a starter devrelay.toml to the current directory
    Init,
}
