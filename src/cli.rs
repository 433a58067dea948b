// CLI definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "keyglowd")]
#[command(author, version, about = "Per-key keyboard lighting daemon")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path (default: ~/.config/keyglow/keyglow.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the render loop against a simulated device until Ctrl+C
    Run {
        /// Override the configured frame rate
        #[arg(long)]
        fps: Option<u32>,
    },

    /// Print the render buffer layout for the configured blocks
    Layout,

    /// Print the effective configuration as TOML
    #[command(visible_alias = "config")]
    ShowConfig,
}
