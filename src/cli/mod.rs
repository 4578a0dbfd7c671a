//! CLI module for imgscribe.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Extract text from images with a multimodal Gemini model.
#[derive(Debug, Parser)]
#[command(name = "imgscribe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Send every image to the model and write the extracted text
    Run(commands::RunArgs),

    /// List the images that would be processed
    List(commands::ListArgs),

    /// Show configuration, API key and input directory state
    Status(commands::StatusArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}
