use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::PathBuf;
use std::process::Command;

use crate::cli::output::{Formatter, get_formatter};
use crate::models::{Config, OutputFormat, ResolvedConfig};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Initialize configuration file")]
    Init {
        #[arg(
            long,
            short = 'g',
            help = "Create global config instead of project config"
        )]
        global: bool,
        #[arg(long, help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show current configuration")]
    Show,
    #[command(about = "Show configuration file paths")]
    Path {
        #[arg(long, help = "Show all possible config paths")]
        all: bool,
    },
    #[command(about = "Edit configuration file")]
    Edit {
        #[arg(
            long,
            short = 'g',
            help = "Edit global config instead of project config"
        )]
        global: bool,
    },
}

pub async fn handle_config(cmd: ConfigCommand, format: OutputFormat, _verbose: bool) -> Result<()> {
    let formatter = get_formatter(format);

    match cmd {
        ConfigCommand::Init { global, force } => handle_init(global, force, formatter.as_ref()),
        ConfigCommand::Show => handle_show(format),
        ConfigCommand::Path { all } => handle_path(all),
        ConfigCommand::Edit { global } => handle_edit(global, formatter.as_ref()),
    }
}

fn handle_init(global: bool, force: bool, formatter: &dyn Formatter) -> Result<()> {
    let (config_path, label) = if global {
        let path = Config::global_path()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;
        (path, "global")
    } else {
        let dir = Config::project_config_dir()
            .ok_or_else(|| anyhow::anyhow!("could not determine project directory"))?;
        (dir.join("config.toml"), "project")
    };

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} config already exists at: {}\nUse --force to overwrite.",
            label,
            config_path.display()
        );
    }

    let path = if global {
        Config::init_global()
    } else {
        Config::init_project()
    }
    .with_context(|| format!("failed to create {label} config"))?;

    println!(
        "{}",
        formatter.format_message(&format!("Created {label} config at: {}", path.display()))
    );
    Ok(())
}

fn handle_show(format: OutputFormat) -> Result<()> {
    let resolved = Config::load()?;
    let mut config = resolved.config.clone();
    if config.gemini.api_key.is_some() {
        config.gemini.api_key = config.gemini.masked_api_key();
    }

    if format == OutputFormat::Json {
        let output = serde_json::json!({
            "config": config,
            "project_path": resolved.project_path,
            "global_path": resolved.global_path,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print_sources(&resolved);
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn print_sources(resolved: &ResolvedConfig) {
    if let Some(ref path) = resolved.project_path {
        println!("# Project config: {}", path.display());
    }
    if let Some(ref path) = resolved.global_path {
        println!("# Global config: {}", path.display());
    }
    if resolved.project_path.is_none() && resolved.global_path.is_none() {
        println!("# No config files found, using defaults");
    }
    println!();
}

fn handle_path(show_all: bool) -> Result<()> {
    let cwd = std::env::current_dir().ok();
    let candidates = [
        ("Project config", edit_target(false).ok()),
        ("Global config", edit_target(true).ok()),
        (".env file", cwd.map(|d| d.join(".env"))),
    ];

    println!("Configuration paths:");
    println!();
    for (label, path) in candidates {
        let Some(path) = path else { continue };
        if path.exists() {
            println!("{label} (active): {}", path.display());
        } else if show_all {
            println!("{label} (would be): {}", path.display());
        }
    }

    Ok(())
}

/// Config file `edit` works on: the global file, or the nearest project file.
fn edit_target(global: bool) -> Result<PathBuf> {
    let path = if global {
        Config::global_path()
    } else {
        Config::find_project_config()
            .or_else(|| Config::project_config_dir().map(|d| d.join("config.toml")))
    };
    path.ok_or_else(|| anyhow::anyhow!("could not determine config path"))
}

fn handle_edit(global: bool, formatter: &dyn Formatter) -> Result<()> {
    let config_path = edit_target(global)?;

    if !config_path.exists() {
        Config::default()
            .write_to(&config_path)
            .context("failed to create config")?;
        println!(
            "{}",
            formatter.format_message(&format!("Created config at: {}", config_path.display()))
        );
    }

    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| "vi".to_string());

    let status = Command::new(&editor)
        .arg(&config_path)
        .status()
        .with_context(|| format!("failed to open editor: {editor}"))?;
    if !status.success() {
        anyhow::bail!("editor exited with {status}");
    }

    Ok(())
}
