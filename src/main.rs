use anyhow::Result;
use clap::Parser;
use tokio::signal;

use imgscribe::cli::commands::{handle_config, handle_list, handle_run, handle_status};
use imgscribe::cli::output::get_formatter;
use imgscribe::cli::{Cli, Commands};
use imgscribe::error::Interrupted;
use imgscribe::logging::init_logging;
use imgscribe::models::{Config, OutputFormat};

#[tokio::main]
async fn main() {
    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let resolved = Config::load().unwrap_or_default();
    let format = cli.format.unwrap_or(resolved.config.output.default_format);
    let verbose = cli.verbose;

    // `run` watches the signal itself so it can stop between images and
    // still print its report.
    let result = if matches!(cli.command, Commands::Run(_)) {
        run_command(cli.command, format, verbose).await
    } else {
        tokio::select! {
            result = run_command(cli.command, format, verbose) => result,
            _ = shutdown_signal() => {
                eprintln!("\nReceived shutdown signal, aborting.");
                std::process::exit(130);
            }
        }
    };

    if let Err(e) = result {
        if let Some(interrupted) = e.downcast_ref::<Interrupted>() {
            eprintln!("\nReceived shutdown signal, {interrupted}.");
            std::process::exit(130);
        }
        eprint!("{}", get_formatter(format).format_error(&format!("{e:#}")));
        std::process::exit(1);
    }
}

async fn run_command(command: Commands, format: OutputFormat, verbose: bool) -> Result<()> {
    match command {
        Commands::Run(args) => handle_run(args, format, verbose, shutdown_signal()).await,
        Commands::List(args) => handle_list(args, format, verbose).await,
        Commands::Status(args) => handle_status(args, format, verbose).await,
        Commands::Config(cmd) => handle_config(cmd, format, verbose).await,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
