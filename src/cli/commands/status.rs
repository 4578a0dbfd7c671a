use anyhow::Result;
use clap::Args;

use crate::cli::output::{ConnectionInfo, StatusInfo, get_formatter};
use crate::models::{API_KEY_ENV, Config, ExtractionJob, OutputFormat};
use crate::services::{GeminiClient, ModelInfo, is_error_file};
use crate::sources::ImageSource;

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Verify the API key and model by calling the service
    #[arg(long)]
    pub check: bool,
}

pub async fn handle_status(args: StatusArgs, format: OutputFormat, _verbose: bool) -> Result<()> {
    let resolved = Config::load()?;
    let config = &resolved.config;
    let formatter = get_formatter(format);

    let extraction = &config.extraction;
    let source = ImageSource::from_config(extraction)?;
    let jobs = source.plan(&extraction.output_dir, &extraction.output_extension)?;
    let (outputs_written, previous_failures) = count_outputs(&jobs);

    let connection = if args.check {
        Some(check_connection(config).await)
    } else {
        None
    };

    let status = StatusInfo {
        model: config.gemini.model.clone(),
        endpoint: config.gemini.endpoint.clone(),
        api_key: config.gemini.masked_api_key(),
        input_dir: extraction.input_dir.clone(),
        input_exists: extraction.input_dir.is_dir(),
        pending_images: jobs.len() as u64,
        output_dir: extraction.output_dir.clone(),
        outputs_written,
        previous_failures,
        global_config: resolved.global_path.clone(),
        project_config: resolved.project_path.clone(),
        connection,
    };

    print!("{}", formatter.format_status(&status));

    if status.api_key.is_none() {
        eprintln!();
        eprintln!("Hint: set {API_KEY_ENV} in your environment or in a .env file.");
    }

    Ok(())
}

/// Count existing output files and how many of them record a failure.
fn count_outputs(jobs: &[ExtractionJob]) -> (u64, u64) {
    jobs.iter()
        .filter_map(|job| std::fs::read_to_string(&job.output).ok())
        .fold((0, 0), |(written, failed), content| {
            (written + 1, failed + u64::from(is_error_file(&content)))
        })
}

async fn check_connection(config: &Config) -> ConnectionInfo {
    let client = match GeminiClient::new(&config.gemini) {
        Ok(client) => client,
        Err(e) => {
            return ConnectionInfo {
                ok: false,
                detail: e.to_string(),
            };
        }
    };

    match client.check_model().await {
        Ok(info) => ConnectionInfo {
            ok: true,
            detail: describe_model(&info),
        },
        Err(e) => ConnectionInfo {
            ok: false,
            detail: e.to_string(),
        },
    }
}

/// Model name plus its token limits, when the service reports them.
fn describe_model(info: &ModelInfo) -> String {
    let name = info.display_name.as_deref().unwrap_or(&info.name);
    let limits: Vec<String> = [
        ("input", info.input_token_limit),
        ("output", info.output_token_limit),
    ]
    .into_iter()
    .filter_map(|(label, limit)| limit.map(|n| format!("{label} {n} tokens")))
    .collect();

    if limits.is_empty() {
        name.to_string()
    } else {
        format!("{name} ({})", limits.join(", "))
    }
}
