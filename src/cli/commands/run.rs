//! Run command implementation.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::PathBuf;
use tracing::info;

use super::SelectionArgs;
use crate::cli::output::get_formatter;
use crate::error::Interrupted;
use crate::models::{Config, FileReport, FileStatus, OutputFormat};
use crate::services::{BatchProcessor, GeminiClient};
use crate::sources::ImageSource;
use crate::utils::file::get_relative_path;

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Model id, e.g. gemini-2.5-flash
    #[arg(long, short = 'm')]
    pub model: Option<String>,

    /// Read the instruction prompt from a file
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,

    /// Extension of the written text files
    #[arg(long)]
    pub output_extension: Option<String>,

    /// Show what would be processed without calling the model
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        self.selection.apply(&mut config.extraction);
        if let Some(ref model) = self.model {
            config.gemini.model = model.clone();
        }
        if let Some(ref path) = self.prompt_file {
            config.extraction.prompt_file = Some(path.clone());
        }
        if let Some(ref ext) = self.output_extension {
            config.extraction.output_extension = ext.clone();
        }
    }
}

/// Run the batch. `stop` ends the run early; the partial report is still printed.
pub async fn handle_run<S>(
    args: RunArgs,
    format: OutputFormat,
    verbose: bool,
    stop: S,
) -> Result<()>
where
    S: Future<Output = ()>,
{
    let mut config = Config::load()?.config;
    args.apply(&mut config);
    config.extraction.validate()?;

    let formatter = get_formatter(format);
    let extraction = &config.extraction;
    let source = ImageSource::from_config(extraction)?;

    if args.dry_run {
        let jobs = source.plan(&extraction.output_dir, &extraction.output_extension)?;
        print!("{}", formatter.format_plan(&jobs));
        return Ok(());
    }

    let (client, prompt) = prepare(&config, &source)?;

    info!(
        input = %extraction.input_dir.display(),
        output = %extraction.output_dir.display(),
        model = client.model(),
        "starting batch"
    );

    let jobs = source.plan(&extraction.output_dir, &extraction.output_extension)?;
    if jobs.is_empty() {
        println!(
            "{}",
            formatter.format_message(&format!(
                "No .{} images found in {}",
                extraction.extension.trim_start_matches('.'),
                extraction.input_dir.display()
            ))
        );
        return Ok(());
    }

    if verbose {
        eprintln!("Found {} images to process", jobs.len());
    }

    let pb = if format == OutputFormat::Text {
        ProgressBar::new(jobs.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )?
            .progress_chars("#>-"),
    );

    let input_root = source.root().to_path_buf();
    let processor = BatchProcessor::new(&client, prompt, extraction.max_file_size);
    let report = processor
        .run(
            &jobs,
            |file| {
                pb.println(progress_line(&input_root, file));
                pb.inc(1);
            },
            stop,
        )
        .await;
    pb.finish_and_clear();

    print!("{}", formatter.format_run_report(&report));

    if report.interrupted {
        return Err(Interrupted {
            processed: report.processed(),
            found: report.files_found,
        }
        .into());
    }
    Ok(())
}

/// Build the client and prompt, then create the input and output directories.
/// Nothing is created when the key or the prompt is unusable.
fn prepare(config: &Config, source: &ImageSource) -> Result<(GeminiClient, String)> {
    let extraction = &config.extraction;
    let client = GeminiClient::new(&config.gemini)?;
    let prompt = extraction
        .resolve_prompt()
        .context("failed to load prompt")?;

    source.ensure_root()?;
    std::fs::create_dir_all(&extraction.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            extraction.output_dir.display()
        )
    })?;

    Ok((client, prompt))
}

fn progress_line(input_root: &std::path::Path, file: &FileReport) -> String {
    let name = get_relative_path(input_root, &file.input)
        .unwrap_or_else(|| file.input.display().to_string());
    match file.status {
        FileStatus::Success => format!(
            "{} {} -> {}",
            style("✓").green(),
            name,
            file.output.display()
        ),
        FileStatus::Failed => format!(
            "{} {}: {}",
            style("✗").red(),
            name,
            file.error.as_deref().unwrap_or("unknown error")
        ),
    }
}
