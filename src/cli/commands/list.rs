use anyhow::Result;
use clap::Args;

use super::SelectionArgs;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::sources::ImageSource;

#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}

pub async fn handle_list(args: ListArgs, format: OutputFormat, _verbose: bool) -> Result<()> {
    let mut config = Config::load()?.config;
    args.selection.apply(&mut config.extraction);

    let extraction = &config.extraction;
    let source = ImageSource::from_config(extraction)?;
    let jobs = source.plan(&extraction.output_dir, &extraction.output_extension)?;

    print!("{}", get_formatter(format).format_plan(&jobs));
    Ok(())
}
