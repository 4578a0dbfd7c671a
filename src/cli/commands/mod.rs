mod config;
mod list;
mod run;
mod status;

use clap::Args;
use std::path::PathBuf;

use crate::models::ExtractionConfig;

pub use config::ConfigCommand;
pub use list::ListArgs;
pub use run::RunArgs;
pub use status::StatusArgs;

pub use config::handle_config;
pub use list::handle_list;
pub use run::handle_run;
pub use status::handle_status;

/// Input selection flags shared by `run` and `list`.
#[derive(Debug, Clone, Default, Args)]
pub struct SelectionArgs {
    /// Directory containing the images
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,

    /// Directory receiving the text files
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Image extension to match (case-insensitive)
    #[arg(long)]
    pub extension: Option<String>,

    /// Also process images in subdirectories
    #[arg(long, short = 'r')]
    pub recursive: bool,

    /// File patterns to exclude (can be specified multiple times)
    #[arg(long, short = 'e')]
    pub exclude: Vec<String>,
}

impl SelectionArgs {
    pub fn apply(&self, config: &mut ExtractionConfig) {
        if let Some(ref input) = self.input {
            config.input_dir = input.clone();
        }
        if let Some(ref output) = self.output {
            config.output_dir = output.clone();
        }
        if let Some(ref extension) = self.extension {
            config.extension = extension.clone();
        }
        if self.recursive {
            config.recursive = true;
        }
        config.exclude_patterns.extend(self.exclude.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_overrides() {
        let mut config = ExtractionConfig {
            exclude_patterns: vec!["cover*".to_string()],
            ..Default::default()
        };
        let args = SelectionArgs {
            input: Some(PathBuf::from("pages")),
            extension: Some("PNG".to_string()),
            exclude: vec!["draft*".to_string()],
            ..Default::default()
        };
        args.apply(&mut config);

        assert_eq!(config.input_dir, PathBuf::from("pages"));
        assert_eq!(config.output_dir, PathBuf::from(crate::models::DEFAULT_OUTPUT_DIR));
        assert_eq!(config.extension, "PNG");
        assert!(!config.recursive);
        assert_eq!(config.exclude_patterns, vec!["cover*", "draft*"]);
    }
}
