//! Local directory image source.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::SourceError;
use crate::models::{ExtractionConfig, ExtractionJob};
use crate::utils::file::{has_extension, output_path_for};

/// Images with a given extension inside a local directory.
#[derive(Debug)]
pub struct ImageSource {
    /// Directory to scan
    root: PathBuf,

    /// Extension to match, without the leading dot
    extension: String,

    /// Descend into subdirectories
    recursive: bool,

    /// Patterns to exclude
    exclude_patterns: Vec<glob::Pattern>,
}

impl ImageSource {
    pub fn new(
        root: PathBuf,
        extension: impl Into<String>,
        recursive: bool,
        exclude_patterns: &[String],
    ) -> Result<Self, SourceError> {
        let exclude_patterns = exclude_patterns
            .iter()
            .map(|p| glob::Pattern::new(p).map_err(|_| SourceError::InvalidPattern(p.clone())))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            root,
            extension: extension.into().trim_start_matches('.').to_string(),
            recursive,
            exclude_patterns,
        })
    }

    pub fn from_config(config: &ExtractionConfig) -> Result<Self, SourceError> {
        Self::new(
            config.input_dir.clone(),
            config.extension.clone(),
            config.recursive,
            &config.exclude_patterns,
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if it does not exist yet.
    pub fn ensure_root(&self) -> Result<(), SourceError> {
        std::fs::create_dir_all(&self.root).map_err(|source| SourceError::CreateDirError {
            path: self.root.display().to_string(),
            source,
        })
    }

    /// Collect matching image files, sorted by path.
    pub fn collect_images(&self) -> Result<Vec<PathBuf>, SourceError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.root)
            .max_depth(max_depth)
            .follow_links(false)
        {
            let entry = entry.map_err(|e| SourceError::WalkError(e.to_string()))?;
            let path = entry.path();

            if !entry.file_type().is_file() || !has_extension(path, &self.extension) {
                continue;
            }

            if self.is_excluded(path) {
                continue;
            }

            files.push(path.to_path_buf());
        }

        files.sort();
        Ok(files)
    }

    /// Pair every image with the output file it will be written to.
    pub fn plan(
        &self,
        output_root: &Path,
        output_extension: &str,
    ) -> Result<Vec<ExtractionJob>, SourceError> {
        Ok(self
            .collect_images()?
            .into_iter()
            .map(|input| {
                let output = output_path_for(&self.root, output_root, &input, output_extension);
                ExtractionJob { input, output }
            })
            .collect())
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        self.exclude_patterns
            .iter()
            .any(|p| p.matches(&path_str) || p.matches(&name))
    }
}
