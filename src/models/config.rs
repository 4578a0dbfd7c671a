use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::format::OutputFormat;
use crate::error::ConfigError;

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_INPUT_DIR: &str = "images";
pub const DEFAULT_OUTPUT_DIR: &str = "extracted";

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const APP_DIR: &str = "imgscribe";
const PROJECT_DIR: &str = ".imgscribe";
const CONFIG_FILE: &str = "config.toml";

/// Instruction sent alongside every image unless overridden.
pub const DEFAULT_PROMPT: &str = "\
You are a system that analyzes exam questions.
Your task is to extract the complete content of a question image, following these rules:
1. **Text Extraction:** Transcribe all text in the image (statement, options, notes) faithfully and in its original language.
2. **Figure Description:** If the question contains figures, charts, flowcharts, diagrams or code, insert the figure description *immediately* before or after its mention in the text, using the syntax **[FIGURE: Complete and Interpretive Description]**. The description must be as complete and technical as possible.
3. **Output Format:** Do not add introductions or closing remarks. Only provide the formatted question text, including the figure descriptions where necessary.
";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Configuration together with the files it was read from.
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    pub config: Config,
    pub global_path: Option<PathBuf>,
    pub project_path: Option<PathBuf>,
}

impl Config {
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn project_config_dir() -> Option<PathBuf> {
        std::env::current_dir().ok().map(|p| p.join(PROJECT_DIR))
    }

    /// Project config of the working directory, if it exists.
    pub fn find_project_config() -> Option<PathBuf> {
        Self::project_config_in(&std::env::current_dir().ok()?)
    }

    /// `<dir>/.imgscribe/config.toml` when that file exists. Parent
    /// directories are not searched.
    pub fn project_config_in(dir: &Path) -> Option<PathBuf> {
        Some(dir.join(PROJECT_DIR).join(CONFIG_FILE)).filter(|path| path.is_file())
    }

    pub fn load() -> Result<ResolvedConfig, ConfigError> {
        let global_path = Self::global_path().filter(|p| p.is_file());
        let project_path = Self::find_project_config();

        let mut config =
            Self::from_layers(&[global_path.as_deref(), project_path.as_deref()])?;
        config.apply_env(|key| std::env::var(key).ok());

        Ok(ResolvedConfig {
            config,
            global_path,
            project_path,
        })
    }

    /// Deep-merge the given TOML files in order; later files win.
    pub fn from_layers(paths: &[Option<&Path>]) -> Result<Self, ConfigError> {
        let mut merged = toml::Table::new();
        for path in paths.iter().flatten() {
            let content = std::fs::read_to_string(path)?;
            let layer: toml::Table = toml::from_str(&content)?;
            merge_tables(&mut merged, layer);
        }

        let content = toml::to_string(&merged)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (usually `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(API_KEY_ENV) {
            self.gemini.api_key = Some(key);
        }
        if let Some(model) = non_empty("IMGSCRIBE_MODEL") {
            self.gemini.model = model;
        }
        if let Some(endpoint) = non_empty("IMGSCRIBE_ENDPOINT") {
            self.gemini.endpoint = endpoint;
        }
        if let Some(dir) = non_empty("IMGSCRIBE_INPUT_DIR") {
            self.extraction.input_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty("IMGSCRIBE_OUTPUT_DIR") {
            self.extraction.output_dir = PathBuf::from(dir);
        }
    }

    pub fn init_global() -> Result<PathBuf, ConfigError> {
        let path = Self::global_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })?;
        Self::default().write_to(&path)?;
        Ok(path)
    }

    pub fn init_project() -> Result<PathBuf, ConfigError> {
        let dir = Self::project_config_dir().ok_or_else(|| {
            ConfigError::PathError("could not determine project directory".to_string())
        })?;
        let path = dir.join(CONFIG_FILE);
        Self::default().write_to(&path)?;
        Ok(path)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let body = toml::to_string_pretty(self)?;
        let content = format!(
            "# imgscribe configuration\n\
             # The API key is read from the {API_KEY_ENV} environment variable.\n\n{body}"
        );
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

fn default_endpoint() -> String {
    DEFAULT_GEMINI_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout() -> u64 {
    120
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout(),
            temperature: None,
        }
    }
}

impl GeminiConfig {
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// API key with everything but the last four characters hidden.
    pub fn masked_api_key(&self) -> Option<String> {
        let key = self.api_key.as_deref()?.trim();
        if key.is_empty() {
            return None;
        }
        let chars: Vec<char> = key.chars().collect();
        if chars.len() < 8 {
            return Some("********".to_string());
        }
        let visible = chars.len().saturating_sub(4);
        let tail: String = chars[visible..].iter().collect();
        Some(format!("********{tail}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_extension")]
    pub extension: String,

    #[serde(default = "default_output_extension")]
    pub output_extension: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_file: Option<PathBuf>,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    #[serde(default)]
    pub recursive: bool,

    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

fn default_input_dir() -> PathBuf {
    PathBuf::from(DEFAULT_INPUT_DIR)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_extension() -> String {
    "png".to_string()
}

fn default_output_extension() -> String {
    "txt".to_string()
}

// Inline request payloads are capped at 20 MiB by the service.
fn default_max_file_size() -> u64 {
    20 * 1024 * 1024
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            extension: default_extension(),
            output_extension: default_output_extension(),
            prompt: None,
            prompt_file: None,
            max_file_size: default_max_file_size(),
            recursive: false,
            exclude_patterns: Vec::new(),
        }
    }
}

impl ExtractionConfig {
    /// Prompt file contents, then the inline prompt, then [`DEFAULT_PROMPT`].
    pub fn resolve_prompt(&self) -> Result<String, ConfigError> {
        if let Some(ref path) = self.prompt_file {
            let prompt = std::fs::read_to_string(path)?;
            if prompt.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "prompt file is empty: {}",
                    path.display()
                )));
            }
            return Ok(prompt);
        }

        Ok(self
            .prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_PROMPT)
            .to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ext = self.extension.trim_start_matches('.');
        let out_ext = self.output_extension.trim_start_matches('.');
        if ext.is_empty() || out_ext.is_empty() {
            return Err(ConfigError::ValidationError(
                "extensions must not be empty".to_string(),
            ));
        }
        if ext.eq_ignore_ascii_case(out_ext) && self.input_dir == self.output_dir {
            return Err(ConfigError::ValidationError(
                "output would overwrite the input images".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub default_format: OutputFormat,
}
