mod config;
mod format;
mod report;

pub use config::{
    API_KEY_ENV, Config, DEFAULT_GEMINI_ENDPOINT, DEFAULT_INPUT_DIR, DEFAULT_MODEL,
    DEFAULT_OUTPUT_DIR, DEFAULT_PROMPT, ExtractionConfig, GeminiConfig, OutputConfig,
    ResolvedConfig,
};
pub use format::OutputFormat;
pub use report::{ExtractionJob, FileReport, FileStatus, RunReport};
