mod extractor;
mod gemini;
mod processor;

pub use extractor::ContentExtractor;
pub use gemini::{GeminiClient, GenerateResponse, ModelInfo};
pub use processor::{BatchProcessor, ERROR_FILE_HEADER, is_error_file};
