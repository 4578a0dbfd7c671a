//! Utility modules.

pub mod file;

pub use file::{
    detect_mime_type, get_relative_path, has_extension, output_path_for, read_image, write_text,
};
