//! Input sources for batch extraction.

mod local;

pub use local::ImageSource;
