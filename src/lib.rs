pub mod cli;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod sources;
pub mod utils;

pub use cli::{Cli, Commands};
pub use models::{Config, OutputFormat};
