pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use app::pipelines::StellarPipeline;
pub use app::prompt::{resolve_input_file, Prompt};
pub use config::{cli::LocalStorage, CliConfig, RunConfig, SourceMode};
pub use core::engine::{ClassificationEngine, RunSummary};
pub use utils::error::{ClassifierError, Result};
