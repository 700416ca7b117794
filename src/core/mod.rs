pub mod classifier;
pub mod engine;
pub mod forest;
pub mod lines;
pub mod matcher;
pub mod normalize;
pub mod numeric;
pub mod peaks;
pub mod report;
pub mod templates;

pub use crate::domain::model::{AcquiredSpectrum, AnalysisResult, ReportPaths, Spectrum};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
