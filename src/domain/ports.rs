use crate::config::toml_config::Settings;
use crate::domain::model::{AcquiredSpectrum, AnalysisResult, ReportPaths, SourceSelection};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<std::path::PathBuf>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn settings(&self) -> &Settings;
    fn selection(&self) -> &SourceSelection;
    fn output_path(&self) -> &str;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<AcquiredSpectrum>;
    async fn transform(&self, acquired: AcquiredSpectrum) -> Result<AnalysisResult>;
    async fn load(&self, result: AnalysisResult) -> Result<ReportPaths>;
}
