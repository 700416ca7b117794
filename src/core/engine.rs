use crate::core::Pipeline;
use crate::domain::model::{ClassificationResult, ReportPaths, SpectrumOrigin};
use crate::utils::error::Result;

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub classification: ClassificationResult,
    pub origin: SpectrumOrigin,
    pub paths: ReportPaths,
}

pub struct ClassificationEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ClassificationEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        tracing::info!("🚀 Starting classification run");

        // Extract
        let acquired = self.pipeline.extract().await?;
        if acquired.origin.is_fallback() {
            tracing::warn!("⚠️ Using fallback spectrum: {}", acquired.origin);
        } else {
            tracing::info!(
                "Extracted {} samples from {}",
                acquired.spectrum.len(),
                acquired.origin
            );
        }

        // Transform
        let result = self.pipeline.transform(acquired).await?;
        tracing::info!(
            "Transformed: type {} ({:.1}%), {} lines detected, {} identified",
            result.classification.spectral_type,
            result.classification.certainty,
            result.detected_lines.len(),
            result.identified_lines.len()
        );

        let classification = result.classification.clone();
        let origin = result.origin.clone();

        // Load
        let paths = self.pipeline.load(result).await?;
        tracing::info!("✅ Results saved to {}", paths.report.display());

        Ok(RunSummary {
            classification,
            origin,
            paths,
        })
    }
}
