use crate::adapters::fits::{read_local_spectrum, read_table_spectrum, FitsFile};
use crate::adapters::plot::render_spectrum_png;
use crate::adapters::sdss::{choose_record, ArchiveClient};
use crate::core::classifier::SpectralClassifier;
use crate::core::lines::LineDetector;
use crate::core::matcher::LineMatcher;
use crate::core::normalize::Normalizer;
use crate::core::report;
use crate::core::templates::synthetic_spectrum;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{
    AcquiredSpectrum, AnalysisResult, FallbackReason, ReportPaths, SourceSelection, SpectrumOrigin,
};
use crate::utils::error::{ClassifierError, Result};
use chrono::Utc;
use std::path::Path;

/// 取得光譜 → 正規化 → 偵測 → 比對 → 分類 → 輸出
pub struct StellarPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    pub(crate) archive: ArchiveClient,
}

impl<S: Storage, C: ConfigProvider> StellarPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Result<Self> {
        let settings = config.settings();
        let archive = ArchiveClient::new(&settings.source, settings.cache_dir())?;
        Ok(Self {
            storage,
            config,
            archive,
        })
    }

    async fn acquire_remote(&self) -> Result<AcquiredSpectrum> {
        let records = &self.config.settings().source.records;
        let record = choose_record(records, &mut rand::thread_rng()).ok_or_else(|| {
            ClassifierError::MissingConfigError {
                field: "source.records".to_string(),
            }
        })?;
        let url = self.archive.spectrum_url(&record)?;
        tracing::info!("🚀 Fetching SDSS spectrum {}", record);

        let bytes = self.archive.fetch(&url).await?;
        let fits = FitsFile::parse(bytes)?;
        let spectrum = read_table_spectrum(&fits)?;

        Ok(AcquiredSpectrum {
            spectrum,
            origin: SpectrumOrigin::Remote {
                record,
                url: url.to_string(),
            },
        })
    }

    async fn acquire_local(&self, path: &Path) -> Result<AcquiredSpectrum> {
        tracing::info!("📁 Reading local spectrum: {}", path.display());
        let bytes = tokio::fs::read(path).await?;
        let fits = FitsFile::parse(bytes)?;
        let spectrum = read_local_spectrum(&fits)?;

        Ok(AcquiredSpectrum {
            spectrum,
            origin: SpectrumOrigin::LocalFile {
                path: path.to_path_buf(),
            },
        })
    }

    fn fallback(&self, reason: FallbackReason) -> AcquiredSpectrum {
        let teff = self.config.settings().source.fallback_teff;
        AcquiredSpectrum {
            spectrum: synthetic_spectrum(teff),
            origin: SpectrumOrigin::SyntheticFallback { teff, reason },
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for StellarPipeline<S, C> {
    /// 讀取失敗時改用合成光譜，不回傳錯誤
    async fn extract(&self) -> Result<AcquiredSpectrum> {
        let outcome = match self.config.selection() {
            SourceSelection::Remote => self.acquire_remote().await,
            SourceSelection::Local(path) => self.acquire_local(path).await,
        };

        match outcome {
            Ok(acquired) => Ok(acquired),
            Err(e) => {
                let reason = FallbackReason::from(e);
                tracing::warn!("⚠️ Spectrum acquisition failed ({}), generating a synthetic spectrum", reason);
                Ok(self.fallback(reason))
            }
        }
    }

    async fn transform(&self, acquired: AcquiredSpectrum) -> Result<AnalysisResult> {
        let settings = self.config.settings();
        let spectrum = acquired.spectrum;

        let normalized_flux = Normalizer::from_config(&settings.normalization).normalize(&spectrum)?;
        tracing::debug!("Normalized {} samples", normalized_flux.len());

        let detected_lines =
            LineDetector::from_config(&settings.detection).detect(spectrum.wavelength(), &normalized_flux);
        tracing::debug!("Detected {} absorption lines", detected_lines.len());

        let outcome = LineMatcher::new(&settings.atomic_database, settings.detection.match_tolerance)
            .match_lines(&detected_lines);

        let classifier = SpectralClassifier::train(&settings.stellar_models, &settings.classifier)?;
        let classification = classifier.classify(spectrum.wavelength(), &normalized_flux)?;

        Ok(AnalysisResult {
            origin: acquired.origin,
            spectrum,
            normalized_flux,
            detected_lines,
            identified_lines: outcome.identified,
            unidentified: outcome.unidentified,
            classification,
        })
    }

    async fn load(&self, result: AnalysisResult) -> Result<ReportPaths> {
        let output = &self.config.settings().output;
        let generated_at = Utc::now();

        println!("{}", report::render_console(&result));

        let png = render_spectrum_png(
            result.spectrum.wavelength(),
            &result.normalized_flux,
            &result.classification.spectral_type,
        )?;
        tracing::debug!("Writing plot ({} bytes) to storage", png.len());
        let plot = self.storage.write_file(&output.plot_file, &png).await?;

        let text = report::render_text_report(&result, generated_at);
        let report = self.storage.write_file(&output.report_file, text.as_bytes()).await?;

        let csv = report::render_lines_csv(&result)?;
        let lines = self.storage.write_file(&output.lines_file, &csv).await?;

        let json = report::render_summary_json(&result, generated_at)?;
        let summary = self.storage.write_file(&output.summary_file, json.as_bytes()).await?;

        tracing::debug!("All result files saved");
        Ok(ReportPaths {
            plot,
            report,
            lines,
            summary,
        })
    }
}
