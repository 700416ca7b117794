use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::utils::error::{ClassifierError, Result};

/// 一條光譜：波長 (Å，嚴格遞增) 與流量，長度相同
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    wavelength: Vec<f64>,
    flux: Vec<f64>,
}

impl Spectrum {
    pub fn new(wavelength: Vec<f64>, flux: Vec<f64>) -> Result<Self> {
        if wavelength.len() != flux.len() {
            return Err(ClassifierError::validation(format!(
                "wavelength has {} samples but flux has {}",
                wavelength.len(),
                flux.len()
            )));
        }
        if wavelength.len() < 2 {
            return Err(ClassifierError::validation(format!(
                "spectrum needs at least 2 samples, got {}",
                wavelength.len()
            )));
        }
        if let Some(i) = wavelength.iter().chain(&flux).position(|v| !v.is_finite()) {
            return Err(ClassifierError::validation(format!(
                "non-finite value at position {}",
                i % wavelength.len()
            )));
        }
        if let Some(i) = wavelength.windows(2).position(|w| w[1] <= w[0]) {
            return Err(ClassifierError::validation(format!(
                "wavelength is not strictly increasing at index {}",
                i + 1
            )));
        }
        Ok(Self { wavelength, flux })
    }

    /// 由內部產生、已知合法的資料 (例如合成模板)
    pub(crate) fn from_trusted(wavelength: Vec<f64>, flux: Vec<f64>) -> Self {
        debug_assert_eq!(wavelength.len(), flux.len());
        Self { wavelength, flux }
    }

    pub fn wavelength(&self) -> &[f64] {
        &self.wavelength
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectedLine {
    pub wavelength: f64,
    pub equivalent_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifiedLine {
    pub wavelength: f64,
    pub equivalent_width: f64,
    pub element: String,
}

/// 原子譜線表的一筆資料，順序即比對優先序
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomicLine {
    pub wavelength: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StellarModel {
    pub spectral_type: String,
    pub teff: f64,
    pub log_g: f64,
    pub metallicity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub spectral_type: String,
    /// 最大類別機率 × 100
    pub certainty: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub plate: u32,
    pub fiber: u32,
    pub mjd: u32,
}

impl fmt::Display for CatalogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plate={} fiber={} mjd={}", self.plate, self.fiber, self.mjd)
    }
}

/// 使用者選擇的光譜來源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelection {
    Remote,
    Local(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    DownloadFailed(String),
    FileUnreadable(String),
    InvalidFormat(String),
    InvalidSpectrum(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::DownloadFailed(msg) => write!(f, "download failed: {}", msg),
            FallbackReason::FileUnreadable(msg) => write!(f, "file unreadable: {}", msg),
            FallbackReason::InvalidFormat(msg) => write!(f, "invalid FITS layout: {}", msg),
            FallbackReason::InvalidSpectrum(msg) => write!(f, "invalid spectrum: {}", msg),
        }
    }
}

impl From<ClassifierError> for FallbackReason {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::ApiError(_) | ClassifierError::HttpStatusError { .. } => {
                FallbackReason::DownloadFailed(err.to_string())
            }
            ClassifierError::IoError(_) => FallbackReason::FileUnreadable(err.to_string()),
            ClassifierError::FitsError { .. } => FallbackReason::InvalidFormat(err.to_string()),
            other => FallbackReason::InvalidSpectrum(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpectrumOrigin {
    Remote { record: CatalogRecord, url: String },
    LocalFile { path: PathBuf },
    SyntheticFallback { teff: f64, reason: FallbackReason },
}

impl SpectrumOrigin {
    pub fn is_fallback(&self) -> bool {
        matches!(self, SpectrumOrigin::SyntheticFallback { .. })
    }
}

impl fmt::Display for SpectrumOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpectrumOrigin::Remote { record, .. } => write!(f, "SDSS archive ({})", record),
            SpectrumOrigin::LocalFile { path } => write!(f, "local file {}", path.display()),
            SpectrumOrigin::SyntheticFallback { teff, reason } => {
                write!(f, "synthetic template {:.0} K ({})", teff, reason)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AcquiredSpectrum {
    pub spectrum: Spectrum,
    pub origin: SpectrumOrigin,
}

#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub origin: SpectrumOrigin,
    pub spectrum: Spectrum,
    pub normalized_flux: Vec<f64>,
    pub detected_lines: Vec<DetectedLine>,
    pub identified_lines: Vec<IdentifiedLine>,
    pub unidentified: Vec<f64>,
    pub classification: ClassificationResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub plot: PathBuf,
    pub report: PathBuf,
    pub lines: PathBuf,
    pub summary: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spectrum_rejects_mismatched_lengths() {
        assert!(Spectrum::new(vec![1.0, 2.0, 3.0], vec![1.0, 1.0]).is_err());
    }

    #[test]
    fn test_spectrum_rejects_non_monotonic_wavelength() {
        let err = Spectrum::new(vec![4000.0, 4001.0, 4001.0], vec![1.0; 3]).unwrap_err();
        assert!(err.to_string().contains("index 2"));
    }

    #[test]
    fn test_spectrum_rejects_nan_flux() {
        assert!(Spectrum::new(vec![4000.0, 4001.0], vec![1.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_fallback_reason_from_error() {
        let reason: FallbackReason = ClassifierError::fits("no END card").into();
        assert!(matches!(reason, FallbackReason::InvalidFormat(_)));

        let reason: FallbackReason = ClassifierError::HttpStatusError {
            status: 500,
            url: "http://localhost".to_string(),
        }
        .into();
        assert!(matches!(reason, FallbackReason::DownloadFailed(_)));
    }
}
