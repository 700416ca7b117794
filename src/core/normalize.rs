use crate::config::toml_config::NormalizationConfig;
use crate::core::numeric::{savgol_filter, Polynomial};
use crate::domain::model::Spectrum;
use crate::utils::error::{ClassifierError, Result};

/// 連續譜正規化 + Savitzky–Golay 平滑
#[derive(Debug, Clone)]
pub struct Normalizer {
    continuum_degree: usize,
    window: usize,
    order: usize,
}

impl Normalizer {
    pub fn new(continuum_degree: usize, window: usize, order: usize) -> Self {
        Self {
            continuum_degree,
            window,
            order,
        }
    }

    pub fn from_config(config: &NormalizationConfig) -> Self {
        Self::new(
            config.continuum_degree,
            config.smoothing_window,
            config.smoothing_order,
        )
    }

    pub fn normalize(&self, spectrum: &Spectrum) -> Result<Vec<f64>> {
        if spectrum.len() <= self.window {
            return Err(ClassifierError::processing(format!(
                "spectrum has {} samples, normalization needs more than {}",
                spectrum.len(),
                self.window
            )));
        }

        let continuum = Polynomial::fit(spectrum.wavelength(), spectrum.flux(), self.continuum_degree)?;
        let normalized: Vec<f64> = spectrum
            .wavelength()
            .iter()
            .zip(spectrum.flux())
            .map(|(&w, &f)| f / continuum.eval(w))
            .collect();

        if let Some(i) = normalized.iter().position(|v| !v.is_finite()) {
            return Err(ClassifierError::processing(format!(
                "continuum fit crosses zero near {:.1} Å",
                spectrum.wavelength()[i]
            )));
        }

        tracing::debug!(
            "Continuum fitted with degree {}, smoothing window {} / order {}",
            self.continuum_degree,
            self.window,
            self.order
        );
        savgol_filter(&normalized, self.window, self.order)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::from_config(&NormalizationConfig::default())
    }
}
