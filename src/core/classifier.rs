use crate::config::toml_config::ClassifierConfig;
use crate::core::forest::{ForestParams, RandomForest};
use crate::core::numeric::{interp_linear, linspace};
use crate::core::templates;
use crate::domain::model::{ClassificationResult, StellarModel};
use crate::utils::error::Result;

/// Random forest trained on one synthetic template per spectral type, all
/// resampled onto a common wavelength grid.
#[derive(Debug, Clone)]
pub struct SpectralClassifier {
    forest: RandomForest,
    grid: Vec<f64>,
}

impl SpectralClassifier {
    pub fn train(models: &[StellarModel], config: &ClassifierConfig) -> Result<Self> {
        let grid = linspace(config.grid_start, config.grid_end, config.grid_points);

        let mut samples = Vec::with_capacity(models.len());
        let mut labels = Vec::with_capacity(models.len());
        for model in models {
            let template = templates::synthesize(model);
            samples.push(interp_linear(template.wavelength(), template.flux(), &grid));
            labels.push(model.spectral_type.clone());
            tracing::debug!(
                "Template {} built from Teff={} logg={} [M/H]={}",
                model.spectral_type,
                model.teff,
                model.log_g,
                model.metallicity
            );
        }

        let params = ForestParams {
            n_estimators: config.n_estimators,
            max_features: None,
            seed: config.seed,
        };
        let forest = RandomForest::fit(&samples, &labels, &params)?;
        tracing::info!(
            "Trained {} trees on {} reference templates",
            forest.n_trees(),
            models.len()
        );

        Ok(Self { forest, grid })
    }

    pub fn classes(&self) -> &[String] {
        self.forest.classes()
    }

    pub fn classify(&self, wavelength: &[f64], flux: &[f64]) -> Result<ClassificationResult> {
        let features = interp_linear(wavelength, flux, &self.grid);
        let missing = features.iter().filter(|v| v.is_nan()).count();
        if missing == features.len() {
            tracing::warn!(
                "Spectrum does not overlap the {:.0}-{:.0} Å classification grid",
                self.grid[0],
                self.grid[self.grid.len() - 1]
            );
        } else if missing > 0 {
            tracing::debug!("{} grid points fall outside the spectrum", missing);
        }

        let (spectral_type, probability) = self.forest.predict(&features)?;
        Ok(ClassificationResult {
            spectral_type,
            certainty: probability * 100.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::Settings;
    use crate::core::templates::synthetic_spectrum;

    #[test]
    fn test_g_template_is_classified_as_g() {
        let settings = Settings::default();
        let classifier =
            SpectralClassifier::train(&settings.stellar_models, &settings.classifier).unwrap();

        let template = synthetic_spectrum(5800.0);
        let result = classifier
            .classify(template.wavelength(), template.flux())
            .unwrap();

        assert_eq!(result.spectral_type, "G");
        assert!(result.certainty > 50.0, "certainty {}", result.certainty);
    }

    #[test]
    fn test_classes_cover_all_types() {
        let settings = Settings::default();
        let classifier =
            SpectralClassifier::train(&settings.stellar_models, &settings.classifier).unwrap();
        assert_eq!(classifier.classes(), &["A", "B", "F", "G", "K", "M", "O"]);
    }

    #[test]
    fn test_certainty_is_a_percentage() {
        let settings = Settings::default();
        let classifier =
            SpectralClassifier::train(&settings.stellar_models, &settings.classifier).unwrap();

        for model in &settings.stellar_models {
            let template = synthetic_spectrum(model.teff);
            let result = classifier
                .classify(template.wavelength(), template.flux())
                .unwrap();
            assert!(result.certainty > 0.0 && result.certainty <= 100.0);
        }
    }

    #[test]
    fn test_non_overlapping_spectrum_still_predicts() {
        let settings = Settings::default();
        let classifier =
            SpectralClassifier::train(&settings.stellar_models, &settings.classifier).unwrap();

        let wavelength = linspace(8000.0, 9000.0, 100);
        let result = classifier.classify(&wavelength, &vec![1.0; 100]).unwrap();
        assert!(classifier.classes().contains(&result.spectral_type));
    }
}
