use crate::core::numeric::linspace;
use crate::domain::model::{Spectrum, StellarModel};

pub const TEMPLATE_START: f64 = 3000.0;
pub const TEMPLATE_END: f64 = 10000.0;
pub const TEMPLATE_POINTS: usize = 5000;
/// exp(-(λ - c)² / 50)
const PROFILE_DENOMINATOR: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbsorptionFeature {
    pub center: f64,
    pub depth: f64,
}

/// 依有效溫度挑選唯一的吸收線 (中心波長 Å, 深度)
pub fn absorption_for_temperature(teff: f64) -> AbsorptionFeature {
    let (center, depth) = if teff > 30000.0 {
        (4540.0, 0.2)
    } else if teff > 10000.0 {
        (4471.0, 0.3)
    } else if teff > 7500.0 {
        (6563.0, 0.4)
    } else if teff > 6000.0 {
        (4861.0, 0.5)
    } else if teff > 5000.0 {
        (5893.0, 0.6)
    } else if teff > 3500.0 {
        (3968.0, 0.7)
    } else {
        (6563.0, 0.8)
    };
    AbsorptionFeature { center, depth }
}

/// Toy reference spectrum: flat continuum at 1.0 with a single Gaussian dip.
pub fn synthetic_spectrum(teff: f64) -> Spectrum {
    let wavelength = linspace(TEMPLATE_START, TEMPLATE_END, TEMPLATE_POINTS);
    let feature = absorption_for_temperature(teff);
    let flux = wavelength
        .iter()
        .map(|&w| {
            let offset = w - feature.center;
            1.0 - feature.depth * (-(offset * offset) / PROFILE_DENOMINATOR).exp()
        })
        .collect();
    Spectrum::from_trusted(wavelength, flux)
}

/// log g and metallicity are carried in the model table but do not shape the
/// template.
pub fn synthesize(model: &StellarModel) -> Spectrum {
    synthetic_spectrum(model.teff)
}
