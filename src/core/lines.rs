use crate::config::toml_config::DetectionConfig;
use crate::core::numeric::trapezoid;
use crate::core::peaks::{find_peaks, PeakCriteria};
use crate::domain::model::DetectedLine;

/// 在正規化光譜中尋找吸收線並計算等值寬度
#[derive(Debug, Clone)]
pub struct LineDetector {
    criteria: PeakCriteria,
    half_window: usize,
}

impl LineDetector {
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self {
            // 反轉流量後，吸收線變成峰值；深度條件 flux <= max_flux 即 -flux >= -max_flux
            criteria: PeakCriteria {
                min_height: -config.max_flux,
                min_prominence: config.min_prominence,
                min_width: config.min_width,
                rel_height: 0.5,
            },
            half_window: config.ew_half_window,
        }
    }

    pub fn detect(&self, wavelength: &[f64], flux: &[f64]) -> Vec<DetectedLine> {
        let n = wavelength.len().min(flux.len());
        let inverted: Vec<f64> = flux[..n].iter().map(|f| -f).collect();
        let depth: Vec<f64> = flux[..n].iter().map(|f| 1.0 - f).collect();

        find_peaks(&inverted, &self.criteria)
            .into_iter()
            .map(|peak| {
                // [p - hw, p + hw) clamped to the array
                let start = peak.index.saturating_sub(self.half_window);
                let end = (peak.index + self.half_window).min(n);
                let equivalent_width =
                    trapezoid(&depth[start..end], &wavelength[start..end]).max(0.0);
                DetectedLine {
                    wavelength: wavelength[peak.index],
                    equivalent_width,
                }
            })
            .collect()
    }
}

impl Default for LineDetector {
    fn default() -> Self {
        Self::from_config(&DetectionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::numeric::linspace;

    fn spectrum_with_dip(n: usize, center_idx: usize, depth: f64, sigma: f64) -> (Vec<f64>, Vec<f64>) {
        let wavelength = linspace(5000.0, 5000.0 + (n - 1) as f64, n);
        let flux = (0..n)
            .map(|i| {
                let d = i as f64 - center_idx as f64;
                1.0 - depth * (-(d * d) / (2.0 * sigma * sigma)).exp()
            })
            .collect();
        (wavelength, flux)
    }

    #[test]
    fn test_single_dip_is_detected_at_center() {
        let (wavelength, flux) = spectrum_with_dip(400, 200, 0.3, 3.0);
        let lines = LineDetector::default().detect(&wavelength, &flux);

        assert_eq!(lines.len(), 1);
        assert!((lines[0].wavelength - wavelength[200]).abs() <= 1.0);
        // 0.3 * sqrt(2π) * 3 ≈ 2.26，視窗只涵蓋 ±10 樣本
        assert!(lines[0].equivalent_width > 2.0 && lines[0].equivalent_width < 2.3);
    }

    #[test]
    fn test_flat_spectrum_has_no_lines() {
        let wavelength = linspace(4000.0, 5000.0, 500);
        let flux = vec![1.0; 500];
        assert!(LineDetector::default().detect(&wavelength, &flux).is_empty());
    }

    #[test]
    fn test_shallow_dip_is_ignored() {
        let (wavelength, flux) = spectrum_with_dip(400, 200, 0.03, 3.0);
        assert!(LineDetector::default().detect(&wavelength, &flux).is_empty());
    }

    #[test]
    fn test_dip_near_edge_uses_clamped_window() {
        let (wavelength, flux) = spectrum_with_dip(100, 3, 0.5, 2.0);
        let lines = LineDetector::default().detect(&wavelength, &flux);

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].wavelength, wavelength[3]);
        assert!(lines[0].equivalent_width > 0.0);
    }

    #[test]
    fn test_lines_come_out_in_wavelength_order() {
        let (wavelength, mut flux) = spectrum_with_dip(600, 150, 0.4, 3.0);
        let (_, second) = spectrum_with_dip(600, 450, 0.6, 3.0);
        for (f, s) in flux.iter_mut().zip(&second) {
            *f -= 1.0 - s;
        }

        let lines = LineDetector::default().detect(&wavelength, &flux);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].wavelength < lines[1].wavelength);
        assert!(lines[1].equivalent_width > lines[0].equivalent_width);
    }
}
