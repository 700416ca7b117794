use crate::domain::model::{AtomicLine, CatalogRecord, StellarModel};
use crate::utils::error::{ClassifierError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/settings.toml";

/// 整個分類流程的設定。啟動時載入一次，之後唯讀並明確傳給各元件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source: SourceConfig,
    pub normalization: NormalizationConfig,
    pub detection: DetectionConfig,
    pub classifier: ClassifierConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
    pub stellar_models: Vec<StellarModel>,
    pub atomic_database: Vec<AtomicLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub archive_url: String,
    pub input_dir: String,
    pub extensions: Vec<String>,
    pub cache_dir: Option<String>,
    pub timeout_seconds: Option<u64>,
    /// 讀取失敗時使用的合成光譜溫度 (K)
    pub fallback_teff: f64,
    pub records: Vec<CatalogRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    pub continuum_degree: usize,
    pub smoothing_window: usize,
    pub smoothing_order: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// 吸收線中心的正規化流量上限
    pub max_flux: f64,
    pub min_prominence: f64,
    pub min_width: f64,
    pub ew_half_window: usize,
    pub match_tolerance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub n_estimators: usize,
    pub grid_start: f64,
    pub grid_end: f64,
    pub grid_points: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: String,
    pub plot_file: String,
    pub report_file: String,
    pub lines_file: String,
    pub summary_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            archive_url: "https://dr16.sdss.org/optical/spectrum/view/data/format=fits/spec=lite"
                .to_string(),
            input_dir: "data/input".to_string(),
            extensions: [".fits", ".fit", ".fts", ".FITS"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            cache_dir: None,
            timeout_seconds: None,
            fallback_teff: 5800.0,
            records: vec![
                CatalogRecord { plate: 1323, fiber: 275, mjd: 52797 },
                CatalogRecord { plate: 1616, fiber: 14, mjd: 53149 },
                CatalogRecord { plate: 266, fiber: 516, mjd: 51630 },
            ],
        }
    }
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            continuum_degree: 3,
            smoothing_window: 21,
            smoothing_order: 3,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_flux: 0.95,
            min_prominence: 0.05,
            min_width: 2.0,
            ew_half_window: 10,
            match_tolerance: 1.5,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            grid_start: 4000.0,
            grid_end: 7000.0,
            grid_points: 1000,
            seed: 42,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "results".to_string(),
            plot_file: "spectrum.png".to_string(),
            report_file: "report.txt".to_string(),
            lines_file: "lines.csv".to_string(),
            summary_file: "summary.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: "stellar_classifier.log".to_string(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            normalization: NormalizationConfig::default(),
            detection: DetectionConfig::default(),
            classifier: ClassifierConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
            stellar_models: default_stellar_models(),
            atomic_database: default_atomic_database(),
        }
    }
}

fn default_stellar_models() -> Vec<StellarModel> {
    [
        ("O", 35000.0, 4.5),
        ("B", 20000.0, 4.0),
        ("A", 8500.0, 4.0),
        ("F", 6500.0, 4.5),
        ("G", 5800.0, 4.5),
        ("K", 4000.0, 4.5),
        ("M", 3000.0, 4.5),
    ]
    .into_iter()
    .map(|(spectral_type, teff, log_g)| StellarModel {
        spectral_type: spectral_type.to_string(),
        teff,
        log_g,
        metallicity: 0.0,
    })
    .collect()
}

fn default_atomic_database() -> Vec<AtomicLine> {
    [
        (6562.8, "H-alfa (Balmer)"),
        (4861.3, "H-beta (Balmer)"),
        (4340.5, "H-gama (Balmer)"),
        (5892.9, "Na I (Sódio)"),
        (3968.5, "Ca II (Cálcio)"),
        (3933.7, "Ca II (Cálcio)"),
        (5172.7, "Mg I (Magnésio)"),
        (5270.3, "Fe I (Ferro)"),
        (8542.1, "Ca II (Infravermelho)"),
    ]
    .into_iter()
    .map(|(wavelength, label)| AtomicLine {
        wavelength,
        label: label.to_string(),
    })
    .collect()
}

impl Settings {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ClassifierError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 檔案不存在時回傳 `None`，由呼叫端決定是否使用預設值
    pub fn load_optional<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        Self::from_file(path).map(Some)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ClassifierError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SDSS_ARCHIVE_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ClassifierError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn cache_dir(&self) -> PathBuf {
        match &self.source.cache_dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::cache_dir()
                .map(|d| d.join("stellar-classifier"))
                .unwrap_or_else(|| PathBuf::from(".cache/stellar-classifier")),
        }
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("source.archive_url", &self.source.archive_url)?;
        validation::validate_path("source.input_dir", &self.source.input_dir)?;
        validation::validate_path("output.directory", &self.output.directory)?;
        validation::validate_path("logging.file", &self.logging.file)?;

        if self.source.records.is_empty() {
            return Err(ClassifierError::MissingConfigError {
                field: "source.records".to_string(),
            });
        }
        if self.source.extensions.is_empty() {
            return Err(ClassifierError::MissingConfigError {
                field: "source.extensions".to_string(),
            });
        }
        validation::validate_range("source.fallback_teff", self.source.fallback_teff, 1.0, 1.0e6)?;

        let norm = &self.normalization;
        validation::validate_range("normalization.continuum_degree", norm.continuum_degree, 0, 10)?;
        validation::validate_smoothing_window(
            "normalization.smoothing_window",
            norm.smoothing_window,
            norm.smoothing_order,
        )?;

        let det = &self.detection;
        validation::validate_range("detection.max_flux", det.max_flux, 0.0, 1.0)?;
        validation::validate_range("detection.min_prominence", det.min_prominence, 0.0, 1.0)?;
        validation::validate_range("detection.min_width", det.min_width, 0.0, 1.0e4)?;
        validation::validate_positive_number("detection.ew_half_window", det.ew_half_window, 1)?;
        validation::validate_range("detection.match_tolerance", det.match_tolerance, 0.0, 100.0)?;

        let clf = &self.classifier;
        validation::validate_positive_number("classifier.n_estimators", clf.n_estimators, 1)?;
        validation::validate_positive_number("classifier.grid_points", clf.grid_points, 2)?;
        if !(clf.grid_start < clf.grid_end) {
            return Err(ClassifierError::InvalidConfigValueError {
                field: "classifier.grid_end".to_string(),
                value: clf.grid_end.to_string(),
                reason: format!("Must be greater than grid_start ({})", clf.grid_start),
            });
        }

        if self.stellar_models.len() < 2 {
            return Err(ClassifierError::ConfigValidationError {
                field: "stellar_models".to_string(),
                message: "at least two spectral types are needed to train the classifier"
                    .to_string(),
            });
        }
        let mut seen = HashSet::new();
        for model in &self.stellar_models {
            validation::validate_non_empty_string("stellar_models.spectral_type", &model.spectral_type)?;
            validation::validate_range("stellar_models.teff", model.teff, 1.0, 1.0e6)?;
            if !seen.insert(model.spectral_type.as_str()) {
                return Err(ClassifierError::InvalidConfigValueError {
                    field: "stellar_models.spectral_type".to_string(),
                    value: model.spectral_type.clone(),
                    reason: "Duplicate spectral type".to_string(),
                });
            }
        }

        for line in &self.atomic_database {
            validation::validate_non_empty_string("atomic_database.label", &line.label)?;
            validation::validate_range("atomic_database.wavelength", line.wavelength, 1.0, 1.0e6)?;
        }

        Ok(())
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let settings = Settings::from_toml_str("").unwrap();

        assert_eq!(settings.stellar_models.len(), 7);
        assert_eq!(settings.atomic_database[0].wavelength, 6562.8);
        assert_eq!(settings.atomic_database[0].label, "H-alfa (Balmer)");
        assert_eq!(settings.normalization.smoothing_window, 21);
        assert_eq!(settings.classifier.grid_points, 1000);
        assert_eq!(settings.source.records.len(), 3);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_shipped_settings_match_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/settings.toml");
        let shipped = Settings::from_file(path).unwrap();
        let defaults = Settings::default();

        assert!(shipped.validate().is_ok());
        assert_eq!(shipped.source.timeout_seconds, defaults.source.timeout_seconds);
        assert!(shipped.source.timeout_seconds.is_none());
        assert_eq!(shipped.source.fallback_teff, defaults.source.fallback_teff);
        assert_eq!(shipped.source.records.len(), 3);
        assert_eq!(shipped.stellar_models.len(), 7);
        assert_eq!(shipped.atomic_database.len(), 9);
        assert_eq!(shipped.classifier.grid_points, defaults.classifier.grid_points);
    }

    #[test]
    fn test_parse_partial_toml_config() {
        let toml_content = r#"
[source]
archive_url = "http://localhost:9000/spectrum"
fallback_teff = 8500.0

[detection]
match_tolerance = 0.5

[[atomic_database]]
wavelength = 5892.9
label = "Na I"

[[atomic_database]]
wavelength = 6562.8
label = "H-alpha"
"#;

        let settings = Settings::from_toml_str(toml_content).unwrap();

        assert_eq!(settings.source.archive_url, "http://localhost:9000/spectrum");
        assert_eq!(settings.source.fallback_teff, 8500.0);
        assert_eq!(settings.detection.match_tolerance, 0.5);
        // 未指定的欄位保留預設值
        assert_eq!(settings.detection.min_prominence, 0.05);
        let labels: Vec<&str> = settings
            .atomic_database
            .iter()
            .map(|l| l.label.as_str())
            .collect();
        assert_eq!(labels, vec!["Na I", "H-alpha"]);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("STELLAR_TEST_ARCHIVE", "https://mirror.example.org/spec");

        let toml_content = r#"
[source]
archive_url = "${STELLAR_TEST_ARCHIVE}"
"#;

        let settings = Settings::from_toml_str(toml_content).unwrap();
        assert_eq!(settings.source.archive_url, "https://mirror.example.org/spec");

        std::env::remove_var("STELLAR_TEST_ARCHIVE");
    }

    #[test]
    fn test_config_validation() {
        let settings = Settings::from_toml_str(
            r#"
[source]
archive_url = "invalid-url"
"#,
        )
        .unwrap();
        assert!(settings.validate().is_err());

        let settings = Settings::from_toml_str(
            r#"
[normalization]
smoothing_window = 20
"#,
        )
        .unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_duplicate_spectral_type_rejected() {
        let settings = Settings::from_toml_str(
            r#"
[[stellar_models]]
spectral_type = "G"
teff = 5800.0
log_g = 4.5
metallicity = 0.0

[[stellar_models]]
spectral_type = "G"
teff = 5000.0
log_g = 4.5
metallicity = 0.0
"#,
        )
        .unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[output]\ndirectory = \"out\"\n")
            .unwrap();

        let settings = Settings::from_file(temp_file.path()).unwrap();
        assert_eq!(settings.output.directory, "out");
        assert_eq!(settings.output.plot_file, "spectrum.png");
    }

    #[test]
    fn test_missing_file_is_none() {
        assert!(Settings::load_optional("definitely/not/here.toml")
            .unwrap()
            .is_none());

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[source]\nfallback_teff = 4000.0\n").unwrap();
        let settings = Settings::load_optional(temp_file.path()).unwrap().unwrap();
        assert_eq!(settings.source.fallback_teff, 4000.0);
    }
}
