use stellar_classifier::adapters::fits::{write_primary_array, write_table, FloatFormat, TableColumn};
use stellar_classifier::config::toml_config::Settings;
use stellar_classifier::core::templates::synthetic_spectrum;
use stellar_classifier::core::ConfigProvider;
use stellar_classifier::domain::model::{FallbackReason, SourceSelection, SpectrumOrigin};
use stellar_classifier::{ClassificationEngine, LocalStorage, RunConfig, StellarPipeline};
use tempfile::TempDir;

fn settings_for(temp_dir: &TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.output.directory = temp_dir.path().join("results").to_string_lossy().to_string();
    settings.source.cache_dir = Some(temp_dir.path().join("cache").to_string_lossy().to_string());
    settings
}

fn engine_for(
    settings: Settings,
    selection: SourceSelection,
) -> ClassificationEngine<StellarPipeline<LocalStorage, RunConfig>> {
    let config = RunConfig::new(selection, settings);
    let storage = LocalStorage::new(config.output_path().to_string());
    ClassificationEngine::new(StellarPipeline::new(storage, config).unwrap())
}

#[tokio::test]
async fn test_missing_local_file_falls_back_and_writes_outputs() {
    let temp_dir = TempDir::new().unwrap();
    let engine = engine_for(
        settings_for(&temp_dir),
        SourceSelection::Local(temp_dir.path().join("does_not_exist.fits")),
    );

    let summary = engine.run().await.unwrap();

    match &summary.origin {
        SpectrumOrigin::SyntheticFallback { teff, reason } => {
            assert_eq!(*teff, 5800.0);
            assert!(matches!(reason, FallbackReason::FileUnreadable(_)));
        }
        other => panic!("expected synthetic fallback, got {:?}", other),
    }

    let results = temp_dir.path().join("results");
    assert_eq!(summary.paths.plot, results.join("spectrum.png"));
    assert_eq!(summary.paths.report, results.join("report.txt"));
    assert!(summary.paths.plot.exists());
    assert!(summary.paths.lines.exists());
    assert!(summary.paths.summary.exists());

    let report = std::fs::read_to_string(&summary.paths.report).unwrap();
    assert!(report.contains(&format!(
        "Stellar Type: {}",
        summary.classification.spectral_type
    )));
    assert!(report.contains("synthetic template 5800 K"));

    let png = std::fs::read(&summary.paths.plot).unwrap();
    let plot = image::load_from_memory(&png).unwrap();
    assert_eq!((plot.width(), plot.height()), (1200, 600));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary.paths.summary).unwrap()).unwrap();
    assert_eq!(json["fallback"], true);
    assert_eq!(json["spectral_type"], summary.classification.spectral_type.as_str());
}

#[tokio::test]
async fn test_local_table_file_is_classified() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("hd_table.fits");

    let template = synthetic_spectrum(8500.0);
    let flux: Vec<f64> = template.flux().iter().map(|f| f * 250.0).collect();
    let loglam: Vec<f64> = template.wavelength().iter().map(|w| w.log10()).collect();
    let bytes = write_table(&[
        TableColumn { name: "FLUX", format: FloatFormat::Double, values: &flux },
        TableColumn { name: "LOGLAM", format: FloatFormat::Double, values: &loglam },
    ])
    .unwrap();
    std::fs::write(&input, bytes).unwrap();

    let engine = engine_for(settings_for(&temp_dir), SourceSelection::Local(input.clone()));
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.origin, SpectrumOrigin::LocalFile { path: input });
    assert!(summary.classification.certainty > 0.0);

    // A 型模板在 H-alpha 有吸收線
    let report = std::fs::read_to_string(&summary.paths.report).unwrap();
    assert!(report.contains("H-alfa (Balmer) @ 6562"));

    let csv = std::fs::read_to_string(&summary.paths.lines).unwrap();
    assert!(csv.starts_with("wavelength,equivalent_width,element"));
}

#[tokio::test]
async fn test_local_primary_array_file_is_read() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("primary.fits");
    let template = synthetic_spectrum(4000.0);
    std::fs::write(&input, write_primary_array(template.flux())).unwrap();

    let engine = engine_for(settings_for(&temp_dir), SourceSelection::Local(input.clone()));
    let summary = engine.run().await.unwrap();

    assert!(!summary.origin.is_fallback());
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary.paths.summary).unwrap()).unwrap();
    assert_eq!(json["samples"], 5000);
    assert_eq!(json["origin"]["kind"], "local_file");
}
