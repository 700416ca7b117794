use httpmock::prelude::*;
use stellar_classifier::adapters::fits::{write_table, FloatFormat, TableColumn};
use stellar_classifier::config::toml_config::Settings;
use stellar_classifier::core::templates::synthetic_spectrum;
use stellar_classifier::core::ConfigProvider;
use stellar_classifier::domain::model::{CatalogRecord, FallbackReason, SourceSelection, SpectrumOrigin};
use stellar_classifier::{ClassificationEngine, LocalStorage, RunConfig, StellarPipeline};
use tempfile::TempDir;

fn sdss_like_fits() -> Vec<u8> {
    let template = synthetic_spectrum(6500.0);
    let flux: Vec<f64> = template.flux().iter().map(|f| f * 40.0).collect();
    let loglam: Vec<f64> = template.wavelength().iter().map(|w| w.log10()).collect();
    write_table(&[
        TableColumn { name: "flux", format: FloatFormat::Single, values: &flux },
        TableColumn { name: "loglam", format: FloatFormat::Single, values: &loglam },
    ])
    .unwrap()
}

fn remote_settings(temp_dir: &TempDir, archive_url: String) -> Settings {
    let mut settings = Settings::default();
    settings.source.archive_url = archive_url;
    settings.source.records = vec![CatalogRecord { plate: 1323, fiber: 275, mjd: 52797 }];
    settings.source.cache_dir = Some(temp_dir.path().join("cache").to_string_lossy().to_string());
    settings.output.directory = temp_dir.path().join("results").to_string_lossy().to_string();
    settings
}

fn engine_for(settings: Settings) -> ClassificationEngine<StellarPipeline<LocalStorage, RunConfig>> {
    let config = RunConfig::new(SourceSelection::Remote, settings);
    let storage = LocalStorage::new(config.output_path().to_string());
    ClassificationEngine::new(StellarPipeline::new(storage, config).unwrap())
}

#[tokio::test]
async fn test_remote_download_is_cached() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let archive_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/spectrum")
            .query_param("plate", "1323")
            .query_param("fiber", "275")
            .query_param("mjd", "52797");
        then.status(200)
            .header("Content-Type", "application/fits")
            .body(sdss_like_fits());
    });

    let settings = remote_settings(&temp_dir, server.url("/spectrum"));

    let first = engine_for(settings.clone()).run().await.unwrap();
    match &first.origin {
        SpectrumOrigin::Remote { record, url } => {
            assert_eq!(record.plate, 1323);
            assert!(url.ends_with("/spectrum?plate=1323&fiber=275&mjd=52797"));
        }
        other => panic!("expected remote origin, got {:?}", other),
    }
    assert!(first.paths.report.exists());

    // 第二次執行從快取讀取
    let second = engine_for(settings).run().await.unwrap();
    assert!(!second.origin.is_fallback());
    assert_eq!(
        first.classification.spectral_type,
        second.classification.spectral_type
    );

    archive_mock.assert_hits(1);
}

#[tokio::test]
async fn test_http_error_falls_back_to_synthetic_spectrum() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let archive_mock = server.mock(|when, then| {
        when.method(GET).path("/spectrum");
        then.status(500);
    });

    let summary = engine_for(remote_settings(&temp_dir, server.url("/spectrum")))
        .run()
        .await
        .unwrap();

    match &summary.origin {
        SpectrumOrigin::SyntheticFallback { teff, reason } => {
            assert_eq!(*teff, 5800.0);
            match reason {
                FallbackReason::DownloadFailed(message) => assert!(message.contains("500")),
                other => panic!("unexpected reason {:?}", other),
            }
        }
        other => panic!("expected fallback, got {:?}", other),
    }
    assert!(summary.paths.plot.exists());
    assert!(summary.paths.report.exists());
    archive_mock.assert_hits(1);

    // 失敗的回應不寫入快取
    let cache_dir = temp_dir.path().join("cache");
    assert!(!cache_dir.exists() || std::fs::read_dir(cache_dir).unwrap().next().is_none());
}

#[tokio::test]
async fn test_non_fits_response_is_invalid_format() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/spectrum");
        then.status(200).body("<html>maintenance</html>");
    });

    let summary = engine_for(remote_settings(&temp_dir, server.url("/spectrum")))
        .run()
        .await
        .unwrap();

    assert!(matches!(
        summary.origin,
        SpectrumOrigin::SyntheticFallback {
            reason: FallbackReason::InvalidFormat(_),
            ..
        }
    ));
}
