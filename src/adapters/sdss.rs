use crate::config::toml_config::SourceConfig;
use crate::domain::model::CatalogRecord;
use crate::utils::error::{ClassifierError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// SDSS 光譜下載，下載結果以 URL 的 SHA-256 為檔名快取在磁碟上
#[derive(Debug, Clone)]
pub struct ArchiveClient {
    client: Client,
    archive_url: String,
    cache_dir: PathBuf,
}

impl ArchiveClient {
    pub fn new(config: &SourceConfig, cache_dir: PathBuf) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            archive_url: config.archive_url.clone(),
            cache_dir,
        })
    }

    pub fn spectrum_url(&self, record: &CatalogRecord) -> Result<Url> {
        Url::parse_with_params(
            &self.archive_url,
            &[
                ("plate", record.plate.to_string()),
                ("fiber", record.fiber.to_string()),
                ("mjd", record.mjd.to_string()),
            ],
        )
        .map_err(|e| ClassifierError::InvalidConfigValueError {
            field: "source.archive_url".to_string(),
            value: self.archive_url.clone(),
            reason: e.to_string(),
        })
    }

    pub fn cache_path(&self, url: &Url) -> PathBuf {
        let digest = Sha256::digest(url.as_str().as_bytes());
        self.cache_dir.join(format!("{:x}.fits", digest))
    }

    /// 快取命中時不發出請求；否則只嘗試一次下載
    pub async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let cache_path = self.cache_path(url);
        if let Ok(bytes) = tokio::fs::read(&cache_path).await {
            tracing::info!("📦 Cache hit for {} ({} bytes)", url, bytes.len());
            return Ok(bytes);
        }

        tracing::debug!("Making archive request to: {}", url);
        let response = self.client.get(url.clone()).send().await?;
        tracing::debug!("Archive response status: {}", response.status());

        if !response.status().is_success() {
            return Err(ClassifierError::HttpStatusError {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?.to_vec();
        tracing::info!("Downloaded {} bytes from the archive", bytes.len());

        if let Err(e) = store(&cache_path, &bytes).await {
            tracing::warn!("Could not write cache file {}: {}", cache_path.display(), e);
        }
        Ok(bytes)
    }
}

async fn store(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await
}

pub fn choose_record<R: Rng + ?Sized>(records: &[CatalogRecord], rng: &mut R) -> Option<CatalogRecord> {
    records.choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn client(archive_url: &str, cache_dir: &Path) -> ArchiveClient {
        let config = SourceConfig {
            archive_url: archive_url.to_string(),
            ..SourceConfig::default()
        };
        ArchiveClient::new(&config, cache_dir.to_path_buf()).unwrap()
    }

    #[test]
    fn test_spectrum_url_query() {
        let temp_dir = TempDir::new().unwrap();
        let client = client(
            "https://dr16.sdss.org/optical/spectrum/view/data/format=fits/spec=lite",
            temp_dir.path(),
        );
        let url = client
            .spectrum_url(&CatalogRecord { plate: 1323, fiber: 275, mjd: 52797 })
            .unwrap();

        assert_eq!(
            url.as_str(),
            "https://dr16.sdss.org/optical/spectrum/view/data/format=fits/spec=lite?plate=1323&fiber=275&mjd=52797"
        );
    }

    #[test]
    fn test_cache_path_is_stable_per_url() {
        let temp_dir = TempDir::new().unwrap();
        let client = client("http://localhost/spec", temp_dir.path());
        let a = client.spectrum_url(&CatalogRecord { plate: 1, fiber: 2, mjd: 3 }).unwrap();
        let b = client.spectrum_url(&CatalogRecord { plate: 1, fiber: 2, mjd: 4 }).unwrap();

        assert_eq!(client.cache_path(&a), client.cache_path(&a));
        assert_ne!(client.cache_path(&a), client.cache_path(&b));
        assert!(client.cache_path(&a).starts_with(temp_dir.path()));
        assert_eq!(
            client.cache_path(&a).extension().and_then(|e| e.to_str()),
            Some("fits")
        );
    }

    #[test]
    fn test_choose_record() {
        let records = SourceConfig::default().records;
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10 {
            let record = choose_record(&records, &mut rng).unwrap();
            assert!(records.contains(&record));
        }
        assert!(choose_record(&[], &mut rng).is_none());
    }

    #[test]
    fn test_invalid_archive_url() {
        let temp_dir = TempDir::new().unwrap();
        let client = client("not a url", temp_dir.path());
        let err = client
            .spectrum_url(&CatalogRecord { plate: 1, fiber: 2, mjd: 3 })
            .unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidConfigValueError { .. }));
    }
}
