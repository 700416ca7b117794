use crate::core::Storage;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }
}

impl Storage for LocalStorage {
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<PathBuf> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&full_path, data).await?;
        Ok(full_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("results").join("run1");
        let storage = LocalStorage::new(base.to_str().unwrap().to_string());

        let written = storage.write_file("report.txt", b"Stellar Type: G").await.unwrap();
        assert_eq!(written, base.join("report.txt"));

        let data = tokio::fs::read(&written).await.unwrap();
        assert_eq!(data, b"Stellar Type: G");
    }
}
