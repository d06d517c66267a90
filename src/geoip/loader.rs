//! GeoIP database loading from local files.

use anyhow::{Context, Result};
use maxminddb::Reader;
use std::path::Path;

use crate::geoip::metadata::extract_metadata;
use crate::geoip::types::GeoIpMetadata;

/// Loads a GeoIP database from a local file path into memory.
pub(crate) async fn load_from_file(path: &Path) -> Result<(Reader<Vec<u8>>, GeoIpMetadata)> {
    log::info!("Loading GeoIP database from: {}", path.display());

    let db_bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read GeoIP database from {}", path.display()))?;

    let reader = Reader::from_source(db_bytes)
        .with_context(|| format!("Failed to parse GeoIP database from {}", path.display()))?;

    let metadata = extract_metadata(&reader, &path.to_string_lossy());
    log::info!(
        "Loaded {} ({}) from {}",
        metadata.database_type,
        metadata.version,
        metadata.source
    );

    Ok((reader, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_load_from_file_not_found() {
        let nonexistent_path = Path::new("nonexistent")
            .join("path")
            .join("to")
            .join("database.mmdb");
        let result = load_from_file(&nonexistent_path).await;
        assert!(result.is_err());
        let error_msg = result.unwrap_err().to_string();
        assert!(
            error_msg.contains("Failed to read"),
            "Expected file read error, got: {}",
            error_msg
        );
    }

    #[tokio::test]
    async fn test_load_from_file_invalid_database() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("invalid.mmdb");
        let mut file = tokio::fs::File::create(&db_path)
            .await
            .expect("Failed to create test file");
        file.write_all(b"not a valid mmdb file")
            .await
            .expect("Failed to write test data");
        drop(file);

        let result = load_from_file(&db_path).await;
        assert!(result.is_err());
        let error_msg = result.unwrap_err().to_string();
        assert!(
            error_msg.contains("Failed to parse"),
            "Expected parse error, got: {}",
            error_msg
        );
    }

    #[tokio::test]
    async fn test_load_from_file_empty_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("empty.mmdb");
        tokio::fs::write(&db_path, b"")
            .await
            .expect("Failed to write empty file");

        assert!(load_from_file(&db_path).await.is_err());
    }
}
