//! Receipt Storage
//!
//! Receipts live on disk under `<root>/YYYY-MM/<Category>/<ms>-<name>.<ext>`
//! and are served back through the `/files?path=` proxy URL.

use std::path::{Component, Path, PathBuf};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tokio::io::AsyncWriteExt;
use unicode_normalization::UnicodeNormalization;

use crate::domain::{is_month_key, DomainError, DomainResult};

/// Route serving stored receipts
pub const FILES_ROUTE: &str = "/files";

const PROXY_PREFIX: &str = "/files?path=";
const LEGACY_PROXY_PREFIX: &str = "/api/files?path=";

/// Characters left alone by JavaScript's `encodeURIComponent`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const MAX_STEM_CHARS: usize = 30;

/// Fold a category label to a directory name: accents stripped, anything
/// else outside `[A-Za-z0-9]` replaced by `_`.
pub fn fold_category(category: &str) -> String {
    category
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Split an uploaded file name into a safe stem and extension
fn clean_file_name(file_name: &str) -> (String, String) {
    let parts: Vec<&str> = file_name.split('.').collect();
    let (stem_parts, ext) = match parts.split_last() {
        Some((ext, stem)) => (stem, *ext),
        None => (&[][..], ""),
    };

    let stem: String = stem_parts
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .take(MAX_STEM_CHARS)
        .collect();

    let ext: String = ext.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    let ext = if ext.is_empty() { "tmp".to_string() } else { ext };

    (stem, ext)
}

/// Build the storage path of a new receipt
pub fn receipt_path(month: &str, category: &str, file_name: &str, now_ms: i64) -> DomainResult<String> {
    if !is_month_key(month) {
        return Err(DomainError::InvalidInput(format!("invalid month '{}'", month)));
    }
    let (stem, ext) = clean_file_name(file_name);
    Ok(format!(
        "{}/{}/{}-{}.{}",
        month,
        fold_category(category),
        now_ms,
        stem,
        ext
    ))
}

/// `/files?path=<encodeURIComponent(path)>`
pub fn proxy_url(storage_path: &str) -> String {
    format!(
        "{}{}",
        PROXY_PREFIX,
        utf8_percent_encode(storage_path, URI_COMPONENT)
    )
}

/// Accept either a bare storage path or a full proxy URL
pub fn storage_path_from(input: &str) -> String {
    let encoded = input
        .strip_prefix(PROXY_PREFIX)
        .or_else(|| input.strip_prefix(LEGACY_PROXY_PREFIX));

    match encoded {
        Some(encoded) => percent_decode_str(encoded).decode_utf8_lossy().to_string(),
        None => input.to_string(),
    }
}

/// Filesystem-backed receipt store
#[derive(Debug, Clone)]
pub struct ReceiptStore {
    root: PathBuf,
}

impl ReceiptStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a storage path to a file under the root, refusing anything that
    /// could escape it.
    fn resolve(&self, storage_path: &str) -> DomainResult<PathBuf> {
        let invalid = || DomainError::InvalidInput(format!("invalid storage path '{}'", storage_path));

        if storage_path.is_empty() || storage_path.contains('\\') {
            return Err(invalid());
        }

        let relative = Path::new(storage_path);
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                _ => return Err(invalid()),
            }
        }
        if resolved == self.root {
            return Err(invalid());
        }
        Ok(resolved)
    }

    /// Write a new receipt; an existing file is never overwritten
    pub async fn save(&self, storage_path: &str, bytes: &[u8]) -> DomainResult<()> {
        let path = self.resolve(storage_path)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::Internal(format!("Failed to create directory: {}", e)))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    DomainError::Conflict(format!("{} already exists", storage_path))
                }
                _ => DomainError::Internal(format!("Failed to create file: {}", e)),
            })?;

        file.write_all(bytes)
            .await
            .map_err(|e| DomainError::Internal(format!("Failed to write file: {}", e)))?;
        file.flush()
            .await
            .map_err(|e| DomainError::Internal(format!("Failed to write file: {}", e)))?;

        log::info!("Stored receipt {} ({} bytes)", storage_path, bytes.len());
        Ok(())
    }

    pub async fn read(&self, storage_path: &str) -> DomainResult<Vec<u8>> {
        let path = self.resolve(storage_path)?;
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DomainError::NotFound(storage_path.to_string()),
            _ => DomainError::Internal(format!("Failed to read file: {}", e)),
        })
    }

    /// Remove a receipt; removing a missing file is not an error
    pub async fn remove(&self, storage_path: &str) -> DomainResult<bool> {
        let path = self.resolve(storage_path)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                log::info!("Deleted receipt {}", storage_path);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Receipt {} was already gone", storage_path);
                Ok(false)
            }
            Err(e) => Err(DomainError::Internal(format!("Failed to delete file: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_fold_category() {
        assert_eq!(fold_category("Hébergement (Hôtel)"), "Hebergement__Hotel_");
        assert_eq!(fold_category("Restaurant / Repas"), "Restaurant___Repas");
    }

    #[test]
    fn test_receipt_path_shape() {
        let path = receipt_path("2025-03", "Frais Bancaires", "ticket caisse.v2.jpg", 1700000000000).unwrap();
        assert_eq!(path, "2025-03/Frais_Bancaires/1700000000000-ticketcaisse-v2.jpg");

        let long = "a".repeat(50) + ".pdf";
        let path = receipt_path("2025-03", "Autre", &long, 1).unwrap();
        assert_eq!(path, format!("2025-03/Autre/1-{}.pdf", "a".repeat(30)));

        assert!(receipt_path("March", "Autre", "x.jpg", 1).is_err());
    }

    #[test]
    fn test_proxy_url_round_trip() {
        let url = proxy_url("2025-03/Autre/1-x.jpg");
        assert_eq!(url, "/files?path=2025-03%2FAutre%2F1-x.jpg");
        assert_eq!(storage_path_from(&url), "2025-03/Autre/1-x.jpg");
        assert_eq!(
            storage_path_from("/api/files?path=2025-03%2FAutre%2F1-x.jpg"),
            "2025-03/Autre/1-x.jpg"
        );
        assert_eq!(storage_path_from("2025-03/Autre/1-x.jpg"), "2025-03/Autre/1-x.jpg");
    }

    #[tokio::test]
    async fn test_save_never_overwrites() {
        let dir = tempdir().unwrap();
        let store = ReceiptStore::new(dir.path());

        store.save("2025-03/Autre/1-x.jpg", b"first").await.unwrap();
        let err = store.save("2025-03/Autre/1-x.jpg", b"second").await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        assert_eq!(store.read("2025-03/Autre/1-x.jpg").await.unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = tempdir().unwrap();
        let store = ReceiptStore::new(dir.path().join("receipts"));

        for path in ["../secret", "/etc/passwd", "2025-03/../../x", "", "a\\b"] {
            let err = store.read(path).await.unwrap_err();
            assert!(matches!(err, DomainError::InvalidInput(_)), "{}", path);
        }
    }

    #[tokio::test]
    async fn test_remove_and_missing_read() {
        let dir = tempdir().unwrap();
        let store = ReceiptStore::new(dir.path());

        store.save("2025-03/Autre/1-x.jpg", b"data").await.unwrap();
        assert!(store.remove("2025-03/Autre/1-x.jpg").await.unwrap());
        assert!(!store.remove("2025-03/Autre/1-x.jpg").await.unwrap());

        let err = store.read("2025-03/Autre/1-x.jpg").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }
}
