//! services/api/src/adapters/storage.rs
//!
//! Local-disk implementation of the `FileStorageService` port. Uploaded files are
//! written under the configured upload directory and served back under a URL prefix.

use async_trait::async_trait;
use educare_core::ports::{FileStorageService, PortError, PortResult};
use std::path::{Path, PathBuf};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone, Debug)]
pub struct LocalFileStorage {
    root: PathBuf,
    url_prefix: String,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Reduces a client-supplied file name to its final path component.
fn clean_file_name(file_name: &str) -> PortResult<String> {
    let name = file_name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        return Err(PortError::Validation(format!(
            "Invalid file name '{}'",
            file_name
        )));
    }
    Ok(name.to_string())
}

//=========================================================================================
// `FileStorageService` Trait Implementation
//=========================================================================================

#[async_trait]
impl FileStorageService for LocalFileStorage {
    async fn store(&self, file_name: &str, data: &[u8]) -> PortResult<String> {
        let name = clean_file_name(file_name)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        tokio::fs::write(self.root.join(&name), data)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(format!("{}/{}", self.url_prefix, name))
    }
}
