//! Static resource retrieval.
//!
//! The built-in catalog and the images of built-in garments are static
//! resources addressed by server-style paths (`/database/garments.json`,
//! `/garments/denim-jacket.png`). [`ResourceFetcher`] is the port the
//! catalog and codec use to read them; [`AssetRoot`] serves them from a
//! directory on disk.

use crate::error::{AppError, Result};
use image::ImageFormat;
use std::future::Future;
use std::path::{Component, Path, PathBuf};

/// A fetched resource: raw bytes plus the content type, when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Port for retrieving static resources by location.
pub trait ResourceFetcher {
    /// Retrieves the resource at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Fetch`] when the resource cannot be retrieved.
    fn fetch(&self, location: &str) -> impl Future<Output = Result<Resource>>;
}

/// Serves resources from a directory, treating it as the web root.
#[derive(Debug, Clone)]
pub struct AssetRoot {
    root: PathBuf,
}

impl AssetRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps a server-style location onto a path beneath the root.
    ///
    /// Remote URLs and locations escaping the root via `..` are rejected.
    pub fn resolve(&self, location: &str) -> Result<PathBuf> {
        if location.contains("://") {
            return Err(AppError::fetch(format!(
                "Remote resources are not served from the asset root: {}",
                location
            )));
        }

        let relative = Path::new(location.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || relative.as_os_str().is_empty() {
            return Err(AppError::fetch(format!("Invalid resource location: {}", location)));
        }

        Ok(self.root.join(relative))
    }
}

impl ResourceFetcher for AssetRoot {
    async fn fetch(&self, location: &str) -> Result<Resource> {
        let path = self.resolve(location)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| AppError::fetch(format!("Failed to read {}: {}", path.display(), e)))?;

        tracing::debug!(location, bytes = bytes.len(), "fetched resource");

        Ok(Resource {
            content_type: content_type_for(&path),
            bytes,
        })
    }
}

fn content_type_for(path: &Path) -> Option<String> {
    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
        return Some("application/json".to_string());
    }
    ImageFormat::from_path(path)
        .ok()
        .map(|format| format.to_mime_type().to_string())
}
