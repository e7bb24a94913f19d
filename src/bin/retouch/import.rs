//! Reading image files from disk into assets.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use retouch::session::{mime_from_extension, ImageAsset};
use tokio::task::JoinSet;

/// Reads one image file. Returns `None` for files that are not png/jpeg/webp.
pub async fn read_image(path: &Path) -> Result<Option<ImageAsset>> {
    let Some(mime_type) = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(mime_from_extension)
    else {
        return Ok(None);
    };

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(Some(ImageAsset::from_bytes(&bytes, mime_type, name)))
}

/// Reads an image that must exist and be supported.
pub async fn read_required_image(path: &Path) -> Result<ImageAsset> {
    read_image(path)
        .await?
        .with_context(|| format!("Unsupported image type: {}", path.display()))
}

/// Reads all files concurrently and returns the images in completion order.
///
/// Unsupported files are skipped; read failures abort the import.
pub async fn read_images(paths: &[PathBuf]) -> Result<Vec<ImageAsset>> {
    let mut tasks = JoinSet::new();
    for path in paths {
        let path = path.clone();
        tasks.spawn(async move { read_image(&path).await });
    }

    let mut images = Vec::with_capacity(paths.len());
    while let Some(joined) = tasks.join_next().await {
        if let Some(image) = joined.context("Import task panicked")?? {
            images.push(image);
        }
    }
    Ok(images)
}
