//! Zip export of selected history entries.
//!
//! Each selected entry becomes `image_<n>.<ext>` (n is the 1-based history
//! position) plus `image_<n>_prompt.txt` when the entry has an instruction.

use std::io::{Cursor, Write};

use serde::Serialize;
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ExportError;
use crate::session::ImageAsset;

/// One history entry scheduled for export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportItem {
    /// 0-based history index.
    pub index: usize,
    pub image: ImageAsset,
    pub instruction: Option<String>,
}

/// A finished archive ready to be saved or downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportArchive {
    pub file_name: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    /// Number of exported history entries.
    pub item_count: usize,
}

/// Name of the archive for a selection of `count` entries.
pub fn archive_file_name(count: usize) -> String {
    format!("ai-images-{count}-selection.zip")
}

/// Archive entry name of an image.
pub fn image_file_name(index: usize, image: &ImageAsset) -> String {
    format!("image_{}.{}", index + 1, image.extension())
}

/// Archive entry name of an instruction text file.
pub fn instruction_file_name(index: usize) -> String {
    format!("image_{}_prompt.txt", index + 1)
}

/// Packs the items into an in-memory zip archive.
pub fn build_archive(items: &[ExportItem]) -> Result<ExportArchive, ExportError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for item in items {
        let bytes = item.image.decode().map_err(|source| ExportError::Decode {
            index: item.index,
            source,
        })?;
        zip.start_file(image_file_name(item.index, &item.image), options)?;
        zip.write_all(&bytes)?;

        if let Some(instruction) = item.instruction.as_deref().filter(|s| !s.is_empty()) {
            zip.start_file(instruction_file_name(item.index), options)?;
            zip.write_all(instruction.as_bytes())?;
        }
    }

    let bytes = zip.finish()?.into_inner();
    let archive = ExportArchive {
        file_name: archive_file_name(items.len()),
        bytes,
        item_count: items.len(),
    };
    info!(
        file_name = %archive.file_name,
        size = archive.bytes.len(),
        "export archive built"
    );
    Ok(archive)
}
