//! Data models for the editing session.
//!
//! Assets and history entries are plain owned values. They are never mutated
//! once created; an edit always produces a new entry.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// MIME types offered by the file picker.
pub const ACCEPTED_MIME_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/webp"];

/// Extension used when a MIME type carries no subtype.
pub const DEFAULT_EXTENSION: &str = "png";

/// Returns true if a file with this MIME type may be imported into history.
pub fn is_image_mime(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
}

/// Maps a file extension to one of the accepted MIME types.
pub fn mime_from_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

// =============================================================================
// IMAGE ASSET
// =============================================================================

/// An image held in memory as base64 text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageAsset {
    /// Base64-encoded image bytes (no `data:` prefix).
    pub data: String,

    /// MIME type, e.g. "image/png".
    pub mime_type: String,

    /// Original file name.
    pub name: String,
}

impl ImageAsset {
    /// Creates an asset from already-encoded base64 data.
    pub fn new(
        data: impl Into<String>,
        mime_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
            name: name.into(),
        }
    }

    /// Creates an asset from raw bytes.
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(BASE64_STANDARD.encode(bytes), mime_type, name)
    }

    /// Decodes the base64 payload back to bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64_STANDARD.decode(self.data.as_bytes())
    }

    /// Returns a new asset with different data but the same MIME type and name.
    ///
    /// Edit results inherit the source's MIME type; whatever the remote
    /// service claims is ignored.
    pub fn with_data(&self, data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: self.mime_type.clone(),
            name: self.name.clone(),
        }
    }

    /// File extension derived from the MIME subtype.
    pub fn extension(&self) -> &str {
        self.mime_type
            .split('/')
            .nth(1)
            .filter(|subtype| !subtype.is_empty())
            .unwrap_or(DEFAULT_EXTENSION)
    }

    /// Returns true if the asset has an image MIME type.
    pub fn is_image(&self) -> bool {
        is_image_mime(&self.mime_type)
    }
}

// =============================================================================
// HISTORY ENTRY
// =============================================================================

/// One step of the edit history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub image: ImageAsset,

    /// The instruction that produced this image. `None` for uploads.
    pub instruction: Option<String>,
}

impl HistoryEntry {
    /// Creates an entry for an uploaded or imported image.
    pub fn uploaded(image: ImageAsset) -> Self {
        Self {
            image,
            instruction: None,
        }
    }

    /// Creates an entry for an edit result.
    pub fn edited(image: ImageAsset, instruction: impl Into<String>) -> Self {
        Self {
            image,
            instruction: Some(instruction.into()),
        }
    }

    /// Gets the instruction, or an empty string for uploads.
    pub fn instruction_str(&self) -> &str {
        self.instruction.as_deref().unwrap_or("")
    }

    /// Returns true if this entry came from an upload rather than an edit.
    pub fn is_upload(&self) -> bool {
        self.instruction.is_none()
    }
}

// =============================================================================
// TRANSFER TOKEN
// =============================================================================

/// A history index carried across a drag-and-drop or clipboard boundary.
///
/// The token itself is unchecked; the session validates it against the
/// current history length before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferToken {
    index: usize,
}

impl TransferToken {
    /// Creates a token for a history index.
    pub fn new(index: usize) -> Self {
        Self { index }
    }

    /// The carried history index.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for TransferToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index)
    }
}

impl FromStr for TransferToken {
    type Err = SessionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.trim()
            .parse::<usize>()
            .map(Self::new)
            .map_err(|_| SessionError::invalid_transfer_token(raw))
    }
}

// =============================================================================
// TESTS
// =============================================================================
