//! Editing session module.
//!
//! Provides the presentation-independent state of an image-editing session:
//! history, cursor, export selection and inspiration slot.

pub mod model;
pub mod store;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-exports for convenience
pub use model::{
    is_image_mime, mime_from_extension, HistoryEntry, ImageAsset, TransferToken,
    ACCEPTED_MIME_TYPES,
};
pub use store::{EditRequest, EditSession};

#[cfg(feature = "wasm")]
pub use wasm::JsEditSession;
