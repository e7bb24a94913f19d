//! Retouch - session core for conversational AI image editing.
//!
//! The crate keeps everything that is not presentation:
//!
//! - **Edit history**: an append-only list of images with a cursor and an
//!   export selection, plus an optional inspiration image
//! - **Edit gateway**: one request/response call to a remote image model
//! - **Export**: selected history entries packed into a zip archive
//!
//! Views (browser themes via the `wasm` feature, or the `retouch` CLI) render
//! an [`EditSession`] and call its transition methods.
//!
//! # Example
//!
//! ```rust
//! use retouch::{EditSession, ImageAsset};
//!
//! let mut session = EditSession::new();
//! session.append_from_upload(ImageAsset::from_bytes(b"...", "image/png", "photo.png"));
//! assert_eq!(session.cursor(), Some(0));
//!
//! session.set_instruction("make the sky purple");
//! let request = session.begin_edit().unwrap();
//!
//! // Send `request` to an ImageEditor, then hand the outcome back.
//! let edited = request.source.with_data("cHVycGxl");
//! session.complete_edit(request, Ok(edited));
//! assert_eq!(session.len(), 2);
//!
//! session.toggle_selection(1).unwrap();
//! let archive = session.export_selected().unwrap();
//! assert_eq!(archive.file_name, "ai-images-1-selection.zip");
//! ```

pub mod error;
pub mod export;
pub mod gateway;
pub mod session;

// Re-exports for convenience
pub use error::{EditError, EditResult, ExportError, SessionError, SessionResult};
pub use export::{build_archive, ExportArchive, ExportItem};
pub use gateway::{GatewayConfig, ImageEditor};
pub use session::{EditRequest, EditSession, HistoryEntry, ImageAsset, TransferToken};

#[cfg(feature = "gateway")]
pub use gateway::GeminiGateway;

#[cfg(feature = "wasm")]
pub use session::JsEditSession;
