//! Edit gateway module.
//!
//! A stateless request/response wrapper around the remote image-generation
//! service. Every failure is returned immediately; nothing is retried here.

pub mod config;
pub mod wire;

#[cfg(feature = "gateway")]
pub mod client;

use async_trait::async_trait;

use crate::error::EditResult;
use crate::session::ImageAsset;

// Re-exports for convenience
pub use config::GatewayConfig;
pub use wire::{build_request, interpret_http, interpret_response, GenerateContentRequest};

#[cfg(feature = "gateway")]
pub use client::GeminiGateway;

/// Anything that can turn a source image and an instruction into a new image.
#[async_trait]
pub trait ImageEditor: Send + Sync {
    /// Edits `source` according to `instruction`, optionally guided by an
    /// inspiration image. The result carries the source's MIME type.
    async fn edit_image(
        &self,
        source: &ImageAsset,
        instruction: &str,
        inspiration: Option<&ImageAsset>,
    ) -> EditResult<ImageAsset>;
}
