//! Error types for the editing session, the edit gateway and archive export.
//!
//! The `Display` output of [`EditError`] is the message shown to the user, so
//! front ends can render `err.to_string()` directly.

use thiserror::Error;

/// Result type alias for edit gateway operations.
pub type EditResult<T> = Result<T, EditError>;

/// Result type alias for history/selection operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Message stored in the session when an export fails.
pub const EXPORT_FAILED_MESSAGE: &str = "Exporting the images failed.";

/// Errors surfaced by an image edit request.
///
/// None of these are retried; the caller re-triggers the edit manually.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// No credential configured. The session cannot generate at all.
    #[error("API_KEY environment variable is not set.")]
    Configuration,

    /// The service refused the request on safety grounds.
    #[error("The request was blocked due to safety reasons. Please adjust your prompt or image.")]
    SafetyBlocked,

    /// The response carried no image payload.
    #[error("{}", no_image_message(.response_text))]
    NoImageProduced { response_text: Option<String> },

    /// The service rejected the request (4xx).
    #[error("The request was invalid. Please check your image format and prompt.")]
    InvalidRequest { status: u16 },

    /// The service failed or is overloaded (5xx).
    #[error("The AI service is currently unavailable. Please try again later.")]
    ServiceUnavailable { status: u16 },

    /// Anything that does not fit the other categories.
    #[error("An unknown error occurred while editing the image.")]
    Unknown { detail: String },
}

fn no_image_message(response_text: &Option<String>) -> String {
    match response_text {
        Some(text) => format!(
            "The model could not generate an image. Response: \"{}\"",
            text.trim()
        ),
        None => {
            "No image was generated in the response. The model may have replied with text instead."
                .to_string()
        }
    }
}

impl EditError {
    /// Creates a NoImageProduced error, dropping blank text.
    pub fn no_image(response_text: Option<String>) -> Self {
        let response_text = response_text.filter(|t| !t.trim().is_empty());
        Self::NoImageProduced { response_text }
    }

    /// Creates an Unknown error.
    pub fn unknown(detail: impl Into<String>) -> Self {
        Self::Unknown {
            detail: detail.into(),
        }
    }

    /// Classifies an HTTP status code by family.
    pub fn from_status(status: u16) -> Self {
        match status {
            400..=499 => Self::InvalidRequest { status },
            500..=599 => Self::ServiceUnavailable { status },
            _ => Self::unknown(format!("unexpected HTTP status {status}")),
        }
    }

    /// Returns true for the configuration error, which makes the session
    /// unusable for generation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration)
    }

    /// The message shown to the user.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Errors that can occur while assembling an export archive.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The zip writer failed.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Writing an entry failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An image's base64 payload could not be decoded.
    #[error("Invalid image data for entry {index}: {source}")]
    Decode {
        index: usize,
        #[source]
        source: base64::DecodeError,
    },
}

impl ExportError {
    /// The message shown to the user. Every export failure reads the same.
    pub fn user_message(&self) -> String {
        EXPORT_FAILED_MESSAGE.to_string()
    }
}

/// Errors from history, selection and inspiration operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Index out of bounds for the history sequence.
    #[error("Index {index} out of bounds for history of length {length}")]
    IndexOutOfBounds { index: usize, length: usize },

    /// A transfer token that does not carry a history index.
    #[error("Invalid transfer token: {0}")]
    InvalidTransferToken(String),
}

impl SessionError {
    /// Creates an IndexOutOfBounds error.
    pub fn index_out_of_bounds(index: usize, length: usize) -> Self {
        Self::IndexOutOfBounds { index, length }
    }

    /// Creates an InvalidTransferToken error.
    pub fn invalid_transfer_token(raw: impl Into<String>) -> Self {
        Self::InvalidTransferToken(raw.into())
    }
}
