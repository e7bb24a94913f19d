//! Request and response shapes for the `generateContent` endpoint.
//!
//! Building the request and interpreting the response are pure functions so
//! both the native HTTP client and the browser bindings share them.

use serde::{Deserialize, Serialize};

use crate::error::{EditError, EditResult};
use crate::session::ImageAsset;

// =============================================================================
// REQUEST
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: RequestContent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestContent {
    pub parts: Vec<RequestPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RequestPart {
    #[serde(rename_all = "camelCase")]
    InlineData { inline_data: InlineData },
    Text { text: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl RequestPart {
    fn image(asset: &ImageAsset) -> Self {
        Self::InlineData {
            inline_data: InlineData {
                mime_type: asset.mime_type.clone(),
                data: asset.data.clone(),
            },
        }
    }
}

/// Builds the request body: source image, optional inspiration, then the
/// instruction text.
pub fn build_request(
    source: &ImageAsset,
    instruction: &str,
    inspiration: Option<&ImageAsset>,
) -> GenerateContentRequest {
    let mut parts = vec![RequestPart::image(source)];
    if let Some(inspiration) = inspiration {
        parts.push(RequestPart::image(inspiration));
    }
    parts.push(RequestPart::Text {
        text: instruction.to_string(),
    });

    GenerateContentRequest {
        contents: RequestContent { parts },
    }
}

// =============================================================================
// RESPONSE
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<ResponseContent>,
    #[serde(default)]
    pub safety_ratings: Option<Vec<SafetyRating>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyRating {
    #[serde(default)]
    pub blocked: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn first_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    fn first_parts(&self) -> &[ResponsePart] {
        self.first_candidate()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }

    /// Base64 data of the first inline image part, if any.
    pub fn image_data(&self) -> Option<&str> {
        self.first_parts()
            .iter()
            .find_map(|p| p.inline_data.as_ref())
            .map(|d| d.data.as_str())
    }

    /// Returns true if safety filtering blocked the output or the prompt.
    pub fn is_safety_blocked(&self) -> bool {
        let rating_blocked = self
            .first_candidate()
            .and_then(|c| c.safety_ratings.as_ref())
            .map(|ratings| ratings.iter().any(|r| r.blocked))
            .unwrap_or(false);
        let prompt_blocked = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_ref())
            .is_some();
        rating_blocked || prompt_blocked
    }

    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Turns a decoded response into the edited image or the matching error.
pub fn interpret_response(
    response: &GenerateContentResponse,
    source: &ImageAsset,
) -> EditResult<ImageAsset> {
    if let Some(data) = response.image_data() {
        return Ok(source.with_data(data));
    }
    if response.is_safety_blocked() {
        return Err(EditError::SafetyBlocked);
    }
    Err(EditError::no_image(response.text()))
}

/// Returns true for 2xx statuses.
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Interprets a raw HTTP status and body.
pub fn interpret_http(status: u16, body: &str, source: &ImageAsset) -> EditResult<ImageAsset> {
    if !is_success(status) {
        return Err(EditError::from_status(status));
    }
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| EditError::unknown(format!("failed to parse response: {e}")))?;
    interpret_response(&response, source)
}
