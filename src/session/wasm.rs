//! WASM bindings for the editing session.
//!
//! Every visual theme drives the same `JsEditSession`; the page only renders
//! `getState()` and forwards user events. The network call itself is made by
//! the page with `fetch`: `beginEdit()` hands out the request body and
//! `completeEdit()` / `failEdit()` hand the outcome back.

use js_sys::{Array, Object, Reflect, Uint8Array};
use serde::Serialize;
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;

use super::model::{ImageAsset, TransferToken};
use super::store::{EditRequest, EditSession};
use crate::error::{EditError, SessionError};
use crate::gateway::config::DEFAULT_MODEL;
use crate::gateway::wire::{build_request, interpret_http};

/// Serialize a value to JsValue with maps as plain JS objects (not Map).
fn to_js_value<T: Serialize>(value: &T) -> Result<JsValue, serde_wasm_bindgen::Error> {
    value.serialize(&Serializer::new().serialize_maps_as_objects(true))
}

// =============================================================================
// ERROR CONVERSION
// =============================================================================

impl From<SessionError> for JsValue {
    fn from(err: SessionError) -> JsValue {
        JsValue::from_str(&err.to_string())
    }
}

/// Helper macro for Result conversion
macro_rules! js_result {
    ($expr:expr) => {
        $expr.map_err(|e: SessionError| JsValue::from(e))
    };
}

// =============================================================================
// MAIN WRAPPER TYPE
// =============================================================================

/// JavaScript-friendly wrapper around EditSession.
#[wasm_bindgen]
pub struct JsEditSession {
    inner: EditSession,
    /// Request handed out by `beginEdit`, waiting for its outcome.
    pending: Option<EditRequest>,
    /// Image model named in `beginEdit` requests.
    model: String,
}

#[wasm_bindgen]
impl JsEditSession {
    /// Creates an empty session.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// const session = new JsEditSession();
    /// ```
    #[wasm_bindgen(constructor)]
    pub fn new() -> JsEditSession {
        JsEditSession {
            inner: EditSession::new(),
            pending: None,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Image model the page should call.
    #[wasm_bindgen(getter)]
    pub fn model(&self) -> String {
        self.model.clone()
    }

    /// Chooses the image model. A blank name restores the default.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// session.setModel("gemini-2.5-flash-image");
    /// ```
    #[wasm_bindgen(js_name = setModel)]
    pub fn set_model(&mut self, model: &str) {
        let model = model.trim();
        self.model = if model.is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            model.to_string()
        };
    }

    /// Gets the full session state as a JavaScript object.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// const state = session.getState();
    /// console.log(state.history.length, state.cursor, state.selection);
    /// ```
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Result<JsValue, JsValue> {
        Ok(to_js_value(&self.inner)?)
    }

    /// Gets the image under the cursor, or null.
    #[wasm_bindgen(js_name = currentImage)]
    pub fn current_image(&self) -> Result<JsValue, JsValue> {
        match self.inner.current_image() {
            Some(image) => Ok(to_js_value(image)?),
            None => Ok(JsValue::NULL),
        }
    }

    /// The accepted MIME types for file inputs.
    #[wasm_bindgen(js_name = acceptedMimeTypes)]
    pub fn accepted_mime_types() -> Array {
        super::model::ACCEPTED_MIME_TYPES
            .iter()
            .map(|m| JsValue::from_str(m))
            .collect()
    }
}

// =============================================================================
// HISTORY METHODS
// =============================================================================

#[wasm_bindgen]
impl JsEditSession {
    /// Appends an uploaded image (`{ data, mime_type, name }`). Returns its index.
    #[wasm_bindgen(js_name = appendFromUpload)]
    pub fn append_from_upload(&mut self, image: JsValue) -> Result<usize, JsValue> {
        let image: ImageAsset = from_value(image)?;
        Ok(self.inner.append_from_upload(image))
    }

    /// Replaces the session with one uploaded image.
    #[wasm_bindgen(js_name = startWithUpload)]
    pub fn start_with_upload(&mut self, image: JsValue) -> Result<(), JsValue> {
        let image: ImageAsset = from_value(image)?;
        self.inner.start_with_upload(image);
        Ok(())
    }

    /// Imports an array of images, skipping non-images. Returns the count added.
    ///
    /// Each `FileReader` completion may call this with a single-element array;
    /// entries land in completion order.
    #[wasm_bindgen(js_name = importUploads)]
    pub fn import_uploads(&mut self, images: JsValue) -> Result<usize, JsValue> {
        let images: Vec<ImageAsset> = from_value(images)?;
        Ok(self.inner.import_uploads(images))
    }

    /// Appends an edit result and moves the cursor to it.
    #[wasm_bindgen(js_name = appendEditResult)]
    pub fn append_edit_result(&mut self, image: JsValue, instruction: &str) -> Result<usize, JsValue> {
        let image: ImageAsset = from_value(image)?;
        Ok(self.inner.append_edit_result(image, instruction))
    }

    #[wasm_bindgen(js_name = selectCursor)]
    pub fn select_cursor(&mut self, index: usize) -> Result<(), JsValue> {
        js_result!(self.inner.select_cursor(index))?;
        Ok(())
    }

    #[wasm_bindgen(js_name = toggleSelection)]
    pub fn toggle_selection(&mut self, index: usize) -> Result<bool, JsValue> {
        Ok(js_result!(self.inner.toggle_selection(index))?)
    }

    /// Starts over.
    pub fn reset(&mut self) {
        self.inner.reset();
    }
}

// =============================================================================
// INSPIRATION AND INSTRUCTION METHODS
// =============================================================================

#[wasm_bindgen]
impl JsEditSession {
    #[wasm_bindgen(js_name = setInspiration)]
    pub fn set_inspiration(&mut self, image: JsValue) -> Result<(), JsValue> {
        let image: ImageAsset = from_value(image)?;
        self.inner.set_inspiration(image);
        Ok(())
    }

    #[wasm_bindgen(js_name = clearInspiration)]
    pub fn clear_inspiration(&mut self) {
        self.inner.clear_inspiration();
    }

    /// Token to put in `dataTransfer` when a history thumbnail is dragged.
    #[wasm_bindgen(js_name = transferToken)]
    pub fn transfer_token(index: usize) -> String {
        TransferToken::new(index).to_string()
    }

    /// Uses the history image named by a dropped transfer token as inspiration.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// const raw = event.dataTransfer.getData("historyIndex");
    /// session.setInspirationFromTransfer(raw);
    /// ```
    #[wasm_bindgen(js_name = setInspirationFromTransfer)]
    pub fn set_inspiration_from_transfer(&mut self, raw: &str) -> Result<(), JsValue> {
        let token = js_result!(raw.parse::<TransferToken>())?;
        js_result!(self.inner.set_inspiration_from_transfer(token))?;
        Ok(())
    }

    #[wasm_bindgen(js_name = setInstruction)]
    pub fn set_instruction(&mut self, instruction: &str) {
        self.inner.set_instruction(instruction);
    }

    #[wasm_bindgen(js_name = clearError)]
    pub fn clear_error(&mut self) {
        self.inner.clear_error();
    }
}

// =============================================================================
// EDIT METHODS
// =============================================================================

#[wasm_bindgen]
impl JsEditSession {
    /// Starts an edit. Returns `{ model, body }` for the `generateContent`
    /// call, or null when busy, without an image, or with a blank instruction.
    ///
    /// # Example (JavaScript)
    /// ```js
    /// const req = session.beginEdit();
    /// if (req) {
    ///   try {
    ///     const res = await fetch(`${base}/${req.model}:generateContent`, {
    ///       method: "POST",
    ///       headers: { "x-goog-api-key": key, "content-type": "application/json" },
    ///       body: JSON.stringify(req.body),
    ///     });
    ///     session.completeEdit(res.status, await res.text());
    ///   } catch (e) {
    ///     session.failEdit(String(e));
    ///   }
    /// }
    /// ```
    #[wasm_bindgen(js_name = beginEdit)]
    pub fn begin_edit(&mut self) -> Result<JsValue, JsValue> {
        let Some(request) = self.inner.begin_edit() else {
            return Ok(JsValue::NULL);
        };
        let body = build_request(
            &request.source,
            &request.instruction,
            request.inspiration.as_ref(),
        );
        self.pending = Some(request);

        let out = Object::new();
        Reflect::set(&out, &"model".into(), &self.model.as_str().into())?;
        Reflect::set(&out, &"body".into(), &to_js_value(&body)?)?;
        Ok(out.into())
    }

    /// Finishes the pending edit with the HTTP status and body text.
    /// Returns the new history index, or undefined on failure (see `error`).
    #[wasm_bindgen(js_name = completeEdit)]
    pub fn complete_edit(&mut self, status: u16, body: &str) -> Option<usize> {
        let request = self.pending.take()?;
        let outcome = interpret_http(status, body, &request.source);
        self.inner.complete_edit(request, outcome)
    }

    /// Finishes the pending edit after a transport failure (fetch rejected).
    #[wasm_bindgen(js_name = failEdit)]
    pub fn fail_edit(&mut self, detail: &str) {
        if let Some(request) = self.pending.take() {
            self.inner.complete_edit(request, Err(EditError::unknown(detail)));
        }
    }

    /// Reports that no credential is configured.
    #[wasm_bindgen(js_name = failConfiguration)]
    pub fn fail_configuration(&mut self) {
        if let Some(request) = self.pending.take() {
            self.inner.complete_edit(request, Err(EditError::Configuration));
        }
    }
}

// =============================================================================
// EXPORT METHODS
// =============================================================================

#[wasm_bindgen]
impl JsEditSession {
    /// Builds the zip for the selection. Returns `{ fileName, bytes }`, or
    /// null for an empty selection or a failed export (see `error`).
    ///
    /// # Example (JavaScript)
    /// ```js
    /// const out = session.exportSelected();
    /// if (out) {
    ///   const url = URL.createObjectURL(new Blob([out.bytes]));
    ///   // click a temporary <a download={out.fileName}>
    /// }
    /// ```
    #[wasm_bindgen(js_name = exportSelected)]
    pub fn export_selected(&mut self) -> Result<JsValue, JsValue> {
        let Some(archive) = self.inner.export_selected() else {
            return Ok(JsValue::NULL);
        };
        let out = Object::new();
        Reflect::set(&out, &"fileName".into(), &archive.file_name.into())?;
        Reflect::set(
            &out,
            &"bytes".into(),
            &Uint8Array::from(&archive.bytes[..]).into(),
        )?;
        Ok(out.into())
    }
}

impl Default for JsEditSession {
    fn default() -> Self {
        Self::new()
    }
}
