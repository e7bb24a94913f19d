//! Core EditSession implementation.
//!
//! One `EditSession` holds everything a view needs to render: the history,
//! the cursor, the export selection, the inspiration slot, the instruction
//! field, the last error and the busy flags. All changes go through the
//! transition methods below; the event loop owns the single instance.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::model::{HistoryEntry, ImageAsset, TransferToken};
use crate::error::{EditError, EditResult, ExportError, SessionError, SessionResult};
use crate::export::{build_archive, ExportArchive, ExportItem};
use crate::gateway::ImageEditor;

/// An edit request captured when the user hits Generate.
///
/// Owns copies of its inputs so the session can keep changing (imports,
/// selection) while the request is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    pub source: ImageAsset,
    pub instruction: String,
    pub inspiration: Option<ImageAsset>,
}

/// Session state for one image-editing workspace.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EditSession {
    history: Vec<HistoryEntry>,
    cursor: Option<usize>,
    selection: BTreeSet<usize>,
    inspiration: Option<ImageAsset>,
    instruction: String,
    error: Option<String>,
    is_editing: bool,
    is_exporting: bool,
}

impl EditSession {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// The entry under the cursor.
    pub fn current_entry(&self) -> Option<&HistoryEntry> {
        self.cursor.and_then(|i| self.history.get(i))
    }

    /// The image under the cursor.
    pub fn current_image(&self) -> Option<&ImageAsset> {
        self.current_entry().map(|e| &e.image)
    }

    /// Selected indices in ascending order.
    pub fn selection(&self) -> impl Iterator<Item = usize> + '_ {
        self.selection.iter().copied()
    }

    pub fn selection_len(&self) -> usize {
        self.selection.len()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selection.contains(&index)
    }

    pub fn inspiration(&self) -> Option<&ImageAsset> {
        self.inspiration.as_ref()
    }

    /// Current contents of the instruction field.
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// The last user-visible error message.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_editing(&self) -> bool {
        self.is_editing
    }

    pub fn is_exporting(&self) -> bool {
        self.is_exporting
    }

    fn check_index(&self, index: usize) -> SessionResult<()> {
        if index < self.history.len() {
            Ok(())
        } else {
            Err(SessionError::index_out_of_bounds(index, self.history.len()))
        }
    }

    // =========================================================================
    // HISTORY
    // =========================================================================

    /// Appends an uploaded image. Only the first image of an empty session
    /// moves the cursor.
    pub fn append_from_upload(&mut self, image: ImageAsset) -> usize {
        let index = self.history.len();
        self.history.push(HistoryEntry::uploaded(image));
        if index == 0 {
            self.cursor = Some(0);
        }
        debug!(index, "appended upload");
        index
    }

    /// Appends an edit result and moves the cursor to it.
    pub fn append_edit_result(&mut self, image: ImageAsset, instruction: impl Into<String>) -> usize {
        let index = self.history.len();
        self.history.push(HistoryEntry::edited(image, instruction));
        self.cursor = Some(index);
        debug!(index, "appended edit result");
        index
    }

    /// Replaces the whole session with a single uploaded image.
    pub fn start_with_upload(&mut self, image: ImageAsset) {
        self.history = vec![HistoryEntry::uploaded(image)];
        self.cursor = Some(0);
        self.selection.clear();
        self.inspiration = None;
        self.error = None;
        self.instruction.clear();
    }

    /// Bulk-imports images, silently skipping non-image MIME types.
    ///
    /// Importing into an empty session first clears the inspiration, error,
    /// instruction and selection. Returns the number of appended entries.
    pub fn import_uploads<I>(&mut self, images: I) -> usize
    where
        I: IntoIterator<Item = ImageAsset>,
    {
        if self.history.is_empty() {
            self.inspiration = None;
            self.error = None;
            self.instruction.clear();
            self.selection.clear();
        }

        let mut appended = 0;
        for image in images {
            if !image.is_image() {
                debug!(name = %image.name, mime = %image.mime_type, "skipping non-image import");
                continue;
            }
            self.append_from_upload(image);
            appended += 1;
        }
        appended
    }

    /// Moves the cursor and loads the entry's instruction into the field.
    pub fn select_cursor(&mut self, index: usize) -> SessionResult<()> {
        self.check_index(index)?;
        self.cursor = Some(index);
        self.instruction = self.history[index].instruction_str().to_string();
        Ok(())
    }

    /// Toggles an index in the export selection. Returns whether it is now
    /// selected.
    pub fn toggle_selection(&mut self, index: usize) -> SessionResult<bool> {
        self.check_index(index)?;
        if self.selection.remove(&index) {
            Ok(false)
        } else {
            self.selection.insert(index);
            Ok(true)
        }
    }

    /// Starts over: clears history, cursor, selection, inspiration,
    /// instruction and error.
    pub fn reset(&mut self) {
        self.history.clear();
        self.cursor = None;
        self.selection.clear();
        self.inspiration = None;
        self.instruction.clear();
        self.error = None;
        debug!("session reset");
    }

    // =========================================================================
    // INSPIRATION AND INSTRUCTION
    // =========================================================================

    pub fn set_inspiration(&mut self, image: ImageAsset) {
        self.inspiration = Some(image);
    }

    pub fn clear_inspiration(&mut self) {
        self.inspiration = None;
    }

    /// Uses a history image as inspiration (thumbnail dropped on the slot).
    pub fn set_inspiration_from_transfer(&mut self, token: TransferToken) -> SessionResult<()> {
        self.check_index(token.index())?;
        self.inspiration = Some(self.history[token.index()].image.clone());
        Ok(())
    }

    pub fn set_instruction(&mut self, instruction: impl Into<String>) {
        self.instruction = instruction.into();
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    // =========================================================================
    // EDIT LIFECYCLE
    // =========================================================================

    /// Starts an edit of the current image with the current instruction.
    ///
    /// Returns `None` without touching anything when an edit is already in
    /// flight, no image is displayed, or the instruction is blank.
    pub fn begin_edit(&mut self) -> Option<EditRequest> {
        if self.is_editing || self.instruction.trim().is_empty() {
            return None;
        }
        let source = self.current_image()?.clone();

        self.is_editing = true;
        self.error = None;
        Some(EditRequest {
            source,
            instruction: self.instruction.clone(),
            inspiration: self.inspiration.clone(),
        })
    }

    /// Finishes an edit started by [`begin_edit`](Self::begin_edit).
    ///
    /// On success the result is appended and its index returned. On failure
    /// the error message is stored and the history is left unchanged.
    pub fn complete_edit(
        &mut self,
        request: EditRequest,
        outcome: EditResult<ImageAsset>,
    ) -> Option<usize> {
        self.is_editing = false;
        match outcome {
            Ok(image) => {
                let index = self.append_edit_result(image, request.instruction);
                info!(index, "edit completed");
                Some(index)
            }
            Err(err) => {
                self.fail_edit(&err);
                None
            }
        }
    }

    fn fail_edit(&mut self, err: &EditError) {
        warn!(error = ?err, "edit failed");
        self.error = Some(err.user_message());
    }

    /// Runs one edit end to end against `editor`.
    pub async fn generate<E>(&mut self, editor: &E) -> Option<usize>
    where
        E: ImageEditor + ?Sized,
    {
        let request = self.begin_edit()?;
        let outcome = editor
            .edit_image(
                &request.source,
                &request.instruction,
                request.inspiration.as_ref(),
            )
            .await;
        self.complete_edit(request, outcome)
    }

    // =========================================================================
    // EXPORT LIFECYCLE
    // =========================================================================

    /// Starts an export of the selected entries, in ascending index order.
    ///
    /// Returns `None` when nothing is selected or an export is in flight.
    pub fn begin_export(&mut self) -> Option<Vec<ExportItem>> {
        if self.is_exporting || self.selection.is_empty() {
            return None;
        }
        let items: Vec<ExportItem> = self
            .selection
            .iter()
            .filter_map(|&index| {
                self.history.get(index).map(|entry| ExportItem {
                    index,
                    image: entry.image.clone(),
                    instruction: entry.instruction.clone(),
                })
            })
            .collect();

        self.is_exporting = true;
        Some(items)
    }

    /// Finishes an export started by [`begin_export`](Self::begin_export).
    pub fn complete_export<T>(&mut self, outcome: Result<T, ExportError>) -> Option<T> {
        self.is_exporting = false;
        match outcome {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(error = %err, "export failed");
                self.error = Some(err.user_message());
                None
            }
        }
    }

    /// Builds the archive for the current selection.
    ///
    /// An empty selection is a no-op: no archive and no error.
    pub fn export_selected(&mut self) -> Option<ExportArchive> {
        let items = self.begin_export()?;
        let outcome = build_archive(&items);
        self.complete_export(outcome)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EXPORT_FAILED_MESSAGE;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn image(tag: &str) -> ImageAsset {
        ImageAsset::from_bytes(tag.as_bytes(), "image/png", format!("{tag}.png"))
    }

    /// Returns a fixed image and records what it was asked.
    struct FixedEditor {
        result: ImageAsset,
        calls: Mutex<Vec<(ImageAsset, String, Option<ImageAsset>)>>,
    }

    impl FixedEditor {
        fn new(result: ImageAsset) -> Self {
            Self {
                result,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ImageEditor for FixedEditor {
        async fn edit_image(
            &self,
            source: &ImageAsset,
            instruction: &str,
            inspiration: Option<&ImageAsset>,
        ) -> EditResult<ImageAsset> {
            self.calls.lock().unwrap().push((
                source.clone(),
                instruction.to_string(),
                inspiration.cloned(),
            ));
            Ok(source.with_data(self.result.data.clone()))
        }
    }

    struct FailingEditor(EditError);

    #[async_trait]
    impl ImageEditor for FailingEditor {
        async fn edit_image(
            &self,
            _source: &ImageAsset,
            _instruction: &str,
            _inspiration: Option<&ImageAsset>,
        ) -> EditResult<ImageAsset> {
            Err(self.0.clone())
        }
    }

    #[test]
    fn test_first_upload_sets_cursor() {
        let mut session = EditSession::new();
        assert_eq!(session.cursor(), None);
        assert!(session.current_image().is_none());

        assert_eq!(session.append_from_upload(image("a")), 0);
        assert_eq!(session.cursor(), Some(0));
        assert_eq!(session.current_image(), Some(&image("a")));
    }

    #[test]
    fn test_later_imports_keep_cursor() {
        let mut session = EditSession::new();
        session.append_from_upload(image("a"));
        session.append_edit_result(image("b"), "edit");
        assert_eq!(session.cursor(), Some(1));

        let appended = session.import_uploads(vec![image("c"), image("d")]);
        assert_eq!(appended, 2);
        assert_eq!(session.len(), 4);
        assert_eq!(session.cursor(), Some(1));
        assert!(session.history()[3].is_upload());
    }

    #[test]
    fn test_import_filters_non_images() {
        let mut session = EditSession::new();
        let pdf = ImageAsset::new("AAAA", "application/pdf", "doc.pdf");
        let appended = session.import_uploads(vec![pdf, image("a"), image("b")]);
        assert_eq!(appended, 2);
        assert_eq!(session.len(), 2);
        assert_eq!(session.cursor(), Some(0));
        assert_eq!(session.history()[0].image, image("a"));
    }

    #[test]
    fn test_import_into_empty_session_clears_side_state() {
        let mut session = EditSession::new();
        session.set_inspiration(image("insp"));
        session.set_instruction("leftover");

        session.import_uploads(vec![image("a")]);
        assert!(session.inspiration().is_none());
        assert_eq!(session.instruction(), "");

        session.set_inspiration(image("insp"));
        session.import_uploads(vec![image("b")]);
        assert_eq!(session.inspiration(), Some(&image("insp")));
    }

    #[test]
    fn test_length_counts_appends() {
        let mut session = EditSession::new();
        let mut expected = 0;
        for i in 0..10 {
            if i % 3 == 0 {
                session.append_from_upload(image(&format!("u{i}")));
            } else {
                session.append_edit_result(image(&format!("e{i}")), format!("step {i}"));
            }
            expected += 1;
            assert_eq!(session.len(), expected);
        }
    }

    #[test]
    fn test_select_cursor_syncs_instruction() {
        let mut session = EditSession::new();
        session.append_from_upload(image("a"));
        session.append_edit_result(image("b"), "make it blue");

        session.select_cursor(1).unwrap();
        assert_eq!(session.current_image(), Some(&session.history()[1].image));
        assert_eq!(session.instruction(), "make it blue");

        session.select_cursor(0).unwrap();
        assert_eq!(session.current_image(), Some(&image("a")));
        assert_eq!(session.instruction(), "");

        assert_eq!(
            session.select_cursor(2),
            Err(SessionError::index_out_of_bounds(2, 2))
        );
        assert_eq!(session.cursor(), Some(0));
    }

    #[test]
    fn test_toggle_selection_twice_restores() {
        let mut session = EditSession::new();
        session.import_uploads(vec![image("a"), image("b"), image("c")]);
        session.toggle_selection(2).unwrap();
        let before: Vec<usize> = session.selection().collect();

        assert!(session.toggle_selection(0).unwrap());
        assert!(session.is_selected(0));
        assert!(!session.toggle_selection(0).unwrap());
        assert_eq!(session.selection().collect::<Vec<_>>(), before);

        assert!(session.toggle_selection(7).is_err());
    }

    #[test]
    fn test_start_with_upload_replaces_history() {
        let mut session = EditSession::new();
        session.import_uploads(vec![image("a"), image("b")]);
        session.toggle_selection(1).unwrap();
        session.set_inspiration(image("insp"));
        session.set_instruction("text");

        session.start_with_upload(image("fresh"));
        assert_eq!(session.len(), 1);
        assert_eq!(session.cursor(), Some(0));
        assert_eq!(session.current_image(), Some(&image("fresh")));
        assert_eq!(session.selection_len(), 0);
        assert!(session.inspiration().is_none());
        assert_eq!(session.instruction(), "");
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = EditSession::new();
        session.import_uploads(vec![image("a"), image("b")]);
        session.toggle_selection(1).unwrap();
        session.set_inspiration(image("insp"));
        session.set_instruction("text");

        session.reset();
        assert!(session.is_empty());
        assert_eq!(session.cursor(), None);
        assert_eq!(session.selection_len(), 0);
        assert!(session.inspiration().is_none());
        assert_eq!(session.instruction(), "");
        assert!(session.error().is_none());
    }

    #[test]
    fn test_inspiration_from_transfer() {
        let mut session = EditSession::new();
        session.import_uploads(vec![image("a"), image("b")]);

        let token: TransferToken = "1".parse().unwrap();
        session.set_inspiration_from_transfer(token).unwrap();
        assert_eq!(session.inspiration(), Some(&image("b")));

        let stale = TransferToken::new(5);
        assert!(session.set_inspiration_from_transfer(stale).is_err());
        assert_eq!(session.inspiration(), Some(&image("b")));

        session.clear_inspiration();
        assert!(session.inspiration().is_none());
    }

    #[test]
    fn test_begin_edit_guards() {
        let mut session = EditSession::new();
        session.set_instruction("make it blue");
        assert!(session.begin_edit().is_none(), "no image yet");

        session.append_from_upload(image("a"));
        session.set_instruction("   ");
        assert!(session.begin_edit().is_none(), "blank instruction");

        session.set_instruction("make it blue");
        let request = session.begin_edit().unwrap();
        assert!(session.is_editing());
        assert_eq!(request.source, image("a"));
        assert!(session.begin_edit().is_none(), "already busy");

        session.complete_edit(request, Err(EditError::SafetyBlocked));
        assert!(!session.is_editing());
        assert!(session.begin_edit().is_some());
    }

    #[tokio::test]
    async fn test_generate_appends_result() {
        let mut session = EditSession::new();
        session.append_from_upload(image("a"));
        session.set_instruction("make it blue");

        let editor = FixedEditor::new(image("blue"));
        let index = session.generate(&editor).await;

        assert_eq!(index, Some(1));
        assert_eq!(session.len(), 2);
        assert_eq!(session.cursor(), Some(1));
        let entry = session.current_entry().unwrap();
        assert_eq!(entry.instruction.as_deref(), Some("make it blue"));
        assert_eq!(entry.image.data, image("blue").data);
        assert_eq!(entry.image.mime_type, "image/png");
        assert!(!session.is_editing());

        let calls = editor.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, image("a"));
        assert_eq!(calls[0].1, "make it blue");
        assert_eq!(calls[0].2, None);
    }

    #[tokio::test]
    async fn test_generate_sends_inspiration() {
        let mut session = EditSession::new();
        session.append_from_upload(image("a"));
        session.set_inspiration(image("style"));
        session.set_instruction("in this style");

        let editor = FixedEditor::new(image("styled"));
        session.generate(&editor).await.unwrap();

        let calls = editor.calls.lock().unwrap();
        assert_eq!(calls[0].2, Some(image("style")));
    }

    #[tokio::test]
    async fn test_generate_failure_keeps_history() {
        let mut session = EditSession::new();
        session.append_from_upload(image("a"));
        session.set_instruction("make it blue");

        let editor = FailingEditor(EditError::from_status(503));
        assert_eq!(session.generate(&editor).await, None);

        assert_eq!(session.len(), 1);
        assert_eq!(session.cursor(), Some(0));
        assert_eq!(
            session.error(),
            Some("The AI service is currently unavailable. Please try again later.")
        );
        assert!(!session.is_editing());
    }

    #[tokio::test]
    async fn test_new_edit_clears_previous_error() {
        let mut session = EditSession::new();
        session.append_from_upload(image("a"));
        session.set_instruction("make it blue");

        session
            .generate(&FailingEditor(EditError::Configuration))
            .await;
        assert!(session.error().is_some());

        session.generate(&FixedEditor::new(image("b"))).await;
        assert!(session.error().is_none());
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn test_edit_result_lands_after_concurrent_import() {
        let mut session = EditSession::new();
        session.append_from_upload(image("a"));
        session.set_instruction("brighter");
        let request = session.begin_edit().unwrap();

        session.import_uploads(vec![image("late")]);
        let index = session.complete_edit(request, Ok(image("bright"))).unwrap();

        assert_eq!(index, 2);
        assert_eq!(session.cursor(), Some(2));
        assert_eq!(session.history()[2].instruction_str(), "brighter");
    }

    #[test]
    fn test_export_empty_selection_is_noop() {
        let mut session = EditSession::new();
        session.append_from_upload(image("a"));

        assert!(session.export_selected().is_none());
        assert!(session.error().is_none());
        assert!(!session.is_exporting());
    }

    #[test]
    fn test_export_selected() {
        let mut session = EditSession::new();
        session.append_from_upload(image("a"));
        session.append_edit_result(image("b"), "make it blue");
        session.toggle_selection(1).unwrap();
        session.toggle_selection(0).unwrap();

        let archive = session.export_selected().unwrap();
        assert_eq!(archive.file_name, "ai-images-2-selection.zip");
        assert_eq!(archive.item_count, 2);
        assert!(!session.is_exporting());
    }

    #[test]
    fn test_export_guard_and_failure() {
        let mut session = EditSession::new();
        session.append_from_upload(ImageAsset::new("***", "image/png", "bad.png"));
        session.toggle_selection(0).unwrap();

        let items = session.begin_export().unwrap();
        assert_eq!(items.len(), 1);
        assert!(session.begin_export().is_none(), "already exporting");

        let outcome = build_archive(&items);
        assert!(session.complete_export(outcome).is_none());
        assert_eq!(session.error(), Some(EXPORT_FAILED_MESSAGE));
        assert!(!session.is_exporting());
    }
}
