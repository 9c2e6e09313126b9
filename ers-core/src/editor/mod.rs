//! Editor state shared with plugins.
//!
//! This is the host side of the plugin contract: a buffer of byte rows, a
//! cursor that is either in the buffer or in the status line, and the status
//! line itself. Rendering and input handling live in front ends.

pub mod command;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::plugin::api::EditorApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorState {
    #[default]
    Default,
    StatusBar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub row: usize,
    pub col: usize,
    pub state: CursorState,
}

/// What the status-bar prompt is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptType {
    Command,
}

#[derive(Debug, Clone)]
pub struct Editor {
    rows: Vec<Vec<u8>>,
    cursor: Cursor,
    status: Vec<u8>,
    status_prompt: String,
    prompt_type: Option<PromptType>,
    file_path: Option<PathBuf>,
    unsaved_changes: bool,
}

/// Serialisable view of the editor, for scripting and tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorSnapshot {
    pub rows: Vec<String>,
    pub cursor_row: usize,
    pub cursor_col: usize,
    pub cursor_state: CursorState,
    pub status: String,
    pub file_path: Option<PathBuf>,
    pub unsaved_changes: bool,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    /// An empty buffer with a single empty row.
    pub fn new() -> Self {
        Self {
            rows: vec![Vec::new()],
            cursor: Cursor::default(),
            status: Vec::new(),
            status_prompt: String::new(),
            prompt_type: None,
            file_path: None,
            unsaved_changes: false,
        }
    }

    pub fn from_text(text: &str) -> Self {
        let mut editor = Self::new();
        editor.rows = split_rows(text.as_bytes());
        editor
    }

    /// Replaces the buffer with the contents of a file.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let contents =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

        self.rows = split_rows(&contents);
        self.cursor = Cursor::default();
        self.file_path = Some(path.to_path_buf());
        self.unsaved_changes = false;

        info!("Loaded {} rows from {:?}", self.rows.len(), path);
        Ok(())
    }

    /// Writes every row followed by a newline to the current file path.
    pub fn save_file(&mut self) -> Result<PathBuf> {
        let path = self
            .file_path
            .clone()
            .context("No file path set; use \"save <path>\"")?;

        let mut contents = Vec::with_capacity(self.rows.iter().map(|r| r.len() + 1).sum());
        for row in &self.rows {
            contents.extend_from_slice(row);
            contents.push(b'\n');
        }
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        self.unsaved_changes = false;
        info!("Saved {} rows to {:?}", self.rows.len(), path);
        Ok(path)
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn set_file_path(&mut self, path: PathBuf) {
        self.file_path = Some(path);
    }

    pub fn rows(&self) -> &[Vec<u8>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[u8]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Moves the cursor to a buffer row, clamped to the buffer.
    pub fn set_cursor_row(&mut self, row: usize) {
        self.cursor.row = row.min(self.rows.len().saturating_sub(1));
        self.clamp_col();
    }

    /// Inserts bytes at the cursor in the current row and advances the cursor.
    pub fn insert_bytes(&mut self, bytes: &[u8]) {
        let col = self.cursor.col;
        let row = self.current_row_mut();
        let col = col.min(row.len());
        row.splice(col..col, bytes.iter().copied());
        self.cursor.col = col + bytes.len();
        if self.cursor.state == CursorState::Default {
            self.unsaved_changes = true;
        }
    }

    pub fn status(&self) -> &[u8] {
        &self.status
    }

    pub fn set_status(&mut self, status: &[u8]) {
        debug!(status = %String::from_utf8_lossy(status), "Status updated");
        self.status = status.to_vec();
        if self.cursor.state == CursorState::StatusBar {
            self.clamp_col();
        }
    }

    pub fn status_prompt(&self) -> &str {
        &self.status_prompt
    }

    pub fn prompt_type(&self) -> Option<PromptType> {
        self.prompt_type
    }

    pub fn is_dirty(&self) -> bool {
        self.unsaved_changes
    }

    /// Moves focus to the status line and starts a prompt.
    pub fn open_prompt(&mut self, prompt: impl Into<String>, prompt_type: PromptType) {
        self.cursor.state = CursorState::StatusBar;
        self.cursor.col = 0;
        self.status.clear();
        self.status_prompt = prompt.into();
        self.prompt_type = Some(prompt_type);
    }

    pub fn open_command_prompt(&mut self) {
        self.open_prompt(":", PromptType::Command);
    }

    /// Abandons the prompt and returns focus to the buffer.
    pub fn close_prompt(&mut self) {
        self.cursor.state = CursorState::Default;
        self.status_prompt.clear();
        self.prompt_type = None;
        self.clamp_col();
    }

    /// Ends the prompt, returning what was typed into the status line.
    pub fn take_prompt_input(&mut self) -> Option<(PromptType, String)> {
        let prompt_type = self.prompt_type?;
        let input = String::from_utf8_lossy(&std::mem::take(&mut self.status)).into_owned();
        self.close_prompt();
        Some((prompt_type, input))
    }

    pub fn snapshot(&self) -> EditorSnapshot {
        EditorSnapshot {
            rows: self
                .rows
                .iter()
                .map(|r| String::from_utf8_lossy(r).into_owned())
                .collect(),
            cursor_row: self.cursor.row,
            cursor_col: self.cursor.col,
            cursor_state: self.cursor.state,
            status: String::from_utf8_lossy(&self.status).into_owned(),
            file_path: self.file_path.clone(),
            unsaved_changes: self.unsaved_changes,
        }
    }

    /// The row under the cursor: the status line while it has focus.
    pub fn current_row(&self) -> &[u8] {
        match self.cursor.state {
            CursorState::Default => &self.rows[self.cursor.row],
            CursorState::StatusBar => &self.status,
        }
    }

    fn current_row_mut(&mut self) -> &mut Vec<u8> {
        match self.cursor.state {
            CursorState::Default => &mut self.rows[self.cursor.row],
            CursorState::StatusBar => &mut self.status,
        }
    }

    pub fn update_current_row(&mut self, row: &[u8]) {
        *self.current_row_mut() = row.to_vec();
        if self.cursor.state == CursorState::Default {
            self.unsaved_changes = true;
        }
        self.clamp_col();
    }

    fn clamp_col(&mut self) {
        let len = self.current_row().len();
        if self.cursor.col > len {
            self.cursor.col = len;
        }
    }
}

impl EditorApi for Editor {
    fn set_status(&mut self, status: &[u8]) {
        Editor::set_status(self, status);
    }

    fn current_row(&self) -> &[u8] {
        Editor::current_row(self)
    }

    fn update_current_row(&mut self, row: &[u8]) {
        Editor::update_current_row(self, row);
    }

    fn is_cursor_in_status(&self) -> bool {
        self.cursor.state == CursorState::StatusBar
    }
}

/// Splits file contents into rows. A trailing newline does not start a new row.
fn split_rows(contents: &[u8]) -> Vec<Vec<u8>> {
    let contents = contents.strip_suffix(b"\n").unwrap_or(contents);
    contents.split(|&b| b == b'\n').map(<[u8]>::to_vec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_editor_has_one_empty_row() {
        let editor = Editor::new();
        assert_eq!(editor.rows().len(), 1);
        assert_eq!(editor.current_row(), b"");
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_from_text_rows() {
        let editor = Editor::from_text("one\ntwo\n");
        assert_eq!(editor.rows(), &[b"one".to_vec(), b"two".to_vec()]);
        assert_eq!(Editor::from_text("").rows().len(), 1);
        assert_eq!(Editor::from_text("a\n\nb").rows().len(), 3);
    }

    #[test]
    fn test_current_row_follows_focus() {
        let mut editor = Editor::from_text("first\nsecond");
        editor.set_cursor_row(1);
        assert_eq!(editor.current_row(), b"second");
        assert!(!editor.is_cursor_in_status());

        editor.open_command_prompt();
        editor.insert_bytes(b"quit");
        assert!(editor.is_cursor_in_status());
        assert_eq!(editor.current_row(), b"quit");

        editor.update_current_row(b"load x");
        assert_eq!(editor.status(), b"load x");
        assert_eq!(editor.row(1), Some(&b"second"[..]));
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_update_current_row_marks_dirty() {
        let mut editor = Editor::from_text("abc");
        editor.update_current_row(b"abcdef");
        assert_eq!(editor.row(0), Some(&b"abcdef"[..]));
        assert!(editor.is_dirty());
    }

    #[test]
    fn test_insert_bytes_at_cursor() {
        let mut editor = Editor::from_text("held");
        editor.insert_bytes(b"w");
        assert_eq!(editor.current_row(), b"wheld");
        assert_eq!(editor.cursor().col, 1);
    }

    #[test]
    fn test_set_cursor_row_clamps() {
        let mut editor = Editor::from_text("a\nb");
        editor.set_cursor_row(10);
        assert_eq!(editor.cursor().row, 1);
    }

    #[test]
    fn test_take_prompt_input() {
        let mut editor = Editor::new();
        assert!(editor.take_prompt_input().is_none());

        editor.open_command_prompt();
        assert_eq!(editor.status_prompt(), ":");
        editor.insert_bytes(b"hello");

        let (prompt_type, input) = editor.take_prompt_input().unwrap();
        assert_eq!(prompt_type, PromptType::Command);
        assert_eq!(input, "hello");
        assert_eq!(editor.cursor().state, CursorState::Default);
        assert!(editor.status().is_empty());
        assert!(editor.prompt_type().is_none());
    }

    #[test]
    fn test_load_and_save_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        std::fs::write(&path, "alpha\nbeta\n").unwrap();

        let mut editor = Editor::new();
        editor.load_file(&path).unwrap();
        assert_eq!(editor.rows().len(), 2);
        assert_eq!(editor.file_path(), Some(path.as_path()));

        editor.update_current_row(b"ALPHA");
        assert!(editor.is_dirty());
        let saved = editor.save_file().unwrap();
        assert_eq!(saved, path);
        assert!(!editor.is_dirty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ALPHA\nbeta\n");
    }

    #[test]
    fn test_load_missing_file() {
        let mut editor = Editor::new();
        let err = editor.load_file(Path::new("/nonexistent/file.txt")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/file.txt"));
    }

    #[test]
    fn test_save_without_path() {
        let mut editor = Editor::from_text("x");
        assert!(editor.save_file().is_err());
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut editor = Editor::from_text("row");
        editor.set_status(b"ready");
        let snapshot = editor.snapshot();
        assert_eq!(snapshot.rows, vec!["row".to_string()]);
        assert_eq!(snapshot.status, "ready");

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["cursor_state"], "default");
        assert_eq!(json["rows"][0], "row");
    }
}
