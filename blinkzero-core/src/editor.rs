// blinkzero-core/src/editor.rs

//! Host-independent view of the editor: the active document and its selection.
//!
//! Positions are zero-based. `character` counts Unicode scalar values within
//! the line, not bytes.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Position {
    pub line: usize,
    pub character: usize,
}

impl Position {
    pub fn new(line: usize, character: usize) -> Self {
        Self { line, character }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub start: Position,
    pub end: Position,
}

impl Selection {
    pub fn new(start: Position, end: Position) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A text document with the language id an editor would assign it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    pub path: PathBuf,
    pub language_id: String,
    pub text: String,
}

impl TextDocument {
    pub fn new(path: impl Into<PathBuf>, language_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            language_id: language_id.into(),
            text: text.into(),
        }
    }

    /// Reads a document from disk, inferring its language from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read document: {:?}", path))?;
        Ok(Self::new(path, language_for_path(path), text))
    }

    /// Base name of the document, e.g. `foo.py`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Path relative to `workspace_root`, or the full path when outside it.
    pub fn relative_path(&self, workspace_root: Option<&Path>) -> String {
        workspace_root
            .and_then(|root| self.path.strip_prefix(root).ok())
            .map(|rel| rel.display().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    fn lines(&self) -> Vec<&str> {
        // `split('\n')` keeps a trailing empty line, like an editor does.
        self.text.split('\n').collect()
    }

    pub fn line_count(&self) -> usize {
        self.lines().len()
    }

    /// Text of one line without its terminator. Out-of-range lines are empty.
    pub fn line_text(&self, line: usize) -> &str {
        self.text
            .split('\n')
            .nth(line)
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or("")
    }

    /// Clamps a position to the document bounds.
    pub fn clamp(&self, position: Position) -> Position {
        let last_line = self.line_count().saturating_sub(1);
        let line = position.line.min(last_line);
        let max_char = self.line_text(line).chars().count();
        Position::new(line, position.character.min(max_char))
    }

    /// Byte offset of a (clamped) position.
    fn offset_of(&self, position: Position) -> usize {
        let position = self.clamp(position);
        let mut offset = 0;
        for (index, line) in self.text.split('\n').enumerate() {
            if index == position.line {
                let in_line = line
                    .char_indices()
                    .nth(position.character)
                    .map(|(byte, _)| byte)
                    .unwrap_or(line.len());
                return offset + in_line;
            }
            offset += line.len() + 1;
        }
        self.text.len()
    }

    /// Text between two positions.
    pub fn text_range(&self, start: Position, end: Position) -> &str {
        let (from, to) = (self.offset_of(start), self.offset_of(end));
        if from <= to {
            &self.text[from..to]
        } else {
            ""
        }
    }
}

/// The active editor: a document and an optional selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
    pub document: TextDocument,
    pub selection: Option<Selection>,
}

impl EditorState {
    pub fn new(document: TextDocument, selection: Option<Selection>) -> Self {
        Self { document, selection }
    }

    /// The selected text, or an empty string when nothing is selected.
    pub fn selected_text(&self) -> &str {
        match self.selection {
            Some(sel) if !sel.is_empty() => self.document.text_range(sel.start, sel.end),
            _ => "",
        }
    }

    /// Selection covering whole 1-based inclusive lines `first..=last`.
    pub fn select_lines(&mut self, first: usize, last: usize) {
        let first = first.max(1) - 1;
        let last = last.max(1) - 1;
        let (first, last) = (first.min(last), first.max(last));
        let end_char = self.document.line_text(last).chars().count();
        self.selection = Some(Selection::new(
            Position::new(first, 0),
            Position::new(last, end_char),
        ));
    }
}

/// Maps a file extension to an editor language id.
pub fn language_for_path(path: &Path) -> String {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let id = match ext.as_str() {
        "ts" | "tsx" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "py" => "python",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" | "hh" => "cpp",
        "cs" => "csharp",
        "go" => "go",
        "rs" => "rust",
        "php" => "php",
        "rb" => "ruby",
        "md" => "markdown",
        "json" => "json",
        "toml" => "toml",
        "yaml" | "yml" => "yaml",
        "sh" | "bash" => "shellscript",
        "html" | "htm" => "html",
        "css" => "css",
        _ => "plaintext",
    };
    id.to_string()
}
