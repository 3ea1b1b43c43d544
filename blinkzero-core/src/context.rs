// blinkzero-core/src/context.rs

//! Expands `@selection`, `@file` and `@workspace` directives into a
//! system/user message pair.

use anyhow::{anyhow, Result};
use ignore::WalkBuilder;
use std::path::Path;
use tracing::{debug, error};

use crate::editor::EditorState;

pub const SELECTION_DIRECTIVE: &str = "@selection";
pub const FILE_DIRECTIVE: &str = "@file";
pub const WORKSPACE_DIRECTIVE: &str = "@workspace";

/// Replaces `@selection` when the editor has nothing selected.
pub const NO_SELECTION_PLACEHOLDER: &str = "(no text selected)";

/// Maximum number of files listed for `@workspace`.
pub const WORKSPACE_FILE_LIMIT: usize = 20;

const SOURCE_EXTENSIONS: &[&str] = &[
    "ts", "js", "py", "java", "cpp", "c", "h", "hpp", "cs", "go", "rs", "php", "rb",
];

const EXCLUDED_DIRS: &[&str] = &["node_modules", ".git", "dist", "build", "out", "target"];

const BASE_SYSTEM_PROMPT: &str = "You are a senior software engineer and coding assistant. You provide helpful, accurate, and concise responses.

Guidelines:
- Prefer minimal, safe changes that preserve existing functionality
- Follow the existing code style and conventions
- Provide clear explanations for your suggestions
- When suggesting code changes, use proper diff format
- Be specific and actionable in your recommendations";

/// The assembled `{system, user}` pair for one chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContext {
    pub system: String,
    pub user: String,
}

/// Builds the prompt pair. Never fails: a workspace listing error becomes an
/// inline `<workspace>` annotation.
pub fn collect_context(
    raw_prompt: &str,
    editor: Option<&EditorState>,
    workspace_root: Option<&Path>,
) -> PromptContext {
    let mut system = BASE_SYSTEM_PROMPT.to_string();
    let mut user = raw_prompt.to_string();

    let has_selection = raw_prompt.contains(SELECTION_DIRECTIVE);
    let has_file = raw_prompt.contains(FILE_DIRECTIVE);
    let has_workspace = raw_prompt.contains(WORKSPACE_DIRECTIVE);

    if let (true, Some(editor)) = (has_selection, editor) {
        let selection = editor.selected_text();
        if selection.trim().is_empty() {
            user = user.replace(SELECTION_DIRECTIVE, NO_SELECTION_PLACEHOLDER);
        } else {
            user = user.replace(SELECTION_DIRECTIVE, "");
            user.push_str(&format!("\n\n<selection>\n{}\n</selection>", selection));
            system.push_str(&format!(
                "\n\nThe user has selected code from {} ({}).",
                editor.document.file_name(),
                editor.document.language_id
            ));
        }
    }

    if let (true, Some(editor)) = (has_file, editor) {
        let document = &editor.document;
        let file_name = document.file_name();
        user = user.replace(FILE_DIRECTIVE, "");
        user.push_str(&format!(
            "\n\n<file name=\"{}\" path=\"{}\" language=\"{}\">\n{}\n</file>",
            file_name,
            document.relative_path(workspace_root),
            document.language_id,
            document.text
        ));
        system.push_str(&format!(
            "\n\nThe user is working with {} ({}).",
            file_name, document.language_id
        ));
    }

    if let (true, Some(root)) = (has_workspace, workspace_root) {
        user = user.replace(WORKSPACE_DIRECTIVE, "");
        match list_source_files(root, WORKSPACE_FILE_LIMIT) {
            Ok(files) => {
                let name = workspace_name(root);
                let listing = files
                    .iter()
                    .map(|f| format!("- {}", f))
                    .collect::<Vec<_>>()
                    .join("\n");
                user.push_str(&format!(
                    "\n\n<workspace name=\"{}\">\nKey files:\n{}\n</workspace>",
                    name, listing
                ));
                system.push_str(&format!(
                    "\n\nThe user is working in the \"{}\" workspace.",
                    name
                ));
            }
            Err(e) => {
                error!(error = ?e, root = %root.display(), "Error collecting workspace context.");
                user.push_str("\n\n<workspace>(error collecting workspace information)</workspace>");
            }
        }
    }

    if !has_selection && !has_file && !has_workspace {
        if let Some(editor) = editor {
            system.push_str(&format!(
                "\n\nThe user is currently editing {} ({}).",
                editor.document.file_name(),
                editor.document.language_id
            ));
        }
    }

    if let Some(root) = workspace_root {
        system.push_str(&format!("\n\nWorkspace: {}", workspace_name(root)));
    }

    PromptContext {
        system: system.trim().to_string(),
        user: user.trim().to_string(),
    }
}

fn workspace_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string())
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// Lists up to `limit` source files under `root`, relative to it, in
/// file-name order. Hidden entries and build/dependency directories are skipped.
pub fn list_source_files(root: &Path, limit: usize) -> Result<Vec<String>> {
    if !root.is_dir() {
        return Err(anyhow!("Workspace root is not a directory: {:?}", root));
    }

    let mut walker_builder = WalkBuilder::new(root);
    walker_builder
        .hidden(true)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(true)
        .parents(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !(is_dir && entry.depth() > 0 && EXCLUDED_DIRS.iter().any(|d| entry.file_name() == *d))
        });

    let mut files = Vec::new();
    for result in walker_builder.build() {
        if files.len() >= limit {
            break;
        }
        match result {
            Ok(entry) => {
                if !entry.file_type().is_some_and(|ft| ft.is_file()) || !is_source_file(entry.path()) {
                    continue;
                }
                let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                // Forward slashes on every platform, like a glob result.
                files.push(relative.to_string_lossy().replace('\\', "/"));
            }
            Err(err) => {
                if err.depth() == Some(0) {
                    return Err(anyhow!("Failed to read workspace root {:?}: {}", root, err));
                }
                debug!("Warning during workspace walk: {}", err);
            }
        }
    }
    Ok(files)
}
