// blinkzero-cli/src/host.rs

//! The terminal as a [`TaskHost`]: messages on stdout/stderr, spinners for
//! progress, dialoguer prompts for choices and input.

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use blinkzero_core::{
    async_trait, EditorState, PanelManager, ScratchDocument, SettingsSource, TaskHost,
};

use crate::rendering::{print_code, print_formatted};
use crate::repl;
use crate::terminal::run_in_shell;

pub struct CliHost {
    editor: Option<EditorState>,
    workspace_root: PathBuf,
    settings_source: SettingsSource,
    /// Answers supplied on the command line, consumed before prompting.
    preset_inputs: Mutex<VecDeque<String>>,
    spinner: Mutex<Option<ProgressBar>>,
    panels: tokio::sync::Mutex<PanelManager>,
    failed: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "-"]));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

impl CliHost {
    pub fn new(workspace_root: PathBuf, settings_source: SettingsSource) -> Self {
        Self {
            editor: None,
            panels: tokio::sync::Mutex::new(PanelManager::new(settings_source.clone())),
            workspace_root,
            settings_source,
            preset_inputs: Mutex::new(VecDeque::new()),
            spinner: Mutex::new(None),
            failed: AtomicBool::new(false),
        }
    }

    pub fn with_editor(mut self, editor: Option<EditorState>) -> Self {
        self.editor = editor;
        self
    }

    /// Queues an answer for the next `input` prompt.
    pub fn preset_input(self, answer: impl Into<String>) -> Self {
        lock(&self.preset_inputs).push_back(answer.into());
        self
    }

    pub fn settings_source(&self) -> &SettingsSource {
        &self.settings_source
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace_root
    }

    pub fn editor(&self) -> Option<&EditorState> {
        self.editor.as_ref()
    }

    pub fn panels(&self) -> &tokio::sync::Mutex<PanelManager> {
        &self.panels
    }

    /// True once any error has been shown.
    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::Relaxed)
    }

    fn clear_spinner(&self) {
        if let Some(pb) = lock(&self.spinner).take() {
            pb.finish_and_clear();
        }
    }
}

#[async_trait]
impl TaskHost for CliHost {
    fn active_editor(&self) -> Option<EditorState> {
        self.editor.clone()
    }

    fn workspace_root(&self) -> Option<PathBuf> {
        Some(self.workspace_root.clone())
    }

    fn show_info(&self, message: &str) {
        self.clear_spinner();
        info!("{}", message);
        println!("{}", message.cyan());
    }

    fn show_warning(&self, message: &str) {
        self.clear_spinner();
        warn!("{}", message);
        eprintln!("{} {}", "Warning:".yellow().bold(), message);
    }

    fn show_error(&self, message: &str) {
        self.clear_spinner();
        self.failed.store(true, Ordering::Relaxed);
        error!("{}", message);
        eprintln!("{} {}", "Error:".red().bold(), message);
    }

    fn begin_progress(&self, title: &str) {
        let previous = lock(&self.spinner).replace(spinner(title));
        if let Some(pb) = previous {
            pb.finish_and_clear();
        }
    }

    fn end_progress(&self) {
        self.clear_spinner();
    }

    async fn open_document(&self, document: ScratchDocument) -> Result<()> {
        self.clear_spinner();
        println!();
        let rendered = if document.language == "markdown" {
            print_formatted(&document.content)
        } else {
            print_code(&document.content, &document.language)
        };
        if let Err(e) = rendered {
            error!("Failed to render document: {}. Printing raw.", e);
            println!("{}", document.content);
        }
        println!();
        Ok(())
    }

    async fn choose(&self, prompt: &str, options: &[&str]) -> Option<String> {
        self.clear_spinner();
        let prompt = prompt.to_string();
        let items: Vec<String> = options.iter().map(|s| s.to_string()).collect();
        let selection = tokio::task::spawn_blocking(move || {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .items(&items)
                .default(0)
                .interact_opt()
                .map(|index| index.and_then(|i| items.get(i).cloned()))
        })
        .await;
        match selection {
            Ok(Ok(choice)) => choice,
            Ok(Err(e)) => {
                warn!(error = %e, "Choice prompt unavailable.");
                None
            }
            Err(e) => {
                error!(error = %e, "Choice prompt task failed.");
                None
            }
        }
    }

    async fn input(&self, prompt: &str, placeholder: &str) -> Option<String> {
        if let Some(answer) = lock(&self.preset_inputs).pop_front() {
            debug!(prompt, "Using preset input.");
            return Some(answer);
        }
        self.clear_spinner();
        println!("{}", placeholder.dimmed());
        let prompt = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            Input::<String>::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
        })
        .await;
        match answer {
            Ok(Ok(answer)) => Some(answer),
            Ok(Err(e)) => {
                warn!(error = %e, "Input prompt unavailable.");
                None
            }
            Err(e) => {
                error!(error = %e, "Input prompt task failed.");
                None
            }
        }
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write file {:?}", path))?;
        info!(path = %path.display(), "Wrote file.");
        Ok(())
    }

    async fn run_in_terminal(&self, command: &str) -> Result<()> {
        self.clear_spinner();
        println!("{} {}", "$".green().bold(), command);
        let owned = command.to_string();
        let dir = self.workspace_root.clone();
        let code = tokio::task::spawn_blocking(move || run_in_shell(&owned, &dir))
            .await
            .context("Terminal command task failed")??;
        if code != 0 {
            println!("{}", format!("(exit status {})", code).dimmed());
        }
        Ok(())
    }

    async fn open_chat(&self) -> Result<()> {
        repl::run_interactive(self).await
    }
}
