// blinkzero-core/src/panel.rs

//! The chat panel session and the manager that owns its lifecycle.

use std::path::Path;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info};

use crate::chat::ChatOrchestrator;
use crate::config::SettingsSource;
use crate::editor::EditorState;

/// Sent from the panel UI to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelMessage {
    Ask(String),
    Clear,
}

/// Sent from the session back to the panel UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
    Thinking,
    Answer(String),
    Error(String),
    Cleared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
}

/// One chat session. The transcript is for display only: every question is
/// answered from a freshly built exchange.
#[derive(Debug)]
pub struct ChatPanel {
    settings_source: SettingsSource,
    subscribers: Vec<UnboundedSender<PanelEvent>>,
    transcript: Vec<TranscriptEntry>,
}

impl ChatPanel {
    pub fn new(settings_source: SettingsSource) -> Self {
        Self {
            settings_source,
            subscribers: Vec::new(),
            transcript: Vec::new(),
        }
    }

    /// Registers a listener for panel events.
    pub fn subscribe(&mut self) -> UnboundedReceiver<PanelEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    fn emit(&mut self, event: PanelEvent) {
        debug!(?event, "Panel event.");
        // Receivers that were dropped are forgotten.
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn record(&mut self, speaker: Speaker, text: &str) {
        self.transcript.push(TranscriptEntry {
            speaker,
            text: text.to_string(),
        });
    }

    /// Handles one message from the panel. Nothing escapes: failures become
    /// [`PanelEvent::Error`].
    pub async fn handle(
        &mut self,
        message: PanelMessage,
        editor: Option<&EditorState>,
        workspace_root: Option<&Path>,
    ) {
        match message {
            PanelMessage::Ask(content) => {
                self.record(Speaker::User, &content);
                self.emit(PanelEvent::Thinking);
                match self.settings_source.load() {
                    Ok(settings) => {
                        let reply = ChatOrchestrator::new(settings)
                            .run_turn(&content, editor, workspace_root)
                            .await;
                        self.record(Speaker::Assistant, &reply);
                        self.emit(PanelEvent::Answer(reply));
                    }
                    Err(e) => {
                        error!(error = ?e, "Failed to load settings for chat.");
                        let text = format!("Error: {:#}", e);
                        self.record(Speaker::Error, &text);
                        self.emit(PanelEvent::Error(text));
                    }
                }
            }
            PanelMessage::Clear => {
                self.transcript.clear();
                self.emit(PanelEvent::Cleared);
            }
        }
    }
}

/// Owns at most one [`ChatPanel`].
#[derive(Debug, Default)]
pub struct PanelManager {
    settings_source: SettingsSource,
    panel: Option<ChatPanel>,
}

impl PanelManager {
    pub fn new(settings_source: SettingsSource) -> Self {
        Self {
            settings_source,
            panel: None,
        }
    }

    /// Returns the open panel, creating it on first use.
    pub fn reveal(&mut self) -> &mut ChatPanel {
        if self.panel.is_none() {
            info!("Opening chat panel.");
        }
        let source = &self.settings_source;
        self.panel.get_or_insert_with(|| ChatPanel::new(source.clone()))
    }

    /// Drops the panel and its transcript.
    pub fn dispose(&mut self) {
        if self.panel.take().is_some() {
            info!("Chat panel disposed.");
        }
    }

    pub fn is_open(&self) -> bool {
        self.panel.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn source_for(dir: &Path, base_url: &str) -> SettingsSource {
        let path = dir.join("BlinkZero.toml");
        fs::write(&path, format!("base_url = \"{}/v1\"\nmodel = \"test-model\"\n", base_url)).unwrap();
        SettingsSource::Isolated(path)
    }

    #[tokio::test]
    async fn test_ask_emits_thinking_then_answer() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(json!({
                    "id": "1",
                    "choices": [{"message": {"role": "assistant", "content": "Hello back."}}]
                }));
            })
            .await;
        let dir = tempdir().unwrap();
        let mut panel = ChatPanel::new(source_for(dir.path(), &server.base_url()));
        let mut events = panel.subscribe();

        panel.handle(PanelMessage::Ask("Hello".into()), None, None).await;

        assert_eq!(events.recv().await, Some(PanelEvent::Thinking));
        assert_eq!(events.recv().await, Some(PanelEvent::Answer("Hello back.".into())));
        assert_eq!(panel.transcript().len(), 2);
        assert_eq!(panel.transcript()[1].speaker, Speaker::Assistant);
    }

    #[tokio::test]
    async fn test_bad_settings_emit_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("BlinkZero.toml");
        fs::write(&path, "model = \"\"\n").unwrap();
        let mut panel = ChatPanel::new(SettingsSource::Isolated(path));
        let mut events = panel.subscribe();

        panel.handle(PanelMessage::Ask("Hello".into()), None, None).await;

        assert_eq!(events.recv().await, Some(PanelEvent::Thinking));
        match events.recv().await {
            Some(PanelEvent::Error(text)) => assert!(text.starts_with("Error: "), "got: {}", text),
            other => panic!("expected error event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_clear_empties_transcript() {
        let mut panel = ChatPanel::new(SettingsSource::Defaults);
        panel.record(Speaker::User, "earlier question");
        let mut events = panel.subscribe();

        panel.handle(PanelMessage::Clear, None, None).await;

        assert_eq!(events.recv().await, Some(PanelEvent::Cleared));
        assert!(panel.transcript().is_empty());
    }

    #[test]
    fn test_manager_keeps_single_panel_until_disposed() {
        let mut manager = PanelManager::new(SettingsSource::Defaults);
        assert!(!manager.is_open());

        manager.reveal().record(Speaker::User, "hi");
        assert_eq!(manager.reveal().transcript().len(), 1);

        manager.dispose();
        assert!(!manager.is_open());
        assert!(manager.reveal().transcript().is_empty());
    }

    #[test]
    fn test_dropped_subscriber_is_forgotten() {
        let mut panel = ChatPanel::new(SettingsSource::Defaults);
        drop(panel.subscribe());
        let mut live = panel.subscribe();
        panel.emit(PanelEvent::Cleared);
        assert_eq!(panel.subscribers.len(), 1);
        assert_eq!(live.try_recv().ok(), Some(PanelEvent::Cleared));
    }
}
