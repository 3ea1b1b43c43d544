// blinkzero-core/src/tasks.rs

//! One-shot commands (explain, write tests, refactor and friends) written
//! against the [`TaskHost`] seam so any editor front end can drive them.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::client::LlmClient;
use crate::config::{Settings, SettingsSource};
use crate::editor::EditorState;
use crate::models::chat::{ChatMessage, ChatRequest};
use crate::tools::server_status;

const NO_EDITOR: &str = "No active editor found. Please open a file first.";

const EXPLAIN_SYSTEM_PROMPT: &str = "You are a code explanation expert. Explain code clearly and concisely, covering:
- What the code does (high-level purpose)
- How it works (key logic and flow)
- Important details (algorithms, patterns, edge cases)
- Any potential issues or improvements

Keep explanations accessible but thorough.";

const TESTS_SYSTEM_PROMPT: &str = "You are a test generation expert. Generate comprehensive unit tests that:
- Cover main functionality and edge cases
- Follow testing best practices for the language
- Include setup/teardown if needed
- Use appropriate testing framework conventions
- Are deterministic and reliable
- Include clear test descriptions

Generate complete, runnable test code.";

const REFACTOR_SYSTEM_PROMPT: &str = "You are a code refactoring expert. Refactor code to improve:
- Readability and maintainability
- Performance where applicable
- Code organization and structure
- Following language best practices
- Removing code smells

Preserve the original behavior exactly. Provide the refactored code and explain the changes made.";

/// A new unsaved document for the host to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchDocument {
    pub content: String,
    pub language: String,
}

impl ScratchDocument {
    pub fn new(content: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            language: language.into(),
        }
    }

    pub fn markdown(content: impl Into<String>) -> Self {
        Self::new(content, "markdown")
    }
}

/// What a command needs from the editor it runs in.
#[async_trait]
pub trait TaskHost: Send + Sync {
    fn active_editor(&self) -> Option<EditorState>;
    fn workspace_root(&self) -> Option<PathBuf>;

    fn show_info(&self, message: &str);
    fn show_warning(&self, message: &str);
    fn show_error(&self, message: &str);

    fn begin_progress(&self, title: &str);
    fn end_progress(&self);

    async fn open_document(&self, document: ScratchDocument) -> Result<()>;
    /// Offers `options`; `None` when dismissed.
    async fn choose(&self, prompt: &str, options: &[&str]) -> Option<String>;
    /// Asks for free text; `None` when dismissed.
    async fn input(&self, prompt: &str, placeholder: &str) -> Option<String>;
    async fn write_file(&self, path: &Path, content: &str) -> Result<()>;
    async fn run_in_terminal(&self, command: &str) -> Result<()>;
    async fn open_chat(&self) -> Result<()>;
}

/// Palette commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    OpenChat,
    ApplyDiff,
    ExplainSelection,
    WriteTests,
    RefactorFunction,
    RunShellCommand,
    CheckConnection,
    ShowModelInfo,
}

impl Command {
    pub const ALL: [Command; 8] = [
        Command::OpenChat,
        Command::ApplyDiff,
        Command::ExplainSelection,
        Command::WriteTests,
        Command::RefactorFunction,
        Command::RunShellCommand,
        Command::CheckConnection,
        Command::ShowModelInfo,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Command::OpenChat => "blinkzero.chat.open",
            Command::ApplyDiff => "blinkzero.applyDiff",
            Command::ExplainSelection => "blinkzero.explainSelection",
            Command::WriteTests => "blinkzero.writeTests",
            Command::RefactorFunction => "blinkzero.refactorFunction",
            Command::RunShellCommand => "blinkzero.runShellCommand",
            Command::CheckConnection => "blinkzero.tools.checkConnection",
            Command::ShowModelInfo => "blinkzero.tools.showModelInfo",
        }
    }

    pub fn from_id(id: &str) -> Option<Command> {
        Command::ALL.into_iter().find(|c| c.id() == id)
    }
}

/// Runs a palette command with freshly loaded settings.
pub async fn execute<H: TaskHost + ?Sized>(command: Command, host: &H, settings_source: &SettingsSource) {
    info!(command = command.id(), "Executing command.");
    if command == Command::OpenChat {
        if let Err(e) = host.open_chat().await {
            host.show_error(&format!("Failed to open chat: {:#}", e));
        }
        return;
    }

    let settings = match settings_source.load() {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = ?e, "Failed to load settings.");
            host.show_error(&format!("Failed to load settings: {:#}", e));
            return;
        }
    };

    match command {
        Command::OpenChat => {}
        Command::ApplyDiff => apply_diff(host).await,
        Command::ExplainSelection => explain_selection(host, &settings).await,
        Command::WriteTests => write_tests(host, &settings).await,
        Command::RefactorFunction => refactor_function(host, &settings).await,
        Command::RunShellCommand => run_shell_command(host).await,
        Command::CheckConnection => check_connection(host, &settings).await,
        Command::ShowModelInfo => show_model_info(host, &settings).await,
    }
}

async fn with_progress<H, F, T>(host: &H, title: &str, work: F) -> T
where
    H: TaskHost + ?Sized,
    F: Future<Output = T>,
{
    host.begin_progress(title);
    let result = work.await;
    host.end_progress();
    result
}

/// One system/user completion; `fallback` stands in for missing content.
async fn complete_once(
    settings: &Settings,
    system: &str,
    user: String,
    temperature: f64,
    max_tokens: u32,
    fallback: &str,
) -> Result<String> {
    let client = LlmClient::new(settings)?;
    let request = ChatRequest::new(
        client.model(),
        vec![ChatMessage::system(system), ChatMessage::user(user)],
    )
    .temperature(temperature)
    .max_tokens(max_tokens);
    let response = client.chat_completion(&request).await?;
    Ok(response
        .first_content()
        .map(String::from)
        .unwrap_or_else(|| fallback.to_string()))
}

fn report_failure<H: TaskHost + ?Sized>(host: &H, what: &str, result: Result<()>) {
    if let Err(e) = result {
        error!(error = ?e, "{} failed.", what);
        host.show_error(&format!("Failed to {}: {:#}", what, e));
    }
}

/// Explains the selection, or the whole file when nothing is selected.
pub async fn explain_selection<H: TaskHost + ?Sized>(host: &H, settings: &Settings) {
    let result = try_explain_selection(host, settings).await;
    report_failure(host, "explain code", result);
}

async fn try_explain_selection<H: TaskHost + ?Sized>(host: &H, settings: &Settings) -> Result<()> {
    let Some(editor) = host.active_editor() else {
        host.show_warning(NO_EDITOR);
        return Ok(());
    };

    let selection = editor.selected_text().trim();
    let text = if selection.is_empty() {
        editor.document.text.as_str()
    } else {
        selection
    };
    if text.trim().is_empty() {
        host.show_warning(
            "No code to explain. Please select some code or ensure the file has content.",
        );
        return Ok(());
    }

    let file_name = editor.document.path.display().to_string();
    let lang = &editor.document.language_id;
    let user = format!(
        "Please explain this {} code from {}:\n\n```{}\n{}\n```",
        lang, file_name, lang, text
    );

    let explanation = with_progress(
        host,
        "Explaining code...",
        complete_once(settings, EXPLAIN_SYSTEM_PROMPT, user, 0.3, 1000, "No explanation generated."),
    )
    .await?;

    let content = format!(
        "# Code Explanation\n\nFile: {file}\nLanguage: {lang}\n\n## Code\n\n```{lang}\n{text}\n```\n\n## Explanation\n\n{explanation}",
        file = file_name,
        lang = lang,
        text = text,
        explanation = explanation
    );
    host.open_document(ScratchDocument::markdown(content)).await
}

/// Generates tests for the whole active file and offers to save them.
pub async fn write_tests<H: TaskHost + ?Sized>(host: &H, settings: &Settings) {
    let result = try_write_tests(host, settings).await;
    report_failure(host, "generate tests", result);
}

async fn try_write_tests<H: TaskHost + ?Sized>(host: &H, settings: &Settings) -> Result<()> {
    let Some(editor) = host.active_editor() else {
        host.show_warning(NO_EDITOR);
        return Ok(());
    };
    let document = &editor.document;
    if document.text.trim().is_empty() {
        host.show_warning("File is empty. Please add some code first.");
        return Ok(());
    }

    let lang = &document.language_id;
    let user = format!(
        "Generate unit tests for this {} code from {}:\n\n```{}\n{}\n```",
        lang,
        document.path.display(),
        lang,
        document.text
    );
    let tests = with_progress(
        host,
        "Generating tests...",
        complete_once(settings, TESTS_SYSTEM_PROMPT, user, 0.2, 2000, "No tests generated."),
    )
    .await?;

    let workspace_root = host.workspace_root();
    let relative = document.relative_path(workspace_root.as_deref());
    let test_name = test_file_name(Path::new(&relative), lang);
    host.open_document(ScratchDocument::new(tests.clone(), lang.clone()))
        .await?;

    let prompt = format!("Tests generated! Save as {}?", test_name.display());
    if host.choose(&prompt, &["Save", "Don't Save"]).await.as_deref() != Some("Save") {
        return Ok(());
    }
    let Some(root) = workspace_root else {
        host.show_warning("No workspace folder is open; tests were not saved.");
        return Ok(());
    };
    let target = root.join(&test_name);
    host.write_file(&target, &tests)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;
    host.show_info(&format!("Tests saved to {}", test_name.display()));
    Ok(())
}

/// Suggests a refactoring of the selection. Applying it is left to the user.
pub async fn refactor_function<H: TaskHost + ?Sized>(host: &H, settings: &Settings) {
    let result = try_refactor_function(host, settings).await;
    report_failure(host, "refactor code", result);
}

async fn try_refactor_function<H: TaskHost + ?Sized>(host: &H, settings: &Settings) -> Result<()> {
    let Some(editor) = host.active_editor() else {
        host.show_warning(NO_EDITOR);
        return Ok(());
    };
    let selection = editor.selected_text();
    if selection.trim().is_empty() {
        host.show_warning("Please select the code you want to refactor.");
        return Ok(());
    }

    let file_name = editor.document.path.display().to_string();
    let lang = &editor.document.language_id;
    let user = format!(
        "Please refactor this {} code from {}:\n\n```{}\n{}\n```\n\nProvide the refactored code and explain what improvements were made.",
        lang, file_name, lang, selection
    );
    let refactored = with_progress(
        host,
        "Refactoring code...",
        complete_once(
            settings,
            REFACTOR_SYSTEM_PROMPT,
            user,
            0.2,
            1500,
            "No refactoring suggestions generated.",
        ),
    )
    .await?;

    let content = format!(
        "# Refactored Code\n\nFile: {file}\nLanguage: {lang}\n\n## Original Code\n\n```{lang}\n{selection}\n```\n\n## Refactored Version\n\n{refactored}",
        file = file_name,
        lang = lang,
        selection = selection,
        refactored = refactored
    );
    host.open_document(ScratchDocument::markdown(content)).await?;

    if host
        .choose("Apply the refactoring to your code?", &["Apply", "Don't Apply"])
        .await
        .as_deref()
        == Some("Apply")
    {
        host.show_info("Please manually copy the refactored code. Automatic application will be improved in future versions.");
    }
    Ok(())
}

/// Shows a pasted diff for manual application.
pub async fn apply_diff<H: TaskHost + ?Sized>(host: &H) {
    let result = try_apply_diff(host).await;
    report_failure(host, "apply diff", result);
}

async fn try_apply_diff<H: TaskHost + ?Sized>(host: &H) -> Result<()> {
    let Some(diff) = host
        .input("Paste the unified diff to apply", "Paste unified diff here...")
        .await
        .filter(|d| !d.trim().is_empty())
    else {
        return Ok(());
    };
    if host.active_editor().is_none() {
        host.show_warning(NO_EDITOR);
        return Ok(());
    }

    host.show_info("Diff application is simplified in this MVP. Please apply changes manually. Future versions will include automatic diff application.");
    let content = format!(
        "# Diff to Apply\n\n```diff\n{}\n```\n\nPlease apply these changes manually to your code.",
        diff
    );
    host.open_document(ScratchDocument::markdown(content)).await
}

/// Asks for a command and hands it to the host terminal.
pub async fn run_shell_command<H: TaskHost + ?Sized>(host: &H) {
    let result = try_run_shell_command(host).await;
    report_failure(host, "run command", result);
}

async fn try_run_shell_command<H: TaskHost + ?Sized>(host: &H) -> Result<()> {
    let Some(command) = host
        .input("Enter the command to run", "e.g., npm install, git status, ls -la")
        .await
        .filter(|c| !c.trim().is_empty())
    else {
        return Ok(());
    };
    host.run_in_terminal(&command).await?;
    host.show_info(&format!("Running command: {}", command));
    Ok(())
}

/// Probes the model listing endpoint.
pub async fn check_connection<H: TaskHost + ?Sized>(host: &H, settings: &Settings) {
    let probe = async {
        let client = LlmClient::new(settings)?;
        client.list_models().await
    };
    match with_progress(host, "Checking Local LLM connection...", probe).await {
        Ok(models) => {
            debug!(?models, "Model listing succeeded.");
            host.show_info("✅ Local LLM connection successful!");
        }
        Err(e) => {
            error!(error = ?e, "Connection check failed.");
            host.show_error(&format!("❌ Local LLM connection failed: {}", e));
        }
    }
}

/// Shows configuration and tool-server status as a markdown document.
pub async fn show_model_info<H: TaskHost + ?Sized>(host: &H, settings: &Settings) {
    let result = try_show_model_info(host, settings).await;
    report_failure(host, "show model info", result);
}

async fn try_show_model_info<H: TaskHost + ?Sized>(host: &H, settings: &Settings) -> Result<()> {
    let client = LlmClient::new(settings)?;
    let status = server_status(settings, client.http()).await;
    let status_line = if status.connected {
        format!("Connected ({} tools available)", status.available_tools.len())
    } else {
        format!(
            "Not connected ({})",
            status.error.as_deref().unwrap_or("unknown error")
        )
    };

    let content = format!(
        "# BlinkZero Local Completion - Model Information

## Configuration
- **Base URL**: {base_url}
- **Chat Model**: {model}
- **Embeddings Model**: {embeddings}

## MCP Integration
- **MCP Server**: {server}
- **Allowed Tools**: {mcp_tools}
- **Status**: {status}

## Local Tools
- **Enabled**: {enabled}
- **Allowed Tools**: {local_tools}
",
        base_url = settings.base_url,
        model = settings.model,
        embeddings = settings.embeddings_model,
        server = settings.mcp.server_url.as_deref().unwrap_or("(not configured)"),
        mcp_tools = settings.mcp.allowed_tools.join(", "),
        status = status_line,
        enabled = if settings.local_tools.enable { "Yes" } else { "No" },
        local_tools = settings.local_tools.allowed_tools.join(", "),
    );
    host.open_document(ScratchDocument::markdown(content)).await
}

/// Conventional test file name for `path`, in the same directory.
pub fn test_file_name(path: &Path, language_id: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned());
    let dotted = |suffix: &str| match &ext {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext),
        None => format!("{}{}", stem, suffix),
    };

    let name = match language_id {
        "javascript" | "typescript" => dotted(".test"),
        "python" => format!("test_{}.py", stem),
        "java" => format!("{}Test.java", stem),
        "csharp" => format!("{}Tests.cs", stem),
        "go" => format!("{}_test.go", stem),
        "rust" => format!("{}_test.rs", stem),
        _ => dotted("_test"),
    };
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{Position, Selection, TextDocument};
    use httpmock::prelude::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Info(String),
        Warning(String),
        Error(String),
        BeginProgress(String),
        EndProgress,
        Document(ScratchDocument),
        Choose(String),
        Write(PathBuf, String),
        Terminal(String),
        OpenChat,
    }

    #[derive(Default)]
    struct MockHost {
        editor: Option<EditorState>,
        workspace: Option<PathBuf>,
        answers: Mutex<VecDeque<Option<String>>>,
        events: Mutex<Vec<Event>>,
    }

    impl MockHost {
        fn with_editor(editor: EditorState) -> Self {
            Self {
                editor: Some(editor),
                ..Default::default()
            }
        }

        fn answering(self, answers: &[Option<&str>]) -> Self {
            *self.answers.lock().unwrap() = answers.iter().map(|a| a.map(String::from)).collect();
            self
        }

        fn record(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn next_answer(&self) -> Option<String> {
            self.answers.lock().unwrap().pop_front().flatten()
        }

        fn documents(&self) -> Vec<ScratchDocument> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::Document(d) => Some(d),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl TaskHost for MockHost {
        fn active_editor(&self) -> Option<EditorState> {
            self.editor.clone()
        }
        fn workspace_root(&self) -> Option<PathBuf> {
            self.workspace.clone()
        }
        fn show_info(&self, message: &str) {
            self.record(Event::Info(message.into()));
        }
        fn show_warning(&self, message: &str) {
            self.record(Event::Warning(message.into()));
        }
        fn show_error(&self, message: &str) {
            self.record(Event::Error(message.into()));
        }
        fn begin_progress(&self, title: &str) {
            self.record(Event::BeginProgress(title.into()));
        }
        fn end_progress(&self) {
            self.record(Event::EndProgress);
        }
        async fn open_document(&self, document: ScratchDocument) -> Result<()> {
            self.record(Event::Document(document));
            Ok(())
        }
        async fn choose(&self, prompt: &str, _options: &[&str]) -> Option<String> {
            self.record(Event::Choose(prompt.into()));
            self.next_answer()
        }
        async fn input(&self, _prompt: &str, _placeholder: &str) -> Option<String> {
            self.next_answer()
        }
        async fn write_file(&self, path: &Path, content: &str) -> Result<()> {
            self.record(Event::Write(path.to_path_buf(), content.into()));
            Ok(())
        }
        async fn run_in_terminal(&self, command: &str) -> Result<()> {
            self.record(Event::Terminal(command.into()));
            Ok(())
        }
        async fn open_chat(&self) -> Result<()> {
            self.record(Event::OpenChat);
            Ok(())
        }
    }

    fn settings_for(server: &MockServer) -> Settings {
        Settings {
            base_url: format!("{}/v1", server.base_url()),
            model: "test-model".into(),
            ..Default::default()
        }
    }

    async fn reply_with<'a>(
        server: &'a MockServer,
        body_fragment: &str,
        content: &str,
    ) -> httpmock::Mock<'a> {
        let body_fragment = body_fragment.to_string();
        let content = content.to_string();
        server
            .mock_async(move |when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .body_contains(body_fragment);
                then.status(200).json_body(json!({
                    "id": "1",
                    "choices": [{"message": {"role": "assistant", "content": content}}]
                }));
            })
            .await
    }

    fn py_editor(text: &str, selection: Option<Selection>) -> EditorState {
        EditorState::new(TextDocument::new("/ws/pkg/calc.py", "python", text), selection)
    }

    #[tokio::test]
    async fn test_explain_without_editor_warns() {
        let host = MockHost::default();
        explain_selection(&host, &Settings::default()).await;
        assert_eq!(host.events(), vec![Event::Warning(NO_EDITOR.into())]);
    }

    #[tokio::test]
    async fn test_explain_empty_file_warns_without_request() {
        let server = MockServer::start_async().await;
        let mock = reply_with(&server, "", "unused").await;
        let host = MockHost::with_editor(py_editor("  \n", None));
        explain_selection(&host, &settings_for(&server)).await;
        assert_eq!(mock.hits_async().await, 0);
        assert!(matches!(&host.events()[..], [Event::Warning(w)] if w.starts_with("No code to explain.")));
    }

    #[tokio::test]
    async fn test_explain_falls_back_to_whole_file() {
        let server = MockServer::start_async().await;
        let mock = reply_with(
            &server,
            "Please explain this python code from /ws/pkg/calc.py",
            "It adds numbers.",
        )
        .await;
        let host = MockHost::with_editor(py_editor("def add(a, b):\n    return a + b", None));

        explain_selection(&host, &settings_for(&server)).await;

        mock.assert_async().await;
        let events = host.events();
        assert_eq!(events[0], Event::BeginProgress("Explaining code...".into()));
        assert_eq!(events[1], Event::EndProgress);
        let docs = host.documents();
        assert_eq!(docs[0].language, "markdown");
        assert!(docs[0].content.starts_with("# Code Explanation\n\nFile: /ws/pkg/calc.py\nLanguage: python"));
        assert!(docs[0].content.contains("```python\ndef add(a, b):\n    return a + b\n```"));
        assert!(docs[0].content.ends_with("## Explanation\n\nIt adds numbers."));
    }

    #[tokio::test]
    async fn test_explain_http_failure_reports_one_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(500);
            })
            .await;
        let host = MockHost::with_editor(py_editor("x = 1", None));
        explain_selection(&host, &settings_for(&server)).await;
        let errors: Vec<_> = host.events().into_iter().filter(|e| matches!(e, Event::Error(_))).collect();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], Event::Error(m) if m.starts_with("Failed to explain code: API error: 500")));
        assert!(host.events().contains(&Event::EndProgress));
    }

    #[tokio::test]
    async fn test_write_tests_saves_under_workspace() {
        let server = MockServer::start_async().await;
        reply_with(&server, "Generate unit tests for this python code", "def test_add(): pass").await;
        let host = MockHost {
            workspace: Some(PathBuf::from("/ws")),
            ..MockHost::with_editor(py_editor("def add(a, b):\n    return a + b", None))
        }
        .answering(&[Some("Save")]);

        write_tests(&host, &settings_for(&server)).await;

        let events = host.events();
        assert!(events.contains(&Event::Document(ScratchDocument::new("def test_add(): pass", "python"))));
        assert!(events.contains(&Event::Choose("Tests generated! Save as pkg/test_calc.py?".into())));
        assert!(events.contains(&Event::Write(
            PathBuf::from("/ws/pkg/test_calc.py"),
            "def test_add(): pass".into()
        )));
        assert_eq!(events.last(), Some(&Event::Info("Tests saved to pkg/test_calc.py".into())));
    }

    #[tokio::test]
    async fn test_write_tests_declined_writes_nothing() {
        let server = MockServer::start_async().await;
        reply_with(&server, "Generate unit tests", "tests").await;
        let host = MockHost {
            workspace: Some(PathBuf::from("/ws")),
            ..MockHost::with_editor(py_editor("x = 1", None))
        }
        .answering(&[Some("Don't Save")]);

        write_tests(&host, &settings_for(&server)).await;
        assert!(!host.events().iter().any(|e| matches!(e, Event::Write(..))));
    }

    #[tokio::test]
    async fn test_refactor_requires_selection() {
        let host = MockHost::with_editor(py_editor("x = 1", None));
        refactor_function(&host, &Settings::default()).await;
        assert_eq!(
            host.events(),
            vec![Event::Warning("Please select the code you want to refactor.".into())]
        );
    }

    #[tokio::test]
    async fn test_refactor_apply_only_informs() {
        let server = MockServer::start_async().await;
        let mock = reply_with(&server, "\"temperature\":0.2", "Use a constant.").await;
        let selection = Selection::new(Position::new(0, 0), Position::new(0, 5));
        let host = MockHost::with_editor(py_editor("x = 1\ny = 2", Some(selection))).answering(&[Some("Apply")]);

        refactor_function(&host, &settings_for(&server)).await;

        mock.assert_async().await;
        let docs = host.documents();
        assert!(docs[0].content.contains("## Original Code\n\n```python\nx = 1\n```"));
        assert!(docs[0].content.ends_with("## Refactored Version\n\nUse a constant."));
        assert!(matches!(host.events().last(), Some(Event::Info(m)) if m.starts_with("Please manually copy")));
    }

    #[tokio::test]
    async fn test_apply_diff_shows_document() {
        let host = MockHost::with_editor(py_editor("x = 1", None)).answering(&[Some("-x = 1\n+x = 2")]);
        apply_diff(&host).await;
        let docs = host.documents();
        assert_eq!(
            docs[0].content,
            "# Diff to Apply\n\n```diff\n-x = 1\n+x = 2\n```\n\nPlease apply these changes manually to your code."
        );

        let dismissed = MockHost::with_editor(py_editor("x = 1", None)).answering(&[Some("   ")]);
        apply_diff(&dismissed).await;
        assert!(dismissed.events().is_empty());
    }

    #[tokio::test]
    async fn test_run_shell_command_uses_terminal() {
        let host = MockHost::default().answering(&[Some("ls -la")]);
        run_shell_command(&host).await;
        assert_eq!(
            host.events(),
            vec![
                Event::Terminal("ls -la".into()),
                Event::Info("Running command: ls -la".into())
            ]
        );
    }

    #[tokio::test]
    async fn test_check_connection() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/models");
                then.status(200).json_body(json!({"data": []}));
            })
            .await;
        let host = MockHost::default();
        check_connection(&host, &settings_for(&server)).await;
        assert_eq!(
            host.events(),
            vec![
                Event::BeginProgress("Checking Local LLM connection...".into()),
                Event::EndProgress,
                Event::Info("✅ Local LLM connection successful!".into()),
            ]
        );

        let offline = MockHost::default();
        let settings = Settings {
            base_url: "http://127.0.0.1:9/v1".into(),
            ..Default::default()
        };
        check_connection(&offline, &settings).await;
        assert!(matches!(offline.events().last(), Some(Event::Error(m)) if m.starts_with("❌ Local LLM connection failed:")));
    }

    #[tokio::test]
    async fn test_model_info_document() {
        let host = MockHost::default();
        let settings = Settings {
            model: "coder".into(),
            ..Default::default()
        };
        show_model_info(&host, &settings).await;
        let docs = host.documents();
        assert!(docs[0].content.starts_with("# BlinkZero Local Completion - Model Information"));
        assert!(docs[0].content.contains("- **Chat Model**: coder"));
        assert!(docs[0].content.contains("- **MCP Server**: (not configured)"));
        assert!(docs[0].content.contains("- **Status**: Not connected (No MCP server URL configured)"));
        assert!(docs[0].content.contains("- **Enabled**: Yes"));
    }

    #[tokio::test]
    async fn test_execute_dispatches_open_chat_and_reports_bad_settings() {
        let host = MockHost::default();
        execute(Command::OpenChat, &host, &SettingsSource::Defaults).await;
        assert_eq!(host.events(), vec![Event::OpenChat]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("BlinkZero.toml");
        std::fs::write(&path, "base_url = \"not a url\"").unwrap();
        let broken = MockHost::default();
        execute(Command::CheckConnection, &broken, &SettingsSource::Isolated(path)).await;
        assert!(matches!(&broken.events()[..], [Event::Error(m)] if m.starts_with("Failed to load settings")));
    }

    #[test]
    fn test_command_ids() {
        for command in Command::ALL {
            assert_eq!(Command::from_id(command.id()), Some(command));
        }
        assert_eq!(Command::from_id("blinkzero.tools.checkConnection"), Some(Command::CheckConnection));
        assert_eq!(Command::from_id("blinkzero.unknown"), None);
    }

    #[test]
    fn test_file_name_conventions() {
        let cases = [
            ("src/app.ts", "typescript", "src/app.test.ts"),
            ("pkg/calc.py", "python", "pkg/test_calc.py"),
            ("Main.java", "java", "MainTest.java"),
            ("Program.cs", "csharp", "ProgramTests.cs"),
            ("cmd/serve.go", "go", "cmd/serve_test.go"),
            ("src/lib.rs", "rust", "src/lib_test.rs"),
            ("lib/util.rb", "ruby", "lib/util_test.rb"),
            ("Makefile", "plaintext", "Makefile_test"),
        ];
        for (input, language, expected) in cases {
            assert_eq!(test_file_name(Path::new(input), language), PathBuf::from(expected), "{}", input);
        }
    }
}
