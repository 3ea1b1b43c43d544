// blinkzero-cli/src/main.rs
mod host;
mod models;
mod rendering;
mod repl;
mod terminal;

use anyhow::{anyhow, Context, Result};
use colored::*;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error, info, Level};
use tracing_subscriber::{
    fmt::{self, time::LocalTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use blinkzero_core::{
    tasks, tools, CancellationToken, Command, EditorState, InlineCompletionAdapter, LlmClient,
    Position, SettingsSource, TextDocument,
};

use crate::host::{spinner, CliHost};
use crate::models::cli::{Cli, Commands, FileTarget};

const LOG_FILE_NAME: &str = "blinkzero.log";

/// A failure the host has already shown to the user.
#[derive(Debug)]
struct AlreadyReported(&'static str);

impl std::fmt::Display for AlreadyReported {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} did not complete", self.0)
    }
}

impl std::error::Error for AlreadyReported {}

/// Opens `file` as the active editor, selecting whole lines when a range is given.
fn open_editor(file: &Path, lines: Option<(usize, usize)>) -> Result<EditorState> {
    let document = TextDocument::from_path(file)?;
    let mut editor = EditorState::new(document, None);
    if let Some((first, last)) = lines {
        if first > editor.document.line_count() {
            return Err(anyhow!(
                "Line {} is past the end of {} ({} lines)",
                first,
                file.display(),
                editor.document.line_count()
            ));
        }
        editor.select_lines(first, last);
    }
    Ok(editor)
}

fn settings_source(cli: &Cli, workspace: &Path) -> SettingsSource {
    match &cli.config {
        Some(path) if cli.ignore_env => SettingsSource::Isolated(path.clone()),
        Some(path) => SettingsSource::File(path.clone()),
        None => SettingsSource::discover(workspace, dirs::config_dir().as_deref()),
    }
}

async fn run_task(host: &CliHost, command: Command) -> Result<()> {
    tasks::execute(command, host, host.settings_source()).await;
    if host.failed() {
        Err(AlreadyReported(command.id()).into())
    } else {
        Ok(())
    }
}

async fn handle_complete(source: &SettingsSource, file: &Path, line: usize, column: usize) -> Result<()> {
    if line == 0 || column == 0 {
        return Err(anyhow!("--line and --column are 1-based"));
    }
    let settings = source.load()?;
    let document = TextDocument::from_path(file)?;
    let position = Position::new(line - 1, column - 1);
    let adapter = InlineCompletionAdapter::new(settings);

    let pb = spinner("Completing...");
    let suggestion = adapter.suggest(&document, position, &CancellationToken::new()).await;
    pb.finish_and_clear();

    match suggestion {
        Some(suggestion) => println!("{}", suggestion.text),
        None => println!("{}", "(no suggestion)".dimmed()),
    }
    Ok(())
}

async fn handle_tools(source: &SettingsSource) -> Result<()> {
    let settings = source.load()?;
    let client = LlmClient::new(&settings)?;
    let status = tools::server_status(&settings, client.http()).await;

    match &status.url {
        Some(url) => println!("{} {}", "Tool server:".bold(), url),
        None => println!("{} {}", "Tool server:".bold(), "(not configured)".dimmed()),
    }
    if !status.connected {
        println!(
            "{} {}",
            "Status:".bold(),
            status.error.as_deref().unwrap_or("not connected").red()
        );
        return Ok(());
    }
    println!("{} {}", "Status:".bold(), "connected".green());
    println!("\n{}", "Available tools:".bold());
    for name in &status.available_tools {
        let allowed = settings.mcp.allowed_tools.contains(name);
        let description = tools::friendly_description(name).unwrap_or("");
        let marker = if allowed { "✔".green() } else { "·".dimmed() };
        println!("  {} {:<24} {}", marker, name, description.dimmed());
    }
    println!("\n{}", "(✔ = in mcp.allowed_tools, offered to the model)".dimmed());
    Ok(())
}

async fn dispatch(cli: Cli, workspace: PathBuf, source: SettingsSource) -> Result<()> {
    let host = CliHost::new(workspace, source);
    match cli.command {
        Commands::Chat { prompt, file, lines } => {
            let editor = file.as_deref().map(|f| open_editor(f, lines)).transpose()?;
            let host = host.with_editor(editor);
            match prompt {
                Some(prompt) => repl::run_single_turn(&host, prompt).await,
                None => repl::run_interactive(&host).await,
            }
        }
        Commands::Complete { file, line, column } => {
            handle_complete(host.settings_source(), &file, line, column).await
        }
        Commands::Explain(FileTarget { file, lines }) => {
            let host = host.with_editor(Some(open_editor(&file, lines)?));
            run_task(&host, Command::ExplainSelection).await
        }
        Commands::WriteTests { file } => {
            let host = host.with_editor(Some(open_editor(&file, None)?));
            run_task(&host, Command::WriteTests).await
        }
        Commands::Refactor { file, lines } => {
            let host = host.with_editor(Some(open_editor(&file, Some(lines))?));
            run_task(&host, Command::RefactorFunction).await
        }
        Commands::ApplyDiff { file, diff } => {
            let mut host = host.with_editor(Some(open_editor(&file, None)?));
            if let Some(diff_path) = diff {
                let diff_text = fs::read_to_string(&diff_path)
                    .with_context(|| format!("Failed to read diff file {:?}", diff_path))?;
                host = host.preset_input(diff_text);
            }
            run_task(&host, Command::ApplyDiff).await
        }
        Commands::Run { command } => {
            let host = if command.is_empty() {
                host
            } else {
                host.preset_input(command.join(" "))
            };
            run_task(&host, Command::RunShellCommand).await
        }
        Commands::CheckConnection => run_task(&host, Command::CheckConnection).await,
        Commands::ModelInfo => run_task(&host, Command::ShowModelInfo).await,
        Commands::Tools => handle_tools(host.settings_source()).await,
        Commands::Exec { id, file, lines } => {
            let command = Command::from_id(&id).ok_or_else(|| {
                let known: Vec<&str> = Command::ALL.iter().map(|c| c.id()).collect();
                anyhow!("Unknown command '{}'. Known commands: {}", id, known.join(", "))
            })?;
            let editor = file.as_deref().map(|f| open_editor(f, lines)).transpose()?;
            let host = host.with_editor(editor);
            run_task(&host, command).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    colored::control::set_override(true);
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // --- Logging Setup ---
    let default_level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(default_level.into()));

    let log_dir = match dirs::cache_dir()
        .or_else(dirs::runtime_dir)
        .or_else(|| Some(env::temp_dir()))
        .map(|d| d.join("blinkzero"))
    {
        Some(dir) => dir,
        None => {
            eprintln!("{}", "Error: Could not determine a suitable directory for log files.".red());
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("{} Failed to create log directory {}: {}", "Error:".red(), log_dir.display(), e);
        return ExitCode::FAILURE;
    }
    let log_path = log_dir.join(LOG_FILE_NAME);

    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(file_appender);

    let time_format = time::macros::format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    );
    let local_timer = LocalTime::new(time_format);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_timer(local_timer.clone());
    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(local_timer)
        .with_target(false)
        .with_level(true);

    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("{} Failed to initialize logging: {}", "Error:".red(), e);
        return ExitCode::FAILURE;
    }
    colored::control::unset_override();

    info!(
        "Logging initialized (default level {}). Logging to stderr and {}",
        default_level,
        log_path.display()
    );
    // --- End Logging Setup ---

    let workspace = match cli.workspace.clone().map(Ok).unwrap_or_else(env::current_dir) {
        Ok(dir) => dir,
        Err(e) => {
            error!("Failed to determine workspace directory: {}", e);
            eprintln!("{} Could not determine the workspace directory: {}", "Error:".red(), e);
            return ExitCode::FAILURE;
        }
    };
    let source = settings_source(&cli, &workspace);
    debug!(?source, workspace = %workspace.display(), "Resolved settings source.");

    match dispatch(cli, workspace, source).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.downcast_ref::<AlreadyReported>().is_none() {
                error!("Operation failed: {:#}", e);
                eprintln!("{} {:#}", "Error:".red(), e);
            }
            ExitCode::FAILURE
        }
    }
}
