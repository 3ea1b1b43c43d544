// blinkzero-cli/src/models/cli.rs
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// BlinkZero: a coding assistant backed by a local OpenAI-compatible server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase message verbosity.
    ///
    /// Specify multiple times for more verbose output:
    ///  -v:  INFO level
    ///  -vv: DEBUG level
    ///  -vvv: TRACE level (most verbose)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Settings file to use instead of searching for BlinkZero.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Read --config as is, ignoring BLINKZERO_* environment overrides.
    #[arg(long, global = true, requires = "config")]
    pub ignore_env: bool,

    /// Workspace root (defaults to the current directory).
    #[arg(long, global = true, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// A file with an optional 1-based inclusive line range, e.g. `--lines 10:24`.
#[derive(Args, Debug, Clone)]
pub struct FileTarget {
    pub file: PathBuf,

    #[arg(long, value_name = "A:B", value_parser = parse_line_range)]
    pub lines: Option<(usize, usize)>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chat with the model. Interactive unless --prompt is given.
    Chat {
        #[arg(short, long)]
        prompt: Option<String>,

        /// Treat this file as the active editor (for @file and @selection).
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,

        #[arg(long, value_name = "A:B", value_parser = parse_line_range, requires = "file")]
        lines: Option<(usize, usize)>,
    },
    /// Suggest an inline completion at a 1-based line and column.
    Complete {
        file: PathBuf,
        #[arg(long)]
        line: usize,
        #[arg(long)]
        column: usize,
    },
    /// Explain the given lines, or the whole file.
    Explain(FileTarget),
    /// Generate unit tests for a file.
    WriteTests { file: PathBuf },
    /// Suggest a refactoring of the given lines.
    Refactor {
        file: PathBuf,
        #[arg(long, value_name = "A:B", value_parser = parse_line_range)]
        lines: (usize, usize),
    },
    /// Show a unified diff for manual application to a file.
    ApplyDiff {
        file: PathBuf,
        /// Read the diff from this file instead of prompting.
        #[arg(long, value_name = "PATH")]
        diff: Option<PathBuf>,
    },
    /// Run a shell command in the workspace. Prompts when none is given.
    Run {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Check that the local LLM server answers.
    CheckConnection,
    /// Show the active configuration and tool-server status.
    ModelInfo,
    /// List the tools the tool server offers and which are allowed.
    Tools,
    /// Run a command by its palette identifier, e.g. blinkzero.writeTests.
    Exec {
        id: String,
        /// File to use as the active editor.
        #[arg(long, value_name = "PATH")]
        file: Option<PathBuf>,
        #[arg(long, value_name = "A:B", value_parser = parse_line_range, requires = "file")]
        lines: Option<(usize, usize)>,
    },
}

/// Parses `A:B` (or a single `A`) into a 1-based inclusive range.
pub fn parse_line_range(s: &str) -> Result<(usize, usize), String> {
    let (start, end) = match s.split_once(':') {
        Some((a, b)) => (a, b),
        None => (s, s),
    };
    let start: usize = start
        .trim()
        .parse()
        .map_err(|_| format!("invalid start line '{}'", start))?;
    let end: usize = end
        .trim()
        .parse()
        .map_err(|_| format!("invalid end line '{}'", end))?;
    if start == 0 || end == 0 {
        return Err("line numbers start at 1".to_string());
    }
    if end < start {
        return Err(format!("range end {} is before start {}", end, start));
    }
    Ok((start, end))
}
