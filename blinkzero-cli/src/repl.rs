// blinkzero-cli/src/repl.rs

//! Terminal chat over a [`ChatPanel`] session.

use anyhow::{anyhow, Context, Result};
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use std::fs;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

use blinkzero_core::{ChatPanel, PanelEvent, PanelMessage};

use crate::host::{spinner, CliHost};
use crate::rendering::print_formatted;

fn print_welcome_message() {
    println!("\n{}", "BlinkZero - Local LLM Chat".cyan().bold());
    println!(
        "{}\n{}\n{}",
        "Use @selection, @file or @workspace to add editor context.".dimmed(),
        "Type 'clear' to clear the conversation.".dimmed(),
        "Type 'exit', 'quit' or Ctrl-D to quit.".dimmed()
    );
    println!();
}

/// Sends one message and renders events until the panel settles.
async fn exchange(
    host: &CliHost,
    panel: &mut ChatPanel,
    events: &mut UnboundedReceiver<PanelEvent>,
    message: PanelMessage,
) {
    let handle = panel.handle(message, host.editor(), Some(host.workspace()));
    let render = async {
        let mut pb = None;
        while let Some(event) = events.recv().await {
            match event {
                PanelEvent::Thinking => pb = Some(spinner("Thinking...")),
                PanelEvent::Answer(text) => {
                    if let Some(pb) = pb.take() {
                        pb.finish_and_clear();
                    }
                    println!();
                    if let Err(e) = print_formatted(&text) {
                        error!("Failed to render answer markdown: {}. Printing raw.", e);
                        println!("{}", text);
                    }
                    println!();
                    break;
                }
                PanelEvent::Error(text) => {
                    if let Some(pb) = pb.take() {
                        pb.finish_and_clear();
                    }
                    eprintln!("\n{}\n", text.red());
                    break;
                }
                PanelEvent::Cleared => {
                    println!("{}", "Conversation cleared.".cyan());
                    break;
                }
            }
        }
    };
    tokio::join!(handle, render);
}

/// Asks a single question and prints the answer.
pub async fn run_single_turn(host: &CliHost, prompt: String) -> Result<()> {
    info!("Running single chat turn.");
    let mut manager = host.panels().lock().await;
    let panel = manager.reveal();
    let mut events = panel.subscribe();
    exchange(host, panel, &mut events, PanelMessage::Ask(prompt)).await;
    manager.dispose();
    Ok(())
}

/// Interactive chat. Leaving the loop disposes the panel and its transcript.
pub async fn run_interactive(host: &CliHost) -> Result<()> {
    print_welcome_message();

    let rl_config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl = DefaultEditor::with_config(rl_config)?;

    let history_dir = dirs::cache_dir()
        .map(|d| d.join("blinkzero"))
        .ok_or_else(|| anyhow!("Could not determine cache directory for history file"))?;
    fs::create_dir_all(&history_dir).context("Failed to create history directory")?;
    let history_file_path = history_dir.join("chat_history.txt");
    if rl.load_history(&history_file_path).is_err() {
        debug!(path = %history_file_path.display(), "No previous chat input history found.");
    }

    let mut manager = host.panels().lock().await;
    let panel = manager.reveal();
    let mut events = panel.subscribe();
    let prompt = format!("{} ", ">".green().bold());

    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                match input.to_lowercase().as_str() {
                    "exit" | "quit" => {
                        info!("Exit command entered.");
                        break;
                    }
                    "clear" => exchange(host, panel, &mut events, PanelMessage::Clear).await,
                    _ => {
                        exchange(host, panel, &mut events, PanelMessage::Ask(input.to_string())).await
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => {
                info!("EOF detected, leaving chat.");
                break;
            }
            Err(err) => {
                error!("Readline error: {:?}", err);
                eprintln!("Error reading input: {}", err.to_string().red());
                break;
            }
        }
    }

    manager.dispose();
    if let Err(e) = rl.save_history(&history_file_path) {
        warn!(path = %history_file_path.display(), error = %e, "Failed to save chat input history.");
    }
    println!("\n{}\n", "Chat closed.".cyan());
    Ok(())
}
