// blinkzero-cli/src/terminal.rs
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, warn};

/// Runs `command` through `sh -c` in `working_dir` with the terminal attached.
/// Returns the exit code; a non-zero exit is not an error.
pub fn run_in_shell(command: &str, working_dir: &Path) -> Result<i32> {
    debug!(command, dir = %working_dir.display(), "Running shell command.");
    let output = duct::cmd!("sh", "-c", command)
        .dir(working_dir)
        .unchecked()
        .run()
        .with_context(|| format!("Failed to spawn process for command: {}", command))?;

    let code = output
        .status
        .code()
        .unwrap_or_else(|| if output.status.success() { 0 } else { 1 });
    if code != 0 {
        warn!(command, code, "Command exited with non-zero status.");
    }
    Ok(code)
}
