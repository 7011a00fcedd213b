use std::io::Write as _;

use anyhow::{Context as _, Result};
use clap::Args;
use clap_complete::{Shell, generate};

/// Arguments for `refscope completions`.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script generation.
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Write the completion script for `shell` to stdout.
///
/// # Errors
///
/// Returns an error if the script cannot be written to stdout.
pub fn run_completions(shell: Shell, command: &mut clap::Command) -> Result<()> {
    let mut script = Vec::new();
    generate(shell, command, "refscope", &mut script);
    std::io::stdout()
        .lock()
        .write_all(&script)
        .context("failed to write completion script to stdout")
}
