//! Line-oriented shell for when stdin is not a terminal.
//!
//! One command per line; output goes to stdout, failures to stderr.

use crate::client::command::ShellCommand;
use crate::client::shell::Shell;
use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Run commands read from `input` until `quit` or end of input, then stop the service.
///
/// Returns the number of commands that failed.
pub async fn run_script<R, O, E>(
    shell: &mut Shell,
    input: R,
    out: &mut O,
    err: &mut E,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    O: Write,
    E: Write,
{
    let mut lines = input.lines();
    let mut failures = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let command = match line.parse::<ShellCommand>() {
            Ok(ShellCommand::Quit) => break,
            Ok(command) => command,
            Err(message) => {
                writeln!(err, "{}", message)?;
                failures += 1;
                continue;
            }
        };

        match shell.execute(command).await {
            Ok(output) if output.is_empty() => {}
            Ok(output) => writeln!(out, "{}", output)?,
            Err(_) => {
                writeln!(err, "Error: {}", shell.error().unwrap_or("command failed"))?;
                failures += 1;
            }
        }
    }

    shell.shutdown().await;
    Ok(failures)
}
