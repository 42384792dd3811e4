//! Yes/no confirmation on stdin.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

/// Asks `question` and returns the answer. `assume_yes` short-circuits to
/// `true` without reading anything.
///
/// # Errors
///
/// Returns an error if stdin cannot be read.
pub fn confirm(question: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    ask(question, &mut stdin.lock(), &mut stdout)
}

fn ask(question: &str, input: &mut impl BufRead, output: &mut impl Write) -> Result<bool> {
    loop {
        write!(output, "{question} (y/n): ").context("Failed to write prompt")?;
        output.flush().context("Failed to flush prompt")?;

        let mut line = String::new();
        let read = input.read_line(&mut line).context("Failed to read answer")?;
        if read == 0 {
            return Ok(false);
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" | "" => return Ok(false),
            _ => {}
        }
    }
}
