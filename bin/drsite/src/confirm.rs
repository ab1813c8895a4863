//! Confirmation prompt for destructive actions

use std::io::{self, BufRead, IsTerminal, Write};

pub trait Confirmer: Send + Sync {
    /// Whether a person can answer the prompt
    fn is_interactive(&self) -> bool;

    fn confirm(&self, prompt: &str) -> io::Result<bool>;
}

/// Prompts on stderr and reads the answer from stdin
#[derive(Clone, Copy, Debug, Default)]
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn is_interactive(&self) -> bool {
        io::stdin().is_terminal()
    }

    fn confirm(&self, prompt: &str) -> io::Result<bool> {
        ask(io::stdin().lock(), io::stderr(), prompt)
    }
}

/// Ask until the answer is yes or no; end of input counts as no
pub fn ask<R: BufRead, W: Write>(mut input: R, mut output: W, prompt: &str) -> io::Result<bool> {
    loop {
        write!(output, "{} (y/n): ", prompt)?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(false);
        }
        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(output, "Please enter 'y' or 'n'")?,
        }
    }
}
