//! Yes/no questions asked before downloading anything

use std::io::{self, BufRead, Write};

/// Asks the user a yes/no question
pub trait Prompter: Send + Sync {
    fn confirm(&self, question: &str) -> bool;
}

/// Always gives the same answer (`--assume-yes`, `--no-download`, non-terminal stdin)
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Prompter for FixedAnswer {
    fn confirm(&self, _question: &str) -> bool {
        self.0
    }
}

/// Reads the answer from standard input
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn confirm(&self, question: &str) -> bool {
        eprint!("{} [y/N] ", question);
        let _ = io::stderr().flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => false,
            Ok(_) => is_yes(&line),
        }
    }
}

/// `y`/`yes` in any case
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
