//! Operator prompts

use std::collections::VecDeque;
use std::io::{self, Write};

/// Source of operator answers
pub trait Prompt {
    /// Show `message` and read one line of input
    fn ask(&mut self, message: &str) -> io::Result<String>;
}

/// Prompt on stdout, answers from stdin
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn ask(&mut self, message: &str) -> io::Result<String> {
        print!("{}", message);
        io::stdout().flush()?;

        let mut response = String::new();
        io::stdin().read_line(&mut response)?;
        Ok(response)
    }
}

/// Prompt answering from a fixed script
///
/// Once the script is exhausted every question is answered with an empty
/// line, the same as a closed stdin.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    /// Questions asked so far
    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&mut self, message: &str) -> io::Result<String> {
        self.asked.push(message.to_string());
        Ok(self.answers.pop_front().unwrap_or_default())
    }
}

/// Ask a yes/no question that defaults to yes
pub fn confirm(prompt: &mut dyn Prompt, message: &str) -> io::Result<bool> {
    let response = prompt.ask(message)?;
    Ok(!response.trim().to_lowercase().starts_with('n'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_defaults_to_yes() {
        let mut prompt = ScriptedPrompt::new(["\n", "y", "No\n", "n"]);

        assert!(confirm(&mut prompt, "?").unwrap());
        assert!(confirm(&mut prompt, "?").unwrap());
        assert!(!confirm(&mut prompt, "?").unwrap());
        assert!(!confirm(&mut prompt, "?").unwrap());
        assert_eq!(prompt.asked().len(), 4);
    }

    #[test]
    fn test_exhausted_script_answers_empty() {
        let mut prompt = ScriptedPrompt::default();
        assert_eq!(prompt.ask("Select: ").unwrap(), "");
    }
}
