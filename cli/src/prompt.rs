//! Operator prompts. The session only talks to [`Prompter`], so tests can script the answers.

use crate::error::CliError;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

pub trait Prompter {
    /// Free-text answer; `initial` is pre-filled and editable.
    fn input(&mut self, message: &str, initial: &str) -> Result<String, CliError>;

    /// Index into `choices` of the operator's pick.
    fn select(&mut self, message: &str, choices: &[String]) -> Result<usize, CliError>;

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, CliError>;
}

/// Line-editing prompter on the terminal.
pub struct LinePrompter {
    editor: DefaultEditor,
}

impl LinePrompter {
    pub fn new() -> Result<Self, CliError> {
        Ok(LinePrompter {
            editor: DefaultEditor::new()?,
        })
    }

    fn read(&mut self, prompt: &str, initial: &str) -> Result<String, CliError> {
        match self.editor.readline_with_initial(prompt, (initial, "")) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(line)
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => Err(CliError::Interrupted),
            Err(e) => Err(e.into()),
        }
    }
}

impl Prompter for LinePrompter {
    fn input(&mut self, message: &str, initial: &str) -> Result<String, CliError> {
        self.read(&format!("{}: ", message), initial)
    }

    fn select(&mut self, message: &str, choices: &[String]) -> Result<usize, CliError> {
        println!("{}", message);
        for (i, choice) in choices.iter().enumerate() {
            println!("  {}) {}", i + 1, choice);
        }
        loop {
            let answer = self.read("> ", "")?;
            match answer.trim().parse::<usize>() {
                Ok(n) if (1..=choices.len()).contains(&n) => return Ok(n - 1),
                _ => println!("enter a number between 1 and {}", choices.len()),
            }
        }
    }

    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, CliError> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            let answer = self.read(&format!("{} {} ", message, hint), "")?;
            match parse_yes_no(&answer) {
                Some(yes) => return Ok(yes),
                None if answer.trim().is_empty() => return Ok(default),
                None => println!("answer y or n"),
            }
        }
    }
}

/// `y`/`yes`/`true` or `n`/`no`/`false`, case-insensitive.
pub fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" | "true" => Some(true),
        "n" | "no" | "false" => Some(false),
        _ => None,
    }
}
