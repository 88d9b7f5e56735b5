//! Line-based interactive prompts.
//!
//! Prompts are generic over their input and output so the interactive launch
//! flow can be driven from tests. End of input always selects the default.

use anyhow::{Context, Result};
use colored::Colorize;
use std::fmt::Display;
use std::io::{BufRead, StdinLock, Stdout, Write};
use std::str::FromStr;

pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl Prompt<StdinLock<'static>, Stdout> {
    /// Prompt on the terminal.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
        }
    }

    /// Consume the prompt and return its output.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Write a line of text.
    pub fn say(&mut self, text: impl Display) -> Result<()> {
        writeln!(self.output, "{text}").context("Failed to write prompt")
    }

    /// Next trimmed line, `None` at end of input.
    fn read_line(&mut self) -> Result<Option<String>> {
        self.output.flush().context("Failed to write prompt")?;
        let mut line = String::new();
        let read = self.input.read_line(&mut line).context("Failed to read from stdin")?;
        if read == 0 {
            // keep the terminal tidy when input ends mid-prompt
            writeln!(self.output).context("Failed to write prompt")?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Free text. An empty answer selects `default`; with no default the
    /// answer is `None`.
    pub fn input(&mut self, message: &str, default: Option<&str>) -> Result<Option<String>> {
        match default {
            Some(default) => write!(self.output, "{message} [{default}]: "),
            None => write!(self.output, "{message}: "),
        }
        .context("Failed to write prompt")?;

        let answer = self.read_line()?.filter(|a| !a.is_empty());
        Ok(answer.or_else(|| default.map(str::to_string)))
    }

    /// Yes/no question. Anything starting with `y` (or `true`) is yes.
    pub fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        write!(self.output, "{message} [{hint}]: ").context("Failed to write prompt")?;

        let Some(answer) = self.read_line()?.filter(|a| !a.is_empty()) else {
            return Ok(default);
        };
        let answer = answer.to_lowercase();
        Ok(answer.starts_with('y') || answer == "true")
    }

    /// Pick one of `choices` by number or by (case-insensitive) prefix.
    pub fn choice(&mut self, message: &str, choices: &[&str], default: &str) -> Result<String> {
        self.say(message)?;
        for (i, choice) in choices.iter().enumerate() {
            let marker = if *choice == default { " (default)" } else { "" };
            self.say(format!("  {}) {}{}", i + 1, choice, marker))?;
        }
        let default_index = choices.iter().position(|c| *c == default).map_or(1, |i| i + 1);
        write!(self.output, "Choose [{default_index}]: ").context("Failed to write prompt")?;

        let Some(answer) = self.read_line()?.filter(|a| !a.is_empty()) else {
            return Ok(default.to_string());
        };

        if let Ok(number) = answer.parse::<usize>() {
            if (1..=choices.len()).contains(&number) {
                return Ok(choices[number - 1].to_string());
            }
        } else {
            let lower = answer.to_lowercase();
            if let Some(choice) = choices.iter().find(|c| c.to_lowercase().starts_with(&lower)) {
                return Ok((*choice).to_string());
            }
        }

        self.say(format!("Invalid choice, using default: {default}").yellow())?;
        Ok(default.to_string())
    }

    /// A number; anything unparsable falls back to `default`.
    pub fn number<T>(&mut self, message: &str, default: T) -> Result<T>
    where
        T: FromStr + Display + Copy,
    {
        let default_text = default.to_string();
        let answer = self.input(message, Some(&default_text))?.unwrap_or(default_text);
        match answer.parse() {
            Ok(value) => Ok(value),
            Err(_) => {
                self.say(format!("Invalid {}, using default: {default}", message.to_lowercase()).yellow())?;
                Ok(default)
            }
        }
    }
}
