//! Questions put to the user while an upgrade runs.
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("prompt io error: {0}")]
    Io(#[from] io::Error),
    #[error("input closed while asking: {message}")]
    Closed { message: String },
    #[error("no default answer for: {message}")]
    NoDefault { message: String },
    #[error("scripted answer {answer:?} does not fit: {message}")]
    Mismatch { message: String, answer: Answer },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Choice(usize),
    Text(String),
}

pub trait Prompter {
    fn confirm(&self, message: &str, default: bool) -> Result<bool, PromptError>;

    /// Returns the index of the selected choice.
    fn select(&self, message: &str, choices: &[&str], default: usize) -> Result<usize, PromptError>;

    fn input(&self, message: &str, default: Option<&str>) -> Result<String, PromptError>;

    fn inform(&self, message: &str);
}

#[derive(Debug, Default)]
pub struct ConsolePrompter;

impl ConsolePrompter {
    fn read_line(&self, prompt: &str, message: &str) -> Result<String, PromptError> {
        let mut stdout = io::stdout();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;

        let mut raw = String::new();
        let read = io::stdin().lock().read_line(&mut raw)?;
        if read == 0 {
            return Err(PromptError::Closed {
                message: message.to_string(),
            });
        }
        Ok(raw.trim().to_string())
    }
}

impl Prompter for ConsolePrompter {
    fn confirm(&self, message: &str, default: bool) -> Result<bool, PromptError> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            let raw = self.read_line(&format!("? {message} {hint} "), message)?;
            match raw.to_ascii_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => println!("Please answer yes or no."),
            }
        }
    }

    fn select(&self, message: &str, choices: &[&str], default: usize) -> Result<usize, PromptError> {
        println!("? {message}");
        for (idx, choice) in choices.iter().enumerate() {
            let marker = if idx == default { '>' } else { ' ' };
            println!(" {marker} [{}] {choice}", idx + 1);
        }
        loop {
            let raw = self.read_line("Select: ", message)?;
            if raw.is_empty() && default < choices.len() {
                return Ok(default);
            }
            if let Some(idx) = match_choice(choices, &raw) {
                return Ok(idx);
            }
            println!("Enter a number between 1 and {}.", choices.len());
        }
    }

    fn input(&self, message: &str, default: Option<&str>) -> Result<String, PromptError> {
        let prompt = match default {
            Some(value) => format!("? {message} ({value}) "),
            None => format!("? {message} "),
        };
        loop {
            let raw = self.read_line(&prompt, message)?;
            if !raw.is_empty() {
                return Ok(raw);
            }
            if let Some(value) = default {
                return Ok(value.to_string());
            }
        }
    }

    fn inform(&self, message: &str) {
        println!("{message}");
    }
}

fn match_choice(choices: &[&str], raw: &str) -> Option<usize> {
    if let Ok(number) = raw.parse::<usize>() {
        return (1..=choices.len()).contains(&number).then(|| number - 1);
    }
    choices
        .iter()
        .position(|choice| choice.eq_ignore_ascii_case(raw))
}

/// Answers every question with its default.
#[derive(Debug, Default)]
pub struct AutoPrompter {
    quiet: bool,
}

impl AutoPrompter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Prompter for AutoPrompter {
    fn confirm(&self, message: &str, default: bool) -> Result<bool, PromptError> {
        self.inform(&format!("? {message} {}", if default { "yes" } else { "no" }));
        Ok(default)
    }

    fn select(&self, message: &str, choices: &[&str], default: usize) -> Result<usize, PromptError> {
        let choice = choices.get(default).ok_or_else(|| PromptError::NoDefault {
            message: message.to_string(),
        })?;
        self.inform(&format!("? {message} {choice}"));
        Ok(default)
    }

    fn input(&self, message: &str, default: Option<&str>) -> Result<String, PromptError> {
        default
            .map(str::to_string)
            .ok_or_else(|| PromptError::NoDefault {
                message: message.to_string(),
            })
    }

    fn inform(&self, message: &str) {
        if !self.quiet {
            println!("{message}");
        }
    }
}

/// Replays a fixed queue of answers and records everything shown to the user.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Answer>>,
    transcript: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn with_answers<I>(answers: I) -> Self
    where
        I: IntoIterator<Item = Answer>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            transcript: Mutex::new(Vec::new()),
        }
    }

    pub fn pending(&self) -> usize {
        lock(&self.answers).len()
    }

    /// Questions asked and messages shown, in order.
    pub fn transcript(&self) -> Vec<String> {
        lock(&self.transcript).clone()
    }

    fn next(&self, message: &str) -> Result<Answer, PromptError> {
        lock(&self.transcript).push(format!("? {message}"));
        lock(&self.answers)
            .pop_front()
            .ok_or_else(|| PromptError::Closed {
                message: message.to_string(),
            })
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, message: &str, _default: bool) -> Result<bool, PromptError> {
        match self.next(message)? {
            Answer::Yes => Ok(true),
            Answer::No => Ok(false),
            answer => Err(PromptError::Mismatch {
                message: message.to_string(),
                answer,
            }),
        }
    }

    fn select(&self, message: &str, choices: &[&str], _default: usize) -> Result<usize, PromptError> {
        match self.next(message)? {
            Answer::Choice(idx) if idx < choices.len() => Ok(idx),
            answer => Err(PromptError::Mismatch {
                message: message.to_string(),
                answer,
            }),
        }
    }

    fn input(&self, message: &str, _default: Option<&str>) -> Result<String, PromptError> {
        match self.next(message)? {
            Answer::Text(value) => Ok(value),
            answer => Err(PromptError::Mismatch {
                message: message.to_string(),
                answer,
            }),
        }
    }

    fn inform(&self, message: &str) {
        lock(&self.transcript).push(message.to_string());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
