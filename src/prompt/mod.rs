// Prompt layer - validated interactive input with Ctrl-C confirmation

pub mod terminal;

use std::path::{Component, Path, PathBuf};

use console::style;
use thiserror::Error;
use url::Url;

use crate::config::ACCEPTED_HOSTS;
use crate::downloader::models::PlaylistEntry;

pub use terminal::{default_terminal, InputMode, ReadError, RustylineTerminal, Terminal};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    /// The user confirmed they want to quit
    #[error("user requested exit")]
    Exit,

    #[error("terminal error: {0}")]
    Terminal(String),
}

/// Check that `url` is a well-formed http(s) URL on an accepted YouTube host
pub fn validate_url(url: &str) -> bool {
    let parsed = match Url::parse(url.trim()) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    if !parsed.username().is_empty() || parsed.password().is_some() || parsed.port().is_some() {
        return false;
    }

    match parsed.host_str() {
        Some(host) => ACCEPTED_HOSTS.contains(&host),
        None => false,
    }
}

/// Parse "2,1,5,x" into entry positions; bad tokens and out-of-range indices are dropped
pub fn parse_selection(input: &str, len: usize) -> Vec<usize> {
    input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()))
        .filter_map(|token| token.parse::<usize>().ok())
        .filter(|index| (1..=len).contains(index))
        .map(|index| index - 1)
        .collect()
}

/// Expand `~`, make absolute against `cwd`, and drop `.`/`..` components
pub fn resolve_directory(input: &str, home: Option<&Path>, cwd: &Path) -> PathBuf {
    let input = input.trim();

    let expanded = match (input, home) {
        ("~", Some(home)) => home.to_path_buf(),
        (path, Some(home)) if path.starts_with("~/") => {
            // "~//x" stays under home
            home.join(path[2..].trim_start_matches(std::path::is_separator))
        }
        (path, _) => PathBuf::from(path),
    };

    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Interactive prompts over an injected terminal
pub struct Prompter<T: Terminal> {
    terminal: T,
    default_dir: PathBuf,
    home: Option<PathBuf>,
}

impl<T: Terminal> Prompter<T> {
    pub fn new(terminal: T, default_dir: PathBuf) -> Self {
        Self {
            terminal,
            default_dir,
            home: dirs::home_dir(),
        }
    }

    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    pub fn terminal(&mut self) -> &mut T {
        &mut self.terminal
    }

    pub fn into_terminal(self) -> T {
        self.terminal
    }

    /// Read one line; Ctrl-C asks whether to quit and resumes on "n"
    fn safe_read(&mut self, prompt: &str, mode: InputMode) -> Result<String, PromptError> {
        loop {
            match self.terminal.read_line(prompt, mode) {
                Ok(line) => return Ok(line),
                Err(ReadError::Interrupted) => self.confirm_exit()?,
                Err(ReadError::Eof) => {
                    tracing::warn!("input closed, exiting");
                    return Err(PromptError::Exit);
                }
                Err(ReadError::Io(e)) => return Err(PromptError::Terminal(e)),
            }
        }
    }

    /// Ok means resume; any answer other than "n" quits
    fn confirm_exit(&mut self) -> Result<(), PromptError> {
        self.terminal.println("");
        self.terminal
            .println(&style("⛔ Interrupted!").red().bold().to_string());

        let question = format!("Do you really want to exit? {} {}: ", choices_hint(&["y", "n"]), default_hint("y"));
        loop {
            let answer = match self.terminal.read_line(&question, InputMode::Plain) {
                Ok(answer) => answer,
                Err(ReadError::Io(e)) => return Err(PromptError::Terminal(e)),
                Err(_) => return Err(PromptError::Exit),
            };

            match answer.trim().to_lowercase().as_str() {
                "" | "y" => {
                    tracing::warn!("exit confirmed after interrupt");
                    return Err(PromptError::Exit);
                }
                "n" => {
                    self.terminal
                        .println(&style("Resuming...").green().bold().to_string());
                    return Ok(());
                }
                _ => self.invalid_choice(),
            }
        }
    }

    fn invalid_choice(&mut self) {
        self.terminal
            .println(&style("Please select one of the available options").red().to_string());
    }

    /// Re-prompt until the answer is one of `choices`; empty input picks `default`
    pub fn prompt_choice(
        &mut self,
        prompt: &str,
        choices: &[&str],
        default: &str,
    ) -> Result<String, PromptError> {
        let full_prompt = format!("{} {} {}: ", prompt, choices_hint(choices), default_hint(default));

        loop {
            let answer = self.safe_read(&full_prompt, InputMode::Plain)?;
            let answer = answer.trim();

            if answer.is_empty() {
                return Ok(default.to_string());
            }
            if let Some(choice) = choices.iter().find(|c| c.eq_ignore_ascii_case(answer)) {
                return Ok(choice.to_string());
            }
            self.invalid_choice();
        }
    }

    /// Ask for the download directory; returns an absolute, `~`-expanded path
    pub fn prompt_directory(&mut self) -> Result<PathBuf, PromptError> {
        let default_dir = self.default_dir.display().to_string();
        let prompt = format!(
            "{} [{}]: ",
            style("Download directory").yellow().bold(),
            style(&default_dir).cyan().bold()
        );
        let mode = if self.terminal.supports_completion() {
            InputMode::PathCompletion
        } else {
            InputMode::Plain
        };

        let answer = self.safe_read(&prompt, mode)?;
        let answer = answer.trim();
        let text = if answer.is_empty() { default_dir.as_str() } else { answer };

        let cwd = std::env::current_dir()
            .map_err(|e| PromptError::Terminal(format!("cannot resolve working directory: {}", e)))?;
        Ok(resolve_directory(text, self.home.as_deref(), &cwd))
    }

    /// Re-prompt until the URL is valid; no retry limit
    pub fn prompt_url(&mut self, prompt: &str) -> Result<String, PromptError> {
        let full_prompt = format!("{}: ", prompt);
        loop {
            let url = self.safe_read(&full_prompt, InputMode::Plain)?;
            let url = url.trim();
            if validate_url(url) {
                return Ok(url.to_string());
            }
            tracing::debug!(url, "rejected url");
            self.terminal.println(
                &style("⚠ Invalid YouTube URL. Please try again.").red().bold().to_string(),
            );
        }
    }

    pub fn prompt_yes_no(&mut self, prompt: &str, default: &str) -> Result<bool, PromptError> {
        let choice = self.prompt_choice(&format!("{} (y/n)", prompt), &["y", "n"], default)?;
        Ok(choice == "y")
    }

    /// List entries and let the user pick some by 1-based index; empty picks all
    pub fn prompt_video_selection(
        &mut self,
        entries: &[PlaylistEntry],
    ) -> Result<Vec<PlaylistEntry>, PromptError> {
        self.terminal.println("");
        self.terminal
            .println(&style("Playlist videos:").magenta().bold().to_string());
        for (i, entry) in entries.iter().enumerate() {
            self.terminal.println(&format!("{}. {}", i + 1, entry.title));
        }

        let answer = self.safe_read("Select videos (e.g., 1,3,5) [all]: ", InputMode::Plain)?;
        if answer.trim().is_empty() {
            return Ok(entries.to_vec());
        }

        let selected: Vec<PlaylistEntry> = parse_selection(&answer, entries.len())
            .into_iter()
            .map(|i| entries[i].clone())
            .collect();

        if selected.is_empty() {
            tracing::warn!(input = %answer, "no valid videos selected");
        }
        Ok(selected)
    }
}

fn choices_hint(choices: &[&str]) -> String {
    style(format!("[{}]", choices.join("/"))).magenta().bold().to_string()
}

fn default_hint(default: &str) -> String {
    style(format!("({})", default)).cyan().bold().to_string()
}
