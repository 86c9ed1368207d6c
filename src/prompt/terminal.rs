// Terminal backends for the prompt layer

use rustyline::completion::{Completer, FilenameCompleter, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, Helper};

use super::PromptError;

/// What the line editor should offer while reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Plain,
    /// Tab completes filesystem paths
    PathCompletion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// Ctrl-C
    Interrupted,
    /// Ctrl-D or closed stdin
    Eof,
    Io(String),
}

/// Line input and output for the interactive session
pub trait Terminal {
    fn read_line(&mut self, prompt: &str, mode: InputMode) -> Result<String, ReadError>;

    fn println(&mut self, line: &str);

    fn clear_screen(&mut self);

    /// Whether `InputMode::PathCompletion` does anything
    fn supports_completion(&self) -> bool {
        false
    }
}

/// rustyline helper completing paths only when asked to
struct PathHelper {
    completer: FilenameCompleter,
    enabled: bool,
}

impl Completer for PathHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        if self.enabled {
            self.completer.complete(line, pos, ctx)
        } else {
            Ok((pos, Vec::new()))
        }
    }
}

impl Hinter for PathHelper {
    type Hint = String;
}

impl Highlighter for PathHelper {}

impl Validator for PathHelper {}

impl Helper for PathHelper {}

/// Line editor with history-free editing, tab path completion and Ctrl-C reporting
pub struct RustylineTerminal {
    editor: Editor<PathHelper, DefaultHistory>,
}

impl RustylineTerminal {
    pub fn new() -> Result<Self, ReadlineError> {
        let config = Config::builder()
            .completion_type(CompletionType::List)
            .auto_add_history(false)
            .build();

        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(PathHelper {
            completer: FilenameCompleter::new(),
            enabled: false,
        }));

        Ok(Self { editor })
    }
}

impl Terminal for RustylineTerminal {
    fn read_line(&mut self, prompt: &str, mode: InputMode) -> Result<String, ReadError> {
        if let Some(helper) = self.editor.helper_mut() {
            helper.enabled = mode == InputMode::PathCompletion;
        }

        match self.editor.readline(prompt) {
            Ok(line) => Ok(line),
            Err(ReadlineError::Interrupted) => Err(ReadError::Interrupted),
            Err(ReadlineError::Eof) => Err(ReadError::Eof),
            Err(e) => Err(ReadError::Io(e.to_string())),
        }
    }

    fn println(&mut self, line: &str) {
        println!("{}", line);
    }

    fn clear_screen(&mut self) {
        if let Err(e) = self.editor.clear_screen() {
            tracing::debug!(error = %e, "failed to clear screen");
        }
    }

    fn supports_completion(&self) -> bool {
        true
    }
}

/// Open the line editor. Without one there is no way to honour Ctrl-C at a prompt.
pub fn default_terminal() -> Result<RustylineTerminal, PromptError> {
    RustylineTerminal::new().map_err(editor_error)
}

fn editor_error(e: ReadlineError) -> PromptError {
    PromptError::Terminal(format!("line editor unavailable: {}", e))
}
