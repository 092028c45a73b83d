//! The rustyline bridge: completion, hints and highlighting from the core
//! engines, and a [`LineSource`] over a rustyline editor.

use std::borrow::Cow;
use std::time::Duration;

use crossterm::style::{Color, Stylize};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, Helper};

use pretty_shell_core::completion::{Candidate, CandidateCategory, CompletionEngine};
use pretty_shell_core::config::HISTORY_LENGTH;
use pretty_shell_core::error::{Error, Result};
use pretty_shell_core::highlight::SyntaxHighlighter;
use pretty_shell_core::live::LiveCompleter;
use pretty_shell_core::resolver::LineContextResolver;
use pretty_shell_core::session::{LineSource, ReadOutcome};
use pretty_shell_core::tree::CommandTreeIndex;

use crate::colors::{candidate_label, token_color};

/// How long a hint waits for the background completion of the current
/// keystroke.
const LIVE_HINT_WAIT: Duration = Duration::from_millis(25);

pub struct ShellHelper {
    index: CommandTreeIndex,
    engine: CompletionEngine,
    live: Option<LiveCompleter>,
    shell_path: Vec<String>,
    color: bool,
}

impl ShellHelper {
    pub fn new(index: CommandTreeIndex, fuzzy: bool, live_completion: bool, color: bool) -> Self {
        let engine = if fuzzy {
            CompletionEngine::fuzzy()
        } else {
            CompletionEngine::new()
        };
        let live = live_completion.then(|| LiveCompleter::spawn(&index, fuzzy));

        Self {
            index,
            engine,
            live,
            shell_path: Vec::new(),
            color,
        }
    }

    pub fn set_shell_path(&mut self, shell_path: &[String]) {
        self.shell_path = shell_path.to_vec();
    }

    /// Start of the word under the cursor and the candidates for it.
    pub fn candidates(&self, line_before_cursor: &str) -> (usize, Vec<Candidate>) {
        let context = LineContextResolver::new(&self.index).resolve_line(line_before_cursor, &self.shell_path);
        let candidates = self.engine.complete(&context, &context.word);
        (context.replace_start, candidates)
    }

    /// `line` with every token colored by its class.
    pub fn colorize(&self, line: &str) -> String {
        let spans = SyntaxHighlighter::new(&self.index).classify(line, &self.shell_path);
        let mut colored = String::with_capacity(line.len() * 2);
        let mut last = 0;
        for span in spans {
            if span.start < last || span.end > line.len() {
                continue;
            }
            colored.push_str(&line[last..span.start]);
            colored.push_str(&line[span.start..span.end].with(token_color(span.class)).to_string());
            last = span.end;
        }
        colored.push_str(&line[last..]);
        colored
    }

    fn live_hint(&self, line_before_cursor: &str) -> Option<String> {
        let live = self.live.as_ref()?;
        live.submit(line_before_cursor, &self.shell_path);
        let result = live.wait_latest(LIVE_HINT_WAIT)?;
        let first = result
            .candidates
            .iter()
            .find(|candidate| candidate.category != CandidateCategory::ArgumentPlaceholder)?;
        first
            .insert_text
            .strip_prefix(result.word.as_str())
            .filter(|rest| !rest.is_empty())
            .map(str::to_string)
    }
}

impl Helper for ShellHelper {}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (start, candidates) = self.candidates(&line[..pos]);
        let pairs = candidates
            .iter()
            .filter(|candidate| !candidate.insert_text.is_empty())
            .map(|candidate| Pair {
                display: candidate_label(candidate, self.color),
                replacement: candidate.insert_text.clone(),
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        self.live_hint(line)
    }
}

impl Highlighter for ShellHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if !self.color || line.is_empty() {
            return Cow::Borrowed(line);
        }
        Cow::Owned(self.colorize(line))
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        if !self.color {
            return Cow::Borrowed(hint);
        }
        Cow::Owned(hint.with(Color::DarkGrey).to_string())
    }

    fn highlight_char(&self, _line: &str, _pos: usize, kind: CmdKind) -> bool {
        self.color && !matches!(kind, CmdKind::MoveCursor)
    }
}

impl Validator for ShellHelper {}

fn editor_error(error: ReadlineError) -> Error {
    match error {
        ReadlineError::Io(e) => Error::Stdio(e),
        other => Error::Misc(other.to_string()),
    }
}

/// Interactive input through a rustyline editor.
pub struct RustylineSource {
    editor: Editor<ShellHelper, DefaultHistory>,
}

impl RustylineSource {
    pub fn new(helper: ShellHelper) -> Result<Self> {
        let config = Config::builder()
            .completion_type(CompletionType::List)
            .auto_add_history(false)
            .max_history_size(HISTORY_LENGTH)
            .map_err(editor_error)?
            .build();
        let mut editor = Editor::with_config(config).map_err(editor_error)?;
        editor.set_helper(Some(helper));
        Ok(Self { editor })
    }
}

impl LineSource for RustylineSource {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(e) => Err(editor_error(e)),
        }
    }

    fn add_history(&mut self, line: &str) {
        if let Err(e) = self.editor.add_history_entry(line) {
            log::debug!("Could not add `{line}` to the editor history: {e}");
        }
    }

    fn load_history(&mut self, lines: &[String]) {
        for line in lines {
            self.add_history(line);
        }
    }

    fn clear_history(&mut self) {
        if let Err(e) = self.editor.clear_history() {
            log::debug!("Could not clear the editor history: {e}");
        }
    }

    fn set_shell_path(&mut self, shell_path: &[String]) {
        if let Some(helper) = self.editor.helper_mut() {
            helper.set_shell_path(shell_path);
        }
    }
}
