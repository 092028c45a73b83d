//! The read / dispatch loop.
//!
//! [`ReplSession`] reads one line at a time from a [`LineSource`], parses
//! it against the command tree relative to the current shell path and
//! hands bound commands to a [`CommandHost`]. Errors of every kind are
//! rendered to the output sink and the loop carries on; only `exit`/`quit`
//! at the root shell or end of input on the interactive source end it.
//!
//! `repeat` works by queueing the canonical text of the last successful
//! repeatable command as a one-line replay buffer. The next iteration reads
//! that buffer instead of the terminal, so a replayed command goes through
//! the same parsing and validation as a typed one.

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use thiserror::Error;

use crate::config::{SessionConfig, DEFAULT_PROMPT};
use crate::error::{Error, Result, UsageError};
use crate::history::HistoryStore;
use crate::interpolation::interpolate;
use crate::parser::{BoundCommand, LineParser, ParsedLine};
use crate::serializer::CommandLineSerializer;
use crate::suggest::suggest;
use crate::tree::{Builtin, CommandNode, CommandTreeIndex};
use crate::usage::{render_help, render_usage};

/// What a prompt is rendered from.
pub struct PromptContext<'a> {
    /// Name of the innermost shell.
    pub shell_name: &'a str,
    /// Sub-shell names below the root.
    pub shell_path: &'a [String],
    pub root_name: &'a str,
}

pub enum PromptSource {
    Static(String),
    /// A `leon` template with `{name}` (innermost shell) and `{path}` (root
    /// and sub-shells separated by spaces).
    Template(String),
    Dynamic(Box<dyn Fn(&PromptContext) -> String>),
}

impl Default for PromptSource {
    fn default() -> Self {
        PromptSource::Template(DEFAULT_PROMPT.to_string())
    }
}

impl PromptSource {
    pub fn render(&self, context: &PromptContext) -> String {
        match self {
            PromptSource::Static(text) => text.clone(),
            PromptSource::Template(template) => {
                let mut path = vec![context.root_name.to_string()];
                path.extend(context.shell_path.iter().cloned());
                let values = HashMap::from([
                    ("name".to_string(), context.shell_name.to_string()),
                    ("path".to_string(), path.join(" ")),
                ]);
                interpolate(template, &values).unwrap_or_else(|e| {
                    log::warn!("Could not render prompt template `{template}`: {e}");
                    template.clone()
                })
            }
            PromptSource::Dynamic(render) => render(context),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Ctrl+C: the partial line is discarded.
    Interrupted,
    Eof,
}

/// Where interactive lines come from. The line editor implements this.
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;

    fn add_history(&mut self, _line: &str) {}

    fn load_history(&mut self, _lines: &[String]) {}

    fn clear_history(&mut self) {}

    /// Called whenever a sub-shell is entered or left.
    fn set_shell_path(&mut self, _shell_path: &[String]) {}
}

/// A [`LineSource`] fed from a fixed list, for one-shot runs and tests.
/// It reports end of input once the list is exhausted.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    outcomes: VecDeque<ReadOutcome>,
    prompts: Vec<String>,
    history: Vec<String>,
}

impl ScriptedSource {
    pub fn new<I: IntoIterator<Item = ReadOutcome>>(outcomes: I) -> Self {
        Self {
            outcomes: outcomes.into_iter().collect(),
            prompts: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        Self::new(lines.iter().map(|line| ReadOutcome::Line(line.as_ref().to_string())))
    }

    /// Every prompt shown so far.
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }
}

impl LineSource for ScriptedSource {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        self.prompts.push(prompt.to_string());
        Ok(self.outcomes.pop_front().unwrap_or(ReadOutcome::Eof))
    }

    fn add_history(&mut self, line: &str) {
        self.history.push(line.to_string());
    }

    fn load_history(&mut self, lines: &[String]) {
        self.history = lines.to_vec();
    }

    fn clear_history(&mut self) {
        self.history.clear();
    }
}

/// How a command callback reports failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandFailure {
    /// The values were accepted by the parser but rejected by the command.
    #[error("{}", .0)]
    Usage(String),

    #[error("{}", .message)]
    Unexpected {
        message: String,
        detail: Option<String>,
    },
}

/// The application side of the shell: validates and runs bound commands.
pub trait CommandHost {
    /// Business-rule checks run before [`CommandHost::invoke`].
    fn validate(
        &self,
        _node: &CommandNode,
        _bound: &BoundCommand,
    ) -> std::result::Result<(), CommandFailure> {
        Ok(())
    }

    fn invoke(
        &mut self,
        node: &CommandNode,
        bound: &BoundCommand,
        out: &mut dyn Write,
    ) -> std::result::Result<(), CommandFailure>;

    fn help(&self, node: &CommandNode, shell_path: &[String]) -> String {
        render_help(node, shell_path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    InteractiveTerminal,
    /// Holds the line to replay until it has been read.
    ReplayBuffer(Option<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    ReadingLine,
    Dispatching,
    AwaitingReplayLine,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Blank line; nothing ran.
    Swallowed,
    Executed,
    Failed,
    /// A replay line was queued.
    Replay,
    EnteredShell,
    LeftShell,
    Exit,
}

pub struct ReplSession<L: LineSource, H: CommandHost, W: Write> {
    index: CommandTreeIndex,
    source: L,
    host: H,
    out: W,
    history: Box<dyn HistoryStore>,
    config: SessionConfig,
    prompt: PromptSource,
    shell_path: Vec<String>,
    last_command: Option<String>,
    /// Shell the last repeatable command ran in; its line is relative to it.
    last_command_shell: Vec<String>,
    input: InputSource,
    state: SessionState,
}

impl<L: LineSource, H: CommandHost, W: Write> ReplSession<L, H, W> {
    pub fn new(
        index: CommandTreeIndex,
        source: L,
        host: H,
        out: W,
        history: Box<dyn HistoryStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            index,
            source,
            host,
            out,
            history,
            config,
            prompt: PromptSource::default(),
            shell_path: Vec::new(),
            last_command: None,
            last_command_shell: Vec::new(),
            input: InputSource::InteractiveTerminal,
            state: SessionState::Idle,
        }
    }

    pub fn with_prompt(mut self, prompt: PromptSource) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn shell_path(&self) -> &[String] {
        &self.shell_path
    }

    /// Canonical text of the last successful repeatable command.
    pub fn last_command(&self) -> Option<&str> {
        self.last_command.as_deref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn input_source(&self) -> &InputSource {
        &self.input
    }

    pub fn source(&self) -> &L {
        &self.source
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn history(&self) -> &dyn HistoryStore {
        self.history.as_ref()
    }

    pub fn prompt_text(&self) -> String {
        let root_name = self.index.root().name.as_str();
        let shell_name = self.shell_path.last().map(String::as_str).unwrap_or(root_name);
        self.prompt.render(&PromptContext {
            shell_name,
            shell_path: &self.shell_path,
            root_name,
        })
    }

    /// Runs until the session terminates. History is loaded first and
    /// flushed at the end.
    pub fn run(&mut self) -> Result<()> {
        match self.history.load() {
            Ok(entries) => {
                let lines: Vec<String> = entries.into_iter().map(|entry| entry.line).collect();
                self.source.load_history(&lines);
            }
            Err(e) => log::warn!("Could not load history: {e}"),
        }

        if let Some(intro) = &self.config.intro {
            writeln!(self.out, "{intro}")?;
        }

        while self.state != SessionState::Terminated {
            self.step()?;
        }

        self.flush_history();
        self.out.flush()?;
        Ok(())
    }

    /// Reads and dispatches one line, or handles one interrupt or end of
    /// input.
    pub fn step(&mut self) -> Result<SessionState> {
        let replay = match &mut self.input {
            InputSource::ReplayBuffer(buffer) => Some(buffer.take()),
            InputSource::InteractiveTerminal => None,
        };

        let line = match replay {
            Some(Some(line)) => {
                self.state = SessionState::AwaitingReplayLine;
                let prompt = self.prompt_text();
                writeln!(self.out, "{prompt}{line}")?;

                // The stored line is relative to the shell it ran in, which
                // may have been left since.
                let current = std::mem::replace(&mut self.shell_path, self.last_command_shell.clone());
                self.state = SessionState::Dispatching;
                let outcome = self.dispatch_line(&line);
                self.shell_path = current;
                if outcome? != DispatchOutcome::Exit {
                    self.state = SessionState::Idle;
                }
                return Ok(self.state);
            }
            Some(None) => {
                // Back to the terminal without the blank line an interactive
                // end of input would print.
                self.input = InputSource::InteractiveTerminal;
                self.state = SessionState::Idle;
                return Ok(self.state);
            }
            None => {
                self.state = SessionState::ReadingLine;
                let prompt = self.prompt_text();
                match self.source.read_line(&prompt)? {
                    ReadOutcome::Line(line) => line,
                    ReadOutcome::Interrupted => {
                        writeln!(self.out)?;
                        self.state = SessionState::Idle;
                        return Ok(self.state);
                    }
                    ReadOutcome::Eof => {
                        writeln!(self.out)?;
                        log::info!("End of input; closing the shell");
                        self.state = SessionState::Terminated;
                        return Ok(self.state);
                    }
                }
            }
        };

        self.state = SessionState::Dispatching;
        let outcome = self.dispatch_line(&line)?;
        if outcome != DispatchOutcome::Exit {
            self.state = SessionState::Idle;
        }
        Ok(self.state)
    }

    /// Parses and runs one line. Only output errors are returned; command
    /// errors are rendered and reported through the outcome.
    pub fn dispatch_line(&mut self, line: &str) -> Result<DispatchOutcome> {
        if line.trim().is_empty() {
            return Ok(DispatchOutcome::Swallowed);
        }

        self.history.append(line);
        self.source.add_history(line);

        let parsed = LineParser::new(&self.index).parse(line, &self.shell_path);
        let outcome = match parsed {
            Ok(ParsedLine::Empty) => DispatchOutcome::Swallowed,
            Ok(ParsedLine::Invoke { node, bound }) => self.invoke(&node, &bound)?,
            Ok(ParsedLine::Builtin { builtin, args }) => self.run_builtin(builtin, &args)?,
            Ok(ParsedLine::EnterShell(node)) => {
                log::info!("Entering shell `{}`", node.name);
                self.shell_path = node.path.clone();
                self.source.set_shell_path(&self.shell_path);
                DispatchOutcome::EnteredShell
            }
            Ok(ParsedLine::Help(node)) => {
                let help = self.host.help(&node, &self.shell_path);
                writeln!(self.out, "{help}")?;
                DispatchOutcome::Executed
            }
            Err(error) => {
                self.report_error(&error)?;
                DispatchOutcome::Failed
            }
        };

        if !matches!(
            outcome,
            DispatchOutcome::Swallowed | DispatchOutcome::Replay | DispatchOutcome::Exit
        ) {
            writeln!(self.out)?;
        }
        self.flush_history();
        self.out.flush()?;

        Ok(outcome)
    }

    fn invoke(&mut self, node: &Arc<CommandNode>, bound: &BoundCommand) -> Result<DispatchOutcome> {
        if let Err(failure) = self.host.validate(node, bound) {
            self.report_failure(node, &failure)?;
            return Ok(DispatchOutcome::Failed);
        }

        let host = &mut self.host;
        let out: &mut dyn Write = &mut self.out;
        let result = panic::catch_unwind(AssertUnwindSafe(move || host.invoke(node, bound, out)));

        match result {
            Ok(Ok(())) => {
                if node.is_repeatable {
                    self.last_command =
                        Some(CommandLineSerializer::serialize(node, bound, &self.shell_path));
                    self.last_command_shell = self.shell_path.clone();
                }
                Ok(DispatchOutcome::Executed)
            }
            Ok(Err(failure)) => {
                self.report_failure(node, &failure)?;
                Ok(DispatchOutcome::Failed)
            }
            Err(payload) => {
                let failure = CommandFailure::Unexpected {
                    message: panic_message(payload.as_ref()),
                    detail: None,
                };
                self.report_failure(node, &failure)?;
                Ok(DispatchOutcome::Failed)
            }
        }
    }

    fn run_builtin(&mut self, builtin: Builtin, args: &[String]) -> Result<DispatchOutcome> {
        match builtin {
            Builtin::Help => self.show_help(args),
            Builtin::ClearHistory => {
                self.source.clear_history();
                match self.history.clear() {
                    Ok(()) => writeln!(self.out, "History cleared successfully")?,
                    Err(e) => {
                        log::warn!("Could not clear history: {e}");
                        self.write_error_line(&format!("Could not clear history: {e}"))?;
                    }
                }
                Ok(DispatchOutcome::Executed)
            }
            Builtin::Clear => {
                queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
                Ok(DispatchOutcome::Executed)
            }
            Builtin::Quit | Builtin::Exit => {
                if let Some(left) = self.shell_path.pop() {
                    log::info!("Leaving shell `{left}`");
                    self.source.set_shell_path(&self.shell_path);
                    Ok(DispatchOutcome::LeftShell)
                } else {
                    self.state = SessionState::Terminated;
                    Ok(DispatchOutcome::Exit)
                }
            }
            Builtin::Repeat => match &self.last_command {
                Some(line) => {
                    self.input = InputSource::ReplayBuffer(Some(line.clone()));
                    Ok(DispatchOutcome::Replay)
                }
                None => {
                    writeln!(self.out, "No command to repeat.")?;
                    Ok(DispatchOutcome::Executed)
                }
            },
        }
    }

    fn show_help(&mut self, args: &[String]) -> Result<DispatchOutcome> {
        let mut path = self.shell_path.clone();
        path.extend(args.iter().cloned());

        match self.index.lookup(&path) {
            Some(node) => {
                let help = self.host.help(node, &self.shell_path);
                writeln!(self.out, "{help}")?;
                Ok(DispatchOutcome::Executed)
            }
            None => {
                let name = args.join(" ");
                let suggestion = self.index.lookup(&self.shell_path).and_then(|shell| {
                    let names: Vec<&str> = shell.visible_children().map(|c| c.name.as_str()).collect();
                    suggest(&names, &name)
                });
                self.report_error(&Error::UnknownCommand { name, suggestion })?;
                Ok(DispatchOutcome::Failed)
            }
        }
    }

    fn flush_history(&mut self) {
        if let Err(e) = self.history.flush() {
            log::warn!("Could not write history: {e}");
        }
    }

    fn colored(&mut self, color: Color, text: &str) -> Result<()> {
        if self.config.color {
            queue!(
                self.out,
                SetForegroundColor(color),
                Print(text),
                ResetColor
            )?;
        } else {
            write!(self.out, "{text}")?;
        }
        Ok(())
    }

    fn write_error_line(&mut self, message: &str) -> Result<()> {
        self.colored(Color::Red, "Error: ")?;
        writeln!(self.out, "{message}")?;
        Ok(())
    }

    fn write_usage_block(&mut self, node: &CommandNode, message: &str) -> Result<()> {
        let usage = render_usage(node, &self.shell_path);
        let relative = node.path.strip_prefix(self.shell_path.as_slice()).unwrap_or(&node.path);
        writeln!(self.out, "{usage}")?;
        writeln!(self.out, "Try '{} --help' for help.", relative.join(" "))?;
        writeln!(self.out)?;
        self.write_error_line(message)
    }

    fn report_error(&mut self, error: &Error) -> Result<()> {
        log::debug!("Dispatch failed: {error:?}");
        match error {
            Error::UnknownCommand { name, suggestion } => {
                self.colored(Color::Red, &format!("Command not found: {name}"))?;
                writeln!(self.out)?;
                if let Some(suggestion) = suggestion {
                    writeln!(self.out)?;
                    write!(self.out, "\t")?;
                    self.colored(Color::Cyan, "Did you mean \"")?;
                    self.colored(Color::Yellow, suggestion)?;
                    self.colored(Color::Cyan, "\"?")?;
                    writeln!(self.out)?;
                }
                Ok(())
            }
            Error::Usage { command, source } => {
                let path: Vec<&str> = command.split_whitespace().collect();
                let message = match source {
                    UsageError::NoSuchOption {
                        suggestion: Some(suggestion),
                        ..
                    } => format!("{source} (Possible options: {suggestion})"),
                    _ => source.to_string(),
                };
                match self.index.lookup(&path).cloned() {
                    Some(node) => self.write_usage_block(&node, &message),
                    None => self.write_error_line(&message),
                }
            }
            other => self.write_error_line(&other.to_string()),
        }
    }

    fn report_failure(&mut self, node: &CommandNode, failure: &CommandFailure) -> Result<()> {
        match failure {
            CommandFailure::Usage(message) => self.write_usage_block(node, message),
            CommandFailure::Unexpected { message, detail } => {
                log::warn!("Command `{}` failed unexpectedly: {message}", node.path.join(" "));
                if self.config.color {
                    queue!(self.out, SetAttribute(Attribute::Bold))?;
                }
                self.colored(Color::Red, "An unexpected error has occurred")?;
                if self.config.color {
                    queue!(self.out, SetAttribute(Attribute::Reset))?;
                }
                writeln!(self.out)?;
                writeln!(self.out, "  {message}")?;
                if let Some(detail) = detail {
                    for line in detail.lines() {
                        writeln!(self.out, "    {line}")?;
                    }
                }
                Ok(())
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "The command panicked".to_string()
    }
}
