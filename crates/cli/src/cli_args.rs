//! Command-line argument parsing.
//!
//! This module defines the command-line interface of the `psh` binary using
//! the `clap` crate.

use clap::Parser;

/// Command-line arguments for the pretty-shell CLI.
///
/// # Examples
///
/// ```rust
/// use clap::Parser;
/// use pretty_shell_cli::cli_args::Args;
///
/// let args = Args::parse_from(["psh", "--fuzzy"]);
/// assert!(args.fuzzy);
/// ```
#[derive(Parser, Debug)] // requires `derive` feature
#[command(term_width = 0)] // Just to make testing across clap features easier
#[allow(clippy::struct_excessive_bools)]
pub struct Args {
    /// Path to the shell definition YAML.
    ///
    /// If not provided, defaults to `~/.pretty-shell/shell.yml`.
    #[arg(long, short = 'c')]
    pub definitions: Option<String>,

    /// Path to the line history file.
    ///
    /// Overrides the `history_file` named in the shell definition. If neither
    /// is set, defaults to `~/.pretty-shell/.pcshell-history`.
    #[arg(long, short = 'H')]
    pub history_file: Option<String>,

    /// Rank completions with fuzzy matching instead of prefix matching.
    #[arg(long, action)]
    pub fuzzy: bool,

    /// Compute completions on a background thread while typing and show the
    /// best one as an inline hint.
    #[arg(long, action)]
    pub live_completion: bool,

    /// Disable colored output and syntax highlighting.
    #[arg(long, action)]
    pub no_color: bool,

    /// Delete the history file and exit.
    #[arg(long, action)]
    pub clear_history: bool,

    /// A command line to run once, non-interactively.
    ///
    /// # Examples
    /// ```bash
    /// psh -c shell.yml greet Ada --loud
    /// ```
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl Args {
    /// The one-shot command joined back into a line, if one was given.
    ///
    /// Words containing whitespace are re-quoted so they stay one word.
    pub fn one_shot_line(&self) -> Option<String> {
        if self.command.is_empty() {
            return None;
        }

        let words: Vec<String> = self
            .command
            .iter()
            .map(|word| {
                if word.is_empty() || word.contains(char::is_whitespace) {
                    format!("{word:?}")
                } else {
                    word.clone()
                }
            })
            .collect();
        Some(words.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_values() {
        let args = Args::parse_from(["psh"]);

        assert!(args.definitions.is_none());
        assert!(args.history_file.is_none());
        assert!(!args.fuzzy);
        assert!(!args.live_completion);
        assert!(!args.no_color);
        assert!(!args.clear_history);
        assert!(args.command.is_empty());
        assert!(args.one_shot_line().is_none());
    }

    #[test]
    fn test_args_short_flags() {
        let args = Args::parse_from(["psh", "-c", "/custom/shell.yml", "-H", "/custom/history"]);

        assert_eq!(args.definitions, Some("/custom/shell.yml".to_string()));
        assert_eq!(args.history_file, Some("/custom/history".to_string()));
    }

    #[test]
    fn test_args_long_flags() {
        let args = Args::parse_from([
            "psh",
            "--definitions",
            "/custom/shell.yml",
            "--history-file",
            "/custom/history",
            "--fuzzy",
            "--live-completion",
            "--no-color",
            "--clear-history",
        ]);

        assert_eq!(args.definitions, Some("/custom/shell.yml".to_string()));
        assert!(args.fuzzy);
        assert!(args.live_completion);
        assert!(args.no_color);
        assert!(args.clear_history);
    }

    #[test]
    fn test_one_shot_command_keeps_its_flags() {
        let args = Args::parse_from(["psh", "greet", "Ada", "--loud", "--times", "2"]);

        assert_eq!(args.command, vec!["greet", "Ada", "--loud", "--times", "2"]);
        assert_eq!(args.one_shot_line(), Some("greet Ada --loud --times 2".to_string()));
    }

    #[test]
    fn test_one_shot_words_with_spaces_are_quoted() {
        let args = Args::parse_from(["psh", "greet", "Ada Lovelace"]);

        assert_eq!(args.one_shot_line(), Some("greet \"Ada Lovelace\"".to_string()));
    }
}
