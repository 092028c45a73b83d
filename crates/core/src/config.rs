//! Configuration for pretty-shell.
//!
//! This module resolves the paths the shell reads and writes (the shell
//! definition file and the history file), expands shell variables like `~`
//! in them, and carries the small set of session settings the REPL loop needs.

/// Default path for the shell definition file
const DEFAULT_DEFINITIONS_PATH: &str = "~/.pretty-shell/shell.yml";
/// Default path for the persisted line history
const DEFAULT_HISTORY_PATH: &str = "~/.pretty-shell/.pcshell-history";

/// Maximum number of entries kept in the history file
pub const HISTORY_LENGTH: usize = 1000;

/// Default prompt template; `{name}` is the innermost shell name
pub const DEFAULT_PROMPT: &str = "{name} > ";

/// Resolves the shell definition file path.
///
/// If a custom path is provided, uses that path. Otherwise, uses the default
/// definition path. Shell expansions like `~` are resolved.
///
/// # Arguments
///
/// * `definitions_path_arg` - Optional custom definition file path
///
/// # Examples
///
/// ```
/// use pretty_shell_core::config::get_definitions_path;
///
/// let default_path = get_definitions_path(&None);
/// assert!(default_path.ends_with("shell.yml"));
///
/// let custom_path = get_definitions_path(&Some("/path/to/shell.yml".to_string()));
/// assert_eq!(custom_path, "/path/to/shell.yml");
/// ```
pub fn get_definitions_path(definitions_path_arg: &Option<String>) -> String {
    let definitions_path = match definitions_path_arg {
        Some(definitions_path) => definitions_path,
        None => DEFAULT_DEFINITIONS_PATH,
    };

    shellexpand::tilde(definitions_path).to_string()
}

/// Resolves the history file path.
///
/// The command line argument wins over the path named in the shell
/// definition, which wins over the default.
pub fn get_history_path(history_path_arg: &Option<String>, definition_path: &Option<String>) -> String {
    let history_path = match (history_path_arg, definition_path) {
        (Some(history_path), _) => history_path,
        (None, Some(history_path)) => history_path,
        (None, None) => DEFAULT_HISTORY_PATH,
    };

    shellexpand::tilde(history_path).to_string()
}

/// Settings for a single REPL session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Printed once before the first prompt.
    pub intro: Option<String>,
    /// Whether error blocks are written with terminal colors.
    pub color: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            intro: None,
            color: true,
        }
    }
}
