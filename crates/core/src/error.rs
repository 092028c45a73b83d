use leon::{ParseError, RenderError};
use thiserror::Error;

use crate::tuple::TupleError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("STDIO error: {}", .0)]
    Stdio(#[from] std::io::Error),

    #[error("Error {} {} file at `{}`: {}", .action, .file_description, .path, .original)]
    Yaml {
        action: String,
        file_description: String,
        path: String,
        original: serde_yaml::Error,
    },

    #[error("IO error with {} file at path `{}`: {}", .file_description, .path, .original)]
    Io {
        file_description: String,
        path: String,
        original: std::io::Error,
    },

    #[error("No commands were found in the shell definition YAML. Is `{}` empty?", .path)]
    EmptyCommandDefinition { path: String },

    #[error("Error parsing template string: {}", .0)]
    Parse(#[from] ParseError),

    #[error("Error rendering template string: {}", .0)]
    Render(#[from] RenderError),

    #[error("Found a non-unique command name under `{}`: `{}`", .0, .1)]
    NonUniqueCommandName(String, String),

    #[error("Found a non-unique parameter name on command `{}`: `{}`", .0, .1)]
    NonUniqueParameterName(String, String),

    #[error("Template of command `{}` references unknown parameter `{}`", .0, .1)]
    NotFoundParameterName(String, String),

    #[error("Invalid name: name may not be empty")]
    EmptyName,

    #[error("Invalid name `{}`: name may not contain spaces", .0)]
    NameWithSpace(String),

    #[error("Invalid name `{}`: name may not start with a dash", .0)]
    NameWithDash(String),

    #[error("Parameter `{}` on command `{}` must consume at least one value", .1, .0)]
    InvalidArity(String, String),

    #[error("Parameter `{}` on command `{}` is a choice but declares no choices", .1, .0)]
    MissingChoices(String, String),

    #[error("Parameter `{}` on command `{}` is a tuple but declares no elements", .1, .0)]
    MissingElements(String, String),

    #[error("Tuple elements of parameter `{}` may not be flags", .0)]
    FlagElement(String),

    #[error("Invalid default for parameter `{}`: {}", .0, .1)]
    InvalidDefault(String, String),

    #[error("Command not found: {}", .name)]
    UnknownCommand {
        name: String,
        suggestion: Option<String>,
    },

    #[error("{}", .source)]
    Usage {
        command: String,
        source: UsageError,
    },

    #[error("Invalid value for '{}': {}", .parameter, .source)]
    Tuple {
        parameter: String,
        source: TupleError,
    },

    #[error("Misc error: {}", .0)]
    Misc(String),
}

/// Problems with how a command line was put together, reported before the
/// command callback is reached.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UsageError {
    #[error("Missing argument '{}'.", .0)]
    MissingArgument(String),

    #[error("Missing option '--{}'.", .0)]
    MissingOption(String),

    #[error("Got unexpected extra argument ({}).", .0)]
    UnexpectedArgument(String),

    #[error("No such option: {}", .option)]
    NoSuchOption {
        option: String,
        suggestion: Option<String>,
    },

    #[error("'{}' requires {} value(s) but {} were given.", .parameter, .expected, .found)]
    MissingValue {
        parameter: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid value for '{}': '{}' is not a valid {}.", .parameter, .value, .expected)]
    BadValue {
        parameter: String,
        value: String,
        expected: String,
    },

    #[error("Invalid value for '{}': '{}' is not one of {}.", .parameter, .value, .choices)]
    InvalidChoice {
        parameter: String,
        value: String,
        choices: String,
    },
}

impl Error {
    pub fn empty_command_definition(path: String) -> Self {
        Self::EmptyCommandDefinition { path }
    }

    pub fn yaml_error(
        action: String,
        file_description: String,
        path: String,
        original: serde_yaml::Error,
    ) -> Self {
        Self::Yaml {
            action,
            file_description,
            path,
            original,
        }
    }

    pub fn io_error(file_description: String, path: String, original: std::io::Error) -> Self {
        Self::Io {
            file_description,
            path,
            original,
        }
    }

    pub fn usage(command: &[String], source: UsageError) -> Self {
        Self::Usage {
            command: command.join(" "),
            source,
        }
    }

    pub fn tuple(parameter: &str, source: TupleError) -> Self {
        Self::Tuple {
            parameter: parameter.to_string(),
            source,
        }
    }
}
