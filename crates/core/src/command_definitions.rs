use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::tree::{
    ArgumentSpec, ChoiceSet, CommandGraph, ElementKind, OptionSpec, ScalarKind, ValueKind,
};
use crate::value::{Value, ValueError};

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    Flag,
    #[serde(alias = "bool")]
    Boolean,
    #[default]
    #[serde(alias = "string", alias = "str")]
    Text,
    #[serde(alias = "int")]
    Integer,
    Float,
    Choice,
    Tuple,
}

/// One position of a tuple parameter.
#[derive(Deserialize, Debug, Clone)]
pub struct ElementDefinition {
    #[serde(rename = "type", default)]
    pub kind: ParameterType,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub display_tags: Vec<String>,
    #[serde(default)]
    pub elements: Vec<ElementDefinition>,
}

/// An option (`--name value`) or a positional argument of a command.
#[derive(Deserialize, Debug, Clone)]
pub struct ParameterDefinition {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ParameterType,
    pub short: Option<char>,
    pub help: Option<String>,
    pub default: Option<serde_yaml::Value>,
    #[serde(default = "default_arity")]
    pub arity: usize,
    #[serde(default)]
    pub multiple: bool,
    pub required: Option<bool>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub display_tags: Vec<String>,
    #[serde(default)]
    pub elements: Vec<ElementDefinition>,
}

fn default_arity() -> usize {
    1
}

impl Display for ParameterDefinition {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "`{}`", self.name)?;

        if let Some(help) = &self.help {
            write!(formatter, " ({})", help)?;
        }

        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct CommandDefinition {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub help: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    /// Entering this group starts a nested shell.
    #[serde(default)]
    pub shell: bool,
    /// Successful runs can be replayed with `repeat`.
    #[serde(default)]
    pub repeatable: bool,
    #[serde(default)]
    pub options: Vec<ParameterDefinition>,
    #[serde(default)]
    pub arguments: Vec<ParameterDefinition>,
    #[serde(default)]
    pub commands: Vec<CommandDefinition>,
    /// Output template rendered with the bound parameter values.
    pub run: Option<String>,
}

impl Display for CommandDefinition {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.help {
            Some(help) => write!(formatter, "{} ({})", self.name, help),
            None => formatter.write_str(&self.name),
        }
    }
}

/// The top of a definition file: the root shell and its commands.
#[derive(Deserialize, Debug, Clone)]
pub struct ShellDefinition {
    pub name: String,
    pub help: Option<String>,
    pub prompt: Option<String>,
    pub intro: Option<String>,
    pub history_file: Option<String>,
    #[serde(default)]
    pub options: Vec<ParameterDefinition>,
    #[serde(default)]
    pub commands: Vec<CommandDefinition>,
}

impl ShellDefinition {
    /// `run` templates keyed by command path.
    pub fn run_templates(&self) -> IndexMap<Vec<String>, String> {
        let mut templates = IndexMap::new();
        for command in &self.commands {
            collect_run_templates(command, Vec::new(), &mut templates);
        }
        templates
    }
}

fn collect_run_templates(
    command: &CommandDefinition,
    mut path: Vec<String>,
    templates: &mut IndexMap<Vec<String>, String>,
) {
    path.push(command.name.clone());
    if let Some(run) = &command.run {
        templates.insert(path.clone(), run.clone());
    }
    for child in &command.commands {
        collect_run_templates(child, path.clone(), templates);
    }
}

impl ElementDefinition {
    pub fn element_kind(&self, parameter: &str) -> Result<ElementKind> {
        Ok(match self.kind {
            ParameterType::Flag => return Err(Error::FlagElement(parameter.to_string())),
            ParameterType::Boolean => ElementKind::Boolean,
            ParameterType::Text => ElementKind::Scalar(ScalarKind::Text),
            ParameterType::Integer => ElementKind::Scalar(ScalarKind::Integer),
            ParameterType::Float => ElementKind::Scalar(ScalarKind::Float),
            ParameterType::Choice => ElementKind::Choice(
                ChoiceSet::new(self.choices.clone()).with_display_tags(self.display_tags.clone()),
            ),
            ParameterType::Tuple => ElementKind::Tuple(
                self.elements
                    .iter()
                    .map(|element| element.element_kind(parameter))
                    .collect::<Result<_>>()?,
            ),
        })
    }
}

impl ParameterDefinition {
    pub fn value_kind(&self) -> Result<ValueKind> {
        Ok(match self.kind {
            ParameterType::Flag => ValueKind::Flag,
            ParameterType::Boolean => ValueKind::Boolean,
            ParameterType::Text => ValueKind::Scalar(ScalarKind::Text),
            ParameterType::Integer => ValueKind::Scalar(ScalarKind::Integer),
            ParameterType::Float => ValueKind::Scalar(ScalarKind::Float),
            ParameterType::Choice => ValueKind::Choice(
                ChoiceSet::new(self.choices.clone()).with_display_tags(self.display_tags.clone()),
            ),
            ParameterType::Tuple => ValueKind::LiteralTuple(
                self.elements
                    .iter()
                    .map(|element| element.element_kind(&self.name))
                    .collect::<Result<_>>()?,
            ),
        })
    }

    /// The declared default, converted to the parameter's kind.
    pub fn default_value(&self, kind: &ValueKind) -> Result<Option<Value>> {
        let Some(default) = &self.default else {
            return Ok(None);
        };
        let text = yaml_to_text(default);
        let parse_one = |text: &str| {
            Value::parse(kind, text).map_err(|error| {
                let reason = match error {
                    ValueError::Expected(expected) => format!("`{text}` is not a valid {expected}"),
                    ValueError::InvalidChoice(choices) => {
                        format!("`{text}` is not one of {choices}")
                    }
                    ValueError::Tuple(error) => error.to_string(),
                };
                Error::InvalidDefault(self.name.clone(), reason)
            })
        };

        let is_list = self.arity > 1 && !matches!(kind, ValueKind::LiteralTuple(_));
        let parse_occurrence = |value: &serde_yaml::Value| match value {
            serde_yaml::Value::Sequence(items) if is_list => {
                let values = items
                    .iter()
                    .map(|item| parse_one(&yaml_to_text(item)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::List(values))
            }
            other => parse_one(&yaml_to_text(other)),
        };

        // A repeatable option's default is a list with one value per
        // occurrence; a sequence lists the occurrences.
        if self.multiple {
            let occurrences = match default {
                serde_yaml::Value::Sequence(items) => {
                    items.iter().map(parse_occurrence).collect::<Result<Vec<_>>>()?
                }
                _ => vec![parse_one(&text)?],
            };
            return Ok(Some(Value::List(occurrences)));
        }

        parse_occurrence(default).map(Some)
    }

    pub fn to_option_spec(&self) -> Result<OptionSpec> {
        let kind = self.value_kind()?;
        let default = self.default_value(&kind)?;
        let mut option = OptionSpec::new(&self.name, kind);
        option.short = self.short;
        option.arity = self.arity;
        option.repeatable = self.multiple;
        option.required = self.required.unwrap_or(false);
        option.hidden = self.hidden;
        option.help = self.help.clone();
        option.default = default;
        Ok(option)
    }

    pub fn to_argument_spec(&self) -> Result<ArgumentSpec> {
        let kind = self.value_kind()?;
        let default = self.default_value(&kind)?;
        let mut argument = ArgumentSpec::new(&self.name, kind);
        argument.arity = self.arity;
        argument.required = self.required.unwrap_or(default.is_none());
        argument.help = self.help.clone();
        argument.default = default;
        Ok(argument)
    }
}

/// Scalars as their text form; sequences as a bracketed literal.
fn yaml_to_text(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(text) => text.clone(),
        serde_yaml::Value::Bool(value) => value.to_string(),
        serde_yaml::Value::Number(number) => number.to_string(),
        serde_yaml::Value::Sequence(items) => {
            let rendered: Vec<String> = items
                .iter()
                .map(|item| match item {
                    serde_yaml::Value::String(text) => format!("{text:?}"),
                    other => yaml_to_text(other),
                })
                .collect();
            format!("[{}]", rendered.join(", "))
        }
        serde_yaml::Value::Null => String::new(),
        other => format!("{other:?}"),
    }
}

fn option_specs(definitions: &[ParameterDefinition]) -> Result<Vec<OptionSpec>> {
    definitions.iter().map(ParameterDefinition::to_option_spec).collect()
}

fn argument_specs(definitions: &[ParameterDefinition]) -> Result<Vec<ArgumentSpec>> {
    definitions
        .iter()
        .map(ParameterDefinition::to_argument_spec)
        .collect()
}

impl CommandGraph for CommandDefinition {
    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> &[String] {
        &self.aliases
    }

    fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    fn is_hidden(&self) -> bool {
        self.hidden
    }

    fn is_shell(&self) -> bool {
        self.shell
    }

    fn is_repeatable(&self) -> bool {
        self.repeatable
    }

    fn options(&self) -> Result<Vec<OptionSpec>> {
        option_specs(&self.options)
    }

    fn arguments(&self) -> Result<Vec<ArgumentSpec>> {
        argument_specs(&self.arguments)
    }

    fn subcommands(&self) -> Vec<&dyn CommandGraph> {
        self.commands
            .iter()
            .map(|command| command as &dyn CommandGraph)
            .collect()
    }
}

impl CommandGraph for ShellDefinition {
    fn name(&self) -> &str {
        &self.name
    }

    fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    fn is_shell(&self) -> bool {
        true
    }

    fn options(&self) -> Result<Vec<OptionSpec>> {
        option_specs(&self.options)
    }

    fn arguments(&self) -> Result<Vec<ArgumentSpec>> {
        Ok(Vec::new())
    }

    fn subcommands(&self) -> Vec<&dyn CommandGraph> {
        self.commands
            .iter()
            .map(|command| command as &dyn CommandGraph)
            .collect()
    }
}
