//! Runs commands from a shell definition by rendering their `run` templates.

use std::io::Write;

use indexmap::IndexMap;
use itertools::Itertools;

use pretty_shell_core::command_definitions::ShellDefinition;
use pretty_shell_core::interpolation::render_command;
use pretty_shell_core::parser::BoundCommand;
use pretty_shell_core::session::{CommandFailure, CommandHost};
use pretty_shell_core::tree::CommandNode;

fn unexpected(error: impl ToString) -> CommandFailure {
    CommandFailure::Unexpected {
        message: error.to_string(),
        detail: None,
    }
}

/// Writes each command's rendered `run` template. Commands without one echo
/// their bound values instead.
pub struct TemplateHost {
    templates: IndexMap<Vec<String>, String>,
}

impl TemplateHost {
    pub fn new(definition: &ShellDefinition) -> Self {
        Self {
            templates: definition.run_templates(),
        }
    }

    pub fn template(&self, path: &[String]) -> Option<&str> {
        self.templates.get(path).map(String::as_str)
    }
}

impl CommandHost for TemplateHost {
    fn invoke(
        &mut self,
        node: &CommandNode,
        bound: &BoundCommand,
        out: &mut dyn Write,
    ) -> Result<(), CommandFailure> {
        let rendered = match self.templates.get(&node.path) {
            Some(template) => render_command(template, node, bound).map_err(unexpected)?,
            None => {
                if bound.values.is_empty() {
                    return Ok(());
                }
                bound
                    .values
                    .iter()
                    .map(|(name, value)| format!("{name}={value}"))
                    .join(" ")
            }
        };

        log::debug!("Ran `{}`: {rendered}", node.path.join(" "));
        writeln!(out, "{rendered}").map_err(unexpected)
    }
}
