//! Plain-text help for commands and groups.

use itertools::Itertools;

use crate::tree::{CommandNode, ValueKind};

/// `Usage: api test [OPTIONS] ARG1`, with the path relative to the shell.
pub fn render_usage(node: &CommandNode, shell_path: &[String]) -> String {
    let relative = node.path.strip_prefix(shell_path).unwrap_or(&node.path);

    let mut parts: Vec<String> = relative.to_vec();
    if node.options.iter().any(|o| !o.hidden) {
        parts.push("[OPTIONS]".to_string());
    }
    for argument in &node.arguments {
        let mut name = argument.name.to_uppercase();
        if argument.arity > 1 {
            name = format!("{name}...");
        }
        if argument.required {
            parts.push(name);
        } else {
            parts.push(format!("[{name}]"));
        }
    }
    if node.is_group {
        parts.push("COMMAND [ARGS]...".to_string());
    }

    format!("Usage: {}", parts.join(" "))
}

fn two_columns(rows: &[(String, String)]) -> String {
    let width = rows.iter().map(|(left, _)| left.len()).max().unwrap_or(0);
    rows.iter()
        .map(|(left, right)| {
            if right.is_empty() {
                format!("  {left}")
            } else {
                format!("  {left:width$}  {right}")
            }
        })
        .join("\n")
}

/// Full help: usage line, description, then argument, option and command
/// sections for whatever the node declares.
pub fn render_help(node: &CommandNode, shell_path: &[String]) -> String {
    let mut sections = vec![render_usage(node, shell_path)];

    if let Some(help) = &node.help {
        sections.push(format!("  {}", help.trim()));
    }

    let arguments: Vec<(String, String)> = node
        .arguments
        .iter()
        .map(|argument| {
            (
                format!("{} <{}>", argument.name.to_uppercase(), argument.kind.type_name()),
                argument.help.clone().unwrap_or_default(),
            )
        })
        .collect();
    if !arguments.is_empty() {
        sections.push(format!("Arguments:\n{}", two_columns(&arguments)));
    }

    let options: Vec<(String, String)> = node
        .options
        .iter()
        .filter(|option| !option.hidden)
        .map(|option| {
            let mut flag = match option.short {
                Some(short) => format!("-{short}, {}", option.flag_token()),
                None => option.flag_token(),
            };
            if !matches!(option.kind, ValueKind::Flag) {
                flag = format!("{flag} <{}>", option.kind.type_name());
            }
            let mut help = option.help.clone().unwrap_or_default();
            if let ValueKind::Choice(choices) = &option.kind {
                help = format!("{help} [{}]", choices.values().join("|")).trim().to_string();
            }
            if option.repeatable {
                help = format!("{help} (repeatable)").trim().to_string();
            }
            (flag, help)
        })
        .collect();
    if !options.is_empty() {
        sections.push(format!("Options:\n{}", two_columns(&options)));
    }

    let commands: Vec<(String, String)> = node
        .visible_children()
        .map(|child| (child.name.clone(), child.short_help().to_string()))
        .collect();
    if !commands.is_empty() {
        sections.push(format!("Commands:\n{}", two_columns(&commands)));
    }

    sections.join("\n\n")
}
