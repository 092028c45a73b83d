//! Loading and validation of shell definition files.
//!
//! A definition file is YAML describing the root shell, its commands,
//! nested groups and sub-shells, and every parameter. Loading validates
//! names, uniqueness, arities, choice and tuple declarations, defaults and
//! `run` template keys, so the command tree built from a loaded definition
//! never has to deal with malformed input.

use std::collections::HashSet;
use std::fs::File;

use crate::command_definitions::{CommandDefinition, ParameterDefinition, ParameterType, ShellDefinition};
use crate::error::Error::{
    EmptyName, InvalidArity, MissingChoices, MissingElements, NameWithDash, NameWithSpace,
    NonUniqueCommandName, NonUniqueParameterName, NotFoundParameterName,
};
use crate::error::{Error, Result};
use crate::interpolation::get_template_keys;

fn get_reader(file_description: &str, path: &str) -> Result<File> {
    match File::open(path) {
        Ok(reader) => Ok(reader),
        Err(e) => Err(Error::io_error(
            file_description.to_string(),
            path.to_string(),
            e,
        )),
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(EmptyName);
    }

    if name.contains(char::is_whitespace) {
        return Err(NameWithSpace(name.to_string()));
    }

    if name.starts_with('-') {
        return Err(NameWithDash(name.to_string()));
    }

    Ok(())
}

fn validate_parameter(command: &str, parameter: &ParameterDefinition) -> Result<()> {
    validate_name(&parameter.name)?;

    if parameter.arity == 0 {
        return Err(InvalidArity(command.to_string(), parameter.name.clone()));
    }

    match parameter.kind {
        ParameterType::Choice if parameter.choices.is_empty() => {
            return Err(MissingChoices(command.to_string(), parameter.name.clone()));
        }
        ParameterType::Tuple if parameter.elements.is_empty() => {
            return Err(MissingElements(command.to_string(), parameter.name.clone()));
        }
        _ => {}
    }

    // Converts the kind and the default, surfacing bad element types and
    // defaults that do not fit the declared kind.
    let kind = parameter.value_kind()?;
    parameter.default_value(&kind)?;

    Ok(())
}

fn validate_parameters(command: &CommandDefinition) -> Result<()> {
    let mut names = HashSet::new();
    for parameter in command.arguments.iter().chain(command.options.iter()) {
        validate_parameter(&command.name, parameter)?;

        if !names.insert(parameter.name.clone()) {
            return Err(NonUniqueParameterName(
                format!("{command}"),
                parameter.name.clone(),
            ));
        }
    }

    if let Some(run) = &command.run {
        for key in get_template_keys(run)? {
            if !names.contains(&key) {
                return Err(NotFoundParameterName(command.name.clone(), key));
            }
        }
    }

    Ok(())
}

fn validate_commands(parent: &str, commands: &[CommandDefinition]) -> Result<()> {
    let mut names = HashSet::new();

    for command in commands.iter() {
        validate_name(&command.name)?;
        if !names.insert(command.name.clone()) {
            return Err(NonUniqueCommandName(parent.to_string(), command.name.clone()));
        }

        for alias in &command.aliases {
            validate_name(alias)?;
            if !names.insert(alias.clone()) {
                return Err(NonUniqueCommandName(parent.to_string(), alias.clone()));
            }
        }

        validate_parameters(command)?;
        validate_commands(&command.name, &command.commands)?;
    }

    Ok(())
}

/// Parses and validates a shell definition from YAML text.
///
/// `source` names where the text came from and only appears in errors.
pub fn parse_shell_definition(yaml: &str, source: &str) -> Result<ShellDefinition> {
    let definition: ShellDefinition = serde_yaml::from_str(yaml).map_err(|e| {
        Error::yaml_error(
            "reading".to_string(),
            "shell definition".to_string(),
            source.to_string(),
            e,
        )
    })?;

    validate_shell_definition(&definition, source)?;

    Ok(definition)
}

fn validate_shell_definition(definition: &ShellDefinition, source: &str) -> Result<()> {
    if definition.commands.is_empty() {
        return Err(Error::empty_command_definition(source.to_string()));
    }

    validate_name(&definition.name)?;
    for option in &definition.options {
        validate_parameter(&definition.name, option)?;
    }
    validate_commands(&definition.name, &definition.commands)
}

/// Loads and validates the shell definition file.
///
/// # Arguments
///
/// * `definitions_path` - Path to the YAML definition file
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The YAML is malformed or doesn't match the expected structure
/// - The definition declares no commands
/// - Command or parameter names are invalid or non-unique
/// - A parameter declares a bad arity, no choices, no tuple elements, or a
///   default that does not fit its type
/// - A `run` template references a parameter the command doesn't declare
///
/// # Examples
///
/// ```no_run
/// use pretty_shell_core::file_handling::get_shell_definition;
///
/// let shell = get_shell_definition("/etc/pretty-shell/shell.yml")?;
/// println!("Loaded {} commands", shell.commands.len());
/// # Ok::<(), pretty_shell_core::error::Error>(())
/// ```
pub fn get_shell_definition(definitions_path: &str) -> Result<ShellDefinition> {
    let reader = get_reader("shell definition", definitions_path)?;

    let definition: ShellDefinition = serde_yaml::from_reader(reader).map_err(|e| {
        Error::yaml_error(
            "reading".to_string(),
            "shell definition".to_string(),
            definitions_path.to_string(),
            e,
        )
    })?;

    validate_shell_definition(&definition, definitions_path)?;
    log::debug!(
        "Loaded shell definition `{}` from {definitions_path}",
        definition.name
    );

    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(yaml: &str) -> Result<ShellDefinition> {
        parse_shell_definition(yaml, "test")
    }

    #[test]
    fn test_validate_name_valid() {
        assert!(validate_name("valid_name").is_ok());
        assert!(validate_name("test123").is_ok());
        assert!(validate_name("my-command").is_ok());
    }

    #[test]
    fn test_validate_name_empty() {
        assert!(matches!(validate_name(""), Err(EmptyName)));
    }

    #[test]
    fn test_validate_name_with_space() {
        assert!(matches!(validate_name("has space"), Err(NameWithSpace(_))));
    }

    #[test]
    fn test_validate_name_with_dash() {
        assert!(matches!(validate_name("--flag"), Err(NameWithDash(_))));
    }

    #[test]
    fn test_duplicate_command_names() {
        let result = parse(
            r#"
name: demo
commands:
  - name: one
  - name: one
"#,
        );
        assert!(matches!(result, Err(NonUniqueCommandName(_, _))));
    }

    #[test]
    fn test_alias_clashing_with_command() {
        let result = parse(
            r#"
name: demo
commands:
  - name: one
    aliases: [two]
  - name: two
"#,
        );
        assert!(matches!(result, Err(NonUniqueCommandName(_, name)) if name == "two"));
    }

    #[test]
    fn test_duplicate_parameter_names() {
        let result = parse(
            r#"
name: demo
commands:
  - name: one
    arguments: [{name: value}]
    options: [{name: value}]
"#,
        );
        assert!(matches!(result, Err(NonUniqueParameterName(_, _))));
    }

    #[test]
    fn test_choice_without_choices() {
        let result = parse(
            r#"
name: demo
commands:
  - name: one
    options: [{name: color, type: choice}]
"#,
        );
        assert!(matches!(result, Err(MissingChoices(_, _))));
    }

    #[test]
    fn test_tuple_without_elements() {
        let result = parse(
            r#"
name: demo
commands:
  - name: one
    options: [{name: pair, type: tuple}]
"#,
        );
        assert!(matches!(result, Err(MissingElements(_, _))));
    }

    #[test]
    fn test_zero_arity() {
        let result = parse(
            r#"
name: demo
commands:
  - name: one
    arguments: [{name: value, arity: 0}]
"#,
        );
        assert!(matches!(result, Err(InvalidArity(_, _))));
    }

    #[test]
    fn test_run_template_with_unknown_key() {
        let result = parse(
            r#"
name: demo
commands:
  - name: greet
    arguments: [{name: name}]
    run: "Hello {nmae}"
"#,
        );
        assert!(matches!(result, Err(NotFoundParameterName(_, key)) if key == "nmae"));
    }

    #[test]
    fn test_nested_commands_are_validated() {
        let result = parse(
            r#"
name: demo
commands:
  - name: group
    commands:
      - name: "bad name"
"#,
        );
        assert!(matches!(result, Err(NameWithSpace(_))));
    }

    #[test]
    fn test_get_shell_definition_valid_yaml() {
        let yaml_content = r#"
name: demo
prompt: "demo > "
commands:
  - name: greet
    help: Say hello
    arguments: [{name: name}]
    run: "Hello {name}!"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml_content).unwrap();
        let temp_path = temp_file.path().to_str().unwrap();

        let shell = get_shell_definition(temp_path).unwrap();
        assert_eq!(shell.name, "demo");
        assert_eq!(shell.prompt.as_deref(), Some("demo > "));
        assert_eq!(shell.commands.len(), 1);
        assert_eq!(shell.commands[0].name, "greet");
    }

    #[test]
    fn test_get_shell_definition_empty_commands() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "name: demo\ncommands: []\n").unwrap();
        let temp_path = temp_file.path().to_str().unwrap();

        let result = get_shell_definition(temp_path);
        assert!(matches!(result, Err(Error::EmptyCommandDefinition { .. })));
    }

    #[test]
    fn test_get_shell_definition_invalid_yaml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "invalid: yaml: content: [").unwrap();
        let temp_path = temp_file.path().to_str().unwrap();

        assert!(matches!(
            get_shell_definition(temp_path),
            Err(Error::Yaml { .. })
        ));
    }

    #[test]
    fn test_get_shell_definition_file_not_found() {
        let result = get_shell_definition("/this/path/does/not/exist.yml");
        assert!(matches!(result, Err(Error::Io { .. })));
    }
}
