//! Turns a submitted line into something the session can dispatch.
//!
//! The line is walked the same way the resolver walks it for completion,
//! but strictly: unknown commands and options, missing or malformed values
//! and extra arguments are errors. Literal tuples are extracted into typed
//! values before the command ever sees them.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Error, Result, UsageError};
use crate::resolver::{walk_command_path, walk_parameters, Segment};
use crate::suggest::suggest;
use crate::tokenizer::{tokenize, Token};
use crate::tree::{Builtin, CommandNode, CommandTreeIndex, ValueKind};
use crate::tuple::LiteralTupleTracker;
use crate::value::{Value, ValueError};

/// A command with every parameter converted to its declared type.
///
/// Values are keyed by parameter name, arguments first, then options, each
/// in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundCommand {
    pub path: Vec<String>,
    pub values: IndexMap<String, Value>,
}

impl BoundCommand {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

#[derive(Debug, Clone)]
pub enum ParsedLine {
    Empty,
    Invoke {
        node: Arc<CommandNode>,
        bound: BoundCommand,
    },
    Builtin {
        builtin: Builtin,
        args: Vec<String>,
    },
    EnterShell(Arc<CommandNode>),
    Help(Arc<CommandNode>),
}

pub struct LineParser<'a> {
    index: &'a CommandTreeIndex,
}

impl<'a> LineParser<'a> {
    pub fn new(index: &'a CommandTreeIndex) -> Self {
        Self { index }
    }

    pub fn parse(&self, line: &str, shell_path: &[String]) -> Result<ParsedLine> {
        self.parse_tokens(&tokenize(line), shell_path)
    }

    pub fn parse_tokens(&self, tokens: &[Token], shell_path: &[String]) -> Result<ParsedLine> {
        if tokens.is_empty() {
            return Ok(ParsedLine::Empty);
        }

        let shell = self
            .index
            .lookup(shell_path)
            .ok_or_else(|| Error::UnknownCommand {
                name: shell_path.join(" "),
                suggestion: None,
            })?;

        let (node, start) = walk_command_path(shell, tokens, |_| {});

        if let Some(builtin) = node.builtin {
            let args = tokens[start..].iter().map(|t| t.text.clone()).collect();
            return Ok(ParsedLine::Builtin { builtin, args });
        }

        if node.is_group {
            if let Some(token) = tokens.get(start).filter(|t| !t.is_flag_like()) {
                let names: Vec<&str> = node.visible_children().map(|c| c.name.as_str()).collect();
                return Err(Error::UnknownCommand {
                    name: token.text.clone(),
                    suggestion: suggest(&names, &token.text),
                });
            }

            return Ok(match bind(&node, tokens, start)? {
                Some(_) if node.is_shell_root && !Arc::ptr_eq(&node, shell) => {
                    ParsedLine::EnterShell(node)
                }
                _ => ParsedLine::Help(node),
            });
        }

        Ok(match bind(&node, tokens, start)? {
            Some(bound) => ParsedLine::Invoke { node, bound },
            None => ParsedLine::Help(node),
        })
    }
}

/// Binds the parameters of `node`. `None` means `--help` was given.
fn bind(node: &CommandNode, tokens: &[Token], start: usize) -> Result<Option<BoundCommand>> {
    let usage = |source: UsageError| Error::usage(&node.path, source);
    let walk = walk_parameters(node, tokens, start);

    let mut options: IndexMap<String, Value> = IndexMap::new();
    let mut positionals: IndexMap<usize, Value> = IndexMap::new();

    for segment in &walk.segments {
        match segment {
            Segment::UnknownFlag { token } => {
                let typed = &tokens[*token].text;
                let flags: Vec<String> = node
                    .options
                    .iter()
                    .filter(|o| !o.hidden)
                    .map(|o| o.flag_token())
                    .collect();
                return Err(usage(UsageError::NoSuchOption {
                    option: typed.clone(),
                    suggestion: suggest(&flags, typed),
                }));
            }
            Segment::Flag { option } if option.is_help => return Ok(None),
            Segment::Flag { option } => {
                options.insert(option.name.clone(), Value::Bool(true));
            }
            Segment::OptionValue {
                option,
                flag,
                occurrence,
                tokens: values,
                complete,
            } => {
                let is_tuple = matches!(option.kind, ValueKind::LiteralTuple(_));
                if values.is_empty() || (!complete && !is_tuple) {
                    return Err(usage(UsageError::MissingValue {
                        parameter: tokens[*flag].text.clone(),
                        expected: option.value_count(),
                        found: values.len(),
                    }));
                }

                let label = if *occurrence > 0 {
                    format!("{} (occurrence {})", option.flag_token(), occurrence + 1)
                } else {
                    option.flag_token()
                };
                let value = convert(&node.path, &label, &option.kind, tokens, values)?;

                if option.repeatable {
                    match options
                        .entry(option.name.clone())
                        .or_insert_with(|| Value::List(Vec::new()))
                    {
                        Value::List(occurrences) => occurrences.push(value),
                        other => *other = Value::List(vec![value]),
                    }
                } else {
                    options.insert(option.name.clone(), value);
                }
            }
            Segment::Positional {
                argument: None,
                tokens: values,
                ..
            } => {
                let extra = values.first().map(|i| tokens[*i].text.clone()).unwrap_or_default();
                return Err(usage(UsageError::UnexpectedArgument(extra)));
            }
            Segment::Positional {
                slot,
                argument: Some(argument),
                tokens: values,
                complete,
            } => {
                let is_tuple = matches!(argument.kind, ValueKind::LiteralTuple(_));
                if !complete && !is_tuple {
                    return Err(usage(UsageError::MissingValue {
                        parameter: argument.name.clone(),
                        expected: argument.value_count(),
                        found: values.len(),
                    }));
                }
                let value = convert(&node.path, &argument.name, &argument.kind, tokens, values)?;
                positionals.insert(*slot, value);
            }
        }
    }

    let mut bound = IndexMap::new();

    for (slot, argument) in node.arguments.iter().enumerate() {
        match (positionals.swap_remove(&slot), &argument.default) {
            (Some(value), _) => {
                bound.insert(argument.name.clone(), value);
            }
            (None, Some(default)) => {
                bound.insert(argument.name.clone(), default.clone());
            }
            (None, None) if argument.required => {
                return Err(usage(UsageError::MissingArgument(argument.name.to_uppercase())));
            }
            (None, None) => {}
        }
    }

    for option in node.options.iter().filter(|o| !o.is_help) {
        match (options.swap_remove(&option.name), &option.default) {
            (Some(value), _) => {
                bound.insert(option.name.clone(), value);
            }
            (None, Some(default)) => {
                bound.insert(option.name.clone(), default.clone());
            }
            (None, None) if matches!(option.kind, ValueKind::Flag) => {
                bound.insert(option.name.clone(), Value::Bool(false));
            }
            (None, None) if option.required => {
                return Err(usage(UsageError::MissingOption(option.name.clone())));
            }
            (None, None) => {}
        }
    }

    Ok(Some(BoundCommand {
        path: node.path.clone(),
        values: bound,
    }))
}

fn convert(
    path: &[String],
    parameter: &str,
    kind: &ValueKind,
    tokens: &[Token],
    values: &[usize],
) -> Result<Value> {
    if let ValueKind::LiteralTuple(elements) = kind {
        let first = values.first().copied().unwrap_or(tokens.len());
        let (value, consumed) = LiteralTupleTracker::new(elements)
            .extract(tokens, first)
            .map_err(|e| Error::tuple(parameter, e))?;
        if consumed != values.len() {
            log::debug!("Literal for {parameter} spanned {consumed} of {} tokens", values.len());
        }
        return Ok(value);
    }

    let converted = values
        .iter()
        .map(|&index| {
            let text = &tokens[index].text;
            Value::parse(kind, text).map_err(|error| {
                let source = match error {
                    ValueError::InvalidChoice(choices) => UsageError::InvalidChoice {
                        parameter: parameter.to_string(),
                        value: text.clone(),
                        choices,
                    },
                    ValueError::Expected(expected) => UsageError::BadValue {
                        parameter: parameter.to_string(),
                        value: text.clone(),
                        expected,
                    },
                    ValueError::Tuple(error) => return Error::tuple(parameter, error),
                };
                Error::usage(path, source)
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(match <[Value; 1]>::try_from(converted) {
        Ok([single]) => single,
        Err(many) => Value::List(many),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture_index;

    fn parse(line: &str) -> Result<ParsedLine> {
        let index = fixture_index();
        LineParser::new(&index).parse(line, &[])
    }

    fn bound(line: &str) -> BoundCommand {
        match parse(line).unwrap() {
            ParsedLine::Invoke { bound, .. } => bound,
            other => panic!("expected an invocation, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_line() {
        assert!(matches!(parse("   ").unwrap(), ParsedLine::Empty));
    }

    #[test]
    fn test_binds_arguments_and_options() {
        let bound = bound("api test hello --opt1 red --opt2 no");
        assert_eq!(bound.path, vec!["api".to_string(), "test".to_string()]);
        assert_eq!(bound.get("arg1"), Some(&Value::Text("hello".to_string())));
        assert_eq!(bound.get("opt1"), Some(&Value::Choice("red".to_string())));
        assert_eq!(bound.get("opt2"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_values_follow_declaration_order() {
        let bound = bound("api test --opt2 yes --opt1 blue hello");
        let keys: Vec<&String> = bound.values.keys().collect();
        assert_eq!(keys, vec!["arg1", "opt1", "opt2"]);
    }

    #[test]
    fn test_defaults_and_absent_flags() {
        let bound = bound("greet Ada");
        assert_eq!(bound.get("loud"), Some(&Value::Bool(false)));
        assert_eq!(bound.get("times"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_literal_tuple_extraction() {
        let bound = bound(r#"multi tup --t ["a b", 1.5, true, choice1] x 2 3.0"#);
        assert_eq!(
            bound.get("t"),
            Some(&Value::Tuple(vec![
                Value::Text("a b".to_string()),
                Value::Float(1.5),
                Value::Bool(true),
                Value::Choice("choice1".to_string()),
            ]))
        );
        assert_eq!(bound.get("test2"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_repeated_tuple_occurrences() {
        let bound = bound("multi tup --c [true, false] --c [false, false] x 1 1.0");
        assert_eq!(
            bound.get("c"),
            Some(&Value::List(vec![
                Value::Tuple(vec![Value::Bool(true), Value::Bool(false)]),
                Value::Tuple(vec![Value::Bool(false), Value::Bool(false)]),
            ]))
        );
    }

    #[test]
    fn test_wrong_tuple_length_is_fatal() {
        let error = parse("multi tup --c [true] x 1 1.0").unwrap_err();
        assert!(matches!(error, Error::Tuple { .. }));
    }

    #[test]
    fn test_second_occurrence_named_in_error() {
        let error = parse("multi tup --c [true, true] --c [1, true] x 1 1.0").unwrap_err();
        match error {
            Error::Tuple { parameter, .. } => assert_eq!(parameter, "--c (occurrence 2)"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_dangling_comma_tuple_is_closed() {
        let bound = bound("load --data [1, true, \"x\",");
        assert_eq!(
            bound.get("data"),
            Some(&Value::Tuple(vec![
                Value::Integer(1),
                Value::Bool(true),
                Value::Text("x".to_string()),
            ]))
        );
    }

    #[test]
    fn test_unknown_command_suggests() {
        match parse("multi tpu").unwrap_err() {
            Error::UnknownCommand { name, .. } => assert_eq!(name, "tpu"),
            other => panic!("unexpected error {other:?}"),
        }
        match parse("setings").unwrap_err() {
            Error::UnknownCommand { suggestion, .. } => {
                assert_eq!(suggestion.as_deref(), Some("settings"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_unknown_option_suggests() {
        match parse("api test x --opt3 red").unwrap_err() {
            Error::Usage {
                source: UsageError::NoSuchOption { option, suggestion },
                ..
            } => {
                assert_eq!(option, "--opt3");
                assert_eq!(suggestion.as_deref(), Some("--opt1, or --opt2"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_missing_argument() {
        let error = parse("api test").unwrap_err();
        assert!(matches!(
            error,
            Error::Usage { source: UsageError::MissingArgument(ref name), .. } if name == "ARG1"
        ));
    }

    #[test]
    fn test_extra_argument() {
        let error = parse("api test a b").unwrap_err();
        assert!(matches!(
            error,
            Error::Usage { source: UsageError::UnexpectedArgument(ref extra), .. } if extra == "b"
        ));
    }

    #[test]
    fn test_bad_choice() {
        let error = parse("api test a --opt1 green").unwrap_err();
        assert!(matches!(
            error,
            Error::Usage { source: UsageError::InvalidChoice { .. }, .. }
        ));
    }

    #[test]
    fn test_option_missing_value() {
        let error = parse("api test a --opt1").unwrap_err();
        assert!(matches!(
            error,
            Error::Usage { source: UsageError::MissingValue { .. }, .. }
        ));
    }

    #[test]
    fn test_multi_arity() {
        let bound = bound("multi point 1 2 label --offset 0.5 1.5");
        assert_eq!(
            bound.get("coords"),
            Some(&Value::List(vec![Value::Integer(1), Value::Integer(2)]))
        );
        assert_eq!(
            bound.get("offset"),
            Some(&Value::List(vec![Value::Float(0.5), Value::Float(1.5)]))
        );
    }

    #[test]
    fn test_repeatable_default_binds_each_occurrence() {
        let yaml = "name: tags\ncommands:\n  - name: tag\n    options:\n      - name: label\n        multiple: true\n        default: [a, b]\n";
        let definition = crate::file_handling::parse_shell_definition(yaml, "test").unwrap();
        let index = crate::tree::CommandTreeIndex::build(&definition).unwrap();
        let parser = LineParser::new(&index);

        let ParsedLine::Invoke { bound, .. } = parser.parse("tag", &[]).unwrap() else {
            panic!("`tag` should invoke");
        };
        assert_eq!(
            bound.get("label"),
            Some(&Value::List(vec![
                Value::Text("a".to_string()),
                Value::Text("b".to_string())
            ]))
        );

        let ParsedLine::Invoke { bound, .. } = parser.parse("tag --label c", &[]).unwrap() else {
            panic!("`tag --label c` should invoke");
        };
        assert_eq!(bound.get("label"), Some(&Value::List(vec![Value::Text("c".to_string())])));
    }

    #[test]
    fn test_quoted_dash_is_argument() {
        let bound = bound(r#"api test "--opt1""#);
        assert_eq!(bound.get("arg1"), Some(&Value::Text("--opt1".to_string())));
    }

    #[test]
    fn test_help_flag() {
        assert!(matches!(parse("api test --help").unwrap(), ParsedLine::Help(node) if node.name == "test"));
        assert!(matches!(parse("api").unwrap(), ParsedLine::Help(node) if node.name == "api"));
    }

    #[test]
    fn test_builtins() {
        match parse("help api test").unwrap() {
            ParsedLine::Builtin { builtin, args } => {
                assert_eq!(builtin, Builtin::Help);
                assert_eq!(args, vec!["api".to_string(), "test".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            parse("q").unwrap(),
            ParsedLine::Builtin { builtin: Builtin::Quit, .. }
        ));
    }

    #[test]
    fn test_enter_sub_shell() {
        assert!(matches!(
            parse("someshell").unwrap(),
            ParsedLine::EnterShell(node) if node.path == vec!["someshell".to_string()]
        ));
    }

    #[test]
    fn test_parses_relative_to_sub_shell() {
        let index = fixture_index();
        let parsed = LineParser::new(&index)
            .parse("group cmd red", &["someshell".to_string()])
            .unwrap();
        match parsed {
            ParsedLine::Invoke { bound, .. } => {
                assert_eq!(bound.path, vec!["someshell", "group", "cmd"]);
                assert_eq!(bound.get("choice"), Some(&Value::Choice("red".to_string())));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
