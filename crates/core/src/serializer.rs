//! Canonical text for a bound command, used to replay it with `repeat`.
//!
//! The produced line parses back to the same [`BoundCommand`] in the same
//! shell: arguments come first, then options in declaration order; flags
//! appear only when set; text is quoted whenever the tokenizer would
//! otherwise split or reinterpret it; floats keep a decimal point.

use crate::parser::BoundCommand;
use crate::tree::{CommandNode, ValueKind};
use crate::value::Value;

pub struct CommandLineSerializer;

impl CommandLineSerializer {
    /// Serializes `bound` relative to `shell_path`.
    pub fn serialize(node: &CommandNode, bound: &BoundCommand, shell_path: &[String]) -> String {
        let relative = bound
            .path
            .strip_prefix(shell_path)
            .unwrap_or(bound.path.as_slice());
        let mut words: Vec<String> = relative.to_vec();

        for argument in &node.arguments {
            if let Some(value) = bound.values.get(&argument.name) {
                push_value(&mut words, value);
            }
        }

        for option in node.options.iter().filter(|o| !o.is_help) {
            let Some(value) = bound.values.get(&option.name) else {
                continue;
            };
            match (&option.kind, value) {
                (ValueKind::Flag, Value::Bool(set)) => {
                    if *set {
                        words.push(option.flag_token());
                    }
                }
                (_, Value::List(occurrences)) if option.repeatable => {
                    for occurrence in occurrences {
                        words.push(option.flag_token());
                        push_value(&mut words, occurrence);
                    }
                }
                _ => {
                    words.push(option.flag_token());
                    push_value(&mut words, value);
                }
            }
        }

        words.join(" ")
    }
}

fn push_value(words: &mut Vec<String>, value: &Value) {
    match value {
        Value::List(items) => {
            for item in items {
                push_value(words, item);
            }
        }
        other => words.push(format_word(other)),
    }
}

fn format_word(value: &Value) -> String {
    match value {
        Value::Bool(value) => value.to_string(),
        Value::Integer(value) => value.to_string(),
        Value::Float(value) => format!("{value:?}"),
        Value::Text(text) | Value::Choice(text) => quote_word(text),
        Value::Tuple(items) => format_literal(items),
        Value::List(items) => items.iter().map(format_word).collect::<Vec<_>>().join(" "),
    }
}

fn format_literal(items: &[Value]) -> String {
    let elements: Vec<String> = items
        .iter()
        .map(|item| match item {
            Value::Text(text) | Value::Choice(text) => double_quote(text),
            Value::Tuple(inner) => format_literal(inner),
            other => format_word(other),
        })
        .collect();
    format!("[{}]", elements.join(", "))
}

fn is_safe_char(c: char) -> bool {
    c.is_alphanumeric() || "-_./:@%+=~".contains(c)
}

fn quote_word(text: &str) -> String {
    let bare = !text.is_empty()
        && text.chars().all(is_safe_char)
        && !text.starts_with('-');
    if bare {
        text.to_string()
    } else {
        double_quote(text)
    }
}

fn double_quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{LineParser, ParsedLine};
    use crate::test_support::fixture_index;

    fn round_trip(line: &str, shell_path: &[String]) -> (String, BoundCommand, BoundCommand) {
        let index = fixture_index();
        let parser = LineParser::new(&index);
        let ParsedLine::Invoke { node, bound } = parser.parse(line, shell_path).unwrap() else {
            panic!("expected an invocation for `{line}`");
        };
        let canonical = CommandLineSerializer::serialize(&node, &bound, shell_path);
        let ParsedLine::Invoke { bound: reparsed, .. } = parser.parse(&canonical, shell_path).unwrap() else {
            panic!("expected an invocation for `{canonical}`");
        };
        (canonical, bound, reparsed)
    }

    #[test]
    fn test_canonical_form() {
        let (canonical, _, _) = round_trip("api test --opt2 yes hello --opt1 red", &[]);
        assert_eq!(canonical, "api test hello --opt1 red --opt2 true");
    }

    #[test]
    fn test_text_is_quoted_when_needed() {
        let (canonical, bound, reparsed) = round_trip(r#"api test "two words \"q\"""#, &[]);
        assert_eq!(canonical, r#"api test "two words \"q\"""#);
        assert_eq!(bound, reparsed);

        let (canonical, bound, reparsed) = round_trip(r#"api test "-5""#, &[]);
        assert_eq!(canonical, r#"api test "-5""#);
        assert_eq!(bound, reparsed);

        let (canonical, _, _) = round_trip(r#"api test """#, &[]);
        assert_eq!(canonical, r#"api test """#);
    }

    #[test]
    fn test_tuples_and_repeated_options() {
        let (canonical, bound, reparsed) = round_trip(
            r#"multi tuple --c [true, false] --t ["a", 2.0, false, "choice2"] --c [false, true] x -3 1e3 --dev"#,
            &[],
        );
        assert_eq!(
            canonical,
            r#"multi tup x -3 1000.0 --t ["a", 2.0, false, "choice2"] --c [true, false] --c [false, true] --dev"#
        );
        assert_eq!(bound, reparsed);
    }

    #[test]
    fn test_flags_only_when_set() {
        let (canonical, bound, reparsed) = round_trip("greet Ada", &[]);
        assert_eq!(canonical, "greet Ada --times 1");
        assert_eq!(bound, reparsed);
    }

    #[test]
    fn test_relative_to_sub_shell() {
        let shell = vec!["someshell".to_string()];
        let (canonical, bound, reparsed) = round_trip("group cmd blue", &shell);
        assert_eq!(canonical, "group cmd blue");
        assert_eq!(bound, reparsed);
    }

    #[test]
    fn test_multi_arity_round_trip() {
        let (canonical, bound, reparsed) = round_trip("multi point 3 4 origin --offset 1 2", &[]);
        assert_eq!(canonical, "multi point 3 4 origin --offset 1.0 2.0");
        assert_eq!(bound, reparsed);
    }
}
