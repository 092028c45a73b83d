//! Classifies every token of the line for coloring.
//!
//! Each token is resolved as if the cursor sat right after it, then checked
//! against what the resolver expected there: a known child command, a
//! declared option, or a value of the right type. Anything that fails its
//! check is [`TokenClass::Invalid`].

use crate::resolver::{CursorRole, LineContextResolver, ResolvedContext};
use crate::tokenizer::{tokenize, Token};
use crate::tree::{CommandTreeIndex, ValueKind};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenClass {
    Command,
    Group,
    Shell,
    Builtin,
    ExitBuiltin,
    Option,
    Text,
    Number,
    Boolean,
    Choice,
    Literal,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
    pub start: usize,
    pub end: usize,
    pub class: TokenClass,
}

pub struct SyntaxHighlighter<'a> {
    resolver: LineContextResolver<'a>,
}

impl<'a> SyntaxHighlighter<'a> {
    pub fn new(index: &'a CommandTreeIndex) -> Self {
        Self {
            resolver: LineContextResolver::new(index),
        }
    }

    pub fn classify(&self, line: &str, shell_path: &[String]) -> Vec<HighlightSpan> {
        let tokens = tokenize(line);
        (0..tokens.len())
            .map(|index| {
                let context = self.resolver.resolve(&tokens[..=index], shell_path);
                HighlightSpan {
                    start: tokens[index].start,
                    end: tokens[index].end,
                    class: classify_token(&context, &tokens[index]),
                }
            })
            .collect()
    }
}

fn classify_token(context: &ResolvedContext, token: &Token) -> TokenClass {
    match context.cursor_role {
        CursorRole::CommandName => {
            let child = context
                .active_node
                .as_ref()
                .and_then(|node| node.child(&token.text));
            match child {
                None => TokenClass::Invalid,
                Some(child) => match child.builtin {
                    Some(builtin) if builtin.ends_shell() => TokenClass::ExitBuiltin,
                    Some(_) => TokenClass::Builtin,
                    None if child.is_shell_root => TokenClass::Shell,
                    None if child.is_group => TokenClass::Group,
                    None => TokenClass::Command,
                },
            }
        }
        CursorRole::OptionFlag => {
            let known = context
                .active_node
                .as_ref()
                .and_then(|node| node.option_for_flag(&token.text))
                .is_some();
            if known {
                TokenClass::Option
            } else {
                TokenClass::Invalid
            }
        }
        CursorRole::OptionValue => match &context.active_option {
            Some(option) => classify_value(&option.kind, &token.text),
            None => TokenClass::Invalid,
        },
        CursorRole::ArgumentValue => match &context.active_argument {
            Some(argument) => classify_value(&argument.kind, &token.text),
            None => TokenClass::Invalid,
        },
        CursorRole::TupleElement => match &context.tuple_state {
            Some(state) if state.check().is_ok() => TokenClass::Literal,
            _ => TokenClass::Invalid,
        },
        CursorRole::Unresolved => TokenClass::Invalid,
    }
}

fn classify_value(kind: &ValueKind, text: &str) -> TokenClass {
    if matches!(kind, ValueKind::LiteralTuple(_)) {
        // A literal's own tokens resolve as tuple elements; a bare word in
        // a tuple position never parses.
        return TokenClass::Invalid;
    }
    match Value::parse(kind, text) {
        Ok(Value::Bool(_)) => TokenClass::Boolean,
        Ok(Value::Integer(_) | Value::Float(_)) => TokenClass::Number,
        Ok(Value::Choice(_)) => TokenClass::Choice,
        Ok(_) => TokenClass::Text,
        Err(_) => TokenClass::Invalid,
    }
}
