use std::fmt;

use crate::tree::{ScalarKind, ValueKind};
use crate::tuple::{LiteralTupleTracker, TupleError};

/// A typed parameter value bound to a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Choice(String),
    Tuple(Vec<Value>),
    /// Several values for one parameter: multi-arity or repeated options.
    List(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueError {
    Expected(String),
    InvalidChoice(String),
    Tuple(TupleError),
}

impl Value {
    /// Converts one command-line word to the given kind.
    pub fn parse(kind: &ValueKind, text: &str) -> Result<Value, ValueError> {
        match kind {
            ValueKind::Flag | ValueKind::Boolean => parse_bool(text)
                .map(Value::Bool)
                .ok_or_else(|| ValueError::Expected("boolean".to_string())),
            ValueKind::Scalar(ScalarKind::Text) => Ok(Value::Text(text.to_string())),
            ValueKind::Scalar(ScalarKind::Integer) => text
                .trim()
                .parse()
                .map(Value::Integer)
                .map_err(|_| ValueError::Expected("integer".to_string())),
            ValueKind::Scalar(ScalarKind::Float) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(Value::Float)
                .ok_or_else(|| ValueError::Expected("float".to_string())),
            ValueKind::Choice(choices) => {
                if choices.contains(text) {
                    Ok(Value::Choice(text.to_string()))
                } else {
                    Err(ValueError::InvalidChoice(choices.describe()))
                }
            }
            ValueKind::LiteralTuple(elements) => LiteralTupleTracker::new(elements)
                .parse_text(text)
                .map_err(ValueError::Tuple),
        }
    }
}

/// Accepts the usual spellings: true/false, yes/no, on/off, 1/0.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(value) => write!(f, "{value}"),
            Value::Integer(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Text(value) | Value::Choice(value) => write!(f, "{value}"),
            Value::Tuple(items) => {
                let rendered: Vec<String> = items
                    .iter()
                    .map(|item| match item {
                        Value::Text(text) | Value::Choice(text) => format!("{text:?}"),
                        other => other.to_string(),
                    })
                    .collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            Value::List(items) => {
                let rendered: Vec<String> = items.iter().map(Value::to_string).collect();
                write!(f, "{}", rendered.join(" "))
            }
        }
    }
}
