//! Bracketed literal tuples: `[ "text", 1.5, true, choice ]`.
//!
//! A tuple parameter declares a fixed list of element kinds. While the user
//! types, [`LiteralTupleTracker::track`] reports which element the cursor is
//! on so completion can offer values for that position. At submit time
//! [`LiteralTupleTracker::extract`] turns the tokens of one literal into a
//! typed [`Value::Tuple`], rejecting wrong lengths and wrong element types.
//!
//! Element matching is exact: text must be quoted, integers are bare digits,
//! floats need a `.` or an exponent, booleans are bare `true`/`false`, and a
//! choice may be quoted or bare as long as it is one of the declared values.

use thiserror::Error;

use crate::tokenizer::{join_raw, literal_span, Token};
use crate::tree::{ElementKind, ScalarKind};
use crate::value::Value;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TupleError {
    #[error("Tuple provided does not match the declared length: expected {expected} elements, found {found}.")]
    WrongElementCount { expected: usize, found: usize },

    #[error("element {index} (`{value}`) is not a valid {expected}.")]
    TypeMismatch {
        index: usize,
        value: String,
        expected: String,
    },

    #[error("element {index} (`{value}`) is not one of {choices}.")]
    InvalidChoice {
        index: usize,
        value: String,
        choices: String,
    },

    #[error("Unterminated literal tuple: `{0}`")]
    Unterminated(String),

    #[error("Invalid literal provided: `{0}`")]
    Malformed(String),
}

/// One element of a parsed literal, before it is checked against a kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Quoted(String),
    Bare(String),
    Array(Vec<Literal>),
}

impl Literal {
    fn source(&self) -> String {
        match self {
            Literal::Quoted(text) => format!("\"{text}\""),
            Literal::Bare(text) => text.clone(),
            Literal::Array(items) => {
                let inner: Vec<String> = items.iter().map(Literal::source).collect();
                format!("[{}]", inner.join(", "))
            }
        }
    }
}

/// Progress through a literal that is still being typed.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleLiteralState {
    pub element_types: Vec<ElementKind>,
    pub parsed_elements: Vec<Literal>,
    pub next_element_index: usize,
    pub is_closed: bool,
    /// Raw text of the element under the cursor, e.g. `"ch` or `tr`.
    pub partial: String,
    /// State of an inner literal the cursor is inside.
    pub nested: Option<Box<TupleLiteralState>>,
}

impl TupleLiteralState {
    /// The innermost literal the cursor is in.
    pub fn innermost(&self) -> &TupleLiteralState {
        match &self.nested {
            Some(nested) => nested.innermost(),
            None => self,
        }
    }

    /// Kind expected at the cursor, or `None` once every element is filled.
    pub fn next_expected_kind(&self) -> Option<&ElementKind> {
        let innermost = self.innermost();
        innermost.element_types.get(innermost.next_element_index)
    }

    /// Checks the elements confirmed so far against their declared kinds.
    /// The element count is only enforced once the literal is closed.
    pub fn check(&self) -> Result<(), TupleError> {
        if self.is_closed && self.parsed_elements.len() != self.element_types.len() {
            return Err(TupleError::WrongElementCount {
                expected: self.element_types.len(),
                found: self.parsed_elements.len(),
            });
        }
        if self.parsed_elements.len() > self.element_types.len() {
            return Err(TupleError::WrongElementCount {
                expected: self.element_types.len(),
                found: self.parsed_elements.len(),
            });
        }
        for (index, (literal, kind)) in self
            .parsed_elements
            .iter()
            .zip(&self.element_types)
            .enumerate()
        {
            coerce(literal, kind, index)?;
        }
        match &self.nested {
            Some(nested) => nested.check(),
            None => Ok(()),
        }
    }
}

/// Tracks and extracts literal tuples for one declared element list.
#[derive(Debug, Clone, Copy)]
pub struct LiteralTupleTracker<'a> {
    kinds: &'a [ElementKind],
}

impl<'a> LiteralTupleTracker<'a> {
    pub fn new(kinds: &'a [ElementKind]) -> Self {
        Self { kinds }
    }

    pub fn next_expected_kind(&self, partial_elements: &[Literal]) -> Option<&'a ElementKind> {
        self.kinds.get(partial_elements.len())
    }

    /// Scans the text typed so far (from the opening bracket up to the
    /// cursor) and reports where the cursor is.
    pub fn track(&self, text: &str) -> TupleLiteralState {
        let mut scanner = Scanner::new(text.trim_start());
        if !scanner.eat('[') {
            return self.open_state(Vec::new(), text.trim_start().to_string(), None);
        }
        match scanner.array() {
            Ok(Scanned::Closed(items)) => TupleLiteralState {
                element_types: self.kinds.to_vec(),
                next_element_index: items.len(),
                parsed_elements: items,
                is_closed: true,
                partial: String::new(),
                nested: None,
            },
            Ok(Scanned::Open(open)) => self.state_from_open(open),
            Err(_) => self.open_state(Vec::new(), String::new(), None),
        }
    }

    /// Extracts the literal beginning at `tokens[start]`. Returns the typed
    /// tuple and the number of tokens it spanned.
    pub fn extract(&self, tokens: &[Token], start: usize) -> Result<(Value, usize), TupleError> {
        let Some(span) = literal_span(tokens, start) else {
            let found = tokens.get(start).map(|t| t.raw.clone()).unwrap_or_default();
            return Err(TupleError::Malformed(found));
        };
        let text = join_raw(&tokens[span.tokens.clone()]);
        let literal = finalize(&text)?;
        let value = self.coerce_all(&literal)?;
        Ok((value, span.tokens.len()))
    }

    /// Parses and type-checks a complete literal given as one string.
    pub fn parse_text(&self, text: &str) -> Result<Value, TupleError> {
        let literal = finalize(text)?;
        self.coerce_all(&literal)
    }

    fn coerce_all(&self, literal: &Literal) -> Result<Value, TupleError> {
        match literal {
            Literal::Array(items) => coerce_items(items, self.kinds),
            other => Err(TupleError::Malformed(other.source())),
        }
    }

    fn state_from_open(&self, open: OpenArray) -> TupleLiteralState {
        let nested = open.child.map(|child| {
            let inner_kinds = match self.kinds.get(open.items.len()) {
                Some(ElementKind::Tuple(inner)) => inner.as_slice(),
                _ => &[],
            };
            Box::new(LiteralTupleTracker::new(inner_kinds).state_from_open(*child))
        });
        self.open_state(open.items, open.partial, nested)
    }

    fn open_state(
        &self,
        items: Vec<Literal>,
        partial: String,
        nested: Option<Box<TupleLiteralState>>,
    ) -> TupleLiteralState {
        TupleLiteralState {
            element_types: self.kinds.to_vec(),
            next_element_index: items.len(),
            parsed_elements: items,
            is_closed: false,
            partial,
            nested,
        }
    }
}

fn coerce_items(items: &[Literal], kinds: &[ElementKind]) -> Result<Value, TupleError> {
    if items.len() != kinds.len() {
        return Err(TupleError::WrongElementCount {
            expected: kinds.len(),
            found: items.len(),
        });
    }
    items
        .iter()
        .zip(kinds)
        .enumerate()
        .map(|(index, (literal, kind))| coerce(literal, kind, index))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Tuple)
}

fn coerce(literal: &Literal, kind: &ElementKind, index: usize) -> Result<Value, TupleError> {
    let mismatch = || TupleError::TypeMismatch {
        index,
        value: literal.source(),
        expected: kind.type_name(),
    };

    match (kind, literal) {
        (ElementKind::Scalar(ScalarKind::Text), Literal::Quoted(text)) => Ok(Value::Text(text.clone())),
        (ElementKind::Scalar(ScalarKind::Integer), Literal::Bare(text)) if is_integer(text) => {
            text.parse().map(Value::Integer).map_err(|_| mismatch())
        }
        (ElementKind::Scalar(ScalarKind::Float), Literal::Bare(text)) if is_float(text) => {
            text.parse().map(Value::Float).map_err(|_| mismatch())
        }
        (ElementKind::Boolean, Literal::Bare(text)) if text == "true" => Ok(Value::Bool(true)),
        (ElementKind::Boolean, Literal::Bare(text)) if text == "false" => Ok(Value::Bool(false)),
        (ElementKind::Choice(choices), Literal::Quoted(text) | Literal::Bare(text)) => {
            if choices.contains(text) {
                Ok(Value::Choice(text.clone()))
            } else {
                Err(TupleError::InvalidChoice {
                    index,
                    value: text.clone(),
                    choices: choices.describe(),
                })
            }
        }
        (ElementKind::Tuple(inner), Literal::Array(items)) => coerce_items(items, inner),
        _ => Err(mismatch()),
    }
}

fn is_integer(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn is_float(text: &str) -> bool {
    text.contains(['.', 'e', 'E']) && text.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Parses a submitted literal. A literal left open right after a comma is
/// closed automatically; any other unterminated literal is an error.
fn finalize(text: &str) -> Result<Literal, TupleError> {
    let trimmed = text.trim();
    let mut scanner = Scanner::new(trimmed);
    if !scanner.eat('[') {
        return Err(TupleError::Malformed(trimmed.to_string()));
    }
    match scanner.array()? {
        Scanned::Closed(items) => {
            scanner.skip_whitespace();
            if scanner.at_end() {
                Ok(Literal::Array(items))
            } else {
                Err(TupleError::Malformed(trimmed.to_string()))
            }
        }
        Scanned::Open(open) if trimmed.ends_with(',') && open.partial.is_empty() => {
            Ok(Literal::Array(open.close()))
        }
        Scanned::Open(_) => Err(TupleError::Unterminated(trimmed.to_string())),
    }
}

#[derive(Debug)]
struct OpenArray {
    items: Vec<Literal>,
    partial: String,
    child: Option<Box<OpenArray>>,
}

impl OpenArray {
    fn close(mut self) -> Vec<Literal> {
        if let Some(child) = self.child.take() {
            self.items.push(Literal::Array(child.close()));
        }
        self.items
    }
}

#[derive(Debug)]
enum Scanned {
    Closed(Vec<Literal>),
    Open(OpenArray),
}

struct Scanner<'t> {
    chars: Vec<char>,
    position: usize,
    source: &'t str,
}

impl<'t> Scanner<'t> {
    fn new(source: &'t str) -> Self {
        Self {
            chars: source.chars().collect(),
            position: 0,
            source,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn at_end(&self) -> bool {
        self.position >= self.chars.len()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.position += 1;
        }
    }

    fn malformed(&self) -> TupleError {
        TupleError::Malformed(self.source.to_string())
    }

    /// Scans the body of an array whose `[` was already consumed.
    fn array(&mut self) -> Result<Scanned, TupleError> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(c) = self.peek() else {
                return Ok(Scanned::Open(OpenArray {
                    items,
                    partial: String::new(),
                    child: None,
                }));
            };

            match c {
                ']' => {
                    self.position += 1;
                    return Ok(Scanned::Closed(items));
                }
                '[' => {
                    self.position += 1;
                    match self.array()? {
                        Scanned::Closed(inner) => items.push(Literal::Array(inner)),
                        Scanned::Open(child) => {
                            return Ok(Scanned::Open(OpenArray {
                                items,
                                partial: String::new(),
                                child: Some(Box::new(child)),
                            }))
                        }
                    }
                }
                '"' | '\'' => {
                    let start = self.position;
                    match self.quoted(c) {
                        Some(text) => items.push(Literal::Quoted(text)),
                        None => {
                            return Ok(Scanned::Open(OpenArray {
                                items,
                                partial: self.chars[start..].iter().collect(),
                                child: None,
                            }))
                        }
                    }
                }
                ',' => return Err(self.malformed()),
                _ => {
                    let word = self.bare();
                    if self.at_end() {
                        return Ok(Scanned::Open(OpenArray {
                            items,
                            partial: word,
                            child: None,
                        }));
                    }
                    items.push(Literal::Bare(word));
                }
            }

            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.position += 1,
                Some(']') | None => {}
                Some(_) => return Err(self.malformed()),
            }
        }
    }

    /// Reads a quoted element; `None` when the closing quote is missing.
    fn quoted(&mut self, quote: char) -> Option<String> {
        self.position += 1;
        let mut text = String::new();
        while let Some(c) = self.peek() {
            self.position += 1;
            match c {
                '\\' => {
                    let escaped = self.peek()?;
                    self.position += 1;
                    text.push(escaped);
                }
                c if c == quote => return Some(text),
                c => text.push(c),
            }
        }
        None
    }

    fn bare(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c == ',' || c == ']' || c == '[' || c.is_whitespace() {
                break;
            }
            word.push(c);
            self.position += 1;
        }
        word
    }
}
