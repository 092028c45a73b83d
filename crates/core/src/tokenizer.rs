//! Shell-style splitting of the input line.
//!
//! Words are split on unquoted whitespace. Single quotes, double quotes and
//! backticks group text, and a backslash escapes the next character outside
//! single quotes. Tokens carry their byte offsets so completion can replace
//! the word under the cursor and highlighting can paint the original text.
//!
//! Bracketed literals (`[1, "a b", true]`) usually span several
//! whitespace-separated tokens; every token that belongs to such a span is
//! tagged with [`Token::within_literal`].
//!
//! Tokenizing never fails. Unterminated quotes or brackets yield the best
//! partial result, which is what completion wants while the user types.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The word with quotes removed and escapes applied.
    pub text: String,
    /// The word exactly as typed.
    pub raw: String,
    pub start: usize,
    pub end: usize,
    pub quoted: bool,
    pub within_literal: bool,
}

impl Token {
    fn empty_at(offset: usize) -> Self {
        Self {
            text: String::new(),
            raw: String::new(),
            start: offset,
            end: offset,
            quoted: false,
            within_literal: false,
        }
    }

    /// True when the raw word opens a bracketed literal.
    pub fn opens_literal(&self) -> bool {
        self.raw.starts_with('[')
    }

    /// Looks like `--name` or `-n`. Quoted words and negative numbers are
    /// never flags.
    pub fn is_flag_like(&self) -> bool {
        !self.quoted
            && !self.within_literal
            && self.text.len() > 1
            && self.text.starts_with('-')
            && self.text.parse::<f64>().is_err()
    }
}

/// A run of tokens that together form one bracketed literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralSpan {
    pub tokens: Range<usize>,
    pub closed: bool,
}

#[derive(Default)]
struct Pending {
    raw: String,
    text: String,
    start: Option<usize>,
    quoted: bool,
}

impl Pending {
    fn push(&mut self, offset: usize, raw: char, text: Option<char>) {
        self.start.get_or_insert(offset);
        self.raw.push(raw);
        if let Some(c) = text {
            self.text.push(c);
        }
    }

    fn finish(&mut self, end: usize, tokens: &mut Vec<Token>) {
        if let Some(start) = self.start.take() {
            tokens.push(Token {
                text: std::mem::take(&mut self.text),
                raw: std::mem::take(&mut self.raw),
                start,
                end,
                quoted: std::mem::take(&mut self.quoted),
                within_literal: false,
            });
        }
    }
}

pub fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pending = Pending::default();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in line.char_indices() {
        if escaped {
            pending.push(offset, c, Some(c));
            escaped = false;
            continue;
        }

        match (quote, c) {
            (Some('\''), '\'') => {
                pending.push(offset, c, None);
                quote = None;
            }
            (Some('\''), _) => pending.push(offset, c, Some(c)),
            (_, '\\') => {
                pending.push(offset, c, None);
                escaped = true;
            }
            (Some(open), _) if c == open => {
                pending.push(offset, c, None);
                quote = None;
            }
            (Some(_), _) => pending.push(offset, c, Some(c)),
            (None, '\'' | '"' | '`') => {
                pending.push(offset, c, None);
                pending.quoted = pending.quoted || pending.raw.len() == 1;
                quote = Some(c);
            }
            (None, c) if c.is_whitespace() => pending.finish(offset, &mut tokens),
            (None, _) => pending.push(offset, c, Some(c)),
        }
    }
    pending.finish(line.len(), &mut tokens);

    mark_literals(&mut tokens);
    tokens
}

/// Tokenizes the text before the cursor. When the cursor sits after
/// whitespace (or the line is empty) an empty trailing token stands for the
/// word about to be typed, so the last token is always the cursor word.
pub fn tokenize_to_cursor(line_before_cursor: &str) -> Vec<Token> {
    let mut tokens = tokenize(line_before_cursor);
    let at_boundary = tokens
        .last()
        .map_or(true, |last| last.end < line_before_cursor.len());
    if at_boundary {
        tokens.push(Token::empty_at(line_before_cursor.len()));
    }
    tokens
}

/// Net bracket depth change of a raw word, ignoring brackets inside quotes.
pub fn bracket_delta(raw: &str) -> i32 {
    let mut delta = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in raw.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') if quote != Some('\'') => escaped = true,
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '[') => delta += 1,
            (None, ']') => delta -= 1,
            _ => {}
        }
    }
    delta
}

/// The literal starting at `tokens[start]`, if that token opens one.
pub fn literal_span(tokens: &[Token], start: usize) -> Option<LiteralSpan> {
    let first = tokens.get(start)?;
    if !first.opens_literal() {
        return None;
    }

    let mut depth = 0;
    for (offset, token) in tokens[start..].iter().enumerate() {
        depth += bracket_delta(&token.raw);
        if depth <= 0 {
            return Some(LiteralSpan {
                tokens: start..start + offset + 1,
                closed: true,
            });
        }
    }

    Some(LiteralSpan {
        tokens: start..tokens.len(),
        closed: false,
    })
}

/// Raw words of a span joined by single spaces; quoted whitespace survives
/// because it never splits a token.
pub fn join_raw(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|token| token.raw.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn mark_literals(tokens: &mut [Token]) {
    let mut index = 0;
    while index < tokens.len() {
        match literal_span(tokens, index) {
            Some(span) => {
                for token in &mut tokens[span.tokens.clone()] {
                    token.within_literal = true;
                }
                index = span.tokens.end;
            }
            None => index += 1,
        }
    }
}
