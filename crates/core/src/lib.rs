//! Pretty Shell Core Library
//!
//! This crate provides the core of pretty-shell, an interactive shell layered
//! over a tree of commands, groups and nested sub-shells. It works out where
//! the cursor sits in a half-typed line, completes and highlights it, parses
//! submitted lines into typed values (inline `[..]` literal tuples included)
//! and drives the read / dispatch loop with history and `repeat`.
//!
//! # Key Features
//!
//! - **Command Tree**: An immutable index of commands, aliases, options and
//!   arguments, built from any [`tree::CommandGraph`] or a YAML definition
//! - **Line Resolution**: Maps the word under the cursor to a command name,
//!   option flag, option or argument value, or literal tuple element
//! - **Completion & Highlighting**: Prefix or fuzzy candidates, and a token
//!   class for every word of the line
//! - **Literal Tuples**: Typed, positional `[1, true, "x"]` values that span
//!   several shell words
//! - **Session Loop**: History, interrupt and end-of-input handling, nested
//!   shells and replay of the last repeatable command
//! - **Error Handling**: One error type for definitions, parsing and I/O
//!
//! # Examples
//!
//! Loading a shell definition and parsing a line against it:
//!
//! ```no_run
//! use pretty_shell_core::file_handling::get_shell_definition;
//! use pretty_shell_core::parser::{LineParser, ParsedLine};
//! use pretty_shell_core::tree::CommandTreeIndex;
//!
//! let definition = get_shell_definition("~/.pretty-shell/shell.yml")?;
//! let index = CommandTreeIndex::build(&definition)?;
//! if let ParsedLine::Invoke { bound, .. } = LineParser::new(&index).parse("greet Ada", &[])? {
//!     println!("{:?}", bound.values);
//! }
//! # Ok::<(), pretty_shell_core::error::Error>(())
//! ```

pub mod command_definitions;
pub mod completion;
pub mod config;
pub mod error;
pub mod file_handling;
pub mod highlight;
pub mod history;
pub mod interpolation;
pub mod live;
pub mod parser;
pub mod resolver;
pub mod serializer;
pub mod session;
pub mod suggest;
pub mod tokenizer;
pub mod tree;
pub mod tuple;
pub mod usage;
pub mod value;

#[cfg(test)]
mod test_support;
