//! Pretty Shell CLI Library
//!
//! This crate provides the terminal front end of pretty-shell: it loads a
//! YAML shell definition, reads lines through a rustyline editor with
//! completion, hints and syntax highlighting, and runs each command by
//! rendering its `run` template.
//!
//! # Architecture
//!
//! - [`cli_args`]: Command-line argument parsing
//! - [`editor`]: The rustyline helper and the interactive line source
//! - [`colors`]: Terminal colors for tokens and completion candidates
//! - [`host`]: The command host that renders `run` templates
//!
//! # Examples
//!
//! The CLI binary (`psh`) can be used in several ways:
//!
//! ```bash
//! # Interactive shell over the default definition file
//! psh
//!
//! # A custom definition with fuzzy, live completion
//! psh -c demos/testapp.yml --fuzzy --live-completion
//!
//! # Run one command and exit
//! psh -c demos/testapp.yml greet Ada --loud
//!
//! # Forget the line history
//! psh --clear-history
//! ```

pub mod cli_args;
pub mod colors;
pub mod editor;
pub mod host;
