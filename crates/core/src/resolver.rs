//! Works out what the word under the cursor means.
//!
//! Resolution starts at the current shell's node, follows leading words
//! that name child commands, then walks the remaining words against that
//! command's parameters. Whatever is left pending when the cursor is reached
//! (an option still owed a value, an open literal tuple, the next positional
//! slot) decides the cursor's [`CursorRole`]. Completion and highlighting
//! both build on the resulting [`ResolvedContext`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::tokenizer::{join_raw, literal_span, tokenize_to_cursor, Token};
use crate::tree::{ArgumentSpec, CommandNode, CommandTreeIndex, ElementKind, OptionSpec, ValueKind};
use crate::tuple::{LiteralTupleTracker, TupleLiteralState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorRole {
    CommandName,
    OptionFlag,
    OptionValue,
    ArgumentValue,
    TupleElement,
    Unresolved,
}

#[derive(Debug, Clone)]
pub struct ResolvedContext {
    /// Nodes from the tree root down to the deepest command reached.
    pub command_path: Vec<Arc<CommandNode>>,
    /// `None` when the typed command path does not exist.
    pub active_node: Option<Arc<CommandNode>>,
    pub cursor_role: CursorRole,
    pub active_option: Option<OptionSpec>,
    pub active_argument: Option<ArgumentSpec>,
    pub tuple_state: Option<TupleLiteralState>,
    /// Names of options already present on the line.
    pub consumed_options: Vec<String>,
    /// The text completion filters on: the unquoted cursor word, or the
    /// element being typed inside a literal tuple.
    pub word: String,
    /// The same span as typed, quotes included.
    pub raw_word: String,
    /// Byte offset in the line where a completion replaces text.
    pub replace_start: usize,
    /// The active node is the current shell's own root.
    pub at_shell_root: bool,
}

impl ResolvedContext {
    fn unresolved(command_path: Vec<Arc<CommandNode>>, cursor: &Token) -> Self {
        Self {
            command_path,
            active_node: None,
            cursor_role: CursorRole::Unresolved,
            active_option: None,
            active_argument: None,
            tuple_state: None,
            consumed_options: Vec::new(),
            word: cursor.text.clone(),
            raw_word: cursor.raw.clone(),
            replace_start: cursor.start,
            at_shell_root: false,
        }
    }
}

/// How the words after a command name split into parameters.
#[derive(Debug, Clone)]
pub(crate) enum Segment<'n> {
    Flag {
        option: &'n OptionSpec,
    },
    OptionValue {
        option: &'n OptionSpec,
        flag: usize,
        occurrence: usize,
        tokens: Vec<usize>,
        complete: bool,
    },
    Positional {
        slot: usize,
        argument: Option<&'n ArgumentSpec>,
        tokens: Vec<usize>,
        complete: bool,
    },
    UnknownFlag {
        token: usize,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct ParameterWalk<'n> {
    pub segments: Vec<Segment<'n>>,
    pub next_slot: usize,
    open_slot: Option<usize>,
}

impl ParameterWalk<'_> {
    /// Any positional word beyond the declared arguments.
    pub fn has_extra_positional(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, Segment::Positional { argument: None, .. }))
    }

    pub fn consumed_options(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for segment in &self.segments {
            let option = match segment {
                Segment::Flag { option, .. } | Segment::OptionValue { option, .. } => option,
                _ => continue,
            };
            if !names.contains(&option.name) {
                names.push(option.name.clone());
            }
        }
        names
    }
}

/// Splits `tokens[start..]` into option and positional segments for `node`.
///
/// Options take their values greedily; a tuple option takes one bracketed
/// literal however many words it spans. Positional words fill the declared
/// arguments in order.
pub(crate) fn walk_parameters<'n>(
    node: &'n CommandNode,
    tokens: &[Token],
    start: usize,
) -> ParameterWalk<'n> {
    let mut walk = ParameterWalk {
        segments: Vec::new(),
        next_slot: 0,
        open_slot: None,
    };
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    let mut index = start;

    while index < tokens.len() {
        let token = &tokens[index];

        if token.is_flag_like() {
            let Some(option) = node.option_for_flag(&token.text) else {
                walk.segments.push(Segment::UnknownFlag { token: index });
                index += 1;
                continue;
            };

            let counter = occurrences.entry(option.name.as_str()).or_insert(0);
            let occurrence = *counter;
            *counter += 1;

            let values_start = index + 1;
            let (values, complete, next) = match &option.kind {
                ValueKind::Flag => {
                    walk.segments.push(Segment::Flag { option });
                    index += 1;
                    continue;
                }
                ValueKind::LiteralTuple(_) => match literal_span(tokens, values_start) {
                    Some(span) => (span.tokens.clone().collect(), span.closed, span.tokens.end),
                    None if values_start < tokens.len() => {
                        (vec![values_start], true, values_start + 1)
                    }
                    None => (Vec::new(), false, values_start),
                },
                _ => {
                    let end = (values_start + option.arity).min(tokens.len());
                    let values: Vec<usize> = (values_start..end).collect();
                    let complete = values.len() == option.arity;
                    (values, complete, end)
                }
            };

            walk.segments.push(Segment::OptionValue {
                option,
                flag: index,
                occurrence,
                tokens: values,
                complete,
            });
            index = next;
            continue;
        }

        if let Some(open) = walk.open_slot {
            if let Some(Segment::Positional {
                argument,
                tokens: values,
                complete,
                ..
            }) = walk.segments.get_mut(open)
            {
                values.push(index);
                if values.len() >= argument.map_or(1, ArgumentSpec::value_count) {
                    *complete = true;
                    walk.open_slot = None;
                }
            }
            index += 1;
            continue;
        }

        let slot = walk.next_slot;
        walk.next_slot += 1;
        let argument = node.arguments.get(slot);

        let is_tuple = matches!(
            argument.map(|argument| &argument.kind),
            Some(ValueKind::LiteralTuple(_))
        );
        match literal_span(tokens, index) {
            Some(span) if is_tuple => {
                walk.segments.push(Segment::Positional {
                    slot,
                    argument,
                    tokens: span.tokens.clone().collect(),
                    complete: span.closed,
                });
                index = span.tokens.end;
            }
            _ => {
                let needed = argument.map_or(1, ArgumentSpec::value_count);
                walk.segments.push(Segment::Positional {
                    slot,
                    argument,
                    tokens: vec![index],
                    complete: needed <= 1,
                });
                if needed > 1 {
                    walk.open_slot = Some(walk.segments.len() - 1);
                }
                index += 1;
            }
        }
    }

    walk
}

/// Follows leading words naming child commands. Returns the deepest node
/// reached and the index of the first word that is not a command name.
pub(crate) fn walk_command_path(
    shell: &Arc<CommandNode>,
    tokens: &[Token],
    mut visit: impl FnMut(&Arc<CommandNode>),
) -> (Arc<CommandNode>, usize) {
    let mut node = Arc::clone(shell);
    let mut index = 0;
    while index < tokens.len() && node.is_group {
        let token = &tokens[index];
        if token.is_flag_like() || token.quoted || token.within_literal {
            break;
        }
        let Some(child) = node.child(&token.text).map(Arc::clone) else {
            break;
        };
        visit(&child);
        node = child;
        index += 1;
    }
    (node, index)
}

fn starts_option(token: &Token) -> bool {
    !token.quoted && token.text.starts_with('-') && token.text.parse::<f64>().is_err()
}

pub struct LineContextResolver<'a> {
    index: &'a CommandTreeIndex,
}

impl<'a> LineContextResolver<'a> {
    pub fn new(index: &'a CommandTreeIndex) -> Self {
        Self { index }
    }

    /// Resolves the text before the cursor.
    pub fn resolve_line(&self, line_before_cursor: &str, shell_path: &[String]) -> ResolvedContext {
        self.resolve(&tokenize_to_cursor(line_before_cursor), shell_path)
    }

    /// Resolves a token list whose last token is the word under the cursor.
    pub fn resolve(&self, tokens: &[Token], shell_path: &[String]) -> ResolvedContext {
        let empty;
        let (cursor, before) = match tokens.split_last() {
            Some(split) => split,
            None => {
                empty = tokenize_to_cursor("");
                (&empty[0], &[][..])
            }
        };

        let mut command_path = vec![Arc::clone(self.index.root())];
        for depth in 1..=shell_path.len() {
            match self.index.lookup(&shell_path[..depth]) {
                Some(node) => command_path.push(Arc::clone(node)),
                None => return ResolvedContext::unresolved(command_path, cursor),
            }
        }
        let Some(shell) = command_path.last().map(Arc::clone) else {
            return ResolvedContext::unresolved(command_path, cursor);
        };

        let (node, start) =
            walk_command_path(&shell, before, |child| command_path.push(Arc::clone(child)));
        let walk = walk_parameters(&node, before, start);

        let mut context = ResolvedContext {
            command_path,
            active_node: Some(Arc::clone(&node)),
            cursor_role: CursorRole::Unresolved,
            active_option: None,
            active_argument: None,
            tuple_state: None,
            consumed_options: walk.consumed_options(),
            word: cursor.text.clone(),
            raw_word: cursor.raw.clone(),
            replace_start: cursor.start,
            at_shell_root: Arc::ptr_eq(&node, &shell),
        };

        if walk.has_extra_positional() {
            if node.is_group {
                context.active_node = None;
            }
            return context;
        }

        match walk.segments.last() {
            Some(Segment::OptionValue {
                option,
                tokens: values,
                complete: false,
                ..
            }) => {
                context.active_option = Some((*option).clone());
                match &option.kind {
                    ValueKind::LiteralTuple(kinds) if !values.is_empty() || cursor.opens_literal() => {
                        self.enter_tuple(&mut context, kinds, before, values, cursor);
                    }
                    _ => context.cursor_role = CursorRole::OptionValue,
                }
                return context;
            }
            Some(Segment::Positional {
                argument: Some(argument),
                tokens: values,
                complete: false,
                ..
            }) => {
                context.active_argument = Some((*argument).clone());
                match &argument.kind {
                    ValueKind::LiteralTuple(kinds) => {
                        self.enter_tuple(&mut context, kinds, before, values, cursor);
                    }
                    _ => context.cursor_role = CursorRole::ArgumentValue,
                }
                return context;
            }
            _ => {}
        }

        if starts_option(cursor) {
            context.cursor_role = CursorRole::OptionFlag;
        } else if node.is_group && walk.segments.is_empty() {
            context.cursor_role = CursorRole::CommandName;
        } else if let Some(argument) = node.arguments.get(walk.next_slot) {
            context.active_argument = Some(argument.clone());
            match &argument.kind {
                ValueKind::LiteralTuple(kinds) if cursor.opens_literal() => {
                    self.enter_tuple(&mut context, kinds, before, &[], cursor);
                }
                _ => context.cursor_role = CursorRole::ArgumentValue,
            }
        } else if cursor.text.is_empty() && node.options.iter().any(|o| !o.is_help && !o.hidden) {
            context.cursor_role = CursorRole::OptionFlag;
        }

        context
    }

    fn enter_tuple(
        &self,
        context: &mut ResolvedContext,
        kinds: &[ElementKind],
        before: &[Token],
        values: &[usize],
        cursor: &Token,
    ) {
        let mut literal: Vec<Token> = values.iter().map(|&i| before[i].clone()).collect();
        literal.push(cursor.clone());
        let state = LiteralTupleTracker::new(kinds).track(&join_raw(&literal));

        let partial = state.innermost().partial.clone();
        context.cursor_role = CursorRole::TupleElement;
        context.word = partial.clone();
        context.replace_start = cursor.end.saturating_sub(partial.len());
        context.raw_word = partial;
        context.tuple_state = Some(state);
    }
}
