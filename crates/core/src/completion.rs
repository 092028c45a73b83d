//! Candidate generation for the word under the cursor.
//!
//! # Key Features
//!
//! - **Command names**: visible children of the active group, tagged as
//!   commands or groups and as root-level or nested
//! - **Options**: flags not yet on the line (repeatable ones always), never
//!   the implicit `--help` and never hidden options
//! - **Values**: choices with their display tags, `true`/`false` for
//!   booleans, and a typed placeholder for free-form values
//! - **Literal tuples**: `[` to open, element values by position, `]` once
//!   every element is filled
//! - **Matching**: prefix filtering by default, or fuzzy ranking through
//!   `fuzzy-matcher`'s skim algorithm

use std::collections::HashSet;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

use crate::live::CancelToken;
use crate::resolver::{CursorRole, ResolvedContext};
use crate::tree::{tuple_signature, ChoiceSet, ElementKind, ValueKind};

/// Candidates matched between two cancellation checks.
const FILTER_BATCH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateCategory {
    Command,
    Group,
    Option,
    ArgumentPlaceholder,
    ChoiceValue,
    BooleanValue,
    TupleBracket,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub insert_text: String,
    pub display_label: String,
    pub category: CandidateCategory,
    pub help_text: Option<String>,
    /// Color name used when rendering the candidate.
    pub display_tag: Option<String>,
    /// Offered at the current shell's root rather than inside a group.
    pub root_level: bool,
}

impl Candidate {
    fn new(insert_text: &str, category: CandidateCategory) -> Self {
        Self {
            insert_text: insert_text.to_string(),
            display_label: insert_text.to_string(),
            category,
            help_text: None,
            display_tag: None,
            root_level: false,
        }
    }

    fn with_label(mut self, label: String) -> Self {
        self.display_label = label;
        self
    }

    fn with_help(mut self, help: Option<&str>) -> Self {
        self.help_text = help.filter(|h| !h.is_empty()).map(str::to_string);
        self
    }

    fn with_tag(mut self, tag: Option<&str>) -> Self {
        self.display_tag = tag.map(str::to_string);
        self
    }

    fn is_placeholder(&self) -> bool {
        self.category == CandidateCategory::ArgumentPlaceholder
    }
}

pub struct CompletionEngine {
    matcher: Option<SkimMatcherV2>,
}

impl Default for CompletionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionEngine {
    /// Prefix matching.
    pub fn new() -> Self {
        Self { matcher: None }
    }

    /// Fuzzy matching, best matches first.
    pub fn fuzzy() -> Self {
        Self {
            matcher: Some(SkimMatcherV2::default()),
        }
    }

    /// Candidates for `word` in the resolved context. Unresolvable contexts
    /// yield nothing.
    pub fn complete(&self, context: &ResolvedContext, word: &str) -> Vec<Candidate> {
        self.filter(generate(context), word, &|| false).unwrap_or_default()
    }

    /// Same as [`CompletionEngine::complete`] but gives up as soon as
    /// `token` is cancelled. The token is checked before each batch of
    /// candidates is matched.
    pub fn complete_cancellable(
        &self,
        context: &ResolvedContext,
        word: &str,
        token: &CancelToken,
    ) -> Option<Vec<Candidate>> {
        if token.is_cancelled() {
            return None;
        }
        let candidates = generate(context);
        self.filter(candidates, word, &|| token.is_cancelled())
    }

    fn filter(
        &self,
        candidates: Vec<Candidate>,
        word: &str,
        cancelled: &dyn Fn() -> bool,
    ) -> Option<Vec<Candidate>> {
        let mut seen = HashSet::new();
        let unique: Vec<Candidate> = candidates
            .into_iter()
            .filter(|candidate| seen.insert(candidate.insert_text.clone()))
            .collect();

        let mut scored: Vec<(i64, Candidate)> = Vec::with_capacity(unique.len());
        for batch in unique.chunks(FILTER_BATCH) {
            if cancelled() {
                return None;
            }
            for candidate in batch {
                let score = match &self.matcher {
                    _ if candidate.is_placeholder() => Some(i64::MAX),
                    None => candidate.insert_text.starts_with(word).then_some(0),
                    Some(_) if word.is_empty() => Some(0),
                    Some(matcher) => matcher.fuzzy_match(&candidate.insert_text, word),
                };
                if let Some(score) = score {
                    scored.push((score, candidate.clone()));
                }
            }
        }
        if cancelled() {
            return None;
        }

        if self.matcher.is_some() && !word.is_empty() {
            scored.sort_by(|a, b| b.0.cmp(&a.0));
        }
        Some(scored.into_iter().map(|(_, candidate)| candidate).collect())
    }
}

fn generate(context: &ResolvedContext) -> Vec<Candidate> {
    match context.cursor_role {
        CursorRole::CommandName => command_candidates(context),
        CursorRole::OptionFlag => option_candidates(context),
        CursorRole::OptionValue => match &context.active_option {
            Some(option) => value_candidates(&option.name, &option.kind, option.help.as_deref(), context),
            None => Vec::new(),
        },
        CursorRole::ArgumentValue => match &context.active_argument {
            Some(argument) => {
                value_candidates(&argument.name, &argument.kind, argument.help.as_deref(), context)
            }
            None => Vec::new(),
        },
        CursorRole::TupleElement => tuple_candidates(context),
        CursorRole::Unresolved => Vec::new(),
    }
}

fn command_candidates(context: &ResolvedContext) -> Vec<Candidate> {
    let Some(node) = &context.active_node else {
        return Vec::new();
    };

    node.visible_children()
        .map(|child| {
            let category = if child.is_group {
                CandidateCategory::Group
            } else {
                CandidateCategory::Command
            };
            let mut candidate = Candidate::new(&child.name, category).with_help(Some(child.short_help()));
            candidate.root_level = context.at_shell_root;
            candidate
        })
        .collect()
}

fn option_candidates(context: &ResolvedContext) -> Vec<Candidate> {
    let Some(node) = &context.active_node else {
        return Vec::new();
    };

    node.options
        .iter()
        .filter(|option| !option.is_help && !option.hidden)
        .filter(|option| option.repeatable || !context.consumed_options.contains(&option.name))
        .map(|option| {
            let flag = option.flag_token();
            let label = match option.kind {
                ValueKind::Flag => flag.clone(),
                _ => format!("{flag} <{}>", option.kind.type_name()),
            };
            Candidate::new(&flag, CandidateCategory::Option)
                .with_label(label)
                .with_help(option.help.as_deref())
        })
        .collect()
}

fn choice_candidates(choices: &ChoiceSet, quote: Option<char>) -> Vec<Candidate> {
    choices
        .values()
        .iter()
        .map(|value| {
            let insert = match quote {
                Some(q) => format!("{q}{value}{q}"),
                None => value.clone(),
            };
            Candidate::new(&insert, CandidateCategory::ChoiceValue)
                .with_label(value.clone())
                .with_tag(choices.display_tag(value))
        })
        .collect()
}

fn boolean_candidates() -> Vec<Candidate> {
    vec![
        Candidate::new("true", CandidateCategory::BooleanValue).with_tag(Some("green")),
        Candidate::new("false", CandidateCategory::BooleanValue).with_tag(Some("red")),
    ]
}

fn placeholder(context: &ResolvedContext, label: String, help: Option<&str>) -> Candidate {
    Candidate::new(&context.raw_word, CandidateCategory::ArgumentPlaceholder)
        .with_label(label)
        .with_help(help)
}

fn value_candidates(
    name: &str,
    kind: &ValueKind,
    help: Option<&str>,
    context: &ResolvedContext,
) -> Vec<Candidate> {
    match kind {
        ValueKind::Flag => Vec::new(),
        ValueKind::Boolean => boolean_candidates(),
        ValueKind::Choice(choices) => choice_candidates(choices, None),
        ValueKind::Scalar(scalar) => vec![placeholder(
            context,
            format!("({name}: {})", scalar.type_name()),
            help,
        )],
        ValueKind::LiteralTuple(elements) => {
            vec![Candidate::new("[", CandidateCategory::TupleBracket)
                .with_label(format!("{name}: {}", tuple_signature(elements)))
                .with_help(help)]
        }
    }
}

fn tuple_candidates(context: &ResolvedContext) -> Vec<Candidate> {
    let Some(state) = &context.tuple_state else {
        return Vec::new();
    };
    let innermost = state.innermost();
    if innermost.is_closed {
        return Vec::new();
    }

    let index = innermost.next_element_index;
    match innermost.element_types.get(index) {
        None if innermost.partial.is_empty() => vec![Candidate::new("]", CandidateCategory::TupleBracket)],
        None => Vec::new(),
        Some(ElementKind::Boolean) => boolean_candidates(),
        Some(ElementKind::Choice(choices)) => {
            let quote = innermost
                .partial
                .chars()
                .next()
                .filter(|c| *c == '"' || *c == '\'');
            choice_candidates(choices, quote)
        }
        Some(ElementKind::Scalar(scalar)) => vec![placeholder(
            context,
            format!("(element {index}: {})", scalar.type_name()),
            None,
        )],
        Some(ElementKind::Tuple(inner)) if innermost.partial.is_empty() => {
            vec![Candidate::new("[", CandidateCategory::TupleBracket).with_label(tuple_signature(inner))]
        }
        Some(ElementKind::Tuple(_)) => Vec::new(),
    }
}
