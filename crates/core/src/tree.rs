//! The immutable command tree the shell completes, highlights and parses
//! against.
//!
//! A host framework describes its commands through the [`CommandGraph`]
//! trait. [`CommandTreeIndex::build`] walks that description once, depth
//! first, and produces a tree of shared [`CommandNode`]s. Aliases are extra
//! keys in a parent's child map that point at the same node, so a command
//! reached through an alias is the very same value as the one reached by
//! its primary name.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::Result;
use crate::value::Value;

/// The set of values a choice parameter accepts, with optional per-value
/// display tags (color names used when rendering completions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceSet {
    values: Vec<String>,
    display_tags: Vec<String>,
}

impl ChoiceSet {
    pub fn new(values: Vec<String>) -> Self {
        Self {
            values,
            display_tags: Vec::new(),
        }
    }

    pub fn with_display_tags(mut self, display_tags: Vec<String>) -> Self {
        self.display_tags = display_tags;
        self
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }

    /// The display tag registered at the same position as `value`, if any.
    pub fn display_tag(&self, value: &str) -> Option<&str> {
        let position = self.values.iter().position(|v| v == value)?;
        self.display_tags.get(position).map(String::as_str)
    }

    /// Choices rendered the way error messages list them: `'blue', 'red'`.
    pub fn describe(&self) -> String {
        self.values
            .iter()
            .map(|v| format!("'{v}'"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Text,
    Integer,
    Float,
}

impl ScalarKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarKind::Text => "text",
            ScalarKind::Integer => "integer",
            ScalarKind::Float => "float",
        }
    }
}

/// The declared type of a single position inside a literal tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Scalar(ScalarKind),
    Boolean,
    Choice(ChoiceSet),
    Tuple(Vec<ElementKind>),
}

impl ElementKind {
    pub fn type_name(&self) -> String {
        match self {
            ElementKind::Scalar(scalar) => scalar.type_name().to_string(),
            ElementKind::Boolean => "boolean".to_string(),
            ElementKind::Choice(_) => "choice".to_string(),
            ElementKind::Tuple(elements) => tuple_signature(elements),
        }
    }
}

/// `[text, float, boolean]` for a tuple's element kinds.
pub fn tuple_signature(elements: &[ElementKind]) -> String {
    let names: Vec<String> = elements.iter().map(ElementKind::type_name).collect();
    format!("[{}]", names.join(", "))
}

/// What a parameter consumes from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    /// Presence-only option; consumes no value.
    Flag,
    Boolean,
    Scalar(ScalarKind),
    Choice(ChoiceSet),
    /// A bracketed, comma-separated literal of fixed length and types.
    LiteralTuple(Vec<ElementKind>),
}

impl ValueKind {
    pub fn takes_value(&self) -> bool {
        !matches!(self, ValueKind::Flag)
    }

    pub fn type_name(&self) -> String {
        match self {
            ValueKind::Flag => "flag".to_string(),
            ValueKind::Boolean => "boolean".to_string(),
            ValueKind::Scalar(scalar) => scalar.type_name().to_string(),
            ValueKind::Choice(_) => "choice".to_string(),
            ValueKind::LiteralTuple(elements) => tuple_signature(elements),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionSpec {
    pub name: String,
    pub short: Option<char>,
    pub kind: ValueKind,
    /// Values consumed per occurrence. A literal tuple counts as one value.
    pub arity: usize,
    pub repeatable: bool,
    pub required: bool,
    pub hidden: bool,
    pub help: Option<String>,
    /// For repeatable options, a `Value::List` with one value per occurrence.
    pub default: Option<Value>,
    /// The implicit `--help` option every node carries.
    pub is_help: bool,
}

impl OptionSpec {
    pub fn new(name: &str, kind: ValueKind) -> Self {
        Self {
            name: name.to_string(),
            short: None,
            kind,
            arity: 1,
            repeatable: false,
            required: false,
            hidden: false,
            help: None,
            default: None,
            is_help: false,
        }
    }

    pub fn help_option() -> Self {
        let mut option = Self::new("help", ValueKind::Flag);
        option.help = Some("Show this message and exit.".to_string());
        option.is_help = true;
        option
    }

    /// The long flag token, e.g. `--verbose`.
    pub fn flag_token(&self) -> String {
        format!("--{}", self.name)
    }

    pub fn matches_flag(&self, token: &str) -> bool {
        if let Some(long) = token.strip_prefix("--") {
            return long == self.name;
        }
        match (token.strip_prefix('-'), self.short) {
            (Some(short), Some(c)) => {
                let mut chars = short.chars();
                chars.next() == Some(c) && chars.next().is_none()
            }
            _ => false,
        }
    }

    /// Number of command-line values one occurrence consumes.
    pub fn value_count(&self) -> usize {
        match self.kind {
            ValueKind::Flag => 0,
            ValueKind::LiteralTuple(_) => 1,
            _ => self.arity,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentSpec {
    pub name: String,
    pub kind: ValueKind,
    pub arity: usize,
    pub required: bool,
    pub help: Option<String>,
    pub default: Option<Value>,
}

impl ArgumentSpec {
    pub fn new(name: &str, kind: ValueKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            arity: 1,
            required: true,
            help: None,
            default: None,
        }
    }

    pub fn value_count(&self) -> usize {
        match self.kind {
            ValueKind::LiteralTuple(_) => 1,
            _ => self.arity,
        }
    }
}

/// Commands every shell root gets unless the host defines the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Help,
    ClearHistory,
    Clear,
    Quit,
    Exit,
    Repeat,
}

impl Builtin {
    pub const ALL: [Builtin; 6] = [
        Builtin::Help,
        Builtin::ClearHistory,
        Builtin::Clear,
        Builtin::Quit,
        Builtin::Exit,
        Builtin::Repeat,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Help => "help",
            Builtin::ClearHistory => "clearhistory",
            Builtin::Clear => "cls",
            Builtin::Quit => "quit",
            Builtin::Exit => "exit",
            Builtin::Repeat => "repeat",
        }
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Builtin::Help => &["h"],
            Builtin::ClearHistory => &["clshst", "hstclear", "hstcls", "clearhst"],
            Builtin::Clear => &["clear"],
            Builtin::Quit => &["q"],
            Builtin::Exit | Builtin::Repeat => &[],
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            Builtin::Help => "Display help information",
            Builtin::ClearHistory => "Clears the CLI history for this terminal",
            Builtin::Clear => "Clears the Terminal",
            Builtin::Quit | Builtin::Exit => "Exits the Shell",
            Builtin::Repeat => "Repeats the last repeatable command",
        }
    }

    /// Only `exit` is offered during completion.
    pub fn is_hidden(&self) -> bool {
        !matches!(self, Builtin::Exit)
    }

    pub fn ends_shell(&self) -> bool {
        matches!(self, Builtin::Exit | Builtin::Quit)
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug)]
pub struct CommandNode {
    pub name: String,
    pub aliases: Vec<String>,
    /// Names from the tree root down to this node; empty for the root.
    pub path: Vec<String>,
    pub is_group: bool,
    pub is_shell_root: bool,
    pub is_hidden: bool,
    pub is_repeatable: bool,
    pub help: Option<String>,
    pub options: Vec<OptionSpec>,
    pub arguments: Vec<ArgumentSpec>,
    /// Keyed by primary name and by every alias.
    pub children: IndexMap<String, Arc<CommandNode>>,
    pub builtin: Option<Builtin>,
}

impl CommandNode {
    pub fn child(&self, name: &str) -> Option<&Arc<CommandNode>> {
        self.children.get(name)
    }

    /// Each child once (under its primary name), hidden ones excluded.
    pub fn visible_children(&self) -> impl Iterator<Item = &Arc<CommandNode>> {
        self.children
            .iter()
            .filter(|(key, child)| **key == child.name && !child.is_hidden)
            .map(|(_, child)| child)
    }

    pub fn option_for_flag(&self, token: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|option| option.matches_flag(token))
    }

    /// First line of the help text, or an empty string.
    pub fn short_help(&self) -> &str {
        self.help
            .as_deref()
            .and_then(|help| help.lines().next())
            .unwrap_or("")
    }
}

/// The host's view of its command graph, walked once at start-up.
///
/// Implementations describe a single command (or group); children are
/// reached through [`CommandGraph::subcommands`].
pub trait CommandGraph {
    fn name(&self) -> &str;

    fn aliases(&self) -> &[String] {
        &[]
    }

    fn help(&self) -> Option<&str> {
        None
    }

    fn is_hidden(&self) -> bool {
        false
    }

    fn is_shell(&self) -> bool {
        false
    }

    fn is_group(&self) -> bool {
        self.is_shell() || !self.subcommands().is_empty()
    }

    fn is_repeatable(&self) -> bool {
        false
    }

    fn options(&self) -> Result<Vec<OptionSpec>>;

    fn arguments(&self) -> Result<Vec<ArgumentSpec>>;

    fn subcommands(&self) -> Vec<&dyn CommandGraph>;
}

/// Read-only index over the command tree. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct CommandTreeIndex {
    root: Arc<CommandNode>,
}

impl CommandTreeIndex {
    /// Walks the host graph depth first. The graph's top node becomes the
    /// root shell; builtins are installed on it and on every nested shell.
    pub fn build(graph: &dyn CommandGraph) -> Result<Self> {
        let root = build_node(graph, Vec::new(), true)?;
        log::debug!(
            "Built command tree `{}` with {} top-level entries",
            root.name,
            root.children.len()
        );
        Ok(Self {
            root: Arc::new(root),
        })
    }

    pub fn root(&self) -> &Arc<CommandNode> {
        &self.root
    }

    /// Follows `path` from the root, accepting aliases along the way.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<&Arc<CommandNode>> {
        let mut node = &self.root;
        for name in path {
            node = node.child(name.as_ref())?;
        }
        Some(node)
    }
}

fn build_node(graph: &dyn CommandGraph, path: Vec<String>, is_root: bool) -> Result<CommandNode> {
    let is_shell_root = is_root || graph.is_shell();
    let is_group = is_shell_root || graph.is_group();

    let mut options = graph.options()?;
    options.push(OptionSpec::help_option());

    let mut children = IndexMap::new();
    for subcommand in graph.subcommands() {
        let mut child_path = path.clone();
        child_path.push(subcommand.name().to_string());
        let child = Arc::new(build_node(subcommand, child_path, false)?);
        children.insert(child.name.clone(), Arc::clone(&child));
        for alias in &child.aliases {
            children.insert(alias.clone(), Arc::clone(&child));
        }
    }

    if is_shell_root {
        install_builtins(&mut children, &path);
    }

    Ok(CommandNode {
        name: graph.name().to_string(),
        aliases: graph.aliases().to_vec(),
        path,
        is_group,
        is_shell_root,
        is_hidden: graph.is_hidden(),
        is_repeatable: graph.is_repeatable(),
        help: graph.help().map(str::to_string),
        options,
        arguments: graph.arguments()?,
        children,
        builtin: None,
    })
}

fn install_builtins(children: &mut IndexMap<String, Arc<CommandNode>>, shell_path: &[String]) {
    for builtin in Builtin::ALL {
        if children.contains_key(builtin.name()) {
            log::debug!("`{builtin}` is defined by the host; skipping the builtin");
            continue;
        }

        let mut path = shell_path.to_vec();
        path.push(builtin.name().to_string());

        let arguments = match builtin {
            Builtin::Help => {
                let mut command = ArgumentSpec::new("command", ValueKind::Scalar(ScalarKind::Text));
                command.required = false;
                vec![command]
            }
            _ => Vec::new(),
        };

        let aliases: Vec<String> = builtin
            .aliases()
            .iter()
            .filter(|alias| !children.contains_key(**alias))
            .map(|alias| alias.to_string())
            .collect();

        let node = Arc::new(CommandNode {
            name: builtin.name().to_string(),
            aliases,
            path,
            is_group: false,
            is_shell_root: false,
            is_hidden: builtin.is_hidden(),
            is_repeatable: false,
            help: Some(builtin.help().to_string()),
            options: vec![OptionSpec::help_option()],
            arguments,
            children: IndexMap::new(),
            builtin: Some(builtin),
        });

        children.insert(node.name.clone(), Arc::clone(&node));
        for alias in &node.aliases {
            children.insert(alias.clone(), Arc::clone(&node));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture_index;

    #[test]
    fn test_lookup_follows_path() {
        let index = fixture_index();
        let node = index.lookup(&["api", "test"]).unwrap();
        assert_eq!(node.name, "test");
        assert_eq!(node.path, vec!["api".to_string(), "test".to_string()]);
        assert!(!node.is_group);
    }

    #[test]
    fn test_lookup_unknown_path() {
        let index = fixture_index();
        assert!(index.lookup(&["api", "nope"]).is_none());
    }

    #[test]
    fn test_alias_resolves_to_same_node() {
        let index = fixture_index();
        let by_name = index.lookup(&["multi", "tup"]).unwrap();
        let by_alias = index.lookup(&["multi", "tuple"]).unwrap();
        assert!(Arc::ptr_eq(by_name, by_alias));
    }

    #[test]
    fn test_visible_children_skip_aliases_and_hidden() {
        let index = fixture_index();
        let names: Vec<&str> = index
            .root()
            .visible_children()
            .map(|child| child.name.as_str())
            .collect();
        assert!(names.contains(&"api"));
        assert!(names.contains(&"exit"));
        assert!(!names.contains(&"secret"));
        assert!(!names.contains(&"quit"));
        assert!(!names.contains(&"q"));

        let multi = index.lookup(&["multi"]).unwrap();
        let multi_names: Vec<&str> = multi.visible_children().map(|c| c.name.as_str()).collect();
        assert_eq!(multi_names.iter().filter(|n| **n == "tup").count(), 1);
        assert!(!multi_names.contains(&"tuple"));
    }

    #[test]
    fn test_builtins_installed_on_every_shell_root() {
        let index = fixture_index();
        for path in [vec![], vec!["someshell"]] {
            let shell = index.lookup(&path).unwrap();
            assert!(shell.is_shell_root);
            for builtin in Builtin::ALL {
                let node = shell.child(builtin.name()).unwrap();
                assert_eq!(node.builtin, Some(builtin));
            }
            assert_eq!(shell.child("q").unwrap().builtin, Some(Builtin::Quit));
        }
        assert!(index.lookup(&["api"]).unwrap().child("exit").is_none());
    }

    #[test]
    fn test_every_node_has_help_option() {
        let index = fixture_index();
        let node = index.lookup(&["api", "test"]).unwrap();
        let help = node.option_for_flag("--help").unwrap();
        assert!(help.is_help);
    }

    #[test]
    fn test_option_matches_short_flag() {
        let mut option = OptionSpec::new("flag", ValueKind::Flag);
        option.short = Some('f');
        assert!(option.matches_flag("--flag"));
        assert!(option.matches_flag("-f"));
        assert!(!option.matches_flag("-fx"));
        assert!(!option.matches_flag("--fla"));
    }

    #[test]
    fn test_choice_display_tag() {
        let choices = ChoiceSet::new(vec!["blue".to_string(), "red".to_string()])
            .with_display_tags(vec!["cyan".to_string()]);
        assert_eq!(choices.display_tag("blue"), Some("cyan"));
        assert_eq!(choices.display_tag("red"), None);
        assert_eq!(choices.describe(), "'blue', 'red'");
    }

    #[test]
    fn test_tuple_signature() {
        let kinds = vec![
            ElementKind::Scalar(ScalarKind::Text),
            ElementKind::Boolean,
            ElementKind::Tuple(vec![ElementKind::Scalar(ScalarKind::Integer)]),
        ];
        assert_eq!(tuple_signature(&kinds), "[text, boolean, [integer]]");
    }

    #[test]
    fn test_build_is_idempotent() {
        let definition = crate::test_support::fixture_definition();
        let first = CommandTreeIndex::build(&definition).unwrap();
        let second = CommandTreeIndex::build(&definition).unwrap();
        let first_names: Vec<&String> = first.root().children.keys().collect();
        let second_names: Vec<&String> = second.root().children.keys().collect();
        assert_eq!(first_names, second_names);
    }
}
