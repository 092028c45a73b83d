//! Integration tests for pretty-shell-core
//!
//! These tests load definition files from disk and drive whole workflows:
//! parse then replay, literal tuple validation, and complete sessions with a
//! file-backed history.

use std::fs;
use std::io::Write;

use pretty_shell_core::command_definitions::ShellDefinition;
use pretty_shell_core::completion::CompletionEngine;
use pretty_shell_core::config::{get_history_path, SessionConfig};
use pretty_shell_core::error::Error;
use pretty_shell_core::file_handling::get_shell_definition;
use pretty_shell_core::history::{FileHistory, HistoryStore};
use pretty_shell_core::interpolation::render_command;
use pretty_shell_core::parser::{BoundCommand, LineParser, ParsedLine};
use pretty_shell_core::resolver::{CursorRole, LineContextResolver};
use pretty_shell_core::serializer::CommandLineSerializer;
use pretty_shell_core::session::{CommandFailure, CommandHost, ReplSession, ScriptedSource};
use pretty_shell_core::suggest::suggest;
use pretty_shell_core::tree::{CommandNode, CommandTreeIndex, ElementKind, ScalarKind};
use pretty_shell_core::value::Value;
use tempfile::{NamedTempFile, TempDir};

const DEPLOY_YAML: &str = r#"
name: deployer
help: Deployment shell
prompt: "{path} $ "
commands:
  - name: deploy
    help: Deploy a service
    repeatable: true
    run: "deploying {service} to {env} x{replicas}"
    arguments:
      - name: service
    options:
      - name: env
        short: e
        type: choice
        choices: [dev, staging, prod]
        default: dev
      - name: replicas
        type: integer
        default: 1
      - name: dry-run
        type: flag
      - name: ratio
        type: float
        default: 0.5
  - name: group
    commands:
      - name: sub
        options:
          - name: flag
            type: flag
  - name: data
    repeatable: true
    run: "{data}"
    options:
      - name: data
        type: tuple
        elements:
          - type: integer
          - type: boolean
          - type: text
  - name: ops
    shell: true
    help: Operations shell
    commands:
      - name: restart
        repeatable: true
        run: "restarting {target}"
        arguments:
          - name: target
            type: choice
            choices: [api, worker]
"#;

fn write_definition(yaml: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    write!(temp_file, "{yaml}").unwrap();
    temp_file
}

fn load_index() -> (ShellDefinition, CommandTreeIndex) {
    let temp_file = write_definition(DEPLOY_YAML);
    let definition = get_shell_definition(temp_file.path().to_str().unwrap()).unwrap();
    let index = CommandTreeIndex::build(&definition).unwrap();
    (definition, index)
}

fn invoke(index: &CommandTreeIndex, line: &str, shell_path: &[String]) -> (std::sync::Arc<CommandNode>, BoundCommand) {
    match LineParser::new(index).parse(line, shell_path).unwrap() {
        ParsedLine::Invoke { node, bound } => (node, bound),
        other => panic!("expected an invocation for `{line}`, got {other:?}"),
    }
}

/// Renders each command's `run` template, the way the CLI host does.
struct TemplateHost {
    definition: ShellDefinition,
}

impl CommandHost for TemplateHost {
    fn invoke(
        &mut self,
        node: &CommandNode,
        bound: &BoundCommand,
        out: &mut dyn Write,
    ) -> Result<(), CommandFailure> {
        let templates = self.definition.run_templates();
        let Some(template) = templates.get(&node.path) else {
            return Ok(());
        };
        let rendered = render_command(template, node, bound).map_err(|e| CommandFailure::Unexpected {
            message: e.to_string(),
            detail: None,
        })?;
        writeln!(out, "{rendered}").map_err(|e| CommandFailure::Unexpected {
            message: e.to_string(),
            detail: None,
        })
    }
}

#[test]
fn test_definition_file_to_bound_command() {
    let (_, index) = load_index();
    let (_, bound) = invoke(&index, "deploy web -e prod --replicas 3 --dry-run", &[]);

    assert_eq!(bound.get("service"), Some(&Value::Text("web".to_string())));
    assert_eq!(bound.get("env"), Some(&Value::Choice("prod".to_string())));
    assert_eq!(bound.get("replicas"), Some(&Value::Integer(3)));
    assert_eq!(bound.get("dry-run"), Some(&Value::Bool(true)));
    assert_eq!(bound.get("ratio"), Some(&Value::Float(0.5)));
}

#[test]
fn test_serialize_then_parse_round_trip() {
    let (_, index) = load_index();
    let lines = [
        "deploy web",
        "deploy \"my service\" --env staging --ratio 2",
        "deploy web --dry-run --replicas 0 -e prod",
        "deploy \"-dash\" --ratio -1.25",
    ];

    for line in lines {
        let (node, bound) = invoke(&index, line, &[]);
        let canonical = CommandLineSerializer::serialize(&node, &bound, &[]);
        let (_, reparsed) = invoke(&index, &canonical, &[]);
        assert_eq!(bound, reparsed, "`{line}` serialized as `{canonical}`");
    }
}

#[test]
fn test_literal_tuple_validation() {
    let (_, index) = load_index();
    let parser = LineParser::new(&index);

    let (_, bound) = invoke(&index, r#"data --data [7, true, "seven"]"#, &[]);
    assert_eq!(
        bound.get("data"),
        Some(&Value::Tuple(vec![
            Value::Integer(7),
            Value::Bool(true),
            Value::Text("seven".to_string()),
        ]))
    );

    for bad in [
        "data --data [7, true]",
        r#"data --data [7, true, "x", "y"]"#,
        r#"data --data [true, 7, "x"]"#,
        r#"data --data [7.5, true, "x"]"#,
        r#"data --data [7, true, "x""#,
    ] {
        let error = parser.parse(bad, &[]).unwrap_err();
        assert!(matches!(error, Error::Tuple { .. }), "`{bad}` gave {error:?}");
    }
}

#[test]
fn test_flag_after_nested_group_path() {
    let (_, index) = load_index();
    let context = LineContextResolver::new(&index).resolve_line("group sub --flag", &[]);
    assert_eq!(context.cursor_role, CursorRole::OptionFlag);
    assert_eq!(context.active_node.unwrap().name, "sub");
}

#[test]
fn test_tuple_element_position_while_typing() {
    let (_, index) = load_index();
    let context = LineContextResolver::new(&index).resolve_line("data --data [1, true, ", &[]);
    assert_eq!(context.cursor_role, CursorRole::TupleElement);

    let state = context.tuple_state.unwrap();
    assert_eq!(state.next_element_index, 2);
    assert_eq!(
        state.next_expected_kind(),
        Some(&ElementKind::Scalar(ScalarKind::Text))
    );
}

#[test]
fn test_completion_against_loaded_definition() {
    let (_, index) = load_index();
    let resolver = LineContextResolver::new(&index);
    let engine = CompletionEngine::new();

    let context = resolver.resolve_line("deploy web --env ", &[]);
    let values: Vec<String> = engine
        .complete(&context, &context.word)
        .into_iter()
        .map(|c| c.insert_text)
        .collect();
    assert_eq!(values, vec!["dev", "staging", "prod"]);

    let context = resolver.resolve_line("deploy web --", &[]);
    let flags: Vec<String> = engine
        .complete(&context, &context.word)
        .into_iter()
        .map(|c| c.insert_text)
        .collect();
    assert_eq!(flags, vec!["--env", "--replicas", "--dry-run", "--ratio"]);
}

#[test]
fn test_suggest_examples() {
    let names = ["status", "start", "stop"];
    assert!(suggest(&names, "sttus").unwrap().contains("status"));
    assert!(suggest(&names, "zzz").is_none());
}

#[test]
fn test_session_with_file_history() {
    let (definition, index) = load_index();
    let dir = TempDir::new().unwrap();
    let history_path = get_history_path(
        &Some(dir.path().join("history").to_string_lossy().to_string()),
        &definition.history_file,
    );

    let source = ScriptedSource::from_lines(&[
        "deploy web -e prod",
        "repeat",
        "ops",
        "restart worker",
        "repeat",
        "exit",
        "nope",
    ]);
    let host = TemplateHost {
        definition: definition.clone(),
    };
    let config = SessionConfig {
        intro: Some("Welcome to deployer".to_string()),
        color: false,
    };
    let mut session = ReplSession::new(
        index,
        source,
        host,
        Vec::new(),
        Box::new(FileHistory::new(history_path.clone())),
        config,
    );
    session.run().unwrap();

    let output = String::from_utf8(session.output().clone()).unwrap();
    assert!(output.starts_with("Welcome to deployer\n"));
    assert_eq!(output.matches("deploying web to prod x1").count(), 2);
    assert_eq!(output.matches("restarting worker").count(), 2);
    assert!(output.contains("restart worker\n"));
    assert!(output.contains("Command not found: nope"));

    let persisted = fs::read_to_string(&history_path).unwrap();
    let persisted: Vec<&str> = persisted.lines().collect();
    assert_eq!(persisted.first(), Some(&"deploy web -e prod"));
    assert_eq!(persisted.last(), Some(&"nope"));
    assert!(persisted.contains(&"deploy web --env prod --replicas 1 --ratio 0.5"));

    let mut reloaded = FileHistory::new(history_path);
    assert_eq!(reloaded.load().unwrap().len(), persisted.len());
}
