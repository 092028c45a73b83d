//! Drives whole sessions of the demo shell through the template host.

use std::fs;

use pretty_shell_cli::host::TemplateHost;
use pretty_shell_core::command_definitions::ShellDefinition;
use pretty_shell_core::config::SessionConfig;
use pretty_shell_core::file_handling::get_shell_definition;
use pretty_shell_core::history::{FileHistory, MemoryHistory};
use pretty_shell_core::session::{PromptSource, ReplSession, ScriptedSource};
use pretty_shell_core::tree::CommandTreeIndex;
use tempfile::TempDir;

fn demo_definition() -> ShellDefinition {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/testapp.yml");
    get_shell_definition(path).unwrap()
}

fn run_lines(lines: &[&str]) -> (String, Vec<String>) {
    let definition = demo_definition();
    let index = CommandTreeIndex::build(&definition).unwrap();
    let prompt = definition.prompt.clone().unwrap();

    let mut session = ReplSession::new(
        index,
        ScriptedSource::from_lines(lines),
        TemplateHost::new(&definition),
        Vec::new(),
        Box::new(MemoryHistory::new()),
        SessionConfig {
            intro: None,
            color: false,
        },
    )
    .with_prompt(PromptSource::Template(prompt));
    session.run().unwrap();

    let output = String::from_utf8(session.output().clone()).unwrap();
    let prompts = session.source().prompts().to_vec();
    (output, prompts)
}

#[test]
fn test_demo_definition_loads() {
    let definition = demo_definition();
    assert_eq!(definition.name, "testapp");
    assert!(CommandTreeIndex::build(&definition).is_ok());
}

#[test]
fn test_templates_render_bound_values() {
    let (output, _) = run_lines(&["greet Ada --loud", "paint red --point [1, 2, true]", "api st -v"]);

    assert!(output.contains("Hello Ada! (loud: true, times: 1)"));
    assert!(output.contains("Painting [1, 2, true] red"));
    assert!(output.contains("API is up (verbose: true)"));
}

#[test]
fn test_sub_shell_and_repeat() {
    let (output, prompts) = run_lines(&["ops", "restart worker", "repeat", "scale api --factor 2", "exit", "greet Bo"]);

    assert_eq!(output.matches("Restarting worker").count(), 2);
    assert!(output.contains("Scaling api by 2"));
    assert!(output.contains("Hello Bo! (loud: false, times: 1)"));
    assert_eq!(prompts.first().map(String::as_str), Some("testapp > "));
    assert!(prompts.iter().any(|prompt| prompt == "testapp ops > "));
}

#[test]
fn test_usage_errors_do_not_end_the_session() {
    let (output, _) = run_lines(&["greet", "paint purple", "greet Cy"]);

    assert!(output.contains("Usage: greet [OPTIONS] NAME"));
    assert!(output.contains("Error:"));
    assert!(output.contains("Hello Cy!"));
}

#[test]
fn test_history_file_is_written() {
    let definition = demo_definition();
    let index = CommandTreeIndex::build(&definition).unwrap();
    let dir = TempDir::new().unwrap();
    let history_path = dir.path().join("nested").join("history");

    let mut session = ReplSession::new(
        index,
        ScriptedSource::from_lines(&["greet Ada", "", "api status"]),
        TemplateHost::new(&definition),
        Vec::new(),
        Box::new(FileHistory::new(history_path.to_string_lossy().to_string())),
        SessionConfig::default(),
    );
    session.run().unwrap();

    let persisted = fs::read_to_string(history_path).unwrap();
    assert_eq!(persisted.lines().collect::<Vec<_>>(), vec!["greet Ada", "api status"]);
}
