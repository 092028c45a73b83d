use crate::command_definitions::ShellDefinition;
use crate::file_handling::parse_shell_definition;
use crate::tree::CommandTreeIndex;

pub const FIXTURE_YAML: &str = r#"
name: testapp
help: Test application
commands:
  - name: settings
    help: Show settings
  - name: enable
    help: Enable features
    arguments:
      - name: singleflag
        type: choice
        choices: [verbose, color]
        required: false
    options:
      - name: flag
        short: f
        type: choice
        choices: [verbose, color]
        multiple: true
  - name: api
    help: API commands
    commands:
      - name: another
        help: Nested API commands
        commands:
          - name: test
            help: Typed arguments
            arguments:
              - name: test
                type: text
              - name: test2
                type: integer
              - name: test3
                type: float
            options:
              - name: opt1
                type: choice
                choices: [blue, red]
                display_tags: [blue, red]
              - name: opt2
                type: text
                default: test
              - name: dev
                type: flag
      - name: test
        help: Some API Command
        repeatable: true
        arguments:
          - name: arg1
            type: text
            help: Some argument
        options:
          - name: opt1
            type: choice
            choices: [blue, red]
          - name: opt2
            type: boolean
  - name: multi
    help: Multi-value commands
    commands:
      - name: tup
        aliases: [tuple]
        help: Tuple options
        repeatable: true
        arguments:
          - name: test
            type: text
          - name: test2
            type: integer
          - name: test3
            type: float
        options:
          - name: t
            type: tuple
            elements:
              - type: text
              - type: float
              - type: boolean
              - type: choice
                choices: [choice1, choice2]
          - name: c
            type: tuple
            multiple: true
            elements:
              - type: boolean
              - type: boolean
          - name: dev
            type: flag
      - name: point
        help: Multi-arity values
        repeatable: true
        arguments:
          - name: coords
            type: integer
            arity: 2
          - name: label
            type: text
        options:
          - name: offset
            type: float
            arity: 2
  - name: greet
    help: Greets someone
    repeatable: true
    run: "Hello {name}!"
    arguments:
      - name: name
    options:
      - name: loud
        type: flag
      - name: times
        type: integer
        default: "1"
  - name: secret
    hidden: true
  - name: load
    help: Loads data
    options:
      - name: data
        type: tuple
        elements:
          - type: integer
          - type: boolean
          - type: text
  - name: someshell
    help: A nested shell
    shell: true
    commands:
      - name: test
        repeatable: true
        options:
          - name: opt1
            type: flag
          - name: opt2
            type: flag
            hidden: true
      - name: group
        commands:
          - name: cmd
            repeatable: true
            arguments:
              - name: choice
                type: choice
                choices: [blue, red]
"#;

pub fn fixture_definition() -> ShellDefinition {
    parse_shell_definition(FIXTURE_YAML, "fixture").unwrap()
}

pub fn fixture_index() -> CommandTreeIndex {
    CommandTreeIndex::build(&fixture_definition()).unwrap()
}
