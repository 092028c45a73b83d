use std::io::stdout;
use std::process::ExitCode;

use clap::Parser;
use log::{debug, info};
use pretty_shell_core::command_definitions::ShellDefinition;
use pretty_shell_core::config::{self, SessionConfig, DEFAULT_PROMPT};
use pretty_shell_core::error::Result;
use pretty_shell_core::file_handling;
use pretty_shell_core::history::{FileHistory, HistoryStore};
use pretty_shell_core::session::{LineSource, PromptSource, ReplSession, ScriptedSource};
use pretty_shell_core::tree::CommandTreeIndex;

use pretty_shell_cli::cli_args::Args;
use pretty_shell_cli::editor::{RustylineSource, ShellHelper};
use pretty_shell_cli::host::TemplateHost;

/// Load the shell definition and build its command tree
fn initialize(args: &Args) -> Result<(ShellDefinition, CommandTreeIndex)> {
    let definitions_path = config::get_definitions_path(&args.definitions);
    debug!("Definitions path: `{definitions_path}`");

    let definition = file_handling::get_shell_definition(&definitions_path)?;
    let index = CommandTreeIndex::build(&definition)?;

    Ok((definition, index))
}

fn run_session<L: LineSource>(
    definition: &ShellDefinition,
    index: CommandTreeIndex,
    source: L,
    history: FileHistory,
    config: SessionConfig,
) -> Result<()> {
    let prompt = definition
        .prompt
        .clone()
        .unwrap_or_else(|| DEFAULT_PROMPT.to_string());

    let mut session = ReplSession::new(
        index,
        source,
        TemplateHost::new(definition),
        stdout(),
        Box::new(history),
        config,
    )
    .with_prompt(PromptSource::Template(prompt));

    session.run()
}

fn execute() -> Result<()> {
    let args = Args::parse();
    let (definition, index) = initialize(&args)?;

    let history_path = config::get_history_path(&args.history_file, &definition.history_file);
    debug!("History path: `{history_path}`");
    let mut history = FileHistory::new(history_path);

    if args.clear_history {
        history.clear()?;
        println!("History cleared successfully");
        return Ok(());
    }

    let color = !args.no_color;

    if let Some(line) = args.one_shot_line() {
        info!("Running one command: `{line}`");
        let config = SessionConfig { intro: None, color };
        return run_session(&definition, index, ScriptedSource::from_lines(&[line]), history, config);
    }

    let helper = ShellHelper::new(index.clone(), args.fuzzy, args.live_completion, color);
    let source = RustylineSource::new(helper)?;
    let config = SessionConfig {
        intro: definition.intro.clone(),
        color,
    };

    run_session(&definition, index, source, history, config)
}

fn main() -> ExitCode {
    env_logger::init();

    match execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
