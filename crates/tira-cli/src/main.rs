use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tira_cli::{build_manager, run, Cli};
use tira_context::ContextManager;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const REPL_COMMANDS: &[&str] = &["/summary", "/history", "/help", "/exit", "/quit"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplCommand {
    Ask(String),
    Summary,
    History,
    Help,
    Exit,
    Empty,
    Unknown(String),
}

#[derive(Default)]
struct ReplHelper;

impl Helper for ReplHelper {}
impl Hinter for ReplHelper {
    type Hint = String;
}
impl Highlighter for ReplHelper {}
impl Validator for ReplHelper {}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let pos = pos.min(line.len());
        let prefix = &line[..pos];
        if !prefix.starts_with('/') || prefix.contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }

        let pairs = complete_candidates(prefix)
            .into_iter()
            .map(|candidate| Pair {
                display: candidate.to_string(),
                replacement: candidate.to_string(),
            })
            .collect();
        Ok((0, pairs))
    }
}

fn parse_line(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }
    if !line.starts_with('/') {
        return ReplCommand::Ask(line.to_string());
    }

    match line {
        "/exit" | "/quit" => ReplCommand::Exit,
        "/help" | "/?" => ReplCommand::Help,
        "/summary" => ReplCommand::Summary,
        "/history" => ReplCommand::History,
        _ => ReplCommand::Unknown(format!("unknown command: {line}")),
    }
}

fn help_text() -> String {
    [
        "Anything not starting with `/` is sent as a question.",
        "Commands:",
        "  /summary   Show the rolling summary of this conversation",
        "  /history   Show the recorded turns",
        "  /help      Show this help",
        "  /exit      Exit",
    ]
    .join("\n")
}

fn complete_candidates(prefix: &str) -> BTreeSet<&'static str> {
    REPL_COMMANDS
        .iter()
        .copied()
        .filter(|command| command.starts_with(prefix))
        .collect()
}

fn history_file() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".tira-history");
    }
    PathBuf::from(".tira-history")
}

async fn run_repl_command(
    manager: &ContextManager,
    conversation_id: &str,
    command: ReplCommand,
) -> anyhow::Result<bool> {
    match command {
        ReplCommand::Ask(question) => {
            let answer = manager.ask(conversation_id, &question).await?;
            println!("{} {answer}", "tira:".bright_cyan());
        }
        ReplCommand::Summary => match manager.store().get_summary(conversation_id).await {
            Some(summary) => println!("{}", summary.bright_blue()),
            None => println!("{}", "no summary yet".yellow()),
        },
        ReplCommand::History => {
            let turns = manager.store().get_turns(conversation_id).await;
            if turns.is_empty() {
                println!("{}", "no turns yet".yellow());
            }
            for (i, turn) in turns.iter().enumerate() {
                println!("{}. {} {}", (i + 1).to_string().cyan(), "you:".green(), turn.question);
                println!("   {} {}", "tira:".bright_cyan(), turn.answer);
            }
        }
        ReplCommand::Help => println!("{}", help_text().bright_blue()),
        ReplCommand::Exit => {
            println!("{}", "bye".bright_green());
            return Ok(true);
        }
        ReplCommand::Empty => {}
        ReplCommand::Unknown(message) => {
            println!("{} {message}", "warning:".yellow());
            println!("{}", "Type `/help` for available commands.".yellow());
        }
    }

    Ok(false)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "tira=info,tira_context=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let manager = build_manager(&cli)?;

    if let Some(output) = run(&cli, &manager).await? {
        println!("{output}");
        return Ok(());
    }

    let mut editor = Editor::<ReplHelper, rustyline::history::DefaultHistory>::new()?;
    editor.set_helper(Some(ReplHelper));
    let history = history_file();
    let _ = editor.load_history(&history);

    println!(
        "{} {}",
        "Tira interactive chat. Type `/help`. Conversation:".bright_green(),
        cli.conversation.cyan()
    );
    loop {
        match editor.readline("you> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(trimmed);
                match run_repl_command(&manager, &cli.conversation, parse_line(trimmed)).await {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(err) => eprintln!("{} {err}", "error:".red()),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted)
            | Err(rustyline::error::ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(err) => {
                eprintln!("{} {err}", "error:".red());
                break;
            }
        }
    }

    if let Err(err) = editor.save_history(&history) {
        eprintln!("{} failed to save history: {err}", "warning:".yellow());
    }

    Ok(())
}
