//! Chat command handler.
//!
//! Interactive loop: plain lines are questions, slash commands change the
//! session. Answers go to stdout; the busy line, debug block and errors go
//! to stderr.

use crate::bootstrap::{build_engine, edge_error};
use anyhow::Context;
use clap::Args;
use docchat_chat::{ChatEngine, EngineOptions, Outcome, Session, TurnReport, UserAction};
use docchat_core::{config::AppConfig, AppResult};
use docchat_knowledge::DocumentEntry;
use docchat_llm::ModelName;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

const HELP: &str = "\
Commands:
  /model [name]      select a model (no name lists the catalog)
  /history on|off    fold prior turns into retrieval and the prompt
  /debug on|off      show retrieval queries, sources and summaries
  /reset             clear the conversation
  /docs              list the documents in the corpus
  /state             show the session state
  /help              show this help
  /quit              leave";

/// Interactive chat over the corpus
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Start with history disabled
    #[arg(long)]
    pub no_history: bool,

    /// Start with the debug channel disabled
    #[arg(long)]
    pub no_debug: bool,

    /// Maximum tokens in each answer
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Temperature for response generation (0.0-2.0)
    #[arg(long)]
    pub temperature: Option<f32>,
}

/// A parsed line of REPL input.
#[derive(Debug, Clone, PartialEq)]
enum ReplInput {
    Action(UserAction),
    ListModels,
    Help,
    Quit,
    Empty,
}

impl ChatCommand {
    /// Execute the chat command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let mut options = EngineOptions::from_config(config);
        options.max_tokens = self.max_tokens;
        options.temperature = self.temperature;

        let engine = build_engine(config, options)?;

        let mut session = Session::from_config(config)?;
        if self.no_history {
            session.settings.use_history = false;
        }
        if self.no_debug {
            session.settings.debug = false;
        }

        match engine.handle(&mut session, UserAction::ListDocuments).await {
            Ok(Outcome::Documents(documents)) => print_documents(&documents),
            Ok(_) => {}
            Err(e) => eprintln!("error: {}", e),
        }
        println!(
            "Model: {} | history: {} | debug: {}. Type /help for commands.",
            session.settings.model,
            on_off(session.settings.use_history),
            on_off(session.settings.debug)
        );

        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            let line = match read_line(&mut lines).await.map_err(edge_error)? {
                Some(line) => line,
                None => break,
            };

            let input = match parse_input(&line) {
                Ok(input) => input,
                Err(message) => {
                    eprintln!("error: {}", message);
                    continue;
                }
            };

            match input {
                ReplInput::Empty => continue,
                ReplInput::Quit => break,
                ReplInput::Help => println!("{}", HELP),
                ReplInput::ListModels => print_models(session.settings.model),
                ReplInput::Action(action) => {
                    self.run_action(&engine, &mut session, action).await;
                }
            }
        }

        tracing::info!("Chat session {} ended", session.id());
        Ok(())
    }

    async fn run_action(&self, engine: &ChatEngine, session: &mut Session, action: UserAction) {
        let asking = matches!(action, UserAction::Ask(_));
        if asking {
            eprintln!("{} thinking...", session.settings.model);
        }

        match engine.handle(session, action).await {
            Ok(outcome) => render(&outcome, session.settings.debug),
            Err(e) => eprintln!("error: {}", e),
        }
    }
}

fn render(outcome: &Outcome, debug: bool) {
    match outcome {
        Outcome::Answered(report) => {
            if debug {
                for line in debug_lines(report) {
                    eprintln!("{}", line);
                }
            }
            println!("{}", report.answer);
        }
        Outcome::SettingsChanged(settings) => println!(
            "Model: {} | history: {} | debug: {}",
            settings.model,
            on_off(settings.use_history),
            on_off(settings.debug)
        ),
        Outcome::ConversationReset => println!("Conversation cleared."),
        Outcome::Documents(documents) => print_documents(documents),
        Outcome::State(snapshot) => match serde_json::to_string_pretty(snapshot) {
            Ok(json) => eprintln!("{}", json),
            Err(e) => eprintln!("error: {}", e),
        },
    }
}

fn debug_lines(report: &TurnReport) -> Vec<String> {
    let mut lines = vec!["--- debug ---".to_string()];
    if let Some(ref summary) = report.summary {
        lines.push(format!("history summary: {}", summary));
    }
    lines.push(format!("retrieval query: {}", report.retrieval_query));
    lines.push(format!("sources: {}", report.sources.join(", ")));
    lines.push("-------------".to_string());
    lines
}

fn print_documents(documents: &[DocumentEntry]) {
    if documents.is_empty() {
        println!("No documents indexed. Run 'docchat ingest <paths>' first.");
        return;
    }

    println!("Documents available:");
    for document in documents {
        println!("  {}", document.relative_path);
    }
}

fn print_models(current: ModelName) {
    for model in ModelName::ALL {
        let marker = if model == current { "*" } else { " " };
        println!("{} {}", marker, model);
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

async fn read_line(lines: &mut Lines<BufReader<Stdin>>) -> anyhow::Result<Option<String>> {
    eprint!("> ");
    std::io::stderr().flush().context("Failed to write prompt")?;

    lines.next_line().await.context("Failed to read from stdin")
}

fn parse_input(line: &str) -> Result<ReplInput, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ReplInput::Empty);
    }

    let Some(command) = line.strip_prefix('/') else {
        return Ok(ReplInput::Action(UserAction::Ask(line.to_string())));
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let argument = parts.next();

    match (name, argument) {
        ("model", None) => Ok(ReplInput::ListModels),
        ("model", Some(model)) => ModelName::parse(model)
            .map(|m| ReplInput::Action(UserAction::SelectModel(m)))
            .map_err(|e| e.to_string()),
        ("history", Some(value)) => {
            parse_toggle(value).map(|v| ReplInput::Action(UserAction::SetUseHistory(v)))
        }
        ("debug", Some(value)) => {
            parse_toggle(value).map(|v| ReplInput::Action(UserAction::SetDebug(v)))
        }
        ("history", None) | ("debug", None) => Err(format!("Usage: /{} on|off", name)),
        ("reset", _) => Ok(ReplInput::Action(UserAction::Reset)),
        ("docs", _) => Ok(ReplInput::Action(UserAction::ListDocuments)),
        ("state", _) => Ok(ReplInput::Action(UserAction::InspectState)),
        ("help", _) => Ok(ReplInput::Help),
        ("quit", _) | ("exit", _) => Ok(ReplInput::Quit),
        _ => Err(format!("Unknown command '/{}'. Type /help for commands.", name)),
    }
}

fn parse_toggle(value: &str) -> Result<bool, String> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(format!("Expected on or off, got '{}'", other)),
    }
}
