use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::{info, warn};
use std::fs;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

mod cli;

use cli::{Cli, Commands, ConsoleInput};
use rrsleuth::agent::{AgentEvent, AgentOutcome, DebugAgent, Finish};
use rrsleuth::config::Config;
use rrsleuth::llm::build_client;
use rrsleuth::session::{Session, SessionLog};
use rrsleuth::tools::{ToolContext, ToolRegistry};

const RULE_WIDTH: usize = 80;
const PREVIEW_CHARS: usize = 400;

fn setup_logging(level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rrsleuth")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("rrsleuth.log");

    // Terminal belongs to the console, logs go to a file
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let mut builder = env_logger::Builder::from_default_env();
    if let Some(level) = level {
        builder.parse_filters(level);
    }
    builder.target(env_logger::Target::Pipe(target)).init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn open_session_log(config: &Config) -> Result<SessionLog> {
    if !config.session_log.enabled {
        return Ok(SessionLog::disabled());
    }
    SessionLog::open(&config.session_log.path)
        .with_context(|| format!("Failed to open session log {}", config.session_log.path.display()))
}

/// Agent plus the receiving end of its progress events
struct Analyst {
    agent: DebugAgent,
    events: mpsc::UnboundedReceiver<AgentEvent>,
}

impl Analyst {
    fn build(config: &Config) -> Result<Self> {
        let client = build_client(&config.llm).context("Failed to set up reasoning backend")?;
        let (tx, rx) = mpsc::unbounded_channel();
        let agent = DebugAgent::new(client, ToolRegistry::standard(), &config.agent)?
            .with_max_tokens(config.llm.max_tokens)
            .with_events(tx);
        Ok(Self { agent, events: rx })
    }

    /// Print progress while the question runs, then the outcome
    async fn ask(&mut self, question: &str, ctx: &ToolContext<'_>, verbose: bool) -> Result<()> {
        println!("{} {}", "Analyzing:".cyan().bold(), question);

        let Self { agent, events } = self;
        let asking = agent.ask(question, ctx);
        tokio::pin!(asking);
        let result = loop {
            tokio::select! {
                Some(event) = events.recv() => print_event(event),
                result = &mut asking => break result,
            }
        };
        // Every event was sent before the question finished
        while let Ok(event) = events.try_recv() {
            print_event(event);
        }

        print_outcome(&result?, verbose);
        Ok(())
    }
}

fn print_event(event: AgentEvent) {
    match event {
        AgentEvent::Thinking { iteration } => {
            println!("{}", format!("[thinking #{}]", iteration).dimmed());
        }
        AgentEvent::Assistant(text) => println!("{}", text),
        AgentEvent::ToolStarted { name, input } => {
            println!("{} {}({})", "→".blue(), name.blue().bold(), input);
        }
        AgentEvent::ToolFinished { output, .. } => println!("{}", preview(&output).dimmed()),
    }
}

fn preview(output: &str) -> String {
    if output.chars().count() <= PREVIEW_CHARS {
        return output.to_string();
    }
    let head: String = output.chars().take(PREVIEW_CHARS).collect();
    format!("{}...", head)
}

fn print_outcome(outcome: &AgentOutcome, verbose: bool) {
    let rule = "=".repeat(RULE_WIDTH);
    println!("{}", rule);
    match outcome.finish {
        Finish::Answered => println!("{}", "Analysis Complete".green().bold()),
        Finish::IterationCap => println!(
            "{}",
            format!("Stopped after {} reasoning steps without a final answer", outcome.iterations)
                .yellow()
                .bold()
        ),
    }
    println!("{}", rule);
    println!("{}", outcome.answer);
    if verbose {
        println!(
            "{}",
            format!(
                "{} steps, {} input tokens, {} output tokens",
                outcome.iterations, outcome.usage.input_tokens, outcome.usage.output_tokens
            )
            .dimmed()
        );
    }
}

async fn run_command(session: &Session, command: &str) {
    match session.run(command).await {
        Ok(outcome) => {
            let text = outcome.text();
            if !text.is_empty() {
                print!("{}", text);
                if !text.ends_with('\n') {
                    println!();
                }
            }
            if let Some(message) = outcome.error_message() {
                println!("{} {}", "error:".red(), message);
            }
        }
        Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
    }
}

async fn handle_exec(session: &Session, commands: &[String]) -> Result<()> {
    for command in commands {
        println!("{} {}", "(rr)".cyan(), command);
        run_command(session, command).await;
    }
    Ok(())
}

async fn handle_analyze(session: &Session, question: &str, cli: &Cli, config: &Config) -> Result<()> {
    let mut analyst = Analyst::build(config)?;
    let ctx = ToolContext::new(session.runner()).with_source_root(config.debugger.source_root.clone());
    analyst.ask(question, &ctx, cli.is_verbose()).await
}

async fn handle_console(session: &Session, cli: &Cli, config: &Config) -> Result<()> {
    let mut analyst = match Analyst::build(config) {
        Ok(analyst) => Some(analyst),
        Err(e) => {
            println!("{} {:#}", "Analysis unavailable:".yellow(), e);
            None
        }
    };
    let ctx = ToolContext::new(session.runner()).with_source_root(config.debugger.source_root.clone());

    println!(
        "{}",
        "Commands: analyze <question>, xrun <command>, history, quit. Anything else goes to the debugger.".dimmed()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"(rrsleuth) ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match ConsoleInput::parse(&line) {
            ConsoleInput::Empty => {}
            ConsoleInput::Quit => break,
            ConsoleInput::Usage(usage) => println!("{}", usage),
            ConsoleInput::History => println!("{}", session.log().render_history()),
            ConsoleInput::Xrun(command) | ConsoleInput::Command(command) => run_command(session, &command).await,
            ConsoleInput::Analyze(question) => match analyst.as_mut() {
                Some(analyst) => {
                    if let Err(e) = analyst.ask(&question, &ctx, cli.is_verbose()).await {
                        eprintln!("{} {:#}", "Analysis failed:".red().bold(), e);
                    }
                }
                None => println!("{}", "Analysis unavailable, check the llm section of the config".yellow()),
            },
        }
    }

    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let log = open_session_log(config)?;
    println!("{} {}", "Starting".cyan(), config.debugger.command_line().join(" "));
    let session = Session::start(&config.debugger, &config.correlator, log)
        .await
        .context("Failed to start debugger session")?;

    let startup = session.startup_text();
    if !startup.is_empty() {
        print!("{}", startup);
    }

    let result = match &cli.command {
        None | Some(Commands::Console) => handle_console(&session, cli, config).await,
        Some(Commands::Exec { commands }) => handle_exec(&session, commands).await,
        Some(Commands::Analyze { question }) => handle_analyze(&session, &question.join(" "), cli, config).await,
    };

    if let Err(e) = session.close().await {
        warn!("Debugger did not exit cleanly: {}", e);
    }
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    cli.apply(&mut config);

    setup_logging(config.log_level.as_deref()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
