// Command line front end for the text-to-SQL agent service.
//
// Asks a question and renders the agent's progress as it streams, runs SQL
// directly, and browses query history.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};

use text2sql_agent::history::{self, HistoryList};
use text2sql_agent::settings::ENV_SETTINGS_PATH;
use text2sql_agent::{
    AgentClient, FormatRequest, HistoryId, QueryRunner, ResultSet, Session, SessionStatus,
    Settings, SqlExecution,
};

#[derive(Debug, Parser)]
#[command(name = "text2sql-agent", version, about = "Ask questions of your database in plain language")]
struct Cli {
    /// Settings file (defaults to $TEXT2SQL_SETTINGS)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Agent service base URL
    #[arg(long, global = true, env = "TEXT2SQL_BASE_URL")]
    base_url: Option<String>,

    /// Database dialect sent with each request
    #[arg(long, global = true)]
    dbms: Option<String>,

    /// Fail on malformed stream lines instead of skipping them
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Ask a question and follow the agent's reasoning
    Ask {
        /// Natural-language question
        question: String,
        /// Tool-call budget for the agent
        #[arg(long)]
        max_tool_calls: Option<u32>,
        /// Do not execute the final SQL
        #[arg(long)]
        no_execute: bool,
    },
    /// Execute SQL directly
    Sql {
        /// SQL text
        sql: String,
        /// Explain the result with the format-with-AI stream
        #[arg(long)]
        format: bool,
        /// Question the SQL answers, used when formatting
        #[arg(long)]
        question: Option<String>,
    },
    /// Browse query history
    History {
        /// Case-insensitive search on question or SQL
        search: Option<String>,
        /// Fetch every page instead of the first
        #[arg(long)]
        all: bool,
        /// Delete one entry
        #[arg(long, conflicts_with = "clear")]
        delete: Option<String>,
        /// Delete all entries
        #[arg(long)]
        clear: bool,
    },
    /// Show or change settings
    Settings {
        /// New application title (blank restores the default)
        #[arg(long)]
        title: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let mut settings = Settings::load_with_env(cli.settings.as_deref())?;
    if let Some(url) = &cli.base_url {
        settings.base_url.clone_from(url);
    }
    if let Some(dbms) = &cli.dbms {
        settings.query_defaults.dbms = Some(dbms.clone());
    }
    settings.strict_decoding |= cli.strict;

    match cli.command {
        Command::Ask {
            question,
            max_tool_calls,
            no_execute,
        } => {
            if max_tool_calls.is_some() {
                settings.query_defaults.max_tool_calls = max_tool_calls;
            }
            if no_execute {
                settings.query_defaults.execute_final_sql = Some(false);
            }
            let client = Arc::new(AgentClient::new(settings.to_client_options()?)?);
            ask(client, &question).await
        }
        Command::Sql {
            sql,
            format,
            question,
        } => {
            let client = AgentClient::new(settings.to_client_options()?)?;
            run_sql(&client, &settings, &sql, format, question).await
        }
        Command::History {
            search,
            all,
            delete,
            clear,
        } => {
            let client = AgentClient::new(settings.to_client_options()?)?;
            browse_history(&client, &settings, search.as_deref(), all, delete, clear).await
        }
        Command::Settings { title } => {
            if let Some(title) = title {
                let path = cli
                    .settings
                    .or_else(|| std::env::var_os(ENV_SETTINGS_PATH).map(PathBuf::from))
                    .context("no settings file given (use --settings or TEXT2SQL_SETTINGS)")?;
                let mut stored = Settings::load(&path)?;
                stored.set_app_title(&title);
                stored.save(&path)?;
                settings.app_title = stored.app_title;
            }
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

// ============================================================================
// Ask
// ============================================================================

async fn ask(client: Arc<AgentClient>, question: &str) -> Result<ExitCode> {
    let mut runner = QueryRunner::new(client);
    let mut watcher = runner.handle().subscribe();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut printed_steps = 0usize;

    runner.ask(question);
    loop {
        tokio::select! {
            changed = watcher.changed() => {
                if !changed {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                runner.cancel();
            }
        }
        let Some(session) = watcher.snapshot() else {
            break;
        };
        print_new_steps(&session, &mut printed_steps);

        match session.status {
            SessionStatus::Idle | SessionStatus::Running => {}
            SessionStatus::NeedsUserInput => {
                if session.pending_answer.is_some() {
                    continue;
                }
                let prompt = session
                    .question_to_user
                    .as_deref()
                    .unwrap_or("The agent needs more information");
                println!("\n? {prompt}");
                match stdin.next_line().await? {
                    Some(line) if !line.trim().is_empty() => {
                        runner.answer(line.trim())?;
                    }
                    _ => {
                        runner.cancel();
                    }
                }
            }
            SessionStatus::Completed => {
                print_completion(&session);
                return Ok(ExitCode::SUCCESS);
            }
            SessionStatus::Error => {
                eprintln!(
                    "error: {}",
                    session.error.as_deref().unwrap_or("unknown error")
                );
                return Ok(ExitCode::FAILURE);
            }
            SessionStatus::Cancelled => {
                eprintln!("cancelled");
                return Ok(ExitCode::from(130));
            }
        }
    }
    Ok(ExitCode::FAILURE)
}

fn print_new_steps(session: &Session, printed: &mut usize) {
    *printed = (*printed).min(session.steps.len());
    for step in &session.steps[*printed..] {
        println!("── step {} ──", step.iteration);
        if !step.reasoning.is_empty() {
            println!("{}", step.reasoning);
        }
        if !step.tool_call.name.is_empty() {
            println!("→ {}", step.tool_call.name);
        }
        if !step.partial_sql.is_empty() {
            println!("  {}", step.partial_sql);
        }
    }
    *printed = session.steps.len();
}

fn print_completion(session: &Session) {
    if let Some(sql) = session.display_sql() {
        println!("\n{sql}");
    }
    for warning in &session.warnings {
        eprintln!("warning: {warning}");
    }
    if let Some(result) = &session.execution_result {
        print_result(result);
    }
}

fn print_result(result: &ResultSet) {
    println!();
    println!("{}", result.columns.join("\t"));
    for row in &result.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| match cell {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => "NULL".to_string(),
                other => other.to_string(),
            })
            .collect();
        println!("{}", cells.join("\t"));
    }
    println!(
        "({} rows, {:.1} ms)",
        result.row_count, result.execution_time_ms
    );
}

// ============================================================================
// Direct SQL
// ============================================================================

async fn run_sql(
    client: &AgentClient,
    settings: &Settings,
    sql: &str,
    format: bool,
    question: Option<String>,
) -> Result<ExitCode> {
    let dbms = settings.query_defaults.dbms.clone();

    if format {
        let mut request = FormatRequest::new(sql);
        request.question = question;
        request.dbms = dbms;
        let formatted = client.format_sql(&request).await?;
        if let Some(result) = &formatted.result {
            print_result(result);
        }
        if let Some(error) = formatted.error {
            eprintln!("error: {error}");
            return Ok(ExitCode::FAILURE);
        }
        println!("\n{}", formatted.formatted_text);
        return Ok(ExitCode::SUCCESS);
    }

    match client.execute_sql(sql, dbms.as_deref()).await? {
        SqlExecution::Succeeded(result) => {
            print_result(&result);
            Ok(ExitCode::SUCCESS)
        }
        SqlExecution::Failed { error } => {
            eprintln!("error: {error}");
            Ok(ExitCode::FAILURE)
        }
    }
}

// ============================================================================
// History
// ============================================================================

async fn browse_history(
    client: &AgentClient,
    settings: &Settings,
    search: Option<&str>,
    all: bool,
    delete: Option<String>,
    clear: bool,
) -> Result<ExitCode> {
    let mut list = HistoryList::new(settings.history_page_size);

    if clear {
        list.clear(client).await?;
        println!("history cleared");
        return Ok(ExitCode::SUCCESS);
    }
    if let Some(id) = delete {
        list.delete(client, &HistoryId::from(id.as_str())).await?;
        println!("deleted {id}");
        return Ok(ExitCode::SUCCESS);
    }

    let entries = if all {
        let stream = history::stream_all(client, settings.history_page_size);
        futures::pin_mut!(stream);
        let mut entries = Vec::new();
        while let Some(entry) = stream.next().await {
            entries.push(entry?);
        }
        entries
    } else {
        list.load_next(client).await?;
        list.entries().to_vec()
    };

    for entry in history::filter_entries(&entries, search.unwrap_or_default()) {
        let when = entry
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "{}\t{}\t{}\t{}",
            entry.id,
            when,
            entry.status.as_deref().unwrap_or("-"),
            entry.question
        );
    }
    Ok(ExitCode::SUCCESS)
}
