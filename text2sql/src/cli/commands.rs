//! CLI command execution.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use crate::chat::{
    ChatEvent, ChatService, ChatSessionManager, Delivery, ManagerSnapshot, StubResponder,
};
use crate::config::AppConfig;
use crate::models::{Message, QueryResults};
use crate::server;

use super::args::{Cli, Commands};

// === Command Execution ===

pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve {
            port,
            open,
            backend_url,
            backend_key,
            receipt_dir,
            reply_delay_ms,
            processing_delay_ms,
        } => {
            let mut config = AppConfig::from_parts(port, backend_url, backend_key, receipt_dir)
                .context("Invalid server configuration")?;
            config.open_browser = open;
            config.reply_delay = Duration::from_millis(reply_delay_ms);
            config.processing_delay = Duration::from_millis(processing_delay_ms);
            server::start_server(config).await
        }
        Commands::Chat { reply_delay_ms } => run_chat(Duration::from_millis(reply_delay_ms)).await,
    }
}

// === Terminal Chat ===

/// One line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplInput {
    Send(String),
    New,
    Sessions,
    Switch(String),
    Help,
    Quit,
    Unknown(String),
}

impl ReplInput {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(command) = line.strip_prefix('/') else {
            return Self::Send(line.to_string());
        };
        let (name, arg) = command
            .split_once(char::is_whitespace)
            .map_or((command, ""), |(n, a)| (n, a.trim()));
        match name {
            "new" => Self::New,
            "sessions" | "ls" => Self::Sessions,
            "switch" if !arg.is_empty() => Self::Switch(arg.to_string()),
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// Resolve a list position (1-based), full id or unique id prefix.
fn resolve_session(snapshot: &ManagerSnapshot, arg: &str) -> Option<String> {
    if let Ok(n) = arg.parse::<usize>() {
        if let Some(session) = n.checked_sub(1).and_then(|i| snapshot.sessions.get(i)) {
            return Some(session.id.clone());
        }
    }
    if snapshot.sessions.iter().any(|s| s.id == arg) {
        return Some(arg.to_string());
    }
    let mut matches = snapshot.sessions.iter().filter(|s| s.id.starts_with(arg));
    match (matches.next(), matches.next()) {
        (Some(only), None) => Some(only.id.clone()),
        _ => None,
    }
}

fn format_results(results: &QueryResults) -> String {
    let widths: Vec<usize> = results
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            (0..results.data.len())
                .filter_map(|row| results.row_values(row))
                .map(|values| cell_text(values.get(i).copied()).chars().count())
                .fold(col.chars().count(), usize::max)
        })
        .collect();

    let mut lines = Vec::new();
    let header: Vec<String> = results
        .columns
        .iter()
        .zip(&widths)
        .map(|(col, &w)| format!("{col:<w$}"))
        .collect();
    lines.push(header.join("  "));
    lines.push("-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));
    for row in 0..results.data.len() {
        let values = results.row_values(row).unwrap_or_default();
        let cells: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, &w)| format!("{:<w$}", cell_text(values.get(i).copied())))
            .collect();
        lines.push(cells.join("  "));
    }
    lines.push(results.row_count_label());
    lines.join("\n")
}

fn cell_text(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn format_message(message: &Message) -> String {
    let mut out = format!("[{}]:\n{}", message.role.as_str().to_uppercase(), message.content);
    if let Some(sql) = &message.sql_code {
        out.push_str("\n\nSQL Query:\n");
        out.push_str(sql);
    }
    if let Some(results) = &message.results {
        out.push_str("\n\n");
        out.push_str(&format_results(results));
    }
    out
}

fn print_sessions(snapshot: &ManagerSnapshot) {
    if snapshot.sessions.is_empty() {
        println!("No saved chats.");
        return;
    }

    println!("{:<4} {:<38} {:<34} {:<8}", "#", "ID", "TITLE", "MESSAGES");
    println!("{}", "-".repeat(86));
    for (i, session) in snapshot.sessions.iter().enumerate() {
        let marker = if snapshot.active_session_id.as_deref() == Some(session.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{:<4} {:<38} {:<34} {:<8}",
            format!("{}{marker}", i + 1),
            session.id,
            session.title,
            session.message_count,
        );
    }
}

fn print_transcript(snapshot: &ManagerSnapshot) {
    for message in &snapshot.active_messages {
        println!("{}\n", format_message(message));
    }
}

async fn print_events(mut events: broadcast::Receiver<ChatEvent>) {
    loop {
        match events.recv().await {
            Ok(ChatEvent::Reply {
                session_id,
                delivery,
                message,
            }) => match delivery {
                Delivery::Active => println!("\n{}\n", format_message(&message)),
                Delivery::Rerouted => println!("\n(reply saved to chat {session_id})\n"),
                Delivery::Discarded => {}
            },
            Ok(ChatEvent::Updated { .. }) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_help() {
    println!("Type a question to send it. Commands:");
    println!("  /new             Save this chat and start a new one");
    println!("  /sessions        List saved chats");
    println!("  /switch <N|ID>   Open a saved chat");
    println!("  /quit            Exit");
}

async fn run_chat(reply_delay: Duration) -> Result<()> {
    let service = ChatService::new(
        ChatSessionManager::new(),
        Arc::new(StubResponder::new(reply_delay)),
    );
    let printer = tokio::spawn(print_events(service.subscribe()));

    println!("Text2SQL.ai - SQL Assistant");
    print_help();
    println!();
    print_sessions(&service.snapshot().await);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        match ReplInput::parse(&line) {
            ReplInput::Send(text) => {
                service.send(&text).await;
            }
            ReplInput::New => {
                service.new_chat().await;
                println!("Started a new chat.");
            }
            ReplInput::Sessions => print_sessions(&service.snapshot().await),
            ReplInput::Switch(arg) => {
                let snapshot = service.snapshot().await;
                match resolve_session(&snapshot, &arg) {
                    Some(id) => {
                        if let Some(snapshot) = service.switch_session(&id).await {
                            print_transcript(&snapshot);
                        }
                    }
                    None => println!("No chat matches '{arg}'."),
                }
            }
            ReplInput::Help => print_help(),
            ReplInput::Quit => break,
            ReplInput::Unknown(input) => println!("Unknown command: {input} (try /help)"),
        }
    }

    printer.abort();
    Ok(())
}
