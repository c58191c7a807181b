//! Text2SQL - a chat front-end that turns plain-English questions into SQL.
//!
//! The web app serves a landing page, sign-in, a sales contact form, the
//! chat assistant and a mock Pro upgrade. The same chat session manager also
//! backs an interactive terminal chat.
//!
//! Architecture:
//! - `chat` owns the session manager state machine and the async reply path
//! - `backend` talks to the hosted auth/row store service (or an in-memory one)
//! - `server` renders pages and exposes the JSON API and WebSocket feed

mod backend;
mod chat;
mod cli;
mod config;
mod contact;
mod logging;
mod models;
mod notify;
mod server;
mod upgrade;

use anyhow::Result;
use clap::Parser;

use cli::{execute, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_format);
    execute(cli).await
}
