//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{LogFormat, DEFAULT_PORT};

/// Text2SQL - turn plain-English questions into SQL
#[derive(Parser, Debug)]
#[command(name = "text2sql")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log line format (filter with RUST_LOG)
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the web app
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "TEXT2SQL_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Open browser automatically
        #[arg(long)]
        open: bool,

        /// Hosted auth/storage service URL (in-memory backend when unset)
        #[arg(long, env = "TEXT2SQL_BACKEND_URL")]
        backend_url: Option<String>,

        /// Public API key for the hosted service
        #[arg(long, env = "TEXT2SQL_BACKEND_KEY", hide_env_values = true)]
        backend_key: Option<String>,

        /// Directory upgrade receipts are saved to (defaults to Downloads)
        #[arg(long, env = "TEXT2SQL_RECEIPT_DIR")]
        receipt_dir: Option<PathBuf>,

        /// Delay before the assistant replies, in milliseconds
        #[arg(long, default_value = "500")]
        reply_delay_ms: u64,

        /// Simulated payment processing time, in milliseconds
        #[arg(long, default_value = "2000")]
        processing_delay_ms: u64,
    },

    /// Chat with the SQL assistant in the terminal
    Chat {
        /// Delay before the assistant replies, in milliseconds
        #[arg(long, default_value = "500")]
        reply_delay_ms: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["text2sql", "serve"]).unwrap();
        match cli.command {
            Commands::Serve {
                port,
                open,
                reply_delay_ms,
                ..
            } => {
                assert_eq!(port, DEFAULT_PORT);
                assert!(!open);
                assert_eq!(reply_delay_ms, 500);
            }
            Commands::Chat { .. } => panic!("expected serve"),
        }
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn test_global_log_format() {
        let cli = Cli::try_parse_from(["text2sql", "chat", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
        assert!(matches!(cli.command, Commands::Chat { reply_delay_ms: 500 }));
    }
}
