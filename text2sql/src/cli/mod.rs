//! Command-line entry points: `serve` and the terminal `chat`.

mod args;
mod commands;

pub use args::Cli;
pub use commands::execute;
