use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "marten", about = "Drive and inspect a marten keymap from the terminal")]
pub struct Cli {
    /// Keymap config file (RON). A built-in demo map is used when omitted.
    #[arg(long, env = "MARTEN_KEYMAP")]
    pub keymap: Option<PathBuf>,

    /// Log file path override.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Read key notation from stdin and dispatch it (the default).
    Repl,

    /// Load and resolve a keymap, then print its modes and bindings.
    Check,
}
