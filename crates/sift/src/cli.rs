use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sift")]
#[command(version)]
#[command(about = "Context pruning, sub-agents and terminals for OpenCode")]
pub struct Cli {
    /// Path to sift.json (defaults to the host config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default sift.json if none exists
    Init,

    /// Show override and index counts for a conversation
    Status {
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Summarise pruning telemetry
    Report,

    /// Print version information
    Version,

    /// Long-lived JSON-lines dispatcher for the plugin shim
    Serve,

    /// Hook: prune the event log (stdin/stdout JSON)
    #[command(name = "hook:messages-transform")]
    HookMessagesTransform,

    /// Hook: append the history map to the system prompt
    #[command(name = "hook:system-transform")]
    HookSystemTransform,

    /// Tool: replace tool outputs with a summary
    #[command(name = "tool:extract")]
    ToolExtract,

    /// Tool: discard tool outputs
    #[command(name = "tool:discard")]
    ToolDiscard,
}
