mod cli;
mod commands;
mod config;

use clap::Parser;
use cli::{Cli, Commands};
use sift_core::Disposition;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the host protocol; logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Init => commands::init::run(config),
        Commands::Status { session } => commands::status::run(config, session.as_deref()),
        Commands::Report => commands::report::run(),
        Commands::Version => commands::version::run(),
        Commands::Serve => commands::serve::run(config).await,
        Commands::HookMessagesTransform => commands::hooks::messages_transform(config),
        Commands::HookSystemTransform => commands::hooks::system_transform(config),
        Commands::ToolExtract => commands::tools::run(config, Disposition::Extracted),
        Commands::ToolDiscard => commands::tools::run(config, Disposition::Discarded),
    }
}
