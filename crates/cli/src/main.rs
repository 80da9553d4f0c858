use alembic_cli::commands::{Cmd, Command};
use clap::Parser;

/// Alembic CLI
///
/// Alembic is a JavaScript deobfuscator that unwinds common obfuscator
/// output: flattened control flow, encoded string pools, proxy functions,
/// dead branches, and the tamper guards wired around them
#[derive(Parser)]
#[command(name = "alembic")]
#[command(about = "Alembic: JavaScript deobfuscator")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

/// Runs the Alembic CLI with the provided arguments.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.command.silent() {
        tracing::Level::ERROR
    } else {
        tracing::Level::DEBUG
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .without_time()
        .init();

    cli.command.execute()
}
