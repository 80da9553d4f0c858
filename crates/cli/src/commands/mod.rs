use clap::Subcommand;
use std::error::Error;

pub mod deobfuscate;

use thiserror::Error;

/// Errors raised by the subcommand helpers.
#[derive(Debug, Error)]
pub enum DeobfuscateError {
    /// File read/write error.
    #[error("file error: {0}")]
    File(#[from] std::io::Error),
    /// The config file is not valid JSON for the pass switches.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// CLI subcommands for alembic.
#[derive(Subcommand)]
pub enum Cmd {
    /// Rewrite an obfuscated script into readable form.
    Deobfuscate(deobfuscate::DeobfuscateArgs),
}

impl Cmd {
    /// Whether the selected subcommand asked for quiet output.
    pub fn silent(&self) -> bool {
        match self {
            Cmd::Deobfuscate(args) => args.silent,
        }
    }
}

/// Trait for executing CLI subcommands.
pub trait Command {
    /// Executes the subcommand.
    ///
    /// # Returns
    /// A `Result` indicating success or an error if execution fails.
    fn execute(self) -> Result<(), Box<dyn Error>>;
}

impl Command for Cmd {
    fn execute(self) -> Result<(), Box<dyn Error>> {
        match self {
            Cmd::Deobfuscate(args) => args.execute(),
        }
    }
}
