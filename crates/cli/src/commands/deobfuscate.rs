//! Module for the `deobfuscate` subcommand, which runs the full pass
//! pipeline over a script file.
//!
//! The input is parsed once, driven to a fixed point by `alembic-transform`,
//! and reprinted to the output path. Pass switches come from an optional
//! JSON config file; absent keys keep their defaults.

use crate::commands::DeobfuscateError;
use alembic_core::{parser, printer};
use alembic_transform::{Config, Deobfuscator, RunSummary};
use clap::Args;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

/// Arguments for the `deobfuscate` subcommand.
#[derive(Args)]
pub struct DeobfuscateArgs {
    /// Path to the obfuscated script.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
    /// Path to write the cleaned script to.
    #[arg(short, long, default_value = "deobfuscated.js")]
    pub output: PathBuf,
    /// Path to a JSON config enabling or disabling individual passes.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Suppress everything except errors.
    #[arg(short, long)]
    pub silent: bool,
}

/// Executes the `deobfuscate` subcommand.
impl super::Command for DeobfuscateArgs {
    fn execute(self) -> Result<(), Box<dyn Error>> {
        let DeobfuscateArgs {
            input,
            output,
            config,
            silent,
        } = self;

        let source = fs::read_to_string(&input)?;
        let config = load_config(config.as_deref())?;

        let mut ast = parser::parse(&source)?;
        let summary = Deobfuscator::new().run(&mut ast, &config)?;
        fs::write(&output, printer::print(&ast))?;

        if !silent {
            print_summary(&summary);
            println!("Wrote deobfuscated output to {}", output.display());
        }

        Ok(())
    }
}

/// Loads the pass configuration, or the defaults when no file is given.
fn load_config(path: Option<&Path>) -> Result<Config, DeobfuscateError> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(Config::default()),
    }
}

/// Prints how the run went: iterations consumed and which passes did work.
fn print_summary(summary: &RunSummary) {
    println!("Settled after {} iteration(s)", summary.iterations);
    for pass in summary.passes.iter().filter(|pass| pass.changes > 0) {
        println!("  {}: {} change(s)", pass.name, pass.changes);
    }
}
