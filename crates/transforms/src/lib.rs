pub mod anti_tamper;
pub mod config;
pub mod constant;
pub mod constant_propagation;
pub mod control_flow;
pub mod dead_branches;
pub mod deobfuscator;
pub mod evaluator;
pub mod expressions;
pub mod object_packing;
pub mod objects;
pub mod properties;
pub mod proxy_functions;
pub mod reassignments;
pub mod sequences;
pub mod strings;
pub mod unused_variables;

use alembic_core::{Ast, ScopeIndex};
use thiserror::Error;

pub use config::Config;
pub use deobfuscator::{deobfuscate, Deobfuscator, PassReport, RunSummary};

/// Transform error type encompassing all pass failures.
#[derive(Debug, Error)]
pub enum Error {
    /// Parsing or another core operation failed.
    #[error("core operation failed: {0}")]
    Core(#[from] alembic_core::Error),

    /// A rotation predicate used a shape the evaluator does not model.
    #[error("unsupported rotation expression: {0}")]
    RotationExpression(String),

    /// A string pool rotation never reached its stop value.
    #[error("string pool rotation failed to converge")]
    RotationBudget,
}

/// Transform result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Read-only context handed to every pass invocation.
pub struct PassContext<'a> {
    /// Binding index for the tree as of the last rebuild.
    pub scopes: &'a ScopeIndex,
    pub config: &'a Config,
}

/// A single rewrite pass over the syntax tree.
pub trait Transform: Send + Sync {
    /// Returns the pass name for logging and the run summary.
    fn name(&self) -> &'static str;
    /// Applies the pass, returning whether the tree changed.
    fn apply(&self, ast: &mut Ast, cx: &PassContext) -> Result<bool>;
    /// Whether this pass moves or removes bindings when it fires, forcing a
    /// scope rebuild before the next pass reads the index.
    fn invalidates_bindings(&self) -> bool {
        true
    }
}
