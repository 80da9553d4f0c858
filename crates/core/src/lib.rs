pub mod ast;
pub mod lexer;
pub mod matcher;
pub mod parser;
pub mod printer;
pub mod result;
pub mod scope;

pub use ast::{Ast, Node, NodeId};
pub use result::{Error, Result};
pub use scope::ScopeIndex;

/// High-level convenience function to parse source text into a tree.
///
/// Thin wrapper over [`parser::parse`]; exists so callers that only need the
/// parse/print round trip don't reach into submodules.
///
/// # Arguments
/// * `source` - JavaScript source text
///
/// # Returns
/// The parsed tree, or a lex/syntax error naming the offending line.
pub fn parse_source(source: &str) -> Result<Ast> {
    parser::parse(source)
}

/// Renders a tree back to source text.
///
/// Output is deterministic for a given tree; see [`printer::print`] for the
/// formatting rules.
pub fn print_source(ast: &Ast) -> String {
    printer::print(ast)
}
