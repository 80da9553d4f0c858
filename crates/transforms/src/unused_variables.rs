//! Removal of bindings nothing reads.

use crate::{PassContext, Result, Transform};
use alembic_core::ast::Node;
use alembic_core::scope::{BindingId, BindingKind};
use alembic_core::{Ast, NodeId};
use tracing::debug;

/// Deletes bindings with zero reads and zero writes, declaration and
/// initializer included. Obfuscators leave a trail of these behind every
/// indirection layer the other passes collapse.
///
/// Top-level `var` and function bindings stay: a script's hoisted names are
/// reachable from outside the file. Catch parameters and named function
/// expression self-bindings stay because their slots are not removable.
/// Initializer side effects are discarded with the declaration, a trade-off
/// this pass makes deliberately for the corpus it targets.
pub struct UnusedVariableRemover;

impl Transform for UnusedVariableRemover {
    fn name(&self) -> &'static str {
        "UnusedVariableRemover"
    }

    fn apply(&self, ast: &mut Ast, cx: &PassContext) -> Result<bool> {
        let mut changed = false;
        let doomed: Vec<BindingId> = cx
            .scopes
            .bindings()
            .filter(|(_, binding)| {
                binding.references.is_empty()
                    && binding.violations.is_empty()
                    && !matches!(
                        binding.kind,
                        BindingKind::CatchParam | BindingKind::FunctionExprName
                    )
                    && !(cx.scopes.is_program_scope(binding.scope)
                        && matches!(binding.kind, BindingKind::Var | BindingKind::Function))
            })
            .map(|(id, _)| id)
            .collect();

        for id in doomed {
            let binding = cx.scopes.binding(id);
            // An earlier removal may have taken this declaration with it.
            if !ast.is_within(binding.declaration, ast.root()) {
                continue;
            }
            debug!(name = %binding.name, "removing unused binding");
            match binding.kind {
                BindingKind::Param => {
                    ast.remove_from_parent(binding.declaration);
                }
                BindingKind::Function => {
                    remove_statement_or_hollow(ast, binding.declaration);
                }
                _ => {
                    remove_declarator_or_hollow(ast, binding.declaration);
                }
            }
            changed = true;
        }
        Ok(changed)
    }
}

/// Drops a declarator; when it was the only one, the whole declaration goes
/// with it.
fn remove_declarator_or_hollow(ast: &mut Ast, declarator: NodeId) {
    let Some(declaration) = ast.parent(declarator) else {
        return;
    };
    ast.remove_from_parent(declarator);
    let emptied = matches!(
        ast.node(declaration),
        Node::VariableDeclaration { declarations, .. } if declarations.is_empty()
    );
    if emptied {
        remove_statement_or_hollow(ast, declaration);
    }
}

/// Removes a statement from its list, or, when it is a branch or loop body
/// in a fixed slot, swaps in an empty block so the control-flow shape
/// survives.
fn remove_statement_or_hollow(ast: &mut Ast, stmt: NodeId) {
    if ast.remove_from_parent(stmt) {
        return;
    }
    if let Some(parent) = ast.parent(stmt) {
        if let Node::For { init, .. } = ast.node_mut(parent) {
            if *init == Some(stmt) {
                *init = None;
                return;
            }
        }
    }
    ast.replace(stmt, Node::Block { body: Vec::new() });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use alembic_core::parser::parse;
    use alembic_core::printer::print;
    use alembic_core::ScopeIndex;

    fn run(source: &str) -> (bool, String) {
        let mut ast = parse(source).unwrap();
        let scopes = ScopeIndex::build(&ast);
        let config = Config::default();
        let cx = PassContext {
            scopes: &scopes,
            config: &config,
        };
        let changed = UnusedVariableRemover.apply(&mut ast, &cx).unwrap();
        (changed, print(&ast))
    }

    fn reprint(source: &str) -> String {
        print(&parse(source).unwrap())
    }

    #[test]
    fn dead_local_goes_with_its_initializer() {
        let (changed, out) = run("function f() { var unused = compute(); keep(); } f();");
        assert!(changed);
        assert_eq!(out, reprint("function f() { keep(); } f();"));
    }

    #[test]
    fn top_level_hoisted_names_survive() {
        let (changed, out) = run("var unused = 1; function g() {}");
        assert!(!changed);
        assert_eq!(out, reprint("var unused = 1; function g() {}"));
    }

    #[test]
    fn top_level_lexicals_do_not() {
        let (changed, out) = run("let unused = 1; keep();");
        assert!(changed);
        assert_eq!(out, reprint("keep();"));
    }

    #[test]
    fn unused_parameter_leaves_the_list() {
        let (changed, out) = run("function f(a, unused) { return a; } f(1, 2);");
        assert!(changed);
        assert_eq!(out, reprint("function f(a) { return a; } f(1, 2);"));
    }

    #[test]
    fn catch_binding_is_untouchable() {
        let (changed, _) = run("try { f(); } catch (e) {}");
        assert!(!changed);
    }

    #[test]
    fn multi_declarator_statement_loses_only_the_dead_one() {
        let (changed, out) = run("function f() { var a = 1, unused = 2; return a; } f();");
        assert!(changed);
        assert_eq!(out, reprint("function f() { var a = 1; return a; } f();"));
    }

    #[test]
    fn dead_branch_body_becomes_an_empty_block() {
        let (changed, out) = run("function f() { if (c) var unused = 1; g(); } f();");
        assert!(changed);
        assert_eq!(out, reprint("function f() { if (c) {} g(); } f();"));
    }
}
