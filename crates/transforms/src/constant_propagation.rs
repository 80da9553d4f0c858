//! Propagation of literal-valued variables into their use sites.

use crate::constant::{find_constant_variable, ConstantForm};
use crate::{PassContext, Result, Transform};
use alembic_core::ast::Node;
use alembic_core::matcher;
use alembic_core::scope::BindingKind;
use alembic_core::Ast;
use tracing::debug;

/// Replaces every read of a single-assignment literal variable with the
/// literal itself, then deletes the variable. Obfuscated bundles route
/// nearly every string and number through a throwaway name, so this pass
/// feeds most of the others.
///
/// Regular expression literals stay put: two reads of the same regex object
/// share lastIndex, copies would not.
pub struct ConstantPropagator;

impl Transform for ConstantPropagator {
    fn name(&self) -> &'static str {
        "ConstantPropagator"
    }

    fn apply(&self, ast: &mut Ast, cx: &PassContext) -> Result<bool> {
        let mut changed = false;
        for node in ast.preorder(ast.root()) {
            if !ast.is_within(node, ast.root()) {
                continue;
            }
            let Some(variable) =
                find_constant_variable(ast, cx.scopes, node, false, matcher::is_literal)
            else {
                continue;
            };
            // An assigned parameter only collapses inside a function
            // declaration: the assignment-position check needs the function
            // itself to anchor a statement.
            if variable.form == ConstantForm::Assignment {
                let binding = cx.scopes.binding(variable.binding);
                if binding.kind == BindingKind::Param {
                    let owner = cx.scopes.scope(binding.scope).owner;
                    if !matches!(ast.node(owner), Node::FunctionDeclaration { .. }) {
                        continue;
                    }
                }
            }

            let references = cx.scopes.binding(variable.binding).references.clone();
            debug!(name = %variable.name, references = references.len(), "propagating constant");
            for reference in references {
                if !ast.is_within(reference, ast.root()) {
                    continue;
                }
                let clone = ast.deep_clone(variable.expression);
                ast.replace_with_child(reference, clone);
                changed = true;
            }
            variable.remove(ast, cx.scopes);
        }
        Ok(changed)
    }
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
        let changed = ConstantPropagator.apply(&mut ast, &cx).unwrap();
        (changed, print(&ast))
    }

    fn reprint(source: &str) -> String {
        print(&parse(source).unwrap())
    }

    #[test]
    fn declarator_value_reaches_every_read() {
        let (changed, out) = run("var s = 'hi'; f(s, s);");
        assert!(changed);
        assert_eq!(out, reprint("f('hi', 'hi');"));
    }

    #[test]
    fn declare_then_assign_collapses() {
        let (changed, out) = run("function g() { var a; a = 2; return a; } g();");
        assert!(changed);
        assert_eq!(out, reprint("function g() { return 2; } g();"));
    }

    #[test]
    fn parameter_overwritten_at_top_of_body() {
        let (changed, out) = run("function g(p) { p = 1; return p; } g(5);");
        assert!(changed);
        assert_eq!(out, reprint("function g() { return 1; } g(5);"));
    }

    #[test]
    fn parameter_assigned_inside_a_branch_stays() {
        let (changed, out) = run("function g(p) { if (c) { p = 1; } return p; } g(5);");
        assert!(!changed);
        assert_eq!(out, reprint("function g(p) { if (c) { p = 1; } return p; } g(5);"));
    }

    #[test]
    fn function_expression_parameter_stays() {
        let (changed, _) = run("var g = function (p) { p = 1; return p; }; g(5);");
        assert!(!changed);
    }

    #[test]
    fn regex_literals_are_not_copied() {
        let (changed, out) = run("var r = /ab/g; f(r); f(r);");
        assert!(!changed);
        assert_eq!(out, reprint("var r = /ab/g; f(r); f(r);"));
    }

    #[test]
    fn unread_constant_is_removed_without_reporting_change() {
        let (changed, out) = run("var a = 1;");
        assert!(!changed);
        assert_eq!(out, "");
    }

    #[test]
    fn winning_redeclaration_propagates() {
        let (changed, out) = run("var a = 1; var a = 2; f(a);");
        assert!(changed);
        assert_eq!(out, reprint("var a = 1; f(2);"));
    }
}
