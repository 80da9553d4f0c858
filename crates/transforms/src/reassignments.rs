//! Collapse of variables that merely rename another variable.

use crate::constant::find_constant_variable;
use crate::{PassContext, Result, Transform};
use alembic_core::ast::Node;
use alembic_core::scope::BindingKind;
use alembic_core::{Ast, NodeId, ScopeIndex};
use tracing::debug;

/// Rewrites reads of `var a = b;` style aliases to use `b` directly and
/// drops the alias. String pool wrappers get re-exported under a fresh name
/// in every scope that touches them, and those chains have to unwind before
/// the pool itself is visible.
///
/// The alias only collapses when the aliased name itself cannot have moved:
/// an unresolved global, a binding nothing writes to, or a function whose
/// only writes sit inside its own body. That last shape is the memoizing
/// pool loader, which overwrites itself on first call.
pub struct ReassignmentRemover;

impl Transform for ReassignmentRemover {
    fn name(&self) -> &'static str {
        "ReassignmentRemover"
    }

    fn apply(&self, ast: &mut Ast, cx: &PassContext) -> Result<bool> {
        let mut changed = false;
        for node in ast.preorder(ast.root()) {
            if !ast.is_within(node, ast.root()) {
                continue;
            }
            let Some(variable) = find_constant_variable(ast, cx.scopes, node, false, |a, n| {
                matches!(a.node(n), Node::Identifier { .. })
            }) else {
                continue;
            };
            let Node::Identifier { name: target } = ast.node(variable.expression) else {
                continue;
            };
            let target = target.clone();
            if target == variable.name {
                continue;
            }
            if !target_is_stable(ast, cx.scopes, variable.expression, &target) {
                continue;
            }

            let references = cx.scopes.binding(variable.binding).references.clone();
            debug!(alias = %variable.name, target = %target, "collapsing alias");
            for reference in references {
                if !ast.is_within(reference, ast.root()) {
                    continue;
                }
                ast.replace(
                    reference,
                    Node::Identifier {
                        name: target.clone(),
                    },
                );
                changed = true;
            }
            variable.remove(ast, cx.scopes);
        }
        Ok(changed)
    }
}

/// Whether reads of `name` give the same value at every reference site the
/// alias covers. Unresolved names are globals and carry no tracked writes.
fn target_is_stable(ast: &Ast, scopes: &ScopeIndex, site: NodeId, name: &str) -> bool {
    let Some(binding) = scopes.resolve_at(ast, site, name) else {
        return true;
    };
    let b = scopes.binding(binding);
    if b.violations.is_empty() {
        return true;
    }
    matches!(b.kind, BindingKind::Function | BindingKind::FunctionExprName)
        && b.violations.iter().all(|&v| ast.is_within(v, b.declaration))
}
