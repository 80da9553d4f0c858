//! Constant folding over unary and binary operators.

use crate::evaluator;
use crate::{PassContext, Result, Transform};
use alembic_core::ast::{BinaryOp, Node, UnaryOp};
use alembic_core::Ast;

/// Folds operator trees over literals down to their value, following the
/// fiction JavaScript itself would apply: string coercion, NaN arithmetic,
/// 32-bit shifts. Obfuscated sources hide every interesting constant behind
/// arithmetic on string pool indices, so this runs on nearly every
/// iteration.
///
/// `-<number>` stays untouched. Folding it would rebuild the same node and
/// the fixpoint loop would never settle.
pub struct ExpressionSimplifier;

impl Transform for ExpressionSimplifier {
    fn name(&self) -> &'static str {
        "ExpressionSimplifier"
    }

    fn invalidates_bindings(&self) -> bool {
        false
    }

    fn apply(&self, ast: &mut Ast, _cx: &PassContext) -> Result<bool> {
        let mut changed = false;
        for node in ast.preorder(ast.root()) {
            match ast.node(node) {
                Node::Unary { op, argument } => {
                    let argument = *argument;
                    if *op == UnaryOp::Minus
                        && matches!(ast.node(argument), Node::NumberLiteral { .. })
                    {
                        continue;
                    }
                }
                Node::Binary { .. } => {}
                _ => continue,
            }

            if let Some(value) = evaluator::resolve(ast, node) {
                if let Some(replacement) = evaluator::value_to_node(ast, &value) {
                    ast.replace_with_child(node, replacement);
                    changed = true;
                    continue;
                }
            }

            // `a - -b` reads better as `a + b` even when `a` stays opaque.
            let rewrite = match ast.node(node) {
                Node::Binary {
                    op: BinaryOp::Sub,
                    right,
                    ..
                } => match ast.node(*right) {
                    Node::Unary {
                        op: UnaryOp::Minus,
                        argument,
                    } if matches!(ast.node(*argument), Node::NumberLiteral { .. }) => {
                        Some(*argument)
                    }
                    _ => None,
                },
                _ => None,
            };
            if let Some(positive) = rewrite {
                if let Node::Binary { op, right, .. } = ast.node_mut(node) {
                    *op = BinaryOp::Add;
                    *right = positive;
                }
                ast.adopt(positive, node);
                changed = true;
            }
        }
        Ok(changed)
    }
}
