//! Elimination of branches whose outcome is decided at parse time.

use crate::constant::remove_statement;
use crate::{PassContext, Result, Transform};
use alembic_core::ast::{Node, UnaryOp};
use alembic_core::{Ast, NodeId};

/// Folds `if` statements and conditional expressions over literal tests down
/// to the branch that runs, and rewrites the `cond ? true : false` family
/// back to plain boolean expressions. Obfuscators hide unreachable decoy
/// code behind exactly these shapes.
pub struct DeadBranchRemover;

impl Transform for DeadBranchRemover {
    fn name(&self) -> &'static str {
        "DeadBranchRemover"
    }

    fn apply(&self, ast: &mut Ast, _cx: &PassContext) -> Result<bool> {
        let mut changed = false;
        for node in ast.preorder(ast.root()) {
            match ast.node(node) {
                Node::If {
                    test,
                    consequent,
                    alternate,
                } => {
                    let (test, consequent, alternate) = (*test, *consequent, *alternate);
                    if !is_semi_literal(ast, test) {
                        continue;
                    }
                    let kept = if is_truthy(ast, test) {
                        Some(consequent)
                    } else {
                        alternate
                    };
                    keep_branch(ast, node, kept);
                    changed = true;
                }
                Node::Conditional {
                    test,
                    consequent,
                    alternate,
                } => {
                    let (test, consequent, alternate) = (*test, *consequent, *alternate);
                    if is_semi_literal(ast, test) {
                        let branch = if is_truthy(ast, test) {
                            consequent
                        } else {
                            alternate
                        };
                        ast.replace_with_child(node, branch);
                        changed = true;
                    } else if let (
                        Node::BooleanLiteral { value: when_true },
                        Node::BooleanLiteral { value: when_false },
                    ) = (ast.node(consequent), ast.node(alternate))
                    {
                        let (when_true, when_false) = (*when_true, *when_false);
                        rewrite_boolean_pair(ast, node, test, when_true, when_false);
                        changed = true;
                    }
                }
                _ => {}
            }
        }
        Ok(changed)
    }
}

/// Literals whose truthiness the pass may judge without running anything.
/// Array and object literals qualify: as values they are always truthy.
fn is_semi_literal(ast: &Ast, node: NodeId) -> bool {
    matches!(
        ast.node(node),
        Node::StringLiteral { .. }
            | Node::NumberLiteral { .. }
            | Node::BooleanLiteral { .. }
            | Node::NullLiteral
            | Node::RegexLiteral { .. }
            | Node::TemplateLiteral { .. }
            | Node::ArrayLiteral { .. }
            | Node::ObjectLiteral { .. }
    )
}

/// Truthiness of a semi-literal. Only the three value-carrying kinds can be
/// falsy; everything else counts as truthy, `null` included.
fn is_truthy(ast: &Ast, literal: NodeId) -> bool {
    match ast.node(literal) {
        Node::BooleanLiteral { value } => *value,
        Node::NumberLiteral { value } => *value != 0.0 && !value.is_nan(),
        Node::StringLiteral { value, .. } => !value.is_empty(),
        _ => true,
    }
}

/// Substitutes an `if` statement with the surviving branch, splicing block
/// bodies into the surrounding statement list. A missing branch deletes the
/// statement outright.
fn keep_branch(ast: &mut Ast, if_stmt: NodeId, branch: Option<NodeId>) {
    let Some(branch) = branch else {
        remove_statement(ast, if_stmt);
        return;
    };
    let statements = match ast.node(branch) {
        Node::Block { body } => body.clone(),
        _ => vec![branch],
    };
    if let Some((container, index)) = ast.statement_position(if_stmt) {
        ast.remove_from_parent(if_stmt);
        ast.insert_statements(container, index, &statements);
    } else if let [single] = statements[..] {
        ast.replace_with_child(if_stmt, single);
    } else {
        // Fixed slot, e.g. the body of a brace-less outer `if`.
        let block = ast.add(Node::Block { body: statements });
        ast.replace_with_child(if_stmt, block);
    }
}

fn rewrite_boolean_pair(
    ast: &mut Ast,
    conditional: NodeId,
    test: NodeId,
    when_true: bool,
    when_false: bool,
) {
    let replacement = match (when_true, when_false) {
        (true, false) => {
            let inner = ast.add(Node::Unary {
                op: UnaryOp::Not,
                argument: test,
            });
            ast.add(Node::Unary {
                op: UnaryOp::Not,
                argument: inner,
            })
        }
        (false, true) => ast.add(Node::Unary {
            op: UnaryOp::Not,
            argument: test,
        }),
        // Both sides agree: keep the test for its side effects.
        (value, _) => {
            let literal = ast.add(Node::BooleanLiteral { value });
            ast.add(Node::Sequence {
                expressions: vec![test, literal],
            })
        }
    };
    ast.replace_with_child(conditional, replacement);
}
