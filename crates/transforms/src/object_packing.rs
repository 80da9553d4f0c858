//! Repacking of member-assignment sequences into object literals.

use crate::constant::find_constant_variable;
use crate::{PassContext, Result, Transform};
use alembic_core::ast::{AssignOp, Node};
use alembic_core::matcher;
use alembic_core::{Ast, NodeId};
use tracing::debug;

/// Rebuilds `var o = {}; o.a = 1; o.b = 2;` into `var o = {a: 1, b: 2}`.
/// Obfuscators split proxy objects this way so the literal never appears
/// whole in the source. Packing it back together is what lets the object
/// passes see the full picture.
///
/// The scan walks forward from the declaration and stops at the first
/// statement that is not a property assignment on the object, at a chained
/// assignment whose final value is not a literal, or at a value that
/// mentions the object itself.
pub struct ObjectPacker;

impl Transform for ObjectPacker {
    fn name(&self) -> &'static str {
        "ObjectPacker"
    }

    fn invalidates_bindings(&self) -> bool {
        false
    }

    fn apply(&self, ast: &mut Ast, cx: &PassContext) -> Result<bool> {
        let mut changed = false;
        for node in ast.preorder(ast.root()) {
            let Some(variable) = find_constant_variable(ast, cx.scopes, node, false, |a, n| {
                matches!(a.node(n), Node::ObjectLiteral { properties } if properties.is_empty())
            }) else {
                continue;
            };
            let Some(statement) = ast.statement_parent(variable.path) else {
                continue;
            };
            let Some((container, index)) = ast.statement_position(statement) else {
                continue;
            };
            let siblings: Vec<NodeId> = match ast.statement_list(container) {
                Some(list) => list[index + 1..].to_vec(),
                None => continue,
            };

            let mut consumed: Vec<NodeId> = Vec::new();
            'scan: for sibling in siblings {
                let Node::ExpressionStatement { expression } = ast.node(sibling) else {
                    break;
                };
                let expression = *expression;
                let Some((member, value)) = property_assignment(ast, expression, &variable.name)
                else {
                    break;
                };

                if property_assignment(ast, value, &variable.name).is_some() {
                    // A chain like `o.a = o.b = x` yields one property per
                    // link, each holding its own copy of the final value.
                    let mut members = vec![member];
                    let mut tail = value;
                    while let Some((m, rest)) = property_assignment(ast, tail, &variable.name) {
                        members.push(m);
                        tail = rest;
                    }
                    if !matcher::is_literal(ast, tail) {
                        break 'scan;
                    }
                    for member in members {
                        let value = ast.deep_clone(tail);
                        push_property(ast, variable.expression, member, value);
                    }
                } else {
                    if mentions(ast, value, &variable.name) {
                        break 'scan;
                    }
                    push_property(ast, variable.expression, member, value);
                }
                consumed.push(sibling);
            }

            if !consumed.is_empty() {
                debug!(name = %variable.name, properties = consumed.len(), "packed object");
                for statement in consumed {
                    ast.remove_from_parent(statement);
                }
                changed = true;
            }
        }
        Ok(changed)
    }
}

/// Matches `name.key = value` (with any member spelling on the left) and
/// returns the member and the assigned value.
fn property_assignment(ast: &Ast, node: NodeId, name: &str) -> Option<(NodeId, NodeId)> {
    let Node::Assignment {
        op: AssignOp::Assign,
        left,
        right,
    } = ast.node(node)
    else {
        return None;
    };
    let Node::Member { object, .. } = ast.node(*left) else {
        return None;
    };
    if !matcher::is_identifier_named(ast, *object, name) {
        return None;
    }
    Some((*left, *right))
}

/// Whether any identifier in the subtree carries `name`.
fn mentions(ast: &Ast, subtree: NodeId, name: &str) -> bool {
    ast.preorder(subtree)
        .into_iter()
        .any(|n| matcher::is_identifier_named(ast, n, name))
}

/// Appends a property built from a consumed member assignment. Literal keys
/// lose the computed spelling; anything else keeps it.
fn push_property(ast: &mut Ast, object: NodeId, member: NodeId, value: NodeId) {
    let Node::Member {
        property, computed, ..
    } = ast.node(member)
    else {
        return;
    };
    let (key, computed) = (*property, *computed);
    let computed = computed
        && !matches!(
            ast.node(key),
            Node::StringLiteral { .. } | Node::NumberLiteral { .. }
        );
    let property = ast.add(Node::Property {
        key,
        value,
        computed,
        shorthand: false,
    });
    if let Node::ObjectLiteral { properties } = ast.node_mut(object) {
        properties.push(property);
    }
    ast.adopt(property, object);
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
        let changed = ObjectPacker.apply(&mut ast, &cx).unwrap();
        (changed, print(&ast))
    }

    fn reprint(source: &str) -> String {
        print(&parse(source).unwrap())
    }

    #[test]
    fn consecutive_assignments_fold_into_the_literal() {
        let (changed, out) = run("var o = {}; o.a = 1; o['b'] = 2; use(o);");
        assert!(changed);
        assert_eq!(out, reprint("var o = {a: 1, 'b': 2}; use(o);"));
    }

    #[test]
    fn scan_stops_at_the_first_unrelated_statement() {
        let (changed, out) = run("var o = {}; o.a = 1; f(); o.b = 2; use(o);");
        assert!(changed);
        assert_eq!(out, reprint("var o = {a: 1}; f(); o.b = 2; use(o);"));
    }

    #[test]
    fn chained_assignment_consumes_one_statement() {
        let (changed, out) = run("var o = {}; o.a = o.b = 5; use(o);");
        assert!(changed);
        assert_eq!(out, reprint("var o = {a: 5, b: 5}; use(o);"));
    }

    #[test]
    fn chain_with_effectful_tail_is_left_alone() {
        let source = "var o = {}; o.a = o.b = f(); use(o);";
        let (changed, out) = run(source);
        assert!(!changed);
        assert_eq!(out, reprint(source));
    }

    #[test]
    fn self_referencing_value_is_left_alone() {
        let source = "var o = {}; o.a = o; use(o);";
        let (changed, out) = run(source);
        assert!(!changed);
        assert_eq!(out, reprint(source));
    }

    #[test]
    fn dynamic_keys_stay_computed() {
        let (changed, out) = run("var o = {}; o[k] = 1; use(o);");
        assert!(changed);
        assert_eq!(out, reprint("var o = {[k]: 1}; use(o);"));
    }

    #[test]
    fn reassigned_object_is_not_a_candidate() {
        let source = "var o = {}; o = other; o.a = 1;";
        let (changed, out) = run(source);
        assert!(!changed);
        assert_eq!(out, reprint(source));
    }

    #[test]
    fn declare_then_assign_object_packs_after_the_assignment() {
        let (changed, out) = run("var o; o = {}; o.a = 1; use(o);");
        assert!(changed);
        assert_eq!(out, reprint("var o; o = {a: 1}; use(o);"));
    }
}
