//! Proxy object flattening.

use crate::constant::find_constant_variable;
use crate::proxy_functions::{get_replacement, is_proxy_function};
use crate::{PassContext, Result, Transform};
use alembic_core::ast::Node;
use alembic_core::matcher::{self, PropertyKey};
use alembic_core::{Ast, NodeId};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Resolves reads through proxy objects, the literal maps obfuscators
/// route every constant and operator through: `o.a` becomes the stored
/// literal and `o.f(x, y)` expands the stored proxy function. The object
/// itself stays behind until nothing reads it any more.
pub struct ObjectSimplifier;

struct ProxyObject {
    literals: FxHashMap<PropertyKey, NodeId>,
    proxies: FxHashMap<PropertyKey, NodeId>,
}

impl Transform for ObjectSimplifier {
    fn name(&self) -> &'static str {
        "ObjectSimplifier"
    }

    fn apply(&self, ast: &mut Ast, cx: &PassContext) -> Result<bool> {
        let order: FxHashMap<NodeId, usize> = ast
            .preorder(ast.root())
            .into_iter()
            .enumerate()
            .map(|(position, node)| (node, position))
            .collect();

        let mut objects: Vec<ProxyObject> = Vec::new();
        let mut usages: Vec<(NodeId, usize)> = Vec::new();
        for node in ast.preorder(ast.root()) {
            let Some(variable) = find_constant_variable(ast, cx.scopes, node, false, |a, n| {
                matches!(a.node(n), Node::ObjectLiteral { properties } if !properties.is_empty())
            }) else {
                continue;
            };
            let binding = cx.scopes.binding(variable.binding);
            if !cx.config.unsafe_object_replace
                && binding.references.iter().any(|&r| is_member_write(ast, r))
            {
                debug!(name = %variable.name, "object is written through, not replacing");
                continue;
            }
            let object = index_properties(ast, variable.expression);
            let slot = objects.len();
            objects.push(object);
            usages.extend(binding.references.iter().map(|&r| (r, slot)));
        }

        // Innermost reads first, so an expanded call copies arguments that
        // are already resolved.
        usages.sort_by_key(|&(reference, _)| {
            std::cmp::Reverse(order.get(&reference).copied().unwrap_or(0))
        });

        let mut changed = false;
        for (reference, slot) in usages {
            changed |= replace_usage(ast, reference, &objects[slot]);
        }
        Ok(changed)
    }
}

/// Whether a reference sits under a member that is assigned to, as in
/// `o.x = 1`.
fn is_member_write(ast: &Ast, reference: NodeId) -> bool {
    let Some(member) = ast.parent(reference) else {
        return false;
    };
    if !matches!(ast.node(member), Node::Member { .. }) {
        return false;
    }
    let Some(assignment) = ast.parent(member) else {
        return false;
    };
    matches!(ast.node(assignment), Node::Assignment { left, .. } if *left == member)
}

/// Splits an object's statically-keyed entries into plain literals and
/// proxy functions. A repeated key keeps its last entry.
fn index_properties(ast: &Ast, object: NodeId) -> ProxyObject {
    let mut literals = FxHashMap::default();
    let mut proxies = FxHashMap::default();
    if let Node::ObjectLiteral { properties } = ast.node(object) {
        for &property in properties {
            let Node::Property {
                key,
                value,
                computed,
                ..
            } = ast.node(property)
            else {
                continue;
            };
            let Some(key) = matcher::property_key(ast, *key, *computed) else {
                continue;
            };
            if matcher::is_literal(ast, *value) {
                literals.insert(key, *value);
            } else if is_proxy_function(ast, *value) {
                proxies.insert(key, *value);
            }
        }
    }
    ProxyObject { literals, proxies }
}

fn replace_usage(ast: &mut Ast, reference: NodeId, object: &ProxyObject) -> bool {
    let Some(member) = ast.parent(reference) else {
        return false;
    };
    if !matches!(ast.node(member), Node::Member { .. }) {
        return false;
    }
    let Some(key) = matcher::member_key(ast, member) else {
        return false;
    };
    if let Some(assignment) = ast.parent(member) {
        if matches!(ast.node(assignment), Node::Assignment { left, .. } if *left == member) {
            return false;
        }
    }

    if let Some(&value) = object.literals.get(&key) {
        let clone = ast.deep_clone(value);
        ast.replace_with_child(member, clone);
        return true;
    }
    if let Some(&function) = object.proxies.get(&key) {
        let Some(call) = ast.parent(member) else {
            return false;
        };
        let arguments = match ast.node(call) {
            Node::Call { callee, arguments } if *callee == member => arguments.clone(),
            _ => return false,
        };
        let expansion = get_replacement(ast, function, &arguments);
        ast.replace_with_child(call, expansion);
        return true;
    }
    false
}
