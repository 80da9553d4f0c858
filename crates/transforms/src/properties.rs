//! Bracket-to-dot property rewriting.

use crate::{PassContext, Result, Transform};
use alembic_core::ast::Node;
use alembic_core::lexer::is_valid_identifier;
use alembic_core::{Ast, NodeId};

/// Turns `obj['key']` into `obj.key` and unquotes object-literal keys
/// wherever the name is a plain identifier. Obfuscators go the other way
/// to feed every property through the string pool.
pub struct PropertySimplifier;

impl Transform for PropertySimplifier {
    fn name(&self) -> &'static str {
        "PropertySimplifier"
    }

    fn invalidates_bindings(&self) -> bool {
        false
    }

    fn apply(&self, ast: &mut Ast, _cx: &PassContext) -> Result<bool> {
        let mut changed = false;
        for node in ast.preorder(ast.root()) {
            match ast.node(node) {
                Node::Member {
                    property,
                    computed: true,
                    ..
                } => {
                    let property = *property;
                    if let Some(name) = identifier_worthy(ast, property) {
                        ast.replace(property, Node::Identifier { name });
                        if let Node::Member { computed, .. } = ast.node_mut(node) {
                            *computed = false;
                        }
                        changed = true;
                    }
                }
                Node::Property {
                    key,
                    computed: true,
                    ..
                } => {
                    let key = *key;
                    if let Some(name) = identifier_worthy(ast, key) {
                        ast.replace(key, Node::Identifier { name });
                        if let Node::Property { computed, .. } = ast.node_mut(node) {
                            *computed = false;
                        }
                        changed = true;
                    } else if matches!(
                        ast.node(key),
                        Node::StringLiteral { .. } | Node::NumberLiteral { .. }
                    ) {
                        // `{['a-b']: v}` to `{'a-b': v}`. Presentation only,
                        // so no other pass needs to rerun for it.
                        if let Node::Property { computed, .. } = ast.node_mut(node) {
                            *computed = false;
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(changed)
    }
}

/// The string value of a literal key that can be spelled as a bare
/// identifier.
fn identifier_worthy(ast: &Ast, key: NodeId) -> Option<String> {
    match ast.node(key) {
        Node::StringLiteral { value, .. } if is_valid_identifier(value) => Some(value.clone()),
        _ => None,
    }
}
