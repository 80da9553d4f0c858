//! Small shape predicates shared by the rewrite passes.

use crate::ast::{AssignOp, Ast, Node, NodeId};
use crate::printer::js_number;

/// An object property key. String and number keys stay distinct kinds even
/// when they spell the same characters, mirroring how the source wrote them.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum PropertyKey {
    Str(String),
    /// Canonical decimal text of a numeric key.
    Num(String),
}

impl PropertyKey {
    pub fn text(&self) -> &str {
        match self {
            PropertyKey::Str(s) | PropertyKey::Num(s) => s,
        }
    }
}

pub fn identifier_name(ast: &Ast, node: NodeId) -> Option<&str> {
    match ast.node(node) {
        Node::Identifier { name } => Some(name),
        _ => None,
    }
}

pub fn is_identifier_named(ast: &Ast, node: NodeId, name: &str) -> bool {
    identifier_name(ast, node) == Some(name)
}

/// String content of a string literal or substitution-free template.
pub fn string_value(ast: &Ast, node: NodeId) -> Option<&str> {
    match ast.node(node) {
        Node::StringLiteral { value, .. } => Some(value),
        Node::TemplateLiteral {
            quasis,
            expressions,
        } if expressions.is_empty() && quasis.len() == 1 => Some(&quasis[0]),
        _ => None,
    }
}

pub fn number_value(ast: &Ast, node: NodeId) -> Option<f64> {
    match ast.node(node) {
        Node::NumberLiteral { value } => Some(*value),
        _ => None,
    }
}

/// Literals a pass may treat as plain data. Regexes are stateful objects and
/// stay out.
pub fn is_literal(ast: &Ast, node: NodeId) -> bool {
    match ast.node(node) {
        Node::StringLiteral { .. }
        | Node::NumberLiteral { .. }
        | Node::BooleanLiteral { .. }
        | Node::NullLiteral => true,
        Node::TemplateLiteral { expressions, .. } => expressions.is_empty(),
        _ => false,
    }
}

/// Resolves an object-literal property key when it is statically known.
pub fn property_key(ast: &Ast, key: NodeId, computed: bool) -> Option<PropertyKey> {
    if computed {
        return match ast.node(key) {
            Node::StringLiteral { value, .. } => Some(PropertyKey::Str(value.clone())),
            Node::NumberLiteral { value } => Some(PropertyKey::Num(js_number(*value))),
            _ => None,
        };
    }
    match ast.node(key) {
        Node::Identifier { name } => Some(PropertyKey::Str(name.clone())),
        Node::StringLiteral { value, .. } => Some(PropertyKey::Str(value.clone())),
        Node::NumberLiteral { value } => Some(PropertyKey::Num(js_number(*value))),
        _ => None,
    }
}

/// The key of a member access when it is statically known.
pub fn member_key(ast: &Ast, member: NodeId) -> Option<PropertyKey> {
    let Node::Member {
        property, computed, ..
    } = ast.node(member)
    else {
        return None;
    };
    if *computed {
        match ast.node(*property) {
            Node::StringLiteral { value, .. } => Some(PropertyKey::Str(value.clone())),
            Node::NumberLiteral { value } => Some(PropertyKey::Num(js_number(*value))),
            _ => None,
        }
    } else {
        let name = identifier_name(ast, *property)?;
        Some(PropertyKey::Str(name.to_string()))
    }
}

/// `var x = init;` with exactly one declarator: `(declarator, name, init)`.
pub fn single_declarator(ast: &Ast, stmt: NodeId) -> Option<(NodeId, String, Option<NodeId>)> {
    let Node::VariableDeclaration { declarations, .. } = ast.node(stmt) else {
        return None;
    };
    if declarations.len() != 1 {
        return None;
    }
    let decl = declarations[0];
    let Node::Declarator { id, init } = ast.node(decl) else {
        return None;
    };
    let name = identifier_name(ast, *id)?.to_string();
    Some((decl, name, *init))
}

/// `x = value;` as a bare statement: `(name, value)`.
pub fn simple_assignment(ast: &Ast, stmt: NodeId) -> Option<(String, NodeId)> {
    let Node::ExpressionStatement { expression } = ast.node(stmt) else {
        return None;
    };
    let Node::Assignment {
        op: AssignOp::Assign,
        left,
        right,
    } = ast.node(*expression)
    else {
        return None;
    };
    let name = identifier_name(ast, *left)?.to_string();
    Some((name, *right))
}

/// Either `var x = value;` (initialized) or `x = value;`: `(name, value)`.
pub fn named_value_statement(ast: &Ast, stmt: NodeId) -> Option<(String, NodeId)> {
    if let Some((_, name, Some(init))) = single_declarator(ast, stmt) {
        return Some((name, init));
    }
    simple_assignment(ast, stmt)
}

/// Like [`named_value_statement`] but for expression positions such as a
/// `for` initializer, where the node is a declaration or a bare assignment.
pub fn named_value_node(ast: &Ast, node: NodeId) -> Option<(String, NodeId)> {
    if let Node::VariableDeclaration { declarations, .. } = ast.node(node) {
        if declarations.len() != 1 {
            return None;
        }
        let Node::Declarator { id, init } = ast.node(declarations[0]) else {
            return None;
        };
        let name = identifier_name(ast, *id)?.to_string();
        return init.map(|value| (name, value));
    }
    let Node::Assignment {
        op: AssignOp::Assign,
        left,
        right,
    } = ast.node(node)
    else {
        return None;
    };
    let name = identifier_name(ast, *left)?.to_string();
    Some((name, *right))
}

/// The single statement of a function body, when the body has exactly one.
pub fn lone_body_statement(ast: &Ast, body: NodeId) -> Option<NodeId> {
    let Node::Block { body } = ast.node(body) else {
        return None;
    };
    if body.len() == 1 {
        Some(body[0])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn first_statement(ast: &Ast) -> NodeId {
        let Node::Program { body } = ast.node(ast.root()) else {
            panic!();
        };
        body[0]
    }

    #[test]
    fn named_value_accepts_both_forms() {
        let ast = parse("var a = 1;").unwrap();
        let (name, _) = named_value_statement(&ast, first_statement(&ast)).unwrap();
        assert_eq!(name, "a");

        let ast = parse("a = f();").unwrap();
        let (name, _) = named_value_statement(&ast, first_statement(&ast)).unwrap();
        assert_eq!(name, "a");

        let ast = parse("a += 1;").unwrap();
        assert!(named_value_statement(&ast, first_statement(&ast)).is_none());
    }

    #[test]
    fn string_and_numeric_keys_stay_distinct() {
        let ast = parse("o['0']; o[0];").unwrap();
        let Node::Program { body } = ast.node(ast.root()) else {
            panic!();
        };
        let keys: Vec<_> = body
            .iter()
            .map(|&stmt| {
                let Node::ExpressionStatement { expression } = ast.node(stmt) else {
                    panic!();
                };
                member_key(&ast, *expression).unwrap()
            })
            .collect();
        assert_eq!(keys[0], PropertyKey::Str("0".into()));
        assert_eq!(keys[1], PropertyKey::Num("0".into()));
        assert_ne!(keys[0], keys[1]);
    }

    #[test]
    fn template_without_substitution_is_literal_data() {
        let ast = parse("x = `text`;").unwrap();
        let Node::Program { body } = ast.node(ast.root()) else {
            panic!();
        };
        let Node::ExpressionStatement { expression } = ast.node(body[0]) else {
            panic!();
        };
        let Node::Assignment { right, .. } = ast.node(*expression) else {
            panic!();
        };
        assert!(is_literal(&ast, *right));
        assert_eq!(string_value(&ast, *right), Some("text"));
    }
}
