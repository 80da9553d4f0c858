//! Single-assignment variable matching.
//!
//! Several passes hinge on the same question: does this node bind a name to
//! a value that never changes afterwards? The answer covers three spellings,
//! an initialized declarator, a function declaration, and the
//! declare-then-assign-once split obfuscators produce when they hoist.

use alembic_core::ast::Node;
use alembic_core::matcher::identifier_name;
use alembic_core::scope::{BindingId, BindingKind};
use alembic_core::{Ast, NodeId, ScopeIndex};

/// How the constant was spelled in source.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConstantForm {
    /// `var name = value;`
    Declarator,
    /// `function name() {}`
    FunctionDeclaration,
    /// `var name; name = value;` with exactly that one write.
    Assignment,
}

/// A name bound once to a value matching some pass-supplied shape.
#[derive(Debug)]
pub struct ConstantVariable {
    /// The declarator, function declaration, or assignment that bound it.
    pub path: NodeId,
    pub form: ConstantForm,
    pub name: String,
    pub binding: BindingId,
    /// The bound value: the initializer, the function itself, or the
    /// assignment's right side.
    pub expression: NodeId,
}

/// Matches `node` against the three constant spellings, returning the
/// variable when its value satisfies `is_type` and nothing else writes it.
/// Function declarations only participate when `allow_function` is set.
pub fn find_constant_variable(
    ast: &Ast,
    scopes: &ScopeIndex,
    node: NodeId,
    allow_function: bool,
    is_type: impl Fn(&Ast, NodeId) -> bool,
) -> Option<ConstantVariable> {
    match ast.node(node) {
        Node::Declarator {
            id,
            init: Some(init),
        } => {
            let name = identifier_name(ast, *id)?.to_string();
            if !is_type(ast, *init) {
                return None;
            }
            let binding = scopes.binding_for_declaration(node)?;
            if !effectively_constant(scopes, binding, node) {
                return None;
            }
            Some(ConstantVariable {
                path: node,
                form: ConstantForm::Declarator,
                name,
                binding,
                expression: *init,
            })
        }
        Node::FunctionDeclaration { id, .. } if allow_function => {
            let name = identifier_name(ast, *id)?.to_string();
            if !is_type(ast, node) {
                return None;
            }
            let binding = scopes.binding_for_declaration(node)?;
            if !effectively_constant(scopes, binding, node) {
                return None;
            }
            Some(ConstantVariable {
                path: node,
                form: ConstantForm::FunctionDeclaration,
                name,
                binding,
                expression: node,
            })
        }
        Node::Assignment {
            op: alembic_core::ast::AssignOp::Assign,
            left,
            right,
        } => {
            let name = identifier_name(ast, *left)?.to_string();
            if !is_type(ast, *right) {
                return None;
            }
            let binding = scopes.resolve_at(ast, *left, &name)?;
            if !assignable_binding(ast, scopes, binding) {
                return None;
            }
            let b = scopes.binding(binding);
            // The one write on record must be this very assignment.
            if b.violations.len() != 1 || ast.parent(b.violations[0]) != Some(node) {
                return None;
            }
            if !assignment_fills_own_block(ast, scopes, binding, node) {
                return None;
            }
            Some(ConstantVariable {
                path: node,
                form: ConstantForm::Assignment,
                name,
                binding,
                expression: *right,
            })
        }
        _ => None,
    }
}

/// No writes besides, at most, the binding's own latest declarator. That one
/// exception keeps redeclared `var`s usable: the winning declarator carries
/// itself as a violation.
fn effectively_constant(scopes: &ScopeIndex, binding: BindingId, path: NodeId) -> bool {
    let b = scopes.binding(binding);
    b.violations.is_empty()
        || (b.violations.len() == 1 && b.declaration == path && b.violations[0] == path)
}

/// A binding the assignment form may claim: a declarator without an
/// initializer, or a parameter.
fn assignable_binding(ast: &Ast, scopes: &ScopeIndex, binding: BindingId) -> bool {
    let b = scopes.binding(binding);
    match b.kind {
        BindingKind::Param => true,
        _ => matches!(ast.node(b.declaration), Node::Declarator { init: None, .. }),
    }
}

/// The assignment must sit directly in the block that declared the binding,
/// as a plain statement rather than under a conditional or logical operand.
/// Anything else could leave the name unwritten on some path.
fn assignment_fills_own_block(
    ast: &Ast,
    scopes: &ScopeIndex,
    binding: BindingId,
    assignment: NodeId,
) -> bool {
    let mut current = assignment;
    let statement = loop {
        let Some(parent) = ast.parent(current) else {
            return false;
        };
        let node = ast.node(current);
        if node.is_statement() {
            break current;
        }
        if matches!(node, Node::Conditional { .. } | Node::Logical { .. }) {
            return false;
        }
        current = parent;
    };
    let Some(statement_container) = ast.parent(statement) else {
        return false;
    };
    let b = scopes.binding(binding);
    let declaration_block = if b.kind == BindingKind::Param {
        match ast.node(scopes.scope(b.scope).owner) {
            Node::FunctionDeclaration { body, .. }
            | Node::FunctionExpression { body, .. }
            | Node::ArrowFunction { body, .. } => *body,
            _ => return false,
        }
    } else {
        match ast.statement_parent(b.declaration).and_then(|s| ast.parent(s)) {
            Some(block) => block,
            None => return false,
        }
    };
    statement_container == declaration_block
}

impl ConstantVariable {
    /// Deletes the matched binding site. For the assignment form this removes
    /// both the empty declarator (or parameter) and the assignment itself,
    /// keeping the right side alive when the assignment fed an expression.
    pub fn remove(&self, ast: &mut Ast, scopes: &ScopeIndex) {
        match self.form {
            ConstantForm::Declarator => remove_declarator(ast, self.path),
            ConstantForm::FunctionDeclaration => remove_statement(ast, self.path),
            ConstantForm::Assignment => {
                let declaration = scopes.binding(self.binding).declaration;
                if scopes.binding(self.binding).kind == BindingKind::Param {
                    ast.remove_from_parent(declaration);
                } else {
                    remove_declarator(ast, declaration);
                }
                match ast.parent(self.path) {
                    Some(stmt) if matches!(ast.node(stmt), Node::ExpressionStatement { .. }) => {
                        remove_statement(ast, stmt);
                    }
                    // Mid-sequence the value is discarded anyway.
                    Some(seq)
                        if matches!(ast.node(seq), Node::Sequence { expressions }
                            if expressions.last() != Some(&self.path)) =>
                    {
                        ast.remove_from_parent(self.path);
                    }
                    _ => ast.replace_with_child(self.path, self.expression),
                }
            }
        }
    }
}

/// Removes a declarator, cascading to the whole declaration when it was the
/// last one.
pub fn remove_declarator(ast: &mut Ast, declarator: NodeId) {
    let Some(declaration) = ast.parent(declarator) else {
        return;
    };
    ast.remove_from_parent(declarator);
    let emptied = matches!(
        ast.node(declaration),
        Node::VariableDeclaration { declarations, .. } if declarations.is_empty()
    );
    if emptied {
        remove_statement(ast, declaration);
    }
}

/// Removes a statement wherever it sits: list positions drop it, a for-loop
/// initializer empties, and other fixed slots degrade to an empty statement.
pub fn remove_statement(ast: &mut Ast, stmt: NodeId) {
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
    ast.replace(stmt, Node::Empty);
}
