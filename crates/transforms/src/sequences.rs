//! Unrolling of comma sequences and compressed statement forms.

use crate::{PassContext, Result, Transform};
use alembic_core::ast::{LogicalOp, Node, UnaryOp};
use alembic_core::matcher;
use alembic_core::{Ast, NodeId};

/// Undoes statement compression: comma sequences become statement lists,
/// conditional and logical expression statements become `if`s, multi-name
/// declarations split, and brace-less bodies get their braces back.
/// Obfuscators fuse whole blocks into single expressions this way, and
/// every other pass works better on the unfused form.
pub struct SequenceSplitter;

impl Transform for SequenceSplitter {
    fn name(&self) -> &'static str {
        "SequenceSplitter"
    }

    fn invalidates_bindings(&self) -> bool {
        false
    }

    fn apply(&self, ast: &mut Ast, _cx: &PassContext) -> Result<bool> {
        let mut changed = false;
        for node in ast.preorder(ast.root()) {
            changed |= match ast.node(node) {
                Node::Conditional { .. } => split_conditional_statement(ast, node),
                Node::Logical { .. } => split_logical_statement(ast, node),
                Node::For { .. } | Node::While { .. } | Node::DoWhile { .. } => {
                    wrap_loop_body(ast, node)
                }
                Node::If { .. } => wrap_branches(ast, node),
                Node::VariableDeclaration { .. } => split_declaration(ast, node),
                Node::Sequence { .. } => split_sequence(ast, node),
                _ => false,
            };
        }
        Ok(changed)
    }
}

/// `c ? a() : b();` as a statement becomes `if (c) a(); else b();`.
fn split_conditional_statement(ast: &mut Ast, conditional: NodeId) -> bool {
    let Some(statement) = expression_statement_parent(ast, conditional) else {
        return false;
    };
    let Node::Conditional {
        test,
        consequent,
        alternate,
    } = ast.node(conditional)
    else {
        return false;
    };
    let (test, consequent, alternate) = (*test, *consequent, *alternate);
    let consequent = ast.add(Node::ExpressionStatement {
        expression: consequent,
    });
    let alternate = ast.add(Node::ExpressionStatement {
        expression: alternate,
    });
    let target = else_collapse_target(ast, statement);
    ast.replace(
        target,
        Node::If {
            test,
            consequent,
            alternate: Some(alternate),
        },
    );
    true
}

/// `c && a();` becomes `if (c) a();`, and `c || a();` becomes `if (!c) a();`.
fn split_logical_statement(ast: &mut Ast, logical: NodeId) -> bool {
    let Some(statement) = expression_statement_parent(ast, logical) else {
        return false;
    };
    let Node::Logical { op, left, right } = ast.node(logical) else {
        return false;
    };
    let (op, left, right) = (*op, *left, *right);
    let test = match op {
        LogicalOp::And => left,
        LogicalOp::Or => ast.add(Node::Unary {
            op: UnaryOp::Not,
            argument: left,
        }),
    };
    let consequent = ast.add(Node::ExpressionStatement { expression: right });
    let target = else_collapse_target(ast, statement);
    ast.replace(
        target,
        Node::If {
            test,
            consequent,
            alternate: None,
        },
    );
    true
}

fn expression_statement_parent(ast: &Ast, expression: NodeId) -> Option<NodeId> {
    let parent = ast.parent(expression)?;
    match ast.node(parent) {
        Node::ExpressionStatement { expression: e } if *e == expression => Some(parent),
        _ => None,
    }
}

/// When the statement is the lone line of an `else { ... }` block, the new
/// `if` takes the block's place and the chain reads `else if`.
fn else_collapse_target(ast: &Ast, statement: NodeId) -> NodeId {
    let Some(block) = ast.parent(statement) else {
        return statement;
    };
    if !matches!(ast.node(block), Node::Block { body } if body.len() == 1) {
        return statement;
    }
    let Some(owner) = ast.parent(block) else {
        return statement;
    };
    match ast.node(owner) {
        Node::If {
            alternate: Some(alternate),
            ..
        } if *alternate == block => block,
        _ => statement,
    }
}

fn wrap_loop_body(ast: &mut Ast, loop_node: NodeId) -> bool {
    let body = match ast.node(loop_node) {
        Node::For { body, .. } | Node::While { body, .. } | Node::DoWhile { body, .. } => *body,
        _ => return false,
    };
    if matches!(ast.node(body), Node::Block { .. }) {
        return false;
    }
    let block = ast.add(Node::Block { body: vec![body] });
    match ast.node_mut(loop_node) {
        Node::For { body, .. } | Node::While { body, .. } | Node::DoWhile { body, .. } => {
            *body = block;
        }
        _ => {}
    }
    ast.adopt(block, loop_node);
    true
}

/// Puts braces around brace-less `if` branches. An `else if` keeps its
/// shape.
fn wrap_branches(ast: &mut Ast, if_stmt: NodeId) -> bool {
    let Node::If {
        consequent,
        alternate,
        ..
    } = ast.node(if_stmt)
    else {
        return false;
    };
    let (consequent, alternate) = (*consequent, *alternate);
    let mut changed = false;
    if !matches!(ast.node(consequent), Node::Block { .. }) {
        let block = ast.add(Node::Block {
            body: vec![consequent],
        });
        if let Node::If { consequent, .. } = ast.node_mut(if_stmt) {
            *consequent = block;
        }
        ast.adopt(block, if_stmt);
        changed = true;
    }
    if let Some(alternate) = alternate {
        if !matches!(ast.node(alternate), Node::Block { .. } | Node::If { .. }) {
            let block = ast.add(Node::Block {
                body: vec![alternate],
            });
            if let Node::If { alternate, .. } = ast.node_mut(if_stmt) {
                *alternate = Some(block);
            }
            ast.adopt(block, if_stmt);
            changed = true;
        }
    }
    changed
}

/// `var a = 1, b = 2;` splits into one declaration per name. In a `for`
/// initializer the last declarator stays behind and the rest move above the
/// loop.
fn split_declaration(ast: &mut Ast, declaration: NodeId) -> bool {
    let (kind, declarations) = match ast.node(declaration) {
        Node::VariableDeclaration { kind, declarations } => (*kind, declarations.clone()),
        _ => return false,
    };
    if declarations.len() <= 1 {
        return false;
    }
    let singles: Vec<NodeId> = declarations
        .iter()
        .map(|&declarator| {
            ast.add(Node::VariableDeclaration {
                kind,
                declarations: vec![declarator],
            })
        })
        .collect();

    let in_for_init = ast.parent(declaration).filter(|&parent| {
        matches!(ast.node(parent), Node::For { init: Some(init), .. } if *init == declaration)
    });
    if let Some(for_loop) = in_for_init {
        let Some((container, index)) = ast.statement_position(for_loop) else {
            return false;
        };
        let (&last, head) = match singles.split_last() {
            Some(pair) => pair,
            None => return false,
        };
        ast.insert_statements(container, index, head);
        if let Node::For { init, .. } = ast.node_mut(for_loop) {
            *init = Some(last);
        }
        ast.adopt(last, for_loop);
        return true;
    }

    if let Some((container, index)) = ast.statement_position(declaration) {
        ast.remove_from_parent(declaration);
        ast.insert_statements(container, index, &singles);
    } else {
        // Fixed slot, e.g. under a brace-less `if`.
        ast.replace(declaration, Node::Block { body: singles });
    }
    true
}

/// Hoists the leading expressions of a comma sequence out to their own
/// statements, leaving only the final value in place.
fn split_sequence(ast: &mut Ast, sequence: NodeId) -> bool {
    let expressions = match ast.node(sequence) {
        Node::Sequence { expressions } => expressions.clone(),
        _ => return false,
    };
    let (&last, rest) = match expressions.split_last() {
        Some(pair) => pair,
        None => return false,
    };
    if rest.is_empty() {
        ast.replace_with_child(sequence, last);
        return true;
    }

    let mut current = sequence;
    let statement = loop {
        if ast.node(current).is_statement() {
            break current;
        }
        let Some(parent) = ast.parent(current) else {
            return false;
        };
        if hoist_excluded(ast, parent, current) {
            return false;
        }
        current = parent;
    };
    let Some((container, index)) = ast.statement_position(statement) else {
        return false;
    };

    if matcher::is_identifier_named(ast, last, "eval") {
        // `(o, eval)(src)` is the indirect-eval idiom; the last pair has to
        // stay a sequence for the call to keep its global scope.
        if expressions.len() <= 2 {
            return false;
        }
        let hoisted = statements_for(ast, &expressions[..expressions.len() - 2]);
        ast.insert_statements(container, index, &hoisted);
        if let Node::Sequence { expressions } = ast.node_mut(sequence) {
            let keep = expressions.len() - 2;
            expressions.drain(..keep);
        }
    } else {
        let hoisted = statements_for(ast, rest);
        ast.insert_statements(container, index, &hoisted);
        ast.replace_with_child(sequence, last);
    }
    true
}

/// Positions a sequence must not be hoisted out of: branches that may not
/// run, loop clauses that run per iteration, and arrow bodies.
fn hoist_excluded(ast: &Ast, parent: NodeId, child: NodeId) -> bool {
    match ast.node(parent) {
        Node::Conditional {
            consequent,
            alternate,
            ..
        } => *consequent == child || *alternate == child,
        Node::Logical { right, .. } => *right == child,
        Node::For { test, update, .. } => *test == Some(child) || *update == Some(child),
        Node::DoWhile { test, .. } => *test == child,
        Node::ArrowFunction { body, .. } => *body == child,
        _ => false,
    }
}

fn statements_for(ast: &mut Ast, expressions: &[NodeId]) -> Vec<NodeId> {
    expressions
        .iter()
        .map(|&expression| ast.add(Node::ExpressionStatement { expression }))
        .collect()
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
        let changed = SequenceSplitter.apply(&mut ast, &cx).unwrap();
        (changed, print(&ast))
    }

    fn reprint(source: &str) -> String {
        print(&parse(source).unwrap())
    }

    #[test]
    fn sequence_statement_becomes_a_list() {
        let (changed, out) = run("a(), b(), c();");
        assert!(changed);
        assert_eq!(out, reprint("a(); b(); c();"));
    }

    #[test]
    fn conditional_statement_becomes_an_if() {
        let (changed, out) = run("c ? a() : b();");
        assert!(changed);
        assert_eq!(out, reprint("if (c) a(); else b();"));
    }

    #[test]
    fn lone_conditional_in_an_else_block_chains() {
        let (changed, out) = run("if (x) { f(); } else { c ? a() : b(); }");
        assert!(changed);
        assert_eq!(out, reprint("if (x) { f(); } else if (c) a(); else b();"));
    }

    #[test]
    fn logical_statements_become_guards() {
        let (changed, out) = run("c && a(); d || b();");
        assert!(changed);
        assert_eq!(out, reprint("if (c) a(); if (!d) b();"));
    }

    #[test]
    fn braceless_bodies_get_braces() {
        let (changed, out) = run("while (c) f(); if (d) g(); else if (e) h();");
        assert!(changed);
        assert_eq!(
            out,
            reprint("while (c) { f(); } if (d) { g(); } else if (e) { h(); }")
        );
    }

    #[test]
    fn declarations_split_per_name() {
        let (changed, out) = run("var a = 1, b = 2; f(a, b);");
        assert!(changed);
        assert_eq!(out, reprint("var a = 1; var b = 2; f(a, b);"));
    }

    #[test]
    fn for_initializer_keeps_its_last_declarator() {
        let (changed, out) = run("for (var i = 0, n = len;;) {}");
        assert!(changed);
        assert_eq!(out, reprint("var i = 0; for (var n = len;;) {}"));
    }

    #[test]
    fn return_sequences_hoist_their_prefix() {
        let (changed, out) = run("function f() { return a(), b(); } f();");
        assert!(changed);
        assert_eq!(out, reprint("function f() { a(); return b(); } f();"));
    }

    #[test]
    fn while_tests_hoist_once() {
        let (changed, out) = run("while (a(), b()) { f(); }");
        assert!(changed);
        assert_eq!(out, reprint("a(); while (b()) { f(); }"));
    }

    #[test]
    fn conditional_branches_and_arrow_bodies_are_protected() {
        let source = "x = c ? (a(), 1) : 2; g = () => (b(), 3);";
        let (changed, out) = run(source);
        assert!(!changed);
        assert_eq!(out, reprint(source));
    }

    #[test]
    fn indirect_eval_pairs_survive() {
        let source = "x = (g(), eval)('code');";
        let (changed, out) = run(source);
        assert!(!changed);
        assert_eq!(out, reprint(source));

        let (changed, out) = run("x = (f(), g(), eval)('code');");
        assert!(changed);
        assert_eq!(out, reprint("f(); x = (g(), eval)('code');"));
    }
}
