//! Recovery of flattened statement blocks.

use crate::constant::find_constant_variable;
use crate::{PassContext, Result, Transform};
use alembic_core::ast::Node;
use alembic_core::matcher;
use alembic_core::{Ast, NodeId};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Rebuilds statement blocks that were flattened into a dispatch loop.
/// The obfuscated form splits an execution-order string into a state array
/// and replays the block through `switch (order[counter++])` inside a
/// `for` or `while (true)` loop, one `continue` per state. The order is
/// static, so the pass walks it, stitches the case bodies back together
/// in sequence, and drops the loop.
pub struct ControlFlowRecoverer;

impl Transform for ControlFlowRecoverer {
    fn name(&self) -> &'static str {
        "ControlFlowRecoverer"
    }

    fn apply(&self, ast: &mut Ast, cx: &PassContext) -> Result<bool> {
        let mut changed = false;
        for node in ast.preorder(ast.root()) {
            let Some(variable) = find_constant_variable(ast, cx.scopes, node, false, is_order_split)
            else {
                continue;
            };
            let Some(states) = split_states(ast, variable.expression) else {
                continue;
            };
            let Some(statement) = ast.statement_parent(variable.path) else {
                continue;
            };
            let Some((container, index)) = ast.statement_position(statement) else {
                continue;
            };
            let (next, after) = {
                let Some(siblings) = ast.statement_list(container) else {
                    continue;
                };
                (
                    siblings.get(index + 1).copied(),
                    siblings.get(index + 2).copied(),
                )
            };
            let Some(next) = next else {
                continue;
            };

            let (initial, switch, loop_node) =
                if let Some((initial, switch)) = for_dispatch(ast, next, &variable.name) {
                    (initial, switch, next)
                } else if let Some((counter, initial)) = counter_statement(ast, next) {
                    let Some(after) = after else {
                        continue;
                    };
                    let Some(switch) = while_dispatch(ast, after, &variable.name, &counter) else {
                        continue;
                    };
                    (initial, switch, after)
                } else {
                    continue;
                };

            // A repeated case label keeps its last body.
            let mut case_bodies: FxHashMap<String, Vec<NodeId>> = FxHashMap::default();
            if let Node::Switch { cases, .. } = ast.node(switch) {
                for &case in cases {
                    if let Node::SwitchCase {
                        test: Some(test),
                        consequent,
                    } = ast.node(case)
                    {
                        if let Node::StringLiteral { value, .. } = ast.node(*test) {
                            case_bodies.insert(value.clone(), consequent.clone());
                        }
                    }
                }
            }

            let mut recovered: Vec<NodeId> = Vec::new();
            let mut position = if initial >= 0.0 && initial.fract() == 0.0 {
                initial as usize
            } else {
                states.len()
            };
            loop {
                let Some(body) = states.get(position).and_then(|s| case_bodies.get(s)) else {
                    break;
                };
                for &case_stmt in body {
                    if !matches!(ast.node(case_stmt), Node::Continue) {
                        let clone = ast.deep_clone(case_stmt);
                        recovered.push(clone);
                    }
                }
                let returned = matches!(body.last(), Some(&last)
                    if matches!(ast.node(last), Node::Return { .. }));
                if returned {
                    break;
                }
                position += 1;
            }

            variable.remove(ast, cx.scopes);
            let Some((container, index)) = ast.statement_position(loop_node) else {
                continue;
            };
            ast.remove_from_parent(loop_node);
            ast.insert_statements(container, index, &recovered);
            debug!(
                name = %variable.name,
                states = states.len(),
                statements = recovered.len(),
                "recovered flattened block"
            );
            changed = true;
        }
        Ok(changed)
    }
}

/// `'...'.split('...')` on a string literal, including the `['split']`
/// spelling.
fn is_order_split(ast: &Ast, node: NodeId) -> bool {
    let Node::Call { callee, arguments } = ast.node(node) else {
        return false;
    };
    if arguments.len() != 1 || !matches!(ast.node(arguments[0]), Node::StringLiteral { .. }) {
        return false;
    }
    let Node::Member {
        object, property, ..
    } = ast.node(*callee)
    else {
        return false;
    };
    if !matches!(ast.node(*object), Node::StringLiteral { .. }) {
        return false;
    }
    match ast.node(*property) {
        Node::Identifier { name } => name == "split",
        Node::StringLiteral { value, .. } => value == "split",
        _ => false,
    }
}

fn split_states(ast: &Ast, expression: NodeId) -> Option<Vec<String>> {
    let Node::Call { callee, arguments } = ast.node(expression) else {
        return None;
    };
    let (callee, argument) = (*callee, *arguments.first()?);
    let object = match ast.node(callee) {
        Node::Member { object, .. } => *object,
        _ => return None,
    };
    let order = matcher::string_value(ast, object)?;
    let separator = matcher::string_value(ast, argument)?;
    Some(js_split(order, separator))
}

/// `String.prototype.split` with a string separator. An empty separator
/// splits between every character, while an empty input with a non-empty
/// separator still yields one empty piece.
pub(crate) fn js_split(value: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        value.chars().map(String::from).collect()
    } else {
        value.split(separator).map(String::from).collect()
    }
}

/// `var c = 0;` or `c = 0;` naming the dispatch counter.
fn counter_statement(ast: &Ast, stmt: NodeId) -> Option<(String, f64)> {
    let (name, value) = matcher::named_value_statement(ast, stmt)?;
    Some((name, matcher::number_value(ast, value)?))
}

/// A dispatch `for` loop whose initializer sets the counter. Returns the
/// initial state index and the switch.
fn for_dispatch(ast: &Ast, node: NodeId, states_name: &str) -> Option<(f64, NodeId)> {
    let (init, body) = match ast.node(node) {
        Node::For {
            init: Some(init),
            body,
            ..
        } => (*init, *body),
        _ => return None,
    };
    let (counter, value) = matcher::named_value_node(ast, init)?;
    let initial = matcher::number_value(ast, value)?;
    let switch = dispatch_switch(ast, body, states_name, &counter)?;
    Some((initial, switch))
}

/// A `while (true)` dispatch loop over an already-declared counter.
fn while_dispatch(ast: &Ast, node: NodeId, states_name: &str, counter: &str) -> Option<NodeId> {
    let (test, body) = match ast.node(node) {
        Node::While { test, body } => (*test, *body),
        _ => return None,
    };
    if !matches!(ast.node(test), Node::BooleanLiteral { value: true }) {
        return None;
    }
    dispatch_switch(ast, body, states_name, counter)
}

/// The switch of a dispatch loop body, which is exactly
/// `{ switch (states[counter++]) { ... } break; }` with every case
/// labelled by a string literal.
fn dispatch_switch(ast: &Ast, body: NodeId, states_name: &str, counter: &str) -> Option<NodeId> {
    let (switch, exit) = match ast.node(body) {
        Node::Block { body } if body.len() == 2 => (body[0], body[1]),
        _ => return None,
    };
    if !matches!(ast.node(exit), Node::Break) {
        return None;
    }
    let (discriminant, cases) = match ast.node(switch) {
        Node::Switch {
            discriminant,
            cases,
        } => (*discriminant, cases),
        _ => return None,
    };
    let (object, property) = match ast.node(discriminant) {
        Node::Member {
            object, property, ..
        } => (*object, *property),
        _ => return None,
    };
    if !matcher::is_identifier_named(ast, object, states_name) {
        return None;
    }
    let argument = match ast.node(property) {
        Node::Update { argument, .. } => *argument,
        _ => return None,
    };
    if !matcher::is_identifier_named(ast, argument, counter) {
        return None;
    }
    for &case in cases {
        let labelled = matches!(ast.node(case), Node::SwitchCase { test: Some(test), .. }
            if matches!(ast.node(*test), Node::StringLiteral { .. }));
        if !labelled {
            return None;
        }
    }
    Some(switch)
}
