//! Inlining of single-expression forwarding functions.

use crate::constant::find_constant_variable;
use crate::{PassContext, Result, Transform};
use alembic_core::ast::Node;
use alembic_core::matcher;
use alembic_core::{Ast, NodeId};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Expands calls to functions that only forward to another expression, e.g.
/// `function p(a, b) { return a + b; }`. Obfuscators wrap every operator
/// and call behind layers of these, so each round of inlining peels one
/// layer and the fixpoint loop runs the pass until none remain.
///
/// Declarations are left in place for the unused-variable pass to collect
/// once nothing calls them anymore.
pub struct ProxyFunctionInliner;

impl Transform for ProxyFunctionInliner {
    fn name(&self) -> &'static str {
        "ProxyFunctionInliner"
    }

    fn apply(&self, ast: &mut Ast, cx: &PassContext) -> Result<bool> {
        let mut order: FxHashMap<NodeId, usize> = FxHashMap::default();
        let mut usages: Vec<(NodeId, NodeId)> = Vec::new();
        for (index, node) in ast.preorder(ast.root()).into_iter().enumerate() {
            order.insert(node, index);
            let Some(variable) =
                find_constant_variable(ast, cx.scopes, node, true, is_proxy_function)
            else {
                continue;
            };
            debug!(name = %variable.name, "found proxy function");
            for &reference in &cx.scopes.binding(variable.binding).references {
                usages.push((reference, variable.expression));
            }
        }

        // Innermost calls first, so outer expansions copy arguments that are
        // already inlined.
        usages.sort_by_key(|&(reference, _)| {
            std::cmp::Reverse(order.get(&reference).copied().unwrap_or(0))
        });

        let mut changed = false;
        for (reference, function) in usages {
            changed |= replace_call(ast, reference, function);
        }
        Ok(changed)
    }
}

/// Whether `node` is a function whose whole body forwards one expression
/// over plain identifier parameters.
pub fn is_proxy_function(ast: &Ast, node: NodeId) -> bool {
    let (params, body, arrow) = match ast.node(node) {
        Node::FunctionDeclaration { params, body, .. }
        | Node::FunctionExpression { params, body, .. } => (params, *body, false),
        Node::ArrowFunction { params, body } => (params, *body, true),
        _ => return false,
    };
    if !params
        .iter()
        .all(|&p| matches!(ast.node(p), Node::Identifier { .. }))
    {
        return false;
    }
    match ast.node(body) {
        Node::Block { body: statements } => {
            let [lone] = statements[..] else {
                return false;
            };
            match ast.node(lone) {
                Node::Return { argument: None } => true,
                Node::Return {
                    argument: Some(argument),
                } => is_proxy_value(ast, *argument),
                _ => false,
            }
        }
        _ if arrow => is_proxy_value(ast, body),
        _ => false,
    }
}

/// A value simple enough to duplicate at every call site. The root may be
/// an assignment, anything below it may not, and functions, blocks, and
/// sequences disqualify at any depth.
fn is_proxy_value(ast: &Ast, value: NodeId) -> bool {
    fn structural(node: &Node) -> bool {
        node.is_function() || matches!(node, Node::Block { .. } | Node::Sequence { .. })
    }
    if structural(ast.node(value)) {
        return false;
    }
    ast.preorder(value).into_iter().skip(1).all(|n| {
        let node = ast.node(n);
        !structural(node) && !matches!(node, Node::Assignment { .. })
    })
}

/// Builds the expression a call of `function` with `arguments` expands to.
/// Every parameter occurrence gets its own clone of the matching argument;
/// missing arguments read as `undefined`.
pub fn get_replacement(ast: &mut Ast, function: NodeId, arguments: &[NodeId]) -> NodeId {
    let (params, body) = match ast.node(function) {
        Node::FunctionDeclaration { params, body, .. }
        | Node::FunctionExpression { params, body, .. } => (params.clone(), *body),
        Node::ArrowFunction { params, body } => (params.clone(), *body),
        _ => return undefined(ast),
    };
    let source = match ast.node(body) {
        Node::Block { body: statements } => match statements.first().map(|&s| ast.node(s)) {
            Some(Node::Return {
                argument: Some(argument),
            }) => Some(*argument),
            _ => None,
        },
        _ => Some(body),
    };
    let expression = match source {
        Some(source) => ast.deep_clone(source),
        None => undefined(ast),
    };

    let positions: FxHashMap<String, usize> = params
        .iter()
        .enumerate()
        .filter_map(|(index, &param)| {
            matcher::identifier_name(ast, param).map(|name| (name.to_string(), index))
        })
        .collect();
    if positions.is_empty() {
        return expression;
    }
    for site in ast.preorder(expression) {
        let Node::Identifier { name } = ast.node(site) else {
            continue;
        };
        let Some(&index) = positions.get(name.as_str()) else {
            continue;
        };
        if in_key_position(ast, site) {
            continue;
        }
        let replacement = match arguments.get(index) {
            Some(&argument) => ast.deep_clone(argument),
            None => undefined(ast),
        };
        ast.replace_with_child(site, replacement);
    }
    expression
}

/// Expands one reference when it is the callee of a call. References in any
/// other position stay untouched.
fn replace_call(ast: &mut Ast, reference: NodeId, function: NodeId) -> bool {
    let Some(call) = ast.parent(reference) else {
        return false;
    };
    let arguments = match ast.node(call) {
        Node::Call { callee, arguments } if *callee == reference => arguments.clone(),
        _ => return false,
    };
    let expansion = get_replacement(ast, function, &arguments);
    ast.replace_with_child(call, expansion);
    true
}

/// Identifier slots that are property names rather than reads: the
/// non-computed side of a member access or an object property key.
fn in_key_position(ast: &Ast, site: NodeId) -> bool {
    let Some(parent) = ast.parent(site) else {
        return false;
    };
    match ast.node(parent) {
        Node::Member {
            property, computed, ..
        } => !*computed && *property == site,
        Node::Property { key, computed, .. } => !*computed && *key == site,
        _ => false,
    }
}

fn undefined(ast: &mut Ast) -> NodeId {
    ast.add(Node::Identifier {
        name: "undefined".into(),
    })
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
        let changed = ProxyFunctionInliner.apply(&mut ast, &cx).unwrap();
        (changed, print(&ast))
    }

    fn reprint(source: &str) -> String {
        print(&parse(source).unwrap())
    }

    #[test]
    fn forwarded_operator_lands_at_the_call_site() {
        let (changed, out) = run("function p(a, b) { return a + b; } f(p(1, 2));");
        assert!(changed);
        assert_eq!(out, reprint("function p(a, b) { return a + b; } f(1 + 2);"));
    }

    #[test]
    fn nested_calls_expand_inside_out_in_one_sweep() {
        let (changed, out) = run("function p(a) { return a * 2; } f(p(p(3)));");
        assert!(changed);
        assert_eq!(out, reprint("function p(a) { return a * 2; } f(3 * 2 * 2);"));
    }

    #[test]
    fn member_names_shadowing_a_parameter_survive() {
        let (changed, out) = run("function p(a) { return a.a; } f(p(s));");
        assert!(changed);
        assert_eq!(out, reprint("function p(a) { return a.a; } f(s.a);"));
    }

    #[test]
    fn computed_member_keys_are_substituted() {
        let (changed, out) = run("function p(a, b) { return a[b]; } f(p(o, k));");
        assert!(changed);
        assert_eq!(out, reprint("function p(a, b) { return a[b]; } f(o[k]);"));
    }

    #[test]
    fn missing_arguments_read_as_undefined() {
        let (changed, out) = run("function p(a, b) { return a + b; } f(p(1));");
        assert!(changed);
        assert_eq!(
            out,
            reprint("function p(a, b) { return a + b; } f(1 + undefined);")
        );
    }

    #[test]
    fn arrow_expression_bodies_inline() {
        let (changed, out) = run("var p = a => a + 1; f(p(2));");
        assert!(changed);
        assert_eq!(out, reprint("var p = a => a + 1; f(2 + 1);"));
    }

    #[test]
    fn sequence_bodies_do_not_qualify() {
        let source = "function p(a) { return (g(), a); } f(p(1));";
        let (changed, out) = run(source);
        assert!(!changed);
        assert_eq!(out, reprint(source));
    }

    #[test]
    fn nested_assignments_do_not_qualify() {
        let source = "function p(a) { return a + (x = 1); } f(p(2));";
        let (changed, out) = run(source);
        assert!(!changed);
        assert_eq!(out, reprint(source));
    }

    #[test]
    fn a_root_level_assignment_does_qualify() {
        let (changed, out) = run("function p(a) { return x = a; } f(p(2));");
        assert!(changed);
        assert_eq!(out, reprint("function p(a) { return x = a; } f(x = 2);"));
    }

    #[test]
    fn non_call_references_are_left_alone() {
        let (changed, out) = run("function p(a) { return a; } store(p); f(p(1));");
        assert!(changed);
        assert_eq!(out, reprint("function p(a) { return a; } store(p); f(1);"));
    }

    #[test]
    fn reassigned_proxies_are_not_inlined() {
        let source = "var p = function (a) { return a; }; p = other; f(p(1));";
        let (changed, out) = run(source);
        assert!(!changed);
        assert_eq!(out, reprint(source));
    }
}
