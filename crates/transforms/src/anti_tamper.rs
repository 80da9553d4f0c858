//! Strips the obfuscator's tamper guards. All of them route through one
//! shared once-only factory:
//!
//! ```text
//! var guard = (function () {
//!     var armed = true;
//!     return function (target, body) {
//!         var handler = armed ? function () { ... } : function () {};
//!         armed = false;
//!         return handler;
//!     };
//! })();
//! ```
//!
//! Every use of the factory is one of three guards: a self-defence probe
//! re-reading its own rendered source, a debugger-loop bootstrap paired with
//! a standalone engine function, or a console-method silencer. Recognized
//! uses are deleted together with their supporting declarations and call
//! sites. An unrecognized use keeps the factory in place so live code that
//! merely resembles a guard survives.

use alembic_core::ast::{DeclKind, Node};
use alembic_core::{matcher, Ast, NodeId};
use tracing::debug;

use crate::{constant, PassContext, Result, Transform};

/// Deletes self-defence, debugger-loop, and console-silencing scaffolding.
pub struct AntiTamperRemover;

impl Transform for AntiTamperRemover {
    fn name(&self) -> &'static str {
        "AntiTamperRemover"
    }

    fn apply(&self, ast: &mut Ast, cx: &PassContext) -> Result<bool> {
        let mut changed = false;
        for node in ast.preorder(ast.root()) {
            changed |= strip_guard(ast, cx, node);
        }
        Ok(changed)
    }
}

enum StripOutcome {
    Stripped,
    Skipped,
    Unknown,
}

fn strip_guard(ast: &mut Ast, cx: &PassContext, stmt: NodeId) -> bool {
    let Some(factory) = guard_factory(ast, stmt) else {
        return false;
    };
    let mut changed = false;
    let mut keep_factory = false;
    if let Some(binding) = cx.scopes.binding_for_declaration(factory) {
        for &reference in &cx.scopes.binding(binding).references {
            match strip_reference(ast, cx, reference) {
                StripOutcome::Stripped => changed = true,
                StripOutcome::Skipped => {}
                StripOutcome::Unknown => {
                    debug!(
                        guard = %cx.scopes.binding(binding).name,
                        "unrecognized tamper guard use"
                    );
                    keep_factory = true;
                }
            }
        }
    }
    if !keep_factory {
        constant::remove_statement(ast, stmt);
        changed = true;
    }
    changed
}

fn strip_reference(ast: &mut Ast, cx: &PassContext, reference: NodeId) -> StripOutcome {
    let Some(parent) = ast.statement_parent(reference) else {
        return StripOutcome::Unknown;
    };
    if let Some(probe) = self_defending(ast, parent, reference) {
        remove_call_sites(ast, cx, probe);
        constant::remove_statement(ast, parent);
        StripOutcome::Stripped
    } else if let Some(engine) = debug_protection(ast, parent, reference).map(str::to_string) {
        if let Some(binding) = cx.scopes.resolve_at(ast, reference, &engine) {
            constant::remove_statement(ast, cx.scopes.binding(binding).declaration);
        }
        // The bootstrap spins inside a scheduling callback, so the whole
        // scheduling statement goes with it.
        let target = ast
            .function_parent(parent)
            .and_then(|f| ast.statement_parent(f))
            .unwrap_or(parent);
        constant::remove_statement(ast, target);
        StripOutcome::Stripped
    } else if let Some(silencer) = console_disable(ast, parent, Some(reference)) {
        remove_call_sites(ast, cx, silencer);
        constant::remove_statement(ast, parent);
        StripOutcome::Stripped
    } else {
        // The silencer body re-aliases the factory for its bind dance; those
        // references disappear with the silencer itself.
        let enclosing = ast
            .function_parent(reference)
            .and_then(|f| ast.statement_parent(f));
        if let Some(enclosing) = enclosing {
            if console_disable(ast, enclosing, None).is_some() {
                return StripOutcome::Skipped;
            }
        }
        StripOutcome::Unknown
    }
}

/// Deletes the statement around every read of the binding a guard declares.
fn remove_call_sites(ast: &mut Ast, cx: &PassContext, declarator: NodeId) {
    let Some(binding) = cx.scopes.binding_for_declaration(declarator) else {
        return;
    };
    for &site in &cx.scopes.binding(binding).references {
        if let Some(statement) = ast.statement_parent(site) {
            constant::remove_statement(ast, statement);
        }
    }
}

/// `var name = <init>;` with exactly one declarator.
fn var_declarator(ast: &Ast, stmt: NodeId) -> Option<(NodeId, NodeId)> {
    let Node::VariableDeclaration {
        kind: DeclKind::Var,
        declarations,
    } = ast.node(stmt)
    else {
        return None;
    };
    let [declarator] = declarations.as_slice() else {
        return None;
    };
    let Node::Declarator {
        init: Some(init), ..
    } = ast.node(*declarator)
    else {
        return None;
    };
    Some((*declarator, *init))
}

fn guard_factory(ast: &Ast, stmt: NodeId) -> Option<NodeId> {
    let (declarator, init) = var_declarator(ast, stmt)?;
    let Node::Call { callee, arguments } = ast.node(init) else {
        return None;
    };
    if !arguments.is_empty() {
        return None;
    }
    let Node::FunctionExpression { params, body, .. } = ast.node(*callee) else {
        return None;
    };
    if !params.is_empty() {
        return None;
    }
    let [arm, handout] = ast.statement_list(*body)? else {
        return None;
    };
    let (_, armed) = var_declarator(ast, *arm)?;
    if !matches!(ast.node(armed), Node::BooleanLiteral { value: true }) {
        return None;
    }
    let Node::Return {
        argument: Some(closure),
    } = ast.node(*handout)
    else {
        return None;
    };
    let Node::FunctionExpression { params, body, .. } = ast.node(*closure) else {
        return None;
    };
    if params.len() != 2 {
        return None;
    }
    let [pick, disarm, give] = ast.statement_list(*body)? else {
        return None;
    };
    let (_, choice) = var_declarator(ast, *pick)?;
    let Node::Conditional {
        test,
        consequent,
        alternate,
    } = ast.node(choice)
    else {
        return None;
    };
    if matcher::identifier_name(ast, *test).is_none()
        || !is_bare_function(ast, *consequent, false)
        || !is_bare_function(ast, *alternate, true)
    {
        return None;
    }
    let (_, rearmed) = matcher::simple_assignment(ast, *disarm)?;
    if !matches!(ast.node(rearmed), Node::BooleanLiteral { value: false }) {
        return None;
    }
    is_identifier_return(ast, *give).then_some(declarator)
}

/// A parameterless function expression, optionally required to be empty.
fn is_bare_function(ast: &Ast, node: NodeId, empty: bool) -> bool {
    let Node::FunctionExpression { params, body, .. } = ast.node(node) else {
        return false;
    };
    if !params.is_empty() {
        return false;
    }
    match ast.statement_list(*body) {
        Some(body) => !empty || body.is_empty(),
        None => false,
    }
}

/// `guard(this, function () { ... })` through the given factory reference;
/// yields the callback body.
fn guarded_callback(ast: &Ast, call: NodeId, reference: Option<NodeId>) -> Option<NodeId> {
    let Node::Call { callee, arguments } = ast.node(call) else {
        return None;
    };
    if matcher::identifier_name(ast, *callee).is_none() {
        return None;
    }
    if reference.is_some_and(|r| *callee != r) {
        return None;
    }
    let [target, callback] = arguments.as_slice() else {
        return None;
    };
    if !matches!(ast.node(*target), Node::This) {
        return None;
    }
    let Node::FunctionExpression { params, body, .. } = ast.node(*callback) else {
        return None;
    };
    params.is_empty().then_some(*body)
}

/// `var probe = guard(this, function () { return <call>; });`
fn self_defending(ast: &Ast, stmt: NodeId, reference: NodeId) -> Option<NodeId> {
    let (declarator, init) = var_declarator(ast, stmt)?;
    let body = guarded_callback(ast, init, Some(reference))?;
    let lone = matcher::lone_body_statement(ast, body)?;
    let Node::Return {
        argument: Some(argument),
    } = ast.node(lone)
    else {
        return None;
    };
    matches!(ast.node(*argument), Node::Call { .. }).then_some(declarator)
}

/// `guard(this, function () { <two RegExps, an engine bootstrap, a check> })();`
/// as a bare statement. Yields the engine function's name.
fn debug_protection<'a>(ast: &'a Ast, stmt: NodeId, reference: NodeId) -> Option<&'a str> {
    let Node::ExpressionStatement { expression } = ast.node(stmt) else {
        return None;
    };
    let Node::Call { callee, arguments } = ast.node(*expression) else {
        return None;
    };
    if !arguments.is_empty() {
        return None;
    }
    let body = guarded_callback(ast, *callee, Some(reference))?;
    let [probe_a, probe_b, bootstrap, check] = ast.statement_list(body)? else {
        return None;
    };
    if !is_regexp_declaration(ast, *probe_a) || !is_regexp_declaration(ast, *probe_b) {
        return None;
    }
    let (_, boot) = var_declarator(ast, *bootstrap)?;
    let Node::Call { callee, .. } = ast.node(boot) else {
        return None;
    };
    let engine = matcher::identifier_name(ast, *callee)?;
    let Node::If {
        test,
        consequent,
        alternate: Some(alternate),
    } = ast.node(*check)
    else {
        return None;
    };
    if !matches!(ast.node(*test), Node::Logical { .. })
        || !is_tripwire_branch(ast, *consequent)
        || !is_restart_branch(ast, *alternate)
    {
        return None;
    }
    Some(engine)
}

fn is_regexp_declaration(ast: &Ast, stmt: NodeId) -> bool {
    let Some((_, init)) = var_declarator(ast, stmt) else {
        return false;
    };
    matches!(ast.node(init), Node::New { callee, .. }
        if matcher::is_identifier_named(ast, *callee, "RegExp"))
}

/// `{ probe('0'); }`
fn is_tripwire_branch(ast: &Ast, block: NodeId) -> bool {
    let Some(lone) = matcher::lone_body_statement(ast, block) else {
        return false;
    };
    let Node::ExpressionStatement { expression } = ast.node(lone) else {
        return false;
    };
    let Node::Call { callee, arguments } = ast.node(*expression) else {
        return false;
    };
    if matcher::identifier_name(ast, *callee).is_none() {
        return false;
    }
    let [argument] = arguments.as_slice() else {
        return false;
    };
    matches!(matcher::string_value(ast, *argument), Some("0"))
}

/// `{ engine(); }`
fn is_restart_branch(ast: &Ast, block: NodeId) -> bool {
    let Some(lone) = matcher::lone_body_statement(ast, block) else {
        return false;
    };
    let Node::ExpressionStatement { expression } = ast.node(lone) else {
        return false;
    };
    matches!(ast.node(*expression), Node::Call { callee, arguments }
        if arguments.is_empty() && matcher::identifier_name(ast, *callee).is_some())
}

/// `var silencer = guard(this, function () { ... });` whose body captures a
/// global, lists console methods, and rebinds them in a loop.
fn console_disable(ast: &Ast, stmt: NodeId, reference: Option<NodeId>) -> Option<NodeId> {
    let (declarator, init) = var_declarator(ast, stmt)?;
    let body = guarded_callback(ast, init, reference)?;
    let [holder, capture, console, methods, install] = ast.statement_list(body)? else {
        return None;
    };
    if !is_uninitialized_declaration(ast, *holder)
        || !matches!(ast.node(*capture), Node::Try { .. })
        || !matches!(ast.node(*console), Node::VariableDeclaration { .. })
    {
        return None;
    }
    let (_, listed) = var_declarator(ast, *methods)?;
    if !matches!(ast.node(listed), Node::ArrayLiteral { .. }) {
        return None;
    }
    matches!(ast.node(*install), Node::For { .. }).then_some(declarator)
}

fn is_uninitialized_declaration(ast: &Ast, stmt: NodeId) -> bool {
    let Node::VariableDeclaration {
        kind: DeclKind::Var,
        declarations,
    } = ast.node(stmt)
    else {
        return false;
    };
    let [declarator] = declarations.as_slice() else {
        return false;
    };
    matches!(ast.node(*declarator), Node::Declarator { init: None, .. })
}

fn is_identifier_return(ast: &Ast, stmt: NodeId) -> bool {
    matches!(ast.node(stmt), Node::Return { argument: Some(argument) }
        if matcher::identifier_name(ast, *argument).is_some())
}
