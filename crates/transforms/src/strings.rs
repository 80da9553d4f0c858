//! Recovers strings hidden behind an encoded pool. The obfuscated layout is
//! a pool of encoded strings (a literal array or a memoized accessor
//! function), one or more decode wrappers indexing into it with a fixed
//! offset, and optionally a bootstrap IIFE that keeps shifting the pool until
//! an arithmetic probe settles on a shipped stop value. The pass replays all
//! of that machinery offline, folds every wrapper call down to the plain
//! string it produces, and deletes the pool, the wrappers, and the bootstrap.
//!
//! Replacement is all or nothing per pool: if a single call site will not
//! decode, the pool and every call site stay as they are.

mod decoder;
mod rotation;

use std::sync::LazyLock;

use alembic_core::ast::{BinaryOp, Node};
use alembic_core::printer::print_node;
use alembic_core::{matcher, Ast, NodeId};
use regex::Regex;
use rustc_hash::FxHashMap;
use tracing::debug;

use self::decoder::{DecodeArg, Decoder, DecoderKind};
use crate::{constant, Error, PassContext, Result, Transform};

/// Decodes pooled strings back into their call sites and unescapes string
/// literals that only exist to hide their text.
pub struct StringRevealer;

impl Transform for StringRevealer {
    fn name(&self) -> &'static str {
        "StringRevealer"
    }

    fn apply(&self, ast: &mut Ast, cx: &PassContext) -> Result<bool> {
        let mut changed = false;
        for node in ast.preorder(ast.root()) {
            if let Some(candidate) = pool_candidate(ast, node) {
                changed |= reveal_pool(ast, cx, candidate)?;
            } else if clear_escaped_raw(ast, node) {
                changed = true;
            }
        }
        Ok(changed)
    }
}

/// Drops the raw spelling of a literal whose escapes hide its value, so the
/// printer re-emits it as plain text.
fn clear_escaped_raw(ast: &mut Ast, node: NodeId) -> bool {
    let escaped = match ast.node(node) {
        Node::StringLiteral {
            value,
            raw: Some(raw),
        } => {
            let cleaned: String = raw.chars().filter(|c| *c != '\'' && *c != '"').collect();
            cleaned != *value
        }
        _ => false,
    };
    if escaped {
        if let Node::StringLiteral { raw, .. } = ast.node_mut(node) {
            *raw = None;
        }
    }
    escaped
}

#[derive(Clone, Copy)]
enum PoolSource {
    /// `var pool = ['...', ...]` with at least one entry.
    Direct(NodeId),
    /// A self-replacing accessor function closing over the array.
    Accessor(NodeId),
}

struct PoolCandidate {
    source: PoolSource,
    name: String,
    strings: Vec<String>,
}

fn pool_candidate(ast: &Ast, node: NodeId) -> Option<PoolCandidate> {
    match ast.node(node) {
        Node::Declarator {
            id,
            init: Some(init),
        } => {
            let name = matcher::identifier_name(ast, *id)?.to_string();
            let strings = literal_string_array(ast, *init)?;
            if strings.is_empty() {
                return None;
            }
            Some(PoolCandidate {
                source: PoolSource::Direct(node),
                name,
                strings,
            })
        }
        Node::FunctionDeclaration { id, body, .. } => {
            let name = matcher::identifier_name(ast, *id)?.to_string();
            let strings = accessor_pool_strings(ast, *body)?;
            Some(PoolCandidate {
                source: PoolSource::Accessor(node),
                name,
                strings,
            })
        }
        _ => None,
    }
}

fn literal_string_array(ast: &Ast, node: NodeId) -> Option<Vec<String>> {
    let Node::ArrayLiteral { elements } = ast.node(node) else {
        return None;
    };
    elements
        .iter()
        .map(|element| {
            element.and_then(|e| match ast.node(e) {
                Node::StringLiteral { value, .. } => Some(value.clone()),
                _ => None,
            })
        })
        .collect()
}

/// The memoized accessor the obfuscator emits around its pool: an array or
/// `'..'.split('..')` binding, a replacement closure returning it, and a call
/// through the replacement.
fn accessor_pool_strings(ast: &Ast, body: NodeId) -> Option<Vec<String>> {
    let [stored, install, dispatch] = ast.statement_list(body)? else {
        return None;
    };
    let (_, value) = matcher::named_value_statement(ast, *stored)?;
    let strings = literal_string_array(ast, value).or_else(|| split_pool_strings(ast, value))?;
    let (_, closure) = matcher::named_value_statement(ast, *install)?;
    if !returns_lone_identifier(ast, closure) || !is_return_of_bare_call(ast, *dispatch) {
        return None;
    }
    Some(strings)
}

fn split_pool_strings(ast: &Ast, node: NodeId) -> Option<Vec<String>> {
    let Node::Call { callee, arguments } = ast.node(node) else {
        return None;
    };
    let Node::Member {
        object, property, ..
    } = ast.node(*callee)
    else {
        return None;
    };
    if !matcher::is_identifier_named(ast, *property, "split") {
        return None;
    }
    let Node::StringLiteral { value: joined, .. } = ast.node(*object) else {
        return None;
    };
    let [separator] = arguments.as_slice() else {
        return None;
    };
    let Node::StringLiteral {
        value: separator, ..
    } = ast.node(*separator)
    else {
        return None;
    };
    Some(crate::control_flow::js_split(joined, separator))
}

fn returns_lone_identifier(ast: &Ast, closure: NodeId) -> bool {
    let Node::FunctionExpression { body, .. } = ast.node(closure) else {
        return false;
    };
    matches!(matcher::lone_body_statement(ast, *body), Some(lone) if is_identifier_return(ast, lone))
}

fn is_return_of_bare_call(ast: &Ast, stmt: NodeId) -> bool {
    matches!(ast.node(stmt), Node::Return { argument: Some(argument) }
        if is_bare_call(ast, *argument))
}

/// The rotation bootstrap: an IIFE handed the pool and a stop value, spinning
/// an endless loop around a guarded probe.
struct RotateCall {
    call: NodeId,
    rotator: NodeId,
    stop: f64,
}

fn reveal_pool(ast: &mut Ast, cx: &PassContext, candidate: PoolCandidate) -> Result<bool> {
    let (declaration, direct) = match candidate.source {
        PoolSource::Direct(declarator) => (declarator, true),
        PoolSource::Accessor(function) => (function, false),
    };
    let Some(binding) = cx.scopes.binding_for_declaration(declaration) else {
        return Ok(false);
    };

    // Every reference must be one of the three shapes the obfuscator emits;
    // anything else means the pool leaks and nothing can be touched.
    let mut wrappers: Vec<NodeId> = Vec::new();
    let mut decoders: Vec<Decoder> = Vec::new();
    let mut rotate: Option<RotateCall> = None;
    for &reference in &cx.scopes.binding(binding).references {
        if !direct && ast.is_within(reference, declaration) {
            continue;
        }
        let Some(parent) = ast.parent(reference) else {
            return Ok(false);
        };
        if matches!(ast.node(parent), Node::Call { callee, .. } if *callee == reference) {
            let Some(wrapper) = ast.function_parent(reference) else {
                debug!(pool = %candidate.name, "pool call outside any function");
                return Ok(false);
            };
            if wrappers.contains(&wrapper) {
                continue;
            }
            let Some(decoder) = call_wrapper_decoder(ast, wrapper, &candidate.name) else {
                debug!(pool = %candidate.name, "unrecognized pool call wrapper");
                return Ok(false);
            };
            wrappers.push(wrapper);
            decoders.push(decoder);
        } else if direct
            && matches!(ast.node(parent), Node::Member { object, .. } if *object == reference)
        {
            let Some(wrapper) = ast.function_parent(reference) else {
                debug!(pool = %candidate.name, "pool read outside any function");
                return Ok(false);
            };
            if wrappers.contains(&wrapper) {
                continue;
            }
            let Some(decoder) = direct_wrapper_decoder(ast, wrapper, &candidate.name) else {
                debug!(pool = %candidate.name, "unrecognized pool member wrapper");
                return Ok(false);
            };
            wrappers.push(wrapper);
            decoders.push(decoder);
        } else if matches!(ast.node(parent), Node::Call { arguments, .. } if arguments.contains(&reference))
        {
            let Some(call) = rotate_call(ast, parent, &candidate.name) else {
                debug!(pool = %candidate.name, "pool argument is not the rotation bootstrap");
                return Ok(false);
            };
            rotate = Some(call);
        } else {
            debug!(
                pool = %candidate.name,
                usage = ast.node(parent).kind_name(),
                "pool use defeats analysis"
            );
            return Ok(false);
        }
    }
    if wrappers.is_empty() {
        return Ok(false);
    }
    let mut wrapper_bindings = Vec::with_capacity(wrappers.len());
    for &wrapper in &wrappers {
        let Some(binding) = cx.scopes.binding_for_declaration(wrapper) else {
            debug!(pool = %candidate.name, "wrapper binding is unresolvable");
            return Ok(false);
        };
        wrapper_bindings.push(binding);
    }

    let mut pool = candidate.strings;
    if let Some(ref rotate) = rotate {
        let slots: FxHashMap<String, usize> = wrappers
            .iter()
            .enumerate()
            .filter_map(|(slot, &wrapper)| {
                wrapper_name(ast, wrapper).map(|name| (name.to_string(), slot))
            })
            .collect();
        let expression = rotation_expression(ast, rotate.rotator)?;
        let operation = rotation::parse_operation(ast, expression, &slots)?;
        rotation::rotate_pool(&mut pool, &operation, &mut decoders, rotate.stop)?;
    }

    // Decode every call site up front; a single failure keeps the tree as it
    // is so no call site is left pointing at a half-dismantled pool.
    let mut planned: Vec<(NodeId, String)> = Vec::new();
    let mut failed = false;
    for (slot, &wrapper) in wrappers.iter().enumerate() {
        for &reference in &cx.scopes.binding(wrapper_bindings[slot]).references {
            if ast.is_within(reference, wrapper) {
                continue;
            }
            if let Some(ref rotate) = rotate {
                if ast.is_within(reference, rotate.rotator) {
                    continue;
                }
            }
            let kind = decoders[slot].kind();
            match wrapper_call_args(ast, reference, kind) {
                Some((call, args)) => match decoders[slot].get_string(&pool, &args) {
                    Some(value) => planned.push((call, value)),
                    None => failed = true,
                },
                None => failed = true,
            }
        }
    }
    if failed {
        debug!(pool = %candidate.name, "undecodable call site keeps the pool");
        return Ok(false);
    }

    let replaced = planned.len();
    for (call, value) in planned {
        ast.replace(call, Node::StringLiteral { value, raw: None });
    }
    match candidate.source {
        PoolSource::Direct(declarator) => constant::remove_declarator(ast, declarator),
        PoolSource::Accessor(function) => constant::remove_statement(ast, function),
    }
    for &wrapper in &wrappers {
        constant::remove_statement(ast, wrapper);
    }
    if let Some(rotate) = rotate {
        if let Some(statement) = ast.statement_parent(rotate.call) {
            constant::remove_statement(ast, statement);
        }
    }
    debug!(
        pool = %candidate.name,
        wrappers = wrappers.len(),
        replaced,
        "string pool revealed"
    );
    Ok(true)
}

fn rotate_call(ast: &Ast, call: NodeId, pool_name: &str) -> Option<RotateCall> {
    let Node::Call { callee, arguments } = ast.node(call) else {
        return None;
    };
    let [pool_arg, stop_arg] = arguments.as_slice() else {
        return None;
    };
    if !matcher::is_identifier_named(ast, *pool_arg, pool_name) {
        return None;
    }
    let stop = matcher::number_value(ast, *stop_arg)?;
    let rotator = *callee;
    let Node::FunctionExpression { body, .. } = ast.node(rotator) else {
        return None;
    };
    let shape_ok = match ast.statement_list(*body)? {
        [lone] => is_rotation_for(ast, *lone) || is_endless_try_loop(ast, *lone),
        [setup, spin] => is_accessor_fetch_statement(ast, *setup) && is_endless_while(ast, *spin),
        _ => false,
    };
    shape_ok.then_some(RotateCall {
        call,
        rotator,
        stop,
    })
}

fn is_rotation_for(ast: &Ast, stmt: NodeId) -> bool {
    let Node::For {
        init: Some(init),
        test: Some(test),
        ..
    } = ast.node(stmt)
    else {
        return false;
    };
    let Some((_, value)) = matcher::named_value_node(ast, *init) else {
        return false;
    };
    is_bare_call(ast, value) && is_boolean_true(ast, *test)
}

fn is_accessor_fetch_statement(ast: &Ast, stmt: NodeId) -> bool {
    matches!(matcher::named_value_statement(ast, stmt), Some((_, value)) if is_bare_call(ast, value))
}

fn is_bare_call(ast: &Ast, node: NodeId) -> bool {
    matches!(ast.node(node), Node::Call { callee, arguments }
        if arguments.is_empty() && matcher::identifier_name(ast, *callee).is_some())
}

fn is_boolean_true(ast: &Ast, node: NodeId) -> bool {
    matches!(ast.node(node), Node::BooleanLiteral { value: true })
}

fn is_endless_while(ast: &Ast, stmt: NodeId) -> bool {
    matches!(ast.node(stmt), Node::While { test, .. } if is_boolean_true(ast, *test))
}

fn is_endless_try_loop(ast: &Ast, stmt: NodeId) -> bool {
    let Node::While { test, body } = ast.node(stmt) else {
        return false;
    };
    if !is_boolean_true(ast, *test) {
        return false;
    }
    matches!(matcher::lone_body_statement(ast, *body), Some(lone)
        if matches!(ast.node(lone), Node::Try { .. }))
}

/// Digs the probe expression out of the bootstrap: the last statement is the
/// loop, its body opens with a `try`, and the first statement of the `try`
/// block binds the probe.
fn rotation_expression(ast: &Ast, rotator: NodeId) -> Result<NodeId> {
    let failed = || Error::RotationExpression("rotation loop shape".to_string());
    let Node::FunctionExpression { body, .. } = ast.node(rotator) else {
        return Err(failed());
    };
    let statements = ast.statement_list(*body).ok_or_else(failed)?;
    let last = *statements.last().ok_or_else(failed)?;
    let loop_body = match ast.node(last) {
        Node::For { body, .. } | Node::While { body, .. } => *body,
        _ => return Err(failed()),
    };
    let first = ast
        .statement_list(loop_body)
        .and_then(|body| body.first().copied())
        .ok_or_else(failed)?;
    let Node::Try { block, .. } = ast.node(first) else {
        return Err(failed());
    };
    let probe = ast
        .statement_list(*block)
        .and_then(|body| body.first().copied())
        .ok_or_else(failed)?;
    let (_, value) = matcher::named_value_statement(ast, probe).ok_or_else(failed)?;
    Ok(value)
}

/// Recognizes the memoized call wrapper around an accessor pool: a fetch
/// through the accessor, a self-replacing closure that offsets the index and
/// reads one element, and a forwarding return. A three-statement closure is
/// a plain lookup; a longer one carries a decode shim that the wrapper's own
/// source text classifies.
fn call_wrapper_decoder(ast: &Ast, wrapper: NodeId, pool_name: &str) -> Option<Decoder> {
    let Node::FunctionDeclaration { body, .. } = ast.node(wrapper) else {
        return None;
    };
    let [fetch, install, dispatch] = ast.statement_list(*body)? else {
        return None;
    };
    let (_, fetched) = matcher::named_value_statement(ast, *fetch)?;
    if !is_accessor_call_of(ast, fetched, pool_name) || !is_forwarding_return(ast, *dispatch) {
        return None;
    }
    let (_, closure) = matcher::named_value_statement(ast, *install)?;
    let Node::FunctionExpression {
        body: closure_body, ..
    } = ast.node(closure)
    else {
        return None;
    };
    let inner = ast.statement_list(*closure_body)?;
    if let [offset_stmt, element, tail] = inner {
        let offset = offset_value(ast, *offset_stmt)?;
        if !is_element_lookup(ast, *element, None) || !is_identifier_return(ast, *tail) {
            return None;
        }
        return Some(Decoder::new(DecoderKind::Basic, offset));
    }
    if inner.len() < 4 {
        return None;
    }
    let offset = offset_value(ast, inner[0])?;
    if !is_element_lookup(ast, inner[1], None)
        || !matches!(ast.node(inner[2]), Node::If { .. })
        || !matches!(ast.node(inner[inner.len() - 2]), Node::If { .. })
        || !matches!(ast.node(inner[inner.len() - 1]), Node::Return { .. })
    {
        return None;
    }
    let kind = classify_decoder(ast, wrapper)?;
    Some(Decoder::new(kind, offset))
}

/// The wrapper form over a direct pool reads the array in place instead of
/// installing a closure, and always carries a decode shim.
fn direct_wrapper_decoder(ast: &Ast, wrapper: NodeId, pool_name: &str) -> Option<Decoder> {
    let Node::FunctionDeclaration { body, .. } = ast.node(wrapper) else {
        return None;
    };
    let statements = ast.statement_list(*body)?;
    if statements.len() < 6 {
        return None;
    }
    let length = statements.len();
    let offset = offset_value(ast, statements[0])?;
    if !is_element_lookup(ast, statements[1], Some(pool_name))
        || !matches!(ast.node(statements[2]), Node::If { .. })
        || !matches!(ast.node(statements[3]), Node::VariableDeclaration { .. })
        || !matches!(ast.node(statements[length - 2]), Node::If { .. })
        || !is_identifier_return(ast, statements[length - 1])
    {
        return None;
    }
    let kind = classify_decoder(ast, wrapper)?;
    Some(Decoder::new(kind, offset))
}

/// `i = i - 0x1f;` style index adjustment naming the wrapper's offset.
fn offset_value(ast: &Ast, stmt: NodeId) -> Option<f64> {
    let (_, value) = matcher::named_value_statement(ast, stmt)?;
    let Node::Binary { op, left, right } = ast.node(value) else {
        return None;
    };
    if matcher::identifier_name(ast, *left).is_none() {
        return None;
    }
    let amount = matcher::number_value(ast, *right)?;
    match op {
        BinaryOp::Add => Some(amount),
        BinaryOp::Sub => Some(-amount),
        _ => None,
    }
}

/// `var v = pool[i];` where the object either names the pool or any local.
fn is_element_lookup(ast: &Ast, stmt: NodeId, pool_name: Option<&str>) -> bool {
    let Some((_, value)) = matcher::named_value_statement(ast, stmt) else {
        return false;
    };
    let Node::Member {
        object, property, ..
    } = ast.node(value)
    else {
        return false;
    };
    let object_ok = match pool_name {
        Some(name) => matcher::is_identifier_named(ast, *object, name),
        None => matcher::identifier_name(ast, *object).is_some(),
    };
    object_ok && matcher::identifier_name(ast, *property).is_some()
}

fn is_accessor_call_of(ast: &Ast, value: NodeId, pool_name: &str) -> bool {
    matches!(ast.node(value), Node::Call { callee, arguments }
        if arguments.is_empty() && matcher::is_identifier_named(ast, *callee, pool_name))
}

fn is_forwarding_return(ast: &Ast, stmt: NodeId) -> bool {
    let Node::Return {
        argument: Some(argument),
    } = ast.node(stmt)
    else {
        return false;
    };
    let Node::Call { callee, arguments } = ast.node(*argument) else {
        return false;
    };
    matcher::identifier_name(ast, *callee).is_some()
        && arguments.len() == 2
        && arguments
            .iter()
            .all(|&a| matcher::identifier_name(ast, a).is_some())
}

fn is_identifier_return(ast: &Ast, stmt: NodeId) -> bool {
    matches!(ast.node(stmt), Node::Return { argument: Some(argument) }
        if matcher::identifier_name(ast, *argument).is_some())
}

fn wrapper_name(ast: &Ast, wrapper: NodeId) -> Option<&str> {
    match ast.node(wrapper) {
        Node::FunctionDeclaration { id, .. } => matcher::identifier_name(ast, *id),
        _ => None,
    }
}

/// Pins down a shim-carrying wrapper's encoding from its own source text.
/// The base64 shim always spells out its alphabet next to an `indexOf`, and
/// the rc4 shim adds the keystream XOR over `charCodeAt` on top of it.
fn classify_decoder(ast: &Ast, wrapper: NodeId) -> Option<DecoderKind> {
    static BASE64_SHIM: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r#"['"]abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789\+/=['"]\.indexOf"#,
        )
        .unwrap()
    });
    static RC4_SHIM: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"[a-zA-Z$_]?[a-zA-Z0-9$_]+\s?\+=\s?String\.fromCharCode\([a-zA-Z$_]?[a-zA-Z0-9$_]+\.charCodeAt\([a-zA-Z$_]?[a-zA-Z0-9$_]+\)\s?\^\s?[a-zA-Z$_]?[a-zA-Z0-9$_]+\[\([a-zA-Z$_]?[a-zA-Z0-9$_]+\[[a-zA-Z$_]?[a-zA-Z0-9$_]+\]\s?\+\s?[a-zA-Z$_]?[a-zA-Z0-9$_]+\[[a-zA-Z$_]?[a-zA-Z0-9$_]+\]\)\s?%\s?(?:256|0x100)\]\)",
        )
        .unwrap()
    });
    let source = print_node(ast, wrapper);
    if !BASE64_SHIM.is_match(&source) {
        return None;
    }
    Some(if RC4_SHIM.is_match(&source) {
        DecoderKind::Rc4
    } else {
        DecoderKind::Base64
    })
}

/// A replaceable call site: the wrapper as callee, a literal index first, and
/// for rc4 a literal key second.
fn wrapper_call_args(
    ast: &Ast,
    reference: NodeId,
    kind: DecoderKind,
) -> Option<(NodeId, Vec<DecodeArg>)> {
    let call = ast.parent(reference)?;
    let Node::Call { callee, arguments } = ast.node(call) else {
        return None;
    };
    if *callee != reference {
        return None;
    }
    let index = arguments
        .first()
        .and_then(|&a| matcher::number_value(ast, a))?;
    let args = match kind {
        DecoderKind::Rc4 => {
            if arguments.len() != 2 {
                return None;
            }
            let key = match ast.node(arguments[1]) {
                Node::StringLiteral { value, .. } => value.clone(),
                _ => return None,
            };
            vec![DecodeArg::Num(index), DecodeArg::Str(key)]
        }
        _ => {
            if arguments.len() > 2 {
                return None;
            }
            vec![DecodeArg::Num(index)]
        }
    };
    Some((call, args))
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
        let changed = StringRevealer.apply(&mut ast, &cx).unwrap();
        (changed, print(&ast))
    }

    fn run_err(source: &str) -> Error {
        let mut ast = parse(source).unwrap();
        let scopes = ScopeIndex::build(&ast);
        let config = Config::default();
        let cx = PassContext {
            scopes: &scopes,
            config: &config,
        };
        StringRevealer.apply(&mut ast, &cx).unwrap_err()
    }

    fn reprint(source: &str) -> String {
        print(&parse(source).unwrap())
    }

    const BASIC_POOL: &str = "
        function pool() {
            var data = ['alpha', 'beta', 'gamma'];
            pool = function () {
                return data;
            };
            return pool();
        }
        function decode(index, extra) {
            var values = pool();
            decode = function (i, u) {
                i = i - 1;
                var value = values[i];
                return value;
            };
            return decode(index, extra);
        }
    ";

    #[test]
    fn a_memoized_pool_with_basic_wrappers_inlines() {
        let source = format!("{BASIC_POOL}log(decode(1), decode(3));");
        let (changed, out) = run(&source);
        assert!(changed);
        assert_eq!(out, reprint("log('alpha', 'gamma');"));
    }

    #[test]
    fn a_split_pool_reads_like_an_array() {
        let source = "
            function pool() {
                var data = 'alpha|beta'.split('|');
                pool = function () {
                    return data;
                };
                return pool();
            }
            function decode(index, extra) {
                var values = pool();
                decode = function (i, u) {
                    i = i - 0;
                    var value = values[i];
                    return value;
                };
                return decode(index, extra);
            }
            log(decode(1));
        ";
        let (changed, out) = run(source);
        assert!(changed);
        assert_eq!(out, reprint("log('beta');"));
    }

    #[test]
    fn a_base64_wrapper_decodes_through_its_shim() {
        let source = "
            function pool() {
                var data = ['Agv5', 'y2fI'];
                pool = function () {
                    return data;
                };
                return pool();
            }
            function decode(index, extra) {
                var values = pool();
                decode = function (i, u) {
                    i = i - 0;
                    var encoded = values[i];
                    if (decode.ready === undefined) {
                        decode.convert = function (input) {
                            var folded = 'abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789+/='.indexOf(input);
                            return folded;
                        };
                        decode.ready = true;
                    }
                    var plain = decode.convert(encoded);
                    if (plain === undefined) {
                        plain = '';
                    }
                    return plain;
                };
                return decode(index, extra);
            }
            log(decode(0), decode(1));
        ";
        let (changed, out) = run(source);
        assert!(changed);
        assert_eq!(out, reprint("log('hey', 'cab');"));
    }

    #[test]
    fn an_rc4_wrapper_decodes_with_its_key() {
        let source = "
            function pool() {
                var data = ['WRVdSXBdQmozqmkVcSot'];
                pool = function () {
                    return data;
                };
                return pool();
            }
            function decode(index, key) {
                var values = pool();
                decode = function (i, k) {
                    i = i - 0;
                    var encoded = values[i];
                    if (decode.shim === undefined) {
                        decode.mix = function (input, pad) {
                            var s = [];
                            var seed = 'abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789+/='.indexOf(input);
                            var output = '';
                            for (var y = 0; y < input.length; y++) {
                                output += String.fromCharCode(input.charCodeAt(y) ^ pad[(s[y] + s[seed]) % 256]);
                            }
                            return output;
                        };
                        decode.shim = true;
                    }
                    var plain = decode.mix(encoded, k);
                    if (plain === undefined) {
                        plain = '';
                    }
                    return plain;
                };
                return decode(index, key);
            }
            log(decode(0, 'Key'));
        ";
        let (changed, out) = run(source);
        assert!(changed);
        assert_eq!(out, reprint("log('Plaintext');"));
    }

    #[test]
    fn a_direct_pool_feeds_a_member_wrapper() {
        let source = "
            var data = ['Agv5', 'y2fI'];
            function decode(index, extra) {
                index = index - 0;
                var encoded = data[index];
                if (decode.ready === undefined) {
                    decode.convert = function (input) {
                        var folded = 'abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789+/='.indexOf(input);
                        return folded;
                    };
                    decode.ready = true;
                }
                var plain = decode.convert(encoded);
                if (plain === undefined) {
                    plain = '';
                }
                return plain;
            }
            log(decode(0), decode(1));
        ";
        let (changed, out) = run(source);
        assert!(changed);
        assert_eq!(out, reprint("log('hey', 'cab');"));
    }

    const ROTATED_POOL: &str = "
        function pool() {
            var data = ['5', 'x', 'alpha'];
            pool = function () {
                return data;
            };
            return pool();
        }
        function decode(index, extra) {
            var values = pool();
            decode = function (i, u) {
                i = i - 0;
                var value = values[i];
                return value;
            };
            return decode(index, extra);
        }
    ";

    #[test]
    fn a_rotated_pool_settles_before_decoding() {
        // The probe misses once ('alpha' is not a number), shifts the pool,
        // then parses '5' and lands on the stop value.
        let source = format!(
            "{ROTATED_POOL}
            (function (get, target) {{
                var arr = get();
                while (true) {{
                    try {{
                        var probe = parseInt(decode(2)) + 1;
                        if (probe === target) {{
                            break;
                        }} else {{
                            arr.push(arr.shift());
                        }}
                    }} catch (e) {{
                        arr.push(arr.shift());
                    }}
                }}
            }})(pool, 6);
            log(decode(1));"
        );
        let (changed, out) = run(&source);
        assert!(changed);
        assert_eq!(out, reprint("log('alpha');"));
    }

    #[test]
    fn a_bitwise_rotation_probe_is_an_error() {
        let source = format!(
            "{ROTATED_POOL}
            (function (get, target) {{
                var arr = get();
                while (true) {{
                    try {{
                        var probe = parseInt(decode(2)) << 1;
                        if (probe === target) {{
                            break;
                        }} else {{
                            arr.push(arr.shift());
                        }}
                    }} catch (e) {{
                        arr.push(arr.shift());
                    }}
                }}
            }})(pool, 6);
            log(decode(1));"
        );
        assert!(matches!(run_err(&source), Error::RotationExpression(_)));
    }

    #[test]
    fn a_rotation_that_never_settles_is_fatal() {
        let source = "
            function pool() {
                var data = ['x', 'y', 'z'];
                pool = function () {
                    return data;
                };
                return pool();
            }
            function decode(index, extra) {
                var values = pool();
                decode = function (i, u) {
                    i = i - 0;
                    var value = values[i];
                    return value;
                };
                return decode(index, extra);
            }
            (function (get, target) {
                var arr = get();
                while (true) {
                    try {
                        var probe = parseInt(decode(0)) + 0;
                        if (probe === target) {
                            break;
                        } else {
                            arr.push(arr.shift());
                        }
                    } catch (e) {
                        arr.push(arr.shift());
                    }
                }
            })(pool, 9);
            log(decode(1));
        ";
        assert!(matches!(run_err(source), Error::RotationBudget));
    }

    #[test]
    fn an_out_of_range_call_keeps_the_pool() {
        let source = format!("{BASIC_POOL}log(decode(1), decode(9));");
        let (changed, out) = run(&source);
        assert!(!changed);
        assert_eq!(out, reprint(&source));
    }

    #[test]
    fn a_stray_pool_use_defeats_the_pass() {
        let source = format!("{BASIC_POOL}keep(pool);\nlog(decode(1));");
        let (changed, out) = run(&source);
        assert!(!changed);
        assert_eq!(out, reprint(&source));
    }

    #[test]
    fn escaped_literals_reprint_from_their_value() {
        let (changed, out) = run("x = '\\x68\\x65\\x79';");
        assert!(changed);
        assert_eq!(out, reprint("x = 'hey';"));

        let (changed, out) = run("y = 'plain';");
        assert!(!changed);
        assert_eq!(out, reprint("y = 'plain';"));
    }
}
