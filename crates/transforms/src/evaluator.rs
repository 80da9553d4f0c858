//! Compile-time model of the values constant folding can produce.
//!
//! Folding only fires on expressions whose operands are statically known, so
//! the model covers primitives plus the two empty-container literals
//! obfuscators lean on for coercion tricks (`[] + []`, `+{}`). Every
//! operation mirrors the language's coercion rules exactly; where the result
//! would depend on runtime state the operation declines instead of guessing.

use alembic_core::ast::{BinaryOp, Node, UnaryOp};
use alembic_core::printer::js_number;
use alembic_core::{Ast, NodeId};

/// A statically known value.
#[derive(Clone, PartialEq, Debug)]
pub enum JsValue {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    /// An `[]` literal. Kept distinct from primitives because equality treats
    /// every evaluation as a fresh object.
    EmptyArray,
    /// A `{}` literal.
    EmptyObject,
}

impl JsValue {
    pub fn is_truthy(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Bool(b) => *b,
            JsValue::Num(n) => *n != 0.0 && !n.is_nan(),
            JsValue::Str(s) => !s.is_empty(),
            JsValue::EmptyArray | JsValue::EmptyObject => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            JsValue::Undefined => f64::NAN,
            JsValue::Null => 0.0,
            JsValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            JsValue::Num(n) => *n,
            JsValue::Str(s) => string_to_number(s),
            JsValue::EmptyArray => 0.0,
            JsValue::EmptyObject => f64::NAN,
        }
    }

    pub fn to_string_value(&self) -> String {
        match self {
            JsValue::Undefined => "undefined".to_string(),
            JsValue::Null => "null".to_string(),
            JsValue::Bool(b) => b.to_string(),
            JsValue::Num(n) => js_number(*n),
            JsValue::Str(s) => s.clone(),
            JsValue::EmptyArray => String::new(),
            JsValue::EmptyObject => "[object Object]".to_string(),
        }
    }

    /// ToPrimitive. The two container values stringify; primitives pass
    /// through.
    fn to_primitive(&self) -> JsValue {
        match self {
            JsValue::EmptyArray | JsValue::EmptyObject => JsValue::Str(self.to_string_value()),
            other => other.clone(),
        }
    }

    fn is_object(&self) -> bool {
        matches!(self, JsValue::EmptyArray | JsValue::EmptyObject)
    }

    fn type_of(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null | JsValue::EmptyArray | JsValue::EmptyObject => "object",
            JsValue::Bool(_) => "boolean",
            JsValue::Num(_) => "number",
            JsValue::Str(_) => "string",
        }
    }
}

/// `Number(string)`: whitespace-trimmed, radix-prefixed or decimal, else NaN.
fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(digits) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return radix_to_number(digits, 16.0);
    }
    if let Some(digits) = trimmed
        .strip_prefix("0o")
        .or_else(|| trimmed.strip_prefix("0O"))
    {
        return radix_to_number(digits, 8.0);
    }
    if let Some(digits) = trimmed
        .strip_prefix("0b")
        .or_else(|| trimmed.strip_prefix("0B"))
    {
        return radix_to_number(digits, 2.0);
    }
    let (sign, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    if body == "Infinity" {
        return sign * f64::INFINITY;
    }
    if !is_decimal_literal(body) {
        return f64::NAN;
    }
    match body.parse::<f64>() {
        Ok(n) => sign * n,
        Err(_) => f64::NAN,
    }
}

/// `digits? (. digits?)? ([eE] sign? digits)?` with at least one digit before
/// the exponent. Keeps Rust's float parser from accepting spellings like
/// `inf` that the language rejects.
fn is_decimal_literal(body: &str) -> bool {
    let bytes = body.as_bytes();
    let mut i = 0;
    let mut digits = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        digits += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return false;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let mut exp_digits = 0;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            exp_digits += 1;
        }
        if exp_digits == 0 {
            return false;
        }
    }
    i == bytes.len()
}

fn radix_to_number(digits: &str, radix: f64) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    let mut value = 0.0;
    for c in digits.chars() {
        let Some(d) = c.to_digit(radix as u32) else {
            return f64::NAN;
        };
        value = value * radix + d as f64;
    }
    value
}

pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() || n == 0.0 {
        return 0;
    }
    n.trunc().rem_euclid(4294967296.0) as u32
}

pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// Abstract loose equality.
fn loose_eq(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::Undefined | JsValue::Null, JsValue::Undefined | JsValue::Null) => true,
        (JsValue::Undefined | JsValue::Null, _) | (_, JsValue::Undefined | JsValue::Null) => false,
        (JsValue::Num(a), JsValue::Num(b)) => a == b,
        (JsValue::Str(a), JsValue::Str(b)) => a == b,
        (JsValue::Bool(_), _) => loose_eq(&JsValue::Num(left.to_number()), right),
        (_, JsValue::Bool(_)) => loose_eq(left, &JsValue::Num(right.to_number())),
        (JsValue::Num(_), JsValue::Str(_)) | (JsValue::Str(_), JsValue::Num(_)) => {
            left.to_number() == right.to_number()
        }
        // Two container literals are always distinct objects.
        (a, b) if a.is_object() && b.is_object() => false,
        (a, b) if a.is_object() => loose_eq(&a.to_primitive(), b),
        (a, b) => loose_eq(a, &b.to_primitive()),
    }
}

/// Strict equality. Container literals never equal anything, themselves
/// included, because each evaluation yields a fresh object.
fn strict_eq(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::Undefined, JsValue::Undefined) | (JsValue::Null, JsValue::Null) => true,
        (JsValue::Bool(a), JsValue::Bool(b)) => a == b,
        (JsValue::Num(a), JsValue::Num(b)) => a == b,
        (JsValue::Str(a), JsValue::Str(b)) => a == b,
        _ => false,
    }
}

/// Relational comparison after ToPrimitive: two strings compare by UTF-16
/// code unit, anything else numerically with NaN poisoning the result.
fn relational(op: BinaryOp, left: &JsValue, right: &JsValue) -> bool {
    let (lp, rp) = (left.to_primitive(), right.to_primitive());
    if let (JsValue::Str(a), JsValue::Str(b)) = (&lp, &rp) {
        let ordering = a.encode_utf16().cmp(b.encode_utf16());
        return match op {
            BinaryOp::Lt => ordering.is_lt(),
            BinaryOp::LtEq => ordering.is_le(),
            BinaryOp::Gt => ordering.is_gt(),
            BinaryOp::GtEq => ordering.is_ge(),
            _ => unreachable!(),
        };
    }
    let (a, b) = (lp.to_number(), rp.to_number());
    if a.is_nan() || b.is_nan() {
        return false;
    }
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::LtEq => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::GtEq => a >= b,
        _ => unreachable!(),
    }
}

/// Evaluates a binary operator over known operands. `in` and `instanceof`
/// need live objects and always decline.
pub fn binary(op: BinaryOp, left: &JsValue, right: &JsValue) -> Option<JsValue> {
    let value = match op {
        BinaryOp::Add => {
            let (lp, rp) = (left.to_primitive(), right.to_primitive());
            if matches!(lp, JsValue::Str(_)) || matches!(rp, JsValue::Str(_)) {
                JsValue::Str(format!("{}{}", lp.to_string_value(), rp.to_string_value()))
            } else {
                JsValue::Num(lp.to_number() + rp.to_number())
            }
        }
        BinaryOp::Sub => JsValue::Num(left.to_number() - right.to_number()),
        BinaryOp::Mul => JsValue::Num(left.to_number() * right.to_number()),
        BinaryOp::Div => JsValue::Num(left.to_number() / right.to_number()),
        BinaryOp::Mod => JsValue::Num(left.to_number() % right.to_number()),
        BinaryOp::Exp => {
            let (base, exp) = (left.to_number(), right.to_number());
            // Math.pow diverges from IEEE powf here: 1 ** Infinity is NaN.
            if base.abs() == 1.0 && exp.is_infinite() {
                JsValue::Num(f64::NAN)
            } else {
                JsValue::Num(base.powf(exp))
            }
        }
        BinaryOp::Shl => {
            let count = to_uint32(right.to_number()) & 31;
            JsValue::Num(to_int32(left.to_number()).wrapping_shl(count) as f64)
        }
        BinaryOp::Shr => {
            let count = to_uint32(right.to_number()) & 31;
            JsValue::Num((to_int32(left.to_number()) >> count) as f64)
        }
        BinaryOp::UShr => {
            let count = to_uint32(right.to_number()) & 31;
            JsValue::Num((to_uint32(left.to_number()) >> count) as f64)
        }
        BinaryOp::BitOr => {
            JsValue::Num((to_int32(left.to_number()) | to_int32(right.to_number())) as f64)
        }
        BinaryOp::BitXor => {
            JsValue::Num((to_int32(left.to_number()) ^ to_int32(right.to_number())) as f64)
        }
        BinaryOp::BitAnd => {
            JsValue::Num((to_int32(left.to_number()) & to_int32(right.to_number())) as f64)
        }
        BinaryOp::EqEq => JsValue::Bool(loose_eq(left, right)),
        BinaryOp::NotEq => JsValue::Bool(!loose_eq(left, right)),
        BinaryOp::EqEqEq => JsValue::Bool(strict_eq(left, right)),
        BinaryOp::NotEqEq => JsValue::Bool(!strict_eq(left, right)),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            JsValue::Bool(relational(op, left, right))
        }
        BinaryOp::In | BinaryOp::InstanceOf => return None,
    };
    Some(value)
}

/// Evaluates a unary operator over a known operand. `delete` declines.
pub fn unary(op: UnaryOp, operand: &JsValue) -> Option<JsValue> {
    let value = match op {
        UnaryOp::Minus => JsValue::Num(-operand.to_number()),
        UnaryOp::Plus => JsValue::Num(operand.to_number()),
        UnaryOp::Not => JsValue::Bool(!operand.is_truthy()),
        UnaryOp::BitNot => JsValue::Num(!to_int32(operand.to_number()) as f64),
        UnaryOp::TypeOf => JsValue::Str(operand.type_of().to_string()),
        UnaryOp::Void => JsValue::Undefined,
        UnaryOp::Delete => return None,
    };
    Some(value)
}

/// Recursively evaluates `node` to a value when every leaf is statically
/// known. Templates and regexes stay unresolved, as does any identifier
/// other than the `undefined` global.
pub fn resolve(ast: &Ast, node: NodeId) -> Option<JsValue> {
    match ast.node(node) {
        Node::StringLiteral { value, .. } => Some(JsValue::Str(value.clone())),
        Node::NumberLiteral { value } => Some(JsValue::Num(*value)),
        Node::BooleanLiteral { value } => Some(JsValue::Bool(*value)),
        Node::NullLiteral => Some(JsValue::Null),
        Node::Identifier { name } if name == "undefined" => Some(JsValue::Undefined),
        Node::ArrayLiteral { elements } if elements.is_empty() => Some(JsValue::EmptyArray),
        Node::ObjectLiteral { properties } if properties.is_empty() => Some(JsValue::EmptyObject),
        Node::Unary { op, argument } => unary(*op, &resolve(ast, *argument)?),
        Node::Binary { op, left, right } => {
            binary(*op, &resolve(ast, *left)?, &resolve(ast, *right)?)
        }
        _ => None,
    }
}

/// Builds a literal node for `n`, spelling negatives (and NaN) as a unary
/// minus over the magnitude the way source text does.
pub fn number_to_node(ast: &mut Ast, n: f64) -> NodeId {
    if n >= 0.0 {
        ast.add(Node::NumberLiteral { value: n })
    } else {
        let magnitude = ast.add(Node::NumberLiteral { value: -n });
        ast.add(Node::Unary {
            op: UnaryOp::Minus,
            argument: magnitude,
        })
    }
}

/// Materializes a value as a fresh expression node. Null and the container
/// values decline; no operator can produce them, so a caller asking is a
/// shape this model does not cover.
pub fn value_to_node(ast: &mut Ast, value: &JsValue) -> Option<NodeId> {
    match value {
        JsValue::Str(s) => Some(ast.add(Node::StringLiteral {
            value: s.clone(),
            raw: None,
        })),
        JsValue::Num(n) => Some(number_to_node(ast, *n)),
        JsValue::Bool(b) => Some(ast.add(Node::BooleanLiteral { value: *b })),
        JsValue::Undefined => Some(ast.add(Node::Identifier {
            name: "undefined".to_string(),
        })),
        JsValue::Null | JsValue::EmptyArray | JsValue::EmptyObject => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alembic_core::parser::parse;

    fn eval(source: &str) -> Option<JsValue> {
        let ast = parse(source).unwrap();
        let Node::Program { body } = ast.node(ast.root()) else {
            panic!();
        };
        let Node::ExpressionStatement { expression } = ast.node(body[0]) else {
            panic!();
        };
        resolve(&ast, *expression)
    }

    #[test]
    fn string_coercion_matches_the_language() {
        assert_eq!(string_to_number("0x10"), 16.0);
        assert_eq!(string_to_number("  12 "), 12.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("Infinity"), f64::INFINITY);
        assert_eq!(string_to_number("-.5"), -0.5);
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("12px").is_nan());
        assert!(string_to_number("1e").is_nan());
    }

    #[test]
    fn int32_wraps() {
        assert_eq!(to_int32(2147483648.0), -2147483648);
        assert_eq!(to_int32(-1.0), -1);
        assert_eq!(to_int32(f64::NAN), 0);
        assert_eq!(to_uint32(-1.0), 4294967295);
    }

    #[test]
    fn equality_families_disagree_where_they_should() {
        assert_eq!(eval("null == undefined;"), Some(JsValue::Bool(true)));
        assert_eq!(eval("null === undefined;"), Some(JsValue::Bool(false)));
        assert_eq!(eval("'1' == 1;"), Some(JsValue::Bool(true)));
        assert_eq!(eval("[] == [];"), Some(JsValue::Bool(false)));
        assert_eq!(eval("[] == '';"), Some(JsValue::Bool(true)));
    }

    #[test]
    fn coercion_tricks_fold() {
        assert_eq!(eval("[] + [];"), Some(JsValue::Str(String::new())));
        assert_eq!(
            eval("[] + {};"),
            Some(JsValue::Str("[object Object]".to_string()))
        );
        assert_eq!(eval("1 + '2';"), Some(JsValue::Str("12".to_string())));
        assert_eq!(eval("'10' < '9';"), Some(JsValue::Bool(true)));
        assert_eq!(eval("-1 >>> 0;"), Some(JsValue::Num(4294967295.0)));
        assert_eq!(
            eval("typeof void 0;"),
            Some(JsValue::Str("undefined".to_string()))
        );
    }

    #[test]
    fn pow_keeps_the_library_divergence() {
        let JsValue::Num(n) = eval("(-1) ** (1 / 0);").unwrap() else {
            panic!();
        };
        assert!(n.is_nan());
    }

    #[test]
    fn unknown_identifiers_stay_unresolved() {
        assert_eq!(eval("x + 1;"), None);
        assert_eq!(eval("1 in [];"), None);
    }
}
