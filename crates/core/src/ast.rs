//! Arena-backed mutable syntax tree.
//!
//! Nodes live in one slot vector addressed by [`NodeId`] handles. A handle
//! stays valid for the life of the tree; a rewrite overwrites a slot in place
//! and re-parents the children of the incoming node, so replaced subtrees
//! simply become unreachable from the root instead of being freed. Statements,
//! expressions, and support shapes (declarators, properties, switch cases,
//! catch clauses) all share the single [`Node`] enum, which keeps traversal,
//! replacement, and cloning uniform across every pass.

use std::mem;

/// Stable handle to a node slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Declaration keyword of a variable statement.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

impl DeclKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeclKind::Var => "var",
            DeclKind::Let => "let",
            DeclKind::Const => "const",
        }
    }
}

/// Unary operators.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    BitNot,
    TypeOf,
    Void,
    Delete,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Minus => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::TypeOf => "typeof",
            UnaryOp::Void => "void",
            UnaryOp::Delete => "delete",
        }
    }

    /// Word operators need a space before their operand.
    pub fn is_word(self) -> bool {
        matches!(self, UnaryOp::TypeOf | UnaryOp::Void | UnaryOp::Delete)
    }
}

/// Prefix/postfix update operators.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

impl UpdateOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateOp::Increment => "++",
            UpdateOp::Decrement => "--",
        }
    }
}

/// Binary operators.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BinaryOp {
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Shl,
    Shr,
    UShr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    BitOr,
    BitXor,
    BitAnd,
    In,
    InstanceOf,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::EqEq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::EqEqEq => "===",
            BinaryOp::NotEqEq => "!==",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Exp => "**",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::In => "in",
            BinaryOp::InstanceOf => "instanceof",
        }
    }
}

/// Logical operators.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
        }
    }
}

/// Assignment operators.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    ExpAssign,
    ShlAssign,
    ShrAssign,
    UShrAssign,
    BitOrAssign,
    BitXorAssign,
    BitAndAssign,
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
            AssignOp::ModAssign => "%=",
            AssignOp::ExpAssign => "**=",
            AssignOp::ShlAssign => "<<=",
            AssignOp::ShrAssign => ">>=",
            AssignOp::UShrAssign => ">>>=",
            AssignOp::BitOrAssign => "|=",
            AssignOp::BitXorAssign => "^=",
            AssignOp::BitAndAssign => "&=",
        }
    }
}

/// A syntax tree node. One enum covers statements, expressions, and the
/// support shapes that only occur inside specific parents.
#[derive(Clone, PartialEq, Debug)]
pub enum Node {
    Program {
        body: Vec<NodeId>,
    },

    // Statements
    VariableDeclaration {
        kind: DeclKind,
        declarations: Vec<NodeId>,
    },
    FunctionDeclaration {
        id: NodeId,
        params: Vec<NodeId>,
        body: NodeId,
    },
    ExpressionStatement {
        expression: NodeId,
    },
    Block {
        body: Vec<NodeId>,
    },
    If {
        test: NodeId,
        consequent: NodeId,
        alternate: Option<NodeId>,
    },
    For {
        init: Option<NodeId>,
        test: Option<NodeId>,
        update: Option<NodeId>,
        body: NodeId,
    },
    ForIn {
        left: NodeId,
        right: NodeId,
        body: NodeId,
    },
    While {
        test: NodeId,
        body: NodeId,
    },
    DoWhile {
        body: NodeId,
        test: NodeId,
    },
    Return {
        argument: Option<NodeId>,
    },
    Break,
    Continue,
    Switch {
        discriminant: NodeId,
        cases: Vec<NodeId>,
    },
    Try {
        block: NodeId,
        handler: Option<NodeId>,
        finalizer: Option<NodeId>,
    },
    Throw {
        argument: NodeId,
    },
    Empty,
    Debugger,

    // Support shapes
    Declarator {
        id: NodeId,
        init: Option<NodeId>,
    },
    SwitchCase {
        test: Option<NodeId>,
        consequent: Vec<NodeId>,
    },
    CatchClause {
        param: Option<NodeId>,
        body: NodeId,
    },
    Property {
        key: NodeId,
        value: NodeId,
        computed: bool,
        shorthand: bool,
    },

    // Expressions
    Identifier {
        name: String,
    },
    StringLiteral {
        value: String,
        /// Original source slice (quotes included) when it contained escapes;
        /// the printer prefers it over re-escaping `value`.
        raw: Option<String>,
    },
    NumberLiteral {
        value: f64,
    },
    BooleanLiteral {
        value: bool,
    },
    NullLiteral,
    RegexLiteral {
        pattern: String,
        flags: String,
    },
    TemplateLiteral {
        /// Cooked text chunks; always `expressions.len() + 1` entries.
        quasis: Vec<String>,
        expressions: Vec<NodeId>,
    },
    ArrayLiteral {
        elements: Vec<Option<NodeId>>,
    },
    ObjectLiteral {
        properties: Vec<NodeId>,
    },
    FunctionExpression {
        id: Option<NodeId>,
        params: Vec<NodeId>,
        body: NodeId,
    },
    ArrowFunction {
        params: Vec<NodeId>,
        /// Either a [`Node::Block`] or a bare expression body.
        body: NodeId,
    },
    Unary {
        op: UnaryOp,
        argument: NodeId,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        argument: NodeId,
    },
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    Logical {
        op: LogicalOp,
        left: NodeId,
        right: NodeId,
    },
    Assignment {
        op: AssignOp,
        left: NodeId,
        right: NodeId,
    },
    Conditional {
        test: NodeId,
        consequent: NodeId,
        alternate: NodeId,
    },
    Call {
        callee: NodeId,
        arguments: Vec<NodeId>,
    },
    New {
        callee: NodeId,
        arguments: Vec<NodeId>,
    },
    Member {
        object: NodeId,
        property: NodeId,
        computed: bool,
    },
    Sequence {
        expressions: Vec<NodeId>,
    },
    This,
}

impl Node {
    /// Variant name, for log lines.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Program { .. } => "Program",
            Node::VariableDeclaration { .. } => "VariableDeclaration",
            Node::FunctionDeclaration { .. } => "FunctionDeclaration",
            Node::ExpressionStatement { .. } => "ExpressionStatement",
            Node::Block { .. } => "Block",
            Node::If { .. } => "If",
            Node::For { .. } => "For",
            Node::ForIn { .. } => "ForIn",
            Node::While { .. } => "While",
            Node::DoWhile { .. } => "DoWhile",
            Node::Return { .. } => "Return",
            Node::Break => "Break",
            Node::Continue => "Continue",
            Node::Switch { .. } => "Switch",
            Node::Try { .. } => "Try",
            Node::Throw { .. } => "Throw",
            Node::Empty => "Empty",
            Node::Debugger => "Debugger",
            Node::Declarator { .. } => "Declarator",
            Node::SwitchCase { .. } => "SwitchCase",
            Node::CatchClause { .. } => "CatchClause",
            Node::Property { .. } => "Property",
            Node::Identifier { .. } => "Identifier",
            Node::StringLiteral { .. } => "StringLiteral",
            Node::NumberLiteral { .. } => "NumberLiteral",
            Node::BooleanLiteral { .. } => "BooleanLiteral",
            Node::NullLiteral => "NullLiteral",
            Node::RegexLiteral { .. } => "RegexLiteral",
            Node::TemplateLiteral { .. } => "TemplateLiteral",
            Node::ArrayLiteral { .. } => "ArrayLiteral",
            Node::ObjectLiteral { .. } => "ObjectLiteral",
            Node::FunctionExpression { .. } => "FunctionExpression",
            Node::ArrowFunction { .. } => "ArrowFunction",
            Node::Unary { .. } => "Unary",
            Node::Update { .. } => "Update",
            Node::Binary { .. } => "Binary",
            Node::Logical { .. } => "Logical",
            Node::Assignment { .. } => "Assignment",
            Node::Conditional { .. } => "Conditional",
            Node::Call { .. } => "Call",
            Node::New { .. } => "New",
            Node::Member { .. } => "Member",
            Node::Sequence { .. } => "Sequence",
            Node::This => "This",
        }
    }

    /// Whether this node stands in statement position.
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            Node::VariableDeclaration { .. }
                | Node::FunctionDeclaration { .. }
                | Node::ExpressionStatement { .. }
                | Node::Block { .. }
                | Node::If { .. }
                | Node::For { .. }
                | Node::ForIn { .. }
                | Node::While { .. }
                | Node::DoWhile { .. }
                | Node::Return { .. }
                | Node::Break
                | Node::Continue
                | Node::Switch { .. }
                | Node::Try { .. }
                | Node::Throw { .. }
                | Node::Empty
                | Node::Debugger
        )
    }

    /// Whether this node introduces a function body (and a scope).
    pub fn is_function(&self) -> bool {
        matches!(
            self,
            Node::FunctionDeclaration { .. }
                | Node::FunctionExpression { .. }
                | Node::ArrowFunction { .. }
        )
    }

    /// Appends every child handle in source order.
    fn collect_children(&self, out: &mut Vec<NodeId>) {
        match self {
            Node::Program { body } | Node::Block { body } => out.extend(body),
            Node::VariableDeclaration { declarations, .. } => out.extend(declarations),
            Node::FunctionDeclaration { id, params, body } => {
                out.push(*id);
                out.extend(params);
                out.push(*body);
            }
            Node::ExpressionStatement { expression } => out.push(*expression),
            Node::If {
                test,
                consequent,
                alternate,
            } => {
                out.push(*test);
                out.push(*consequent);
                out.extend(alternate);
            }
            Node::For {
                init,
                test,
                update,
                body,
            } => {
                out.extend(init);
                out.extend(test);
                out.extend(update);
                out.push(*body);
            }
            Node::ForIn { left, right, body } => {
                out.push(*left);
                out.push(*right);
                out.push(*body);
            }
            Node::While { test, body } => {
                out.push(*test);
                out.push(*body);
            }
            Node::DoWhile { body, test } => {
                out.push(*body);
                out.push(*test);
            }
            Node::Return { argument } => out.extend(argument),
            Node::Switch { discriminant, cases } => {
                out.push(*discriminant);
                out.extend(cases);
            }
            Node::Try {
                block,
                handler,
                finalizer,
            } => {
                out.push(*block);
                out.extend(handler);
                out.extend(finalizer);
            }
            Node::Throw { argument } => out.push(*argument),
            Node::Declarator { id, init } => {
                out.push(*id);
                out.extend(init);
            }
            Node::SwitchCase { test, consequent } => {
                out.extend(test);
                out.extend(consequent);
            }
            Node::CatchClause { param, body } => {
                out.extend(param);
                out.push(*body);
            }
            Node::Property { key, value, .. } => {
                out.push(*key);
                out.push(*value);
            }
            Node::TemplateLiteral { expressions, .. } => out.extend(expressions),
            Node::ArrayLiteral { elements } => out.extend(elements.iter().flatten()),
            Node::ObjectLiteral { properties } => out.extend(properties),
            Node::FunctionExpression { id, params, body } => {
                out.extend(id);
                out.extend(params);
                out.push(*body);
            }
            Node::ArrowFunction { params, body } => {
                out.extend(params);
                out.push(*body);
            }
            Node::Unary { argument, .. } | Node::Update { argument, .. } => out.push(*argument),
            Node::Binary { left, right, .. }
            | Node::Logical { left, right, .. }
            | Node::Assignment { left, right, .. } => {
                out.push(*left);
                out.push(*right);
            }
            Node::Conditional {
                test,
                consequent,
                alternate,
            } => {
                out.push(*test);
                out.push(*consequent);
                out.push(*alternate);
            }
            Node::Call { callee, arguments } | Node::New { callee, arguments } => {
                out.push(*callee);
                out.extend(arguments);
            }
            Node::Member { object, property, .. } => {
                out.push(*object);
                out.push(*property);
            }
            Node::Sequence { expressions } => out.extend(expressions),
            Node::Identifier { .. }
            | Node::StringLiteral { .. }
            | Node::NumberLiteral { .. }
            | Node::BooleanLiteral { .. }
            | Node::NullLiteral
            | Node::RegexLiteral { .. }
            | Node::This
            | Node::Break
            | Node::Continue
            | Node::Empty
            | Node::Debugger => {}
        }
    }

    /// Applies `f` to every embedded child handle.
    fn for_each_child_mut(&mut self, mut f: impl FnMut(&mut NodeId)) {
        match self {
            Node::Program { body } | Node::Block { body } => body.iter_mut().for_each(&mut f),
            Node::VariableDeclaration { declarations, .. } => {
                declarations.iter_mut().for_each(&mut f)
            }
            Node::FunctionDeclaration { id, params, body } => {
                f(id);
                params.iter_mut().for_each(&mut f);
                f(body);
            }
            Node::ExpressionStatement { expression } => f(expression),
            Node::If {
                test,
                consequent,
                alternate,
            } => {
                f(test);
                f(consequent);
                alternate.iter_mut().for_each(&mut f);
            }
            Node::For {
                init,
                test,
                update,
                body,
            } => {
                init.iter_mut().for_each(&mut f);
                test.iter_mut().for_each(&mut f);
                update.iter_mut().for_each(&mut f);
                f(body);
            }
            Node::ForIn { left, right, body } => {
                f(left);
                f(right);
                f(body);
            }
            Node::While { test, body } => {
                f(test);
                f(body);
            }
            Node::DoWhile { body, test } => {
                f(body);
                f(test);
            }
            Node::Return { argument } => argument.iter_mut().for_each(&mut f),
            Node::Switch { discriminant, cases } => {
                f(discriminant);
                cases.iter_mut().for_each(&mut f);
            }
            Node::Try {
                block,
                handler,
                finalizer,
            } => {
                f(block);
                handler.iter_mut().for_each(&mut f);
                finalizer.iter_mut().for_each(&mut f);
            }
            Node::Throw { argument } => f(argument),
            Node::Declarator { id, init } => {
                f(id);
                init.iter_mut().for_each(&mut f);
            }
            Node::SwitchCase { test, consequent } => {
                test.iter_mut().for_each(&mut f);
                consequent.iter_mut().for_each(&mut f);
            }
            Node::CatchClause { param, body } => {
                param.iter_mut().for_each(&mut f);
                f(body);
            }
            Node::Property { key, value, .. } => {
                f(key);
                f(value);
            }
            Node::TemplateLiteral { expressions, .. } => expressions.iter_mut().for_each(&mut f),
            Node::ArrayLiteral { elements } => {
                elements.iter_mut().flatten().for_each(&mut f)
            }
            Node::ObjectLiteral { properties } => properties.iter_mut().for_each(&mut f),
            Node::FunctionExpression { id, params, body } => {
                id.iter_mut().for_each(&mut f);
                params.iter_mut().for_each(&mut f);
                f(body);
            }
            Node::ArrowFunction { params, body } => {
                params.iter_mut().for_each(&mut f);
                f(body);
            }
            Node::Unary { argument, .. } | Node::Update { argument, .. } => f(argument),
            Node::Binary { left, right, .. }
            | Node::Logical { left, right, .. }
            | Node::Assignment { left, right, .. } => {
                f(left);
                f(right);
            }
            Node::Conditional {
                test,
                consequent,
                alternate,
            } => {
                f(test);
                f(consequent);
                f(alternate);
            }
            Node::Call { callee, arguments } | Node::New { callee, arguments } => {
                f(callee);
                arguments.iter_mut().for_each(&mut f);
            }
            Node::Member { object, property, .. } => {
                f(object);
                f(property);
            }
            Node::Sequence { expressions } => expressions.iter_mut().for_each(&mut f),
            Node::Identifier { .. }
            | Node::StringLiteral { .. }
            | Node::NumberLiteral { .. }
            | Node::BooleanLiteral { .. }
            | Node::NullLiteral
            | Node::RegexLiteral { .. }
            | Node::This
            | Node::Break
            | Node::Continue
            | Node::Empty
            | Node::Debugger => {}
        }
    }
}

struct NodeSlot {
    node: Node,
    parent: Option<NodeId>,
}

/// The arena holding one parsed program.
pub struct Ast {
    slots: Vec<NodeSlot>,
    root: NodeId,
}

impl Ast {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            root: NodeId(0),
        }
    }

    /// The program node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    /// Allocates a slot for `node` and claims its children.
    pub fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(NodeSlot { node, parent: None });
        self.reparent_children(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.slots[id.index()].node
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.slots[id.index()].node
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.index()].parent
    }

    /// Marks `parent` as the owner of `child`. Needed after splicing an
    /// existing node into an existing parent's child list.
    pub fn adopt(&mut self, child: NodeId, parent: NodeId) {
        self.slots[child.index()].parent = Some(parent);
    }

    fn reparent_children(&mut self, id: NodeId) {
        let mut children = Vec::new();
        self.slots[id.index()].node.collect_children(&mut children);
        for child in children {
            self.slots[child.index()].parent = Some(id);
        }
    }

    /// Overwrites the node in `id`'s slot, keeping the handle (and the
    /// parent link) valid. The incoming node's children are re-parented.
    pub fn replace(&mut self, id: NodeId, node: Node) {
        self.slots[id.index()].node = node;
        self.reparent_children(id);
    }

    /// Collapses `id`'s slot to the subtree currently rooted at `child`,
    /// e.g. rewriting an assignment expression to its own right-hand side.
    pub fn replace_with_child(&mut self, id: NodeId, child: NodeId) {
        let node = mem::replace(&mut self.slots[child.index()].node, Node::Empty);
        self.replace(id, node);
    }

    /// Deep-copies a subtree into fresh slots and returns the new root,
    /// unattached. Substitution sites must clone rather than share handles:
    /// a handle can only have one parent.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let mut node = self.node(id).clone();
        node.for_each_child_mut(|child| *child = self.deep_clone(*child));
        self.add(node)
    }

    /// Child handles of `id` in source order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.node(id).collect_children(&mut out);
        out
    }

    /// Every node reachable from `from`, parents before children, siblings
    /// in source order. Collected eagerly so callers may mutate while
    /// iterating; handles whose subtree got detached meanwhile still
    /// resolve (to whatever now occupies the slot).
    pub fn preorder(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            out.push(id);
            let mut children = self.children(id);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Whether `node` is `ancestor` or sits somewhere beneath it.
    pub fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.parent(id);
        }
        false
    }

    /// Nearest enclosing node in statement position, starting at `id` itself.
    pub fn statement_parent(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = Some(id);
        while let Some(node_id) = cur {
            if self.node(node_id).is_statement() {
                return Some(node_id);
            }
            cur = self.parent(node_id);
        }
        None
    }

    /// Nearest enclosing function node, excluding `id` itself.
    pub fn function_parent(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = self.parent(id);
        while let Some(node_id) = cur {
            if self.node(node_id).is_function() {
                return Some(node_id);
            }
            cur = self.parent(node_id);
        }
        None
    }

    /// The statement list a statement lives in, with its position:
    /// `(container, index)`. Containers are program bodies, blocks, and
    /// switch-case consequents.
    pub fn statement_position(&self, stmt: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(stmt)?;
        let list = self.statement_list(parent)?;
        let index = list.iter().position(|&s| s == stmt)?;
        Some((parent, index))
    }

    /// Read access to a node's statement list, if it carries one.
    pub fn statement_list(&self, id: NodeId) -> Option<&[NodeId]> {
        match self.node(id) {
            Node::Program { body } | Node::Block { body } => Some(body),
            Node::SwitchCase { consequent, .. } => Some(consequent),
            _ => None,
        }
    }

    /// Inserts statements into a container at `index`, adopting them.
    pub fn insert_statements(&mut self, container: NodeId, index: usize, stmts: &[NodeId]) {
        match self.node_mut(container) {
            Node::Program { body } | Node::Block { body } => {
                body.splice(index..index, stmts.iter().copied());
            }
            Node::SwitchCase { consequent, .. } => {
                consequent.splice(index..index, stmts.iter().copied());
            }
            _ => return,
        }
        for &stmt in stmts {
            self.adopt(stmt, container);
        }
    }

    /// Removes `id` from whatever list field of its parent holds it.
    /// Returns false when the parent holds it in a fixed position instead.
    pub fn remove_from_parent(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        let list: Option<&mut Vec<NodeId>> = match self.node_mut(parent) {
            Node::Program { body } | Node::Block { body } => Some(body),
            Node::SwitchCase { consequent, .. } => Some(consequent),
            Node::VariableDeclaration { declarations, .. } => Some(declarations),
            Node::Sequence { expressions } => Some(expressions),
            Node::FunctionDeclaration { params, .. }
            | Node::FunctionExpression { params, .. }
            | Node::ArrowFunction { params, .. } => Some(params),
            Node::Call { arguments, .. } | Node::New { arguments, .. } => Some(arguments),
            Node::ObjectLiteral { properties } => Some(properties),
            _ => None,
        };
        if let Some(list) = list {
            if let Some(pos) = list.iter().position(|&c| c == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_tree() -> (Ast, NodeId, NodeId) {
        // 1 + 2
        let mut ast = Ast::new();
        let one = ast.add(Node::NumberLiteral { value: 1.0 });
        let two = ast.add(Node::NumberLiteral { value: 2.0 });
        let sum = ast.add(Node::Binary {
            op: BinaryOp::Add,
            left: one,
            right: two,
        });
        let stmt = ast.add(Node::ExpressionStatement { expression: sum });
        let program = ast.add(Node::Program { body: vec![stmt] });
        ast.set_root(program);
        (ast, sum, one)
    }

    #[test]
    fn add_links_parents() {
        let (ast, sum, one) = small_tree();
        assert_eq!(ast.parent(one), Some(sum));
        assert_eq!(ast.parent(ast.root()), None);
    }

    #[test]
    fn deep_clone_is_independent() {
        let (mut ast, sum, one) = small_tree();
        let copy = ast.deep_clone(sum);
        ast.replace(one, Node::NumberLiteral { value: 9.0 });

        let Node::Binary { left, .. } = *ast.node(copy) else {
            panic!("clone should stay a binary expression");
        };
        assert_ne!(left, one, "clone must not share slots with the source");
        assert_eq!(
            ast.node(left),
            &Node::NumberLiteral { value: 1.0 },
            "clone must not observe later edits to the source"
        );
    }

    #[test]
    fn replace_reparents_incoming_children() {
        let (mut ast, sum, one) = small_tree();
        let lone = ast.add(Node::Identifier { name: "x".into() });
        ast.replace(
            sum,
            Node::Unary {
                op: UnaryOp::Minus,
                argument: lone,
            },
        );
        assert_eq!(ast.parent(lone), Some(sum));
        // The old operand is detached but its slot still resolves.
        assert_eq!(ast.node(one), &Node::NumberLiteral { value: 1.0 });
    }

    #[test]
    fn replace_with_child_collapses_in_place() {
        let (mut ast, sum, one) = small_tree();
        let stmt = ast.parent(sum).unwrap();
        ast.replace_with_child(sum, one);
        assert_eq!(ast.node(sum), &Node::NumberLiteral { value: 1.0 });
        assert_eq!(ast.parent(sum), Some(stmt));
    }

    #[test]
    fn preorder_parents_first() {
        let (ast, sum, _) = small_tree();
        let order = ast.preorder(ast.root());
        let root_pos = order.iter().position(|&n| n == ast.root()).unwrap();
        let sum_pos = order.iter().position(|&n| n == sum).unwrap();
        assert!(root_pos < sum_pos);
        assert_eq!(order.len(), 5);
    }

    #[test]
    fn statement_position_finds_container() {
        let (ast, sum, _) = small_tree();
        let stmt = ast.statement_parent(sum).unwrap();
        let (container, index) = ast.statement_position(stmt).unwrap();
        assert_eq!(container, ast.root());
        assert_eq!(index, 0);
    }
}
