//! Name binding and reference tracking.
//!
//! Scopes are function-level: `Program` and each function body own one, and
//! every declaration inside (`var`, `let`, `const`, function declarations,
//! parameters, catch parameters) hoists to the nearest one. Obfuscated
//! sources use unique names, so the finer block-scoping of `let`/`const`
//! never changes resolution in practice.
//!
//! Reads land in [`Binding::references`]; writes (assignment targets, update
//! targets, for-in loop variables) and redeclarations land in
//! [`Binding::violations`]. A binding with an empty violation list holds
//! whatever its declaration initialized it to.

use crate::ast::{Ast, Node, NodeId};
use rustc_hash::FxHashMap;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ScopeId(u32);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BindingId(u32);

/// What introduced a binding.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BindingKind {
    Var,
    Let,
    Const,
    Function,
    Param,
    CatchParam,
    /// The name of a named function expression, visible inside it.
    FunctionExprName,
}

#[derive(Debug)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    /// The `Declarator`, declaration, or parameter identifier that created
    /// this binding. A redeclaration repoints this at the latest one.
    pub declaration: NodeId,
    pub scope: ScopeId,
    /// Identifier nodes that read the binding.
    pub references: Vec<NodeId>,
    /// Nodes that write or re-declare the binding.
    pub violations: Vec<NodeId>,
}

#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    /// The `Program` or function node owning this scope.
    pub owner: NodeId,
    names: FxHashMap<String, BindingId>,
    /// Bindings in declaration order.
    pub locals: Vec<BindingId>,
}

/// All scopes and bindings of one tree, built in a single pass pair:
/// declarations first (hoisting), then reference resolution.
#[derive(Debug, Default)]
pub struct ScopeIndex {
    scopes: Vec<Scope>,
    bindings: Vec<Binding>,
    scope_by_owner: FxHashMap<NodeId, ScopeId>,
    binding_by_declaration: FxHashMap<NodeId, BindingId>,
}

impl ScopeIndex {
    pub fn build(ast: &Ast) -> Self {
        let mut index = Self::default();
        let root_scope = index.push_scope(None, ast.root());
        index.declare_in(ast, ast.root(), root_scope);
        index.resolve_in(ast, ast.root(), root_scope);
        index
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id.0 as usize]
    }

    pub fn bindings(&self) -> impl Iterator<Item = (BindingId, &Binding)> {
        self.bindings
            .iter()
            .enumerate()
            .map(|(i, b)| (BindingId(i as u32), b))
    }

    pub fn is_program_scope(&self, id: ScopeId) -> bool {
        self.scope(id).parent.is_none()
    }

    /// The binding a declarator or parameter identifier introduced, if any.
    pub fn binding_for_declaration(&self, declaration: NodeId) -> Option<BindingId> {
        self.binding_by_declaration.get(&declaration).copied()
    }

    /// Walks the scope chain outward from `scope` looking for `name`.
    pub fn resolve(&self, mut scope: ScopeId, name: &str) -> Option<BindingId> {
        loop {
            let s = self.scope(scope);
            if let Some(&binding) = s.names.get(name) {
                return Some(binding);
            }
            scope = s.parent?;
        }
    }

    /// The innermost scope containing `node`.
    pub fn enclosing_scope(&self, ast: &Ast, node: NodeId) -> ScopeId {
        let mut current = node;
        loop {
            if let Some(&scope) = self.scope_by_owner.get(&current) {
                // The owner node itself (a function) lives in its parent.
                if current != node {
                    return scope;
                }
                if let Some(parent) = self.scope(scope).parent {
                    return parent;
                }
                return scope;
            }
            match ast.parent(current) {
                Some(parent) => current = parent,
                None => return ScopeId(0),
            }
        }
    }

    /// Resolves an identifier node in place.
    pub fn resolve_at(&self, ast: &Ast, node: NodeId, name: &str) -> Option<BindingId> {
        self.resolve(self.enclosing_scope(ast, node), name)
    }

    fn push_scope(&mut self, parent: Option<ScopeId>, owner: NodeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent,
            owner,
            names: FxHashMap::default(),
            locals: Vec::new(),
        });
        self.scope_by_owner.insert(owner, id);
        id
    }

    fn declare(&mut self, scope: ScopeId, name: &str, kind: BindingKind, declaration: NodeId) {
        if let Some(&existing) = self.scopes[scope.0 as usize].names.get(name) {
            // Redeclaration: the later declarator wins, and the binding is no
            // longer a single-assignment value.
            let binding = &mut self.bindings[existing.0 as usize];
            binding.declaration = declaration;
            binding.violations.push(declaration);
            self.binding_by_declaration.insert(declaration, existing);
            return;
        }
        let id = BindingId(self.bindings.len() as u32);
        self.bindings.push(Binding {
            name: name.to_string(),
            kind,
            declaration,
            scope,
            references: Vec::new(),
            violations: Vec::new(),
        });
        let s = &mut self.scopes[scope.0 as usize];
        s.names.insert(name.to_string(), id);
        s.locals.push(id);
        self.binding_by_declaration.insert(declaration, id);
    }

    /// Hoisting pass: records every declaration in `scope`, creating child
    /// scopes for nested functions as it goes.
    fn declare_in(&mut self, ast: &Ast, node: NodeId, scope: ScopeId) {
        match ast.node(node) {
            Node::VariableDeclaration { kind, declarations } => {
                let bind_kind = match kind {
                    crate::ast::DeclKind::Var => BindingKind::Var,
                    crate::ast::DeclKind::Let => BindingKind::Let,
                    crate::ast::DeclKind::Const => BindingKind::Const,
                };
                for &decl in declarations {
                    let Node::Declarator { id, init } = ast.node(decl) else {
                        continue;
                    };
                    if let Node::Identifier { name } = ast.node(*id) {
                        let name = name.clone();
                        self.declare(scope, &name, bind_kind, decl);
                    }
                    if let Some(init) = *init {
                        self.declare_in(ast, init, scope);
                    }
                }
            }
            Node::FunctionDeclaration { id, params, body } => {
                if let Node::Identifier { name } = ast.node(*id) {
                    let name = name.clone();
                    self.declare(scope, &name, BindingKind::Function, node);
                }
                let inner = self.push_scope(Some(scope), node);
                self.declare_params(ast, params, inner);
                self.declare_in(ast, *body, inner);
            }
            Node::FunctionExpression { id, params, body } => {
                let inner = self.push_scope(Some(scope), node);
                if let Some(id) = *id {
                    if let Node::Identifier { name } = ast.node(id) {
                        let name = name.clone();
                        self.declare(inner, &name, BindingKind::FunctionExprName, node);
                    }
                }
                self.declare_params(ast, params, inner);
                self.declare_in(ast, *body, inner);
            }
            Node::ArrowFunction { params, body } => {
                let inner = self.push_scope(Some(scope), node);
                self.declare_params(ast, params, inner);
                self.declare_in(ast, *body, inner);
            }
            Node::CatchClause { param, body } => {
                if let Some(param) = *param {
                    if let Node::Identifier { name } = ast.node(param) {
                        let name = name.clone();
                        self.declare(scope, &name, BindingKind::CatchParam, param);
                    }
                }
                self.declare_in(ast, *body, scope);
            }
            _ => {
                for child in ast.children(node) {
                    self.declare_in(ast, child, scope);
                }
            }
        }
    }

    fn declare_params(&mut self, ast: &Ast, params: &[NodeId], scope: ScopeId) {
        for &param in params {
            if let Node::Identifier { name } = ast.node(param) {
                let name = name.clone();
                self.declare(scope, &name, BindingKind::Param, param);
            }
        }
    }

    fn record_read(&mut self, ast: &Ast, scope: ScopeId, node: NodeId) {
        if let Node::Identifier { name } = ast.node(node) {
            let name = name.clone();
            if let Some(binding) = self.resolve(scope, &name) {
                self.bindings[binding.0 as usize].references.push(node);
            }
        }
    }

    fn record_write(&mut self, ast: &Ast, scope: ScopeId, node: NodeId) {
        if let Node::Identifier { name } = ast.node(node) {
            let name = name.clone();
            if let Some(binding) = self.resolve(scope, &name) {
                self.bindings[binding.0 as usize].violations.push(node);
            }
        }
    }

    /// Resolution pass: mirrors the hoisting traversal so nested functions
    /// land in the scopes already created for them.
    fn resolve_in(&mut self, ast: &Ast, node: NodeId, scope: ScopeId) {
        match ast.node(node) {
            Node::Identifier { .. } => self.record_read(ast, scope, node),
            Node::Member {
                object,
                property,
                computed,
            } => {
                let (object, property, computed) = (*object, *property, *computed);
                self.resolve_in(ast, object, scope);
                if computed {
                    self.resolve_in(ast, property, scope);
                }
            }
            Node::Property {
                key,
                value,
                computed,
                ..
            } => {
                let (key, value, computed) = (*key, *value, *computed);
                if computed {
                    self.resolve_in(ast, key, scope);
                }
                self.resolve_in(ast, value, scope);
            }
            Node::Declarator { init, .. } => {
                if let Some(init) = *init {
                    self.resolve_in(ast, init, scope);
                }
            }
            Node::FunctionDeclaration { body, .. }
            | Node::FunctionExpression { body, .. }
            | Node::ArrowFunction { body, .. } => {
                let body = *body;
                let inner = self.scope_by_owner[&node];
                self.resolve_in(ast, body, inner);
            }
            Node::CatchClause { body, .. } => {
                let body = *body;
                self.resolve_in(ast, body, scope);
            }
            Node::Assignment { op, left, right } => {
                let (op, left, right) = (*op, *left, *right);
                if matches!(ast.node(left), Node::Identifier { .. }) {
                    // Compound assignments read the old value too.
                    if op != crate::ast::AssignOp::Assign {
                        self.record_read(ast, scope, left);
                    }
                    self.record_write(ast, scope, left);
                } else {
                    self.resolve_in(ast, left, scope);
                }
                self.resolve_in(ast, right, scope);
            }
            Node::Update { argument, .. } => {
                let argument = *argument;
                if matches!(ast.node(argument), Node::Identifier { .. }) {
                    self.record_read(ast, scope, argument);
                    self.record_write(ast, scope, argument);
                } else {
                    self.resolve_in(ast, argument, scope);
                }
            }
            Node::ForIn { left, right, body } => {
                let (left, right, body) = (*left, *right, *body);
                match ast.node(left) {
                    Node::Identifier { .. } => self.record_write(ast, scope, left),
                    Node::VariableDeclaration { declarations, .. } => {
                        // The loop assigns the variable each iteration.
                        for &decl in declarations.clone().iter() {
                            if let Node::Declarator { id, .. } = ast.node(decl) {
                                let id = *id;
                                self.record_write(ast, scope, id);
                            }
                        }
                    }
                    _ => self.resolve_in(ast, left, scope),
                }
                self.resolve_in(ast, right, scope);
                self.resolve_in(ast, body, scope);
            }
            _ => {
                for child in ast.children(node) {
                    self.resolve_in(ast, child, scope);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn index_of(src: &str) -> (Ast, ScopeIndex) {
        let ast = parse(src).unwrap();
        let index = ScopeIndex::build(&ast);
        (ast, index)
    }

    fn binding_named<'a>(index: &'a ScopeIndex, name: &str) -> &'a Binding {
        index
            .bindings()
            .map(|(_, b)| b)
            .find(|b| b.name == name)
            .unwrap()
    }

    #[test]
    fn reads_and_writes_are_kept_apart() {
        let (_, index) = index_of("var a = 1; f(a); a = 2; a++;");
        let a = binding_named(&index, "a");
        // `f(a)` reads; `a++` both reads and writes; `a = 2` only writes.
        assert_eq!(a.references.len(), 2);
        assert_eq!(a.violations.len(), 2);
    }

    #[test]
    fn inner_scopes_resolve_outward() {
        let (ast, index) = index_of("var a = 1; function f() { return a; }");
        let a = binding_named(&index, "a");
        assert_eq!(a.references.len(), 1);
        // The reference sits inside f's scope.
        let reference = a.references[0];
        assert_ne!(index.enclosing_scope(&ast, reference), a.scope);
    }

    #[test]
    fn shadowing_declarations_split_bindings() {
        let (_, index) = index_of("var a = 1; function f(a) { return a; }");
        let bindings: Vec<_> = index
            .bindings()
            .filter(|(_, b)| b.name == "a")
            .collect();
        assert_eq!(bindings.len(), 2);
        let outer = bindings.iter().find(|(_, b)| b.kind == BindingKind::Var).unwrap();
        let param = bindings.iter().find(|(_, b)| b.kind == BindingKind::Param).unwrap();
        assert_eq!(outer.1.references.len(), 0);
        assert_eq!(param.1.references.len(), 1);
    }

    #[test]
    fn redeclaration_counts_as_violation() {
        let (_, index) = index_of("var a = 1; var a = 2;");
        let a = binding_named(&index, "a");
        assert_eq!(a.violations.len(), 1);
    }

    #[test]
    fn member_property_names_are_not_references() {
        let (_, index) = index_of("var a = 1; o.a; o[a];");
        let a = binding_named(&index, "a");
        assert_eq!(a.references.len(), 1);
    }

    #[test]
    fn shorthand_property_value_is_a_reference() {
        let (_, index) = index_of("var a = 1; var o = { a };");
        let a = binding_named(&index, "a");
        assert_eq!(a.references.len(), 1);
    }

    #[test]
    fn undeclared_names_resolve_to_nothing() {
        let (ast, index) = index_of("console.log(1);");
        assert!(index.resolve_at(&ast, ast.root(), "console").is_none());
    }

    #[test]
    fn for_in_left_counts_as_write() {
        let (_, index) = index_of("for (var k in o) { f(k); }");
        let k = binding_named(&index, "k");
        assert_eq!(k.violations.len(), 1);
        assert_eq!(k.references.len(), 1);
    }

    #[test]
    fn catch_param_binds_in_enclosing_function() {
        let (_, index) = index_of("try { f(); } catch (e) { g(e); }");
        let e = binding_named(&index, "e");
        assert_eq!(e.kind, BindingKind::CatchParam);
        assert_eq!(e.references.len(), 1);
    }
}
