//! Recursive-descent parser for the supported JavaScript subset.
//!
//! Tokens are lexed up front so the parser can look arbitrarily far ahead
//! (arrow-function detection needs to peek past a parenthesized parameter
//! list). Automatic semicolon insertion follows the usual rules: a statement
//! may end at an explicit `;`, before a `}`, at end of input, or across a
//! line terminator.

use crate::ast::{
    AssignOp, Ast, BinaryOp, DeclKind, LogicalOp, Node, NodeId, UnaryOp, UpdateOp,
};
use crate::lexer::{Keyword, Lexer, Punct, Token, TokenKind};
use crate::result::{Error, Result};

/// Parses a full program into a fresh tree.
pub fn parse(source: &str) -> Result<Ast> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let eof = token.kind == TokenKind::Eof;
        tokens.push(token);
        if eof {
            break;
        }
    }
    Parser::new(tokens).parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    ast: Ast,
    /// Inside a for-statement head, a bare `in` terminates the init.
    no_in: bool,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            ast: Ast::new(),
            no_in: false,
        }
    }

    fn token(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn kind(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn kind_at(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn err(&self, message: impl Into<String>) -> Error {
        Error::Syntax {
            line: self.token().line,
            message: message.into(),
        }
    }

    fn check_punct(&self, p: Punct) -> bool {
        matches!(self.kind(), TokenKind::Punct(q) if *q == p)
    }

    fn eat_punct(&mut self, p: Punct) -> bool {
        if self.check_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: Punct, what: &str) -> Result<()> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.err(format!("expected {what}")))
        }
    }

    fn check_keyword(&self, k: Keyword) -> bool {
        matches!(self.kind(), TokenKind::Keyword(q) if *q == k)
    }

    fn eat_keyword(&mut self, k: Keyword) -> bool {
        if self.check_keyword(k) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, k: Keyword, what: &str) -> Result<()> {
        if self.eat_keyword(k) {
            Ok(())
        } else {
            Err(self.err(format!("expected {what}")))
        }
    }

    /// Consumes a statement terminator, inserting one where the grammar
    /// allows.
    fn semicolon(&mut self) -> Result<()> {
        if self.eat_punct(Punct::Semi) {
            return Ok(());
        }
        if self.check_punct(Punct::RBrace)
            || self.kind() == &TokenKind::Eof
            || self.token().newline_before
        {
            return Ok(());
        }
        Err(self.err("expected `;`"))
    }

    fn identifier(&mut self, what: &str) -> Result<NodeId> {
        match self.kind() {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(self.ast.add(Node::Identifier { name }))
            }
            _ => Err(self.err(format!("expected {what}"))),
        }
    }

    /// Identifier-or-keyword, for member property names and object keys.
    fn identifier_name(&mut self) -> Option<String> {
        let name = match self.kind() {
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Keyword(k) => keyword_text(*k).to_string(),
            _ => return None,
        };
        self.advance();
        Some(name)
    }

    fn parse_program(mut self) -> Result<Ast> {
        let mut body = Vec::new();
        while self.kind() != &TokenKind::Eof {
            body.push(self.parse_statement()?);
        }
        let root = self.ast.add(Node::Program { body });
        self.ast.set_root(root);
        Ok(self.ast)
    }

    fn parse_statement(&mut self) -> Result<NodeId> {
        match self.kind() {
            TokenKind::Keyword(Keyword::Var) => self.parse_variable_statement(DeclKind::Var),
            TokenKind::Keyword(Keyword::Let) => self.parse_variable_statement(DeclKind::Let),
            TokenKind::Keyword(Keyword::Const) => self.parse_variable_statement(DeclKind::Const),
            TokenKind::Keyword(Keyword::Function) => self.parse_function_declaration(),
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::Do) => self.parse_do_while(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                self.semicolon()?;
                Ok(self.ast.add(Node::Break))
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance();
                self.semicolon()?;
                Ok(self.ast.add(Node::Continue))
            }
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch(),
            TokenKind::Keyword(Keyword::Try) => self.parse_try(),
            TokenKind::Keyword(Keyword::Throw) => self.parse_throw(),
            TokenKind::Keyword(Keyword::Debugger) => {
                self.advance();
                self.semicolon()?;
                Ok(self.ast.add(Node::Debugger))
            }
            TokenKind::Punct(Punct::LBrace) => self.parse_block(),
            TokenKind::Punct(Punct::Semi) => {
                self.advance();
                Ok(self.ast.add(Node::Empty))
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_variable_statement(&mut self, kind: DeclKind) -> Result<NodeId> {
        let decl = self.parse_variable_declaration(kind)?;
        self.semicolon()?;
        Ok(decl)
    }

    fn parse_variable_declaration(&mut self, kind: DeclKind) -> Result<NodeId> {
        self.advance(); // var | let | const
        let mut declarations = Vec::new();
        loop {
            let id = self.identifier("binding name")?;
            let init = if self.eat_punct(Punct::Assign) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarations.push(self.ast.add(Node::Declarator { id, init }));
            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }
        Ok(self.ast.add(Node::VariableDeclaration { kind, declarations }))
    }

    fn parse_function_declaration(&mut self) -> Result<NodeId> {
        self.advance(); // function
        let id = self.identifier("function name")?;
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(self.ast.add(Node::FunctionDeclaration { id, params, body }))
    }

    fn parse_params(&mut self) -> Result<Vec<NodeId>> {
        self.expect_punct(Punct::LParen, "`(`")?;
        let mut params = Vec::new();
        if !self.check_punct(Punct::RParen) {
            loop {
                params.push(self.identifier("parameter name")?);
                if !self.eat_punct(Punct::Comma) {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RParen, "`)`")?;
        Ok(params)
    }

    fn parse_block(&mut self) -> Result<NodeId> {
        self.expect_punct(Punct::LBrace, "`{`")?;
        let mut body = Vec::new();
        while !self.check_punct(Punct::RBrace) {
            if self.kind() == &TokenKind::Eof {
                return Err(self.err("unterminated block"));
            }
            body.push(self.parse_statement()?);
        }
        self.advance();
        Ok(self.ast.add(Node::Block { body }))
    }

    fn parse_if(&mut self) -> Result<NodeId> {
        self.advance();
        self.expect_punct(Punct::LParen, "`(`")?;
        let test = self.parse_expression()?;
        self.expect_punct(Punct::RParen, "`)`")?;
        let consequent = self.parse_statement()?;
        let alternate = if self.eat_keyword(Keyword::Else) {
            Some(self.parse_statement()?)
        } else {
            None
        };
        Ok(self.ast.add(Node::If {
            test,
            consequent,
            alternate,
        }))
    }

    fn parse_for(&mut self) -> Result<NodeId> {
        self.advance();
        self.expect_punct(Punct::LParen, "`(`")?;

        if self.eat_punct(Punct::Semi) {
            return self.parse_for_tail(None);
        }

        let is_decl = matches!(
            self.kind(),
            TokenKind::Keyword(Keyword::Var | Keyword::Let | Keyword::Const)
        );
        self.no_in = true;
        let init = if is_decl {
            let kind = match self.kind() {
                TokenKind::Keyword(Keyword::Let) => DeclKind::Let,
                TokenKind::Keyword(Keyword::Const) => DeclKind::Const,
                _ => DeclKind::Var,
            };
            self.parse_variable_declaration(kind)
        } else {
            self.parse_expression()
        };
        self.no_in = false;
        let init = init?;

        if self.eat_keyword(Keyword::In) {
            let right = self.parse_expression()?;
            self.expect_punct(Punct::RParen, "`)`")?;
            let body = self.parse_statement()?;
            return Ok(self.ast.add(Node::ForIn {
                left: init,
                right,
                body,
            }));
        }

        self.expect_punct(Punct::Semi, "`;`")?;
        self.parse_for_tail(Some(init))
    }

    fn parse_for_tail(&mut self, init: Option<NodeId>) -> Result<NodeId> {
        let test = if self.check_punct(Punct::Semi) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(Punct::Semi, "`;`")?;
        let update = if self.check_punct(Punct::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(Punct::RParen, "`)`")?;
        let body = self.parse_statement()?;
        Ok(self.ast.add(Node::For {
            init,
            test,
            update,
            body,
        }))
    }

    fn parse_while(&mut self) -> Result<NodeId> {
        self.advance();
        self.expect_punct(Punct::LParen, "`(`")?;
        let test = self.parse_expression()?;
        self.expect_punct(Punct::RParen, "`)`")?;
        let body = self.parse_statement()?;
        Ok(self.ast.add(Node::While { test, body }))
    }

    fn parse_do_while(&mut self) -> Result<NodeId> {
        self.advance();
        let body = self.parse_statement()?;
        self.expect_keyword(Keyword::While, "`while`")?;
        self.expect_punct(Punct::LParen, "`(`")?;
        let test = self.parse_expression()?;
        self.expect_punct(Punct::RParen, "`)`")?;
        self.eat_punct(Punct::Semi);
        Ok(self.ast.add(Node::DoWhile { body, test }))
    }

    fn parse_return(&mut self) -> Result<NodeId> {
        self.advance();
        let argument = if self.check_punct(Punct::Semi)
            || self.check_punct(Punct::RBrace)
            || self.kind() == &TokenKind::Eof
            || self.token().newline_before
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.semicolon()?;
        Ok(self.ast.add(Node::Return { argument }))
    }

    fn parse_switch(&mut self) -> Result<NodeId> {
        self.advance();
        self.expect_punct(Punct::LParen, "`(`")?;
        let discriminant = self.parse_expression()?;
        self.expect_punct(Punct::RParen, "`)`")?;
        self.expect_punct(Punct::LBrace, "`{`")?;
        let mut cases = Vec::new();
        let mut seen_default = false;
        while !self.eat_punct(Punct::RBrace) {
            let test = if self.eat_keyword(Keyword::Case) {
                let test = self.parse_expression()?;
                Some(test)
            } else if self.eat_keyword(Keyword::Default) {
                if seen_default {
                    return Err(self.err("duplicate default clause"));
                }
                seen_default = true;
                None
            } else {
                return Err(self.err("expected `case` or `default`"));
            };
            self.expect_punct(Punct::Colon, "`:`")?;
            let mut consequent = Vec::new();
            while !self.check_punct(Punct::RBrace)
                && !self.check_keyword(Keyword::Case)
                && !self.check_keyword(Keyword::Default)
            {
                consequent.push(self.parse_statement()?);
            }
            cases.push(self.ast.add(Node::SwitchCase { test, consequent }));
        }
        Ok(self.ast.add(Node::Switch {
            discriminant,
            cases,
        }))
    }

    fn parse_try(&mut self) -> Result<NodeId> {
        self.advance();
        let block = self.parse_block()?;
        let handler = if self.eat_keyword(Keyword::Catch) {
            let param = if self.eat_punct(Punct::LParen) {
                let param = self.identifier("catch parameter")?;
                self.expect_punct(Punct::RParen, "`)`")?;
                Some(param)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(self.ast.add(Node::CatchClause { param, body }))
        } else {
            None
        };
        let finalizer = if self.eat_keyword(Keyword::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.err("expected `catch` or `finally`"));
        }
        Ok(self.ast.add(Node::Try {
            block,
            handler,
            finalizer,
        }))
    }

    fn parse_throw(&mut self) -> Result<NodeId> {
        self.advance();
        if self.token().newline_before {
            return Err(self.err("newline after `throw`"));
        }
        let argument = self.parse_expression()?;
        self.semicolon()?;
        Ok(self.ast.add(Node::Throw { argument }))
    }

    fn parse_expression_statement(&mut self) -> Result<NodeId> {
        let expression = self.parse_expression()?;
        if matches!(self.ast.node(expression), Node::Identifier { .. })
            && self.check_punct(Punct::Colon)
        {
            return Err(self.err("labeled statements are not supported"));
        }
        self.semicolon()?;
        Ok(self.ast.add(Node::ExpressionStatement { expression }))
    }

    // --- expressions ---

    fn parse_expression(&mut self) -> Result<NodeId> {
        let first = self.parse_assignment()?;
        if !self.check_punct(Punct::Comma) {
            return Ok(first);
        }
        let mut expressions = vec![first];
        while self.eat_punct(Punct::Comma) {
            expressions.push(self.parse_assignment()?);
        }
        Ok(self.ast.add(Node::Sequence { expressions }))
    }

    /// A `(` here opens an arrow parameter list iff the matching `)` is
    /// followed by `=>`.
    fn arrow_ahead(&self) -> bool {
        if matches!(self.kind(), TokenKind::Ident(_))
            && self.kind_at(1) == &TokenKind::Punct(Punct::Arrow)
        {
            return true;
        }
        if !self.check_punct(Punct::LParen) {
            return false;
        }
        let mut depth = 0usize;
        let mut offset = 0usize;
        loop {
            match self.kind_at(offset) {
                TokenKind::Punct(Punct::LParen) => depth += 1,
                TokenKind::Punct(Punct::RParen) => {
                    depth -= 1;
                    if depth == 0 {
                        return self.kind_at(offset + 1) == &TokenKind::Punct(Punct::Arrow);
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            offset += 1;
        }
    }

    fn parse_arrow(&mut self) -> Result<NodeId> {
        let params = if self.check_punct(Punct::LParen) {
            self.parse_params()?
        } else {
            vec![self.identifier("parameter name")?]
        };
        self.expect_punct(Punct::Arrow, "`=>`")?;
        let body = if self.check_punct(Punct::LBrace) {
            self.parse_block()?
        } else {
            self.parse_assignment()?
        };
        Ok(self.ast.add(Node::ArrowFunction { params, body }))
    }

    fn parse_assignment(&mut self) -> Result<NodeId> {
        if self.arrow_ahead() {
            return self.parse_arrow();
        }
        let left = self.parse_conditional()?;
        let op = match self.kind() {
            TokenKind::Punct(Punct::Assign) => AssignOp::Assign,
            TokenKind::Punct(Punct::PlusAssign) => AssignOp::AddAssign,
            TokenKind::Punct(Punct::MinusAssign) => AssignOp::SubAssign,
            TokenKind::Punct(Punct::StarAssign) => AssignOp::MulAssign,
            TokenKind::Punct(Punct::SlashAssign) => AssignOp::DivAssign,
            TokenKind::Punct(Punct::PercentAssign) => AssignOp::ModAssign,
            TokenKind::Punct(Punct::StarStarAssign) => AssignOp::ExpAssign,
            TokenKind::Punct(Punct::ShlAssign) => AssignOp::ShlAssign,
            TokenKind::Punct(Punct::ShrAssign) => AssignOp::ShrAssign,
            TokenKind::Punct(Punct::UShrAssign) => AssignOp::UShrAssign,
            TokenKind::Punct(Punct::PipeAssign) => AssignOp::BitOrAssign,
            TokenKind::Punct(Punct::CaretAssign) => AssignOp::BitXorAssign,
            TokenKind::Punct(Punct::AmpAssign) => AssignOp::BitAndAssign,
            _ => return Ok(left),
        };
        if !matches!(
            self.ast.node(left),
            Node::Identifier { .. } | Node::Member { .. }
        ) {
            return Err(self.err("invalid assignment target"));
        }
        self.advance();
        let right = self.parse_assignment()?;
        Ok(self.ast.add(Node::Assignment { op, left, right }))
    }

    fn parse_conditional(&mut self) -> Result<NodeId> {
        let test = self.parse_logical_or()?;
        if !self.eat_punct(Punct::Question) {
            return Ok(test);
        }
        let saved = self.no_in;
        self.no_in = false;
        let consequent = self.parse_assignment()?;
        self.no_in = saved;
        self.expect_punct(Punct::Colon, "`:`")?;
        let alternate = self.parse_assignment()?;
        Ok(self.ast.add(Node::Conditional {
            test,
            consequent,
            alternate,
        }))
    }

    fn parse_logical_or(&mut self) -> Result<NodeId> {
        let mut left = self.parse_logical_and()?;
        while self.eat_punct(Punct::PipePipe) {
            let right = self.parse_logical_and()?;
            left = self.ast.add(Node::Logical {
                op: LogicalOp::Or,
                left,
                right,
            });
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<NodeId> {
        let mut left = self.parse_bit_or()?;
        while self.eat_punct(Punct::AmpAmp) {
            let right = self.parse_bit_or()?;
            left = self.ast.add(Node::Logical {
                op: LogicalOp::And,
                left,
                right,
            });
        }
        Ok(left)
    }

    fn parse_bit_or(&mut self) -> Result<NodeId> {
        let mut left = self.parse_bit_xor()?;
        while self.check_punct(Punct::Pipe) {
            self.advance();
            let right = self.parse_bit_xor()?;
            left = self.binary(BinaryOp::BitOr, left, right);
        }
        Ok(left)
    }

    fn parse_bit_xor(&mut self) -> Result<NodeId> {
        let mut left = self.parse_bit_and()?;
        while self.check_punct(Punct::Caret) {
            self.advance();
            let right = self.parse_bit_and()?;
            left = self.binary(BinaryOp::BitXor, left, right);
        }
        Ok(left)
    }

    fn parse_bit_and(&mut self) -> Result<NodeId> {
        let mut left = self.parse_equality()?;
        while self.check_punct(Punct::Amp) {
            self.advance();
            let right = self.parse_equality()?;
            left = self.binary(BinaryOp::BitAnd, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<NodeId> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.kind() {
                TokenKind::Punct(Punct::EqEq) => BinaryOp::EqEq,
                TokenKind::Punct(Punct::NotEq) => BinaryOp::NotEq,
                TokenKind::Punct(Punct::EqEqEq) => BinaryOp::EqEqEq,
                TokenKind::Punct(Punct::NotEqEq) => BinaryOp::NotEqEq,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_relational()?;
            left = self.binary(op, left, right);
        }
    }

    fn parse_relational(&mut self) -> Result<NodeId> {
        let mut left = self.parse_shift()?;
        loop {
            let op = match self.kind() {
                TokenKind::Punct(Punct::Lt) => BinaryOp::Lt,
                TokenKind::Punct(Punct::LtEq) => BinaryOp::LtEq,
                TokenKind::Punct(Punct::Gt) => BinaryOp::Gt,
                TokenKind::Punct(Punct::GtEq) => BinaryOp::GtEq,
                TokenKind::Keyword(Keyword::Instanceof) => BinaryOp::InstanceOf,
                TokenKind::Keyword(Keyword::In) if !self.no_in => BinaryOp::In,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_shift()?;
            left = self.binary(op, left, right);
        }
    }

    fn parse_shift(&mut self) -> Result<NodeId> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.kind() {
                TokenKind::Punct(Punct::Shl) => BinaryOp::Shl,
                TokenKind::Punct(Punct::Shr) => BinaryOp::Shr,
                TokenKind::Punct(Punct::UShr) => BinaryOp::UShr,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_additive()?;
            left = self.binary(op, left, right);
        }
    }

    fn parse_additive(&mut self) -> Result<NodeId> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.kind() {
                TokenKind::Punct(Punct::Plus) => BinaryOp::Add,
                TokenKind::Punct(Punct::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.binary(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<NodeId> {
        let mut left = self.parse_exponent()?;
        loop {
            let op = match self.kind() {
                TokenKind::Punct(Punct::Star) => BinaryOp::Mul,
                TokenKind::Punct(Punct::Slash) => BinaryOp::Div,
                TokenKind::Punct(Punct::Percent) => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_exponent()?;
            left = self.binary(op, left, right);
        }
    }

    fn parse_exponent(&mut self) -> Result<NodeId> {
        let left = self.parse_unary()?;
        if self.check_punct(Punct::StarStar) {
            self.advance();
            // Right-associative.
            let right = self.parse_exponent()?;
            return Ok(self.binary(BinaryOp::Exp, left, right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<NodeId> {
        let op = match self.kind() {
            TokenKind::Punct(Punct::Minus) => Some(UnaryOp::Minus),
            TokenKind::Punct(Punct::Plus) => Some(UnaryOp::Plus),
            TokenKind::Punct(Punct::Not) => Some(UnaryOp::Not),
            TokenKind::Punct(Punct::Tilde) => Some(UnaryOp::BitNot),
            TokenKind::Keyword(Keyword::Typeof) => Some(UnaryOp::TypeOf),
            TokenKind::Keyword(Keyword::Void) => Some(UnaryOp::Void),
            TokenKind::Keyword(Keyword::Delete) => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let argument = self.parse_unary()?;
            return Ok(self.ast.add(Node::Unary { op, argument }));
        }
        if self.check_punct(Punct::PlusPlus) || self.check_punct(Punct::MinusMinus) {
            let op = if self.check_punct(Punct::PlusPlus) {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.advance();
            let argument = self.parse_unary()?;
            return Ok(self.ast.add(Node::Update {
                op,
                prefix: true,
                argument,
            }));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<NodeId> {
        let argument = self.parse_call_member()?;
        if (self.check_punct(Punct::PlusPlus) || self.check_punct(Punct::MinusMinus))
            && !self.token().newline_before
        {
            let op = if self.check_punct(Punct::PlusPlus) {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            self.advance();
            return Ok(self.ast.add(Node::Update {
                op,
                prefix: false,
                argument,
            }));
        }
        Ok(argument)
    }

    fn parse_call_member(&mut self) -> Result<NodeId> {
        let mut base = if self.check_keyword(Keyword::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            if self.eat_punct(Punct::Dot) {
                let name = self
                    .identifier_name()
                    .ok_or_else(|| self.err("expected property name"))?;
                let property = self.ast.add(Node::Identifier { name });
                base = self.ast.add(Node::Member {
                    object: base,
                    property,
                    computed: false,
                });
            } else if self.eat_punct(Punct::LBracket) {
                let saved = self.no_in;
                self.no_in = false;
                let property = self.parse_expression()?;
                self.no_in = saved;
                self.expect_punct(Punct::RBracket, "`]`")?;
                base = self.ast.add(Node::Member {
                    object: base,
                    property,
                    computed: true,
                });
            } else if self.check_punct(Punct::LParen) {
                let arguments = self.parse_arguments()?;
                base = self.ast.add(Node::Call {
                    callee: base,
                    arguments,
                });
            } else {
                return Ok(base);
            }
        }
    }

    fn parse_new(&mut self) -> Result<NodeId> {
        self.advance(); // new
        let mut callee = if self.check_keyword(Keyword::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        // Member accesses bind to the callee before the argument list does.
        loop {
            if self.eat_punct(Punct::Dot) {
                let name = self
                    .identifier_name()
                    .ok_or_else(|| self.err("expected property name"))?;
                let property = self.ast.add(Node::Identifier { name });
                callee = self.ast.add(Node::Member {
                    object: callee,
                    property,
                    computed: false,
                });
            } else if self.eat_punct(Punct::LBracket) {
                let property = self.parse_expression()?;
                self.expect_punct(Punct::RBracket, "`]`")?;
                callee = self.ast.add(Node::Member {
                    object: callee,
                    property,
                    computed: true,
                });
            } else {
                break;
            }
        }
        let arguments = if self.check_punct(Punct::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        Ok(self.ast.add(Node::New { callee, arguments }))
    }

    fn parse_arguments(&mut self) -> Result<Vec<NodeId>> {
        self.expect_punct(Punct::LParen, "`(`")?;
        let saved = self.no_in;
        self.no_in = false;
        let mut arguments = Vec::new();
        if !self.check_punct(Punct::RParen) {
            loop {
                arguments.push(self.parse_assignment()?);
                if !self.eat_punct(Punct::Comma) {
                    break;
                }
            }
        }
        self.no_in = saved;
        self.expect_punct(Punct::RParen, "`)`")?;
        Ok(arguments)
    }

    fn parse_primary(&mut self) -> Result<NodeId> {
        match self.kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(self.ast.add(Node::Identifier { name }))
            }
            TokenKind::Number(value) => {
                self.advance();
                Ok(self.ast.add(Node::NumberLiteral { value }))
            }
            TokenKind::Str { value, raw } => {
                self.advance();
                Ok(self.ast.add(Node::StringLiteral { value, raw }))
            }
            TokenKind::Template(cooked) => {
                self.advance();
                Ok(self.ast.add(Node::TemplateLiteral {
                    quasis: vec![cooked],
                    expressions: Vec::new(),
                }))
            }
            TokenKind::Regex { pattern, flags } => {
                self.advance();
                Ok(self.ast.add(Node::RegexLiteral { pattern, flags }))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(self.ast.add(Node::BooleanLiteral { value: true }))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(self.ast.add(Node::BooleanLiteral { value: false }))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(self.ast.add(Node::NullLiteral))
            }
            TokenKind::Keyword(Keyword::This) => {
                self.advance();
                Ok(self.ast.add(Node::This))
            }
            TokenKind::Keyword(Keyword::Function) => self.parse_function_expression(),
            TokenKind::Punct(Punct::LParen) => {
                self.advance();
                let saved = self.no_in;
                self.no_in = false;
                let expr = self.parse_expression()?;
                self.no_in = saved;
                self.expect_punct(Punct::RParen, "`)`")?;
                Ok(expr)
            }
            TokenKind::Punct(Punct::LBracket) => self.parse_array(),
            TokenKind::Punct(Punct::LBrace) => self.parse_object(),
            _ => Err(self.err(format!(
                "unexpected token in expression: {:?}",
                self.kind()
            ))),
        }
    }

    fn parse_function_expression(&mut self) -> Result<NodeId> {
        self.advance(); // function
        let id = if matches!(self.kind(), TokenKind::Ident(_)) {
            Some(self.identifier("function name")?)
        } else {
            None
        };
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(self.ast.add(Node::FunctionExpression { id, params, body }))
    }

    fn parse_array(&mut self) -> Result<NodeId> {
        self.advance(); // [
        let saved = self.no_in;
        self.no_in = false;
        let mut elements = Vec::new();
        loop {
            if self.eat_punct(Punct::RBracket) {
                break;
            }
            if self.eat_punct(Punct::Comma) {
                elements.push(None); // elision
                continue;
            }
            elements.push(Some(self.parse_assignment()?));
            if !self.eat_punct(Punct::Comma) {
                self.expect_punct(Punct::RBracket, "`]`")?;
                break;
            }
        }
        self.no_in = saved;
        Ok(self.ast.add(Node::ArrayLiteral { elements }))
    }

    fn parse_object(&mut self) -> Result<NodeId> {
        self.advance(); // {
        let saved = self.no_in;
        self.no_in = false;
        let mut properties = Vec::new();
        while !self.eat_punct(Punct::RBrace) {
            properties.push(self.parse_property()?);
            if !self.eat_punct(Punct::Comma) {
                self.expect_punct(Punct::RBrace, "`}`")?;
                break;
            }
        }
        self.no_in = saved;
        Ok(self.ast.add(Node::ObjectLiteral { properties }))
    }

    fn parse_property(&mut self) -> Result<NodeId> {
        let mut computed = false;
        let key = match self.kind().clone() {
            TokenKind::Str { value, raw } => {
                self.advance();
                self.ast.add(Node::StringLiteral { value, raw })
            }
            TokenKind::Number(value) => {
                self.advance();
                self.ast.add(Node::NumberLiteral { value })
            }
            TokenKind::Punct(Punct::LBracket) => {
                self.advance();
                computed = true;
                let key = self.parse_assignment()?;
                self.expect_punct(Punct::RBracket, "`]`")?;
                key
            }
            _ => {
                let name = self
                    .identifier_name()
                    .ok_or_else(|| self.err("expected property key"))?;
                self.ast.add(Node::Identifier { name })
            }
        };

        if self.check_punct(Punct::LParen) {
            return Err(self.err("object methods are not supported"));
        }
        if self.eat_punct(Punct::Colon) {
            let value = self.parse_assignment()?;
            return Ok(self.ast.add(Node::Property {
                key,
                value,
                computed,
                shorthand: false,
            }));
        }
        // Shorthand `{ name }`.
        if computed {
            return Err(self.err("expected `:`"));
        }
        let Node::Identifier { name } = self.ast.node(key) else {
            return Err(self.err("expected `:`"));
        };
        let name = name.clone();
        let value = self.ast.add(Node::Identifier { name });
        Ok(self.ast.add(Node::Property {
            key,
            value,
            computed: false,
            shorthand: true,
        }))
    }

    fn binary(&mut self, op: BinaryOp, left: NodeId, right: NodeId) -> NodeId {
        self.ast.add(Node::Binary { op, left, right })
    }
}

fn keyword_text(k: Keyword) -> &'static str {
    match k {
        Keyword::Var => "var",
        Keyword::Let => "let",
        Keyword::Const => "const",
        Keyword::Function => "function",
        Keyword::Return => "return",
        Keyword::If => "if",
        Keyword::Else => "else",
        Keyword::For => "for",
        Keyword::While => "while",
        Keyword::Do => "do",
        Keyword::Break => "break",
        Keyword::Continue => "continue",
        Keyword::Switch => "switch",
        Keyword::Case => "case",
        Keyword::Default => "default",
        Keyword::Try => "try",
        Keyword::Catch => "catch",
        Keyword::Finally => "finally",
        Keyword::Throw => "throw",
        Keyword::New => "new",
        Keyword::Delete => "delete",
        Keyword::Typeof => "typeof",
        Keyword::Void => "void",
        Keyword::Instanceof => "instanceof",
        Keyword::In => "in",
        Keyword::This => "this",
        Keyword::Null => "null",
        Keyword::True => "true",
        Keyword::False => "false",
        Keyword::Debugger => "debugger",
    }
}
