//! Hand-written scanner for the supported JavaScript subset.
//!
//! Tokens carry their line and whether a line terminator preceded them, which
//! is what the parser's automatic-semicolon handling keys off. Whether a `/`
//! starts a regular expression or a division is decided from the previous
//! significant token.

use crate::result::{Error, Result};
use unicode_xid::UnicodeXID;

/// Reserved words recognized by the scanner.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Keyword {
    Var,
    Let,
    Const,
    Function,
    Return,
    If,
    Else,
    For,
    While,
    Do,
    Break,
    Continue,
    Switch,
    Case,
    Default,
    Try,
    Catch,
    Finally,
    Throw,
    New,
    Delete,
    Typeof,
    Void,
    Instanceof,
    In,
    This,
    Null,
    True,
    False,
    Debugger,
}

fn keyword_of(word: &str) -> Option<Keyword> {
    Some(match word {
        "var" => Keyword::Var,
        "let" => Keyword::Let,
        "const" => Keyword::Const,
        "function" => Keyword::Function,
        "return" => Keyword::Return,
        "if" => Keyword::If,
        "else" => Keyword::Else,
        "for" => Keyword::For,
        "while" => Keyword::While,
        "do" => Keyword::Do,
        "break" => Keyword::Break,
        "continue" => Keyword::Continue,
        "switch" => Keyword::Switch,
        "case" => Keyword::Case,
        "default" => Keyword::Default,
        "try" => Keyword::Try,
        "catch" => Keyword::Catch,
        "finally" => Keyword::Finally,
        "throw" => Keyword::Throw,
        "new" => Keyword::New,
        "delete" => Keyword::Delete,
        "typeof" => Keyword::Typeof,
        "void" => Keyword::Void,
        "instanceof" => Keyword::Instanceof,
        "in" => Keyword::In,
        "this" => Keyword::This,
        "null" => Keyword::Null,
        "true" => Keyword::True,
        "false" => Keyword::False,
        "debugger" => Keyword::Debugger,
        _ => return None,
    })
}

/// All reserved words, for identifier-validity checks.
pub const KEYWORDS: &[&str] = &[
    "var", "let", "const", "function", "return", "if", "else", "for", "while", "do", "break",
    "continue", "switch", "case", "default", "try", "catch", "finally", "throw", "new", "delete",
    "typeof", "void", "instanceof", "in", "this", "null", "true", "false", "debugger", "class",
    "extends", "super", "import", "export", "yield", "with",
];

/// Whether `name` can be written as a plain identifier (property shorthand,
/// dot access).
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first == '$' || first == '_' || first.is_xid_start()) {
        return false;
    }
    if !chars.all(|c| c == '$' || c == '_' || c.is_xid_continue()) {
        return false;
    }
    !KEYWORDS.contains(&name)
}

/// Punctuation and operator tokens.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Punct {
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Dot,
    Colon,
    Question,
    Arrow,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    StarStarAssign,
    ShlAssign,
    ShrAssign,
    UShrAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,
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
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Not,
    AmpAmp,
    PipePipe,
    PlusPlus,
    MinusMinus,
}

#[derive(Clone, PartialEq, Debug)]
pub enum TokenKind {
    Ident(String),
    Keyword(Keyword),
    Number(f64),
    Str {
        value: String,
        /// Source slice including quotes, kept when the literal had escapes.
        raw: Option<String>,
    },
    /// Backtick string without substitutions (cooked text).
    Template(String),
    Regex {
        pattern: String,
        flags: String,
    },
    Punct(Punct),
    Eof,
}

#[derive(Clone, Debug)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    /// A line terminator appeared between the previous token and this one.
    pub newline_before: bool,
}

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    /// A `/` here would start a regex rather than a division.
    regex_allowed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            regex_allowed: true,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn err(&self, message: impl Into<String>) -> Error {
        Error::Lex {
            line: self.line,
            message: message.into(),
        }
    }

    /// Skips whitespace and comments; reports whether a line terminator was
    /// crossed.
    fn skip_trivia(&mut self) -> Result<bool> {
        let mut newline = false;
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    if c == '\n' || c == '\r' || c == '\u{2028}' || c == '\u{2029}' {
                        newline = true;
                    }
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.bump();
                    self.bump();
                    let mut closed = false;
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            newline = true;
                        }
                        if c == '*' && self.eat('/') {
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        return Err(self.err("unterminated block comment"));
                    }
                }
                _ => return Ok(newline),
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token> {
        let newline_before = self.skip_trivia()?;
        let line = self.line;
        let kind = self.scan()?;
        self.regex_allowed = match &kind {
            TokenKind::Ident(_)
            | TokenKind::Number(_)
            | TokenKind::Str { .. }
            | TokenKind::Template(_)
            | TokenKind::Regex { .. } => false,
            TokenKind::Keyword(k) => !matches!(
                k,
                Keyword::This | Keyword::Null | Keyword::True | Keyword::False
            ),
            TokenKind::Punct(p) => !matches!(
                p,
                Punct::RParen | Punct::RBracket | Punct::PlusPlus | Punct::MinusMinus
            ),
            TokenKind::Eof => false,
        };
        Ok(Token {
            kind,
            line,
            newline_before,
        })
    }

    fn scan(&mut self) -> Result<TokenKind> {
        let Some(c) = self.peek() else {
            return Ok(TokenKind::Eof);
        };
        if c == '$' || c == '_' || c.is_xid_start() {
            return Ok(self.scan_word());
        }
        if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()))
        {
            return self.scan_number();
        }
        match c {
            '"' | '\'' => self.scan_string(c),
            '`' => self.scan_template(),
            '/' if self.regex_allowed => self.scan_regex(),
            _ => self.scan_punct(),
        }
    }

    fn scan_word(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '$' || c == '_' || c.is_xid_continue() {
                self.bump();
            } else {
                break;
            }
        }
        let word = &self.src[start..self.pos];
        match keyword_of(word) {
            Some(k) => TokenKind::Keyword(k),
            None => TokenKind::Ident(word.to_string()),
        }
    }

    fn scan_number(&mut self) -> Result<TokenKind> {
        if self.peek() == Some('0') {
            match self.peek_at(1) {
                Some('x') | Some('X') => return self.scan_radix(16, 2),
                Some('o') | Some('O') => return self.scan_radix(8, 2),
                Some('b') | Some('B') => return self.scan_radix(2, 2),
                Some(d) if d.is_ascii_digit() => {
                    // Legacy octal unless a digit forces decimal.
                    let rest = &self.src[self.pos + 1..];
                    let run: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
                    if !run.contains('8') && !run.contains('9') {
                        return self.scan_radix(8, 1);
                    }
                }
                _ => {}
            }
        }
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            self.bump();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.bump();
            }
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.err("missing exponent digits"));
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        let mut text = self.src[start..self.pos].to_string();
        if text.starts_with('.') {
            text.insert(0, '0');
        }
        if text.ends_with('.') {
            text.push('0');
        }
        let value: f64 = text
            .parse()
            .map_err(|_| self.err(format!("malformed number `{text}`")))?;
        Ok(TokenKind::Number(value))
    }

    fn scan_radix(&mut self, radix: u32, skip: usize) -> Result<TokenKind> {
        for _ in 0..skip {
            self.bump();
        }
        let mut value = 0f64;
        let mut digits = 0usize;
        while let Some(c) = self.peek() {
            let Some(d) = c.to_digit(radix) else { break };
            value = value * radix as f64 + d as f64;
            digits += 1;
            self.bump();
        }
        if digits == 0 {
            return Err(self.err("missing digits in numeric literal"));
        }
        Ok(TokenKind::Number(value))
    }

    fn scan_string(&mut self, quote: char) -> Result<TokenKind> {
        let start = self.pos;
        self.bump();
        let mut value = String::new();
        let mut escaped = false;
        loop {
            let Some(c) = self.bump() else {
                return Err(self.err("unterminated string literal"));
            };
            if c == quote {
                break;
            }
            match c {
                '\\' => {
                    escaped = true;
                    self.scan_escape(&mut value)?;
                }
                '\n' => return Err(self.err("unterminated string literal")),
                _ => value.push(c),
            }
        }
        let raw = escaped.then(|| self.src[start..self.pos].to_string());
        Ok(TokenKind::Str { value, raw })
    }

    fn scan_escape(&mut self, out: &mut String) -> Result<()> {
        let Some(c) = self.bump() else {
            return Err(self.err("dangling escape at end of input"));
        };
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !self.peek().is_some_and(|d| d.is_ascii_digit()) => out.push('\0'),
            'x' => {
                let code = self.scan_hex_digits(2)?;
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            'u' => {
                let code = if self.eat('{') {
                    let mut v = 0u32;
                    let mut any = false;
                    while let Some(d) = self.peek().and_then(|c| c.to_digit(16)) {
                        v = v.saturating_mul(16).saturating_add(d);
                        any = true;
                        self.bump();
                    }
                    if !any || !self.eat('}') {
                        return Err(self.err("malformed unicode escape"));
                    }
                    v
                } else {
                    self.scan_hex_digits(4)?
                };
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            '\n' => {} // line continuation
            '\r' => {
                self.eat('\n');
            }
            d if d.is_digit(8) => {
                // Legacy octal escape, up to three digits.
                let mut v = d.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|c| c.to_digit(8)) {
                        Some(n) if v * 8 + n <= 0xFF => {
                            v = v * 8 + n;
                            self.bump();
                        }
                        _ => break,
                    }
                }
                out.push(char::from_u32(v).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            other => out.push(other),
        }
        Ok(())
    }

    fn scan_hex_digits(&mut self, count: usize) -> Result<u32> {
        let mut v = 0u32;
        for _ in 0..count {
            let d = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.err("malformed hex escape"))?;
            v = v * 16 + d;
        }
        Ok(v)
    }

    fn scan_template(&mut self) -> Result<TokenKind> {
        self.bump();
        let mut value = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(self.err("unterminated template literal"));
            };
            match c {
                '`' => break,
                '\\' => self.scan_escape(&mut value)?,
                '$' if self.peek() == Some('{') => {
                    return Err(self.err("template substitutions are not supported"));
                }
                _ => value.push(c),
            }
        }
        Ok(TokenKind::Template(value))
    }

    fn scan_regex(&mut self) -> Result<TokenKind> {
        self.bump();
        let mut pattern = String::new();
        let mut in_class = false;
        loop {
            let Some(c) = self.bump() else {
                return Err(self.err("unterminated regular expression"));
            };
            match c {
                '\\' => {
                    pattern.push(c);
                    match self.bump() {
                        Some(e) => pattern.push(e),
                        None => return Err(self.err("unterminated regular expression")),
                    }
                }
                '[' => {
                    in_class = true;
                    pattern.push(c);
                }
                ']' => {
                    in_class = false;
                    pattern.push(c);
                }
                '/' if !in_class => break,
                '\n' => return Err(self.err("unterminated regular expression")),
                _ => pattern.push(c),
            }
        }
        let mut flags = String::new();
        while let Some(c) = self.peek() {
            if c == '$' || c == '_' || c.is_xid_continue() {
                flags.push(c);
                self.bump();
            } else {
                break;
            }
        }
        Ok(TokenKind::Regex { pattern, flags })
    }

    fn scan_punct(&mut self) -> Result<TokenKind> {
        use Punct::*;
        let c = self.bump().ok_or_else(|| self.err("unexpected end of input"))?;
        let p = match c {
            '(' => LParen,
            ')' => RParen,
            '{' => LBrace,
            '}' => RBrace,
            '[' => LBracket,
            ']' => RBracket,
            ';' => Semi,
            ',' => Comma,
            '.' => Dot,
            ':' => Colon,
            '?' => Question,
            '~' => Tilde,
            '=' => {
                if self.eat('=') {
                    if self.eat('=') {
                        EqEqEq
                    } else {
                        EqEq
                    }
                } else if self.eat('>') {
                    Arrow
                } else {
                    Assign
                }
            }
            '!' => {
                if self.eat('=') {
                    if self.eat('=') {
                        NotEqEq
                    } else {
                        NotEq
                    }
                } else {
                    Not
                }
            }
            '<' => {
                if self.eat('<') {
                    if self.eat('=') {
                        ShlAssign
                    } else {
                        Shl
                    }
                } else if self.eat('=') {
                    LtEq
                } else {
                    Lt
                }
            }
            '>' => {
                if self.eat('>') {
                    if self.eat('>') {
                        if self.eat('=') {
                            UShrAssign
                        } else {
                            UShr
                        }
                    } else if self.eat('=') {
                        ShrAssign
                    } else {
                        Shr
                    }
                } else if self.eat('=') {
                    GtEq
                } else {
                    Gt
                }
            }
            '+' => {
                if self.eat('+') {
                    PlusPlus
                } else if self.eat('=') {
                    PlusAssign
                } else {
                    Plus
                }
            }
            '-' => {
                if self.eat('-') {
                    MinusMinus
                } else if self.eat('=') {
                    MinusAssign
                } else {
                    Minus
                }
            }
            '*' => {
                if self.eat('*') {
                    if self.eat('=') {
                        StarStarAssign
                    } else {
                        StarStar
                    }
                } else if self.eat('=') {
                    StarAssign
                } else {
                    Star
                }
            }
            '/' => {
                if self.eat('=') {
                    SlashAssign
                } else {
                    Slash
                }
            }
            '%' => {
                if self.eat('=') {
                    PercentAssign
                } else {
                    Percent
                }
            }
            '&' => {
                if self.eat('&') {
                    AmpAmp
                } else if self.eat('=') {
                    AmpAssign
                } else {
                    Amp
                }
            }
            '|' => {
                if self.eat('|') {
                    PipePipe
                } else if self.eat('=') {
                    PipeAssign
                } else {
                    Pipe
                }
            }
            '^' => {
                if self.eat('=') {
                    CaretAssign
                } else {
                    Caret
                }
            }
            other => return Err(self.err(format!("unexpected character `{other}`"))),
        };
        Ok(TokenKind::Punct(p))
    }
}
