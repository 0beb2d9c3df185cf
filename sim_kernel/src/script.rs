//! # Task Script
//!
//! Task bodies are written in a small line-oriented language that the kernel
//! interprets itself, one statement per line:
//!
//! ```text
//! # estimate pi
//! let pi = 0
//! let den = 1
//! while den < 100
//!     pi += 4 / den
//!     den += 2
//!     out "pi ~= " + pi
//! end
//! ```
//!
//! ## Statements
//!
//! - `let x = expr` (or `x = expr`, `x += expr`, `x -= expr`, `x *= expr`, `x /= expr`)
//! - `out expr`: blocking write to the output device
//! - `work expr`: burn `expr` milliseconds of wall-clock time
//! - `fail expr`: raise an unrecoverable fault
//! - `return`: leave the body
//! - `if expr` / `else` / `end`, `while expr` / `end`
//!
//! Expressions have numbers, double-quoted strings, `true`/`false`, variables
//! and the usual operators. `+` concatenates when either side is a string.

use crate::error::{ScriptError, TaskFault};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::iter::Peekable;
use std::vec::IntoIter;

/// Variables of a running body
pub type Env = HashMap<String, Value>;

/// Deepest allowed nesting of blocks, parentheses and unary operators
pub const MAX_NESTING: usize = 64;

/// Most tokens a single expression may have
pub const MAX_EXPR_TOKENS: usize = 256;

const KEYWORDS: &[&str] = &[
    "let", "out", "work", "fail", "return", "if", "else", "end", "while", "true", "false",
];

/// Runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "string",
            Value::Bool(_) => "bool",
        }
    }

    /// Zero, the empty string and `false` are false
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Bool(b) => *b,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Evaluates the expression against `env`
    ///
    /// `line` is only used to locate faults.
    pub fn eval(&self, env: &Env, line: usize) -> Result<Value, TaskFault> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Var(name) => env
                .get(name)
                .cloned()
                .ok_or_else(|| TaskFault::UndefinedVariable {
                    line,
                    name: name.clone(),
                }),
            Expr::Unary(op, operand) => apply_unary(*op, operand.eval(env, line)?, line),
            Expr::Binary(BinaryOp::And, left, right) => {
                let result = left.eval(env, line)?.is_truthy() && right.eval(env, line)?.is_truthy();
                Ok(Value::Bool(result))
            }
            Expr::Binary(BinaryOp::Or, left, right) => {
                let result = left.eval(env, line)?.is_truthy() || right.eval(env, line)?.is_truthy();
                Ok(Value::Bool(result))
            }
            Expr::Binary(op, left, right) => {
                let left = left.eval(env, line)?;
                let right = right.eval(env, line)?;
                apply_binary(*op, left, right, line)
            }
        }
    }
}

fn apply_unary(op: UnaryOp, value: Value, line: usize) -> Result<Value, TaskFault> {
    match (op, value) {
        (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
        (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
        (op, value) => Err(TaskFault::TypeMismatch {
            line,
            op: op.symbol(),
            operands: value.type_name().to_string(),
        }),
    }
}

fn apply_binary(op: BinaryOp, left: Value, right: Value, line: usize) -> Result<Value, TaskFault> {
    use Value::{Number, Text};

    match (op, left, right) {
        (BinaryOp::Add, Number(a), Number(b)) => Ok(Number(a + b)),
        (BinaryOp::Add, Text(a), b) => Ok(Text(format!("{}{}", a, b))),
        (BinaryOp::Add, a, Text(b)) => Ok(Text(format!("{}{}", a, b))),
        (BinaryOp::Sub, Number(a), Number(b)) => Ok(Number(a - b)),
        (BinaryOp::Mul, Number(a), Number(b)) => Ok(Number(a * b)),
        (BinaryOp::Div | BinaryOp::Rem, Number(_), Number(b)) if b == 0.0 => {
            Err(TaskFault::DivisionByZero { line })
        }
        (BinaryOp::Div, Number(a), Number(b)) => Ok(Number(a / b)),
        (BinaryOp::Rem, Number(a), Number(b)) => Ok(Number(a % b)),
        (BinaryOp::Eq, a, b) => Ok(Value::Bool(a == b)),
        (BinaryOp::Ne, a, b) => Ok(Value::Bool(a != b)),
        (op @ (BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge), a, b) => {
            compare(op, &a, &b, line)
        }
        (op, a, b) => Err(mismatch(op, &a, &b, line)),
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value, line: usize) -> Result<Value, TaskFault> {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        _ => return Err(mismatch(op, left, right, line)),
    };
    let holds = ordering.map_or(false, |ordering| match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        _ => false,
    });
    Ok(Value::Bool(holds))
}

fn mismatch(op: BinaryOp, left: &Value, right: &Value, line: usize) -> TaskFault {
    TaskFault::TypeMismatch {
        line,
        op: op.symbol(),
        operands: format!("{} and {}", left.type_name(), right.type_name()),
    }
}

/// One statement with its source line
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub line: usize,
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(line: usize, kind: StmtKind) -> Self {
        Self { line, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Assign {
        name: String,
        value: Expr,
    },
    Out(Expr),
    Work(Expr),
    Fail(Expr),
    Return,
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    /// Suspension point; never written by hand, inserted by instrumentation
    Yield,
}

impl StmtKind {
    /// Returns true for statements that leave the body entirely
    pub fn is_control_exit(&self) -> bool {
        matches!(self, StmtKind::Return)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    Ident(String),
    LParen,
    RParen,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Token::Number(n) => return write!(f, "{}", n),
            Token::Text(s) => return write!(f, "\"{}\"", s),
            Token::Ident(name) => return write!(f, "{}", name),
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Bang => "!",
            Token::Assign => "=",
            Token::PlusAssign => "+=",
            Token::MinusAssign => "-=",
            Token::StarAssign => "*=",
            Token::SlashAssign => "/=",
            Token::Eq => "==",
            Token::Ne => "!=",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::And => "&&",
            Token::Or => "||",
        };
        write!(f, "{}", symbol)
    }
}

fn tokenize(line: usize, text: &str) -> Result<Vec<Token>, ScriptError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '#' {
            break;
        }

        if c.is_ascii_digit() || c == '.' {
            let mut literal = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    literal.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            let number = literal
                .parse::<f64>()
                .map_err(|_| ScriptError::new(line, format!("invalid number `{}`", literal)))?;
            tokens.push(Token::Number(number));
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&d) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    ident.push(d);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Ident(ident));
            continue;
        }

        if c == '"' {
            chars.next();
            let mut text = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some('n') => text.push('\n'),
                        Some('t') => text.push('\t'),
                        Some(other) => text.push(other),
                        None => return Err(ScriptError::new(line, "unterminated string")),
                    },
                    Some(other) => text.push(other),
                    None => return Err(ScriptError::new(line, "unterminated string")),
                }
            }
            tokens.push(Token::Text(text));
            continue;
        }

        chars.next();
        let next = chars.peek().copied();
        let (token, wide) = match (c, next) {
            ('=', Some('=')) => (Token::Eq, true),
            ('!', Some('=')) => (Token::Ne, true),
            ('<', Some('=')) => (Token::Le, true),
            ('>', Some('=')) => (Token::Ge, true),
            ('+', Some('=')) => (Token::PlusAssign, true),
            ('-', Some('=')) => (Token::MinusAssign, true),
            ('*', Some('=')) => (Token::StarAssign, true),
            ('/', Some('=')) => (Token::SlashAssign, true),
            ('&', Some('&')) => (Token::And, true),
            ('|', Some('|')) => (Token::Or, true),
            ('(', _) => (Token::LParen, false),
            (')', _) => (Token::RParen, false),
            ('+', _) => (Token::Plus, false),
            ('-', _) => (Token::Minus, false),
            ('*', _) => (Token::Star, false),
            ('/', _) => (Token::Slash, false),
            ('%', _) => (Token::Percent, false),
            ('!', _) => (Token::Bang, false),
            ('=', _) => (Token::Assign, false),
            ('<', _) => (Token::Lt, false),
            ('>', _) => (Token::Gt, false),
            (other, _) => {
                return Err(ScriptError::new(
                    line,
                    format!("unexpected character `{}`", other),
                ))
            }
        };
        if wide {
            chars.next();
        }
        tokens.push(token);
    }

    Ok(tokens)
}

struct SourceLine {
    number: usize,
    tokens: Vec<Token>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Else,
    End,
}

struct BlockEnd {
    line: usize,
    kind: Terminator,
}

type Lines = Peekable<IntoIter<SourceLine>>;

/// Parses a task body into a statement tree
pub fn parse(source: &str) -> Result<Vec<Stmt>, ScriptError> {
    let mut lines = Vec::new();
    for (index, text) in source.lines().enumerate() {
        let tokens = tokenize(index + 1, text)?;
        if !tokens.is_empty() {
            lines.push(SourceLine {
                number: index + 1,
                tokens,
            });
        }
    }

    let mut lines = lines.into_iter().peekable();
    let (body, end) = parse_block(&mut lines, 0)?;
    match end {
        Some(BlockEnd {
            line,
            kind: Terminator::Else,
        }) => Err(ScriptError::new(line, "`else` without `if`")),
        Some(BlockEnd {
            line,
            kind: Terminator::End,
        }) => Err(ScriptError::new(line, "`end` without a block")),
        None => Ok(body),
    }
}

fn parse_block(
    lines: &mut Lines,
    depth: usize,
) -> Result<(Vec<Stmt>, Option<BlockEnd>), ScriptError> {
    let mut body = Vec::new();
    while let Some(line) = lines.next() {
        let terminator = match line.tokens.first() {
            Some(Token::Ident(word)) if word == "else" => Some(Terminator::Else),
            Some(Token::Ident(word)) if word == "end" => Some(Terminator::End),
            _ => None,
        };
        if let Some(kind) = terminator {
            if line.tokens.len() > 1 {
                return Err(ScriptError::new(
                    line.number,
                    format!("unexpected `{}`", line.tokens[1]),
                ));
            }
            return Ok((
                body,
                Some(BlockEnd {
                    line: line.number,
                    kind,
                }),
            ));
        }
        body.push(parse_statement(line, lines, depth)?);
    }
    Ok((body, None))
}

fn parse_statement(line: SourceLine, lines: &mut Lines, depth: usize) -> Result<Stmt, ScriptError> {
    let number = line.number;
    let tokens = &line.tokens;
    let keyword = match tokens.first() {
        Some(Token::Ident(word)) => word.as_str(),
        Some(other) => {
            return Err(ScriptError::new(
                number,
                format!("expected a statement, found `{}`", other),
            ))
        }
        None => return Err(ScriptError::new(number, "expected a statement")),
    };

    let kind = match keyword {
        "let" => parse_assignment(number, &tokens[1..])?,
        "out" => StmtKind::Out(parse_expr(number, &tokens[1..])?),
        "work" => StmtKind::Work(parse_expr(number, &tokens[1..])?),
        "fail" => StmtKind::Fail(parse_expr(number, &tokens[1..])?),
        "return" => {
            if tokens.len() > 1 {
                return Err(ScriptError::new(number, "`return` takes no value"));
            }
            StmtKind::Return
        }
        "if" => {
            let cond = parse_expr(number, &tokens[1..])?;
            let (then_body, end) = parse_block(lines, nested(number, depth)?)?;
            let else_body = match end.map(|end| (end.line, end.kind)) {
                Some((_, Terminator::End)) => Vec::new(),
                Some((_, Terminator::Else)) => {
                    let (else_body, end) = parse_block(lines, nested(number, depth)?)?;
                    match end.map(|end| (end.line, end.kind)) {
                        Some((_, Terminator::End)) => else_body,
                        Some((line, Terminator::Else)) => {
                            return Err(ScriptError::new(line, "duplicate `else`"))
                        }
                        None => return Err(missing_end(number, "if")),
                    }
                }
                None => return Err(missing_end(number, "if")),
            };
            StmtKind::If {
                cond,
                then_body,
                else_body,
            }
        }
        "while" => {
            let cond = parse_expr(number, &tokens[1..])?;
            let (body, end) = parse_block(lines, nested(number, depth)?)?;
            match end.map(|end| (end.line, end.kind)) {
                Some((_, Terminator::End)) => StmtKind::While { cond, body },
                Some((line, Terminator::Else)) => {
                    return Err(ScriptError::new(line, "`else` without `if`"))
                }
                None => return Err(missing_end(number, "while")),
            }
        }
        _ => parse_assignment(number, tokens)?,
    };

    Ok(Stmt::new(number, kind))
}

fn missing_end(line: usize, block: &str) -> ScriptError {
    ScriptError::new(line, format!("missing `end` for `{}`", block))
}

fn parse_assignment(line: usize, tokens: &[Token]) -> Result<StmtKind, ScriptError> {
    let name = match tokens.first() {
        Some(Token::Ident(name)) if !KEYWORDS.contains(&name.as_str()) => name.clone(),
        Some(other) => {
            return Err(ScriptError::new(
                line,
                format!("expected a variable name, found `{}`", other),
            ))
        }
        None => return Err(ScriptError::new(line, "expected a variable name")),
    };

    let compound = match tokens.get(1) {
        Some(Token::Assign) => None,
        Some(Token::PlusAssign) => Some(BinaryOp::Add),
        Some(Token::MinusAssign) => Some(BinaryOp::Sub),
        Some(Token::StarAssign) => Some(BinaryOp::Mul),
        Some(Token::SlashAssign) => Some(BinaryOp::Div),
        _ => return Err(ScriptError::new(line, format!("expected `=` after `{}`", name))),
    };

    let rhs = parse_expr(line, &tokens[2..])?;
    let value = match compound {
        Some(op) => Expr::Binary(op, Box::new(Expr::Var(name.clone())), Box::new(rhs)),
        None => rhs,
    };
    Ok(StmtKind::Assign { name, value })
}

fn nested(line: usize, depth: usize) -> Result<usize, ScriptError> {
    if depth >= MAX_NESTING {
        return Err(ScriptError::new(line, "blocks nested too deeply"));
    }
    Ok(depth + 1)
}

fn parse_expr(line: usize, tokens: &[Token]) -> Result<Expr, ScriptError> {
    if tokens.len() > MAX_EXPR_TOKENS {
        return Err(ScriptError::new(line, "expression too long"));
    }
    let mut parser = ExprParser {
        tokens,
        pos: 0,
        line,
        depth: 0,
    };
    let expr = parser.or()?;
    match parser.peek() {
        Some(token) => Err(ScriptError::new(line, format!("unexpected `{}`", token))),
        None => Ok(expr),
    }
}

struct ExprParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    line: usize,
    depth: usize,
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn enter(&mut self) -> Result<(), ScriptError> {
        if self.depth >= MAX_NESTING {
            return Err(ScriptError::new(self.line, "expression nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary(op, Box::new(left), Box::new(right))
    }

    fn or(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.and()?;
            left = Self::binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.equality()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.equality()?;
            left = Self::binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.comparison()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => BinaryOp::Eq,
                Some(Token::Ne) => BinaryOp::Ne,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.comparison()?;
            left = Self::binary(op, left, right);
        }
    }

    fn comparison(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.additive()?;
            left = Self::binary(op, left, right);
        }
    }

    fn additive(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            left = Self::binary(op, left, right);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Self::binary(op, left, right);
        }
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Bang) => UnaryOp::Not,
            _ => return self.primary(),
        };
        self.pos += 1;
        self.enter()?;
        let operand = self.unary()?;
        self.depth -= 1;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Literal(Value::Number(*n))),
            Some(Token::Text(s)) => Ok(Expr::Literal(Value::Text(s.clone()))),
            Some(Token::Ident(word)) if word == "true" => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::Ident(word)) if word == "false" => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::Ident(word)) if KEYWORDS.contains(&word.as_str()) => Err(
                ScriptError::new(self.line, format!("unexpected keyword `{}`", word)),
            ),
            Some(Token::Ident(name)) => Ok(Expr::Var(name.clone())),
            Some(Token::LParen) => {
                self.enter()?;
                let inner = self.or()?;
                self.depth -= 1;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(ScriptError::new(self.line, "expected `)`")),
                }
            }
            Some(other) => Err(ScriptError::new(
                self.line,
                format!("expected an expression, found `{}`", other),
            )),
            None => Err(ScriptError::new(self.line, "expected an expression")),
        }
    }
}
