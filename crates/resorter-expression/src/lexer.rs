//! Expression tokenizer.

use crate::error::ParseError;
use crate::registry::Registry;
use std::fmt;

/// Binary operators, including the structural `,` and `.`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Comma,
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Match,
    Add,
    Sub,
    BitOr,
    Concat,
    Pow,
    Div,
    FloorDiv,
    Mul,
    BitAnd,
    Rem,
    Dot,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Comma => ",",
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Match => "~=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::BitOr => "|",
            BinaryOp::Concat => ":",
            BinaryOp::Pow => "^",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "\\",
            BinaryOp::Mul => "*",
            BinaryOp::BitAnd => "&",
            BinaryOp::Rem => "%",
            BinaryOp::Dot => ".",
        }
    }

    /// Binding strength, lowest first. Unary minus shares the additive level.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Comma => 1,
            BinaryOp::Or | BinaryOp::And => 2,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge
            | BinaryOp::Match => 3,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::BitOr | BinaryOp::Concat | BinaryOp::Pow => 4,
            BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mul | BinaryOp::BitAnd | BinaryOp::Rem => 5,
            BinaryOp::Dot => 6,
        }
    }
}

/// Precedence of unary minus.
pub const NEG_PRECEDENCE: u8 = 4;

/// Operator table, multi-character lexemes first.
const OPERATORS: &[(&str, BinaryOp)] = &[
    ("==", BinaryOp::Eq),
    ("!=", BinaryOp::Ne),
    ("<>", BinaryOp::Ne),
    ("<=", BinaryOp::Le),
    (">=", BinaryOp::Ge),
    ("~=", BinaryOp::Match),
    ("&&", BinaryOp::And),
    ("||", BinaryOp::Or),
    ("=", BinaryOp::Eq),
    ("<", BinaryOp::Lt),
    (">", BinaryOp::Gt),
    ("+", BinaryOp::Add),
    ("-", BinaryOp::Sub),
    ("*", BinaryOp::Mul),
    ("/", BinaryOp::Div),
    ("\\", BinaryOp::FloorDiv),
    ("^", BinaryOp::Pow),
    (".", BinaryOp::Dot),
    (",", BinaryOp::Comma),
    ("%", BinaryOp::Rem),
    (":", BinaryOp::Concat),
    ("|", BinaryOp::BitOr),
    ("&", BinaryOp::BitAnd),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Unary minus.
    Neg,
    Binary(BinaryOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    String,
    Identifier,
    Function,
    Operator,
    Bracket,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    /// A bareword that is not a registered function.
    Identifier(String),
    /// A bareword naming a registered function.
    Function(String),
    Operator(Operator),
    Bracket(char),
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Int(_) | Token::Float(_) => TokenKind::Number,
            Token::Str(_) => TokenKind::String,
            Token::Identifier(_) => TokenKind::Identifier,
            Token::Function(_) => TokenKind::Function,
            Token::Operator(_) => TokenKind::Operator,
            Token::Bracket(_) => TokenKind::Bracket,
        }
    }

    pub fn is_opening(&self) -> bool {
        matches!(self, Token::Bracket('(' | '[' | '{'))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(n) => write!(f, "{n}"),
            Token::Float(x) => write!(f, "{x:?}"),
            Token::Str(s) => write!(f, "{s:?}"),
            Token::Identifier(name) | Token::Function(name) => f.write_str(name),
            Token::Operator(Operator::Neg) => f.write_str("-"),
            Token::Operator(Operator::Binary(op)) => f.write_str(op.symbol()),
            Token::Bracket(b) => write!(f, "{b}"),
        }
    }
}

/// Lexer over one expression. Create a new one to restart from the
/// beginning.
pub struct Lexer<'a> {
    text: &'a str,
    pos: usize,
    registry: &'a Registry,
    prev: Option<Token>,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str, registry: &'a Registry) -> Self {
        Lexer {
            text,
            pos: 0,
            registry,
            prev: None,
            failed: false,
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// A `-` is unary at the start, after an operator or after an opening
    /// bracket.
    fn minus_is_unary(&self) -> bool {
        match &self.prev {
            None => true,
            Some(Token::Operator(_)) => true,
            Some(tok) => tok.is_opening(),
        }
    }

    fn lex_number(&mut self) -> Token {
        let rest = self.rest();
        let mut end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        // the decimal point belongs to the number only when a digit follows;
        // `3.str` is the number 3 chained into `str`
        let is_float = rest[end..].starts_with('.')
            && rest[end + 1..].starts_with(|c: char| c.is_ascii_digit());
        if is_float {
            end += 1;
            end += rest[end..]
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len() - end);
        }
        let lexeme = &rest[..end];
        self.pos += end;
        if is_float {
            Token::Float(lexeme.parse().unwrap_or(f64::INFINITY))
        } else {
            lexeme
                .parse()
                .map(Token::Int)
                .unwrap_or_else(|_| Token::Float(lexeme.parse().unwrap_or(f64::INFINITY)))
        }
    }

    fn lex_string(&mut self, quote: char) -> Result<Token, ParseError> {
        let mut out = String::new();
        let mut chars = self.rest().char_indices().skip(1);
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, 't')) => out.push('\t'),
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 'r')) => out.push('\r'),
                    Some((_, c @ ('\\' | '\'' | '"'))) => out.push(c),
                    Some((_, c)) => {
                        out.push('\\');
                        out.push(c);
                    }
                    None => break,
                },
                c if c == quote => {
                    self.pos += i + c.len_utf8();
                    return Ok(Token::Str(out));
                }
                c => out.push(c),
            }
        }
        Err(ParseError::UnterminatedString(self.text.to_string()))
    }

    fn lex_word(&mut self) -> Token {
        let rest = self.rest();
        let end = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        let word = &rest[..end];
        self.pos += end;
        if self.registry.contains(word) {
            Token::Function(word.to_string())
        } else {
            Token::Identifier(word.to_string())
        }
    }

    fn lex_operator(&mut self) -> Option<Token> {
        let rest = self.rest();
        let (lexeme, op) = OPERATORS.iter().find(|(lexeme, _)| rest.starts_with(lexeme))?;
        self.pos += lexeme.len();
        if *op == BinaryOp::Sub && self.minus_is_unary() {
            return Some(Token::Operator(Operator::Neg));
        }
        Some(Token::Operator(Operator::Binary(*op)))
    }

    fn next_token(&mut self) -> Option<Result<Token, ParseError>> {
        self.skip_whitespace();
        let c = self.peek()?;
        let token = match c {
            '0'..='9' => Ok(self.lex_number()),
            '"' | '\'' => self.lex_string(c),
            c if c.is_alphabetic() || c == '_' => Ok(self.lex_word()),
            '(' | ')' | '[' | ']' | '{' | '}' => {
                self.pos += 1;
                Ok(Token::Bracket(c))
            }
            _ => self.lex_operator().ok_or_else(|| ParseError::UnexpectedChar {
                ch: c,
                pos: self.pos,
                text: self.text.to_string(),
            }),
        };
        Some(token)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let token = self.next_token()?;
        match &token {
            Ok(tok) => self.prev = Some(tok.clone()),
            Err(_) => self.failed = true,
        }
        Some(token)
    }
}

/// Lexes the whole expression.
pub fn tokenize(text: &str, registry: &Registry) -> Result<Vec<Token>, ParseError> {
    Lexer::new(text, registry).collect()
}
