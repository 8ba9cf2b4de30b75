use rust_decimal::Decimal;
use std::fmt;

/// A position in the source text.
///
/// Lines and columns are 1-based, the byte offset is 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

impl Position {
    pub fn start() -> Self {
        Position {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

/// A source range attached to tokens, statements, and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Span { start, end }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start.line, self.start.column)
    }
}

/// Statement keywords. All of them are written with a `%` prefix in source
/// and matched case-insensitively (`%LET` == `%let`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Let,
    Set,
    If,
    Then,
    Else,
    Do,
    End,
    Foreach,
    In,
    To,
    Break,
    Continue,
    Return,
    Func,
    EndFunc,
}

impl Keyword {
    /// Match a keyword name (without the `%`), case-insensitively.
    pub fn from_name(name: &str) -> Option<Keyword> {
        match name.to_ascii_lowercase().as_str() {
            "let" => Some(Keyword::Let),
            "set" => Some(Keyword::Set),
            "if" => Some(Keyword::If),
            "then" => Some(Keyword::Then),
            "else" => Some(Keyword::Else),
            "do" => Some(Keyword::Do),
            "end" => Some(Keyword::End),
            "foreach" => Some(Keyword::Foreach),
            "in" => Some(Keyword::In),
            "to" => Some(Keyword::To),
            "break" => Some(Keyword::Break),
            "continue" => Some(Keyword::Continue),
            "return" => Some(Keyword::Return),
            "func" => Some(Keyword::Func),
            "endfunc" => Some(Keyword::EndFunc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Integer or decimal number, invariant locale
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 154.97
    /// ```
    Number(Decimal),

    /// String literal with `\n \r \t \\ \"` escapes
    String(String),

    /// `true` / `false`
    Boolean(bool),

    /// `null`
    Null,

    // Identifiers and references
    /// Bare identifier: function names, object keys, loop variables
    Identifier(String),

    /// Variable reference (`&name`)
    ///
    /// # Examples
    /// ```text
    /// &total
    /// &item_count
    /// ```
    VarRef(String),

    /// Statement keyword (`%let`, `%set`, `%if`, ...)
    Keyword(Keyword),

    /// `$` — introduces `$in`/`$out`/`$meta` or a `$.a.b[0]` path literal
    Dollar,

    // Operators
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%` not followed by a keyword name (modulo)
    Percent,
    /// `=` (assignment in `%let`, `%set`, `%do`)
    Assign,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `!`
    Bang,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Colon,
    Dot,

    /// End of input
    Eof,
}

impl TokenKind {
    /// Short human-readable name used in "expected X, got Y" diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => format!("number {}", n),
            TokenKind::String(_) => "string literal".to_string(),
            TokenKind::Boolean(b) => b.to_string(),
            TokenKind::Null => "null".to_string(),
            TokenKind::Identifier(name) => format!("identifier '{}'", name),
            TokenKind::VarRef(name) => format!("variable '&{}'", name),
            TokenKind::Keyword(kw) => format!("keyword %{:?}", kw).to_lowercase(),
            TokenKind::Dollar => "'$'".to_string(),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::Slash => "'/'".to_string(),
            TokenKind::Percent => "'%'".to_string(),
            TokenKind::Assign => "'='".to_string(),
            TokenKind::EqEq => "'=='".to_string(),
            TokenKind::NotEq => "'!='".to_string(),
            TokenKind::Lt => "'<'".to_string(),
            TokenKind::LtEq => "'<='".to_string(),
            TokenKind::Gt => "'>'".to_string(),
            TokenKind::GtEq => "'>='".to_string(),
            TokenKind::AndAnd => "'&&'".to_string(),
            TokenKind::OrOr => "'||'".to_string(),
            TokenKind::Bang => "'!'".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::LBrace => "'{'".to_string(),
            TokenKind::RBrace => "'}'".to_string(),
            TokenKind::LBracket => "'['".to_string(),
            TokenKind::RBracket => "']'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Semicolon => "';'".to_string(),
            TokenKind::Colon => "':'".to_string(),
            TokenKind::Dot => "'.'".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

/// A lexed token with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Token { kind, span }
    }
}
