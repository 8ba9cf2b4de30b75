use crate::ast::{Keyword, Position, Span, Token, TokenKind};
use crate::error::CompileError;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Lexer for JEX source text.
///
/// Produces a stream of spanned tokens. Whitespace is insignificant;
/// `// ...` and `/* ... */` comments (non-nesting) are skipped.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: u32,
    column: u32,
    offset: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            offset: 0,
        }
    }

    /// Lex the whole input, ending with an `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, CompileError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.offset += ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.position += 1;
    }

    fn here(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
            offset: self.offset,
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), CompileError> {
        loop {
            match self.current_char() {
                Some(ch) if ch.is_whitespace() => self.advance(),
                Some('/') if self.peek_char(1) == Some('/') => {
                    while let Some(ch) = self.current_char() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_char(1) == Some('*') => {
                    let start = self.here();
                    self.advance();
                    self.advance();
                    loop {
                        match self.current_char() {
                            Some('*') if self.peek_char(1) == Some('/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            Some(_) => self.advance(),
                            None => {
                                return Err(CompileError::at(
                                    "unterminated block comment",
                                    Span::new(start, self.here()),
                                ))
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, start: Position) -> Result<TokenKind, CompileError> {
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                '"' => {
                    self.advance();
                    return Ok(TokenKind::String(result));
                }
                '\\' => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('r') => result.push('\r'),
                        Some('t') => result.push('\t'),
                        Some('"') => result.push('"'),
                        Some('\\') => result.push('\\'),
                        Some(ch) => {
                            return Err(CompileError::at(
                                format!("invalid escape sequence '\\{}'", ch),
                                Span::new(start, self.here()),
                            ))
                        }
                        None => {
                            return Err(CompileError::at(
                                "unterminated string",
                                Span::new(start, self.here()),
                            ))
                        }
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(CompileError::at(
            "unterminated string",
            Span::new(start, self.here()),
        ))
    }

    fn read_number(&mut self, start: Position) -> Result<TokenKind, CompileError> {
        let mut number = String::new();
        let mut is_decimal = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_decimal
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_decimal = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match Decimal::from_str(&number) {
            Ok(value) => Ok(TokenKind::Number(value)),
            Err(_) => Err(CompileError::at(
                format!("invalid number literal '{}'", number),
                Span::new(start, self.here()),
            )),
        }
    }

    pub fn next_token(&mut self) -> Result<Token, CompileError> {
        self.skip_whitespace_and_comments()?;

        let start = self.here();
        let kind = match self.current_char() {
            None => TokenKind::Eof,
            Some('%') => {
                // `%` followed by a letter starts a keyword, otherwise it
                // is the modulo operator.
                if self.peek_char(1).is_some_and(|c| c.is_alphabetic()) {
                    self.advance();
                    let name = self.read_identifier();
                    match Keyword::from_name(&name) {
                        Some(kw) => TokenKind::Keyword(kw),
                        None => {
                            return Err(CompileError::at(
                                format!("unrecognized keyword '%{}'", name),
                                Span::new(start, self.here()),
                            ))
                        }
                    }
                } else {
                    self.advance();
                    TokenKind::Percent
                }
            }
            Some('&') => {
                if self.peek_char(1) == Some('&') {
                    self.advance();
                    self.advance();
                    TokenKind::AndAnd
                } else if self
                    .peek_char(1)
                    .is_some_and(|c| c.is_alphabetic() || c == '_')
                {
                    self.advance();
                    let name = self.read_identifier();
                    TokenKind::VarRef(name)
                } else {
                    return Err(CompileError::at(
                        "expected '&&' or a variable name after '&'",
                        Span::new(start, self.here()),
                    ));
                }
            }
            Some('|') => {
                if self.peek_char(1) == Some('|') {
                    self.advance();
                    self.advance();
                    TokenKind::OrOr
                } else {
                    return Err(CompileError::at(
                        "expected '||' (lone '|' is not an operator)",
                        Span::new(start, self.here()),
                    ));
                }
            }
            Some('=') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    TokenKind::EqEq
                } else {
                    self.advance();
                    TokenKind::Assign
                }
            }
            Some('!') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    TokenKind::NotEq
                } else {
                    self.advance();
                    TokenKind::Bang
                }
            }
            Some('<') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    TokenKind::LtEq
                } else {
                    self.advance();
                    TokenKind::Lt
                }
            }
            Some('>') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    TokenKind::GtEq
                } else {
                    self.advance();
                    TokenKind::Gt
                }
            }
            Some('$') => {
                self.advance();
                TokenKind::Dollar
            }
            Some('+') => {
                self.advance();
                TokenKind::Plus
            }
            Some('-') => {
                self.advance();
                TokenKind::Minus
            }
            Some('*') => {
                self.advance();
                TokenKind::Star
            }
            Some('/') => {
                self.advance();
                TokenKind::Slash
            }
            Some('(') => {
                self.advance();
                TokenKind::LParen
            }
            Some(')') => {
                self.advance();
                TokenKind::RParen
            }
            Some('{') => {
                self.advance();
                TokenKind::LBrace
            }
            Some('}') => {
                self.advance();
                TokenKind::RBrace
            }
            Some('[') => {
                self.advance();
                TokenKind::LBracket
            }
            Some(']') => {
                self.advance();
                TokenKind::RBracket
            }
            Some(',') => {
                self.advance();
                TokenKind::Comma
            }
            Some(';') => {
                self.advance();
                TokenKind::Semicolon
            }
            Some(':') => {
                self.advance();
                TokenKind::Colon
            }
            Some('.') => {
                self.advance();
                TokenKind::Dot
            }
            Some('"') => self.read_string(start)?,
            Some(ch) if ch.is_ascii_digit() => self.read_number(start)?,
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();
                match ident.as_str() {
                    "true" => TokenKind::Boolean(true),
                    "false" => TokenKind::Boolean(false),
                    "null" => TokenKind::Null,
                    _ => TokenKind::Identifier(ident),
                }
            }
            Some(ch) => {
                return Err(CompileError::at(
                    format!("unexpected character '{}'", ch),
                    Span::new(start, self.here()),
                ))
            }
        };

        Ok(Token::new(kind, Span::new(start, self.here())))
    }
}
