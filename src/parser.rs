use crate::ast::{
    BinOp, Expr, Function, Keyword, Span, Statement, Token, TokenKind, UnaryOp,
};
use crate::error::CompileError;
use crate::lexer::Lexer;
use rust_decimal::prelude::ToPrimitive;

/// Recursive-descent parser for JEX.
///
/// Statements are dispatched on their introducing keyword; expressions use
/// precedence climbing (`||` lowest, postfix access/call highest).
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, CompileError> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Parser {
            tokens,
            position: 0,
        })
    }

    /// Parse a whole script into its top-level statement list.
    pub fn parse_program(&mut self) -> Result<Vec<Statement>, CompileError> {
        let mut statements = Vec::new();
        loop {
            self.skip_empty_statements();
            if self.check(&TokenKind::Eof) {
                return Ok(statements);
            }
            statements.push(self.parse_statement(true)?);
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn current_span(&self) -> Span {
        self.current().span
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    fn check_keyword(&self, kw: Keyword) -> bool {
        matches!(self.current_kind(), TokenKind::Keyword(k) if *k == kw)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), CompileError> {
        if self.check(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&kind.describe()))
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) -> Result<(), CompileError> {
        if self.check_keyword(kw) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("%{:?}", kw).to_lowercase()))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String, CompileError> {
        match self.current_kind() {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn unexpected(&self, expected: &str) -> CompileError {
        CompileError::at(
            format!("expected {}, got {}", expected, self.current_kind().describe()),
            self.current_span(),
        )
    }

    fn skip_empty_statements(&mut self) {
        while self.check(&TokenKind::Semicolon) {
            self.advance();
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_statement(&mut self, top_level: bool) -> Result<Statement, CompileError> {
        let span = self.current_span();
        match self.current_kind() {
            TokenKind::Keyword(Keyword::Let) => self.parse_let(span),
            TokenKind::Keyword(Keyword::Set) => self.parse_set(span),
            TokenKind::Keyword(Keyword::If) => self.parse_if(span),
            TokenKind::Keyword(Keyword::Foreach) => self.parse_foreach(span),
            TokenKind::Keyword(Keyword::Do) => self.parse_do_loop(span),
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                self.expect(TokenKind::Semicolon)?;
                Ok(Statement::Break(span))
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance();
                self.expect(TokenKind::Semicolon)?;
                Ok(Statement::Continue(span))
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.advance();
                let value = if self.check(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(TokenKind::Semicolon)?;
                Ok(Statement::Return { value, span })
            }
            TokenKind::Keyword(Keyword::Func) => {
                if !top_level {
                    return Err(CompileError::at(
                        "function declarations are only allowed at top level",
                        span,
                    ));
                }
                self.parse_function(span)
            }
            TokenKind::Keyword(kw) => Err(CompileError::at(
                format!("keyword %{:?} cannot start a statement", kw).to_lowercase(),
                span,
            )),
            _ => {
                let expr = self.parse_expression()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Statement::Expression(expr))
            }
        }
    }

    fn parse_let(&mut self, span: Span) -> Result<Statement, CompileError> {
        self.advance();
        let name = self.expect_identifier("variable name after %let")?;
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expression()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Statement::Let { name, value, span })
    }

    /// Two shapes, told apart by the token after the first expression:
    ///
    /// ```text
    /// %set <path> = <value>;              // Form A, target $out
    /// %set <target>, <path>, <value>;     // Form B
    /// ```
    fn parse_set(&mut self, span: Span) -> Result<Statement, CompileError> {
        self.advance();
        let first = self.parse_expression()?;
        match self.current_kind() {
            TokenKind::Assign => {
                self.advance();
                let value = self.parse_expression()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Statement::Set {
                    target: None,
                    path: first,
                    value,
                    span,
                })
            }
            TokenKind::Comma => {
                self.advance();
                let path = self.parse_expression()?;
                self.expect(TokenKind::Comma)?;
                let value = self.parse_expression()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Statement::Set {
                    target: Some(first),
                    path,
                    value,
                    span,
                })
            }
            _ => Err(self.unexpected("'=' or ',' after %set target")),
        }
    }

    fn parse_if(&mut self, span: Span) -> Result<Statement, CompileError> {
        self.advance();
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        self.expect_keyword(Keyword::Then)?;
        self.expect_keyword(Keyword::Do)?;
        self.expect(TokenKind::Semicolon)?;

        let (then_branch, closer) = self.parse_block(&[Keyword::End, Keyword::Else])?;
        let else_branch = match closer {
            Keyword::Else => {
                self.advance(); // %else
                self.expect_keyword(Keyword::Do)?;
                self.expect(TokenKind::Semicolon)?;
                let (body, _) = self.parse_block(&[Keyword::End])?;
                self.advance(); // %end
                self.expect(TokenKind::Semicolon)?;
                Some(body)
            }
            _ => {
                self.advance(); // %end
                self.expect(TokenKind::Semicolon)?;
                None
            }
        };

        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
            span,
        })
    }

    fn parse_foreach(&mut self, span: Span) -> Result<Statement, CompileError> {
        self.advance();
        let var = self.expect_identifier("loop variable after %foreach")?;
        self.expect_keyword(Keyword::In)?;
        let collection = self.parse_expression()?;
        self.expect_keyword(Keyword::Do)?;
        self.expect(TokenKind::Semicolon)?;

        let (body, _) = self.parse_block(&[Keyword::End])?;
        self.advance(); // %end
        self.expect(TokenKind::Semicolon)?;

        Ok(Statement::Foreach {
            var,
            collection,
            body,
            span,
        })
    }

    fn parse_do_loop(&mut self, span: Span) -> Result<Statement, CompileError> {
        self.advance();
        let var = self.expect_identifier("loop variable after %do")?;
        self.expect(TokenKind::Assign)?;
        let from = self.parse_expression()?;
        self.expect_keyword(Keyword::To)?;
        let to = self.parse_expression()?;
        self.expect(TokenKind::Semicolon)?;

        let (body, _) = self.parse_block(&[Keyword::End])?;
        self.advance(); // %end
        self.expect(TokenKind::Semicolon)?;

        Ok(Statement::DoLoop {
            var,
            from,
            to,
            body,
            span,
        })
    }

    fn parse_function(&mut self, span: Span) -> Result<Statement, CompileError> {
        self.advance();
        let name = self.expect_identifier("function name after %func")?;
        self.expect(TokenKind::LParen)?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.expect_identifier("parameter name")?);
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Semicolon)?;

        let (body, _) = self.parse_block(&[Keyword::EndFunc])?;
        self.advance(); // %endfunc
        self.expect(TokenKind::Semicolon)?;

        Ok(Statement::FunctionDecl(std::sync::Arc::new(Function {
            name,
            params,
            body,
            span,
        })))
    }

    /// Parse statements until one of the closing keywords is reached. The
    /// closer itself is left for the caller to consume.
    fn parse_block(
        &mut self,
        closers: &[Keyword],
    ) -> Result<(Vec<Statement>, Keyword), CompileError> {
        let mut statements = Vec::new();
        loop {
            self.skip_empty_statements();
            if let TokenKind::Keyword(kw) = self.current_kind() {
                if closers.contains(kw) {
                    return Ok((statements, *kw));
                }
            }
            if self.check(&TokenKind::Eof) {
                return Err(self.unexpected(&format!(
                    "%{:?} to close the block",
                    closers[0]
                )
                .to_lowercase()));
            }
            statements.push(self.parse_statement(false)?);
        }
    }

    // ------------------------------------------------------------------
    // Expressions, lowest precedence first
    // ------------------------------------------------------------------

    pub fn parse_expression(&mut self) -> Result<Expr, CompileError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_and()?;
        while self.check(&TokenKind::OrOr) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Binary {
                op: BinOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_equality()?;
        while self.check(&TokenKind::AndAnd) {
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::Binary {
                op: BinOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.current_kind() {
                TokenKind::EqEq => BinOp::Equal,
                TokenKind::NotEq => BinOp::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current_kind() {
                TokenKind::Lt => BinOp::LessThan,
                TokenKind::LtEq => BinOp::LessEqual,
                TokenKind::Gt => BinOp::GreaterThan,
                TokenKind::GtEq => BinOp::GreaterEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current_kind() {
                TokenKind::Star => BinOp::Multiply,
                TokenKind::Slash => BinOp::Divide,
                TokenKind::Percent => BinOp::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        match self.current_kind() {
            TokenKind::Bang => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            }
            TokenKind::Minus => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Negate,
                    operand: Box::new(operand),
                })
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_identifier("property name after '.'")?;
                    if self.check(&TokenKind::LParen) {
                        return Err(CompileError::at(
                            format!("method call syntax '.{}()' is not supported", name),
                            self.current_span(),
                        ));
                    }
                    expr = Expr::Property {
                        base: Box::new(expr),
                        name,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RBracket)?;
                    expr = Expr::Index {
                        base: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        let span = self.current_span();
        match self.current_kind().clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::String(s))
            }
            TokenKind::Boolean(b) => {
                self.advance();
                Ok(Expr::Boolean(b))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Null)
            }
            TokenKind::VarRef(name) => {
                self.advance();
                Ok(Expr::VarRef(name))
            }
            TokenKind::Dollar => {
                self.advance();
                match self.current_kind() {
                    TokenKind::Dot => self.parse_json_path(),
                    TokenKind::Identifier(name) => {
                        let name = name.clone();
                        self.advance();
                        Ok(Expr::BuiltinVar(name))
                    }
                    _ => Err(self.unexpected("'.' or a root name after '$'")),
                }
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if self.check(&TokenKind::LParen) {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            args.push(self.parse_expression()?);
                            if self.check(&TokenKind::Comma) {
                                self.advance();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen)?;
                    Ok(Expr::Call { name, args, span })
                } else {
                    Ok(Expr::VarRef(name))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBrace => {
                self.advance();
                self.parse_object_literal()
            }
            TokenKind::LBracket => {
                self.advance();
                self.parse_array_literal()
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn peek_kind(&self, offset: usize) -> &TokenKind {
        let idx = (self.position + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    /// Reassemble `$.a.b[0]['key'][*]` source form into a single canonical
    /// path literal. Called with the cursor on the first `.` after `$`.
    ///
    /// A bracket whose content is not a literal segment (`$.items[&i]`) is
    /// left alone so postfix index access applies to the path instead.
    fn parse_json_path(&mut self) -> Result<Expr, CompileError> {
        let mut path = String::from("$");
        loop {
            match self.current_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_identifier("segment name after '.'")?;
                    path.push('.');
                    path.push_str(&name);
                }
                TokenKind::LBracket
                    if matches!(
                        self.peek_kind(1),
                        TokenKind::Number(_) | TokenKind::String(_) | TokenKind::Star
                    ) || (matches!(self.peek_kind(1), TokenKind::Minus)
                        && matches!(self.peek_kind(2), TokenKind::Number(_))) =>
                {
                    self.advance();
                    match self.current_kind().clone() {
                        TokenKind::Number(n) => {
                            let index = n.to_i64().filter(|_| n.is_integer()).ok_or_else(
                                || self.unexpected("integer index in path segment"),
                            )?;
                            self.advance();
                            path.push_str(&format!("[{}]", index));
                        }
                        TokenKind::Minus => {
                            self.advance();
                            match self.current_kind().clone() {
                                TokenKind::Number(n) => {
                                    let index = n
                                        .to_i64()
                                        .filter(|_| n.is_integer())
                                        .ok_or_else(|| {
                                            self.unexpected("integer index in path segment")
                                        })?;
                                    self.advance();
                                    path.push_str(&format!("[{}]", -index));
                                }
                                _ => return Err(self.unexpected("integer index after '-'")),
                            }
                        }
                        TokenKind::String(s) => {
                            self.advance();
                            path.push_str(&format!("['{}']", s));
                        }
                        TokenKind::Star => {
                            self.advance();
                            path.push_str("[*]");
                        }
                        _ => return Err(self.unexpected("index, string, or '*' in path segment")),
                    }
                    self.expect(TokenKind::RBracket)?;
                }
                _ => return Ok(Expr::JsonPath(path)),
            }
        }
    }

    fn parse_object_literal(&mut self) -> Result<Expr, CompileError> {
        let mut pairs = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let key = match self.current_kind() {
                TokenKind::String(s) => s.clone(),
                TokenKind::Identifier(s) => s.clone(),
                _ => return Err(self.unexpected("string or identifier as object key")),
            };
            self.advance();
            self.expect(TokenKind::Colon)?;
            let value = self.parse_expression()?;
            pairs.push((key, value));

            if !self.check(&TokenKind::RBrace) {
                self.expect(TokenKind::Comma)?;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Expr::Object(pairs))
    }

    fn parse_array_literal(&mut self) -> Result<Expr, CompileError> {
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RBracket) {
            elements.push(self.parse_expression()?);
            if !self.check(&TokenKind::RBracket) {
                self.expect(TokenKind::Comma)?;
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Expr::Array(elements))
    }
}
