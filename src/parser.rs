use miette::Diagnostic;
use std::{iter::Peekable, rc::Rc};
use thiserror::Error;

use crate::{
    ast::*,
    keywords,
    scanner::{Token, TokenKind, TokenKindName},
    source::SourceSpan,
    source_reference::SourceReference,
};

/// Hard limit on call arguments and function parameters.
pub const MAX_ARITY: usize = 255;

#[derive(Error, Diagnostic, Debug)]
pub enum ParserError {
    #[error("Expect {expected}.")]
    ExpectedToken {
        expected: &'static str,
        actual: TokenKindName,
        #[label("found {actual:?} instead")]
        found_at: SourceSpan,
    },
    #[error("Expect expression.")]
    ExpectedExpression {
        actual: TokenKindName,
        #[label("found {actual:?} instead")]
        found_at: SourceSpan,
    },
    #[error("Invalid assignment target.")]
    InvalidAssignmentTarget {
        actual: TokenKindName,
        #[label("cannot assign here")]
        found_at: SourceSpan,
    },
    #[error("Can't have more than 255 arguments.")]
    TooManyArguments {
        actual: TokenKindName,
        #[label("argument 256 starts here")]
        found_at: SourceSpan,
    },
    #[error("Can't have more than 255 parameters.")]
    TooManyParameters {
        actual: TokenKindName,
        #[label("parameter 256 starts here")]
        found_at: SourceSpan,
    },
}

impl ParserError {
    pub fn span(&self) -> SourceSpan {
        match self {
            ParserError::ExpectedToken { found_at, .. }
            | ParserError::ExpectedExpression { found_at, .. }
            | ParserError::InvalidAssignmentTarget { found_at, .. }
            | ParserError::TooManyArguments { found_at, .. }
            | ParserError::TooManyParameters { found_at, .. } => *found_at,
        }
    }
    pub fn actual(&self) -> TokenKindName {
        match self {
            ParserError::ExpectedToken { actual, .. }
            | ParserError::ExpectedExpression { actual, .. }
            | ParserError::InvalidAssignmentTarget { actual, .. }
            | ParserError::TooManyArguments { actual, .. }
            | ParserError::TooManyParameters { actual, .. } => *actual,
        }
    }
}

/// Recursive-descent parser. A syntax error abandons the declaration being
/// parsed, synchronizes to the next statement boundary, and keeps going;
/// everything that parsed cleanly is returned alongside the errors.
pub struct Parser<Stream: Iterator<Item = Token>> {
    tokens: Peekable<Stream>,
    current: Option<Token>,
    recovered_errors: Vec<ParserError>,
}

impl<Stream: Iterator<Item = Token>> Parser<Stream> {
    pub fn parse(
        tokens: Stream,
        source_reference: SourceReference,
    ) -> (Program, Vec<ParserError>) {
        let mut parser = Parser {
            tokens: tokens.peekable(),
            current: None,
            recovered_errors: Vec::new(),
        };
        let statements = parser.parse_program();
        (
            Program {
                statements,
                source_reference,
            },
            parser.recovered_errors,
        )
    }

    fn parse_program(&mut self) -> Vec<DeclOrStmt> {
        let mut statements = Vec::new();
        while !matches!(
            self.tokens.peek(),
            None | Some(Token {
                kind: TokenKind::Eof,
                ..
            })
        ) {
            match self.parse_decl_or_stmt() {
                Ok(stmt) => statements.push(stmt),
                Err(error) => {
                    self.recovered_errors.push(error);
                    self.synchronize();
                }
            }
        }
        statements
    }

    fn parse_decl_or_stmt(&mut self) -> Result<DeclOrStmt, ParserError> {
        if let Some(var_span) = self.consume_kind(&TokenKind::Var) {
            return Ok(DeclOrStmt::Decl(Decl::Var(self.parse_var_decl(var_span)?)));
        }
        if let Some(fun_span) = self.consume_kind(&TokenKind::Fun) {
            let fun = self.parse_function(fun_span, "function")?;
            return Ok(DeclOrStmt::Decl(Decl::Fun(FunDecl { fun: Rc::new(fun) })));
        }
        if let Some(class_span) = self.consume_kind(&TokenKind::Class) {
            return Ok(DeclOrStmt::Decl(Decl::Class(
                self.parse_class_decl(class_span)?,
            )));
        }
        Ok(DeclOrStmt::Stmt(self.parse_stmt()?))
    }

    fn parse_var_decl(&mut self, var_span: SourceSpan) -> Result<VarDecl, ParserError> {
        let name = self.parse_identifier("variable name")?;
        let initializer = match self.consume_kind(&TokenKind::Equal) {
            Some(_) => Some(self.parse_expr()?),
            None => None,
        };
        self.expect_kind(&TokenKind::Semicolon, "';' after variable declaration")?;
        Ok(VarDecl {
            var_span,
            name,
            initializer,
        })
    }

    fn parse_function(
        &mut self,
        start_span: SourceSpan,
        kind: &'static str,
    ) -> Result<Fun, ParserError> {
        let name = self.parse_identifier(match kind {
            "method" => "method name",
            _ => "function name",
        })?;
        self.expect_kind(
            &TokenKind::LeftParen,
            match kind {
                "method" => "'(' after method name",
                _ => "'(' after function name",
            },
        )?;
        let mut parameters = Vec::new();
        if !self.check_kind(&TokenKind::RightParen) {
            loop {
                if parameters.len() >= MAX_ARITY {
                    let error = self.error_at_peek(|actual, found_at| {
                        ParserError::TooManyParameters { actual, found_at }
                    });
                    self.recovered_errors.push(error);
                }
                parameters.push(self.parse_identifier("parameter name")?);
                if self.consume_kind(&TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect_kind(&TokenKind::RightParen, "')' after parameters")?;
        self.expect_kind(&TokenKind::LeftBrace, "'{' before function body")?;
        let (body, close_span) = self.parse_block_body()?;
        Ok(Fun {
            span: start_span.until(close_span),
            name,
            parameters,
            body,
        })
    }

    fn parse_class_decl(&mut self, class_span: SourceSpan) -> Result<ClassDecl, ParserError> {
        let name = self.parse_identifier("class name")?;
        let superclass = match self.consume_kind(&TokenKind::Less) {
            Some(_) => Some(VariableExpr {
                name: self.parse_identifier("superclass name")?,
            }),
            None => None,
        };
        self.expect_kind(&TokenKind::LeftBrace, "'{' before class body")?;
        let mut methods = Vec::new();
        while !self.check_kind(&TokenKind::RightBrace) && self.tokens.peek().is_some() {
            if self.check_kind(&TokenKind::Eof) {
                break;
            }
            let start_span = self.peek_or_eof().span;
            methods.push(Rc::new(self.parse_function(start_span, "method")?));
        }
        self.expect_kind(&TokenKind::RightBrace, "'}' after class body")?;
        Ok(ClassDecl {
            class_span,
            name,
            superclass,
            methods,
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParserError> {
        if let Some(print_span) = self.consume_kind(&TokenKind::Print) {
            let expression = self.parse_expr()?;
            self.expect_kind(&TokenKind::Semicolon, "';' after value")?;
            return Ok(Stmt::Print(PrintStmt {
                print_span,
                expression,
            }));
        }
        if let Some(open_span) = self.consume_kind(&TokenKind::LeftBrace) {
            let (body, close_span) = self.parse_block_body()?;
            return Ok(Stmt::Block(BlockStmt {
                open_span,
                close_span,
                body,
            }));
        }
        if let Some(if_span) = self.consume_kind(&TokenKind::If) {
            return self.parse_if_stmt(if_span);
        }
        if let Some(while_span) = self.consume_kind(&TokenKind::While) {
            return self.parse_while_stmt(while_span);
        }
        if let Some(for_span) = self.consume_kind(&TokenKind::For) {
            return self.parse_for_stmt(for_span);
        }
        if let Some(return_span) = self.consume_kind(&TokenKind::Return) {
            let expression = if self.check_kind(&TokenKind::Semicolon) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            self.expect_kind(&TokenKind::Semicolon, "';' after return value")?;
            return Ok(Stmt::Return(ReturnStmt {
                return_span,
                expression,
            }));
        }
        let expression = self.parse_expr()?;
        self.expect_kind(&TokenKind::Semicolon, "';' after expression")?;
        Ok(Stmt::Expr(ExprStmt { expression }))
    }

    fn parse_block_body(&mut self) -> Result<(Vec<DeclOrStmt>, SourceSpan), ParserError> {
        let mut body = Vec::new();
        while !self.check_kind(&TokenKind::RightBrace) && !self.check_kind(&TokenKind::Eof) {
            if self.tokens.peek().is_none() {
                break;
            }
            body.push(self.parse_decl_or_stmt()?);
        }
        let close_span = self.expect_kind(&TokenKind::RightBrace, "'}' after block")?;
        Ok((body, close_span))
    }

    fn parse_if_stmt(&mut self, if_span: SourceSpan) -> Result<Stmt, ParserError> {
        self.expect_kind(&TokenKind::LeftParen, "'(' after 'if'")?;
        let condition = self.parse_expr()?;
        self.expect_kind(&TokenKind::RightParen, "')' after if condition")?;
        let then_branch = Box::new(self.parse_stmt()?);
        let else_branch = match self.consume_kind(&TokenKind::Else) {
            Some(_) => Some(Box::new(self.parse_stmt()?)),
            None => None,
        };
        Ok(Stmt::If(IfStmt {
            if_span,
            condition,
            then_branch,
            else_branch,
        }))
    }

    fn parse_while_stmt(&mut self, while_span: SourceSpan) -> Result<Stmt, ParserError> {
        self.expect_kind(&TokenKind::LeftParen, "'(' after 'while'")?;
        let condition = self.parse_expr()?;
        self.expect_kind(&TokenKind::RightParen, "')' after condition")?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::While(WhileStmt {
            while_span,
            condition,
            body,
        }))
    }

    /// `for` is pure sugar: it is rewritten into a block around a `while`
    /// right here, so no later pass knows the construct exists.
    fn parse_for_stmt(&mut self, for_span: SourceSpan) -> Result<Stmt, ParserError> {
        self.expect_kind(&TokenKind::LeftParen, "'(' after 'for'")?;

        let initializer = if self.consume_kind(&TokenKind::Semicolon).is_some() {
            None
        } else if let Some(var_span) = self.consume_kind(&TokenKind::Var) {
            Some(DeclOrStmt::Decl(Decl::Var(self.parse_var_decl(var_span)?)))
        } else {
            let expression = self.parse_expr()?;
            self.expect_kind(&TokenKind::Semicolon, "';' after loop initializer")?;
            Some(DeclOrStmt::Stmt(Stmt::Expr(ExprStmt { expression })))
        };

        let condition = if self.check_kind(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect_kind(&TokenKind::Semicolon, "';' after loop condition")?;

        let increment = if self.check_kind(&TokenKind::RightParen) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        let close_span = self.expect_kind(&TokenKind::RightParen, "')' after for clauses")?;

        let mut body = self.parse_stmt()?;
        let body_span = body.source_span();

        if let Some(increment) = increment {
            body = Stmt::Block(BlockStmt {
                open_span: body_span,
                close_span: body_span,
                body: vec![
                    DeclOrStmt::Stmt(body),
                    DeclOrStmt::Stmt(Stmt::Expr(ExprStmt {
                        expression: increment,
                    })),
                ],
            });
        }

        let condition = condition.unwrap_or(Expr::Literal(LiteralExpr {
            value: LiteralValue::Boolean(true),
            span: close_span,
        }));
        let mut result = Stmt::While(WhileStmt {
            while_span: for_span,
            condition,
            body: Box::new(body),
        });

        if let Some(initializer) = initializer {
            result = Stmt::Block(BlockStmt {
                open_span: for_span,
                close_span: body_span,
                body: vec![initializer, DeclOrStmt::Stmt(result)],
            });
        }
        Ok(result)
    }

    fn parse_expr(&mut self) -> Result<Expr, ParserError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParserError> {
        let expr = self.parse_logic_or()?;

        if let Some(equals_span) = self.consume_kind(&TokenKind::Equal) {
            let value = Box::new(self.parse_assignment()?);
            return Ok(match expr {
                Expr::Variable(VariableExpr { name }) => Expr::Assign(AssignExpr { name, value }),
                Expr::Get(GetExpr { object, name }) => Expr::Set(SetExpr {
                    object,
                    name,
                    value,
                }),
                other => {
                    // not fatal: the bad target is reported and parsing continues
                    self.recovered_errors
                        .push(ParserError::InvalidAssignmentTarget {
                            actual: TokenKindName::Equal,
                            found_at: equals_span,
                        });
                    other
                }
            });
        }
        Ok(expr)
    }

    fn parse_logic_or(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.parse_logic_and()?;
        while let Some(operator) = self.consume_match(|token| match token.kind {
            TokenKind::Or => Some(WithSpan::new(LogicalOperator::Or, token.span)),
            _ => None,
        }) {
            expr = Expr::Logical(LogicalExpr {
                left: Box::new(expr),
                operator,
                right: Box::new(self.parse_logic_and()?),
            });
        }
        Ok(expr)
    }

    fn parse_logic_and(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.parse_equality()?;
        while let Some(operator) = self.consume_match(|token| match token.kind {
            TokenKind::And => Some(WithSpan::new(LogicalOperator::And, token.span)),
            _ => None,
        }) {
            expr = Expr::Logical(LogicalExpr {
                left: Box::new(expr),
                operator,
                right: Box::new(self.parse_equality()?),
            });
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.parse_comparison()?;
        while let Some(operator) = self.consume_match(|token| match token.kind {
            TokenKind::BangEqual => Some(WithSpan::new(BinaryOperator::NotEqualTo, token.span)),
            TokenKind::EqualEqual => Some(WithSpan::new(BinaryOperator::EqualTo, token.span)),
            _ => None,
        }) {
            expr = Expr::Binary(BinaryExpr {
                left: Box::new(expr),
                operator,
                right: Box::new(self.parse_comparison()?),
            });
        }
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.parse_term()?;
        while let Some(operator) = self.consume_match(|token| match token.kind {
            TokenKind::Less => Some(WithSpan::new(BinaryOperator::LessThan, token.span)),
            TokenKind::LessEqual => {
                Some(WithSpan::new(BinaryOperator::LessThanOrEqualTo, token.span))
            }
            TokenKind::Greater => Some(WithSpan::new(BinaryOperator::GreaterThan, token.span)),
            TokenKind::GreaterEqual => Some(WithSpan::new(
                BinaryOperator::GreaterThanOrEqualTo,
                token.span,
            )),
            _ => None,
        }) {
            expr = Expr::Binary(BinaryExpr {
                left: Box::new(expr),
                operator,
                right: Box::new(self.parse_term()?),
            });
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.parse_factor()?;
        while let Some(operator) = self.consume_match(|token| match token.kind {
            TokenKind::Minus => Some(WithSpan::new(BinaryOperator::Minus, token.span)),
            TokenKind::Plus => Some(WithSpan::new(BinaryOperator::Plus, token.span)),
            _ => None,
        }) {
            expr = Expr::Binary(BinaryExpr {
                left: Box::new(expr),
                operator,
                right: Box::new(self.parse_factor()?),
            });
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.parse_unary()?;
        while let Some(operator) = self.consume_match(|token| match token.kind {
            TokenKind::Slash => Some(WithSpan::new(BinaryOperator::Divide, token.span)),
            TokenKind::Star => Some(WithSpan::new(BinaryOperator::Multiply, token.span)),
            _ => None,
        }) {
            expr = Expr::Binary(BinaryExpr {
                left: Box::new(expr),
                operator,
                right: Box::new(self.parse_unary()?),
            });
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParserError> {
        if let Some(operator) = self.consume_match(|token| match token.kind {
            TokenKind::Minus => Some(WithSpan::new(UnaryOperator::Minus, token.span)),
            TokenKind::Bang => Some(WithSpan::new(UnaryOperator::Not, token.span)),
            _ => None,
        }) {
            return Ok(Expr::Unary(UnaryExpr {
                operator,
                right: Box::new(self.parse_unary()?),
            }));
        }
        self.parse_call()
    }

    fn parse_call(&mut self) -> Result<Expr, ParserError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.consume_kind(&TokenKind::LeftParen).is_some() {
                expr = self.finish_call(expr)?;
            } else if self.consume_kind(&TokenKind::Dot).is_some() {
                let name = self.parse_identifier("property name after '.'")?;
                expr = Expr::Get(GetExpr {
                    object: Box::new(expr),
                    name,
                });
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr, ParserError> {
        let mut arguments = Vec::new();
        if !self.check_kind(&TokenKind::RightParen) {
            loop {
                if arguments.len() >= MAX_ARITY {
                    let error = self.error_at_peek(|actual, found_at| {
                        ParserError::TooManyArguments { actual, found_at }
                    });
                    self.recovered_errors.push(error);
                }
                arguments.push(self.parse_expr()?);
                if self.consume_kind(&TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        let close_paren_span = self.expect_kind(&TokenKind::RightParen, "')' after arguments")?;
        Ok(Expr::Call(CallExpr {
            callee: Box::new(callee),
            close_paren_span,
            arguments,
        }))
    }

    fn parse_primary(&mut self) -> Result<Expr, ParserError> {
        if let Some(literal) = self.consume_match(|token| {
            let value = match &token.kind {
                TokenKind::False => LiteralValue::Boolean(false),
                TokenKind::True => LiteralValue::Boolean(true),
                TokenKind::Nil => LiteralValue::Nil,
                TokenKind::Number(number) => LiteralValue::Number(*number),
                TokenKind::String(string) => LiteralValue::String(string.clone()),
                _ => return None,
            };
            Some(LiteralExpr {
                value,
                span: token.span,
            })
        }) {
            return Ok(Expr::Literal(literal));
        }

        if let Some(keyword) = self.consume_match(|token| match token.kind {
            TokenKind::This => Some(Identifier::new(keywords::THIS, token.span)),
            _ => None,
        }) {
            return Ok(Expr::This(ThisExpr { keyword }));
        }

        if let Some(keyword) = self.consume_match(|token| match token.kind {
            TokenKind::Super => Some(Identifier::new(keywords::SUPER, token.span)),
            _ => None,
        }) {
            self.expect_kind(&TokenKind::Dot, "'.' after 'super'")?;
            let method = self.parse_identifier("superclass method name")?;
            return Ok(Expr::Super(SuperExpr { keyword, method }));
        }

        if let Some(name) = self.consume_match(|token| match &token.kind {
            TokenKind::Identifier(name) => Some(Identifier::new(name.clone(), token.span)),
            _ => None,
        }) {
            return Ok(Expr::Variable(VariableExpr { name }));
        }

        if self.consume_kind(&TokenKind::LeftParen).is_some() {
            let inner = Box::new(self.parse_expr()?);
            self.expect_kind(&TokenKind::RightParen, "')' after expression")?;
            return Ok(Expr::Grouping(GroupingExpr { inner }));
        }

        Err(self.error_at_peek(|actual, found_at| ParserError::ExpectedExpression {
            actual,
            found_at,
        }))
    }

    fn parse_identifier(&mut self, expected: &'static str) -> Result<Identifier, ParserError> {
        if let Some(identifier) = self.consume_match(|token| match &token.kind {
            TokenKind::Identifier(name) => Some(Identifier::new(name.clone(), token.span)),
            _ => None,
        }) {
            Ok(identifier)
        } else {
            Err(self.error_at_peek(|actual, found_at| ParserError::ExpectedToken {
                expected,
                actual,
                found_at,
            }))
        }
    }

    /// Discard tokens until a statement boundary: just past a semicolon, or
    /// just before a keyword that can begin a declaration or statement.
    fn synchronize(&mut self) {
        while self.advance() {
            if matches!(
                self.current,
                Some(Token {
                    kind: TokenKind::Semicolon,
                    ..
                })
            ) {
                return;
            }
            match self.tokens.peek() {
                None
                | Some(Token {
                    kind:
                        TokenKind::Class
                        | TokenKind::Fun
                        | TokenKind::Var
                        | TokenKind::For
                        | TokenKind::If
                        | TokenKind::While
                        | TokenKind::Print
                        | TokenKind::Return
                        | TokenKind::Eof,
                    ..
                }) => return,
                Some(_) => {}
            }
        }
    }

    fn advance(&mut self) -> bool {
        match self.tokens.next() {
            Some(token) => {
                let at_eof = token.kind == TokenKind::Eof;
                self.current = Some(token);
                !at_eof
            }
            None => false,
        }
    }

    fn peek_or_eof(&mut self) -> &Token {
        self.tokens
            .peek()
            .or(self.current.as_ref())
            .expect("token stream ends with Eof")
    }

    fn error_at_peek<F: FnOnce(TokenKindName, SourceSpan) -> ParserError>(
        &mut self,
        make_error: F,
    ) -> ParserError {
        let token = self.peek_or_eof();
        make_error((&token.kind).into(), token.span)
    }

    fn consume_match<T, F: Fn(&Token) -> Option<T>>(&mut self, check: F) -> Option<T> {
        let token = self.tokens.peek()?;
        let value = check(token)?;
        self.advance();
        Some(value)
    }

    fn check_kind(&mut self, kind: &TokenKind) -> bool {
        matches!(self.tokens.peek(), Some(token) if token.kind == *kind)
    }

    fn consume_kind(&mut self, kind: &TokenKind) -> Option<SourceSpan> {
        self.consume_match(|token| {
            if token.kind == *kind {
                Some(token.span)
            } else {
                None
            }
        })
    }

    fn expect_kind(
        &mut self,
        kind: &TokenKind,
        expected: &'static str,
    ) -> Result<SourceSpan, ParserError> {
        match self.consume_kind(kind) {
            Some(span) => Ok(span),
            None => Err(self.error_at_peek(|actual, found_at| ParserError::ExpectedToken {
                expected,
                actual,
                found_at,
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;
    use pretty_assertions::assert_eq;

    fn parse_source(source: &str) -> (Program, Vec<ParserError>) {
        let tokens = Scanner::new(source)
            .filter_map(Result::ok)
            .filter(|token| token.kind != TokenKind::LineComment);
        Parser::parse(tokens, SourceReference::new("test.lox", source))
    }

    fn parse_to_string(source: &str) -> String {
        let (program, errors) = parse_source(source);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        program.to_string().trim_end().to_string()
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(parse_to_string("1 + 2 * 3;"), "(+ 1 (* 2 3))");
        assert_eq!(parse_to_string("(1 + 2) * 3;"), "(* (group (+ 1 2)) 3)");
        assert_eq!(parse_to_string("1 < 2 == true;"), "(== (< 1 2) true)");
        assert_eq!(parse_to_string("-1 - -2;"), "(- (- 1) (- 2))");
    }

    #[test]
    fn logical_operators_bind_looser_than_equality() {
        assert_eq!(
            parse_to_string("a == 1 or b == 2 and c;"),
            "(or (== a 1) (and (== b 2) c))"
        );
    }

    #[test]
    fn assignment_targets() {
        assert_eq!(parse_to_string("a = b = 1;"), "(assign a (assign b 1))");
        assert_eq!(parse_to_string("a.b.c = 1;"), "(set (get a b) c 1)");

        let (_, errors) = parse_source("1 = 2;");
        assert!(matches!(
            errors.as_slice(),
            [ParserError::InvalidAssignmentTarget { .. }]
        ));
    }

    #[test]
    fn call_and_property_chains() {
        assert_eq!(
            parse_to_string("foo(1)(2).bar.baz(3);"),
            "(call (get (get (call (call foo 1) 2) bar) baz) 3)"
        );
        assert_eq!(parse_to_string("super.method(1);"), "(call (super method) 1)");
        assert_eq!(parse_to_string("this.field;"), "(get this field)");
    }

    #[test]
    fn for_loop_desugars_to_while() {
        assert_eq!(
            parse_to_string("for (var i = 0; i < 3; i = i + 1) print i;"),
            "(do (var i 0) (while (< i 3) (do (print i) (assign i (+ i 1)))))"
        );
        assert_eq!(parse_to_string("for (;;) print 1;"), "(while true (print 1))");
    }

    #[test]
    fn class_declaration() {
        assert_eq!(
            parse_to_string("class B < A { init(x) { } show() { } }"),
            "(class B < A (fun init (x)) (fun show ()))"
        );
    }

    #[test]
    fn panic_mode_recovers_at_statement_boundary() {
        let (program, errors) = parse_source("var = 1;\nprint 2;");
        assert_eq!(errors.len(), 1);
        assert_eq!(program.statements.len(), 1);
        assert_eq!(program.statements[0].to_string(), "(print 2)");
    }

    #[test]
    fn missing_semicolon_reports_and_recovers() {
        let (program, errors) = parse_source("print 1 2;\nprint 3;");
        assert!(matches!(
            errors.as_slice(),
            [ParserError::ExpectedToken {
                expected: "';' after value",
                ..
            }]
        ));
        assert_eq!(program.statements.len(), 1);
        assert_eq!(program.statements[0].to_string(), "(print 3)");
    }
}
