use miette::Diagnostic;
use thiserror::Error;

use super::{
    chunk::{Chunk, OpCode},
    heap::Heap,
    object::ObjFunction,
    scanner::{Scanner, Token, TokenKind},
    value::Value,
};
use crate::{source::SourceSpan, source_reference::SourceReference};
use std::rc::Rc;

const MAX_LOCALS: usize = u8::MAX as usize + 1;

#[derive(Error, Diagnostic, Debug)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,
    pub at_end: bool,
    #[label("here")]
    pub found_at: SourceSpan,
    #[source_code]
    pub source_code: SourceReference,
}

impl CompileError {
    pub fn line(&self) -> usize {
        self.source_code.line_at(self.found_at.start())
    }
    pub fn lexeme(&self) -> &str {
        self.source_code.slice(self.found_at)
    }
}

/// Expression precedence, lowest to highest. `next()` is the level one
/// notch tighter, used by left-associative infix rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
    Primary,
}

impl Precedence {
    fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

type ParseFn<'src> = fn(&mut Compiler<'src>, bool);

#[derive(Clone, Copy)]
struct ParseRule<'src> {
    prefix: Option<ParseFn<'src>>,
    infix: Option<ParseFn<'src>>,
    precedence: Precedence,
}

const fn rule<'src>(
    prefix: Option<ParseFn<'src>>,
    infix: Option<ParseFn<'src>>,
    precedence: Precedence,
) -> ParseRule<'src> {
    ParseRule {
        prefix,
        infix,
        precedence,
    }
}

/// The static rule table: how each token kind parses as a prefix, as an
/// infix, and how tightly it binds.
fn rule_for<'src>(kind: TokenKind) -> ParseRule<'src> {
    use TokenKind::*;
    match kind {
        LeftParen => rule(
            Some(Compiler::grouping),
            Some(Compiler::call),
            Precedence::Call,
        ),
        Minus => rule(
            Some(Compiler::unary),
            Some(Compiler::binary),
            Precedence::Term,
        ),
        Plus => rule(None, Some(Compiler::binary), Precedence::Term),
        Slash | Star => rule(None, Some(Compiler::binary), Precedence::Factor),
        Bang => rule(Some(Compiler::unary), None, Precedence::None),
        BangEqual | EqualEqual => rule(None, Some(Compiler::binary), Precedence::Equality),
        Greater | GreaterEqual | Less | LessEqual => {
            rule(None, Some(Compiler::binary), Precedence::Comparison)
        }
        Identifier => rule(Some(Compiler::variable), None, Precedence::None),
        String => rule(Some(Compiler::string), None, Precedence::None),
        Number => rule(Some(Compiler::number), None, Precedence::None),
        And => rule(None, Some(Compiler::and_operator), Precedence::And),
        Or => rule(None, Some(Compiler::or_operator), Precedence::Or),
        Nil | True | False => rule(Some(Compiler::literal), None, Precedence::None),
        _ => rule(None, None, Precedence::None),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    Script,
    Function,
}

/// A local slot: where its name appears in the source and the scope depth
/// it was initialized at. `depth == None` between declaration and the end
/// of its initializer, which is how self-reference is caught.
struct Local {
    span: SourceSpan,
    depth: Option<usize>,
}

/// Per-function compile state; nested function declarations push one.
struct FunctionScope {
    function: ObjFunction,
    kind: FunctionKind,
    locals: Vec<Local>,
    scope_depth: usize,
}

impl FunctionScope {
    fn new(function: ObjFunction, kind: FunctionKind) -> Self {
        // slot 0 belongs to the function value itself
        let locals = vec![Local {
            span: SourceSpan::new(0.into(), 0),
            depth: Some(0),
        }];
        Self {
            function,
            kind,
            locals,
            scope_depth: 0,
        }
    }
}

/// Single-pass Pratt compiler: pulls tokens straight from the scanner and
/// emits bytecode as it goes; there is no tree in between.
pub struct Compiler<'src> {
    scanner: Scanner<'src>,
    source: &'src str,
    source_reference: SourceReference,
    heap: &'src mut Heap,
    previous: Token,
    current: Token,
    errors: Vec<CompileError>,
    panic_mode: bool,
    scopes: Vec<FunctionScope>,
}

impl<'src> Compiler<'src> {
    pub fn compile(
        source: &'src str,
        source_reference: SourceReference,
        heap: &'src mut Heap,
    ) -> Result<Rc<ObjFunction>, Vec<CompileError>> {
        let placeholder = Token {
            kind: TokenKind::Eof,
            span: SourceSpan::new(0.into(), 0),
            line: 0,
        };
        let mut compiler = Compiler {
            scanner: Scanner::new(source),
            source,
            source_reference,
            heap,
            previous: placeholder,
            current: placeholder,
            errors: Vec::new(),
            panic_mode: false,
            scopes: vec![FunctionScope::new(
                ObjFunction::script(),
                FunctionKind::Script,
            )],
        };

        compiler.advance();
        while !compiler.match_token(TokenKind::Eof) {
            compiler.declaration();
        }
        let script = compiler.end_function();

        if compiler.errors.is_empty() {
            Ok(compiler.heap.alloc_function(script))
        } else {
            Err(compiler.errors)
        }
    }

    // ---- token plumbing ----

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            match self.current.kind {
                TokenKind::Error(message) => self.error_at_current(message),
                _ => break,
            }
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn lexeme(&self, span: SourceSpan) -> &str {
        &self.source[span.start().byte_offset()..span.end().byte_offset()]
    }

    // ---- error handling ----

    fn error(&mut self, message: &str) {
        self.error_at(self.previous, message);
    }

    fn error_at_current(&mut self, message: &str) {
        self.error_at(self.current, message);
    }

    /// Records one error and enters panic mode; further errors are dropped
    /// until `synchronize` runs.
    fn error_at(&mut self, token: Token, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        self.errors.push(CompileError {
            message: message.to_string(),
            at_end: token.kind == TokenKind::Eof,
            found_at: token.span,
            source_code: self.source_reference.clone(),
        });
    }

    fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.current.kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {}
            }
            self.advance();
        }
    }

    // ---- emit helpers ----

    fn current_scope(&mut self) -> &mut FunctionScope {
        self.scopes.last_mut().expect("scope stack never empty")
    }

    fn current_chunk(&mut self) -> &mut Chunk {
        &mut self.current_scope().function.chunk
    }

    fn chunk_len(&mut self) -> usize {
        self.current_chunk().len()
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.current_chunk().write(byte, line);
    }

    fn emit_op(&mut self, op: OpCode) {
        self.emit_byte(op.into());
    }

    fn emit_ops(&mut self, first: OpCode, second: OpCode) {
        self.emit_op(first);
        self.emit_op(second);
    }

    fn emit_op_byte(&mut self, op: OpCode, byte: u8) {
        self.emit_op(op);
        self.emit_byte(byte);
    }

    fn emit_return(&mut self) {
        self.emit_ops(OpCode::Nil, OpCode::Return);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        match self.current_chunk().add_constant(value) {
            Some(index) => index,
            None => {
                self.error("Too many constants in one chunk.");
                0
            }
        }
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_op_byte(OpCode::Constant, index);
    }

    /// Emits `op` with a 16-bit placeholder operand; returns the operand's
    /// offset for `patch_jump`.
    fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.chunk_len() - 2
    }

    fn patch_jump(&mut self, operand_offset: usize) {
        // -2 accounts for the operand itself
        let jump = self.chunk_len() - operand_offset - 2;
        if jump > u16::MAX as usize {
            self.error("Too much code to jump over.");
        }
        self.current_chunk().patch(operand_offset, (jump >> 8) as u8);
        self.current_chunk().patch(operand_offset + 1, jump as u8);
    }

    fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(OpCode::Loop);
        let offset = self.chunk_len() - loop_start + 2;
        if offset > u16::MAX as usize {
            self.error("Loop body too large.");
        }
        self.emit_byte((offset >> 8) as u8);
        self.emit_byte(offset as u8);
    }

    fn end_function(&mut self) -> ObjFunction {
        self.emit_return();
        self.scopes.pop().expect("scope stack never empty").function
    }

    // ---- declarations and statements ----

    fn declaration(&mut self) {
        if self.match_token(TokenKind::Fun) {
            self.fun_declaration();
        } else if self.match_token(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }
        if self.panic_mode {
            self.synchronize();
        }
    }

    fn fun_declaration(&mut self) {
        let global = self.parse_variable("Expect function name.");
        self.mark_initialized();
        self.function();
        self.define_variable(global);
    }

    fn function(&mut self) {
        let lexeme = self.lexeme(self.previous.span).to_owned();
        let name = self.heap.intern(&lexeme);
        self.scopes.push(FunctionScope::new(
            ObjFunction::named(name),
            FunctionKind::Function,
        ));
        self.begin_scope();

        self.consume(TokenKind::LeftParen, "Expect '(' after function name.");
        if !self.check(TokenKind::RightParen) {
            loop {
                self.current_scope().function.arity += 1;
                if self.current_scope().function.arity > 255 {
                    self.error_at_current("Can't have more than 255 parameters.");
                }
                let parameter = self.parse_variable("Expect parameter name.");
                self.define_variable(parameter);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.");
        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.");
        self.block();

        let function = self.end_function();
        let function = self.heap.alloc_function(function);
        let constant = self.make_constant(Value::Function(function));
        self.emit_op_byte(OpCode::Constant, constant);
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");
        if self.match_token(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.consume(
            TokenKind::Semicolon,
            "Expect ';' after variable declaration.",
        );
        self.define_variable(global);
    }

    fn statement(&mut self) {
        if self.match_token(TokenKind::Print) {
            self.print_statement();
        } else if self.match_token(TokenKind::If) {
            self.if_statement();
        } else if self.match_token(TokenKind::While) {
            self.while_statement();
        } else if self.match_token(TokenKind::For) {
            self.for_statement();
        } else if self.match_token(TokenKind::Return) {
            self.return_statement();
        } else if self.match_token(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after value.");
        self.emit_op(OpCode::Print);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::Pop);
    }

    fn if_statement(&mut self) {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();
        let else_jump = self.emit_jump(OpCode::Jump);

        self.patch_jump(then_jump);
        self.emit_op(OpCode::Pop);
        if self.match_token(TokenKind::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self) {
        let loop_start = self.chunk_len();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_op(OpCode::Pop);
    }

    /// `for` lowers onto the jump/loop primitives directly; the increment
    /// clause is compiled where it appears, jumped over on the way into the
    /// body, and looped back to after it.
    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.");
        if self.match_token(TokenKind::Semicolon) {
            // no initializer
        } else if self.match_token(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.chunk_len();
        let mut exit_jump = None;
        if !self.match_token(TokenKind::Semicolon) {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.");
            exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse));
            self.emit_op(OpCode::Pop);
        }

        if !self.match_token(TokenKind::RightParen) {
            let body_jump = self.emit_jump(OpCode::Jump);
            let increment_start = self.chunk_len();
            self.expression();
            self.emit_op(OpCode::Pop);
            self.consume(TokenKind::RightParen, "Expect ')' after for clauses.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit_op(OpCode::Pop);
        }
        self.end_scope();
    }

    fn return_statement(&mut self) {
        if self.current_scope().kind == FunctionKind::Script {
            self.error("Can't return from top-level code.");
        }
        if self.match_token(TokenKind::Semicolon) {
            self.emit_return();
        } else {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expect ';' after return value.");
            self.emit_op(OpCode::Return);
        }
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.");
    }

    fn begin_scope(&mut self) {
        self.current_scope().scope_depth += 1;
    }

    fn end_scope(&mut self) {
        let scope = self.current_scope();
        scope.scope_depth -= 1;
        let depth = scope.scope_depth;
        let mut pops = 0;
        while let Some(local) = scope.locals.last() {
            match local.depth {
                Some(local_depth) if local_depth > depth => {
                    scope.locals.pop();
                    pops += 1;
                }
                _ => break,
            }
        }
        for _ in 0..pops {
            self.emit_op(OpCode::Pop);
        }
    }

    // ---- variables ----

    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenKind::Identifier, message);
        self.declare_variable();
        if self.current_scope().scope_depth > 0 {
            return 0;
        }
        self.identifier_constant(self.previous.span)
    }

    fn identifier_constant(&mut self, span: SourceSpan) -> u8 {
        let lexeme = self.lexeme(span).to_owned();
        let name = self.heap.intern(&lexeme);
        self.make_constant(Value::String(name))
    }

    fn declare_variable(&mut self) {
        if self.current_scope().scope_depth == 0 {
            return;
        }
        let name_span = self.previous.span;
        let duplicate = {
            let scope = self.scopes.last().expect("scope stack never empty");
            let mut duplicate = false;
            for local in scope.locals.iter().rev() {
                if matches!(local.depth, Some(depth) if depth < scope.scope_depth) {
                    break;
                }
                if self.lexeme(local.span) == self.lexeme(name_span) {
                    duplicate = true;
                    break;
                }
            }
            duplicate
        };
        if duplicate {
            self.error("Already a variable with this name in this scope.");
        }
        self.add_local(name_span);
    }

    fn add_local(&mut self, span: SourceSpan) {
        if self.current_scope().locals.len() == MAX_LOCALS {
            self.error("Too many local variables in function.");
            return;
        }
        self.current_scope().locals.push(Local { span, depth: None });
    }

    fn mark_initialized(&mut self) {
        let scope = self.current_scope();
        if scope.scope_depth == 0 {
            return;
        }
        let depth = scope.scope_depth;
        if let Some(local) = scope.locals.last_mut() {
            local.depth = Some(depth);
        }
    }

    fn define_variable(&mut self, global: u8) {
        if self.current_scope().scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_op_byte(OpCode::DefineGlobal, global);
    }

    fn resolve_local(&mut self, name_span: SourceSpan) -> Option<u8> {
        let mut uninitialized = false;
        let mut found = None;
        {
            let scope = self.scopes.last().expect("scope stack never empty");
            for (slot, local) in scope.locals.iter().enumerate().rev() {
                if self.lexeme(local.span) == self.lexeme(name_span) {
                    uninitialized = local.depth.is_none();
                    found = Some(slot as u8);
                    break;
                }
            }
        }
        if uninitialized {
            self.error("Can't read local variable in its own initializer.");
        }
        found
    }

    fn named_variable(&mut self, name_span: SourceSpan, can_assign: bool) {
        let (arg, get_op, set_op) = match self.resolve_local(name_span) {
            Some(slot) => (slot, OpCode::GetLocal, OpCode::SetLocal),
            None => (
                self.identifier_constant(name_span),
                OpCode::GetGlobal,
                OpCode::SetGlobal,
            ),
        };
        if can_assign && self.match_token(TokenKind::Equal) {
            self.expression();
            self.emit_op_byte(set_op, arg);
        } else {
            self.emit_op_byte(get_op, arg);
        }
    }

    // ---- expressions ----

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    /// The Pratt core: run the prefix rule for the token just consumed,
    /// then fold in infix rules while they bind at least as tightly as
    /// `precedence`. Only a prefix invoked at assignment level or looser may
    /// consume an `=`.
    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let prefix = match rule_for(self.previous.kind).prefix {
            Some(prefix) => prefix,
            None => {
                self.error("Expect expression.");
                return;
            }
        };
        let can_assign = precedence <= Precedence::Assignment;
        prefix(self, can_assign);

        while precedence <= rule_for(self.current.kind).precedence {
            self.advance();
            let infix = rule_for(self.previous.kind)
                .infix
                .expect("tokens with a precedence have an infix rule");
            infix(self, can_assign);
        }

        if can_assign && self.match_token(TokenKind::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    fn grouping(&mut self, _can_assign: bool) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn unary(&mut self, _can_assign: bool) {
        let operator = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            TokenKind::Bang => self.emit_op(OpCode::Not),
            _ => unreachable!("unary rule on non-unary token"),
        }
    }

    fn binary(&mut self, _can_assign: bool) {
        let operator = self.previous.kind;
        self.parse_precedence(rule_for(operator).precedence.next());
        match operator {
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
            TokenKind::BangEqual => self.emit_ops(OpCode::Equal, OpCode::Not),
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            TokenKind::GreaterEqual => self.emit_ops(OpCode::Less, OpCode::Not),
            TokenKind::Less => self.emit_op(OpCode::Less),
            TokenKind::LessEqual => self.emit_ops(OpCode::Greater, OpCode::Not),
            _ => unreachable!("binary rule on non-binary token"),
        }
    }

    fn and_operator(&mut self, _can_assign: bool) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    fn or_operator(&mut self, _can_assign: bool) {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let end_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(else_jump);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    fn call(&mut self, _can_assign: bool) {
        let argument_count = self.argument_list();
        self.emit_op_byte(OpCode::Call, argument_count);
    }

    fn argument_list(&mut self) -> u8 {
        let mut count: usize = 0;
        if !self.check(TokenKind::RightParen) {
            loop {
                self.expression();
                if count == 255 {
                    self.error("Can't have more than 255 arguments.");
                }
                count += 1;
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after arguments.");
        count.min(255) as u8
    }

    fn number(&mut self, _can_assign: bool) {
        let value: f64 = self
            .lexeme(self.previous.span)
            .parse()
            .expect("number lexemes always parse");
        self.emit_constant(Value::Number(value));
    }

    fn string(&mut self, _can_assign: bool) {
        let span = self.previous.span;
        let contents =
            &self.source[span.start().byte_offset() + 1..span.end().byte_offset() - 1];
        let object = self.heap.intern(contents);
        self.emit_constant(Value::String(object));
    }

    fn literal(&mut self, _can_assign: bool) {
        match self.previous.kind {
            TokenKind::Nil => self.emit_op(OpCode::Nil),
            TokenKind::True => self.emit_op(OpCode::True),
            TokenKind::False => self.emit_op(OpCode::False),
            _ => unreachable!("literal rule on non-literal token"),
        }
    }

    fn variable(&mut self, can_assign: bool) {
        self.named_variable(self.previous.span, can_assign);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm_interpreter::disassembler::disassemble;
    use pretty_assertions::assert_eq;

    fn compile_ok(source: &str) -> (Rc<ObjFunction>, Heap) {
        let mut heap = Heap::new();
        let function = Compiler::compile(
            source,
            SourceReference::new("test.lox", source),
            &mut heap,
        )
        .unwrap_or_else(|errors| panic!("compile errors: {:?}", errors));
        (function, heap)
    }

    fn compile_err(source: &str) -> Vec<CompileError> {
        let mut heap = Heap::new();
        Compiler::compile(
            source,
            SourceReference::new("test.lox", source),
            &mut heap,
        )
        .err()
        .expect("expected compile errors")
    }

    fn ops(function: &ObjFunction) -> Vec<String> {
        disassemble(&function.chunk, function.name_str())
            .lines()
            .skip(1)
            .map(|line| {
                line.split_whitespace()
                    .nth(2)
                    .unwrap_or_default()
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn expression_statement_pops_its_value() {
        let (function, _heap) = compile_ok("1 + 2;");
        assert_eq!(
            ops(&function),
            vec!["Constant", "Constant", "Add", "Pop", "Nil", "Return"]
        );
    }

    #[test]
    fn globals_compile_to_named_constants() {
        let (function, _heap) = compile_ok("var a = 1; print a;");
        assert_eq!(
            ops(&function),
            vec![
                "Constant",
                "DefineGlobal",
                "GetGlobal",
                "Print",
                "Nil",
                "Return"
            ]
        );
    }

    #[test]
    fn locals_compile_to_slots() {
        let (function, _heap) = compile_ok("{ var a = 1; print a; a = 2; }");
        assert_eq!(
            ops(&function),
            vec![
                "Constant", // 1
                "GetLocal", "Print", "Constant", // 2
                "SetLocal", "Pop", // expression statement result
                "Pop", // the local leaving scope
                "Nil", "Return"
            ]
        );
    }

    #[test]
    fn if_else_shape() {
        let (function, _heap) = compile_ok("if (true) print 1; else print 2;");
        assert_eq!(
            ops(&function),
            vec![
                "True",
                "JumpIfFalse",
                "Pop",
                "Constant",
                "Print",
                "Jump",
                "Pop",
                "Constant",
                "Print",
                "Nil",
                "Return"
            ]
        );
    }

    #[test]
    fn while_loops_back() {
        let (function, _heap) = compile_ok("while (false) print 1;");
        assert_eq!(
            ops(&function),
            vec![
                "False",
                "JumpIfFalse",
                "Pop",
                "Constant",
                "Print",
                "Loop",
                "Pop",
                "Nil",
                "Return"
            ]
        );
    }

    #[test]
    fn logical_operators_emit_jumps() {
        let (function, _heap) = compile_ok("true and false;");
        assert_eq!(
            ops(&function),
            vec!["True", "JumpIfFalse", "Pop", "False", "Pop", "Nil", "Return"]
        );
        let (function, _heap) = compile_ok("false or true;");
        assert_eq!(
            ops(&function),
            vec![
                "False",
                "JumpIfFalse",
                "Jump",
                "Pop",
                "True",
                "Pop",
                "Nil",
                "Return"
            ]
        );
    }

    #[test]
    fn functions_nest_their_own_chunks() {
        let (script, _heap) = compile_ok("fun add(a, b) { return a + b; } print add(1, 2);");
        let function = script
            .chunk
            .constants()
            .iter()
            .find_map(|value| match value {
                Value::Function(function) => Some(function.clone()),
                _ => None,
            })
            .expect("nested function in constant pool");
        assert_eq!(function.arity, 2);
        assert_eq!(function.name_str(), "add");
        assert_eq!(
            ops(&function),
            vec!["GetLocal", "GetLocal", "Add", "Return", "Nil", "Return"]
        );
        assert!(ops(&script).contains(&"Call".to_string()));
    }

    #[test]
    fn comparison_operators_desugar() {
        let (function, _heap) = compile_ok("1 <= 2;");
        assert_eq!(
            ops(&function),
            vec!["Constant", "Constant", "Greater", "Not", "Pop", "Nil", "Return"]
        );
    }

    #[test]
    fn error_cases() {
        assert_eq!(compile_err("return 1;")[0].message, "Can't return from top-level code.");
        assert_eq!(compile_err("1 = 2;")[0].message, "Invalid assignment target.");
        assert_eq!(
            compile_err("{ var a = a; }")[0].message,
            "Can't read local variable in its own initializer."
        );
        assert_eq!(
            compile_err("{ var a = 1; var a = 2; }")[0].message,
            "Already a variable with this name in this scope."
        );
        assert_eq!(compile_err("print ;")[0].message, "Expect expression.");
        assert_eq!(compile_err("@;")[0].message, "Unexpected character.");
    }

    #[test]
    fn panic_mode_recovers_once_per_statement() {
        let errors = compile_err("var = 1;\nvar = 2;");
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|error| error.message == "Expect variable name."));
    }
}
