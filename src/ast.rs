use std::{fmt::Display, ops::Deref, rc::Rc};

use crate::{
    side_table::{Unique, UniqueId},
    source::SourceSpan,
    source_reference::SourceReference,
};

/// A value paired with the span of the source text it came from.
#[derive(Debug)]
pub struct WithSpan<T> {
    inner: T,
    span: SourceSpan,
}

impl<T> WithSpan<T> {
    pub fn new(inner: T, span: SourceSpan) -> Self {
        Self { inner, span }
    }
    pub fn span(&self) -> SourceSpan {
        self.span
    }
    pub fn inner(&self) -> &T {
        &self.inner
    }
}
impl<T> Deref for WithSpan<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

pub trait AstNode {
    fn source_span(&self) -> SourceSpan;
}

#[derive(Debug)]
pub struct Program {
    pub statements: Vec<DeclOrStmt>,
    pub source_reference: SourceReference,
}
impl Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for stmt in self.statements.iter() {
            writeln!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

/// A name occurrence. Every occurrence has its own identity so the resolver
/// can record a hop distance per use site.
#[derive(Debug)]
pub struct Identifier {
    pub id: UniqueId,
    pub name: String,
    pub span: SourceSpan,
}
impl Identifier {
    pub fn new(name: impl Into<String>, span: SourceSpan) -> Self {
        Self {
            id: UniqueId::fresh(),
            name: name.into(),
            span,
        }
    }
}
impl Unique for Identifier {
    fn id(&self) -> UniqueId {
        self.id
    }
}
impl AstNode for Identifier {
    fn source_span(&self) -> SourceSpan {
        self.span
    }
}
impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug)]
pub enum DeclOrStmt {
    Decl(Decl),
    Stmt(Stmt),
}
impl AstNode for DeclOrStmt {
    fn source_span(&self) -> SourceSpan {
        match self {
            Self::Decl(decl) => decl.source_span(),
            Self::Stmt(stmt) => stmt.source_span(),
        }
    }
}
impl Display for DeclOrStmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decl(decl) => Display::fmt(decl, f),
            Self::Stmt(stmt) => Display::fmt(stmt, f),
        }
    }
}

#[derive(Debug)]
pub enum Decl {
    Var(VarDecl),
    Fun(FunDecl),
    Class(ClassDecl),
}
impl AstNode for Decl {
    fn source_span(&self) -> SourceSpan {
        match self {
            Self::Var(decl) => decl.source_span(),
            Self::Fun(decl) => decl.source_span(),
            Self::Class(decl) => decl.source_span(),
        }
    }
}
impl Display for Decl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Var(decl) => Display::fmt(decl, f),
            Self::Fun(decl) => Display::fmt(decl, f),
            Self::Class(decl) => Display::fmt(decl, f),
        }
    }
}

#[derive(Debug)]
pub struct VarDecl {
    pub var_span: SourceSpan,
    pub name: Identifier,
    pub initializer: Option<Expr>,
}
impl AstNode for VarDecl {
    fn source_span(&self) -> SourceSpan {
        let end = self
            .initializer
            .as_ref()
            .map(|init| init.source_span())
            .unwrap_or(self.name.span);
        self.var_span.until(end)
    }
}
impl Display for VarDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.initializer {
            Some(init) => write!(f, "(var {} {})", self.name, init),
            None => write!(f, "(var {})", self.name),
        }
    }
}

/// Shared function shape: a named function declaration or a class method.
#[derive(Debug)]
pub struct Fun {
    pub name: Identifier,
    pub parameters: Vec<Identifier>,
    pub body: Vec<DeclOrStmt>,
    pub span: SourceSpan,
}
impl AstNode for Fun {
    fn source_span(&self) -> SourceSpan {
        self.span
    }
}
impl Display for Fun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(fun {} (", self.name)?;
        for (i, parameter) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            Display::fmt(parameter, f)?;
        }
        f.write_str(")")?;
        for stmt in self.body.iter() {
            write!(f, " {}", stmt)?;
        }
        f.write_str(")")
    }
}

#[derive(Debug)]
pub struct FunDecl {
    pub fun: Rc<Fun>,
}
impl AstNode for FunDecl {
    fn source_span(&self) -> SourceSpan {
        self.fun.span
    }
}
impl Display for FunDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.fun, f)
    }
}

#[derive(Debug)]
pub struct ClassDecl {
    pub class_span: SourceSpan,
    pub name: Identifier,
    pub superclass: Option<VariableExpr>,
    pub methods: Vec<Rc<Fun>>,
}
impl AstNode for ClassDecl {
    fn source_span(&self) -> SourceSpan {
        let end = self
            .methods
            .last()
            .map(|method| method.span)
            .unwrap_or(self.name.span);
        self.class_span.until(end)
    }
}
impl Display for ClassDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(class {}", self.name)?;
        if let Some(superclass) = &self.superclass {
            write!(f, " < {}", superclass)?;
        }
        for method in self.methods.iter() {
            write!(f, " {}", method)?;
        }
        f.write_str(")")
    }
}

#[derive(Debug)]
pub enum Stmt {
    Expr(ExprStmt),
    Print(PrintStmt),
    Block(BlockStmt),
    If(IfStmt),
    While(WhileStmt),
    Return(ReturnStmt),
}
impl AstNode for Stmt {
    fn source_span(&self) -> SourceSpan {
        match self {
            Self::Expr(stmt) => stmt.source_span(),
            Self::Print(stmt) => stmt.source_span(),
            Self::Block(stmt) => stmt.source_span(),
            Self::If(stmt) => stmt.source_span(),
            Self::While(stmt) => stmt.source_span(),
            Self::Return(stmt) => stmt.source_span(),
        }
    }
}
impl Display for Stmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expr(stmt) => Display::fmt(stmt, f),
            Self::Print(stmt) => Display::fmt(stmt, f),
            Self::Block(stmt) => Display::fmt(stmt, f),
            Self::If(stmt) => Display::fmt(stmt, f),
            Self::While(stmt) => Display::fmt(stmt, f),
            Self::Return(stmt) => Display::fmt(stmt, f),
        }
    }
}

#[derive(Debug)]
pub struct ExprStmt {
    pub expression: Expr,
}
impl AstNode for ExprStmt {
    fn source_span(&self) -> SourceSpan {
        self.expression.source_span()
    }
}
impl Display for ExprStmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.expression, f)
    }
}

#[derive(Debug)]
pub struct PrintStmt {
    pub print_span: SourceSpan,
    pub expression: Expr,
}
impl AstNode for PrintStmt {
    fn source_span(&self) -> SourceSpan {
        self.print_span.until(self.expression.source_span())
    }
}
impl Display for PrintStmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(print {})", self.expression)
    }
}

#[derive(Debug)]
pub struct BlockStmt {
    pub open_span: SourceSpan,
    pub close_span: SourceSpan,
    pub body: Vec<DeclOrStmt>,
}
impl AstNode for BlockStmt {
    fn source_span(&self) -> SourceSpan {
        self.open_span.until(self.close_span)
    }
}
impl Display for BlockStmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("(do")?;
        for stmt in self.body.iter() {
            write!(f, " {}", stmt)?;
        }
        f.write_str(")")
    }
}

#[derive(Debug)]
pub struct IfStmt {
    pub if_span: SourceSpan,
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
}
impl AstNode for IfStmt {
    fn source_span(&self) -> SourceSpan {
        let end = self
            .else_branch
            .as_ref()
            .map(|branch| branch.source_span())
            .unwrap_or_else(|| self.then_branch.source_span());
        self.if_span.until(end)
    }
}
impl Display for IfStmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.else_branch {
            Some(else_branch) => write!(
                f,
                "(if {} {} {})",
                self.condition, self.then_branch, else_branch
            ),
            None => write!(f, "(if {} {})", self.condition, self.then_branch),
        }
    }
}

#[derive(Debug)]
pub struct WhileStmt {
    pub while_span: SourceSpan,
    pub condition: Expr,
    pub body: Box<Stmt>,
}
impl AstNode for WhileStmt {
    fn source_span(&self) -> SourceSpan {
        self.while_span.until(self.body.source_span())
    }
}
impl Display for WhileStmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(while {} {})", self.condition, self.body)
    }
}

#[derive(Debug)]
pub struct ReturnStmt {
    pub return_span: SourceSpan,
    pub expression: Option<Expr>,
}
impl AstNode for ReturnStmt {
    fn source_span(&self) -> SourceSpan {
        match &self.expression {
            Some(expression) => self.return_span.until(expression.source_span()),
            None => self.return_span,
        }
    }
}
impl Display for ReturnStmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.expression {
            Some(expression) => write!(f, "(return {})", expression),
            None => f.write_str("(return)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Number(f64),
    String(String),
    Boolean(bool),
    Nil,
}
impl Display for LiteralValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{}", value),
            Self::String(value) => write!(f, "{:?}", value),
            Self::Boolean(value) => write!(f, "{}", value),
            Self::Nil => f.write_str("nil"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    EqualTo,
    NotEqualTo,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
}
impl Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::EqualTo => "==",
            Self::NotEqualTo => "!=",
            Self::LessThan => "<",
            Self::LessThanOrEqualTo => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqualTo => ">=",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}
impl Display for LogicalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::And => "and",
            Self::Or => "or",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Minus,
    Not,
}
impl Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Minus => "-",
            Self::Not => "!",
        })
    }
}

#[derive(Debug)]
pub enum Expr {
    Binary(BinaryExpr),
    Logical(LogicalExpr),
    Unary(UnaryExpr),
    Literal(LiteralExpr),
    Grouping(GroupingExpr),
    Variable(VariableExpr),
    Assign(AssignExpr),
    Call(CallExpr),
    Get(GetExpr),
    Set(SetExpr),
    This(ThisExpr),
    Super(SuperExpr),
}
impl AstNode for Expr {
    fn source_span(&self) -> SourceSpan {
        match self {
            Self::Binary(expr) => expr.source_span(),
            Self::Logical(expr) => expr.source_span(),
            Self::Unary(expr) => expr.source_span(),
            Self::Literal(expr) => expr.source_span(),
            Self::Grouping(expr) => expr.source_span(),
            Self::Variable(expr) => expr.source_span(),
            Self::Assign(expr) => expr.source_span(),
            Self::Call(expr) => expr.source_span(),
            Self::Get(expr) => expr.source_span(),
            Self::Set(expr) => expr.source_span(),
            Self::This(expr) => expr.source_span(),
            Self::Super(expr) => expr.source_span(),
        }
    }
}
impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binary(expr) => Display::fmt(expr, f),
            Self::Logical(expr) => Display::fmt(expr, f),
            Self::Unary(expr) => Display::fmt(expr, f),
            Self::Literal(expr) => Display::fmt(expr, f),
            Self::Grouping(expr) => Display::fmt(expr, f),
            Self::Variable(expr) => Display::fmt(expr, f),
            Self::Assign(expr) => Display::fmt(expr, f),
            Self::Call(expr) => Display::fmt(expr, f),
            Self::Get(expr) => Display::fmt(expr, f),
            Self::Set(expr) => Display::fmt(expr, f),
            Self::This(expr) => Display::fmt(expr, f),
            Self::Super(expr) => Display::fmt(expr, f),
        }
    }
}

#[derive(Debug)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub operator: WithSpan<BinaryOperator>,
    pub right: Box<Expr>,
}
impl AstNode for BinaryExpr {
    fn source_span(&self) -> SourceSpan {
        self.left.source_span().until(self.right.source_span())
    }
}
impl Display for BinaryExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} {} {})", self.operator.inner(), self.left, self.right)
    }
}

#[derive(Debug)]
pub struct LogicalExpr {
    pub left: Box<Expr>,
    pub operator: WithSpan<LogicalOperator>,
    pub right: Box<Expr>,
}
impl AstNode for LogicalExpr {
    fn source_span(&self) -> SourceSpan {
        self.left.source_span().until(self.right.source_span())
    }
}
impl Display for LogicalExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} {} {})", self.operator.inner(), self.left, self.right)
    }
}

#[derive(Debug)]
pub struct UnaryExpr {
    pub operator: WithSpan<UnaryOperator>,
    pub right: Box<Expr>,
}
impl AstNode for UnaryExpr {
    fn source_span(&self) -> SourceSpan {
        self.operator.span().until(self.right.source_span())
    }
}
impl Display for UnaryExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} {})", self.operator.inner(), self.right)
    }
}

#[derive(Debug)]
pub struct LiteralExpr {
    pub value: LiteralValue,
    pub span: SourceSpan,
}
impl AstNode for LiteralExpr {
    fn source_span(&self) -> SourceSpan {
        self.span
    }
}
impl Display for LiteralExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.value, f)
    }
}

#[derive(Debug)]
pub struct GroupingExpr {
    pub inner: Box<Expr>,
}
impl AstNode for GroupingExpr {
    fn source_span(&self) -> SourceSpan {
        self.inner.source_span()
    }
}
impl Display for GroupingExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(group {})", self.inner)
    }
}

#[derive(Debug)]
pub struct VariableExpr {
    pub name: Identifier,
}
impl AstNode for VariableExpr {
    fn source_span(&self) -> SourceSpan {
        self.name.span
    }
}
impl Display for VariableExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.name, f)
    }
}

#[derive(Debug)]
pub struct AssignExpr {
    pub name: Identifier,
    pub value: Box<Expr>,
}
impl AstNode for AssignExpr {
    fn source_span(&self) -> SourceSpan {
        self.name.span.until(self.value.source_span())
    }
}
impl Display for AssignExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(assign {} {})", self.name, self.value)
    }
}

#[derive(Debug)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub close_paren_span: SourceSpan,
    pub arguments: Vec<Expr>,
}
impl AstNode for CallExpr {
    fn source_span(&self) -> SourceSpan {
        self.callee.source_span().until(self.close_paren_span)
    }
}
impl Display for CallExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(call {}", self.callee)?;
        for argument in self.arguments.iter() {
            write!(f, " {}", argument)?;
        }
        f.write_str(")")
    }
}

#[derive(Debug)]
pub struct GetExpr {
    pub object: Box<Expr>,
    pub name: Identifier,
}
impl AstNode for GetExpr {
    fn source_span(&self) -> SourceSpan {
        self.object.source_span().until(self.name.span)
    }
}
impl Display for GetExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(get {} {})", self.object, self.name)
    }
}

#[derive(Debug)]
pub struct SetExpr {
    pub object: Box<Expr>,
    pub name: Identifier,
    pub value: Box<Expr>,
}
impl AstNode for SetExpr {
    fn source_span(&self) -> SourceSpan {
        self.object.source_span().until(self.value.source_span())
    }
}
impl Display for SetExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(set {} {} {})", self.object, self.name, self.value)
    }
}

#[derive(Debug)]
pub struct ThisExpr {
    pub keyword: Identifier,
}
impl AstNode for ThisExpr {
    fn source_span(&self) -> SourceSpan {
        self.keyword.span
    }
}
impl Display for ThisExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("this")
    }
}

#[derive(Debug)]
pub struct SuperExpr {
    pub keyword: Identifier,
    pub method: Identifier,
}
impl AstNode for SuperExpr {
    fn source_span(&self) -> SourceSpan {
        self.keyword.span.until(self.method.span)
    }
}
impl Display for SuperExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(super {})", self.method)
    }
}
