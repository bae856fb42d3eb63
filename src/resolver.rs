use std::collections::HashMap;

use miette::Diagnostic;
use thiserror::Error;

use crate::{
    ast::*,
    keywords,
    side_table::SideTable,
    source::SourceSpan,
    source_reference::SourceReference,
};

#[derive(Error, Diagnostic, Debug)]
pub enum ResolverError {
    #[error("Already a variable with this name in this scope.")]
    AlreadyDeclared {
        name: String,
        #[label("'{name}' declared again here")]
        found_at: SourceSpan,
        #[label("first declared here")]
        first_declared_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Can't read local variable in its own initializer.")]
    ReadInOwnInitializer {
        #[label("used while being initialized")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Can't return from top-level code.")]
    ReturnFromTopLevel {
        #[label("return outside of any function")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Can't return a value from an initializer.")]
    ReturnValueFromInitializer {
        #[label("initializers implicitly return 'this'")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Can't use 'this' outside of a class.")]
    ThisOutsideClass {
        #[label("'this' used here")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Can't use 'super' outside of a class.")]
    SuperOutsideClass {
        #[label("'super' used here")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Can't use 'super' in a class with no superclass.")]
    SuperWithoutSuperclass {
        #[label("'super' used here")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("A class can't inherit from itself.")]
    InheritFromSelf {
        #[label("inherits from itself")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
}

impl ResolverError {
    pub fn span(&self) -> SourceSpan {
        match self {
            ResolverError::AlreadyDeclared { found_at, .. }
            | ResolverError::ReadInOwnInitializer { found_at, .. }
            | ResolverError::ReturnFromTopLevel { found_at, .. }
            | ResolverError::ReturnValueFromInitializer { found_at, .. }
            | ResolverError::ThisOutsideClass { found_at, .. }
            | ResolverError::SuperOutsideClass { found_at, .. }
            | ResolverError::SuperWithoutSuperclass { found_at, .. }
            | ResolverError::InheritFromSelf { found_at, .. } => *found_at,
        }
    }
}

/// Identifier use -> number of scopes between the use and its definition.
/// Uses with no entry resolve to the globals at runtime.
pub type Resolutions = SideTable<Identifier, usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindingStatus {
    Declared,
    Defined,
}

#[derive(Debug, Clone)]
struct Binding {
    status: BindingStatus,
    declared_at: SourceSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

/// Static pass between parsing and evaluation. Walks the whole tree, checks
/// the scoping rules, and records a hop distance for every local identifier
/// use. There is no scope for the global level; whatever is not found in a
/// local scope is left for the evaluator's globals lookup.
pub struct Resolver<'a> {
    scopes: Vec<HashMap<String, Binding>>,
    current_function: FunctionKind,
    current_class: ClassKind,
    errors: Vec<ResolverError>,
    source_reference: SourceReference,
    resolutions: &'a mut Resolutions,
}

impl Resolver<'_> {
    pub fn resolve(
        program: &Program,
        resolutions: &mut Resolutions,
    ) -> Result<(), Vec<ResolverError>> {
        let mut resolver = Resolver {
            scopes: Vec::new(),
            current_function: FunctionKind::None,
            current_class: ClassKind::None,
            errors: Vec::new(),
            source_reference: program.source_reference.clone(),
            resolutions,
        };
        resolver.resolve_block(&program.statements);
        if resolver.errors.is_empty() {
            Ok(())
        } else {
            Err(resolver.errors)
        }
    }

    fn resolve_block(&mut self, body: &[DeclOrStmt]) {
        for stmt in body {
            self.resolve_decl_or_stmt(stmt);
        }
    }

    fn resolve_decl_or_stmt(&mut self, decl_or_stmt: &DeclOrStmt) {
        match decl_or_stmt {
            DeclOrStmt::Decl(decl) => self.resolve_decl(decl),
            DeclOrStmt::Stmt(stmt) => self.resolve_stmt(stmt),
        }
    }

    fn resolve_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Var(decl) => {
                self.declare(&decl.name);
                if let Some(initializer) = &decl.initializer {
                    self.resolve_expr(initializer);
                }
                self.define(&decl.name);
            }
            Decl::Fun(decl) => {
                self.declare(&decl.fun.name);
                self.define(&decl.fun.name);
                self.resolve_function(&decl.fun, FunctionKind::Function);
            }
            Decl::Class(decl) => self.resolve_class_decl(decl),
        }
    }

    fn resolve_class_decl(&mut self, decl: &ClassDecl) {
        let enclosing_class = self.current_class;
        self.current_class = ClassKind::Class;

        self.declare(&decl.name);
        self.define(&decl.name);

        if let Some(superclass) = &decl.superclass {
            if superclass.name.name == decl.name.name {
                self.errors.push(ResolverError::InheritFromSelf {
                    found_at: superclass.name.span,
                    source_code: self.source_reference.clone(),
                });
            }
            self.current_class = ClassKind::Subclass;
            self.resolve_variable_expr(superclass);

            self.begin_scope();
            self.scopes
                .last_mut()
                .expect("scope just pushed")
                .insert(
                    keywords::SUPER.to_string(),
                    Binding {
                        status: BindingStatus::Defined,
                        declared_at: superclass.name.span,
                    },
                );
        }

        self.begin_scope();
        self.scopes
            .last_mut()
            .expect("scope just pushed")
            .insert(
                keywords::THIS.to_string(),
                Binding {
                    status: BindingStatus::Defined,
                    declared_at: decl.name.span,
                },
            );

        for method in decl.methods.iter() {
            let kind = if method.name.name == keywords::INIT {
                FunctionKind::Initializer
            } else {
                FunctionKind::Method
            };
            self.resolve_function(method, kind);
        }

        self.end_scope();
        if decl.superclass.is_some() {
            self.end_scope();
        }
        self.current_class = enclosing_class;
    }

    fn resolve_function(&mut self, fun: &Fun, kind: FunctionKind) {
        let enclosing_function = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for parameter in fun.parameters.iter() {
            self.declare(parameter);
            self.define(parameter);
        }
        self.resolve_block(&fun.body);
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(stmt) => self.resolve_expr(&stmt.expression),
            Stmt::Print(stmt) => self.resolve_expr(&stmt.expression),
            Stmt::Block(stmt) => {
                self.begin_scope();
                self.resolve_block(&stmt.body);
                self.end_scope();
            }
            Stmt::If(stmt) => {
                self.resolve_expr(&stmt.condition);
                self.resolve_stmt(&stmt.then_branch);
                if let Some(else_branch) = &stmt.else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While(stmt) => {
                self.resolve_expr(&stmt.condition);
                self.resolve_stmt(&stmt.body);
            }
            Stmt::Return(stmt) => {
                if self.current_function == FunctionKind::None {
                    self.errors.push(ResolverError::ReturnFromTopLevel {
                        found_at: stmt.return_span,
                        source_code: self.source_reference.clone(),
                    });
                }
                if let Some(expression) = &stmt.expression {
                    if self.current_function == FunctionKind::Initializer {
                        self.errors.push(ResolverError::ReturnValueFromInitializer {
                            found_at: stmt.return_span,
                            source_code: self.source_reference.clone(),
                        });
                    }
                    self.resolve_expr(expression);
                }
            }
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Binary(expr) => {
                self.resolve_expr(&expr.left);
                self.resolve_expr(&expr.right);
            }
            Expr::Logical(expr) => {
                self.resolve_expr(&expr.left);
                self.resolve_expr(&expr.right);
            }
            Expr::Unary(expr) => self.resolve_expr(&expr.right),
            Expr::Literal(_) => {}
            Expr::Grouping(expr) => self.resolve_expr(&expr.inner),
            Expr::Variable(expr) => self.resolve_variable_expr(expr),
            Expr::Assign(expr) => {
                self.resolve_expr(&expr.value);
                self.resolve_local(&expr.name);
            }
            Expr::Call(expr) => {
                self.resolve_expr(&expr.callee);
                for argument in expr.arguments.iter() {
                    self.resolve_expr(argument);
                }
            }
            Expr::Get(expr) => self.resolve_expr(&expr.object),
            Expr::Set(expr) => {
                self.resolve_expr(&expr.value);
                self.resolve_expr(&expr.object);
            }
            Expr::This(expr) => {
                if self.current_class == ClassKind::None {
                    self.errors.push(ResolverError::ThisOutsideClass {
                        found_at: expr.keyword.span,
                        source_code: self.source_reference.clone(),
                    });
                    return;
                }
                self.resolve_local(&expr.keyword);
            }
            Expr::Super(expr) => {
                match self.current_class {
                    ClassKind::None => self.errors.push(ResolverError::SuperOutsideClass {
                        found_at: expr.keyword.span,
                        source_code: self.source_reference.clone(),
                    }),
                    ClassKind::Class => self.errors.push(ResolverError::SuperWithoutSuperclass {
                        found_at: expr.keyword.span,
                        source_code: self.source_reference.clone(),
                    }),
                    ClassKind::Subclass => {}
                }
                self.resolve_local(&expr.keyword);
            }
        }
    }

    fn resolve_variable_expr(&mut self, expr: &VariableExpr) {
        if let Some(scope) = self.scopes.last() {
            if let Some(binding) = scope.get(&expr.name.name) {
                if binding.status == BindingStatus::Declared {
                    self.errors.push(ResolverError::ReadInOwnInitializer {
                        found_at: expr.name.span,
                        source_code: self.source_reference.clone(),
                    });
                }
            }
        }
        self.resolve_local(&expr.name);
    }

    fn resolve_local(&mut self, identifier: &Identifier) {
        for (distance, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&identifier.name) {
                self.resolutions.set(identifier, distance);
                return;
            }
        }
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, identifier: &Identifier) {
        let source_code = self.source_reference.clone();
        if let Some(scope) = self.scopes.last_mut() {
            if let Some(existing) = scope.get(&identifier.name) {
                let first_declared_at = existing.declared_at;
                self.errors.push(ResolverError::AlreadyDeclared {
                    name: identifier.name.clone(),
                    found_at: identifier.span,
                    first_declared_at,
                    source_code,
                });
                return;
            }
            scope.insert(
                identifier.name.clone(),
                Binding {
                    status: BindingStatus::Declared,
                    declared_at: identifier.span,
                },
            );
        }
    }

    fn define(&mut self, identifier: &Identifier) {
        if let Some(scope) = self.scopes.last_mut() {
            if let Some(binding) = scope.get_mut(&identifier.name) {
                binding.status = BindingStatus::Defined;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::Parser, scanner::Scanner, scanner::TokenKind};

    fn resolve_source(source: &str) -> (Program, Resolutions, Result<(), Vec<ResolverError>>) {
        let tokens = Scanner::new(source)
            .filter_map(Result::ok)
            .filter(|token| token.kind != TokenKind::LineComment);
        let (program, errors) = Parser::parse(tokens, SourceReference::new("test.lox", source));
        assert!(errors.is_empty(), "parse errors: {:?}", errors);
        let mut resolutions = Resolutions::new();
        let result = Resolver::resolve(&program, &mut resolutions);
        (program, resolutions, result)
    }

    fn errors_of(source: &str) -> Vec<ResolverError> {
        let (_, _, result) = resolve_source(source);
        result.expect_err("expected resolver errors")
    }

    #[test]
    fn records_hop_distances() {
        let (program, resolutions, result) =
            resolve_source("{ var a = 1; { print a; a = 2; } print a; }");
        result.unwrap();

        let outer_block = match &program.statements[0] {
            DeclOrStmt::Stmt(Stmt::Block(block)) => block,
            other => panic!("expected block, got {}", other),
        };
        let inner_block = match &outer_block.body[1] {
            DeclOrStmt::Stmt(Stmt::Block(block)) => block,
            other => panic!("expected block, got {}", other),
        };

        // one scope between the inner uses and the definition
        match &inner_block.body[0] {
            DeclOrStmt::Stmt(Stmt::Print(print)) => match &print.expression {
                Expr::Variable(variable) => {
                    assert_eq!(resolutions.get(&variable.name), Some(&1));
                }
                other => panic!("expected variable, got {}", other),
            },
            other => panic!("expected print, got {}", other),
        }
        match &inner_block.body[1] {
            DeclOrStmt::Stmt(Stmt::Expr(stmt)) => match &stmt.expression {
                Expr::Assign(assign) => {
                    assert_eq!(resolutions.get(&assign.name), Some(&1));
                }
                other => panic!("expected assignment, got {}", other),
            },
            other => panic!("expected expression statement, got {}", other),
        }
        // the use in the defining scope itself
        match &outer_block.body[2] {
            DeclOrStmt::Stmt(Stmt::Print(print)) => match &print.expression {
                Expr::Variable(variable) => {
                    assert_eq!(resolutions.get(&variable.name), Some(&0));
                }
                other => panic!("expected variable, got {}", other),
            },
            other => panic!("expected print, got {}", other),
        }
    }

    #[test]
    fn top_level_names_stay_unresolved() {
        let (program, resolutions, result) = resolve_source("var a = 1; print a;");
        result.unwrap();
        assert!(resolutions.is_empty());
        drop(program);
    }

    #[test]
    fn own_initializer_read_is_an_error() {
        let errors = errors_of("{ var a = 1; { var a = a; } }");
        assert!(matches!(
            errors.as_slice(),
            [ResolverError::ReadInOwnInitializer { .. }]
        ));
    }

    #[test]
    fn duplicate_declaration_in_scope_is_an_error() {
        let errors = errors_of("{ var a = 1; var a = 2; }");
        assert!(matches!(
            errors.as_slice(),
            [ResolverError::AlreadyDeclared { .. }]
        ));
    }

    #[test]
    fn return_rules() {
        assert!(matches!(
            errors_of("return 1;").as_slice(),
            [ResolverError::ReturnFromTopLevel { .. }]
        ));
        assert!(matches!(
            errors_of("class A { init() { return 1; } }").as_slice(),
            [ResolverError::ReturnValueFromInitializer { .. }]
        ));
        // a bare return inside an initializer is fine
        let (_, _, result) = resolve_source("class A { init() { return; } }");
        result.unwrap();
    }

    #[test]
    fn this_and_super_misuse() {
        assert!(matches!(
            errors_of("print this;").as_slice(),
            [ResolverError::ThisOutsideClass { .. }]
        ));
        assert!(matches!(
            errors_of("fun f() { return super.x; }").as_slice(),
            [ResolverError::SuperOutsideClass { .. }]
        ));
        assert!(matches!(
            errors_of("class A { f() { return super.f(); } }").as_slice(),
            [ResolverError::SuperWithoutSuperclass { .. }]
        ));
        assert!(matches!(
            errors_of("class A < A {}").as_slice(),
            [ResolverError::InheritFromSelf { .. }]
        ));
    }
}
