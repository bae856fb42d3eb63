mod callable;
mod class;
mod environment;
mod error;
mod function;
mod instance;
mod native;
mod unwind;
mod value;

pub use error::RuntimeError;
pub use value::{RuntimeValue, ValueType};

use crate::{
    ast::*,
    keywords,
    resolver::{Resolutions, Resolver, ResolverError},
    side_table::UniqueId,
    source::SourceSpan,
    source_reference::SourceReference,
};
use callable::Callable;
use class::Class;
use environment::{Environment, EnvironmentRef};
use function::Function;
use native::NativeFunction;
use std::{collections::HashMap, io::Write, mem};

use unwind::{Execution, Unwind};

/// Where the code being evaluated came from. Function values carry one so
/// that errors raised inside a body point into the right source even when
/// the call happens many REPL lines later.
#[derive(Debug, Clone)]
pub struct Ctx {
    source_code: SourceReference,
}

/// A program that has been through the resolver of a specific interpreter.
/// The marker id keeps a program from being run against an interpreter whose
/// side table never saw it.
pub struct PreparedProgram(UniqueId, Program);

impl PreparedProgram {
    pub fn program(&self) -> &Program {
        &self.1
    }
}

/// The tree-walk evaluator. Owns the globals, the current environment
/// pointer, and the side table of resolved hop distances.
pub struct Interpreter<'out, W: Write> {
    globals: EnvironmentRef,
    environment: EnvironmentRef,
    stdout: &'out mut W,
    resolutions: Resolutions,
    id: UniqueId,
}

impl<'out, W: Write> Interpreter<'out, W> {
    pub fn new(stdout: &'out mut W) -> Self {
        let globals = Environment::new().wrap();
        let mut interpreter = Self {
            environment: globals.clone(),
            globals,
            stdout,
            resolutions: Resolutions::new(),
            id: UniqueId::fresh(),
        };
        interpreter.define_native("clock", 0, natives::clock);
        interpreter
    }

    /// Runs the resolver, populating this interpreter's side table.
    pub fn prepare(&mut self, program: Program) -> Result<PreparedProgram, Vec<ResolverError>> {
        Resolver::resolve(&program, &mut self.resolutions)?;
        Ok(PreparedProgram(self.id, program))
    }

    /// Evaluates the whole program, yielding the value of its last
    /// statement.
    pub fn interpret(&mut self, prepared: &PreparedProgram) -> Result<RuntimeValue, RuntimeError> {
        assert_eq!(prepared.0, self.id, "program prepared by another interpreter");
        let ctx = Ctx {
            source_code: prepared.1.source_reference.clone(),
        };
        let mut last = RuntimeValue::nil();
        for stmt in prepared.1.statements.iter() {
            match self.eval_decl_or_stmt(stmt, &ctx) {
                Ok(value) => last = value,
                // unreachable once the resolver has rejected top-level returns
                Err(Unwind::Return(value)) => last = value,
                Err(Unwind::Error(error)) => return Err(error),
            }
        }
        Ok(last)
    }

    fn eval_decl_or_stmt(&mut self, decl_or_stmt: &DeclOrStmt, ctx: &Ctx) -> Execution {
        match decl_or_stmt {
            DeclOrStmt::Decl(decl) => self.eval_decl(decl, ctx).map_err(Unwind::Error),
            DeclOrStmt::Stmt(stmt) => self.eval_stmt(stmt, ctx),
        }
    }

    fn eval_decl(&mut self, decl: &Decl, ctx: &Ctx) -> Result<RuntimeValue, RuntimeError> {
        match decl {
            Decl::Var(decl) => {
                let value = match &decl.initializer {
                    Some(initializer) => self.eval_expr(initializer, ctx)?,
                    None => RuntimeValue::nil(),
                };
                self.environment
                    .borrow_mut()
                    .define(&decl.name.name, value.clone());
                Ok(value)
            }
            Decl::Fun(decl) => {
                let function = RuntimeValue::Function(Function::new(
                    decl.fun.clone(),
                    self.environment.clone(),
                    ctx.clone(),
                    false,
                ));
                self.environment
                    .borrow_mut()
                    .define(&decl.fun.name.name, function.clone());
                Ok(function)
            }
            Decl::Class(decl) => self.eval_class_decl(decl, ctx),
        }
    }

    fn eval_class_decl(&mut self, decl: &ClassDecl, ctx: &Ctx) -> Result<RuntimeValue, RuntimeError> {
        let superclass = match &decl.superclass {
            Some(superclass) => match self.eval_variable(&superclass.name, ctx)? {
                RuntimeValue::Class(class) => Some(class),
                _ => {
                    return Err(RuntimeError::SuperclassMustBeClass {
                        found_at: superclass.name.span,
                        source_code: ctx.source_code.clone(),
                    })
                }
            },
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(&decl.name.name, RuntimeValue::nil());

        let method_closure = match &superclass {
            Some(superclass) => {
                let mut environment = Environment::new_inside(self.environment.clone());
                environment.define(keywords::SUPER, RuntimeValue::Class(superclass.clone()));
                environment.wrap()
            }
            None => self.environment.clone(),
        };

        let methods: HashMap<String, Function> = decl
            .methods
            .iter()
            .map(|method| {
                let is_initializer = method.name.name == keywords::INIT;
                (
                    method.name.name.clone(),
                    Function::new(
                        method.clone(),
                        method_closure.clone(),
                        ctx.clone(),
                        is_initializer,
                    ),
                )
            })
            .collect();

        let class = RuntimeValue::Class(Class::new(&decl.name.name, superclass, methods));
        self.environment
            .borrow_mut()
            .assign(&decl.name.name, class.clone());
        Ok(class)
    }

    fn eval_stmt(&mut self, stmt: &Stmt, ctx: &Ctx) -> Execution {
        match stmt {
            Stmt::Expr(stmt) => Ok(self.eval_expr(&stmt.expression, ctx)?),
            Stmt::Print(stmt) => {
                let value = self.eval_expr(&stmt.expression, ctx)?;
                writeln!(self.stdout, "{}", value).unwrap();
                Ok(value)
            }
            Stmt::Block(stmt) => self.run_with_environment(
                Environment::new_inside(self.environment.clone()).wrap(),
                |interpreter| {
                    let mut last = RuntimeValue::nil();
                    for stmt in stmt.body.iter() {
                        last = interpreter.eval_decl_or_stmt(stmt, ctx)?;
                    }
                    Ok(last)
                },
            ),
            Stmt::If(stmt) => {
                if self.eval_expr(&stmt.condition, ctx)?.is_truthy() {
                    self.eval_stmt(&stmt.then_branch, ctx)?;
                } else if let Some(else_branch) = &stmt.else_branch {
                    self.eval_stmt(else_branch, ctx)?;
                }
                Ok(RuntimeValue::nil())
            }
            Stmt::While(stmt) => {
                while self.eval_expr(&stmt.condition, ctx)?.is_truthy() {
                    self.eval_stmt(&stmt.body, ctx)?;
                }
                Ok(RuntimeValue::nil())
            }
            Stmt::Return(stmt) => {
                let value = match &stmt.expression {
                    Some(expression) => self.eval_expr(expression, ctx)?,
                    None => RuntimeValue::nil(),
                };
                Err(Unwind::Return(value))
            }
        }
    }

    fn eval_expr(&mut self, expr: &Expr, ctx: &Ctx) -> Result<RuntimeValue, RuntimeError> {
        match expr {
            Expr::Literal(expr) => Ok((&expr.value).into()),
            Expr::Grouping(expr) => self.eval_expr(&expr.inner, ctx),
            Expr::Unary(expr) => self.eval_unary_expr(expr, ctx),
            Expr::Binary(expr) => self.eval_binary_expr(expr, ctx),
            Expr::Logical(expr) => self.eval_logical_expr(expr, ctx),
            Expr::Variable(expr) => self.eval_variable(&expr.name, ctx),
            Expr::Assign(expr) => self.eval_assign_expr(expr, ctx),
            Expr::Call(expr) => self.eval_call_expr(expr, ctx),
            Expr::Get(expr) => self.eval_get_expr(expr, ctx),
            Expr::Set(expr) => self.eval_set_expr(expr, ctx),
            Expr::This(expr) => self.eval_variable(&expr.keyword, ctx),
            Expr::Super(expr) => self.eval_super_expr(expr, ctx),
        }
    }

    fn eval_unary_expr(&mut self, expr: &UnaryExpr, ctx: &Ctx) -> Result<RuntimeValue, RuntimeError> {
        let right = self.eval_expr(&expr.right, ctx)?;
        Ok(match expr.operator.inner() {
            UnaryOperator::Minus => {
                let number = right.as_number(|| RuntimeError::OperandMustBeNumber {
                    operator: expr.operator.inner().to_string(),
                    found_at: expr.operator.span(),
                    source_code: ctx.source_code.clone(),
                })?;
                RuntimeValue::Number(-number)
            }
            UnaryOperator::Not => RuntimeValue::Boolean(!right.is_truthy()),
        })
    }

    fn eval_binary_expr(&mut self, expr: &BinaryExpr, ctx: &Ctx) -> Result<RuntimeValue, RuntimeError> {
        let left = self.eval_expr(&expr.left, ctx)?;
        let right = self.eval_expr(&expr.right, ctx)?;
        let operator = *expr.operator.inner();

        match operator {
            BinaryOperator::EqualTo => return Ok(RuntimeValue::Boolean(left == right)),
            BinaryOperator::NotEqualTo => return Ok(RuntimeValue::Boolean(left != right)),
            BinaryOperator::Plus => {
                return match (&left, &right) {
                    (RuntimeValue::Number(left), RuntimeValue::Number(right)) => {
                        Ok(RuntimeValue::Number(left + right))
                    }
                    (RuntimeValue::String(left), RuntimeValue::String(right)) => {
                        let mut concatenated = String::with_capacity(left.len() + right.len());
                        concatenated.push_str(left);
                        concatenated.push_str(right);
                        Ok(concatenated.into())
                    }
                    _ => Err(RuntimeError::OperandsMustBeNumbersOrStrings {
                        found_at: expr.operator.span(),
                        source_code: ctx.source_code.clone(),
                    }),
                }
            }
            _ => {}
        }

        let left = left.as_number(|| RuntimeError::OperandsMustBeNumbers {
            operator: operator.to_string(),
            found_at: expr.operator.span(),
            source_code: ctx.source_code.clone(),
        })?;
        let right = right.as_number(|| RuntimeError::OperandsMustBeNumbers {
            operator: operator.to_string(),
            found_at: expr.operator.span(),
            source_code: ctx.source_code.clone(),
        })?;

        Ok(match operator {
            BinaryOperator::Minus => RuntimeValue::Number(left - right),
            BinaryOperator::Multiply => RuntimeValue::Number(left * right),
            BinaryOperator::Divide => RuntimeValue::Number(left / right),
            BinaryOperator::LessThan => RuntimeValue::Boolean(left < right),
            BinaryOperator::LessThanOrEqualTo => RuntimeValue::Boolean(left <= right),
            BinaryOperator::GreaterThan => RuntimeValue::Boolean(left > right),
            BinaryOperator::GreaterThanOrEqualTo => RuntimeValue::Boolean(left >= right),
            BinaryOperator::Plus | BinaryOperator::EqualTo | BinaryOperator::NotEqualTo => {
                unreachable!("handled above")
            }
        })
    }

    fn eval_logical_expr(&mut self, expr: &LogicalExpr, ctx: &Ctx) -> Result<RuntimeValue, RuntimeError> {
        let left = self.eval_expr(&expr.left, ctx)?;
        let short_circuits = match expr.operator.inner() {
            LogicalOperator::Or => left.is_truthy(),
            LogicalOperator::And => !left.is_truthy(),
        };
        if short_circuits {
            Ok(left)
        } else {
            self.eval_expr(&expr.right, ctx)
        }
    }

    fn eval_assign_expr(&mut self, expr: &AssignExpr, ctx: &Ctx) -> Result<RuntimeValue, RuntimeError> {
        let value = self.eval_expr(&expr.value, ctx)?;
        match self.resolutions.get(&expr.name) {
            Some(distance) => {
                let assigned = Environment::assign_at(
                    &self.environment,
                    *distance,
                    &expr.name.name,
                    value.clone(),
                );
                assert!(assigned, "resolved local must exist at its distance");
            }
            None => {
                if !self
                    .globals
                    .borrow_mut()
                    .assign(&expr.name.name, value.clone())
                {
                    return Err(RuntimeError::UndefinedVariable {
                        name: expr.name.name.clone(),
                        found_at: expr.name.span,
                        source_code: ctx.source_code.clone(),
                    });
                }
            }
        }
        Ok(value)
    }

    fn eval_call_expr(&mut self, expr: &CallExpr, ctx: &Ctx) -> Result<RuntimeValue, RuntimeError> {
        let callee = self.eval_expr(&expr.callee, ctx)?;
        let mut arguments = Vec::with_capacity(expr.arguments.len());
        for argument in expr.arguments.iter() {
            arguments.push(self.eval_expr(argument, ctx)?);
        }

        match callee {
            RuntimeValue::Function(function) => {
                self.eval_call(&function, &arguments, expr.close_paren_span, ctx)
            }
            RuntimeValue::Class(class) => {
                self.eval_call(&class, &arguments, expr.close_paren_span, ctx)
            }
            RuntimeValue::NativeFunction(native) => {
                self.eval_call(&native, &arguments, expr.close_paren_span, ctx)
            }
            _ => Err(RuntimeError::NotCallable {
                found_at: expr.close_paren_span,
                source_code: ctx.source_code.clone(),
            }),
        }
    }

    fn eval_call<C: Callable>(
        &mut self,
        callable: &C,
        arguments: &[RuntimeValue],
        call_span: SourceSpan,
        ctx: &Ctx,
    ) -> Result<RuntimeValue, RuntimeError> {
        if arguments.len() != callable.arity() {
            return Err(RuntimeError::ArityMismatch {
                expected: callable.arity(),
                actual: arguments.len(),
                found_at: call_span,
                source_code: ctx.source_code.clone(),
            });
        }
        callable.call(self, arguments)
    }

    fn eval_get_expr(&mut self, expr: &GetExpr, ctx: &Ctx) -> Result<RuntimeValue, RuntimeError> {
        match self.eval_expr(&expr.object, ctx)? {
            RuntimeValue::Instance(instance) => instance.get(&expr.name.name).ok_or_else(|| {
                RuntimeError::UndefinedProperty {
                    name: expr.name.name.clone(),
                    found_at: expr.name.span,
                    source_code: ctx.source_code.clone(),
                }
            }),
            _ => Err(RuntimeError::PropertyOnNonInstance {
                found_at: expr.name.span,
                source_code: ctx.source_code.clone(),
            }),
        }
    }

    fn eval_set_expr(&mut self, expr: &SetExpr, ctx: &Ctx) -> Result<RuntimeValue, RuntimeError> {
        match self.eval_expr(&expr.object, ctx)? {
            RuntimeValue::Instance(instance) => {
                let value = self.eval_expr(&expr.value, ctx)?;
                instance.set(&expr.name.name, value.clone());
                Ok(value)
            }
            _ => Err(RuntimeError::FieldOnNonInstance {
                found_at: expr.name.span,
                source_code: ctx.source_code.clone(),
            }),
        }
    }

    fn eval_super_expr(&mut self, expr: &SuperExpr, ctx: &Ctx) -> Result<RuntimeValue, RuntimeError> {
        let distance = *self
            .resolutions
            .get(&expr.keyword)
            .expect("resolver rejects 'super' outside a subclass");

        let superclass = match Environment::get_at(&self.environment, distance, keywords::SUPER) {
            Some(RuntimeValue::Class(class)) => class,
            _ => unreachable!("'super' always resolves to a class"),
        };
        let receiver = match Environment::get_at(&self.environment, distance - 1, keywords::THIS) {
            Some(RuntimeValue::Instance(instance)) => instance,
            _ => unreachable!("'this' always resolves to an instance"),
        };

        let method = superclass.find_method(&expr.method.name).ok_or_else(|| {
            RuntimeError::UndefinedProperty {
                name: expr.method.name.clone(),
                found_at: expr.method.span,
                source_code: ctx.source_code.clone(),
            }
        })?;
        Ok(RuntimeValue::Function(method.bind(receiver)))
    }

    fn eval_variable(&mut self, name: &Identifier, ctx: &Ctx) -> Result<RuntimeValue, RuntimeError> {
        let value = match self.resolutions.get(name) {
            Some(distance) => Environment::get_at(&self.environment, *distance, &name.name),
            None => self.globals.borrow().get(&name.name),
        };
        value.ok_or_else(|| RuntimeError::UndefinedVariable {
            name: name.name.clone(),
            found_at: name.span,
            source_code: ctx.source_code.clone(),
        })
    }

    /// Swaps in `environment` for the duration of `run`; the previous
    /// environment pointer is restored on every exit path, unwinds included.
    fn run_with_environment<T, F: FnOnce(&mut Self) -> T>(
        &mut self,
        environment: EnvironmentRef,
        run: F,
    ) -> T {
        let previous = mem::replace(&mut self.environment, environment);
        let result = run(self);
        self.environment = previous;
        result
    }

    fn define_native(&mut self, name: &str, arity: usize, function: native::NativeFn) {
        self.globals.borrow_mut().define(
            name,
            RuntimeValue::NativeFunction(NativeFunction::new(name, arity, function)),
        );
    }
}

mod natives {
    use super::{RuntimeError, RuntimeValue};
    use std::time::SystemTime;

    pub fn clock(_: &[RuntimeValue]) -> Result<RuntimeValue, RuntimeError> {
        Ok(RuntimeValue::Number(
            SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs_f64(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::Parser, scanner::Scanner, scanner::TokenKind};
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> Result<String, RuntimeError> {
        let tokens = Scanner::new(source)
            .filter_map(Result::ok)
            .filter(|token| token.kind != TokenKind::LineComment);
        let (program, errors) = Parser::parse(tokens, SourceReference::new("test.lox", source));
        assert!(errors.is_empty(), "parse errors: {:?}", errors);

        let mut output = Vec::new();
        let mut interpreter = Interpreter::new(&mut output);
        let prepared = match interpreter.prepare(program) {
            Ok(prepared) => prepared,
            Err(errors) => panic!("resolver errors: {:?}", errors),
        };
        interpreter.interpret(&prepared)?;
        drop(interpreter);
        Ok(String::from_utf8(output).unwrap())
    }

    fn run_ok(source: &str) -> String {
        run(source).expect("unexpected runtime error")
    }

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(run_ok("print 1 + 2 * 3;"), "7\n");
        assert_eq!(run_ok("print (1 + 2) * 3;"), "9\n");
        assert_eq!(run_ok("print 10 / 4;"), "2.5\n");
        assert_eq!(run_ok("print -(1 + 2);"), "-3\n");
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(run_ok("print \"foo\" + \"bar\";"), "foobar\n");
    }

    #[test]
    fn mixed_plus_is_a_runtime_error() {
        let error = run("print \"a\" + 1;").unwrap_err();
        assert_eq!(
            error.to_string(),
            "Operands must be two numbers or two strings."
        );
        assert_eq!(error.line(), 1);
    }

    #[test]
    fn comparison_requires_numbers() {
        let error = run("print 1 < \"two\";").unwrap_err();
        assert_eq!(error.to_string(), "Operands must be numbers.");
    }

    #[test]
    fn truthiness_in_conditions() {
        assert_eq!(run_ok("if (0) print \"zero\"; else print \"no\";"), "zero\n");
        assert_eq!(run_ok("if (\"\") print \"empty\";"), "empty\n");
        assert_eq!(run_ok("if (nil) print \"yes\"; else print \"no\";"), "no\n");
    }

    #[test]
    fn equality_semantics() {
        assert_eq!(run_ok("print nil == nil;"), "true\n");
        assert_eq!(run_ok("print nil == 0;"), "false\n");
        assert_eq!(run_ok("print \"a\" == \"a\";"), "true\n");
        assert_eq!(run_ok("print 1 == true;"), "false\n");
    }

    #[test]
    fn short_circuit_skips_side_effects() {
        assert_eq!(
            run_ok("var n = 0; fun bump() { n = n + 1; return true; } false and bump(); true or bump(); print n;"),
            "0\n"
        );
        assert_eq!(run_ok("print \"hi\" or 2;"), "hi\n");
        assert_eq!(run_ok("print nil or \"fallback\";"), "fallback\n");
    }

    #[test]
    fn lexical_scope_and_shadowing() {
        assert_eq!(
            run_ok("var a = \"global\"; { fun show() { print a; } show(); var a = \"block\"; show(); }"),
            "global\nglobal\n"
        );
    }

    #[test]
    fn counter_closure_shares_its_captured_variable() {
        assert_eq!(
            run_ok(
                "fun makeCounter() { var i = 0; fun c() { i = i + 1; print i; } return c; } \
                 var c = makeCounter(); c(); c(); c();"
            ),
            "1\n2\n3\n"
        );
    }

    #[test]
    fn while_and_for_loops() {
        assert_eq!(
            run_ok("var s = 0; for (var i = 1; i <= 3; i = i + 1) s = s + i; print s;"),
            "6\n"
        );
        assert_eq!(
            run_ok("var i = 0; while (i < 2) { print i; i = i + 1; }"),
            "0\n1\n"
        );
    }

    #[test]
    fn functions_return_and_recursion() {
        assert_eq!(
            run_ok("fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);"),
            "55\n"
        );
        assert_eq!(run_ok("fun f() {} print f();"), "nil\n");
        assert_eq!(run_ok("fun f() { return; print \"not reached\"; } print f();"), "nil\n");
    }

    #[test]
    fn arity_is_enforced() {
        let error = run("fun f(a, b) {} f(1);").unwrap_err();
        assert_eq!(error.to_string(), "Expected 2 arguments but got 1.");
    }

    #[test]
    fn only_callables_can_be_called() {
        let error = run("var x = 1; x();").unwrap_err();
        assert_eq!(error.to_string(), "Can only call functions and classes.");
    }

    #[test]
    fn classes_instances_and_methods() {
        assert_eq!(
            run_ok("class Greeter { greet() { print \"hi\"; } } Greeter().greet();"),
            "hi\n"
        );
        assert_eq!(
            run_ok("class Box {} var b = Box(); b.contents = 42; print b.contents;"),
            "42\n"
        );
        assert_eq!(run_ok("class Box {} print Box;"), "Box\n");
        assert_eq!(run_ok("class Box {} print Box();"), "Box instance\n");
    }

    #[test]
    fn initializers_return_the_receiver() {
        assert_eq!(
            run_ok("class P { init(x) { this.x = x; } } print P(3).x;"),
            "3\n"
        );
        assert_eq!(
            run_ok("class P { init() { return; } } print P();"),
            "P instance\n"
        );
    }

    #[test]
    fn this_binds_to_the_receiver() {
        assert_eq!(
            run_ok(
                "class Cake { taste() { print \"The \" + this.flavor + \" cake is delicious!\"; } } \
                 var cake = Cake(); cake.flavor = \"chocolate\"; cake.taste();"
            ),
            "The chocolate cake is delicious!\n"
        );
        // a bound method keeps its receiver when stored in a variable
        assert_eq!(
            run_ok(
                "class A { init(n) { this.n = n; } show() { print this.n; } } \
                 var m = A(7).show; m();"
            ),
            "7\n"
        );
    }

    #[test]
    fn inheritance_and_super() {
        assert_eq!(
            run_ok(
                "class A { greet() { print \"A\"; } } \
                 class B < A { greet() { super.greet(); print \"B\"; } } \
                 B().greet();"
            ),
            "A\nB\n"
        );
        assert_eq!(
            run_ok("class A { f() { print \"inherited\"; } } class B < A {} B().f();"),
            "inherited\n"
        );
    }

    #[test]
    fn superclass_must_be_a_class() {
        let error = run("var NotAClass = \"so not\"; class C < NotAClass {}").unwrap_err();
        assert_eq!(error.to_string(), "Superclass must be a class.");
    }

    #[test]
    fn undefined_variable_and_property_errors() {
        assert_eq!(
            run("print missing;").unwrap_err().to_string(),
            "Undefined variable 'missing'."
        );
        assert_eq!(
            run("missing = 1;").unwrap_err().to_string(),
            "Undefined variable 'missing'."
        );
        assert_eq!(
            run("class A {} print A().nope;").unwrap_err().to_string(),
            "Undefined property 'nope'."
        );
        assert_eq!(
            run("print (4).nope;").unwrap_err().to_string(),
            "Only instances have properties."
        );
        assert_eq!(
            run("var x = 1; x.field = 2;").unwrap_err().to_string(),
            "Only instances have fields."
        );
    }

    #[test]
    fn runtime_error_reports_the_right_line() {
        let error = run("print 1;\nprint 2;\nprint -\"x\";").unwrap_err();
        assert_eq!(error.to_string(), "Operand must be a number.");
        assert_eq!(error.line(), 3);
    }

    #[test]
    fn assignment_evaluates_to_the_assigned_value() {
        assert_eq!(run_ok("var a = 1; print a = 2;"), "2\n");
    }

    #[test]
    fn globals_persist_across_programs_in_one_interpreter() {
        let mut output = Vec::new();
        let mut interpreter = Interpreter::new(&mut output);
        for source in ["var a = 1;", "a = a + 1;", "print a;"] {
            let tokens = Scanner::new(source)
                .filter_map(Result::ok)
                .filter(|token| token.kind != TokenKind::LineComment);
            let (program, errors) =
                Parser::parse(tokens, SourceReference::new("<repl>", source));
            assert!(errors.is_empty());
            let prepared = interpreter.prepare(program).unwrap();
            interpreter.interpret(&prepared).unwrap();
        }
        drop(interpreter);
        assert_eq!(String::from_utf8(output).unwrap(), "2\n");
    }
}
