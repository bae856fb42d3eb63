use miette::Diagnostic;
use thiserror::Error;

use super::{
    chunk::OpCode,
    compiler::{CompileError, Compiler},
    heap::Heap,
    object::{InternedString, ObjFunction},
    value::Value,
};
use crate::source_reference::SourceReference;
use std::{collections::HashMap, io::Write, rc::Rc};

pub const FRAMES_MAX: usize = 64;
pub const STACK_MAX: usize = FRAMES_MAX * (u8::MAX as usize + 1);

/// A runtime failure. The VM has already reset its stack and frames by the
/// time one of these is returned; the line comes from the chunk's
/// co-indexed line table.
#[derive(Error, Diagnostic, Debug)]
#[error("{message}")]
pub struct VmError {
    pub message: String,
    pub line: usize,
}

#[derive(Error, Diagnostic, Debug)]
pub enum InterpretError {
    #[error("compilation failed")]
    Compile(Vec<CompileError>),
    #[error(transparent)]
    Runtime(#[from] VmError),
}

/// One invocation on the frame stack: the function being run, the
/// instruction pointer into its chunk, and the stack index of its slot 0.
struct CallFrame {
    function: Rc<ObjFunction>,
    ip: usize,
    base: usize,
}

/// The bytecode interpreter: value stack, frame stack, globals, and the
/// heap shared with the compiler.
pub struct Vm<'out, W: Write> {
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    globals: HashMap<InternedString, Value>,
    heap: Heap,
    stdout: &'out mut W,
}

impl<'out, W: Write> Vm<'out, W> {
    pub fn new(stdout: &'out mut W) -> Self {
        Self {
            stack: Vec::new(),
            frames: Vec::new(),
            globals: HashMap::new(),
            heap: Heap::new(),
            stdout,
        }
    }

    /// Compiles and runs one source unit. Globals survive into the next
    /// call, which is what keeps the REPL stateful.
    pub fn interpret(
        &mut self,
        source: &str,
        source_reference: SourceReference,
    ) -> Result<(), InterpretError> {
        let script = Compiler::compile(source, source_reference, &mut self.heap)
            .map_err(InterpretError::Compile)?;

        self.stack.push(Value::Function(script.clone()));
        self.frames.push(CallFrame {
            function: script,
            ip: 0,
            base: 0,
        });
        self.run().map_err(InterpretError::Runtime)
    }

    /// Tears down everything the heap allocated.
    pub fn free_objects(&mut self) {
        self.globals.clear();
        self.stack.clear();
        self.frames.clear();
        self.heap.free_objects();
    }

    fn run(&mut self) -> Result<(), VmError> {
        loop {
            let op_byte = self.read_byte();
            let op = OpCode::try_from(op_byte)
                .map_err(|_| self.runtime_error(format!("Unknown opcode {}.", op_byte)))?;

            match op {
                OpCode::Constant => {
                    let value = self.read_constant();
                    self.push(value)?;
                }
                OpCode::Nil => self.push(Value::Nil)?,
                OpCode::True => self.push(Value::Bool(true))?,
                OpCode::False => self.push(Value::Bool(false))?,
                OpCode::Pop => {
                    self.pop()?;
                }
                OpCode::GetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.frame().base;
                    let value = self.stack[base + slot].clone();
                    self.push(value)?;
                }
                OpCode::SetLocal => {
                    let slot = self.read_byte() as usize;
                    let value = self.peek(0)?.clone();
                    let base = self.frame().base;
                    self.stack[base + slot] = value;
                }
                OpCode::GetGlobal => {
                    let name = self.read_string_constant();
                    match self.globals.get(&name) {
                        Some(value) => {
                            let value = value.clone();
                            self.push(value)?;
                        }
                        None => {
                            return Err(
                                self.runtime_error(format!("Undefined variable '{}'.", name))
                            )
                        }
                    }
                }
                OpCode::DefineGlobal => {
                    let name = self.read_string_constant();
                    let value = self.pop()?;
                    self.globals.insert(name, value);
                }
                OpCode::SetGlobal => {
                    let name = self.read_string_constant();
                    let value = self.peek(0)?.clone();
                    if self.globals.contains_key(&name) {
                        self.globals.insert(name, value);
                    } else {
                        return Err(
                            self.runtime_error(format!("Undefined variable '{}'.", name))
                        );
                    }
                }
                OpCode::Equal => {
                    let right = self.pop()?;
                    let left = self.pop()?;
                    self.push(Value::Bool(left == right))?;
                }
                OpCode::Greater => {
                    let (left, right) = self.pop_numbers()?;
                    self.push(Value::Bool(left > right))?;
                }
                OpCode::Less => {
                    let (left, right) = self.pop_numbers()?;
                    self.push(Value::Bool(left < right))?;
                }
                OpCode::Add => {
                    let right = self.pop()?;
                    let left = self.pop()?;
                    match (&left, &right) {
                        (Value::Number(left), Value::Number(right)) => {
                            let sum = left + right;
                            self.push(Value::Number(sum))?;
                        }
                        (Value::String(left), Value::String(right)) => {
                            let mut concatenated =
                                String::with_capacity(left.chars().len() + right.chars().len());
                            concatenated.push_str(left.chars());
                            concatenated.push_str(right.chars());
                            let object = self.heap.intern(&concatenated);
                            self.push(Value::String(object))?;
                        }
                        _ => {
                            return Err(self.runtime_error(
                                "Operands must be two numbers or two strings.".to_string(),
                            ))
                        }
                    }
                }
                OpCode::Subtract => {
                    let (left, right) = self.pop_numbers()?;
                    self.push(Value::Number(left - right))?;
                }
                OpCode::Multiply => {
                    let (left, right) = self.pop_numbers()?;
                    self.push(Value::Number(left * right))?;
                }
                OpCode::Divide => {
                    let (left, right) = self.pop_numbers()?;
                    self.push(Value::Number(left / right))?;
                }
                OpCode::Not => {
                    let value = self.pop()?;
                    self.push(Value::Bool(!value.is_truthy()))?;
                }
                OpCode::Negate => {
                    let value = self.pop()?;
                    match value.as_number() {
                        Some(number) => self.push(Value::Number(-number))?,
                        None => {
                            return Err(
                                self.runtime_error("Operand must be a number.".to_string())
                            )
                        }
                    }
                }
                OpCode::Print => {
                    let value = self.pop()?;
                    writeln!(self.stdout, "{}", value).unwrap();
                }
                OpCode::Jump => {
                    let offset = self.read_u16() as usize;
                    self.frame_mut().ip += offset;
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_u16() as usize;
                    if !self.peek(0)?.is_truthy() {
                        self.frame_mut().ip += offset;
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_u16() as usize;
                    self.frame_mut().ip -= offset;
                }
                OpCode::Call => {
                    let argument_count = self.read_byte() as usize;
                    self.call_value(argument_count)?;
                }
                OpCode::Return => {
                    let result = self.pop()?;
                    let finished = self.frames.pop().expect("a frame is always running");
                    if self.frames.is_empty() {
                        // the script function itself is still on the stack
                        self.pop()?;
                        debug_assert!(self.stack.is_empty(), "stack not empty after script");
                        return Ok(());
                    }
                    self.stack.truncate(finished.base);
                    self.push(result)?;
                }
            }
        }
    }

    fn frame(&self) -> &CallFrame {
        self.frames.last().expect("a frame is always running")
    }

    fn frame_mut(&mut self) -> &mut CallFrame {
        self.frames.last_mut().expect("a frame is always running")
    }

    fn read_byte(&mut self) -> u8 {
        let frame = self.frame_mut();
        let byte = frame.function.chunk.code()[frame.ip];
        frame.ip += 1;
        byte
    }

    fn read_u16(&mut self) -> u16 {
        let high = self.read_byte();
        let low = self.read_byte();
        u16::from_be_bytes([high, low])
    }

    fn read_constant(&mut self) -> Value {
        let index = self.read_byte();
        self.frame().function.chunk.constant(index).clone()
    }

    fn read_string_constant(&mut self) -> InternedString {
        match self.read_constant() {
            Value::String(name) => InternedString(name),
            other => unreachable!("name constants are interned strings, found {:?}", other),
        }
    }

    fn push(&mut self, value: Value) -> Result<(), VmError> {
        if self.stack.len() >= STACK_MAX {
            return Err(self.runtime_error("Stack overflow.".to_string()));
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, VmError> {
        match self.stack.pop() {
            Some(value) => Ok(value),
            None => Err(self.runtime_error("Stack underflow.".to_string())),
        }
    }

    fn peek(&self, distance: usize) -> Result<&Value, VmError> {
        self.stack
            .get(self.stack.len() - 1 - distance)
            .ok_or_else(|| VmError {
                message: "Stack underflow.".to_string(),
                line: 0,
            })
    }

    fn pop_numbers(&mut self) -> Result<(f64, f64), VmError> {
        let right = self.pop()?;
        let left = self.pop()?;
        match (left.as_number(), right.as_number()) {
            (Some(left), Some(right)) => Ok((left, right)),
            _ => Err(self.runtime_error("Operands must be numbers.".to_string())),
        }
    }

    fn call_value(&mut self, argument_count: usize) -> Result<(), VmError> {
        let callee = self.peek(argument_count)?.clone();
        match callee {
            Value::Function(function) => self.call_function(function, argument_count),
            _ => Err(self.runtime_error("Can only call functions.".to_string())),
        }
    }

    fn call_function(
        &mut self,
        function: Rc<ObjFunction>,
        argument_count: usize,
    ) -> Result<(), VmError> {
        if argument_count != function.arity {
            return Err(self.runtime_error(format!(
                "Expected {} arguments but got {}.",
                function.arity, argument_count
            )));
        }
        if self.frames.len() == FRAMES_MAX {
            return Err(self.runtime_error("Stack overflow.".to_string()));
        }
        self.frames.push(CallFrame {
            function,
            ip: 0,
            base: self.stack.len() - argument_count - 1,
        });
        Ok(())
    }

    /// Builds the error for the current instruction, then resets the stack
    /// and frames so the VM is reusable for the next input.
    fn runtime_error(&mut self, message: String) -> VmError {
        let line = self
            .frames
            .last()
            .map(|frame| frame.function.chunk.line_at(frame.ip.saturating_sub(1)))
            .unwrap_or(0);
        self.stack.clear();
        self.frames.clear();
        VmError { message, line }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> Result<String, InterpretError> {
        let mut output = Vec::new();
        let mut vm = Vm::new(&mut output);
        let result = vm.interpret(source, SourceReference::new("test.lox", source));
        drop(vm);
        result.map(|_| String::from_utf8(output).unwrap())
    }

    fn run_ok(source: &str) -> String {
        run(source).expect("unexpected interpret error")
    }

    fn runtime_error(source: &str) -> VmError {
        match run(source).expect_err("expected a runtime error") {
            InterpretError::Runtime(error) => error,
            InterpretError::Compile(errors) => panic!("compile errors: {:?}", errors),
        }
    }

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(run_ok("print 1 + 2 * 3;"), "7\n");
        assert_eq!(run_ok("print (1 + 2) * 3;"), "9\n");
        assert_eq!(run_ok("print -2 + 5;"), "3\n");
        assert_eq!(run_ok("print 10 / 4;"), "2.5\n");
    }

    #[test]
    fn comparisons_and_equality() {
        assert_eq!(run_ok("print 1 < 2;"), "true\n");
        assert_eq!(run_ok("print 2 <= 1;"), "false\n");
        assert_eq!(run_ok("print 1 == 1;"), "true\n");
        assert_eq!(run_ok("print 1 != 1;"), "false\n");
        assert_eq!(run_ok("print nil == nil;"), "true\n");
        assert_eq!(run_ok("print nil == 0;"), "false\n");
        assert_eq!(run_ok("print \"a\" == \"a\";"), "true\n");
        assert_eq!(run_ok("print !nil;"), "true\n");
    }

    #[test]
    fn globals_and_locals() {
        assert_eq!(run_ok("var a = 1; a = a + 2; print a;"), "3\n");
        assert_eq!(run_ok("{ var a = \"local\"; print a; }"), "local\n");
        assert_eq!(
            run_ok("var g = 1; { var g = 2; print g; } print g;"),
            "2\n1\n"
        );
    }

    #[test]
    fn control_flow() {
        assert_eq!(run_ok("if (1 < 2) print \"yes\"; else print \"no\";"), "yes\n");
        assert_eq!(run_ok("if (nil) print \"yes\"; else print \"no\";"), "no\n");
        assert_eq!(
            run_ok("var i = 0; while (i < 3) { print i; i = i + 1; }"),
            "0\n1\n2\n"
        );
        assert_eq!(
            run_ok("var s = 0; for (var i = 1; i <= 3; i = i + 1) s = s + i; print s;"),
            "6\n"
        );
    }

    #[test]
    fn logical_operators_short_circuit() {
        assert_eq!(run_ok("print false and 1;"), "false\n");
        assert_eq!(run_ok("print true and 1;"), "1\n");
        assert_eq!(run_ok("print true or 1;"), "true\n");
        assert_eq!(run_ok("print false or \"fallback\";"), "fallback\n");
    }

    #[test]
    fn string_concatenation_interns_results() {
        assert_eq!(run_ok("print \"foo\" + \"bar\";"), "foobar\n");
        assert_eq!(run_ok("print \"foo\" + \"bar\" == \"foobar\";"), "true\n");
    }

    #[test]
    fn functions_and_call_frames() {
        assert_eq!(
            run_ok("fun add(a, b) { return a + b; } print add(1, 2);"),
            "3\n"
        );
        assert_eq!(
            run_ok("fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);"),
            "55\n"
        );
        assert_eq!(run_ok("fun noop() {} print noop();"), "nil\n");
        assert_eq!(run_ok("fun f() { return; } print f();"), "nil\n");
        assert_eq!(run_ok("fun f() {} print f;"), "<fn f>\n");
    }

    #[test]
    fn runtime_errors_carry_lines() {
        let error = runtime_error("var a = 1;\nprint a + \"s\";");
        assert_eq!(error.message, "Operands must be two numbers or two strings.");
        assert_eq!(error.line, 2);

        let error = runtime_error("print missing;");
        assert_eq!(error.message, "Undefined variable 'missing'.");

        let error = runtime_error("missing = 1;");
        assert_eq!(error.message, "Undefined variable 'missing'.");

        let error = runtime_error("print -\"x\";");
        assert_eq!(error.message, "Operand must be a number.");

        let error = runtime_error("var f = 1; f();");
        assert_eq!(error.message, "Can only call functions.");

        let error = runtime_error("fun f(a) {} f();");
        assert_eq!(error.message, "Expected 1 arguments but got 0.");
    }

    #[test]
    fn deep_recursion_overflows_the_frame_stack() {
        let error = runtime_error("fun loop() { loop(); } loop();");
        assert_eq!(error.message, "Stack overflow.");
    }

    #[test]
    fn globals_survive_across_interprets() {
        let mut output = Vec::new();
        let mut vm = Vm::new(&mut output);
        vm.interpret("var a = 1;", SourceReference::new("<repl>", "var a = 1;"))
            .unwrap();
        vm.interpret("print a + 1;", SourceReference::new("<repl>", "print a + 1;"))
            .unwrap();
        drop(vm);
        assert_eq!(String::from_utf8(output).unwrap(), "2\n");
    }

    #[test]
    fn stack_is_balanced_after_each_statement() {
        let source =
            "var a = 1; { var b = a + 1; print b; } if (a) print a; for (var i = 0; i < 2; i = i + 1) {}";
        let mut output = Vec::new();
        let mut vm = Vm::new(&mut output);
        vm.interpret(source, SourceReference::new("test.lox", source))
            .unwrap();
        assert!(vm.stack.is_empty());
        assert!(vm.frames.is_empty());
    }
}
