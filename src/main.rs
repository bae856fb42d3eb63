use std::io::{Stdout, Write};
use std::process::ExitCode;

use lox::{diag, Interpreter, SourceReference, Vm};
use rustyline::error::ReadlineError;

const EXIT_USAGE: u8 = 1;
const EXIT_STATIC_ERROR: u8 = 65;
const EXIT_RUNTIME_ERROR: u8 = 70;
const EXIT_IO_ERROR: u8 = 74;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Treewalk,
    Vm,
}

fn main() -> ExitCode {
    let mut backend = Backend::Treewalk;
    let mut script = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--implementation" => match args.next().as_deref() {
                Some("treewalk") => backend = Backend::Treewalk,
                Some("vm") => backend = Backend::Vm,
                _ => return usage(),
            },
            _ if arg.starts_with("--") => return usage(),
            _ if script.is_none() => script = Some(arg),
            _ => return usage(),
        }
    }

    match script {
        Some(path) => run_file(backend, &path),
        None => run_prompt(backend),
    }
}

fn usage() -> ExitCode {
    eprintln!("usage: lox [--implementation treewalk|vm] [script]");
    ExitCode::from(EXIT_USAGE)
}

fn run_file(backend: Backend, path: &str) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("error reading file '{}': {}", path, error);
            return ExitCode::from(EXIT_IO_ERROR);
        }
    };
    match backend {
        Backend::Treewalk => run_file_treewalk(path, &source),
        Backend::Vm => run_file_vm(path, &source),
    }
}

fn run_file_treewalk(path: &str, source: &str) -> ExitCode {
    let (program, scan_errors, parse_errors) = lox::parse(path, source);
    let source_reference = program.source_reference.clone();

    let mut had_static_error = false;
    for error in &scan_errors {
        eprintln!("{}", diag::scan_error(error));
        had_static_error = true;
    }
    for error in &parse_errors {
        eprintln!("{}", diag::parse_error(&source_reference, error));
        had_static_error = true;
    }

    let mut stdout = std::io::stdout();
    let mut interpreter = Interpreter::new(&mut stdout);
    // the resolver runs and reports even when the parse already failed
    let prepared = match interpreter.prepare(program) {
        Ok(prepared) => Some(prepared),
        Err(errors) => {
            for error in &errors {
                eprintln!("{}", diag::resolve_error(&source_reference, error));
            }
            had_static_error = true;
            None
        }
    };
    if had_static_error {
        return ExitCode::from(EXIT_STATIC_ERROR);
    }

    let prepared = prepared.expect("prepare succeeded without static errors");
    match interpreter.interpret(&prepared) {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", diag::runtime_error(&error));
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

fn run_file_vm(path: &str, source: &str) -> ExitCode {
    let mut stdout = std::io::stdout();
    let mut vm = Vm::new(&mut stdout);
    match vm.interpret(source, SourceReference::new(path, source)) {
        Ok(_) => ExitCode::SUCCESS,
        Err(lox::InterpretError::Compile(errors)) => {
            for error in &errors {
                eprintln!("{}", diag::compile_error(error));
            }
            ExitCode::from(EXIT_STATIC_ERROR)
        }
        Err(lox::InterpretError::Runtime(error)) => {
            eprintln!("{}", diag::vm_error(&error));
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

/// The REPL: errors report and the loop carries on; interpreter state built
/// up before an error sticks around for the next line.
fn run_prompt(backend: Backend) -> ExitCode {
    let mut editor = match rustyline::DefaultEditor::new() {
        Ok(editor) => editor,
        Err(error) => {
            eprintln!("error initializing line editor: {}", error);
            return ExitCode::from(EXIT_IO_ERROR);
        }
    };

    let mut stdout = std::io::stdout();
    let mut session: Session<'_, Stdout> = match backend {
        Backend::Treewalk => Session::Treewalk(Interpreter::new(&mut stdout)),
        Backend::Vm => Session::Vm(Vm::new(&mut stdout)),
    };

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let _ = editor.add_history_entry(&line);
                session.run_line(&line);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                return ExitCode::SUCCESS
            }
            Err(error) => {
                eprintln!("error reading from stdin: {}", error);
                return ExitCode::from(EXIT_IO_ERROR);
            }
        }
    }
}

enum Session<'out, W: Write> {
    Treewalk(Interpreter<'out, W>),
    Vm(Vm<'out, W>),
}

impl<W: Write> Session<'_, W> {
    fn run_line(&mut self, line: &str) {
        match self {
            Session::Treewalk(interpreter) => {
                let (program, scan_errors, parse_errors) = lox::parse("<repl>", line);
                let source_reference = program.source_reference.clone();
                let mut had_static_error = false;
                for error in &scan_errors {
                    eprintln!("{}", diag::scan_error(error));
                    had_static_error = true;
                }
                for error in &parse_errors {
                    eprintln!("{}", diag::parse_error(&source_reference, error));
                    had_static_error = true;
                }
                let prepared = match interpreter.prepare(program) {
                    Ok(prepared) => Some(prepared),
                    Err(errors) => {
                        for error in &errors {
                            eprintln!("{}", diag::resolve_error(&source_reference, error));
                        }
                        None
                    }
                };
                if had_static_error {
                    return;
                }
                let Some(prepared) = prepared else { return };
                if let Err(error) = interpreter.interpret(&prepared) {
                    eprintln!("{}", diag::runtime_error(&error));
                }
            }
            Session::Vm(vm) => {
                match vm.interpret(line, SourceReference::new("<repl>", line)) {
                    Ok(_) => {}
                    Err(lox::InterpretError::Compile(errors)) => {
                        for error in &errors {
                            eprintln!("{}", diag::compile_error(error));
                        }
                    }
                    Err(lox::InterpretError::Runtime(error)) => {
                        eprintln!("{}", diag::vm_error(&error));
                    }
                }
            }
        }
    }
}
