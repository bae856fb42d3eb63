//! End-to-end fixture runner: every `.lox` file under `test_fixtures/` is a
//! trial whose expected stdout is spelled out in `// expect:` comments.
//! Fixtures under `test_fixtures/vm/` stay inside the bytecode back-end's
//! supported surface and run on both back-ends.

use colored::Colorize;
use lazy_static::lazy_static;
use libtest_mimic::{Arguments, Failed, Trial};
use lox::{Interpreter, SourceReference, Vm};
use regex::Regex;
use std::{
    fs,
    path::{Path, PathBuf},
};

lazy_static! {
    static ref EXPECT_RE: Regex = Regex::new("// expect: (.*)").unwrap();
}

fn main() {
    let args = Arguments::from_args();

    let mut trials = Vec::new();
    for path in all_fixtures(Path::new("test_fixtures")) {
        let name = path.to_string_lossy().into_owned();
        let runs_on_vm = path.starts_with("test_fixtures/vm");
        trials.push(Trial::test(format!("treewalk::{}", name), {
            let path = path.clone();
            move || run_treewalk(&path)
        }));
        if runs_on_vm {
            trials.push(Trial::test(format!("vm::{}", name), move || run_vm(&path)));
        }
    }

    libtest_mimic::run(&args, trials).exit();
}

fn all_fixtures(root: &Path) -> Vec<PathBuf> {
    let mut fixtures = Vec::new();
    collect(root, &mut fixtures);
    fixtures.sort();
    return fixtures;

    fn collect(dir: &Path, fixtures: &mut Vec<PathBuf>) {
        for entry in fs::read_dir(dir).expect("fixture directory readable") {
            let path = entry.expect("fixture entry readable").path();
            if path.is_dir() {
                collect(&path, fixtures);
            } else if path.extension().is_some_and(|ext| ext == "lox") {
                fixtures.push(path);
            }
        }
    }
}

fn expected_output(source: &str) -> String {
    let mut expected = String::new();
    for captures in EXPECT_RE.captures_iter(source) {
        expected.push_str(captures[1].trim_end());
        expected.push('\n');
    }
    expected
}

fn run_treewalk(path: &Path) -> Result<(), Failed> {
    let source = fs::read_to_string(path).map_err(|error| error.to_string())?;
    let expected = expected_output(&source);

    let (program, scan_errors, parse_errors) = lox::parse(&path.to_string_lossy(), &source);
    if !scan_errors.is_empty() || !parse_errors.is_empty() {
        return Err(format!(
            "static errors: {:?} {:?}",
            scan_errors, parse_errors
        )
        .into());
    }

    let mut output = Vec::new();
    let mut interpreter = Interpreter::new(&mut output);
    let prepared = interpreter
        .prepare(program)
        .map_err(|errors| format!("resolve errors: {:?}", errors))?;
    interpreter
        .interpret(&prepared)
        .map_err(|error| format!("runtime error: {}", error))?;
    drop(interpreter);

    compare_outputs(&expected, &String::from_utf8_lossy(&output))
}

fn run_vm(path: &Path) -> Result<(), Failed> {
    let source = fs::read_to_string(path).map_err(|error| error.to_string())?;
    let expected = expected_output(&source);

    let mut output = Vec::new();
    let mut vm = Vm::new(&mut output);
    vm.interpret(&source, SourceReference::new(path.to_string_lossy(), source.as_str()))
        .map_err(|error| format!("interpret error: {:?}", error))?;
    drop(vm);

    compare_outputs(&expected, &String::from_utf8_lossy(&output))
}

fn compare_outputs(expected: &str, actual: &str) -> Result<(), Failed> {
    if expected == actual {
        return Ok(());
    }

    const EXPECTED: &str = "expected";
    const ACTUAL: &str = "actual";
    const NONE: &str = "<none>";

    let expected_lines: Vec<&str> = expected.lines().collect();
    let actual_lines: Vec<&str> = actual.lines().collect();

    fn column_width(lines: &[&str], label: &str) -> usize {
        lines
            .iter()
            .map(|line| line.len())
            .max()
            .unwrap_or(0)
            .max(label.len())
    }
    let expected_width = column_width(&expected_lines, EXPECTED);
    let actual_width = column_width(&actual_lines, ACTUAL);

    let mut table = format!(
        "   | {:expected_width$} | {:actual_width$}\n",
        EXPECTED.bold(),
        ACTUAL.bold()
    );
    for i in 0..expected_lines.len().max(actual_lines.len()) {
        let expected_line = expected_lines.get(i);
        let actual_line = actual_lines.get(i);
        let is_match = expected_line == actual_line;
        let colorify = |line: &str| {
            if is_match {
                line.green()
            } else {
                line.red()
            }
        };
        table.push_str(&format!(
            " {} | {:expected_width$} | {:actual_width$}\n",
            if is_match { "✓" } else { "✗" },
            expected_line
                .map(|line| colorify(line))
                .unwrap_or_else(|| NONE.dimmed()),
            actual_line
                .map(|line| colorify(line))
                .unwrap_or_else(|| NONE.dimmed()),
        ));
    }

    Err(table.into())
}
