use super::chunk::{Chunk, OpCode};
use std::fmt::Write;

/// Renders a chunk as one instruction per line, for debugging and for
/// asserting on compiled shapes in tests.
pub fn disassemble(chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    writeln!(out, "== {} ==", name).unwrap();
    let mut offset = 0;
    while offset < chunk.len() {
        offset = disassemble_instruction(chunk, offset, &mut out);
    }
    out
}

pub fn disassemble_instruction(chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    write!(out, "{:04} ", offset).unwrap();
    if offset > 0 && chunk.line_at(offset) == chunk.line_at(offset - 1) {
        write!(out, "   | ").unwrap();
    } else {
        write!(out, "{:4} ", chunk.line_at(offset)).unwrap();
    }

    let byte = chunk.code()[offset];
    let op = match OpCode::try_from(byte) {
        Ok(op) => op,
        Err(_) => {
            writeln!(out, "Unknown opcode {}", byte).unwrap();
            return offset + 1;
        }
    };

    match op {
        OpCode::Constant | OpCode::GetGlobal | OpCode::DefineGlobal | OpCode::SetGlobal => {
            let index = chunk.code()[offset + 1];
            writeln!(
                out,
                "{:<16} {:4} '{:?}'",
                format!("{:?}", op),
                index,
                chunk.constant(index)
            )
            .unwrap();
            offset + 2
        }
        OpCode::GetLocal | OpCode::SetLocal | OpCode::Call => {
            let operand = chunk.code()[offset + 1];
            writeln!(out, "{:<16} {:4}", format!("{:?}", op), operand).unwrap();
            offset + 2
        }
        OpCode::Jump | OpCode::JumpIfFalse | OpCode::Loop => {
            let operand =
                u16::from_be_bytes([chunk.code()[offset + 1], chunk.code()[offset + 2]]);
            let target = if op == OpCode::Loop {
                offset + 3 - operand as usize
            } else {
                offset + 3 + operand as usize
            };
            writeln!(out, "{:<16} {:4} -> {}", format!("{:?}", op), offset, target).unwrap();
            offset + 3
        }
        _ => {
            writeln!(out, "{:?}", op).unwrap();
            offset + 1
        }
    }
}
