// src/vm/disassembler.rs

//! Human-readable listing of a chunk, decoded with the same widths the VM uses.

use std::fmt::Write;

use crate::memory::Heap;
use crate::vm::chunk::Chunk;
use crate::vm::opcode::OpCode;

/// Disassembles every instruction in `chunk` under a `== name ==` header.
pub fn disassemble_chunk(chunk: &Chunk, heap: &Heap, name: &str) -> String {
    let mut out = format!("== {} ==\n", name);
    let mut offset = 0;
    while offset < chunk.code.len() {
        let (line, next) = disassemble_instruction(chunk, heap, offset);
        out.push_str(&line);
        out.push('\n');
        offset = next;
    }
    out
}

/// Renders the instruction at `offset`; returns the text and the offset of the next one.
pub fn disassemble_instruction(chunk: &Chunk, heap: &Heap, offset: usize) -> (String, usize) {
    let mut out = format!("{:04} ", offset);
    let line = chunk.line(offset);
    if offset > 0 && line == chunk.line(offset - 1) {
        out.push_str("   | ");
    } else {
        let _ = write!(out, "{:4} ", line);
    }

    let byte = chunk.code[offset];
    let op = match OpCode::try_from(byte) {
        Ok(op) => op,
        Err(byte) => {
            let _ = write!(out, "Unknown opcode {}", byte);
            return (out, offset + 1);
        }
    };

    let next = offset + op.width();
    if next > chunk.code.len() {
        let _ = write!(out, "{} <truncated>", op.name());
        return (out, chunk.code.len());
    }

    match op {
        OpCode::OpConstant | OpCode::OpConstantLong => {
            let index = chunk.read_constant_index(op, offset);
            let _ = write!(out, "{:<16} {:4} ", op.name(), index);
            match chunk.constants.get(index) {
                Some(value) => {
                    let _ = write!(out, "'{}'", value.display(heap));
                }
                None => out.push_str("<missing>"),
            }
        }
        _ => out.push_str(op.name()),
    }
    (out, next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use crate::vm::compiler::compile;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compiled_expression_listing() {
        let mut chunk = Chunk::new();
        let mut heap = Heap::new();
        compile("1 + 2 *\n\"x\"", &mut chunk, &mut heap).unwrap();

        let listing = disassemble_chunk(&chunk, &heap, "code");
        let expected = "\
== code ==
0000    1 OP_CONSTANT         0 '1'
0002    | OP_CONSTANT         1 '2'
0004    2 OP_CONSTANT         2 'x'
0006    | OP_MULTIPLY
0007    | OP_ADD
0008    | OP_RETURN
";
        assert_eq!(listing, expected);
    }

    #[test]
    fn test_long_constant_decodes_like_the_vm() {
        let mut chunk = Chunk::new();
        let heap = Heap::new();
        for i in 0..300 {
            chunk.add_constant(Value::Number(i as f64));
        }
        chunk.write_opcode(OpCode::OpConstantLong, 3);
        chunk.write(0x00, 3);
        chunk.write(0x01, 3);
        chunk.write(0x2b, 3);
        chunk.write_opcode(OpCode::OpReturn, 4);

        let (text, next) = disassemble_instruction(&chunk, &heap, 0);
        assert_eq!(text, "0000    3 OP_CONSTANT_LONG  299 '299'");
        assert_eq!(next, 4);
        let (text, next) = disassemble_instruction(&chunk, &heap, 4);
        assert_eq!(text, "0004    4 OP_RETURN");
        assert_eq!(next, 5);
    }

    #[test]
    fn test_unknown_and_truncated_bytes() {
        let mut chunk = Chunk::new();
        let heap = Heap::new();
        chunk.write(0xee, 1);
        chunk.write_opcode(OpCode::OpConstant, 1);

        let listing = disassemble_chunk(&chunk, &heap, "bad");
        assert_eq!(
            listing,
            "== bad ==\n0000    1 Unknown opcode 238\n0001    | OP_CONSTANT <truncated>\n"
        );
    }
}
