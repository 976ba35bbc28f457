// src/vm/chunk.rs

use crate::error::ChunkError;
use crate::memory::grow_capacity;
use crate::value::Value;
use crate::vm::lines::LineTable;
use crate::vm::opcode::OpCode;

/// Largest constant index the long form can address.
pub const MAX_CONSTANTS: usize = 1 << 24;

// A chunk of bytecode representing a compiled expression.
#[derive(Debug, Default, Clone)]
pub struct Chunk {
    // The sequence of bytecode instructions.
    pub code: Vec<u8>,
    // The pool of constant values used by the code. Never deduplicated.
    pub constants: Vec<Value>,
    // Source line of every byte in `code`, run-length encoded.
    pub lines: LineTable,
}

impl Chunk {
    // Creates a new, empty chunk.
    pub fn new() -> Self {
        Self::default()
    }

    // Appends a byte to the chunk, which can be an OpCode or an operand.
    // Associates the byte with a given source line number for error reporting.
    pub fn write(&mut self, byte: u8, line: usize) {
        if self.code.len() == self.code.capacity() {
            let capacity = grow_capacity(self.code.capacity());
            self.code.reserve_exact(capacity - self.code.len());
        }
        self.code.push(byte);
        self.lines.append(line);
    }

    // A convenience method to write an OpCode.
    pub fn write_opcode(&mut self, op: OpCode, line: usize) {
        self.write(op as u8, line);
    }

    // Adds a constant value to the chunk's constant pool.
    // Returns the index of that constant in the pool.
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Adds `value` to the pool and emits the instruction that loads it, picking the
    /// short form for indices that fit in a byte and the long form otherwise.
    pub fn write_constant(&mut self, value: Value, line: usize) -> Result<usize, ChunkError> {
        if self.constants.len() >= MAX_CONSTANTS {
            return Err(ChunkError::TooManyConstants);
        }
        let index = self.add_constant(value);
        if let Ok(short) = u8::try_from(index) {
            self.write_opcode(OpCode::OpConstant, line);
            self.write(short, line);
        } else {
            self.write_opcode(OpCode::OpConstantLong, line);
            self.write((index >> 16) as u8, line);
            self.write((index >> 8) as u8, line);
            self.write(index as u8, line);
        }
        Ok(index)
    }

    /// Decodes the constant-pool index operand of the load instruction at `offset`.
    pub fn read_constant_index(&self, op: OpCode, offset: usize) -> usize {
        match op {
            OpCode::OpConstantLong => {
                let b2 = self.code[offset + 1] as usize;
                let b1 = self.code[offset + 2] as usize;
                let b0 = self.code[offset + 3] as usize;
                b2 << 16 | b1 << 8 | b0
            }
            _ => self.code[offset + 1] as usize,
        }
    }

    /// The source line of the byte at `offset`.
    pub fn line(&self, offset: usize) -> usize {
        self.lines.lookup(offset).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::opcode::OpCode;

    #[test]
    fn test_write_and_add_constant() {
        let mut chunk = Chunk::new();

        // Add a constant and write the instruction to load it
        let const_idx = chunk.add_constant(Value::Number(1.23));
        chunk.write_opcode(OpCode::OpConstant, 1);
        chunk.write(const_idx as u8, 1);

        // Add another instruction
        chunk.write_opcode(OpCode::OpNegate, 2);

        // Verify the contents
        assert_eq!(chunk.code, vec![OpCode::OpConstant as u8, 0, OpCode::OpNegate as u8]);
        assert_eq!(chunk.constants, vec![Value::Number(1.23)]);
        assert_eq!(chunk.line(0), 1);
        assert_eq!(chunk.line(1), 1);
        assert_eq!(chunk.line(2), 2);
        assert_eq!(chunk.lines.total(), chunk.code.len());
    }

    #[test]
    fn test_code_buffer_grows_by_doubling() {
        let mut chunk = Chunk::new();
        chunk.write(0, 1);
        assert_eq!(chunk.code.capacity(), 8);
        for _ in 0..8 {
            chunk.write(0, 1);
        }
        assert_eq!(chunk.code.capacity(), 16);
    }

    #[test]
    fn test_short_form_for_small_indices() {
        let mut chunk = Chunk::new();
        for i in 0..256 {
            assert_eq!(chunk.write_constant(Value::Number(i as f64), 1), Ok(i));
        }
        assert_eq!(chunk.code.len(), 512);
        assert_eq!(chunk.code[510], OpCode::OpConstant as u8);
        assert_eq!(chunk.read_constant_index(OpCode::OpConstant, 510), 255);
    }

    #[test]
    fn test_long_form_past_one_byte() {
        let mut chunk = Chunk::new();
        for i in 0..256 {
            chunk.add_constant(Value::Number(i as f64));
        }
        let index = chunk.write_constant(Value::Bool(true), 7).unwrap();
        assert_eq!(index, 256);
        assert_eq!(chunk.code, vec![OpCode::OpConstantLong as u8, 0x00, 0x01, 0x00]);
        assert_eq!(chunk.read_constant_index(OpCode::OpConstantLong, 0), 256);
        assert_eq!(chunk.line(3), 7);
    }

    #[test]
    fn test_long_form_byte_order() {
        let mut chunk = Chunk::new();
        chunk.constants.resize(0x01_02_03, Value::Nil);
        let index = chunk.write_constant(Value::Number(9.0), 1).unwrap();
        assert_eq!(index, 0x01_02_03);
        assert_eq!(&chunk.code[1..], &[0x01, 0x02, 0x03]);
        assert_eq!(chunk.read_constant_index(OpCode::OpConstantLong, 0), index);
    }

    #[test]
    fn test_constant_pool_overflow() {
        let mut chunk = Chunk::new();
        chunk.constants.resize(MAX_CONSTANTS, Value::Nil);
        assert_eq!(
            chunk.write_constant(Value::Nil, 1),
            Err(ChunkError::TooManyConstants)
        );
        assert!(chunk.code.is_empty());
    }
}
