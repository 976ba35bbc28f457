// src/vm/opcode.rs

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    // --- Constants and Literals ---
    /// Pushes a constant from the chunk's constant pool onto the stack.
    /// The operand is a single byte representing the index in the pool.
    OpConstant,
    /// Like `OpConstant`, with a 24-bit big-endian index for pools past 256 entries.
    OpConstantLong,

    OpNil,
    OpTrue,
    OpFalse,

    // --- Comparison ---
    OpEqual,
    OpNotEqual,
    OpGreater,
    OpGreaterEqual,
    OpLess,
    OpLessEqual,

    // --- Binary Operations ---
    /// Adds two numbers or concatenates two strings.
    OpAdd,
    OpSubtract,
    OpMultiply,
    OpDivide,

    // --- Unary Operations ---
    /// Pushes the negated truthiness of the top value.
    OpNot,
    OpNegate,

    // --- Control Flow ---
    /// Pops the top value and finishes execution with it.
    OpReturn,
}

const OPCODES: [OpCode; 18] = [
    OpCode::OpConstant,
    OpCode::OpConstantLong,
    OpCode::OpNil,
    OpCode::OpTrue,
    OpCode::OpFalse,
    OpCode::OpEqual,
    OpCode::OpNotEqual,
    OpCode::OpGreater,
    OpCode::OpGreaterEqual,
    OpCode::OpLess,
    OpCode::OpLessEqual,
    OpCode::OpAdd,
    OpCode::OpSubtract,
    OpCode::OpMultiply,
    OpCode::OpDivide,
    OpCode::OpNot,
    OpCode::OpNegate,
    OpCode::OpReturn,
];

impl OpCode {
    /// Instruction width in bytes, opcode included. Both the VM and the
    /// disassembler step through code with this.
    pub fn width(self) -> usize {
        match self {
            OpCode::OpConstant => 2,
            OpCode::OpConstantLong => 4,
            _ => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OpCode::OpConstant => "OP_CONSTANT",
            OpCode::OpConstantLong => "OP_CONSTANT_LONG",
            OpCode::OpNil => "OP_NIL",
            OpCode::OpTrue => "OP_TRUE",
            OpCode::OpFalse => "OP_FALSE",
            OpCode::OpEqual => "OP_EQUAL",
            OpCode::OpNotEqual => "OP_NOT_EQUAL",
            OpCode::OpGreater => "OP_GREATER",
            OpCode::OpGreaterEqual => "OP_GREATER_EQUAL",
            OpCode::OpLess => "OP_LESS",
            OpCode::OpLessEqual => "OP_LESS_EQUAL",
            OpCode::OpAdd => "OP_ADD",
            OpCode::OpSubtract => "OP_SUBTRACT",
            OpCode::OpMultiply => "OP_MULTIPLY",
            OpCode::OpDivide => "OP_DIVIDE",
            OpCode::OpNot => "OP_NOT",
            OpCode::OpNegate => "OP_NEGATE",
            OpCode::OpReturn => "OP_RETURN",
        }
    }
}

// Bytes that don't name an opcode are handed back unchanged.
impl TryFrom<u8> for OpCode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        OPCODES.get(byte as usize).copied().ok_or(byte)
    }
}
