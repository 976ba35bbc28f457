// src/vm/mod.rs

// Declare the modules within the `vm` module.
pub mod chunk;
pub mod compiler;
pub mod disassembler;
pub mod lines;
pub mod opcode;
pub mod vm;

// Re-export the key structures and functions.
pub use chunk::Chunk;
pub use compiler::compile;
pub use disassembler::{disassemble_chunk, disassemble_instruction};
pub use lines::LineTable;
pub use opcode::OpCode;
pub use vm::{VmState, VM};
