// src/lib.rs

// --- Module Declarations ---
pub mod error;
pub mod memory;
pub mod scanner;
pub mod table;
pub mod value;
pub mod vm;

// --- Public API Re-exports ---
// This makes the core components available to users of the library
// without them needing to know the internal file structure.
pub use error::{ChunkError, CompileError, Diagnostic, InterpretError, RuntimeError};
pub use memory::{Heap, ObjRef};
pub use table::Table;
pub use value::{values_equal, Value};
pub use vm::{compile, Chunk, VmState, VM};
