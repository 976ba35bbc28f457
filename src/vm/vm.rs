// src/vm/vm.rs

use log::Level;
use paste::paste;

use crate::error::{InterpretError, RuntimeError};
use crate::memory::Heap;
use crate::value::{values_equal, Value};
use crate::vm::chunk::Chunk;
use crate::vm::compiler::compile;
use crate::vm::disassembler::{disassemble_chunk, disassemble_instruction};
use crate::vm::opcode::OpCode;

/// Number of value slots on the VM stack.
pub const STACK_MAX: usize = 256;

/// Where the VM is in its compile/run cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    /// Nothing interpreted yet.
    Idle,
    Running,
    HaltedOk,
    HaltedCompileError,
    HaltedRuntimeError,
}

/// The Virtual Machine struct.
///
/// Owns the value stack and the heap. Objects created by any interpret call stay alive
/// until the VM is dropped.
pub struct VM {
    ip: usize, // Instruction Pointer
    stack: Vec<Value>,
    heap: Heap,
    state: VmState,
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}

// Generates the handlers for operators that only accept two numbers.
macro_rules! numeric_binary_ops {
    ($(($name:ident, $op:tt, $wrap:path)),* $(,)?) => {
        paste! {
            impl VM {
                $(
                    fn [<op_ $name>](&mut self, chunk: &Chunk) -> Result<(), InterpretError> {
                        let (a, b) = self.pop_numbers(chunk)?;
                        self.push(chunk, $wrap(a $op b))
                    }
                )*
            }
        }
    };
}

numeric_binary_ops! {
    (subtract, -, Value::Number),
    (multiply, *, Value::Number),
    (divide, /, Value::Number),
    (greater, >, Value::Bool),
    (greater_equal, >=, Value::Bool),
    (less, <, Value::Bool),
    (less_equal, <=, Value::Bool),
}

impl VM {
    pub fn new() -> Self {
        VM {
            ip: 0,
            stack: Vec::with_capacity(STACK_MAX),
            heap: Heap::new(),
            state: VmState::Idle,
        }
    }

    pub fn state(&self) -> VmState {
        self.state
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Compiles `source` into a fresh chunk and runs it.
    pub fn interpret(&mut self, source: &str) -> Result<Value, InterpretError> {
        self.interpret_with(source, |_, _| {})
    }

    /// Like [`VM::interpret`], but hands the compiled chunk to `inspect` before running it.
    /// `inspect` is not called when compilation fails.
    pub fn interpret_with<F>(&mut self, source: &str, inspect: F) -> Result<Value, InterpretError>
    where
        F: FnOnce(&Chunk, &Heap),
    {
        self.reset_stack();
        let mut chunk = Chunk::new();
        if let Err(e) = compile(source, &mut chunk, &mut self.heap) {
            // The partial chunk is dropped here, never run.
            self.state = VmState::HaltedCompileError;
            return Err(e.into());
        }
        if log::log_enabled!(Level::Debug) {
            log::debug!("\n{}", disassemble_chunk(&chunk, &self.heap, "code"));
        }
        inspect(&chunk, &self.heap);
        self.run_chunk(&chunk)
    }

    /// Executes an already compiled chunk from its first byte.
    pub fn run_chunk(&mut self, chunk: &Chunk) -> Result<Value, InterpretError> {
        self.reset_stack();
        self.ip = 0;
        self.state = VmState::Running;

        let result = self.run(chunk);
        match &result {
            Ok(_) => self.state = VmState::HaltedOk,
            Err(e) => {
                log::debug!("execution halted: {}", e);
                self.reset_stack();
                self.state = VmState::HaltedRuntimeError;
            }
        }
        result
    }

    /// The main execution loop.
    fn run(&mut self, chunk: &Chunk) -> Result<Value, InterpretError> {
        loop {
            if log::log_enabled!(Level::Trace) {
                self.trace(chunk);
            }

            // Read the instruction at the current pointer
            let offset = self.ip;
            let byte = *chunk.code.get(offset).ok_or(InterpretError::UnexpectedEnd(offset))?;
            let op = OpCode::try_from(byte)
                .map_err(|byte| InterpretError::InvalidOpcode { byte, offset })?;
            if offset + op.width() > chunk.code.len() {
                return Err(InterpretError::UnexpectedEnd(chunk.code.len()));
            }
            self.ip = offset + op.width();

            match op {
                OpCode::OpConstant | OpCode::OpConstantLong => {
                    let index = chunk.read_constant_index(op, offset);
                    let constant = *chunk
                        .constants
                        .get(index)
                        .ok_or(InterpretError::InvalidConstant { index, offset })?;
                    self.push(chunk, constant)?;
                }
                OpCode::OpNil => self.push(chunk, Value::Nil)?,
                OpCode::OpTrue => self.push(chunk, Value::Bool(true))?,
                OpCode::OpFalse => self.push(chunk, Value::Bool(false))?,
                OpCode::OpEqual | OpCode::OpNotEqual => {
                    let b = self.pop_stack()?;
                    let a = self.pop_stack()?;
                    let equal = values_equal(a, b, &self.heap);
                    self.push(chunk, Value::Bool(equal == (op == OpCode::OpEqual)))?;
                }
                OpCode::OpGreater => self.op_greater(chunk)?,
                OpCode::OpGreaterEqual => self.op_greater_equal(chunk)?,
                OpCode::OpLess => self.op_less(chunk)?,
                OpCode::OpLessEqual => self.op_less_equal(chunk)?,
                OpCode::OpAdd => self.op_add(chunk)?,
                OpCode::OpSubtract => self.op_subtract(chunk)?,
                OpCode::OpMultiply => self.op_multiply(chunk)?,
                OpCode::OpDivide => self.op_divide(chunk)?,
                OpCode::OpNot => {
                    let value = self.pop_stack()?;
                    self.push(chunk, Value::Bool(value.is_falsey()))?;
                }
                OpCode::OpNegate => {
                    let Some(n) = self.pop_stack()?.as_number() else {
                        return Err(self.runtime_error(chunk, "operand must be a number"));
                    };
                    self.push(chunk, Value::Number(-n))?;
                }
                OpCode::OpReturn => {
                    // The final result of the expression is on top of the stack.
                    return self.pop_stack();
                }
            }
        }
    }

    fn op_add(&mut self, chunk: &Chunk) -> Result<(), InterpretError> {
        // Note: Order matters. The right-hand operand is pushed last, so it's popped first.
        let b = self.pop_stack()?;
        let a = self.pop_stack()?;
        let result = match (a, b) {
            (Value::Number(x), Value::Number(y)) => Value::Number(x + y),
            _ => match (a.as_string(&self.heap), b.as_string(&self.heap)) {
                (Some(x), Some(y)) => Value::Obj(self.heap.concatenate(x, y)),
                _ => {
                    return Err(
                        self.runtime_error(chunk, "operands must be two numbers or two strings")
                    )
                }
            },
        };
        self.push(chunk, result)
    }

    fn pop_numbers(&mut self, chunk: &Chunk) -> Result<(f64, f64), InterpretError> {
        let b = self.pop_stack()?;
        let a = self.pop_stack()?;
        match (a, b) {
            (Value::Number(a), Value::Number(b)) => Ok((a, b)),
            _ => Err(self.runtime_error(chunk, "operands must be numbers")),
        }
    }

    // --- Stack helpers ---

    fn push(&mut self, chunk: &Chunk, value: Value) -> Result<(), InterpretError> {
        if self.stack.len() >= STACK_MAX {
            return Err(self.runtime_error(chunk, "stack overflow"));
        }
        self.stack.push(value);
        Ok(())
    }

    // Helper to pop from the stack, returning an error on underflow.
    fn pop_stack(&mut self) -> Result<Value, InterpretError> {
        self.stack.pop().ok_or(InterpretError::StackUnderflow)
    }

    fn reset_stack(&mut self) {
        self.stack.clear();
    }

    /// Builds a runtime error located at the byte just consumed.
    fn runtime_error(&mut self, chunk: &Chunk, message: &str) -> InterpretError {
        let line = chunk.line(self.ip.saturating_sub(1));
        self.reset_stack();
        RuntimeError { message: message.to_string(), line }.into()
    }

    fn trace(&self, chunk: &Chunk) {
        let stack: Vec<String> = self
            .stack
            .iter()
            .map(|value| format!("[ {} ]", value.display(&self.heap)))
            .collect();
        log::trace!("          {}", stack.concat());
        if self.ip < chunk.code.len() {
            let (text, _) = disassemble_instruction(chunk, &self.heap, self.ip);
            log::trace!("{}", text);
        }
    }
}
