// src/error.rs

use std::fmt;
use thiserror::Error;

/// Errors raised while writing bytecode into a chunk.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("Too many constants in one chunk.")]
    TooManyConstants,
}

/// Where in the source a diagnostic points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorLocation {
    /// The offending token's lexeme.
    Lexeme(String),
    /// The token was end-of-input.
    End,
    /// The scanner already produced the message; no lexeme to show.
    None,
}

/// A single compile-time report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub location: ErrorLocation,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error", self.line)?;
        match &self.location {
            ErrorLocation::Lexeme(lexeme) => write!(f, " at '{}'", lexeme)?,
            ErrorLocation::End => write!(f, " at end")?,
            ErrorLocation::None => {}
        }
        write!(f, ": {}", self.message)
    }
}

/// Compilation failed; holds every diagnostic recorded before the verdict.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct CompileError {
    pub diagnostics: Vec<Diagnostic>,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}

/// A type mismatch (or other fatal condition) hit while executing a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}\n[line {line}] in script")]
pub struct RuntimeError {
    pub message: String,
    pub line: usize,
}

#[derive(Debug, Error, PartialEq)]
pub enum InterpretError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("unknown opcode {byte} at offset {offset}")]
    InvalidOpcode { byte: u8, offset: usize },
    #[error("constant index {index} out of range at offset {offset}")]
    InvalidConstant { index: usize, offset: usize },
    #[error("ran past the end of the chunk at offset {0}")]
    UnexpectedEnd(usize),
    #[error("stack underflow")]
    StackUnderflow,
}

impl InterpretError {
    /// Process exit code the command-line front end reports for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            InterpretError::Compile(_) => 65,
            _ => 70,
        }
    }
}
