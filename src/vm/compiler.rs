// src/vm/compiler.rs

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::error::{CompileError, Diagnostic, ErrorLocation};
use crate::memory::Heap;
use crate::scanner::{Scanner, Token, TokenKind};
use crate::value::Value;
use crate::vm::chunk::Chunk;
use crate::vm::opcode::OpCode;

/// Deepest chain of nested prefix operators and groupings the parser accepts.
pub const MAX_NESTING: usize = 1024;

/// Binding power of an operator, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // . ()
    Primary,
}

impl Precedence {
    /// The next tighter level; binary operands parse at this to stay left-associative.
    fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

/// Which parse routine a rule dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseFn {
    Grouping,
    Unary,
    Binary,
    Number,
    String,
    Literal,
}

#[derive(Debug, Clone, Copy)]
struct ParseRule {
    prefix: Option<ParseFn>,
    infix: Option<ParseFn>,
    precedence: Precedence,
}

impl ParseRule {
    const NONE: ParseRule = ParseRule { prefix: None, infix: None, precedence: Precedence::None };
}

lazy_static! {
    // Token kinds missing from this table have no prefix or infix role.
    static ref RULES: HashMap<TokenKind, ParseRule> = {
        use ParseFn as F;
        use Precedence as P;
        let rule = |prefix, infix, precedence| ParseRule { prefix, infix, precedence };
        HashMap::from([
            (TokenKind::LeftParen, rule(Some(F::Grouping), None, P::None)),
            (TokenKind::Minus, rule(Some(F::Unary), Some(F::Binary), P::Term)),
            (TokenKind::Plus, rule(None, Some(F::Binary), P::Term)),
            (TokenKind::Slash, rule(None, Some(F::Binary), P::Factor)),
            (TokenKind::Star, rule(None, Some(F::Binary), P::Factor)),
            (TokenKind::Bang, rule(Some(F::Unary), None, P::None)),
            (TokenKind::BangEqual, rule(None, Some(F::Binary), P::Equality)),
            (TokenKind::EqualEqual, rule(None, Some(F::Binary), P::Equality)),
            (TokenKind::Greater, rule(None, Some(F::Binary), P::Comparison)),
            (TokenKind::GreaterEqual, rule(None, Some(F::Binary), P::Comparison)),
            (TokenKind::Less, rule(None, Some(F::Binary), P::Comparison)),
            (TokenKind::LessEqual, rule(None, Some(F::Binary), P::Comparison)),
            (TokenKind::String, rule(Some(F::String), None, P::None)),
            (TokenKind::Number, rule(Some(F::Number), None, P::None)),
            (TokenKind::False, rule(Some(F::Literal), None, P::None)),
            (TokenKind::True, rule(Some(F::Literal), None, P::None)),
            (TokenKind::Nil, rule(Some(F::Literal), None, P::None)),
        ])
    };
}

fn get_rule(kind: TokenKind) -> ParseRule {
    RULES.get(&kind).copied().unwrap_or(ParseRule::NONE)
}

/// The main entry point for compilation.
///
/// Parses a single expression from `source` and writes its bytecode into `chunk`, followed
/// by a return. String literals are allocated in `heap`. On error the chunk is left
/// half-written and must not be executed.
pub fn compile(source: &str, chunk: &mut Chunk, heap: &mut Heap) -> Result<(), CompileError> {
    let mut compiler = Compiler::new(source, chunk, heap);
    compiler.advance();
    compiler.expression();
    compiler.consume(TokenKind::Eof, "Expect end of expression.");
    compiler.emit_return();

    if compiler.diagnostics.is_empty() {
        log::debug!(
            "compiled {} bytes, {} constants",
            compiler.chunk.code.len(),
            compiler.chunk.constants.len()
        );
        Ok(())
    } else {
        Err(CompileError { diagnostics: compiler.diagnostics })
    }
}

/// Single-pass parser: every handler emits bytecode as soon as it has parsed its operands.
struct Compiler<'src, 'c> {
    scanner: Scanner<'src>,
    current: Token<'src>,
    previous: Token<'src>,
    panic_mode: bool,
    depth: usize,
    diagnostics: Vec<Diagnostic>,
    chunk: &'c mut Chunk,
    heap: &'c mut Heap,
}

impl<'src, 'c> Compiler<'src, 'c> {
    fn new(source: &'src str, chunk: &'c mut Chunk, heap: &'c mut Heap) -> Self {
        Compiler {
            scanner: Scanner::new(source),
            current: Token::synthetic(""),
            previous: Token::synthetic(""),
            panic_mode: false,
            depth: 0,
            diagnostics: Vec::new(),
            chunk,
            heap,
        }
    }

    // --- Token stream ---

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            let message = self.current.lexeme;
            self.error_at_current(message);
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    // --- Expressions ---

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        if self.depth >= MAX_NESTING {
            self.error_at_current("Expression nesting too deep.");
            return;
        }
        self.depth += 1;
        self.parse_operand_and_operators(precedence);
        self.depth -= 1;
    }

    fn parse_operand_and_operators(&mut self, precedence: Precedence) {
        self.advance();
        let Some(prefix) = get_rule(self.previous.kind).prefix else {
            self.error_at_previous("Expect expression.");
            return;
        };
        self.dispatch(prefix);

        while precedence <= get_rule(self.current.kind).precedence {
            self.advance();
            if let Some(infix) = get_rule(self.previous.kind).infix {
                self.dispatch(infix);
            }
        }
    }

    fn dispatch(&mut self, handler: ParseFn) {
        match handler {
            ParseFn::Grouping => self.grouping(),
            ParseFn::Unary => self.unary(),
            ParseFn::Binary => self.binary(),
            ParseFn::Number => self.number(),
            ParseFn::String => self.string(),
            ParseFn::Literal => self.literal(),
        }
    }

    fn grouping(&mut self) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    fn unary(&mut self) {
        let operator = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenKind::Minus => self.emit_opcode(OpCode::OpNegate),
            TokenKind::Bang => self.emit_opcode(OpCode::OpNot),
            _ => unreachable!("unary rule on {:?}", operator),
        }
    }

    fn binary(&mut self) {
        let operator = self.previous.kind;
        self.parse_precedence(get_rule(operator).precedence.next());
        let op = match operator {
            TokenKind::Plus => OpCode::OpAdd,
            TokenKind::Minus => OpCode::OpSubtract,
            TokenKind::Star => OpCode::OpMultiply,
            TokenKind::Slash => OpCode::OpDivide,
            TokenKind::EqualEqual => OpCode::OpEqual,
            TokenKind::BangEqual => OpCode::OpNotEqual,
            TokenKind::Greater => OpCode::OpGreater,
            TokenKind::GreaterEqual => OpCode::OpGreaterEqual,
            TokenKind::Less => OpCode::OpLess,
            TokenKind::LessEqual => OpCode::OpLessEqual,
            _ => unreachable!("binary rule on {:?}", operator),
        };
        self.emit_opcode(op);
    }

    fn number(&mut self) {
        match self.previous.lexeme.parse::<f64>() {
            Ok(n) => self.emit_constant(Value::Number(n)),
            Err(_) => self.error_at_previous("Invalid number literal."),
        }
    }

    fn string(&mut self) {
        let lexeme = self.previous.lexeme;
        let interior = &lexeme[1..lexeme.len() - 1];
        let obj = self.heap.copy_string(interior);
        self.emit_constant(Value::Obj(obj));
    }

    fn literal(&mut self) {
        match self.previous.kind {
            TokenKind::False => self.emit_opcode(OpCode::OpFalse),
            TokenKind::True => self.emit_opcode(OpCode::OpTrue),
            TokenKind::Nil => self.emit_opcode(OpCode::OpNil),
            kind => unreachable!("literal rule on {:?}", kind),
        }
    }

    // --- Bytecode Emitter Helpers ---

    fn emit_opcode(&mut self, op: OpCode) {
        self.chunk.write_opcode(op, self.previous.line);
    }

    fn emit_return(&mut self) {
        // The result is already on top of the stack.
        self.emit_opcode(OpCode::OpReturn);
    }

    fn emit_constant(&mut self, value: Value) {
        if let Err(e) = self.chunk.write_constant(value, self.previous.line) {
            self.error_at_previous(&e.to_string());
        }
    }

    // --- Error reporting ---

    fn error_at_current(&mut self, message: &str) {
        let token = self.current;
        self.error_at(token, message);
    }

    fn error_at_previous(&mut self, message: &str) {
        let token = self.previous;
        self.error_at(token, message);
    }

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;

        let location = match token.kind {
            TokenKind::Eof => ErrorLocation::End,
            TokenKind::Error => ErrorLocation::None,
            _ => ErrorLocation::Lexeme(token.lexeme.to_string()),
        };
        let diagnostic = Diagnostic { line: token.line, location, message: message.to_string() };
        log::debug!("compile error: {}", diagnostic);
        self.diagnostics.push(diagnostic);
    }
}
