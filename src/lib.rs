//! Lispy - evaluation core of a small Lisp with Q-expressions
//!
//! This crate provides a tree-walking evaluator for a dynamically typed Lisp dialect
//! built around two kinds of compound forms: S-expressions, which are evaluated, and
//! Q-expressions, which are quoted lists left untouched until something asks for them.
//!
//! ```text
//! (+ 1 2 3)                        ; arithmetic
//! (head {1 2 3})                   ; list operations on Q-expressions
//! (def {add} (\ {x y} {+ x y}))    ; global definitions and lambdas
//! (add 1)                          ; partial application yields (\ {y} {+ x y})
//! (def {pack} (\ {f & xs} {f xs})) ; variadic formals
//! ```
//!
//! ## Errors are values
//!
//! Nothing the language does at runtime aborts the process (except `exit`). Every failure
//! becomes a [`ast::Value::Error`] that flows through evaluation like any other value: a
//! compound form short-circuits on the first child that evaluated to an error, builtins
//! validate their arguments and answer with an error value when the shape is wrong, and
//! `load` prints the error of a broken form and carries on with the next one.
//!
//! Inside the crate builtins are ordinary Rust functions returning `Result<Value, Error>`;
//! the evaluator turns an `Err` into an error value at the call boundary.
//!
//! ## Modules
//!
//! - `ast`: the value model and its canonical textual form
//! - `parser`: text to the generic tagged node tree (nom based)
//! - `reader`: node tree to values
//! - `evaluator`: environments, evaluation and function application
//! - `builtinops`: the builtin registry and implementations

use crate::builtinops::Arity;

/// Maximum parsing depth to prevent stack overflow attacks
/// This limits deeply nested S-expressions and Q-expressions in the parser
pub const MAX_PARSE_DEPTH: usize = 64;

/// Maximum nesting of S-expression evaluations.
/// Every evaluated S-expression counts, whether reached through a lambda body, `eval` or `if`;
/// programs that go deeper get an error value instead of overflowing the stack.
pub const MAX_EVAL_DEPTH: usize = 10_000;

/// Stack size of the threads that evaluate programs, sized for [`MAX_EVAL_DEPTH`]
pub const EVAL_STACK_SIZE: usize = 256 * 1024 * 1024;

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParseErrorKind {
    /// Invalid or unexpected syntax (bad tokens, stray closing brackets)
    InvalidSyntax,
    /// Input ended before the expression was complete (unterminated string, unclosed brackets)
    Incomplete,
    /// Expression nesting exceeded the configured maximum parse depth
    TooDeeplyNested,
    /// Extra input found after the last complete expression
    TrailingContent,
}

/// A structured error providing detailed information about a parsing failure.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
#[error("{message}{}{}", optional(" (found ", .found, ")"), optional(" near: ", .context, ""))]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// Context snippet from the input showing where the error occurred (max 100 chars)
    pub context: Option<String>,
    /// The problematic character encountered, if identifiable
    pub found: Option<String>,
}

impl ParseError {
    /// Create a ParseError with all fields
    pub fn new(
        kind: ParseErrorKind,
        message: impl Into<String>,
        context: Option<String>,
        found: Option<String>,
    ) -> Self {
        ParseError {
            kind,
            message: message.into(),
            context,
            found,
        }
    }

    /// Create a ParseError with context extracted from input at a given offset
    pub fn with_context(
        kind: ParseErrorKind,
        message: impl Into<String>,
        input: &str,
        error_offset: usize,
    ) -> Self {
        Self::with_context_and_found(kind, message, input, error_offset, None)
    }

    /// Create a ParseError with context and found token
    pub fn with_context_and_found(
        kind: ParseErrorKind,
        message: impl Into<String>,
        input: &str,
        error_offset: usize,
        found: Option<String>,
    ) -> Self {
        const MAX_CONTEXT: usize = 100;

        let context_start = error_offset.saturating_sub(20);

        let context_str: String = input
            .chars()
            .skip(context_start)
            .take(MAX_CONTEXT)
            .collect();

        let mut display_context = String::new();
        if context_start > 0 {
            display_context.push_str("[...]");
        }
        display_context.push_str(&context_str);
        if context_start + context_str.chars().count() < input.chars().count() {
            display_context.push_str("[...]");
        }

        // Replace newlines with visible markers for better error display
        let display_context = display_context.replace('\n', "\\n").replace('\r', "");

        Self::new(kind, message, Some(display_context), found)
    }
}

/// An optional part of a parse error message, framed by `open` and `close` when present
fn optional(open: &str, part: &Option<String>, close: &str) -> String {
    part.as_ref()
        .map(|text| format!("{open}{text}{close}"))
        .unwrap_or_default()
}

/// Every way an operation of the language can fail.
///
/// The `Display` form is the message carried by an error value, so `Error: <message>`
/// is exactly what the REPL prints.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Unbound symbol: {0}")]
    UnboundSymbol(String),

    #[error("{name}: expected {expected} arguments, got {got}")]
    ArityMismatch {
        name: &'static str,
        expected: Arity,
        got: usize,
    },

    #[error("{name}: expected {expected}, got {found} at position {position}")]
    TypeMismatch {
        name: &'static str,
        expected: &'static str,
        found: &'static str,
        position: usize,
    },

    #[error("{0}: empty list")]
    EmptyList(&'static str),

    #[error("division by zero")]
    DivisionByZero,

    #[error("{0}: integer overflow")]
    IntegerOverflow(&'static str),

    #[error("expression does not start with a function")]
    NotCallable,

    #[error("too many arguments: got {given}, expected {total}")]
    TooManyArguments { given: usize, total: usize },

    #[error("invalid variadic formal")]
    InvalidVariadicFormal,

    #[error("{name}: cannot bind {symbols} symbols to {values} values")]
    BindingMismatch {
        name: &'static str,
        symbols: usize,
        values: usize,
    },

    #[error("invalid number")]
    InvalidNumber,

    #[error("maximum evaluation depth exceeded (max: {0})")]
    DepthLimitExceeded(usize),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("could not load library {path}: {reason}")]
    Load { path: String, reason: String },
}

pub mod ast;
pub mod builtinops;
pub mod evaluator;
pub mod parser;
pub mod reader;

pub use ast::{Lambda, Value};
pub use evaluator::{Environment, create_global_env, eval, load_library};
pub use parser::{Node, ParseConfig, parse_program};
pub use reader::{read, read_forms, read_program};
