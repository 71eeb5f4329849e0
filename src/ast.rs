//! This module defines the value model of the interpreter. The main enum, [`Value`],
//! covers every runtime datum: numbers, symbols, strings, error values, S-expressions,
//! Q-expressions, builtin functions and user lambdas. Ergonomic helper functions such as
//! [`val`], [`sym`], [`sexpr`] and [`nil`] are provided for convenient construction in
//! both code and tests, together with conversion traits for common Rust types.
//!
//! Values own their children outright: cloning is a deep structural copy, dropping
//! releases the whole tree, and since every constructor either builds fresh leaves or
//! takes ownership of finished subtrees no cycle can ever be formed.
//!
//! `Display` is the canonical textual form. For function-free values it reads back
//! (through [`crate::reader`]) to an equal value.

use std::collections::VecDeque;
use std::fmt;

use crate::Error;
use crate::builtinops::Builtin;
use crate::evaluator::Environment;

/// Type alias for number values in interpreter
pub type NumberType = i64;

/// Formal that binds all remaining arguments, as a list, to the formal after it
pub(crate) const VARIADIC_MARKER: &str = "&";

/// Core value type of the interpreter
///
/// To build values, use the ergonomic helper functions:
/// - `val(42)` for numbers and strings, `sym("name")` for symbols, `nil()` for `{}`
/// - `val([1, 2, 3])` for homogeneous Q-expressions
/// - `sexpr(vec![sym("+"), val(1), val(2)])` for S-expressions
#[derive(Clone)]
pub enum Value {
    /// Numbers (fixed-width integers only)
    Number(NumberType),
    /// Symbols (identifiers, resolved through the environment)
    Symbol(String),
    /// String literals
    String(String),
    /// Error values produced by failing operations
    Error(Error),
    /// Evaluable compound form
    SExpr(Vec<Value>),
    /// Quoted list, inert to evaluation
    QExpr(Vec<Value>),
    /// Native operation
    Builtin(Builtin),
    /// User-defined function
    Lambda(Box<Lambda>),
}

/// A user-defined function with its own private environment.
///
/// The environment starts out empty when the lambda is built and collects one binding per
/// formal as arguments are supplied. A lambda that still has formals left after a call is
/// a partial application; it is returned as a fresh value carrying the bindings so far.
#[derive(Debug, Clone)]
pub struct Lambda {
    pub(crate) formals: VecDeque<String>,
    pub(crate) body: Vec<Value>,
    pub(crate) env: Environment,
}

impl Lambda {
    pub fn new(formals: Vec<String>, body: Vec<Value>) -> Self {
        Lambda {
            formals: formals.into(),
            body,
            env: Environment::new(),
        }
    }

    /// Formals that are still waiting for an argument
    pub fn formals(&self) -> impl Iterator<Item = &str> {
        self.formals.iter().map(String::as_str)
    }

    pub fn body(&self) -> &[Value] {
        &self.body
    }

    /// The lambda's private environment (bindings collected by partial application)
    pub fn env(&self) -> &Environment {
        &self.env
    }
}

// Lambdas compare by formals and body only; two independently built lambdas with the same
// text are equal even if their private environments differ.
impl PartialEq for Lambda {
    fn eq(&self, other: &Self) -> bool {
        self.formals == other.formals && self.body == other.body
    }
}

impl Value {
    /// Human-readable name of the variant, used in type mismatch messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "Number",
            Value::Symbol(_) => "Symbol",
            Value::String(_) => "String",
            Value::Error(_) => "Error",
            Value::SExpr(_) => "S-Expression",
            Value::QExpr(_) => "Q-Expression",
            Value::Builtin(_) => "Builtin",
            Value::Lambda(_) => "Function",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// The empty S-expression `()`, used as the "no value" result
    pub fn unit() -> Self {
        Value::SExpr(Vec::new())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Symbol(s) => write!(f, "Symbol({s})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Error(e) => write!(f, "Error({e})"),
            Value::SExpr(children) => {
                write!(f, "SExpr")?;
                f.debug_list().entries(children).finish()
            }
            Value::QExpr(children) => {
                write!(f, "QExpr")?;
                f.debug_list().entries(children).finish()
            }
            Value::Builtin(op) => write!(f, "Builtin({})", op.name()),
            Value::Lambda(lambda) => write!(
                f,
                "Lambda(formals={:?}, body={:?})",
                lambda.formals, lambda.body
            ),
        }
    }
}

// From trait implementations for Value - enables .into() conversion
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Number(NumberType::from(b))
    }
}

impl From<Error> for Value {
    fn from(e: Error) -> Self {
        Value::Error(e)
    }
}

impl From<Lambda> for Value {
    fn from(lambda: Lambda) -> Self {
        Value::Lambda(Box::new(lambda))
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Number(NumberType::from(n))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(NumberType);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::QExpr(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::QExpr(arr.into_iter().map(Into::into).collect())
    }
}

/// Helper function for creating symbols - works great in mixed lists!
pub fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

/// Helper function for creating Values from anything convertible
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper function for creating S-expressions from mixed children
pub fn sexpr(children: Vec<Value>) -> Value {
    Value::SExpr(children)
}

/// The empty Q-expression `{}`, the language's nil
pub fn nil() -> Value {
    Value::QExpr(Vec::new())
}

/// Write `s` as a double-quoted literal, escaping what the reader unescapes
fn write_escaped(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for ch in s.chars() {
        match ch {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            '\r' => write!(f, "\\r")?,
            '\0' => write!(f, "\\0")?,
            '\x07' => write!(f, "\\a")?,
            '\x08' => write!(f, "\\b")?,
            '\x0b' => write!(f, "\\v")?,
            '\x0c' => write!(f, "\\f")?,
            c => write!(f, "{c}")?,
        }
    }
    write!(f, "\"")
}

fn write_children<I>(
    f: &mut fmt::Formatter<'_>,
    open: char,
    children: I,
    close: char,
) -> fmt::Result
where
    I: IntoIterator,
    I::Item: fmt::Display,
{
    write!(f, "{open}")?;
    for (i, child) in children.into_iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{child}")?;
    }
    write!(f, "{close}")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::String(s) => write_escaped(f, s),
            Value::Error(e) => write!(f, "Error: {e}"),
            Value::SExpr(children) => write_children(f, '(', children, ')'),
            Value::QExpr(children) => write_children(f, '{', children, '}'),
            Value::Builtin(op) => write!(f, "<builtin:{}>", op.name()),
            Value::Lambda(lambda) => write!(f, "{lambda}"),
        }
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(\\ ")?;
        write_children(f, '{', &self.formals, '}')?;
        write!(f, " ")?;
        write_children(f, '{', &self.body, '}')?;
        write!(f, ")")
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::SExpr(a), Value::SExpr(b)) => a == b,
            (Value::QExpr(a), Value::QExpr(b)) => a == b,
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::Lambda(a), Value::Lambda(b)) => a == b,
            _ => false, // Different variants are never equal
        }
    }
}

#[cfg(test)]
mod helper_function_tests {
    use super::*;
    use crate::builtinops::ArithOp;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_helper_functions_data_driven() {
        let test_cases = vec![
            (val(42), Value::Number(42)),
            (val(-17), Value::Number(-17)),
            (val(4294967295u32), Value::Number(4294967295)),
            (val(-128i8), Value::Number(-128)),
            (val(NumberType::MAX), Value::Number(NumberType::MAX)),
            (val(true), Value::Number(1)),
            (val(false), Value::Number(0)),
            (val("hello"), Value::String("hello".to_owned())),
            (sym("foo-bar!"), Value::Symbol("foo-bar!".to_owned())),
            (sym(String::from("&")), Value::Symbol("&".to_owned())),
            (nil(), Value::QExpr(vec![])),
            (
                val([1, 2, 3]),
                Value::QExpr(vec![Value::Number(1), Value::Number(2), Value::Number(3)]),
            ),
            (
                sexpr(vec![sym("+"), val(1), val("x")]),
                Value::SExpr(vec![
                    Value::Symbol("+".to_owned()),
                    Value::Number(1),
                    Value::String("x".to_owned()),
                ]),
            ),
        ];

        for (i, (actual, expected)) in test_cases.iter().enumerate() {
            assert_eq!(actual, expected, "helper case {}", i + 1);
        }
    }

    #[test]
    fn test_display_canonical_forms() {
        let lambda = Lambda::new(
            vec!["x".into(), "y".into()],
            vec![sym("+"), sym("x"), sym("y")],
        );
        let cases = vec![
            (val(-5), "-5"),
            (sym("head"), "head"),
            (val("a \"quoted\"\nline\\"), r#""a \"quoted\"\nline\\""#),
            (Value::Error(Error::DivisionByZero), "Error: division by zero"),
            (sexpr(vec![]), "()"),
            (nil(), "{}"),
            (
                sexpr(vec![sym("+"), val(1), val([2, 3])]),
                "(+ 1 {2 3})",
            ),
            (Value::Builtin(Builtin::Arithmetic(ArithOp::Add)), "<builtin:+>"),
            (val(lambda), "(\\ {x y} {+ x y})"),
        ];

        for (value, expected) in cases {
            assert_eq!(value.to_string(), expected);
        }
    }

    #[test]
    fn test_structural_equality() {
        let body = || vec![sym("+"), sym("x"), val(1)];
        let a = val(Lambda::new(vec!["x".into()], body()));
        let mut b = Lambda::new(vec!["x".into()], body());
        b.env.put("unrelated", val(9));
        let b = val(b);
        let c = val(Lambda::new(vec!["x".into()], vec![sym("-"), sym("x"), val(1)]));

        assert_eq!(a, b);
        assert_ne!(a, c);
        // Same children, different tag
        assert_ne!(val([1, 2]), sexpr(vec![val(1), val(2)]));
        assert_ne!(val(1), val("1"));
        assert_ne!(sym("x"), val("x"));
        assert_eq!(
            Value::Error(Error::UnboundSymbol("x".into())),
            Value::Error(Error::UnboundSymbol("x".into()))
        );
    }

    #[test]
    fn test_clone_is_deep() {
        let original = val(vec![val([1, 2]), val("s")]);
        let mut copy = original.clone();
        if let Value::QExpr(children) = &mut copy {
            children.push(val(3));
        }
        assert_eq!(original.to_string(), "{{1 2} \"s\"}");
        assert_eq!(copy.to_string(), "{{1 2} \"s\" 3}");
    }
}
