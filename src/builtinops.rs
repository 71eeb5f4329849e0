//! Built-in operations registry.
//!
//! Every builtin is a variant of the closed [`Builtin`] enum and is dispatched through a
//! single `match` in [`Builtin::apply`], so adding an operation without implementing it
//! is a compile error rather than a missing table entry.
//!
//! ```text
//! (+ 1 2 3)              ; arithmetic, unary (- 5) negates
//! (head {1 2 3})         ; {1}
//! (join {1} {2 3})       ; {1 2 3}
//! (def {x y} 1 2)        ; global bindings
//! (if (> x y) {x} {y})   ; branches are Q-expressions
//! ```
//!
//! ## Argument validation
//!
//! Builtins receive their already-evaluated arguments by value and check them before
//! acting. Three shared contracts produce uniform messages:
//!
//! - **Arity**: `head: expected 1 arguments, got 2`
//! - **Type**: `head: expected Q-Expression, got Number at position 0`
//! - **Non-empty**: `head: empty list`
//!
//! Arithmetic is checked, so overflow becomes an error value rather than wrapping.
//!
//! ## Adding New Operations
//!
//! 1. **Add a variant** to [`Builtin`] (or to one of its operator sub-enums)
//! 2. **Give it a name and arity** in [`Builtin::name`] and [`Builtin::arity`]
//! 3. **Implement it** as `fn(.., Vec<Value>) -> Result<Value, Error>` and dispatch it in
//!    [`Builtin::apply`]
//! 4. **Register the identifier** in `BUILTIN_OPS`
//! 5. **Add tests** covering edge cases and error conditions

use std::fmt;

use crate::Error;
use crate::ast::{Lambda, NumberType, Value};
use crate::evaluator::{Environment, eval, load_file};

/// Allowed argument counts of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Any,
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Any => true,
        }
    }

    pub(crate) fn validate(self, name: &'static str, count: usize) -> Result<(), Error> {
        if self.accepts(count) {
            Ok(())
        } else {
            Err(Error::ArityMismatch {
                name,
                expected: self,
                got: count,
            })
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
            Arity::Any => write!(f, "any number of"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Lt,
    Gt,
    Le,
    Ge,
}

/// Whether a binding builtin writes to the global or the local environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Local,
}

/// A native operation of the language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Arithmetic(ArithOp),
    Compare(Comparison),
    Equal,
    NotEqual,
    Head,
    Tail,
    List,
    Eval,
    Join,
    Cons,
    Len,
    Init,
    Bind(Scope),
    Lambda,
    If,
    Load,
    Print,
    PrintEnv,
    Exit,
}

impl Builtin {
    /// Canonical identifier, used when printing the builtin and in error messages
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Arithmetic(ArithOp::Add) => "+",
            Builtin::Arithmetic(ArithOp::Sub) => "-",
            Builtin::Arithmetic(ArithOp::Mul) => "*",
            Builtin::Arithmetic(ArithOp::Div) => "/",
            Builtin::Compare(Comparison::Lt) => "<",
            Builtin::Compare(Comparison::Gt) => ">",
            Builtin::Compare(Comparison::Le) => "<=",
            Builtin::Compare(Comparison::Ge) => "=>",
            Builtin::Equal => "==",
            Builtin::NotEqual => "!=",
            Builtin::Head => "head",
            Builtin::Tail => "tail",
            Builtin::List => "list",
            Builtin::Eval => "eval",
            Builtin::Join => "join",
            Builtin::Cons => "cons",
            Builtin::Len => "len",
            Builtin::Init => "init",
            Builtin::Bind(Scope::Global) => "def",
            Builtin::Bind(Scope::Local) => "=",
            Builtin::Lambda => "\\",
            Builtin::If => "if",
            Builtin::Load => "load",
            Builtin::Print => "print",
            Builtin::PrintEnv => "print-env",
            Builtin::Exit => "exit",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            Builtin::Arithmetic(_) => Arity::AtLeast(1),
            Builtin::Bind(_) => Arity::AtLeast(1),
            Builtin::Compare(_) | Builtin::Equal | Builtin::NotEqual => Arity::Exact(2),
            Builtin::Cons | Builtin::Lambda => Arity::Exact(2),
            Builtin::If => Arity::Exact(3),
            Builtin::Head
            | Builtin::Tail
            | Builtin::Eval
            | Builtin::Len
            | Builtin::Init
            | Builtin::Load => Arity::Exact(1),
            Builtin::PrintEnv | Builtin::Exit => Arity::Exact(0),
            Builtin::List | Builtin::Join | Builtin::Print => Arity::Any,
        }
    }

    /// Apply the builtin to already-evaluated arguments.
    ///
    /// The arguments are consumed on every path; failures come back as `Err` and are
    /// turned into error values by the evaluator.
    pub fn apply(self, env: &mut Environment, args: Vec<Value>) -> Result<Value, Error> {
        let name = self.name();
        self.arity().validate(name, args.len())?;

        match self {
            Builtin::Arithmetic(op) => builtin_arithmetic(op, name, args),
            Builtin::Compare(cmp) => builtin_compare(cmp, name, args),
            Builtin::Equal => builtin_equal(name, args, false),
            Builtin::NotEqual => builtin_equal(name, args, true),
            Builtin::Head => builtin_head(name, args),
            Builtin::Tail => builtin_tail(name, args),
            Builtin::List => Ok(Value::QExpr(args)),
            Builtin::Eval => builtin_eval(env, name, args),
            Builtin::Join => builtin_join(name, args),
            Builtin::Cons => builtin_cons(name, args),
            Builtin::Len => builtin_len(name, args),
            Builtin::Init => builtin_init(name, args),
            Builtin::Bind(scope) => builtin_bind(env, scope, name, args),
            Builtin::Lambda => builtin_lambda(name, args),
            Builtin::If => builtin_if(env, name, args),
            Builtin::Load => builtin_load(env, name, args),
            Builtin::Print => Ok(builtin_print(&args)),
            Builtin::PrintEnv => Ok(builtin_print_env(env)),
            Builtin::Exit => builtin_exit(),
        }
    }
}

//
// Argument extraction helpers
//

fn type_mismatch(
    name: &'static str,
    expected: &'static str,
    found: &Value,
    position: usize,
) -> Error {
    Error::TypeMismatch {
        name,
        expected,
        found: found.type_name(),
        position,
    }
}

/// Take ownership of exactly `N` arguments (arity is already validated, this keeps the
/// destructuring total).
fn exactly<const N: usize>(name: &'static str, args: Vec<Value>) -> Result<[Value; N], Error> {
    args.try_into().map_err(|args: Vec<Value>| Error::ArityMismatch {
        name,
        expected: Arity::Exact(N),
        got: args.len(),
    })
}

fn into_number(name: &'static str, position: usize, value: Value) -> Result<NumberType, Error> {
    match value {
        Value::Number(n) => Ok(n),
        other => Err(type_mismatch(name, "Number", &other, position)),
    }
}

fn into_qexpr(name: &'static str, position: usize, value: Value) -> Result<Vec<Value>, Error> {
    match value {
        Value::QExpr(children) => Ok(children),
        other => Err(type_mismatch(name, "Q-Expression", &other, position)),
    }
}

fn into_symbol(name: &'static str, position: usize, value: Value) -> Result<String, Error> {
    match value {
        Value::Symbol(symbol) => Ok(symbol),
        other => Err(type_mismatch(name, "Symbol", &other, position)),
    }
}

fn into_string(name: &'static str, position: usize, value: Value) -> Result<String, Error> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(type_mismatch(name, "String", &other, position)),
    }
}

/// The single argument of a list builtin, as a non-empty Q-expression
fn non_empty_list(name: &'static str, args: Vec<Value>) -> Result<Vec<Value>, Error> {
    let [list] = exactly(name, args)?;
    let list = into_qexpr(name, 0, list)?;
    if list.is_empty() {
        return Err(Error::EmptyList(name));
    }
    Ok(list)
}

//
// Builtin Function Implementations
//

fn builtin_arithmetic(op: ArithOp, name: &'static str, args: Vec<Value>) -> Result<Value, Error> {
    let numbers = args
        .into_iter()
        .enumerate()
        .map(|(position, arg)| into_number(name, position, arg))
        .collect::<Result<Vec<_>, _>>()?;

    let Some((&first, rest)) = numbers.split_first() else {
        return Err(Error::ArityMismatch {
            name,
            expected: Arity::AtLeast(1),
            got: 0,
        });
    };

    if op == ArithOp::Sub && rest.is_empty() {
        return first
            .checked_neg()
            .map(Value::Number)
            .ok_or(Error::IntegerOverflow(name));
    }

    rest.iter()
        .try_fold(first, |acc, &n| match op {
            ArithOp::Add => acc.checked_add(n).ok_or(Error::IntegerOverflow(name)),
            ArithOp::Sub => acc.checked_sub(n).ok_or(Error::IntegerOverflow(name)),
            ArithOp::Mul => acc.checked_mul(n).ok_or(Error::IntegerOverflow(name)),
            ArithOp::Div if n == 0 => Err(Error::DivisionByZero),
            ArithOp::Div => acc.checked_div(n).ok_or(Error::IntegerOverflow(name)),
        })
        .map(Value::Number)
}

fn builtin_compare(cmp: Comparison, name: &'static str, args: Vec<Value>) -> Result<Value, Error> {
    let [a, b] = exactly(name, args)?;
    let a = into_number(name, 0, a)?;
    let b = into_number(name, 1, b)?;

    let holds = match cmp {
        Comparison::Lt => a < b,
        Comparison::Gt => a > b,
        Comparison::Le => a <= b,
        Comparison::Ge => a >= b,
    };
    Ok(Value::from(holds))
}

fn builtin_equal(name: &'static str, args: Vec<Value>, negate: bool) -> Result<Value, Error> {
    let [a, b] = exactly(name, args)?;
    Ok(Value::from((a == b) != negate))
}

fn builtin_head(name: &'static str, args: Vec<Value>) -> Result<Value, Error> {
    let mut list = non_empty_list(name, args)?;
    list.truncate(1);
    Ok(Value::QExpr(list))
}

fn builtin_tail(name: &'static str, args: Vec<Value>) -> Result<Value, Error> {
    let mut list = non_empty_list(name, args)?;
    list.remove(0);
    Ok(Value::QExpr(list))
}

fn builtin_init(name: &'static str, args: Vec<Value>) -> Result<Value, Error> {
    let mut list = non_empty_list(name, args)?;
    list.pop();
    Ok(Value::QExpr(list))
}

fn builtin_eval(
    env: &mut Environment,
    name: &'static str,
    args: Vec<Value>,
) -> Result<Value, Error> {
    let [list] = exactly(name, args)?;
    let list = into_qexpr(name, 0, list)?;
    Ok(eval(env, Value::SExpr(list)))
}

fn builtin_join(name: &'static str, args: Vec<Value>) -> Result<Value, Error> {
    let mut joined = Vec::new();
    for (position, arg) in args.into_iter().enumerate() {
        joined.extend(into_qexpr(name, position, arg)?);
    }
    Ok(Value::QExpr(joined))
}

fn builtin_cons(name: &'static str, args: Vec<Value>) -> Result<Value, Error> {
    let [value, list] = exactly(name, args)?;
    let tail = into_qexpr(name, 1, list)?;

    let mut list = Vec::with_capacity(tail.len() + 1);
    list.push(value);
    list.extend(tail);
    Ok(Value::QExpr(list))
}

fn builtin_len(name: &'static str, args: Vec<Value>) -> Result<Value, Error> {
    let [list] = exactly(name, args)?;
    let list = into_qexpr(name, 0, list)?;
    NumberType::try_from(list.len())
        .map(Value::Number)
        .map_err(|_| Error::IntegerOverflow(name))
}

/// `def` and `=`: a Q-expression of symbols followed by one value per symbol
fn builtin_bind(
    env: &mut Environment,
    scope: Scope,
    name: &'static str,
    args: Vec<Value>,
) -> Result<Value, Error> {
    let mut args = args.into_iter();
    let Some(symbols) = args.next() else {
        return Err(Error::ArityMismatch {
            name,
            expected: Arity::AtLeast(1),
            got: 0,
        });
    };

    let symbols = into_qexpr(name, 0, symbols)?
        .into_iter()
        .enumerate()
        .map(|(position, symbol)| into_symbol(name, position, symbol))
        .collect::<Result<Vec<_>, _>>()?;

    let values: Vec<Value> = args.collect();
    if symbols.len() != values.len() {
        return Err(Error::BindingMismatch {
            name,
            symbols: symbols.len(),
            values: values.len(),
        });
    }

    for (symbol, value) in symbols.into_iter().zip(values) {
        match scope {
            Scope::Global => env.def(symbol, value),
            Scope::Local => env.put(symbol, value),
        }
    }

    Ok(Value::unit())
}

fn builtin_lambda(name: &'static str, args: Vec<Value>) -> Result<Value, Error> {
    let [formals, body] = exactly(name, args)?;
    let formals = into_qexpr(name, 0, formals)?;
    let body = into_qexpr(name, 1, body)?;

    let formals = formals
        .into_iter()
        .enumerate()
        .map(|(position, formal)| into_symbol(name, position, formal))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Value::from(Lambda::new(formals, body)))
}

fn builtin_if(env: &mut Environment, name: &'static str, args: Vec<Value>) -> Result<Value, Error> {
    let [condition, then_branch, else_branch] = exactly(name, args)?;
    let condition = into_number(name, 0, condition)?;
    let then_branch = into_qexpr(name, 1, then_branch)?;
    let else_branch = into_qexpr(name, 2, else_branch)?;

    let branch = if condition != 0 { then_branch } else { else_branch };
    Ok(eval(env, Value::SExpr(branch)))
}

fn builtin_load(
    env: &mut Environment,
    name: &'static str,
    args: Vec<Value>,
) -> Result<Value, Error> {
    let [path] = exactly(name, args)?;
    let path = into_string(name, 0, path)?;
    load_file(env, &path)
}

/// The arguments in their printed form, separated by single spaces
fn print_line(args: &[Value]) -> String {
    args.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn builtin_print(args: &[Value]) -> Value {
    println!("{}", print_line(args));
    Value::unit()
}

/// One `name = value` line per binding visible from `env`, sorted by name
fn env_lines(env: &Environment) -> Vec<String> {
    env.get_all_bindings()
        .into_iter()
        .map(|(name, value)| format!("{name} = {value}"))
        .collect()
}

fn builtin_print_env(env: &Environment) -> Value {
    for line in env_lines(env) {
        println!("{line}");
    }
    Value::unit()
}

fn builtin_exit() -> Result<Value, Error> {
    tracing::info!("exit requested, terminating");
    std::process::exit(0)
}

/// Global registry of builtin identifiers.
///
/// `>=` is accepted as an alias of `=>`; everything else is registered under its
/// canonical [`Builtin::name`].
static BUILTIN_OPS: &[(&str, Builtin)] = &[
    // Arithmetic operations
    ("+", Builtin::Arithmetic(ArithOp::Add)),
    ("-", Builtin::Arithmetic(ArithOp::Sub)),
    ("*", Builtin::Arithmetic(ArithOp::Mul)),
    ("/", Builtin::Arithmetic(ArithOp::Div)),
    // List operations
    ("head", Builtin::Head),
    ("tail", Builtin::Tail),
    ("list", Builtin::List),
    ("eval", Builtin::Eval),
    ("join", Builtin::Join),
    ("cons", Builtin::Cons),
    ("len", Builtin::Len),
    ("init", Builtin::Init),
    // Variables and functions
    ("def", Builtin::Bind(Scope::Global)),
    ("=", Builtin::Bind(Scope::Local)),
    ("\\", Builtin::Lambda),
    // Comparison operations
    ("<", Builtin::Compare(Comparison::Lt)),
    (">", Builtin::Compare(Comparison::Gt)),
    ("<=", Builtin::Compare(Comparison::Le)),
    ("=>", Builtin::Compare(Comparison::Ge)),
    (">=", Builtin::Compare(Comparison::Ge)),
    ("==", Builtin::Equal),
    ("!=", Builtin::NotEqual),
    // Control flow
    ("if", Builtin::If),
    // Host interaction
    ("load", Builtin::Load),
    ("print", Builtin::Print),
    ("print-env", Builtin::PrintEnv),
    ("exit", Builtin::Exit),
];

/// Get all registered builtin identifiers (for the evaluator's global environment)
pub(crate) fn get_builtin_ops() -> &'static [(&'static str, Builtin)] {
    BUILTIN_OPS
}
