use std::collections::HashMap;
use std::fs;

use crate::ast::{Lambda, VARIADIC_MARKER, Value};
use crate::builtinops::get_builtin_ops;
use crate::parser::ParseConfig;
use crate::reader::read_forms;
use crate::{Error, MAX_EVAL_DEPTH};

/// Environment for variable bindings
///
/// Lookups go through local bindings first and then up the parent chain. The root of the
/// chain is the global environment: it holds the builtins, the parse configuration used by
/// `load`, and the counter of nested S-expression evaluations.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: HashMap<String, Value>,
    parent: Option<Box<Environment>>,
    config: ParseConfig,
    eval_depth: usize,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    /// A global environment with every builtin bound (see [`create_global_env`])
    pub fn global() -> Self {
        create_global_env()
    }

    #[cfg(test)]
    pub(crate) fn with_parent(parent: Environment) -> Self {
        Environment {
            parent: Some(Box::new(parent)),
            ..Environment::default()
        }
    }

    pub(crate) fn take_parent(&mut self) -> Option<Environment> {
        self.parent.take().map(|parent| *parent)
    }

    /// Look a symbol up, returning a copy of its value
    pub fn get(&self, name: &str) -> Result<Value, Error> {
        match self.bindings.get(name) {
            Some(value) => Ok(value.clone()),
            None => match &self.parent {
                Some(parent) => parent.get(name),
                None => Err(Error::UnboundSymbol(name.to_owned())),
            },
        }
    }

    /// Bind in this environment only, replacing any previous binding
    pub fn put(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    /// Bind in the outermost ancestor
    pub fn def(&mut self, name: impl Into<String>, value: Value) {
        self.root_mut().put(name, value);
    }

    /// Parse configuration of the global environment
    pub fn parse_config(&self) -> ParseConfig {
        self.root().config
    }

    fn root(&self) -> &Environment {
        let mut env = self;
        while let Some(parent) = &env.parent {
            env = parent;
        }
        env
    }

    fn root_mut(&mut self) -> &mut Environment {
        match self.parent {
            Some(ref mut parent) => parent.root_mut(),
            None => self,
        }
    }

    /// Get all bindings in this environment and its parents
    /// Returns a Vec of (name, value) pairs sorted by name
    pub fn get_all_bindings(&self) -> Vec<(String, Value)> {
        let mut bindings = HashMap::new();

        // Start with parent bindings (so they can be overridden by local bindings)
        if let Some(parent) = &self.parent {
            for (name, value) in parent.get_all_bindings() {
                bindings.insert(name, value);
            }
        }

        // Add/override with local bindings
        for (name, value) in &self.bindings {
            bindings.insert(name.clone(), value.clone());
        }

        // Convert to sorted vector
        let mut result: Vec<_> = bindings.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}

/// Evaluate a value in an environment.
///
/// Never fails in the Rust sense: every failure is returned as a [`Value::Error`].
pub fn eval(env: &mut Environment, value: Value) -> Value {
    match value {
        Value::Symbol(name) => env.get(&name).unwrap_or_else(Value::Error),
        Value::SExpr(children) => eval_sexpr(env, children),
        // Self-evaluating forms
        Value::Number(_)
        | Value::String(_)
        | Value::Error(_)
        | Value::QExpr(_)
        | Value::Builtin(_)
        | Value::Lambda(_) => value,
    }
}

/// Evaluate an S-expression, one level deeper than the caller
fn eval_sexpr(env: &mut Environment, children: Vec<Value>) -> Value {
    let depth = env.root().eval_depth;
    if depth >= MAX_EVAL_DEPTH {
        return Value::Error(Error::DepthLimitExceeded(MAX_EVAL_DEPTH));
    }

    env.root_mut().eval_depth += 1;
    let result = reduce_sexpr(env, children);
    env.root_mut().eval_depth -= 1;
    result
}

/// Evaluate every child, short-circuit on the first error, then apply
fn reduce_sexpr(env: &mut Environment, children: Vec<Value>) -> Value {
    let mut children: Vec<Value> = children.into_iter().map(|child| eval(env, child)).collect();

    if let Some(position) = children.iter().position(Value::is_error) {
        return children.swap_remove(position);
    }

    let mut children = children.into_iter();
    let Some(head) = children.next() else {
        return Value::unit();
    };
    let args: Vec<Value> = children.collect();

    if args.is_empty() {
        // A lone element is only applied when it can run without arguments
        return match head {
            Value::Lambda(_) => call(env, head, args),
            Value::Builtin(op) if op.arity().accepts(0) => call(env, head, args),
            other => other,
        };
    }

    call(env, head, args)
}

/// Apply a function value to already-evaluated arguments
pub(crate) fn call(env: &mut Environment, func: Value, args: Vec<Value>) -> Value {
    let result = match func {
        Value::Builtin(op) => op.apply(env, args),
        Value::Lambda(lambda) => apply_lambda(env, *lambda, args),
        _ => Err(Error::NotCallable),
    };
    result.unwrap_or_else(Value::Error)
}

/// The symbol following a variadic marker, which must be the last formal
fn variadic_target(lambda: &mut Lambda) -> Result<String, Error> {
    match lambda.formals.pop_front() {
        Some(target) if lambda.formals.is_empty() => Ok(target),
        _ => Err(Error::InvalidVariadicFormal),
    }
}

/// Bind arguments to formals left to right; evaluate the body once every formal is bound,
/// otherwise hand back the partially applied lambda.
fn apply_lambda(
    env: &mut Environment,
    mut lambda: Lambda,
    args: Vec<Value>,
) -> Result<Value, Error> {
    let given = args.len();
    let total = lambda.formals.len();

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let Some(formal) = lambda.formals.pop_front() else {
            return Err(Error::TooManyArguments { given, total });
        };

        if formal == VARIADIC_MARKER {
            let target = variadic_target(&mut lambda)?;
            let rest: Vec<Value> = std::iter::once(arg).chain(args.by_ref()).collect();
            lambda.env.put(target, Value::QExpr(rest));
            break;
        }

        lambda.env.put(formal, arg);
    }

    // Variadic formal with nothing left to collect
    if lambda.formals.front().is_some_and(|formal| formal == VARIADIC_MARKER) {
        lambda.formals.pop_front();
        let target = variadic_target(&mut lambda)?;
        lambda.env.put(target, Value::QExpr(Vec::new()));
    }

    if !lambda.formals.is_empty() {
        return Ok(Value::from(lambda));
    }

    tracing::trace!(depth = env.root().eval_depth, args = given, "applying lambda");

    // The caller's environment becomes the parent for the duration of the body
    let Lambda { body, env: mut local, .. } = lambda;
    local.parent = Some(Box::new(std::mem::take(env)));

    let result = eval(&mut local, Value::SExpr(body));

    if let Some(caller) = local.take_parent() {
        *env = caller;
    }
    Ok(result)
}

/// Parse a file and evaluate each top-level form in order.
///
/// A failing form is reported and loading continues with the next one; only a file that
/// cannot be read or parsed fails the whole load.
pub(crate) fn load_file(env: &mut Environment, path: &str) -> Result<Value, Error> {
    let load_error = |reason: String| Error::Load {
        path: path.to_owned(),
        reason,
    };

    let source = fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
    let config = env.parse_config();
    let forms = read_forms(&source, &config).map_err(|e| match e {
        Error::Parse(parse_error) => load_error(parse_error.to_string()),
        other => other,
    })?;

    tracing::debug!(path, forms = forms.len(), "loading library");

    for form in forms {
        let result = eval(env, form);
        if let Value::Error(error) = &result {
            tracing::warn!(path, %error, "form in library failed");
            println!("{result}");
        }
    }

    Ok(Value::unit())
}

/// Load a library file into `env`.
///
/// Failures are printed and returned as an error value rather than propagated, so a broken
/// library never prevents start-up.
pub fn load_library(env: &mut Environment, path: &str) -> Value {
    match load_file(env, path) {
        Ok(value) => value,
        Err(error) => {
            let value = Value::Error(error);
            println!("{value}");
            value
        }
    }
}

/// Create a global environment with built-in functions
pub fn create_global_env() -> Environment {
    create_global_env_with_config(ParseConfig::default())
}

/// Create a global environment whose `load` parses files with `config`
pub fn create_global_env_with_config(config: ParseConfig) -> Environment {
    let mut env = Environment {
        config,
        ..Environment::default()
    };

    for (id, op) in get_builtin_ops() {
        env.put(*id, Value::Builtin(*op));
    }

    env
}
