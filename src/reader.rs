//! Parse tree to values.
//!
//! Reading is purely structural: leaves become numbers, symbols and strings, compound
//! nodes become S- or Q-expressions of their meaningful children in order. Brackets,
//! comments and anchors are dropped. Nothing is evaluated.

use crate::Error;
use crate::ast::{NumberType, Value};
use crate::parser::{Node, ParseConfig, parse_program};

/// Convert a parse node into a value
pub fn read(node: &Node) -> Value {
    if node.has_tag("number") {
        return read_number(&node.contents);
    }
    if node.has_tag("symbol") {
        return Value::Symbol(node.contents.clone());
    }
    if node.has_tag("string") {
        return Value::String(read_string(&node.contents));
    }

    let children = node
        .children
        .iter()
        .filter(|child| is_meaningful(child))
        .map(read)
        .collect();

    if node.has_tag("qexpr") {
        Value::QExpr(children)
    } else {
        // The root (`>`) and `sexpr` nodes
        Value::SExpr(children)
    }
}

fn is_meaningful(node: &Node) -> bool {
    let bracket = node.tag == "char" && matches!(node.contents.as_str(), "(" | ")" | "{" | "}");
    !(bracket || node.tag == "regex" || node.has_tag("comment"))
}

fn read_number(digits: &str) -> Value {
    digits
        .parse::<NumberType>()
        .map_or(Value::Error(Error::InvalidNumber), Value::Number)
}

/// Strip the quotes of a string literal and resolve its escapes
fn read_string(literal: &str) -> String {
    let inner = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(literal);
    unescape(inner)
}

fn unescape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('a') => result.push('\x07'),
            Some('b') => result.push('\x08'),
            Some('f') => result.push('\x0c'),
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('v') => result.push('\x0b'),
            Some('0') => result.push('\0'),
            Some(escaped @ ('\\' | '\'' | '"')) => result.push(escaped),
            // Unknown escapes are kept verbatim
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}

/// Parse and read source text into its top-level forms
pub fn read_forms(input: &str, config: &ParseConfig) -> Result<Vec<Value>, Error> {
    match read_program(input, config)? {
        Value::SExpr(forms) => Ok(forms),
        other => Ok(vec![other]),
    }
}

/// Parse and read source text; the program as a whole is an S-expression of its forms
pub fn read_program(input: &str, config: &ParseConfig) -> Result<Value, Error> {
    let root = parse_program(input, config)?;
    Ok(read(&root))
}
