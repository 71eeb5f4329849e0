//! Concrete syntax: source text to a generic tree of tagged nodes.
//!
//! The tree mirrors what a grammar-driven parser combinator library would hand back: every
//! node carries a `|`-separated tag naming the rules it went through, the matched text for
//! leaves, and its children for compound forms.
//!
//! ```text
//! number   -?[0-9]+
//! symbol   [a-zA-Z0-9_+\-*/\\=<>!&]+
//! string   "(\\.|[^"])*"
//! comment  ;[^\r\n]*
//! sexpr    '(' expr* ')'
//! qexpr    '{' expr* '}'
//! program  ^ expr* $
//! ```
//!
//! The root is tagged `>` and is framed by two empty `regex` anchor nodes. Brackets are
//! kept as `char` children of their compound node. Turning the tree into values is the
//! reader's job; the parser never evaluates or unescapes anything.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{is_not, take_while, take_while1},
    character::complete::{anychar, char, digit1, multispace0, satisfy},
    combinator::{cut, not, opt, recognize},
    error::ErrorKind,
    multi::many0,
    sequence::{pair, preceded, terminated},
};

use crate::{MAX_PARSE_DEPTH, ParseError, ParseErrorKind};

/// Characters allowed in a symbol
const SYMBOL_SPECIAL_CHARS: &str = "_+-*/\\=<>!&";

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || SYMBOL_SPECIAL_CHARS.contains(c)
}

/// Parser settings, built once and passed by reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    /// Accept `;` line comments (they show up as `comment` nodes)
    pub handle_comments: bool,
    /// Maximum nesting depth of expressions
    pub max_depth: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            handle_comments: true,
            max_depth: MAX_PARSE_DEPTH,
        }
    }
}

/// A node of the parse tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub tag: String,
    pub contents: String,
    pub children: Vec<Node>,
}

impl Node {
    fn leaf(rule: &str, contents: &str) -> Self {
        Node {
            tag: format!("expr|{rule}|regex"),
            contents: contents.to_owned(),
            children: Vec::new(),
        }
    }

    fn bracket(c: char) -> Self {
        Node {
            tag: "char".to_owned(),
            contents: c.to_string(),
            children: Vec::new(),
        }
    }

    fn anchor() -> Self {
        Node {
            tag: "regex".to_owned(),
            contents: String::new(),
            children: Vec::new(),
        }
    }

    /// Whether any of the rules this node went through is `rule`
    pub fn has_tag(&self, rule: &str) -> bool {
        self.tag.split('|').any(|part| part == rule)
    }
}

fn parse_number(input: &str) -> IResult<&str, Node> {
    let (input, digits) = terminated(
        recognize(pair(opt(char('-')), digit1)),
        not(satisfy(is_symbol_char)),
    )
    .parse(input)?;
    // Digits that overflow are still a number node; the reader reports them
    Ok((input, Node::leaf("number", digits)))
}

fn parse_symbol(input: &str) -> IResult<&str, Node> {
    let (input, name) = take_while1(is_symbol_char).parse(input)?;
    Ok((input, Node::leaf("symbol", name)))
}

/// A string literal, quotes and escapes included
fn parse_string(input: &str) -> IResult<&str, Node> {
    let (input, literal) = recognize(preceded(
        char('"'),
        cut(terminated(
            many0(alt((recognize(pair(char('\\'), anychar)), is_not("\"\\")))),
            char('"'),
        )),
    ))
    .parse(input)?;
    Ok((input, Node::leaf("string", literal)))
}

fn parse_comment(input: &str) -> IResult<&str, Node> {
    let (input, text) =
        recognize(pair(char(';'), take_while(|c: char| c != '\r' && c != '\n'))).parse(input)?;
    Ok((input, Node::leaf("comment", text)))
}

/// `(...)` or `{...}`; once the opening bracket is seen the form is committed
fn parse_compound<'a>(
    input: &'a str,
    config: &ParseConfig,
    depth: usize,
    (open, close, rule): (char, char, &str),
) -> IResult<&'a str, Node> {
    let (input, _) = char(open).parse(input)?;
    let (input, (exprs, _)) = cut(pair(
        many0(|input| parse_expr(input, config, depth + 1)),
        preceded(multispace0, char(close)),
    ))
    .parse(input)?;

    let mut children = Vec::with_capacity(exprs.len() + 2);
    children.push(Node::bracket(open));
    children.extend(exprs);
    children.push(Node::bracket(close));

    Ok((
        input,
        Node {
            tag: format!("expr|{rule}|>"),
            contents: String::new(),
            children,
        },
    ))
}

/// One expression, leading whitespace skipped
fn parse_expr<'a>(input: &'a str, config: &ParseConfig, depth: usize) -> IResult<&'a str, Node> {
    if depth >= config.max_depth {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            ErrorKind::TooLarge,
        )));
    }

    let (input, _) = multispace0.parse(input)?;
    if config.handle_comments
        && let Ok((rest, comment)) = parse_comment(input)
    {
        return Ok((rest, comment));
    }

    alt((
        |input| parse_compound(input, config, depth, ('(', ')', "sexpr")),
        |input| parse_compound(input, config, depth, ('{', '}', "qexpr")),
        parse_number,
        parse_string,
        parse_symbol,
    ))
    .parse(input)
}

/// Parse a whole program into a root node whose children are the top-level expressions
pub fn parse_program(input: &str, config: &ParseConfig) -> Result<Node, ParseError> {
    let offset_of = |rest: &str| input[..input.len() - rest.len()].chars().count();

    match terminated(many0(|i| parse_expr(i, config, 0)), multispace0).parse(input) {
        Ok(("", exprs)) => {
            let mut children = Vec::with_capacity(exprs.len() + 2);
            children.push(Node::anchor());
            children.extend(exprs);
            children.push(Node::anchor());
            Ok(Node {
                tag: ">".to_owned(),
                contents: String::new(),
                children,
            })
        }
        Ok((remaining, _)) => Err(ParseError::with_context_and_found(
            ParseErrorKind::TrailingContent,
            "unexpected input after the last complete expression",
            input,
            offset_of(remaining),
            remaining.chars().next().map(String::from),
        )),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            let offset = offset_of(e.input);
            if e.code == ErrorKind::TooLarge {
                Err(ParseError::with_context(
                    ParseErrorKind::TooDeeplyNested,
                    format!("expression too deeply nested (max depth: {})", config.max_depth),
                    input,
                    offset,
                ))
            } else if e.input.is_empty() {
                Err(ParseError::with_context(
                    ParseErrorKind::Incomplete,
                    "unexpected end of input",
                    input,
                    offset,
                ))
            } else {
                Err(ParseError::with_context_and_found(
                    ParseErrorKind::InvalidSyntax,
                    "invalid syntax",
                    input,
                    offset,
                    e.input.chars().next().map(String::from),
                ))
            }
        }
        Err(nom::Err::Incomplete(_)) => Err(ParseError::new(
            ParseErrorKind::Incomplete,
            "incomplete input",
            None,
            None,
        )),
    }
}
