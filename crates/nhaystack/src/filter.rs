//! Haystack filter expressions
//!
//! Supported grammar:
//!
//! ```text
//! filter  := and ("or" and)*
//! and     := term ("and" term)*
//! term    := "(" filter ")" | "not" name | name (op literal)?
//! op      := "==" | "!=" | "<" | "<=" | ">" | ">="
//! literal := "true" | "false" | @ref | "string" | number[unit]
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use haystack_types::{Dict, Number, Ref, Value};
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, multispace0, multispace1, satisfy},
    combinator::{all_consuming, map, not, opt, peek, recognize, value},
    multi::many0,
    number::complete::double,
    sequence::{delimited, pair, preceded, terminated},
};

use crate::error::HaystackError;

/// Comparison operator of a filter term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        };
        f.write_str(op)
    }
}

/// A parsed filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Has(String),
    Missing(String),
    Cmp { name: String, op: CmpOp, val: Value },
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
}

impl Filter {
    pub fn parse(input: &str) -> Result<Self, HaystackError> {
        match all_consuming(delimited(multispace0, filter_or, multispace0))(input) {
            Ok((_, filter)) => Ok(filter),
            Err(_) => Err(HaystackError::InvalidFilter(input.to_string())),
        }
    }

    pub fn matches(&self, dict: &Dict) -> bool {
        match self {
            Filter::Has(name) => dict.has(name),
            Filter::Missing(name) => dict.missing(name),
            // A missing tag never satisfies a comparison, not even `!=`
            Filter::Cmp { name, op, val } => dict.get(name).is_some_and(|v| compare(v, *op, val)),
            Filter::And(a, b) => a.matches(dict) && b.matches(dict),
            Filter::Or(a, b) => a.matches(dict) || b.matches(dict),
        }
    }
}

impl FromStr for Filter {
    type Err = HaystackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Filter::parse(s)
    }
}

fn compare(actual: &Value, op: CmpOp, expected: &Value) -> bool {
    let ordering = match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => {
            if a.unit.is_some() && b.unit.is_some() && a.unit != b.unit {
                None
            } else {
                a.val.partial_cmp(&b.val)
            }
        }
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Ref(a), Value::Ref(b)) => Some(a.val.cmp(&b.val)),
        (Value::DateTime { ts: a, .. }, Value::DateTime { ts: b, .. }) => Some(a.cmp(b)),
        (Value::Marker, Value::Marker) => Some(Ordering::Equal),
        _ => None,
    };

    match (op, ordering) {
        (CmpOp::Ne, None) => true,
        (_, None) => false,
        (CmpOp::Eq, Some(o)) => o == Ordering::Equal,
        (CmpOp::Ne, Some(o)) => o != Ordering::Equal,
        (CmpOp::Lt, Some(o)) => o == Ordering::Less,
        (CmpOp::Le, Some(o)) => o != Ordering::Greater,
        (CmpOp::Gt, Some(o)) => o == Ordering::Greater,
        (CmpOp::Ge, Some(o)) => o != Ordering::Less,
    }
}

// =============================================================================
// PARSERS
// =============================================================================

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        take_while(is_name_char),
    ))(input)
}

/// A keyword not followed by more name characters.
fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag(kw), not(peek(satisfy(is_name_char))))
}

fn cmp_op(input: &str) -> IResult<&str, CmpOp> {
    alt((
        value(CmpOp::Eq, tag("==")),
        value(CmpOp::Ne, tag("!=")),
        value(CmpOp::Le, tag("<=")),
        value(CmpOp::Ge, tag(">=")),
        value(CmpOp::Lt, tag("<")),
        value(CmpOp::Gt, tag(">")),
    ))(input)
}

fn is_unit_char(c: char) -> bool {
    c.is_alphabetic() || !c.is_ascii() || matches!(c, '%' | '_' | '/' | '$')
}

fn number(input: &str) -> IResult<&str, Value> {
    map(
        pair(double, opt(take_while1(is_unit_char))),
        |(val, unit)| {
            Value::Number(Number {
                val,
                unit: unit.map(str::to_string),
            })
        },
    )(input)
}

fn literal(input: &str) -> IResult<&str, Value> {
    alt((
        value(Value::Bool(true), keyword("true")),
        value(Value::Bool(false), keyword("false")),
        map(
            preceded(
                char('@'),
                take_while1(|c: char| is_name_char(c) || matches!(c, ':' | '-' | '.' | '~')),
            ),
            |r: &str| Value::Ref(Ref::new(r)),
        ),
        map(delimited(char('"'), take_until("\""), char('"')), |s: &str| {
            Value::str(s)
        }),
        number,
    ))(input)
}

fn term(input: &str) -> IResult<&str, Filter> {
    delimited(
        multispace0,
        alt((
            delimited(char('('), filter_or, preceded(multispace0, char(')'))),
            map(preceded(pair(keyword("not"), multispace1), name), |n| {
                Filter::Missing(n.to_string())
            }),
            map(
                pair(
                    name,
                    opt(pair(delimited(multispace0, cmp_op, multispace0), literal)),
                ),
                |(name, cmp)| match cmp {
                    Some((op, val)) => Filter::Cmp {
                        name: name.to_string(),
                        op,
                        val,
                    },
                    None => Filter::Has(name.to_string()),
                },
            ),
        )),
        multispace0,
    )(input)
}

fn filter_and(input: &str) -> IResult<&str, Filter> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(preceded(keyword("and"), term))(input)?;
    let filter = rest
        .into_iter()
        .fold(first, |acc, next| Filter::And(Box::new(acc), Box::new(next)));
    Ok((input, filter))
}

fn filter_or(input: &str) -> IResult<&str, Filter> {
    let (input, first) = filter_and(input)?;
    let (input, rest) = many0(preceded(keyword("or"), filter_and))(input)?;
    let filter = rest
        .into_iter()
        .fold(first, |acc, next| Filter::Or(Box::new(acc), Box::new(next)));
    Ok((input, filter))
}
