use nom::character::complete::char;
use nom::combinator::cut;
use nom::error::context;
use nom::Parser;

use crate::format::Assignment;
use crate::result::ParseResult;

use super::comment::span0_inline;
use super::expression::expression;
use super::identifier::identifier;

/// parse an assignment effect like `~ courage = courage + 1`
pub fn assignment(input: &str) -> ParseResult<&str, Assignment> {
    let (input, _) = char('~').parse(input)?;
    let (input, _) = span0_inline.parse(input)?;
    let (input, name) = context("assignment target", cut(identifier)).parse(input)?;
    let (input, _) = span0_inline.parse(input)?;
    let (input, _) = cut(char('=')).parse(input)?;
    let (input, _) = span0_inline.parse(input)?;
    let (input, value) = context("assignment value", cut(expression)).parse(input)?;

    Ok((
        input,
        Assignment {
            name: name.to_string(),
            value,
        },
    ))
}
