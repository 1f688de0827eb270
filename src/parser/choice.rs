use nom::bytes::complete::tag;
use nom::character::complete::char;
use nom::combinator::*;
use nom::error::context;
use nom::multi::many0;
use nom::sequence::*;
use nom::Parser;

use crate::format::ChoiceDef;
use crate::result::ParseResult;

use super::assignment::assignment;
use super::comment::span0_inline;
use super::expression::guard;
use super::identifier::identifier;
use super::text::bracket_text;

/// parse a choice like `* { lamps > 1 } [Take a lamp] -> hallway ~ lamps = lamps - 1`
pub fn choice_line(input: &str) -> ParseResult<&str, ChoiceDef> {
    let (input, _) = char('*').parse(input)?;
    let (input, _) = span0_inline.parse(input)?;
    let (input, guard) = opt(terminated(guard, span0_inline)).parse(input)?;
    let (input, text) = context(
        "choice label",
        delimited(cut(char('[')), cut(bracket_text), cut(char(']'))),
    )
    .parse(input)?;
    let (input, _) = span0_inline.parse(input)?;
    let (input, _) = context("choice target", cut(tag("->"))).parse(input)?;
    let (input, _) = span0_inline.parse(input)?;
    let (input, target) = cut(identifier).parse(input)?;
    let (input, effects) = many0(preceded(span0_inline, assignment)).parse(input)?;

    Ok((
        input,
        ChoiceDef {
            guard,
            text,
            target: target.to_string(),
            effects,
        },
    ))
}
