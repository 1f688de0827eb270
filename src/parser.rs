mod assignment;
mod choice;
mod comment;
mod expression;
mod identifier;
mod node;
mod primitive;
mod text;

use nom::bytes::complete::tag;
use nom::character::complete::space1;
use nom::combinator::*;
use nom::error::context;
use nom::multi::many0;
use nom::sequence::*;
use nom::Parser;

use crate::format::{StoryScript, VarDecl};
use crate::result::ParseResult;

use self::comment::{span0, span0_inline};
use self::identifier::identifier;
use self::node::node;
use self::primitive::primitive;

/// parse a story script: variable declarations, an optional explicit
/// entry point, then nodes in declaration order
pub fn parse<'a>(name: &'a str, input: &'a str) -> ParseResult<&'a str, StoryScript> {
    let (input, variables) = many0(preceded(span0, var_decl)).parse(input)?;
    let (input, entry) = opt(preceded(span0, entry_decl)).parse(input)?;
    let (input, nodes) =
        all_consuming(terminated(many0(preceded(span0, node)), span0)).parse(input)?;

    Ok((
        input,
        StoryScript {
            name: name.to_string(),
            variables,
            entry,
            nodes,
        },
    ))
}

/// parse a declaration like `VAR visited = false`
fn var_decl(input: &str) -> ParseResult<&str, VarDecl> {
    let (input, _) = pair(tag("VAR"), space1).parse(input)?;
    let (input, name) = context("variable name", cut(identifier)).parse(input)?;
    let (input, _) = span0_inline.parse(input)?;
    let (input, _) = cut(nom::character::complete::char('=')).parse(input)?;
    let (input, _) = span0_inline.parse(input)?;
    let (input, initial) = context("initial value", cut(primitive)).parse(input)?;

    Ok((
        input,
        VarDecl {
            name: name.to_string(),
            initial,
        },
    ))
}

/// parse the optional top-level `-> entry_node` marker
fn entry_decl(input: &str) -> ParseResult<&str, String> {
    let (input, id) = preceded(pair(tag("->"), span0_inline), cut(identifier)).parse(input)?;
    Ok((input, id.to_string()))
}
