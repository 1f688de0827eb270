use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::*;
use nom::combinator::*;
use nom::multi::many0;
use nom::sequence::pair;
use nom::Parser;

use crate::result::ParseResult;

pub fn identifier(input: &str) -> ParseResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)
}
