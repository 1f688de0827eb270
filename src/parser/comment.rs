use nom::branch::*;
use nom::bytes::complete::*;
use nom::character::complete::*;
use nom::combinator::*;
use nom::multi::*;
use nom::sequence::*;
use nom::Parser;

use crate::result::ParseResult;

/// parse a comment like `// until end of line`
pub fn comment(input: &str) -> ParseResult<&str, &str> {
    preceded(tag("//"), cut(is_not("\r\n"))).parse(input)
}

/// match contiguous comments or whitespace, spanning any number of lines
pub fn span0(input: &str) -> ParseResult<&str, ()> {
    value(
        (),
        many0(alt((map(comment, |_| ()), value((), multispace1)))),
    )
    .parse(input)
}

/// match spaces and tabs within a single line
pub fn span0_inline(input: &str) -> ParseResult<&str, ()> {
    value((), space0).parse(input)
}
