use nom::branch::alt;
use nom::bytes::complete::*;
use nom::character::complete::*;
use nom::combinator::*;
use nom::error::context;
use nom::sequence::*;
use nom::Parser;

use crate::format::Literal;
use crate::result::ParseResult;

pub fn primitive(input: &str) -> ParseResult<&str, Literal> {
    context("primitive", alt((boolean, number, string))).parse(input)
}

pub fn string(input: &str) -> ParseResult<&str, Literal> {
    let (input, s) = context(
        "string",
        alt((
            delimited(tag("\""), take_until("\""), tag("\"")),
            delimited(tag("'"), take_until("'"), tag("'")),
        )),
    )
    .parse(input)?;
    Ok((input, Literal::String(s.to_string())))
}

/// integers and floats, with an optional leading sign
pub fn number(input: &str) -> ParseResult<&str, Literal> {
    let (input, (sign, whole, frac)) = context(
        "number",
        (
            opt(alt((tag("-"), tag("+")))),
            digit1,
            opt(preceded(char('.'), cut(digit1))),
        ),
    )
    .parse(input)?;

    let negative = sign == Some("-");
    let literal = match frac {
        Some(frac) => {
            let value: f64 = format!("{}.{}", whole, frac)
                .parse()
                .map_err(|_| nom::Err::Failure(make_error(input)))?;
            Literal::Float(if negative { -value } else { value })
        }
        None => {
            let value: i64 = whole
                .parse()
                .map_err(|_| nom::Err::Failure(make_error(input)))?;
            Literal::Integer(if negative { -value } else { value })
        }
    };

    Ok((input, literal))
}

pub fn boolean(input: &str) -> ParseResult<&str, Literal> {
    let (input, b) = context(
        "boolean",
        alt((value(true, tag("true")), value(false, tag("false")))),
    )
    .parse(input)?;
    Ok((input, Literal::Boolean(b)))
}

fn make_error(input: &str) -> nom_language::error::VerboseError<&str> {
    nom::error::ParseError::from_error_kind(input, nom::error::ErrorKind::Digit)
}
