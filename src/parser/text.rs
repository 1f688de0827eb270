use nom::branch::alt;
use nom::bytes::complete::*;
use nom::character::complete::char;
use nom::combinator::*;
use nom::error::context;
use nom::multi::many1;
use nom::sequence::*;
use nom::Parser;

use crate::format::{TemplatePart, TemplateText, TextSegment};
use crate::result::ParseResult;

use super::comment::span0_inline;
use super::expression::{expression, guard};

/// parse a narrative line: an optional guard followed by text running to
/// the end of the line
pub fn text_line(input: &str) -> ParseResult<&str, TextSegment> {
    let (input, _) = not(alt((tag("==="), tag("*"), tag("~"), tag("->")))).parse(input)?;
    let (input, guard) = opt(terminated(guard, span0_inline)).parse(input)?;
    let (input, text) = template_text.parse(input)?;
    Ok((input, TextSegment { guard, text }))
}

/// text until end of line, with `${expr}` interpolation holes
pub fn template_text(input: &str) -> ParseResult<&str, TemplateText> {
    let (input, parts) = context(
        "text",
        many1(alt((interpolation, line_chunk, dollar_literal))),
    )
    .parse(input)?;
    Ok((input, TemplateText { parts }))
}

/// text until a closing bracket, used for choice labels
pub fn bracket_text(input: &str) -> ParseResult<&str, TemplateText> {
    let (input, parts) = context(
        "choice text",
        many1(alt((interpolation, bracket_chunk, dollar_literal))),
    )
    .parse(input)?;
    Ok((input, TemplateText { parts }))
}

fn interpolation(input: &str) -> ParseResult<&str, TemplatePart> {
    let (input, expr) = context(
        "interpolation",
        delimited(
            tag("${"),
            delimited(span0_inline, cut(expression), span0_inline),
            cut(char('}')),
        ),
    )
    .parse(input)?;
    Ok((input, TemplatePart::Value(expr)))
}

fn line_chunk(input: &str) -> ParseResult<&str, TemplatePart> {
    let (input, s) = take_while1(|c| !matches!(c, '\n' | '\r' | '$')).parse(input)?;
    Ok((input, TemplatePart::Text(s.to_string())))
}

fn bracket_chunk(input: &str) -> ParseResult<&str, TemplatePart> {
    let (input, s) = take_while1(|c| !matches!(c, '\n' | '\r' | '$' | ']')).parse(input)?;
    Ok((input, TemplatePart::Text(s.to_string())))
}

/// a `$` that does not open an interpolation stays literal text
fn dollar_literal(input: &str) -> ParseResult<&str, TemplatePart> {
    let (input, _) = terminated(char('$'), peek(not(char('{')))).parse(input)?;
    Ok((input, TemplatePart::Text("$".to_string())))
}

#[cfg(test)]
mod tests {
    use crate::format::{BinaryOp, Expr, Literal};

    use super::*;

    fn text_part(s: &str) -> TemplatePart {
        TemplatePart::Text(s.to_string())
    }

    #[test]
    fn test_plain_line() {
        assert_eq!(
            text_line("You wake in a strange room.\nnext"),
            Ok((
                "\nnext",
                TextSegment {
                    guard: None,
                    text: TemplateText {
                        parts: vec![text_part("You wake in a strange room.")]
                    },
                }
            ))
        );
    }

    #[test]
    fn test_guarded_line() {
        let (rest, segment) = text_line("{ visited } You have been here before.").unwrap();
        assert_eq!(rest, "");
        assert_eq!(segment.guard, Some(Expr::Variable("visited".to_string())));
        assert_eq!(
            segment.text.parts,
            vec![text_part("You have been here before.")]
        );
    }

    #[test]
    fn test_interpolation() {
        let (rest, text) = template_text("Hello, ${name}.").unwrap();
        assert_eq!(rest, "");
        assert_eq!(
            text.parts,
            vec![
                text_part("Hello, "),
                TemplatePart::Value(Expr::Variable("name".to_string())),
                text_part("."),
            ]
        );
    }

    #[test]
    fn test_interpolated_expression() {
        let (_, text) = template_text("${gold + 1} coins").unwrap();
        assert_eq!(
            text.parts[0],
            TemplatePart::Value(Expr::Binary {
                op: BinaryOp::Add,
                lhs: Box::new(Expr::Variable("gold".to_string())),
                rhs: Box::new(Expr::Literal(Literal::Integer(1))),
            })
        );
    }

    #[test]
    fn test_lone_dollar() {
        let (_, text) = template_text("costs 5$ today").unwrap();
        assert_eq!(
            text.parts,
            vec![text_part("costs 5"), text_part("$"), text_part(" today")]
        );
    }

    #[test]
    fn test_rejects_structural_lines() {
        assert!(text_line("=== start ===").is_err());
        assert!(text_line("* [go] -> there").is_err());
        assert!(text_line("~ x = 1").is_err());
        assert!(text_line("-> somewhere").is_err());
    }
}
