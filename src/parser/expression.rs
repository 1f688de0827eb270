use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{alphanumeric1, char};
use nom::combinator::*;
use nom::error::context;
use nom::multi::many0;
use nom::sequence::*;
use nom::Parser;

use crate::format::{BinaryOp, Expr, UnaryOp};
use crate::result::ParseResult;

use super::comment::span0_inline;
use super::identifier::identifier;
use super::primitive::primitive;

/// parse a guard or assignment expression, lowest precedence first
pub fn expression(input: &str) -> ParseResult<&str, Expr> {
    context("expression", or_expr).parse(input)
}

/// parse a guard wrapped in braces, e.g. `{ visited == true }`
pub fn guard(input: &str) -> ParseResult<&str, Expr> {
    context(
        "guard",
        delimited(
            char('{'),
            delimited(span0_inline, cut(expression), span0_inline),
            cut(char('}')),
        ),
    )
    .parse(input)
}

fn or_expr(input: &str) -> ParseResult<&str, Expr> {
    let (input, first) = and_expr.parse(input)?;
    let (input, rest) = many0(preceded(
        delimited(span0_inline, tag("||"), span0_inline),
        cut(and_expr),
    ))
    .parse(input)?;
    Ok((input, fold_binary(first, BinaryOp::Or, rest)))
}

fn and_expr(input: &str) -> ParseResult<&str, Expr> {
    let (input, first) = comparison.parse(input)?;
    let (input, rest) = many0(preceded(
        delimited(span0_inline, tag("&&"), span0_inline),
        cut(comparison),
    ))
    .parse(input)?;
    Ok((input, fold_binary(first, BinaryOp::And, rest)))
}

fn comparison(input: &str) -> ParseResult<&str, Expr> {
    let (input, lhs) = sum.parse(input)?;
    let (input, tail) = opt(pair(
        delimited(span0_inline, comparison_op, span0_inline),
        cut(sum),
    ))
    .parse(input)?;

    let expr = match tail {
        Some((op, rhs)) => Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        None => lhs,
    };
    Ok((input, expr))
}

fn comparison_op(input: &str) -> ParseResult<&str, BinaryOp> {
    alt((
        value(BinaryOp::Eq, tag("==")),
        value(BinaryOp::Ne, tag("!=")),
        value(BinaryOp::Le, tag("<=")),
        value(BinaryOp::Ge, tag(">=")),
        value(BinaryOp::Lt, tag("<")),
        value(BinaryOp::Gt, tag(">")),
    ))
    .parse(input)
}

fn sum(input: &str) -> ParseResult<&str, Expr> {
    let (input, first) = term.parse(input)?;
    let (input, rest) = many0(pair(
        delimited(
            span0_inline,
            alt((
                value(BinaryOp::Add, char('+')),
                value(BinaryOp::Sub, char('-')),
            )),
            span0_inline,
        ),
        cut(term),
    ))
    .parse(input)?;
    Ok((input, fold_binary_pairs(first, rest)))
}

fn term(input: &str) -> ParseResult<&str, Expr> {
    let (input, first) = unary.parse(input)?;
    let (input, rest) = many0(pair(
        delimited(
            span0_inline,
            alt((
                value(BinaryOp::Mul, char('*')),
                value(BinaryOp::Div, char('/')),
            )),
            span0_inline,
        ),
        cut(unary),
    ))
    .parse(input)?;
    Ok((input, fold_binary_pairs(first, rest)))
}

fn unary(input: &str) -> ParseResult<&str, Expr> {
    alt((
        map(
            preceded(pair(char('!'), span0_inline), unary),
            |operand| Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            },
        ),
        atom,
        map(
            preceded(pair(char('-'), span0_inline), unary),
            |operand| Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            },
        ),
    ))
    .parse(input)
}

fn atom(input: &str) -> ParseResult<&str, Expr> {
    alt((
        delimited(
            pair(char('('), span0_inline),
            expression,
            pair(span0_inline, cut(char(')'))),
        ),
        // keep `true1` parsing as a variable rather than boolean + junk
        map(
            terminated(primitive, peek(not(alt((alphanumeric1, tag("_")))))),
            Expr::Literal,
        ),
        map(identifier, |name| Expr::Variable(name.to_string())),
    ))
    .parse(input)
}

fn fold_binary(first: Expr, op: BinaryOp, rest: Vec<Expr>) -> Expr {
    rest.into_iter().fold(first, |lhs, rhs| Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

fn fold_binary_pairs(first: Expr, rest: Vec<(BinaryOp, Expr)>) -> Expr {
    rest.into_iter().fold(first, |lhs, (op, rhs)| Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

#[cfg(test)]
mod tests {
    use crate::format::Literal;

    use super::*;

    fn var(name: &str) -> Expr {
        Expr::Variable(name.to_string())
    }

    fn int(value: i64) -> Expr {
        Expr::Literal(Literal::Integer(value))
    }

    fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    #[test]
    fn test_atoms() {
        assert_eq!(expression("42"), Ok(("", int(42))));
        assert_eq!(expression("visited"), Ok(("", var("visited"))));
        assert_eq!(
            expression("true"),
            Ok(("", Expr::Literal(Literal::Boolean(true))))
        );
        // a name that merely starts like a keyword stays a variable
        assert_eq!(expression("trueish"), Ok(("", var("trueish"))));
    }

    #[test]
    fn test_comparison() {
        assert_eq!(
            expression("visited == true"),
            Ok((
                "",
                binary(
                    BinaryOp::Eq,
                    var("visited"),
                    Expr::Literal(Literal::Boolean(true))
                )
            ))
        );
        assert_eq!(
            expression("courage>2"),
            Ok(("", binary(BinaryOp::Gt, var("courage"), int(2))))
        );
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 groups the product first
        assert_eq!(
            expression("1 + 2 * 3"),
            Ok((
                "",
                binary(BinaryOp::Add, int(1), binary(BinaryOp::Mul, int(2), int(3)))
            ))
        );
        // && binds tighter than ||
        assert_eq!(
            expression("a || b && c"),
            Ok((
                "",
                binary(
                    BinaryOp::Or,
                    var("a"),
                    binary(BinaryOp::And, var("b"), var("c"))
                )
            ))
        );
        assert_eq!(
            expression("(1 + 2) * 3"),
            Ok((
                "",
                binary(BinaryOp::Mul, binary(BinaryOp::Add, int(1), int(2)), int(3))
            ))
        );
    }

    #[test]
    fn test_unary() {
        assert_eq!(
            expression("!seen"),
            Ok((
                "",
                Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(var("seen")),
                }
            ))
        );
        assert_eq!(
            expression("-courage"),
            Ok((
                "",
                Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(var("courage")),
                }
            ))
        );
    }

    #[test]
    fn test_guard() {
        assert_eq!(
            guard("{ courage > 2 }"),
            Ok(("", binary(BinaryOp::Gt, var("courage"), int(2))))
        );
        assert_eq!(guard("{visited}"), Ok(("", var("visited"))));
        assert!(guard("{ }").is_err());
    }
}
